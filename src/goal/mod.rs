//! Savings goals and the progress towards them.

mod core;
mod endpoints;

pub use core::{
    FinancialGoal, GoalBuilder, GoalProgress, create_goal, create_goal_table, delete_goal,
    get_goal, get_goals_for_user, latest_goal, update_goal,
};
pub use endpoints::{
    create_goal_endpoint, delete_goal_endpoint, list_goals_endpoint, update_goal_endpoint,
};

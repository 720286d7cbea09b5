//! Monthly spending limits per category.
//!
//! This module contains:
//! - The `Budget` model and `BudgetBuilder` for creating and editing budgets
//! - The reconciler that works out how much has been spent against a budget
//! - Database functions and JSON endpoints for budget CRUD

mod core;
mod endpoints;

pub use core::{
    Budget, BudgetBuilder, BudgetMonth, BudgetStatus, budget_statuses, create_budget,
    create_budget_table, delete_budget, get_budget, get_budgets_for_user, reconcile,
    update_budget,
};
pub use endpoints::{
    create_budget_endpoint, delete_budget_endpoint, list_budgets_endpoint, update_budget_endpoint,
};

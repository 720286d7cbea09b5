//! JSON endpoints for savings goals.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    database_id::GoalId,
    db::lock_connection,
    goal::{GoalBuilder, GoalProgress, create_goal, delete_goal, get_goals_for_user, update_goal},
    user::UserId,
};

/// The state needed to manage goals.
#[derive(Debug, Clone)]
pub struct GoalState {
    /// The database connection for managing goals.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the user's goals with their progress, newest first.
pub async fn list_goals_endpoint(
    State(state): State<GoalState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<GoalProgress>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let goals = get_goals_for_user(&user_id, &connection)?;

    Ok(Json(goals.into_iter().map(GoalProgress::from).collect()))
}

/// Create a goal, responds with the created goal and its progress.
pub async fn create_goal_endpoint(
    State(state): State<GoalState>,
    Path(user_id): Path<UserId>,
    Json(builder): Json<GoalBuilder>,
) -> Result<(StatusCode, Json<GoalProgress>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let goal = create_goal(&user_id, builder, &connection)
        .inspect_err(|error| tracing::warn!("could not create goal for {user_id}: {error}"))?;

    tracing::info!("created goal {} for {user_id}", goal.id);

    Ok((StatusCode::CREATED, Json(goal.into())))
}

/// Replace the fields of a goal, responds with the updated goal and its progress.
pub async fn update_goal_endpoint(
    State(state): State<GoalState>,
    Path((user_id, goal_id)): Path<(UserId, GoalId)>,
    Json(builder): Json<GoalBuilder>,
) -> Result<Json<GoalProgress>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_goal(&user_id, goal_id, builder, &connection)
        .inspect_err(|error| tracing::warn!("could not update goal {goal_id}: {error}"))
        .map(|goal| Json(goal.into()))
}

/// Delete a goal, responds with 204 No Content.
pub async fn delete_goal_endpoint(
    State(state): State<GoalState>,
    Path((user_id, goal_id)): Path<(UserId, GoalId)>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_goal(&user_id, goal_id, &connection)
        .inspect_err(|error| tracing::warn!("could not delete goal {goal_id}: {error}"))?;

    Ok(StatusCode::NO_CONTENT)
}

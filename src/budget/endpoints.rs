//! JSON endpoints for budgets.
//!
//! Listing budgets always recomputes how much has been spent from the user's
//! current transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    budget::{
        Budget, BudgetBuilder, BudgetStatus, budget_statuses, create_budget, delete_budget,
        get_budgets_for_user, update_budget,
    },
    database_id::BudgetId,
    db::lock_connection,
    timezone::local_today,
    transaction::get_transactions_for_user,
    user::UserId,
};

/// The state needed to manage budgets.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// List the user's budgets with how much has been spent against each this month.
pub async fn list_budgets_endpoint(
    State(state): State<BudgetState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<BudgetStatus>>, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let budgets = get_budgets_for_user(&user_id, &connection)?;
    let transactions = get_transactions_for_user(&user_id, &connection)?;

    Ok(Json(budget_statuses(budgets, &transactions, today)))
}

/// Create a budget, responds with the created budget.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    Path(user_id): Path<UserId>,
    Json(builder): Json<BudgetBuilder>,
) -> Result<(StatusCode, Json<Budget>), Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let budget = create_budget(&user_id, builder, today, &connection)
        .inspect_err(|error| tracing::warn!("could not create budget for {user_id}: {error}"))?;

    tracing::info!("created budget {} for {user_id}", budget.id);

    Ok((StatusCode::CREATED, Json(budget)))
}

/// Replace the category and limit of a budget, responds with the updated budget.
pub async fn update_budget_endpoint(
    State(state): State<BudgetState>,
    Path((user_id, budget_id)): Path<(UserId, BudgetId)>,
    Json(builder): Json<BudgetBuilder>,
) -> Result<Json<Budget>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_budget(&user_id, budget_id, builder, &connection)
        .inspect_err(|error| tracing::warn!("could not update budget {budget_id}: {error}"))
        .map(Json)
}

/// Delete a budget, responds with 204 No Content.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Path((user_id, budget_id)): Path<(UserId, BudgetId)>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_budget(&user_id, budget_id, &connection)
        .inspect_err(|error| tracing::warn!("could not delete budget {budget_id}: {error}"))?;

    Ok(StatusCode::NO_CONTENT)
}

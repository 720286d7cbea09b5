//! JSON endpoints for creating, reading, editing and deleting transactions.
//!
//! Every write invalidates the user's memoized aggregates while the database
//! lock is still held, so a reader can never cache a summary of the old data.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    cache::AggregateCache,
    database_id::TransactionId,
    db::lock_connection,
    transaction::{
        Transaction, TransactionBuilder, create_transaction, delete_transaction, get_transaction,
        get_transactions_for_user, update_transaction,
    },
    user::UserId,
};

/// The state needed to manage transactions.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Memoized aggregates that must be dropped when transactions change.
    pub aggregate_cache: AggregateCache,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            aggregate_cache: state.aggregate_cache.clone(),
        }
    }
}

/// List all of a user's transactions in the order they were created.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transactions_for_user(&user_id, &connection)
        .inspect_err(|error| tracing::error!("could not list transactions for {user_id}: {error}"))
        .map(Json)
}

/// Get a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Path((user_id, transaction_id)): Path<(UserId, TransactionId)>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction(&user_id, transaction_id, &connection).map(Json)
}

/// Create a transaction, responds with the created transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(user_id): Path<UserId>,
    Json(builder): Json<TransactionBuilder>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let transaction = create_transaction(&user_id, builder, &connection)
        .inspect_err(|error| tracing::warn!("could not create transaction for {user_id}: {error}"))?;
    state.aggregate_cache.invalidate_user(&user_id);

    tracing::info!("created transaction {} for {user_id}", transaction.id);

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Replace the fields of a transaction, responds with the updated transaction.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Path((user_id, transaction_id)): Path<(UserId, TransactionId)>,
    Json(builder): Json<TransactionBuilder>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let transaction = update_transaction(&user_id, transaction_id, builder, &connection)
        .inspect_err(|error| {
            tracing::warn!("could not update transaction {transaction_id}: {error}")
        })?;
    state.aggregate_cache.invalidate_user(&user_id);

    Ok(Json(transaction))
}

/// Delete a transaction, responds with 204 No Content.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Path((user_id, transaction_id)): Path<(UserId, TransactionId)>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_transaction(&user_id, transaction_id, &connection).inspect_err(|error| {
        tracing::warn!("could not delete transaction {transaction_id}: {error}")
    })?;
    state.aggregate_cache.invalidate_user(&user_id);

    Ok(StatusCode::NO_CONTENT)
}

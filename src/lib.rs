//! FinWise is a web service for tracking personal finances.
//!
//! Users log income and expense transactions, define monthly budgets, set
//! savings goals and view derived summaries of their spending. Every monetary
//! summary is recomputed from the live transaction list, so there is no
//! persisted aggregate that can fall out of sync.
//!
//! This library provides a JSON API over a SQLite database.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use rust_decimal::Decimal;
use serde_json::json;
use tokio::signal;

mod aggregation;
mod analytics;
mod app_state;
mod budget;
mod cache;
mod category;
mod currency;
mod dashboard;
mod database_id;
mod db;
pub mod endpoints;
mod goal;
mod insights;
mod logging;
mod period;
mod profile;
mod routing;
mod timezone;
mod transaction;
mod user;

pub use aggregation::{
    Aggregate, CategoryTotal, MonthlyTotals, available_years, net_balance, recent_transactions,
    trailing_months, yearly_overview,
};
pub use analytics::AnalyticsSummary;
pub use app_state::AppState;
pub use budget::{
    Budget, BudgetBuilder, BudgetMonth, BudgetStatus, budget_statuses, create_budget, reconcile,
};
pub use cache::AggregateCache;
pub use currency::{Currency, MAX_AMOUNT, format_currency};
pub use dashboard::DashboardSummary;
pub use database_id::{BudgetId, DatabaseId, GoalId, TransactionId};
pub use db::initialize as initialize_db;
pub use goal::{FinancialGoal, GoalBuilder, GoalProgress, create_goal};
pub use insights::{
    DisabledInsightGenerator, InsightGenerator, InsightTransaction, SpendingInsights,
    SpendingInsightsRequest,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use period::{Period, PeriodRange, filter_by_period, filter_month_to_date};
pub use profile::UserProfile;
pub use routing::build_router;
pub use timezone::{get_local_offset, local_today};
pub use transaction::{
    Transaction, TransactionBuilder, TransactionType, create_transaction,
    get_transactions_for_user,
};
pub use user::UserId;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A monetary amount that must be strictly positive was zero or negative.
    #[error("{0} is not a positive amount")]
    NonPositiveAmount(Decimal),

    /// A monetary amount was larger than [MAX_AMOUNT].
    #[error("{0} is larger than the largest accepted amount of {max}", max = currency::MAX_AMOUNT)]
    AmountTooLarge(Decimal),

    /// A monetary amount that must not be negative was negative.
    #[error("{0} is a negative amount, which is not allowed")]
    NegativeAmount(Decimal),

    /// A category label was shorter than two characters.
    #[error("category \"{0}\" must be at least 2 characters")]
    InvalidCategory(String),

    /// A goal name was shorter than two characters.
    #[error("goal name \"{0}\" must be at least 2 characters")]
    InvalidGoalName(String),

    /// A profile display name was shorter than two characters.
    #[error("name \"{0}\" must be at least 2 characters")]
    InvalidProfileName(String),

    /// A stored or submitted transaction type was neither income nor expense.
    #[error("\"{0}\" is not a valid transaction type, expected \"income\" or \"expense\"")]
    InvalidTransactionType(String),

    /// A 0-indexed month outside of 0..=11 was requested.
    #[error("{0} is not a valid month index, expected a number from 0 to 11")]
    InvalidMonth(u8),

    /// A budget month key could not be parsed as `YYYY-MM`.
    #[error("\"{0}\" is not a valid budget month, expected the format YYYY-MM")]
    InvalidBudgetMonth(String),

    /// A currency code other than the supported ones was used.
    #[error("\"{0}\" is not a supported currency")]
    InvalidCurrency(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// Tried to update a goal that does not exist
    #[error("tried to update a goal that is not in the database")]
    UpdateMissingGoal,

    /// Tried to delete a goal that does not exist
    #[error("tried to delete a goal that is not in the database")]
    DeleteMissingGoal,

    /// The insight generator failed or is not configured.
    #[error("spending insights are unavailable: {0}")]
    InsightsUnavailable(String),

    /// The insight generator did not answer in time.
    #[error("timed out waiting for spending insights")]
    InsightsTimeout,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NonPositiveAmount(_)
            | Error::AmountTooLarge(_)
            | Error::NegativeAmount(_)
            | Error::InvalidCategory(_)
            | Error::InvalidGoalName(_)
            | Error::InvalidProfileName(_)
            | Error::InvalidTransactionType(_)
            | Error::InvalidMonth(_)
            | Error::InvalidBudgetMonth(_)
            | Error::InvalidCurrency(_) => StatusCode::BAD_REQUEST,
            Error::NotFound
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction
            | Error::UpdateMissingBudget
            | Error::DeleteMissingBudget
            | Error::UpdateMissingGoal
            | Error::DeleteMissingGoal => StatusCode::NOT_FOUND,
            Error::InsightsUnavailable(_) | Error::InsightsTimeout => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::InvalidTimezoneError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                return error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details.",
                );
            }
        };

        error_body(status, &self.to_string())
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

//! AI spending insights.
//!
//! The text generation itself is done by an external service behind the
//! [InsightGenerator] trait. This module builds its input from the user's raw
//! transactions and bounds how long a request may wait for it. A failing or
//! slow generator only affects the insights endpoint.

use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    currency::Currency,
    db::lock_connection,
    profile::get_profile,
    transaction::{Transaction, TransactionType, get_transactions_for_user},
    user::UserId,
};

/// One transaction as given to the insight generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightTransaction {
    /// The transaction amount.
    pub amount: Decimal,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The transaction category, e.g. "Food".
    pub category: String,
    /// The transaction date in ISO 8601 format, e.g. "2024-07-05".
    pub date: String,
    /// The transaction's note, if it has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// The input to the insight generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingInsightsRequest {
    /// The user the insights are for.
    pub user_id: UserId,
    /// The user's transactions.
    pub transactions: Vec<InsightTransaction>,
    /// The currency the user's amounts are in.
    pub currency: Currency,
}

impl SpendingInsightsRequest {
    /// Build the generator input from the user's raw transactions.
    ///
    /// Transactions without a date are left out.
    pub fn new(user_id: UserId, currency: Currency, transactions: &[Transaction]) -> Self {
        let transactions = transactions
            .iter()
            .filter_map(|transaction| {
                let date = transaction.date?;

                Some(InsightTransaction {
                    amount: transaction.amount,
                    kind: transaction.kind,
                    category: transaction.category.clone(),
                    date: date.to_string(),
                    note: transaction.note.clone(),
                })
            })
            .collect();

        Self {
            user_id,
            transactions,
            currency,
        }
    }
}

/// Advice generated from a user's spending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingInsights {
    /// Short pieces of advice, one per entry.
    pub insights: Vec<String>,
}

/// A service that turns a user's transactions into spending advice.
#[async_trait]
pub trait InsightGenerator: Debug + Send + Sync {
    /// Generate insights for the transactions in `request`.
    ///
    /// # Errors
    /// Returns [Error::InsightsUnavailable] if the service fails.
    async fn generate(&self, request: SpendingInsightsRequest) -> Result<SpendingInsights, Error>;
}

/// The generator used when no insight service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledInsightGenerator;

#[async_trait]
impl InsightGenerator for DisabledInsightGenerator {
    async fn generate(&self, _request: SpendingInsightsRequest) -> Result<SpendingInsights, Error> {
        Err(Error::InsightsUnavailable(
            "no insight service is configured".to_owned(),
        ))
    }
}

/// The state needed to generate spending insights.
#[derive(Debug, Clone)]
pub struct InsightState {
    /// The database connection for reading transactions and settings.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The currency for users who have not picked one.
    pub default_currency: Currency,
    /// The service that writes the insights.
    pub insight_generator: Arc<dyn InsightGenerator>,
    /// How long to wait for the insight service.
    pub insights_timeout: Duration,
}

impl FromRef<AppState> for InsightState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            default_currency: state.default_currency,
            insight_generator: state.insight_generator.clone(),
            insights_timeout: state.insights_timeout,
        }
    }
}

/// Get spending insights for the user.
///
/// Users without transactions get an empty list and the insight service is
/// not called.
pub async fn get_insights_endpoint(
    State(state): State<InsightState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<SpendingInsights>, Error> {
    let request = {
        let connection = lock_connection(&state.db_connection)?;
        let transactions = get_transactions_for_user(&user_id, &connection)?;
        let profile = get_profile(&user_id, state.default_currency, &connection)?;

        SpendingInsightsRequest::new(user_id.clone(), profile.currency, &transactions)
    };

    if request.transactions.is_empty() {
        return Ok(Json(SpendingInsights::default()));
    }

    let insights = tokio::time::timeout(
        state.insights_timeout,
        state.insight_generator.generate(request),
    )
    .await
    .map_err(|_| Error::InsightsTimeout)
    .and_then(|result| result)
    .inspect_err(|error| tracing::warn!("could not get insights for {user_id}: {error}"))?;

    Ok(Json(insights))
}

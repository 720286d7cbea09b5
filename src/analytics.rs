//! Chart data for the analytics page.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    aggregation::{
        Aggregate, CategoryTotal, MonthlyTotals, available_years, trailing_months, yearly_overview,
    },
    cache::AggregateCache,
    db::lock_connection,
    period::{Period, filter_by_period},
    timezone::local_today,
    transaction::get_transactions_for_user,
    user::UserId,
};

/// How many months the income and expense trend covers.
pub const TREND_MONTH_COUNT: u8 = 12;

/// The period selected on the analytics page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AnalyticsQuery {
    /// The calendar year, defaults to the current year.
    pub year: Option<i32>,
    /// The month as a number from 0 (January) to 11 (December).
    ///
    /// When neither `year` nor `month` is given, the current month is used.
    /// When only `year` is given, the whole year is used.
    pub month: Option<u8>,
}

/// The data for every chart on the analytics page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    /// The selected year.
    pub year: i32,
    /// The selected 0-indexed month, or `None` when the whole year is selected.
    pub month: Option<u8>,
    /// Income and expenses for each month of the selected year.
    pub yearly_overview: Vec<MonthlyTotals>,
    /// Spending per category in the selected period, largest first.
    pub category_breakdown: Vec<CategoryTotal>,
    /// Income and expenses for the last twelve months, oldest first.
    pub trailing_months: Vec<MonthlyTotals>,
    /// The years that have transactions, newest first.
    pub available_years: Vec<i32>,
}

/// The state needed for the analytics page.
#[derive(Debug, Clone)]
pub struct AnalyticsState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    /// Memoized period aggregates.
    pub aggregate_cache: AggregateCache,
}

impl FromRef<AppState> for AnalyticsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            aggregate_cache: state.aggregate_cache.clone(),
        }
    }
}

/// Get the chart data for the selected year and month.
pub async fn get_analytics_endpoint(
    State(state): State<AnalyticsState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsSummary>, Error> {
    let today = local_today(&state.local_timezone)?;
    let (year, month) = match (query.year, query.month) {
        (None, None) => (today.year(), Some(today.month() as u8 - 1)),
        (year, month) => (year.unwrap_or(today.year()), month),
    };
    let period = Period::from_query(year, month)?;

    let connection = lock_connection(&state.db_connection)?;
    let transactions = get_transactions_for_user(&user_id, &connection)?;

    let aggregate = state.aggregate_cache.get_or_compute(&user_id, period, || {
        Aggregate::from_transactions(filter_by_period(&transactions, period))
    });

    Ok(Json(AnalyticsSummary {
        year,
        month,
        yearly_overview: yearly_overview(&transactions, year),
        category_breakdown: aggregate.categories_by_amount(),
        trailing_months: trailing_months(&transactions, today, TREND_MONTH_COUNT),
        available_years: available_years(&transactions),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json,
        extract::{Path, Query, State},
    };
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use super::{AnalyticsQuery, AnalyticsState, TREND_MONTH_COUNT, get_analytics_endpoint};
    use crate::{
        Error,
        cache::AggregateCache,
        db::initialize,
        timezone::local_today,
        transaction::{Transaction, TransactionType, create_transaction},
        user::UserId,
    };

    fn must_create_state() -> AnalyticsState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user_id = user();

        for (amount, kind, category, date) in [
            (dec!(5000), TransactionType::Income, "Salary", date!(2023 - 07 - 01)),
            (dec!(1200), TransactionType::Expense, "Rent", date!(2023 - 07 - 02)),
            (dec!(150), TransactionType::Expense, "Food", date!(2023 - 07 - 05)),
            (dec!(80), TransactionType::Expense, "Food", date!(2023 - 03 - 09)),
            (dec!(20), TransactionType::Expense, "Food", date!(2021 - 01 - 09)),
        ] {
            create_transaction(
                &user_id,
                Transaction::build(amount, kind, category, date),
                &conn,
            )
            .unwrap();
        }

        AnalyticsState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
            aggregate_cache: AggregateCache::default(),
        }
    }

    fn user() -> UserId {
        UserId::new("user-1")
    }

    #[tokio::test]
    async fn selected_month_is_zero_indexed() {
        let state = must_create_state();

        let Json(summary) = get_analytics_endpoint(
            State(state),
            Path(user()),
            Query(AnalyticsQuery {
                year: Some(2023),
                month: Some(6),
            }),
        )
        .await
        .unwrap();

        let categories: Vec<_> = summary
            .category_breakdown
            .iter()
            .map(|total| (total.category.as_str(), total.amount))
            .collect();
        assert_eq!(categories, vec![("Rent", dec!(1200)), ("Food", dec!(150))]);
        assert_eq!(summary.yearly_overview.len(), 12);
        assert_eq!(summary.yearly_overview[6].income, dec!(5000));
        assert_eq!(summary.trailing_months.len(), usize::from(TREND_MONTH_COUNT));
        assert_eq!(summary.available_years, vec![2023, 2021]);
    }

    #[tokio::test]
    async fn year_without_month_covers_the_whole_year() {
        let state = must_create_state();

        let Json(summary) = get_analytics_endpoint(
            State(state),
            Path(user()),
            Query(AnalyticsQuery {
                year: Some(2023),
                month: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(summary.month, None);
        let food = summary
            .category_breakdown
            .iter()
            .find(|total| total.category == "Food")
            .map(|total| total.amount);
        assert_eq!(food, Some(dec!(230)));
    }

    #[tokio::test]
    async fn defaults_to_current_month() {
        let state = must_create_state();
        let today = local_today("Etc/UTC").unwrap();

        let Json(summary) =
            get_analytics_endpoint(State(state), Path(user()), Query(AnalyticsQuery::default()))
                .await
                .unwrap();

        assert_eq!(summary.year, today.year());
        assert_eq!(summary.month, Some(today.month() as u8 - 1));
    }

    #[tokio::test]
    async fn invalid_month_is_rejected() {
        let state = must_create_state();

        let result = get_analytics_endpoint(
            State(state),
            Path(user()),
            Query(AnalyticsQuery {
                year: Some(2023),
                month: Some(12),
            }),
        )
        .await;

        assert_eq!(result.err(), Some(Error::InvalidMonth(12)));
    }
}

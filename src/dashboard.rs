//! The dashboard summary: this month's income and expenses, the running
//! balance, where the money went this month, the latest transactions and the
//! most recent savings goal.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{
    AppState, Error,
    aggregation::{Aggregate, CategoryTotal, net_balance, recent_transactions},
    cache::AggregateCache,
    currency::{Currency, format_currency},
    db::lock_connection,
    goal::{GoalProgress, latest_goal},
    period::{Period, filter_by_period, filter_month_to_date},
    profile::get_profile,
    timezone::local_today,
    transaction::{Transaction, get_transactions_for_user},
    user::UserId,
};

/// How many transactions the dashboard lists.
pub const RECENT_TRANSACTION_COUNT: usize = 5;

/// A monetary amount with its display string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayAmount {
    /// The exact amount.
    pub amount: Decimal,
    /// The amount formatted in the user's currency, e.g. "₹1,200.00".
    pub formatted: String,
}

impl DisplayAmount {
    fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount,
            formatted: format_currency(amount, currency),
        }
    }
}

/// The headline numbers at the top of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewCards {
    /// Income from the first of this month up to today.
    pub month_income: DisplayAmount,
    /// Expenses from the first of this month up to today.
    pub month_expense: DisplayAmount,
    /// All income minus all expenses, over the user's whole history.
    pub total_balance: DisplayAmount,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// The currency amounts are formatted in.
    pub currency: Currency,
    /// The headline numbers.
    pub overview: OverviewCards,
    /// This month's spending per category, largest first.
    pub spending_by_category: Vec<CategoryTotal>,
    /// The most recent transactions, newest first.
    pub recent_transactions: Vec<Transaction>,
    /// The most recently created goal, if any.
    pub latest_goal: Option<GoalProgress>,
}

/// Build the dashboard from a user's transactions.
///
/// `this_month` is the aggregate of the calendar month containing `today`.
pub fn build_dashboard(
    transactions: &[Transaction],
    this_month: &Aggregate,
    goal: Option<GoalProgress>,
    currency: Currency,
    today: Date,
) -> DashboardSummary {
    let month_to_date = Aggregate::from_transactions(filter_month_to_date(transactions, today));

    DashboardSummary {
        currency,
        overview: OverviewCards {
            month_income: DisplayAmount::new(month_to_date.total_income, currency),
            month_expense: DisplayAmount::new(month_to_date.total_expense, currency),
            total_balance: DisplayAmount::new(net_balance(transactions), currency),
        },
        spending_by_category: this_month.categories_by_amount(),
        recent_transactions: recent_transactions(transactions, RECENT_TRANSACTION_COUNT)
            .into_iter()
            .cloned()
            .collect(),
        latest_goal: goal,
    }
}

/// The state needed for the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions, goals and settings.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    /// The currency for users who have not picked one.
    pub default_currency: Currency,
    /// Memoized monthly aggregates.
    pub aggregate_cache: AggregateCache,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            default_currency: state.default_currency,
            aggregate_cache: state.aggregate_cache.clone(),
        }
    }
}

/// Get the dashboard summary for the user.
pub async fn get_dashboard_endpoint(
    State(state): State<DashboardState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<DashboardSummary>, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let transactions = get_transactions_for_user(&user_id, &connection)?;
    let profile = get_profile(&user_id, state.default_currency, &connection)?;
    let goal = latest_goal(&user_id, &connection)?.map(GoalProgress::from);

    let current_month = Period::current_month(today);
    let this_month = state
        .aggregate_cache
        .get_or_compute(&user_id, current_month, || {
            Aggregate::from_transactions(filter_by_period(&transactions, current_month))
        });

    Ok(Json(build_dashboard(
        &transactions,
        &this_month,
        goal,
        profile.currency,
        today,
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json,
        extract::{Path, State},
    };
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{Date, OffsetDateTime, macros::date};

    use super::{DashboardState, build_dashboard, get_dashboard_endpoint};
    use crate::{
        aggregation::Aggregate,
        cache::AggregateCache,
        currency::Currency,
        db::initialize,
        goal::{FinancialGoal, create_goal},
        period::{Period, filter_by_period},
        timezone::local_today,
        transaction::{Transaction, TransactionType, create_transaction},
        user::UserId,
    };

    fn transaction(id: i64, amount: Decimal, kind: TransactionType, date: Date) -> Transaction {
        Transaction {
            id,
            user_id: UserId::new("user-1"),
            amount,
            kind,
            category: if kind == TransactionType::Income {
                "Salary".to_owned()
            } else {
                "Food".to_owned()
            },
            date: Some(date),
            note: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn overview_uses_month_to_date_and_full_history() {
        let today = date!(2024 - 07 - 15);
        let transactions = vec![
            transaction(1, dec!(5000), TransactionType::Income, date!(2024 - 07 - 01)),
            transaction(2, dec!(150), TransactionType::Expense, date!(2024 - 07 - 05)),
            transaction(3, dec!(999), TransactionType::Expense, date!(2024 - 07 - 20)),
            transaction(4, dec!(1000), TransactionType::Income, date!(2024 - 06 - 01)),
        ];
        let this_month = Aggregate::from_transactions(filter_by_period(
            &transactions,
            Period::current_month(today),
        ));

        let summary = build_dashboard(&transactions, &this_month, None, Currency::Inr, today);

        assert_eq!(summary.overview.month_income.amount, dec!(5000));
        assert_eq!(summary.overview.month_income.formatted, "₹5,000.00");
        assert_eq!(summary.overview.month_expense.amount, dec!(150));
        assert_eq!(summary.overview.total_balance.amount, dec!(4851));
        assert_eq!(summary.spending_by_category[0].amount, dec!(1149));
        assert_eq!(summary.latest_goal, None);
    }

    #[test]
    fn lists_at_most_five_recent_transactions() {
        let transactions: Vec<_> = (1..=7)
            .map(|day| {
                transaction(
                    day,
                    dec!(1),
                    TransactionType::Expense,
                    Date::from_calendar_date(2024, time::Month::July, day as u8).unwrap(),
                )
            })
            .collect();

        let summary = build_dashboard(
            &transactions,
            &Aggregate::default(),
            None,
            Currency::Usd,
            date!(2024 - 07 - 31),
        );

        let ids: Vec<_> = summary
            .recent_transactions
            .iter()
            .map(|transaction| transaction.id)
            .collect();
        assert_eq!(ids, vec![7, 6, 5, 4, 3]);
    }

    #[tokio::test]
    async fn endpoint_includes_latest_goal_and_caches_month() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user_id = UserId::new("user-1");
        let today = local_today("Etc/UTC").unwrap();
        create_transaction(
            &user_id,
            Transaction::build(dec!(40), TransactionType::Expense, "Transport", today),
            &conn,
        )
        .unwrap();
        create_goal(
            &user_id,
            FinancialGoal::build("Emergency Fund", dec!(1000), dec!(250), date!(2030 - 01 - 01)),
            &conn,
        )
        .unwrap();
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
            default_currency: Currency::Eur,
            aggregate_cache: AggregateCache::default(),
        };

        let Json(summary) = get_dashboard_endpoint(State(state.clone()), Path(user_id.clone()))
            .await
            .unwrap();

        assert_eq!(summary.currency, Currency::Eur);
        assert_eq!(summary.overview.month_expense.formatted, "€40.00");
        assert_eq!(
            summary.latest_goal.map(|goal| goal.progress),
            Some(dec!(25))
        );
        assert!(
            state
                .aggregate_cache
                .get(&user_id, Period::current_month(today))
                .is_some()
        );
    }
}

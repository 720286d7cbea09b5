//! Defines the budget models, the reconciliation of budgets against spending
//! and the database queries for budgets.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    Error,
    aggregation::Aggregate,
    category::validate_category,
    currency::check_amount_limit,
    database_id::BudgetId,
    db::read_text,
    period::{Period, filter_by_period},
    transaction::Transaction,
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// The calendar month a budget was created for, written as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BudgetMonth {
    year: i32,
    month: Month,
}

impl BudgetMonth {
    /// The budget month for a given year and month.
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    /// The budget month that contains `date`.
    pub fn containing(date: Date) -> Self {
        Self::new(date.year(), date.month())
    }

    /// The calendar year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The month of the year.
    pub fn month(&self) -> Month {
        self.month
    }

    /// The budget month as a [Period].
    pub fn period(&self) -> Period {
        Period::Month {
            year: self.year,
            month: self.month,
        }
    }
}

impl Display for BudgetMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month as u8)
    }
}

impl FromStr for BudgetMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidBudgetMonth(s.to_owned());

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }

        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month
            .parse::<u8>()
            .ok()
            .and_then(|number| Month::try_from(number).ok())
            .ok_or_else(invalid)?;

        Ok(Self::new(year, month))
    }
}

impl TryFrom<String> for BudgetMonth {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BudgetMonth> for String {
    fn from(value: BudgetMonth) -> Self {
        value.to_string()
    }
}

/// A spending limit for one category.
///
/// How much has been spent is never stored with the budget, see [reconcile].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The user that owns the budget.
    pub user_id: UserId,
    /// The expense category the budget limits.
    pub category: String,
    /// The most that should be spent in the category each month.
    pub limit: Decimal,
    /// The month the budget was created for.
    pub month: BudgetMonth,
}

impl Budget {
    /// Create a new budget.
    ///
    /// Shortcut for [BudgetBuilder] for discoverability.
    pub fn build(category: &str, limit: Decimal) -> BudgetBuilder {
        BudgetBuilder {
            category: category.to_owned(),
            limit,
            month: None,
        }
    }
}

/// The user-editable fields of a [Budget].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BudgetBuilder {
    /// The expense category the budget limits.
    pub category: String,
    /// The most that should be spent in the category each month.
    pub limit: Decimal,
    /// The month the budget is for. New budgets default to the current month
    /// and edits keep the existing month when this is omitted.
    #[serde(default)]
    pub month: Option<BudgetMonth>,
}

impl BudgetBuilder {
    /// Set the month of the budget.
    pub fn month(mut self, month: BudgetMonth) -> Self {
        self.month = Some(month);
        self
    }

    /// Check the fields.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidCategory] if the category is too short,
    /// - [Error::NonPositiveAmount] if the limit is zero or negative,
    /// - or [Error::AmountTooLarge] if the limit is over [crate::MAX_AMOUNT].
    pub fn validate(self) -> Result<Self, Error> {
        validate_category(&self.category)?;

        if self.limit <= Decimal::ZERO {
            return Err(Error::NonPositiveAmount(self.limit));
        }
        check_amount_limit(self.limit)?;

        Ok(self)
    }
}

/// A budget together with how much has been spent against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    /// The budget.
    #[serde(flatten)]
    pub budget: Budget,
    /// The total of the matching expenses.
    pub spent: Decimal,
    /// `spent` as a percentage of the budget's limit. May exceed 100.
    pub percentage: Decimal,
}

impl BudgetStatus {
    /// Whether more than the limit has been spent.
    pub fn is_over_budget(&self) -> bool {
        self.spent > self.budget.limit
    }
}

/// Work out how much has been spent against `budget` from per-category
/// expense totals.
///
/// Categories match exactly and are case-sensitive. A budget whose limit is
/// not positive always reports a percentage of zero.
pub fn reconcile(budget: Budget, by_category: &HashMap<String, Decimal>) -> BudgetStatus {
    let spent = by_category
        .get(&budget.category)
        .copied()
        .unwrap_or(Decimal::ZERO);

    let percentage = if budget.limit > Decimal::ZERO {
        spent
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.checked_div(budget.limit))
            .unwrap_or(Decimal::MAX)
    } else {
        Decimal::ZERO
    };

    BudgetStatus {
        budget,
        spent,
        percentage,
    }
}

/// Reconcile every budget against the expenses of the calendar month that
/// contains `today`.
pub fn budget_statuses(
    budgets: Vec<Budget>,
    transactions: &[Transaction],
    today: Date,
) -> Vec<BudgetStatus> {
    let this_month = filter_by_period(transactions, Period::current_month(today));
    let aggregate = Aggregate::from_transactions(this_month);

    budgets
        .into_iter()
        .map(|budget| reconcile(budget, &aggregate.by_category))
        .collect()
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new budget in the database from a builder.
///
/// The budget is for the month containing `today` unless the builder
/// specifies a month.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] or [Error::NonPositiveAmount] if the builder is invalid,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(
    user_id: &UserId,
    builder: BudgetBuilder,
    today: Date,
    connection: &Connection,
) -> Result<Budget, Error> {
    let builder = builder.validate()?;
    let month = builder
        .month
        .unwrap_or_else(|| BudgetMonth::containing(today));

    connection.execute(
        "INSERT INTO budget (user_id, category, limit_amount, month) VALUES (?1, ?2, ?3, ?4)",
        params![
            user_id.as_str(),
            builder.category,
            builder.limit.to_string(),
            month.to_string(),
        ],
    )?;

    Ok(Budget {
        id: connection.last_insert_rowid(),
        user_id: user_id.clone(),
        category: builder.category,
        limit: builder.limit,
        month,
    })
}

/// Retrieve one of `user_id`'s budgets by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a budget owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_budget(user_id: &UserId, id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(
            "SELECT id, user_id, category, limit_amount, month
             FROM budget WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row(params![id, user_id.as_str()], map_budget_row)?
        .ok_or(Error::NotFound)
}

/// Retrieve all of `user_id`'s budgets in the order they were created.
///
/// Rows with an unreadable limit or month are skipped with a warning.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_budgets_for_user(user_id: &UserId, connection: &Connection) -> Result<Vec<Budget>, Error> {
    let budgets = connection
        .prepare(
            "SELECT id, user_id, category, limit_amount, month
             FROM budget WHERE user_id = ?1 ORDER BY id ASC",
        )?
        .query_map([user_id.as_str()], map_budget_row)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();

    Ok(budgets)
}

/// Replace the category and limit of one of `user_id`'s budgets, and its
/// month if the builder has one.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] or [Error::NonPositiveAmount] if the builder is invalid,
/// - [Error::UpdateMissingBudget] if the budget does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_budget(
    user_id: &UserId,
    id: BudgetId,
    builder: BudgetBuilder,
    connection: &Connection,
) -> Result<Budget, Error> {
    let builder = builder.validate()?;

    let rows_affected = connection.execute(
        "UPDATE budget
         SET category = ?1, limit_amount = ?2, month = COALESCE(?3, month)
         WHERE id = ?4 AND user_id = ?5",
        params![
            builder.category,
            builder.limit.to_string(),
            builder.month.map(|month| month.to_string()),
            id,
            user_id.as_str(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget);
    }

    get_budget(user_id, id, connection)
}

/// Delete one of `user_id`'s budgets.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingBudget] if the budget does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_budget(user_id: &UserId, id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        params![id, user_id.as_str()],
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                limit_amount TEXT NOT NULL,
                month TEXT NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_budget_user ON budget(user_id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Budget, or `None` if its limit or month is unreadable.
fn map_budget_row(row: &Row) -> Result<Option<Budget>, rusqlite::Error> {
    let id: BudgetId = row.get(0)?;

    let raw_limit = read_text(row, 3)?.unwrap_or_default();
    let limit = match raw_limit.trim().parse::<Decimal>() {
        Ok(limit) => limit,
        Err(error) => {
            tracing::warn!("skipping budget {id}: malformed limit {raw_limit:?} ({error})");
            return Ok(None);
        }
    };

    let raw_month = read_text(row, 4)?.unwrap_or_default();
    let month = match raw_month.parse::<BudgetMonth>() {
        Ok(month) => month,
        Err(error) => {
            tracing::warn!("skipping budget {id}: {error}");
            return Ok(None);
        }
    };

    Ok(Some(Budget {
        id,
        user_id: UserId::new(row.get::<_, String>(1)?),
        category: row.get(2)?,
        limit,
        month,
    }))
}

// ============================================================================
// TESTS
// ============================================================================



#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::{Month, macros::date};

    use crate::{
        Error,
        budget::{
            Budget, BudgetMonth, create_budget, delete_budget, get_budget, get_budgets_for_user,
            update_budget,
        },
        currency::MAX_AMOUNT,
        db::initialize,
        user::UserId,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn user() -> UserId {
        UserId::new("user-1")
    }

    #[test]
    fn create_defaults_to_current_month() {
        let conn = get_test_connection();

        let budget = create_budget(
            &user(),
            Budget::build("Groceries", dec!(400)),
            date!(2024 - 07 - 15),
            &conn,
        )
        .unwrap();

        assert_eq!(budget.month, BudgetMonth::new(2024, Month::July));
        assert_eq!(get_budget(&user(), budget.id, &conn), Ok(budget));
    }

    #[test]
    fn unreadable_rows_are_skipped() {
        let conn = get_test_connection();
        let good = create_budget(
            &user(),
            Budget::build("Food", dec!(400)),
            date!(2024 - 07 - 15),
            &conn,
        )
        .unwrap();
        for (limit, month) in [("lots", "2024-07"), ("100", "July"), ("100", "2024-13")] {
            conn.execute(
                "INSERT INTO budget (user_id, category, limit_amount, month)
                 VALUES ('user-1', 'Misc', ?1, ?2)",
                (limit, month),
            )
            .unwrap();
        }
        let bad_id = conn.last_insert_rowid();

        let budgets = get_budgets_for_user(&user(), &conn);

        assert_eq!(budgets, Ok(vec![good]));
        assert_eq!(get_budget(&user(), bad_id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn create_fails_on_limit_over_maximum() {
        let conn = get_test_connection();
        let limit = MAX_AMOUNT + dec!(1);

        let result = create_budget(
            &user(),
            Budget::build("Food", limit),
            date!(2024 - 07 - 15),
            &conn,
        );

        assert_eq!(result, Err(Error::AmountTooLarge(limit)));
    }

    #[test]
    fn create_keeps_category_as_submitted() {
        let conn = get_test_connection();

        let budget = create_budget(
            &user(),
            Budget::build("Eating Out", dec!(100)),
            date!(2024 - 07 - 15),
            &conn,
        )
        .unwrap();

        assert_eq!(budget.category, "Eating Out");
    }

    #[test]
    fn create_fails_on_non_positive_limit() {
        let conn = get_test_connection();

        let result = create_budget(
            &user(),
            Budget::build("Food", dec!(0)),
            date!(2024 - 07 - 15),
            &conn,
        );

        assert_eq!(result, Err(Error::NonPositiveAmount(dec!(0))));
    }

    #[test]
    fn create_fails_on_short_category() {
        let conn = get_test_connection();

        let result = create_budget(
            &user(),
            Budget::build("F", dec!(10)),
            date!(2024 - 07 - 15),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory("F".to_owned())));
    }

    #[test]
    fn duplicate_categories_are_allowed() {
        let conn = get_test_connection();
        let today = date!(2024 - 07 - 15);
        create_budget(&user(), Budget::build("Food", dec!(100)), today, &conn).unwrap();
        create_budget(&user(), Budget::build("Food", dec!(200)), today, &conn).unwrap();

        let budgets = get_budgets_for_user(&user(), &conn).unwrap();

        assert_eq!(budgets.len(), 2);
    }

    #[test]
    fn update_keeps_month_when_omitted() {
        let conn = get_test_connection();
        let budget = create_budget(
            &user(),
            Budget::build("Food", dec!(100)),
            date!(2024 - 07 - 15),
            &conn,
        )
        .unwrap();

        let updated = update_budget(
            &user(),
            budget.id,
            Budget::build("Dining", dec!(120.50)),
            &conn,
        )
        .unwrap();

        assert_eq!(updated.category, "Dining");
        assert_eq!(updated.limit, dec!(120.50));
        assert_eq!(updated.month, budget.month);
    }

    #[test]
    fn update_can_move_month() {
        let conn = get_test_connection();
        let budget = create_budget(
            &user(),
            Budget::build("Food", dec!(100)),
            date!(2024 - 07 - 15),
            &conn,
        )
        .unwrap();

        let updated = update_budget(
            &user(),
            budget.id,
            Budget::build("Food", dec!(100)).month(BudgetMonth::new(2024, Month::August)),
            &conn,
        )
        .unwrap();

        assert_eq!(updated.month, BudgetMonth::new(2024, Month::August));
    }

    #[test]
    fn update_fails_for_other_user() {
        let conn = get_test_connection();
        let budget = create_budget(
            &user(),
            Budget::build("Food", dec!(100)),
            date!(2024 - 07 - 15),
            &conn,
        )
        .unwrap();

        let result = update_budget(
            &UserId::new("user-2"),
            budget.id,
            Budget::build("Food", dec!(1)),
            &conn,
        );

        assert_eq!(result, Err(Error::UpdateMissingBudget));
    }

    #[test]
    fn delete_removes_budget() {
        let conn = get_test_connection();
        let budget = create_budget(
            &user(),
            Budget::build("Food", dec!(100)),
            date!(2024 - 07 - 15),
            &conn,
        )
        .unwrap();

        delete_budget(&user(), budget.id, &conn).unwrap();

        assert_eq!(get_budget(&user(), budget.id, &conn), Err(Error::NotFound));
        assert_eq!(
            delete_budget(&user(), budget.id, &conn),
            Err(Error::DeleteMissingBudget)
        );
    }
}

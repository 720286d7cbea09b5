//! Defines the savings goal model and the database queries for goals.

use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    currency::check_amount_limit,
    database_id::GoalId,
    db::{now_to_the_second, read_decimal},
    user::UserId,
};

/// The shortest allowed goal name, in characters.
const MIN_GOAL_NAME_LENGTH: usize = 2;

// ============================================================================
// MODELS
// ============================================================================

/// A savings target, e.g. "Emergency fund".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialGoal {
    /// The ID of the goal.
    pub id: GoalId,
    /// The user that owns the goal.
    pub user_id: UserId,
    /// What the user is saving for.
    pub goal_name: String,
    /// How much the user wants to save.
    pub target_amount: Decimal,
    /// How much the user has saved so far.
    pub current_amount: Decimal,
    /// When the user wants to reach the target.
    pub deadline: Date,
    /// When the goal was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FinancialGoal {
    /// Create a new goal.
    ///
    /// Shortcut for [GoalBuilder] for discoverability.
    pub fn build(
        goal_name: &str,
        target_amount: Decimal,
        current_amount: Decimal,
        deadline: Date,
    ) -> GoalBuilder {
        GoalBuilder {
            goal_name: goal_name.to_owned(),
            target_amount,
            current_amount,
            deadline,
        }
    }

    /// The saved amount as a percentage of the target, or zero if the target
    /// is not positive. Not clamped, so an exceeded goal is above 100.
    pub fn progress_percentage(&self) -> Decimal {
        if self.target_amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        self.current_amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.checked_div(self.target_amount))
            .unwrap_or(Decimal::MAX)
    }

    /// [FinancialGoal::progress_percentage] clamped to a progress bar's range of 0 to 100.
    pub fn display_progress(&self) -> Decimal {
        self.progress_percentage()
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    }

    /// How much is left to save, never negative.
    pub fn remaining(&self) -> Decimal {
        self.target_amount
            .saturating_sub(self.current_amount)
            .max(Decimal::ZERO)
    }
}

/// The user-editable fields of a [FinancialGoal].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GoalBuilder {
    /// What the user is saving for.
    pub goal_name: String,
    /// How much the user wants to save, must be greater than zero.
    pub target_amount: Decimal,
    /// How much the user has saved so far, must not be negative.
    pub current_amount: Decimal,
    /// When the user wants to reach the target.
    pub deadline: Date,
}

impl GoalBuilder {
    /// Check the fields and trim the goal name.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidGoalName] if the name is too short,
    /// - [Error::NonPositiveAmount] if the target is zero or negative,
    /// - [Error::NegativeAmount] if the current amount is negative,
    /// - or [Error::AmountTooLarge] if either amount is over [crate::MAX_AMOUNT].
    pub fn validate(mut self) -> Result<Self, Error> {
        let goal_name = self.goal_name.trim();
        if goal_name.chars().count() < MIN_GOAL_NAME_LENGTH {
            return Err(Error::InvalidGoalName(self.goal_name));
        }
        self.goal_name = goal_name.to_owned();

        if self.target_amount <= Decimal::ZERO {
            return Err(Error::NonPositiveAmount(self.target_amount));
        }

        if self.current_amount < Decimal::ZERO {
            return Err(Error::NegativeAmount(self.current_amount));
        }

        check_amount_limit(self.target_amount)?;
        check_amount_limit(self.current_amount)?;

        Ok(self)
    }
}

/// A goal with its progress worked out for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    /// The goal.
    #[serde(flatten)]
    pub goal: FinancialGoal,
    /// The progress percentage, clamped to 0 to 100.
    pub progress: Decimal,
    /// How much is left to save.
    pub remaining: Decimal,
}

impl From<FinancialGoal> for GoalProgress {
    fn from(goal: FinancialGoal) -> Self {
        Self {
            progress: goal.display_progress(),
            remaining: goal.remaining(),
            goal,
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new goal in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidGoalName], [Error::NonPositiveAmount] or
///   [Error::NegativeAmount] if the builder is invalid,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_goal(
    user_id: &UserId,
    builder: GoalBuilder,
    connection: &Connection,
) -> Result<FinancialGoal, Error> {
    let builder = builder.validate()?;
    let created_at = now_to_the_second();

    connection.execute(
        "INSERT INTO goal (user_id, goal_name, target_amount, current_amount, deadline, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user_id.as_str(),
            builder.goal_name,
            builder.target_amount.to_string(),
            builder.current_amount.to_string(),
            builder.deadline,
            created_at.unix_timestamp(),
        ],
    )?;

    Ok(FinancialGoal {
        id: connection.last_insert_rowid(),
        user_id: user_id.clone(),
        goal_name: builder.goal_name,
        target_amount: builder.target_amount,
        current_amount: builder.current_amount,
        deadline: builder.deadline,
        created_at,
    })
}

/// Retrieve one of `user_id`'s goals by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a goal owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_goal(user_id: &UserId, id: GoalId, connection: &Connection) -> Result<FinancialGoal, Error> {
    connection
        .prepare(
            "SELECT id, user_id, goal_name, target_amount, current_amount, deadline, created_at
             FROM goal WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row(params![id, user_id.as_str()], map_goal_row)
        .map_err(Error::from)
}

/// Retrieve all of `user_id`'s goals, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_goals_for_user(
    user_id: &UserId,
    connection: &Connection,
) -> Result<Vec<FinancialGoal>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, goal_name, target_amount, current_amount, deadline, created_at
             FROM goal WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?
        .query_map([user_id.as_str()], map_goal_row)?
        .map(|maybe_goal| maybe_goal.map_err(Error::from))
        .collect()
}

/// Retrieve the goal `user_id` created most recently, if any.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn latest_goal(user_id: &UserId, connection: &Connection) -> Result<Option<FinancialGoal>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, goal_name, target_amount, current_amount, deadline, created_at
             FROM goal WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )?
        .query_row([user_id.as_str()], map_goal_row)
        .optional()
        .map_err(Error::from)
}

/// Replace the editable fields of one of `user_id`'s goals.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidGoalName], [Error::NonPositiveAmount] or
///   [Error::NegativeAmount] if the builder is invalid,
/// - [Error::UpdateMissingGoal] if the goal does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_goal(
    user_id: &UserId,
    id: GoalId,
    builder: GoalBuilder,
    connection: &Connection,
) -> Result<FinancialGoal, Error> {
    let builder = builder.validate()?;

    let rows_affected = connection.execute(
        "UPDATE goal
         SET goal_name = ?1, target_amount = ?2, current_amount = ?3, deadline = ?4
         WHERE id = ?5 AND user_id = ?6",
        params![
            builder.goal_name,
            builder.target_amount.to_string(),
            builder.current_amount.to_string(),
            builder.deadline,
            id,
            user_id.as_str(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingGoal);
    }

    get_goal(user_id, id, connection)
}

/// Delete one of `user_id`'s goals.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingGoal] if the goal does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_goal(user_id: &UserId, id: GoalId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM goal WHERE id = ?1 AND user_id = ?2",
        params![id, user_id.as_str()],
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingGoal);
    }

    Ok(())
}

/// Create the goal table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                goal_name TEXT NOT NULL,
                target_amount TEXT NOT NULL,
                current_amount TEXT NOT NULL,
                deadline TEXT NOT NULL,
                created_at INTEGER NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_goal_user ON goal(user_id);",
        (),
    )?;

    Ok(())
}

fn map_goal_row(row: &Row) -> Result<FinancialGoal, rusqlite::Error> {
    let created_at: i64 = row.get(6)?;

    Ok(FinancialGoal {
        id: row.get(0)?,
        user_id: UserId::new(row.get::<_, String>(1)?),
        goal_name: row.get(2)?,
        target_amount: read_decimal(row, 3)?,
        current_amount: read_decimal(row, 4)?,
        deadline: row.get(5)?,
        created_at: OffsetDateTime::from_unix_timestamp(created_at).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Integer,
                Box::new(error),
            )
        })?,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        goal::{
            FinancialGoal, create_goal, delete_goal, get_goal, get_goals_for_user, latest_goal,
            update_goal,
        },
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
    fn create_succeeds() {
        let conn = get_test_connection();

        let goal = create_goal(
            &user(),
            FinancialGoal::build("Vacation", dec!(2000), dec!(150.25), date!(2025 - 06 - 01)),
            &conn,
        )
        .unwrap();

        assert_eq!(get_goal(&user(), goal.id, &conn), Ok(goal));
    }

    #[test]
    fn create_rejects_invalid_fields() {
        let conn = get_test_connection();
        let deadline = date!(2025 - 06 - 01);

        assert_eq!(
            create_goal(
                &user(),
                FinancialGoal::build("V", dec!(2000), dec!(0), deadline),
                &conn
            ),
            Err(Error::InvalidGoalName("V".to_owned()))
        );
        assert_eq!(
            create_goal(
                &user(),
                FinancialGoal::build("Vacation", Decimal::ZERO, dec!(0), deadline),
                &conn
            ),
            Err(Error::NonPositiveAmount(Decimal::ZERO))
        );
        assert_eq!(
            create_goal(
                &user(),
                FinancialGoal::build("Vacation", dec!(2000), dec!(-1), deadline),
                &conn
            ),
            Err(Error::NegativeAmount(dec!(-1)))
        );
        assert_eq!(
            create_goal(
                &user(),
                FinancialGoal::build("Vacation", Decimal::MAX, dec!(0), deadline),
                &conn
            ),
            Err(Error::AmountTooLarge(Decimal::MAX))
        );
    }

    #[test]
    fn list_is_newest_first() {
        let conn = get_test_connection();
        let deadline = date!(2025 - 06 - 01);
        let first = create_goal(
            &user(),
            FinancialGoal::build("Car", dec!(1), dec!(0), deadline),
            &conn,
        )
        .unwrap();
        let second = create_goal(
            &user(),
            FinancialGoal::build("House", dec!(1), dec!(0), deadline),
            &conn,
        )
        .unwrap();

        let goals = get_goals_for_user(&user(), &conn).unwrap();

        assert_eq!(goals, vec![second.clone(), first]);
        assert_eq!(latest_goal(&user(), &conn), Ok(Some(second)));
    }

    #[test]
    fn latest_goal_is_none_without_goals() {
        let conn = get_test_connection();

        assert_eq!(latest_goal(&user(), &conn), Ok(None));
    }

    #[test]
    fn update_replaces_fields() {
        let conn = get_test_connection();
        let goal = create_goal(
            &user(),
            FinancialGoal::build("Car", dec!(100), dec!(0), date!(2025 - 06 - 01)),
            &conn,
        )
        .unwrap();

        let updated = update_goal(
            &user(),
            goal.id,
            FinancialGoal::build("New car", dec!(200), dec!(50), date!(2026 - 01 - 01)),
            &conn,
        )
        .unwrap();

        assert_eq!(updated.goal_name, "New car");
        assert_eq!(updated.current_amount, dec!(50));
        assert_eq!(updated.deadline, date!(2026 - 01 - 01));
        assert_eq!(updated.created_at, goal.created_at);
    }

    #[test]
    fn update_and_delete_fail_on_missing_goal() {
        let conn = get_test_connection();

        assert_eq!(
            update_goal(
                &user(),
                7,
                FinancialGoal::build("Car", dec!(100), dec!(0), date!(2025 - 06 - 01)),
                &conn
            ),
            Err(Error::UpdateMissingGoal)
        );
        assert_eq!(delete_goal(&user(), 7, &conn), Err(Error::DeleteMissingGoal));
    }
}

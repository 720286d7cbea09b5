//! Database set up and helpers shared by the table modules.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction,
    types::{Type, ValueRef},
};
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};

use crate::{
    Error, budget::create_budget_table, goal::create_goal_table,
    profile::create_user_profile_table, transaction::create_transaction_table,
};

/// Create all the tables for the domain models.
///
/// The tables are created inside a single exclusive SQL transaction, so a
/// failure leaves the database untouched.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_goal_table(&transaction)?;
    create_user_profile_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the lock for the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub(crate) fn lock_connection(
    connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}

/// Read a column as text regardless of how SQLite stored it, or `None` for NULL.
pub(crate) fn read_text(row: &Row, index: usize) -> Result<Option<String>, rusqlite::Error> {
    let text = match row.get_ref(index)? {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    };

    Ok(text)
}

/// The current UTC time truncated to whole seconds, the resolution creation
/// times are stored with.
pub(crate) fn now_to_the_second() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - Duration::nanoseconds(i64::from(now.nanosecond()))
}

/// Read a decimal that this application wrote as text.
pub(crate) fn read_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    text.trim().parse::<Decimal>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

use crate::{
    Error,
    category::validate_category,
    currency::{MAX_AMOUNT, check_amount_limit},
    database_id::TransactionId,
    db::{now_to_the_second, read_text},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money that was earned, e.g. a salary payment.
    Income,
    /// Money that was spent, e.g. rent or groceries.
    Expense,
}

impl TransactionType {
    /// The lowercase name used in the database and JSON bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(Error::InvalidTransactionType(other.to_owned())),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserId,
    /// The amount of money spent or earned, always a positive value.
    ///
    /// Whether the money was spent or earned is recorded by `kind`.
    pub amount: Decimal,
    /// Whether this transaction is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// A free-text label such as "Food" or "Salary".
    pub category: String,
    /// When the transaction happened.
    ///
    /// This is `None` only for stored records whose date is missing or
    /// malformed. Such transactions never match a period filter.
    pub date: Option<Date>,
    /// An optional free-text note.
    pub note: Option<String>,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        amount: Decimal,
        kind: TransactionType,
        category: &str,
        date: Date,
    ) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            kind,
            category: category.to_owned(),
            date,
            note: None,
        }
    }
}

/// The user-editable fields of a [Transaction].
///
/// Used both to create a transaction and to replace the fields of an existing
/// one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionBuilder {
    /// The amount of money spent or earned, must be greater than zero.
    pub amount: Decimal,
    /// Whether this transaction is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// A free-text label such as "Food" or "Salary".
    pub category: String,
    /// When the transaction happened.
    pub date: Date,
    /// An optional free-text note.
    #[serde(default)]
    pub note: Option<String>,
}

impl TransactionBuilder {
    /// Set the note for the transaction.
    pub fn note(mut self, note: &str) -> Self {
        self.note = Some(note.to_owned());
        self
    }

    /// Check the fields and normalise the note.
    ///
    /// Notes are trimmed and blank notes are dropped.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NonPositiveAmount] if the amount is zero or negative,
    /// - [Error::AmountTooLarge] if the amount is over [MAX_AMOUNT],
    /// - or [Error::InvalidCategory] if the category is too short.
    pub fn validate(mut self) -> Result<Self, Error> {
        if self.amount <= Decimal::ZERO {
            return Err(Error::NonPositiveAmount(self.amount));
        }
        check_amount_limit(self.amount)?;

        validate_category(&self.category)?;

        self.note = self
            .note
            .map(|note| note.trim().to_owned())
            .filter(|note| !note.is_empty());

        Ok(self)
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] or [Error::InvalidCategory] if the builder is invalid,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: &UserId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let builder = builder.validate()?;
    let created_at = now_to_the_second();

    connection.execute(
        "INSERT INTO \"transaction\" (user_id, amount, type, category, date, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id.as_str(),
            builder.amount.to_string(),
            builder.kind.as_str(),
            builder.category,
            builder.date.to_string(),
            builder.note,
            created_at.unix_timestamp(),
        ],
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        user_id: user_id.clone(),
        amount: builder.amount,
        kind: builder.kind,
        category: builder.category,
        date: Some(builder.date),
        note: builder.note,
        created_at,
    })
}

/// Retrieve one of `user_id`'s transactions by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a readable transaction owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    user_id: &UserId,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, type, category, date, note, created_at
             FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row(params![id, user_id.as_str()], map_transaction_row)?
        .ok_or(Error::NotFound)
}

/// Retrieve all of `user_id`'s transactions in the order they were created.
///
/// Rows with an unknown type are skipped, rows with a missing or malformed
/// amount are read as zero and rows with a missing or malformed date are
/// returned without a date. Each of these cases is logged as a warning.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transactions_for_user(
    user_id: &UserId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(
            "SELECT id, user_id, amount, type, category, date, note, created_at
             FROM \"transaction\" WHERE user_id = ?1 ORDER BY id ASC",
        )?
        .query_map([user_id.as_str()], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();

    Ok(transactions)
}

/// Replace the editable fields of one of `user_id`'s transactions.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] or [Error::InvalidCategory] if the builder is invalid,
/// - [Error::UpdateMissingTransaction] if the transaction does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    user_id: &UserId,
    id: TransactionId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let builder = builder.validate()?;

    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
         SET amount = ?1, type = ?2, category = ?3, date = ?4, note = ?5
         WHERE id = ?6 AND user_id = ?7",
        params![
            builder.amount.to_string(),
            builder.kind.as_str(),
            builder.category,
            builder.date.to_string(),
            builder.note,
            id,
            user_id.as_str(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    get_transaction(user_id, id, connection)
}

/// Delete one of `user_id`'s transactions.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if the transaction does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    user_id: &UserId,
    id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        params![id, user_id.as_str()],
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Create the transaction table in the database.
///
/// The amount, date and created at columns are nullable so that records
/// written by other clients can be read back defensively.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                amount TEXT,
                type TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT,
                note TEXT,
                created_at INTEGER
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user ON \"transaction\"(user_id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction, or `None` if the row has an unknown type.
fn map_transaction_row(row: &Row) -> Result<Option<Transaction>, rusqlite::Error> {
    let id: TransactionId = row.get(0)?;
    let user_id: String = row.get(1)?;

    let raw_kind = read_text(row, 3)?.unwrap_or_default();
    let Ok(kind) = raw_kind.parse::<TransactionType>() else {
        tracing::warn!("skipping transaction {id}: unknown transaction type {raw_kind:?}");
        return Ok(None);
    };

    Ok(Some(Transaction {
        id,
        user_id: UserId::new(user_id),
        amount: parse_amount(id, read_text(row, 2)?),
        kind,
        category: read_text(row, 4)?.unwrap_or_default(),
        date: parse_date(id, read_text(row, 5)?),
        note: read_text(row, 6)?,
        created_at: parse_created_at(id, read_text(row, 7)?),
    }))
}

fn parse_amount(id: TransactionId, raw_amount: Option<String>) -> Decimal {
    match raw_amount.as_deref().map(str::trim) {
        None | Some("") => {
            tracing::warn!("transaction {id} has no amount, treating it as zero");
            Decimal::ZERO
        }
        Some(text) => match text.parse::<Decimal>() {
            Ok(amount) if amount.abs() <= MAX_AMOUNT => amount,
            Ok(amount) => {
                tracing::warn!("transaction {id} has an out of range amount {amount}, treating it as zero");
                Decimal::ZERO
            }
            Err(error) => {
                tracing::warn!("transaction {id} has a malformed amount {text:?} ({error}), treating it as zero");
                Decimal::ZERO
            }
        },
    }
}

/// Accepts plain dates ("2024-07-05") and RFC 3339 timestamps.
fn parse_date(id: TransactionId, raw_date: Option<String>) -> Option<Date> {
    let Some(text) = raw_date else {
        tracing::warn!("transaction {id} has no date, excluding it from period filters");
        return None;
    };
    let text = text.trim();

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .or_else(|_| OffsetDateTime::parse(text, &Rfc3339).map(|date_time| date_time.date()))
        .inspect_err(|error| {
            tracing::warn!(
                "transaction {id} has a malformed date {text:?} ({error}), excluding it from period filters"
            )
        })
        .ok()
}

fn parse_created_at(id: TransactionId, raw_timestamp: Option<String>) -> OffsetDateTime {
    let parsed = raw_timestamp.as_deref().map(str::trim).and_then(|text| {
        match text.parse::<i64>() {
            Ok(seconds) => OffsetDateTime::from_unix_timestamp(seconds).ok(),
            Err(_) => OffsetDateTime::parse(text, &Rfc3339).ok(),
        }
    });

    parsed.unwrap_or_else(|| {
        tracing::warn!("transaction {id} has a missing or malformed creation time");
        OffsetDateTime::UNIX_EPOCH
    })
}

// ============================================================================
// TESTS
// ============================================================================

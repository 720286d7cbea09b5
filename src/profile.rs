//! User settings: a display name and the currency amounts are shown in.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, currency::Currency, db::lock_connection, user::UserId};

const MIN_NAME_LENGTH: usize = 2;

/// A user's settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    /// The user the settings belong to.
    pub user_id: UserId,
    /// The user's display name, empty until they set one.
    pub name: String,
    /// The currency the user's amounts are shown in.
    pub currency: Currency,
}

/// The user-editable fields of a [UserProfile].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    /// The user's display name, at least two characters.
    pub name: String,
    /// The currency the user's amounts are shown in.
    pub currency: Currency,
}

/// Get `user_id`'s settings. Users who have never saved their settings get an
/// empty name and `default_currency`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_profile(
    user_id: &UserId,
    default_currency: Currency,
    connection: &Connection,
) -> Result<UserProfile, Error> {
    let stored = connection
        .query_row(
            "SELECT name, currency FROM user_profile WHERE user_id = ?1",
            [user_id.as_str()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((name, raw_currency)) = stored else {
        return Ok(UserProfile {
            user_id: user_id.clone(),
            name: String::new(),
            currency: default_currency,
        });
    };

    let currency = raw_currency.parse::<Currency>().unwrap_or_else(|error| {
        tracing::warn!("profile for {user_id} has {error}, using {default_currency}");
        default_currency
    });

    Ok(UserProfile {
        user_id: user_id.clone(),
        name,
        currency,
    })
}

/// Save `user_id`'s settings, creating them if needed.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidProfileName] if the name is too short,
/// - or [Error::SqlError] if there is an SQL error.
pub fn upsert_profile(
    user_id: &UserId,
    update: ProfileUpdate,
    connection: &Connection,
) -> Result<UserProfile, Error> {
    let name = update.name.trim();
    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(Error::InvalidProfileName(update.name));
    }

    connection.execute(
        "INSERT INTO user_profile (user_id, name, currency) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET name = excluded.name, currency = excluded.currency",
        params![user_id.as_str(), name, update.currency.code()],
    )?;

    Ok(UserProfile {
        user_id: user_id.clone(),
        name: name.to_owned(),
        currency: update.currency,
    })
}

/// Create the user profile table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_user_profile_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_profile (
                user_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                currency TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// The state needed to read and save user settings.
#[derive(Debug, Clone)]
pub struct ProfileState {
    /// The database connection for user settings.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The currency for users who have not picked one.
    pub default_currency: Currency,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            default_currency: state.default_currency,
        }
    }
}

/// Get the user's settings.
pub async fn get_settings_endpoint(
    State(state): State<ProfileState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserProfile>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_profile(&user_id, state.default_currency, &connection).map(Json)
}

/// Save the user's settings, responds with the saved settings.
pub async fn update_settings_endpoint(
    State(state): State<ProfileState>,
    Path(user_id): Path<UserId>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    upsert_profile(&user_id, update, &connection)
        .inspect_err(|error| tracing::warn!("could not save settings for {user_id}: {error}"))
        .map(Json)
}

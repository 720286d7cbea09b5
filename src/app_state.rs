//! Implements a struct that holds the state of the REST server.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;

use crate::{
    Error,
    cache::AggregateCache,
    currency::Currency,
    db::initialize,
    insights::{DisabledInsightGenerator, InsightGenerator},
    timezone::get_local_offset,
};

/// How long to wait for the insight service unless configured otherwise.
pub const DEFAULT_INSIGHTS_TIMEOUT: Duration = Duration::from_secs(30);

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,

    /// The currency for users who have not picked one in their settings.
    pub default_currency: Currency,

    /// Memoized aggregates for the dashboard and analytics.
    pub aggregate_cache: AggregateCache,

    /// The service that writes spending insights.
    pub insight_generator: Arc<dyn InsightGenerator>,

    /// How long to wait for the insight service.
    pub insights_timeout: Duration,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Asia/Kolkata".
    /// Insights are disabled until a generator is set with
    /// [AppState::with_insight_generator].
    ///
    /// # Errors
    /// Returns an error if the timezone is not recognised or if the database
    /// cannot be initialized.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        default_currency: Currency,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(local_timezone.to_owned()));
        }

        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            local_timezone: local_timezone.to_owned(),
            default_currency,
            aggregate_cache: AggregateCache::default(),
            insight_generator: Arc::new(DisabledInsightGenerator),
            insights_timeout: DEFAULT_INSIGHTS_TIMEOUT,
        })
    }

    /// Use `insight_generator` to write spending insights.
    pub fn with_insight_generator(mut self, insight_generator: Arc<dyn InsightGenerator>) -> Self {
        self.insight_generator = insight_generator;
        self
    }

    /// Wait at most `timeout` for the insight service.
    pub fn with_insights_timeout(mut self, timeout: Duration) -> Self {
        self.insights_timeout = timeout;
        self
    }
}

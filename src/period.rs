//! Selects the transactions that fall within a calendar month or year.
//!
//! Periods are compared on calendar dates only. The caller decides what
//! "today" is, normally via [crate::local_today] in the server's timezone.

use time::{Date, Month};

use crate::{Error, transaction::Transaction};

/// A calendar month or a calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// A single calendar month.
    Month {
        /// The calendar year.
        year: i32,
        /// The month of `year`.
        month: Month,
    },
    /// A whole calendar year.
    Year(i32),
}

/// The half-open date range `[start, end)` covered by a [Period].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    /// The first date in the range.
    pub start: Date,
    /// The first date after the range.
    pub end: Date,
}

impl Period {
    /// Build a period from a year and an optional 0-indexed month, where 0 is
    /// January. Without a month the period is the whole year.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if `month_index` is greater than 11.
    pub fn from_query(year: i32, month_index: Option<u8>) -> Result<Self, Error> {
        let Some(index) = month_index else {
            return Ok(Self::Year(year));
        };

        let month = index
            .checked_add(1)
            .and_then(|number| Month::try_from(number).ok())
            .ok_or(Error::InvalidMonth(index))?;

        Ok(Self::Month { year, month })
    }

    /// The month that contains `today`.
    pub fn current_month(today: Date) -> Self {
        Self::Month {
            year: today.year(),
            month: today.month(),
        }
    }

    /// Whether `date` falls within the period.
    pub fn contains(&self, date: Date) -> bool {
        match *self {
            Self::Month { year, month } => date.year() == year && date.month() == month,
            Self::Year(year) => date.year() == year,
        }
    }

    /// The half-open date range of the period.
    ///
    /// Returns `None` when the period starts or ends outside of the dates
    /// that [Date] can represent.
    pub fn range(&self) -> Option<PeriodRange> {
        match *self {
            Self::Month { year, month } => {
                let start = Date::from_calendar_date(year, month, 1).ok()?;
                let (end_year, end_month) = match month {
                    Month::December => (year.checked_add(1)?, Month::January),
                    other => (year, other.next()),
                };
                let end = Date::from_calendar_date(end_year, end_month, 1).ok()?;

                Some(PeriodRange { start, end })
            }
            Self::Year(year) => {
                let start = Date::from_calendar_date(year, Month::January, 1).ok()?;
                let end = Date::from_calendar_date(year.checked_add(1)?, Month::January, 1).ok()?;

                Some(PeriodRange { start, end })
            }
        }
    }
}

impl PeriodRange {
    /// Whether `date` is on or after `start` and before `end`.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date < self.end
    }
}

/// Get the transactions dated within `period`, in their original order.
///
/// Transactions without a date are never part of a period.
pub fn filter_by_period(transactions: &[Transaction], period: Period) -> Vec<&Transaction> {
    transactions
        .iter()
        .filter(|transaction| transaction.date.is_some_and(|date| period.contains(date)))
        .collect()
}

/// Get the transactions dated from the first of `today`'s month up to and
/// including `today`.
pub fn filter_month_to_date(transactions: &[Transaction], today: Date) -> Vec<&Transaction> {
    let this_month = Period::current_month(today);

    transactions
        .iter()
        .filter(|transaction| {
            transaction
                .date
                .is_some_and(|date| date <= today && this_month.contains(date))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::{Month, OffsetDateTime, macros::date};

    use crate::{
        Error,
        period::{Period, PeriodRange, filter_by_period, filter_month_to_date},
        transaction::{Transaction, TransactionType},
        user::UserId,
    };

    fn transaction(id: i64, date: Option<time::Date>) -> Transaction {
        Transaction {
            id,
            user_id: UserId::new("user-1"),
            amount: dec!(10),
            kind: TransactionType::Expense,
            category: "Food".to_owned(),
            date,
            note: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn month_index_is_zero_based() {
        assert_eq!(
            Period::from_query(2024, Some(0)),
            Ok(Period::Month {
                year: 2024,
                month: Month::January
            })
        );
        assert_eq!(
            Period::from_query(2024, Some(11)),
            Ok(Period::Month {
                year: 2024,
                month: Month::December
            })
        );
    }

    #[test]
    fn missing_month_selects_whole_year() {
        assert_eq!(Period::from_query(2023, None), Ok(Period::Year(2023)));
    }

    #[test]
    fn month_index_out_of_range_is_rejected() {
        assert_eq!(Period::from_query(2024, Some(12)), Err(Error::InvalidMonth(12)));
        assert_eq!(
            Period::from_query(2024, Some(u8::MAX)),
            Err(Error::InvalidMonth(u8::MAX))
        );
    }

    #[test]
    fn december_range_ends_at_next_new_year() {
        let period = Period::Month {
            year: 2024,
            month: Month::December,
        };

        assert_eq!(
            period.range(),
            Some(PeriodRange {
                start: date!(2024 - 12 - 01),
                end: date!(2025 - 01 - 01),
            })
        );
    }

    #[test]
    fn range_is_half_open() {
        let range = Period::Month {
            year: 2024,
            month: Month::February,
        }
        .range()
        .unwrap();

        assert!(range.contains(date!(2024 - 02 - 01)));
        assert!(range.contains(date!(2024 - 02 - 29)));
        assert!(!range.contains(date!(2024 - 03 - 01)));
    }

    #[test]
    fn filter_keeps_boundaries_and_order() {
        let transactions = vec![
            transaction(1, Some(date!(2024 - 07 - 31))),
            transaction(2, Some(date!(2024 - 06 - 30))),
            transaction(3, Some(date!(2024 - 07 - 01))),
            transaction(4, Some(date!(2024 - 08 - 01))),
        ];
        let july = Period::Month {
            year: 2024,
            month: Month::July,
        };

        let ids: Vec<_> = filter_by_period(&transactions, july)
            .iter()
            .map(|transaction| transaction.id)
            .collect();

        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn filter_excludes_undated_transactions() {
        let transactions = vec![transaction(1, None), transaction(2, Some(date!(2024 - 03 - 15)))];

        let filtered = filter_by_period(&transactions, Period::Year(2024));

        assert_eq!(filtered, vec![&transactions[1]]);
    }

    #[test]
    fn filter_of_empty_input_is_empty() {
        assert!(filter_by_period(&[], Period::Year(2024)).is_empty());
    }

    #[test]
    fn month_to_date_stops_at_today() {
        let transactions = vec![
            transaction(1, Some(date!(2024 - 07 - 01))),
            transaction(2, Some(date!(2024 - 07 - 15))),
            transaction(3, Some(date!(2024 - 07 - 16))),
            transaction(4, Some(date!(2024 - 06 - 30))),
        ];

        let ids: Vec<_> = filter_month_to_date(&transactions, date!(2024 - 07 - 15))
            .iter()
            .map(|transaction| transaction.id)
            .collect();

        assert_eq!(ids, vec![1, 2]);
    }
}

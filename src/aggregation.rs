//! Reduces transaction lists into income and expense totals, per-category
//! spending and the monthly series used by the dashboard and analytics charts.
//!
//! Every function here is a pure fold over its input: the same transactions
//! always produce the same totals, regardless of their order. Sums saturate at
//! the bounds of [Decimal] instead of overflowing.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, Month};

use crate::transaction::{Transaction, TransactionType};

/// The totals of a set of transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    /// The sum of all income amounts.
    pub total_income: Decimal,
    /// The sum of all expense amounts.
    pub total_expense: Decimal,
    /// The sum of expense amounts per category. Only categories with at least
    /// one expense have an entry.
    pub by_category: HashMap<String, Decimal>,
}

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    /// The category label.
    pub category: String,
    /// The total expense amount for the category.
    pub amount: Decimal,
}

impl Aggregate {
    /// Sum `transactions` into income, expense and per-category expense totals.
    pub fn from_transactions<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut aggregate = Self::default();

        for transaction in transactions {
            match transaction.kind {
                TransactionType::Income => {
                    aggregate.total_income =
                        aggregate.total_income.saturating_add(transaction.amount);
                }
                TransactionType::Expense => {
                    aggregate.total_expense =
                        aggregate.total_expense.saturating_add(transaction.amount);
                    let category_total = aggregate
                        .by_category
                        .entry(transaction.category.clone())
                        .or_default();
                    *category_total = category_total.saturating_add(transaction.amount);
                }
            }
        }

        aggregate
    }

    /// Income minus expenses.
    pub fn net(&self) -> Decimal {
        self.total_income.saturating_sub(self.total_expense)
    }

    /// The per-category totals, largest first. Equal amounts are ordered by
    /// category name.
    pub fn categories_by_amount(&self) -> Vec<CategoryTotal> {
        let mut totals: Vec<_> = self
            .by_category
            .iter()
            .map(|(category, amount)| CategoryTotal {
                category: category.clone(),
                amount: *amount,
            })
            .collect();

        totals.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.category.cmp(&b.category))
        });

        totals
    }
}

/// The running balance over the user's entire history, i.e. all income minus
/// all expenses, including transactions with no date.
pub fn net_balance(transactions: &[Transaction]) -> Decimal {
    Aggregate::from_transactions(transactions).net()
}

/// Income and expense totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTotals {
    /// The calendar year.
    pub year: i32,
    /// The month number, 1 for January.
    pub month: u8,
    /// The three letter month name, e.g. "Jan".
    pub label: &'static str,
    /// The sum of income amounts in the month.
    pub income: Decimal,
    /// The sum of expense amounts in the month.
    pub expense: Decimal,
}

impl MonthlyTotals {
    fn empty(year: i32, month: Month) -> Self {
        Self {
            year,
            month: month as u8,
            label: month_label(month),
            income: Decimal::ZERO,
            expense: Decimal::ZERO,
        }
    }

    fn add(&mut self, transaction: &Transaction) {
        match transaction.kind {
            TransactionType::Income => self.income = self.income.saturating_add(transaction.amount),
            TransactionType::Expense => {
                self.expense = self.expense.saturating_add(transaction.amount)
            }
        }
    }
}

/// The income and expense totals for each of the twelve months of `year`,
/// January first.
pub fn yearly_overview(transactions: &[Transaction], year: i32) -> Vec<MonthlyTotals> {
    let mut months: Vec<_> = (1..=12u8)
        .filter_map(|number| Month::try_from(number).ok())
        .map(|month| MonthlyTotals::empty(year, month))
        .collect();

    for transaction in transactions {
        let Some(date) = transaction.date else {
            continue;
        };

        if date.year() == year {
            months[usize::from(date.month() as u8 - 1)].add(transaction);
        }
    }

    months
}

/// The income and expense totals for the `count` months ending with the month
/// of `today`, oldest first.
pub fn trailing_months(transactions: &[Transaction], today: Date, count: u8) -> Vec<MonthlyTotals> {
    let current = month_index(today.year(), today.month());

    let mut months: Vec<_> = (0..i64::from(count))
        .rev()
        .filter_map(|offset| from_month_index(current - offset))
        .map(|(year, month)| MonthlyTotals::empty(year, month))
        .collect();

    for transaction in transactions {
        let Some(date) = transaction.date else {
            continue;
        };

        if let Some(totals) = months
            .iter_mut()
            .find(|totals| totals.year == date.year() && totals.month == date.month() as u8)
        {
            totals.add(transaction);
        }
    }

    months
}

/// The `limit` most recent transactions by date, newest first.
///
/// Transactions on the same date are ordered newest created first, and
/// transactions with no date come last.
pub fn recent_transactions(transactions: &[Transaction], limit: usize) -> Vec<&Transaction> {
    let mut recent: Vec<_> = transactions.iter().collect();

    recent.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    recent.truncate(limit);

    recent
}

/// The distinct years that have at least one dated transaction, newest first.
pub fn available_years(transactions: &[Transaction]) -> Vec<i32> {
    transactions
        .iter()
        .filter_map(|transaction| transaction.date.map(|date| date.year()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .rev()
        .collect()
}

/// Formats a month as a three-letter abbreviation, e.g. "Jan".
pub(crate) fn month_label(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

fn month_index(year: i32, month: Month) -> i64 {
    i64::from(year) * 12 + i64::from(month as u8) - 1
}

fn from_month_index(index: i64) -> Option<(i32, Month)> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u8::try_from(index.rem_euclid(12) + 1).ok()?;

    Some((year, Month::try_from(month).ok()?))
}

//! Currency codes and display formatting for monetary amounts.
//!
//! Amounts are only rounded here, at the presentation edge. Aggregation
//! always works on the exact decimal values.

use std::{fmt::Display, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The largest amount accepted for a transaction, budget limit or goal:
/// one quadrillion.
///
/// About 79 trillion amounts this size still sum within [Decimal::MAX].
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Check that `amount` is no larger than [MAX_AMOUNT].
///
/// # Errors
/// Returns [Error::AmountTooLarge] if it is.
pub fn check_amount_limit(amount: Decimal) -> Result<(), Error> {
    if amount > MAX_AMOUNT {
        return Err(Error::AmountTooLarge(amount));
    }

    Ok(())
}

/// The currencies a user can choose to display amounts in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Indian rupee, the default.
    #[default]
    Inr,
    /// United States dollar.
    Usd,
    /// Euro.
    Eur,
}

impl Currency {
    /// The ISO 4217 code, e.g. "INR".
    pub fn code(self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }

    /// The symbol placed before formatted amounts.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Inr => "₹",
            Self::Usd => "$",
            Self::Eur => "€",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::Inr),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            _ => Err(Error::InvalidCurrency(s.to_owned())),
        }
    }
}

/// Format `amount` for display, e.g. "₹12,34,567.50".
///
/// Amounts are rounded half away from zero to two decimal places. Digits are
/// grouped the Indian way (thousands, then lakhs and crores) for every
/// currency, matching the locale the app is presented in.
pub fn format_currency(amount: Decimal, currency: Currency) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = format!("{:.2}", rounded.abs());
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    format!(
        "{sign}{}{}.{fraction}",
        currency.symbol(),
        group_digits(whole)
    )
}

fn group_digits(whole: &str) -> String {
    if whole.len() <= 3 {
        return whole.to_owned();
    }

    let (head, tail) = whole.split_at(whole.len() - 3);

    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{tail}", groups.join(","))
}

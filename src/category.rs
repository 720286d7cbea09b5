//! Validation for the free-text category labels shared by transactions and budgets.
//!
//! Budgets are matched against transactions by exact string comparison, so
//! labels are stored exactly as submitted.

use crate::Error;

/// The minimum number of characters in a category label, ignoring surrounding whitespace.
pub const MIN_CATEGORY_LENGTH: usize = 2;

/// Check that `category` is long enough to be a meaningful label.
///
/// # Errors
/// Returns [Error::InvalidCategory] if the trimmed label has fewer than
/// [MIN_CATEGORY_LENGTH] characters.
pub fn validate_category(category: &str) -> Result<(), Error> {
    if category.trim().chars().count() < MIN_CATEGORY_LENGTH {
        return Err(Error::InvalidCategory(category.to_owned()));
    }

    Ok(())
}

//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of a [Transaction](crate::Transaction).
pub type TransactionId = DatabaseId;

/// The ID of a [Budget](crate::Budget).
pub type BudgetId = DatabaseId;

/// The ID of a [FinancialGoal](crate::FinancialGoal).
pub type GoalId = DatabaseId;

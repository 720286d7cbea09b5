//! The API endpoints URIs.
//!
//! For endpoints that take parameters, e.g., '/api/users/{user_id}/goals', use [format_endpoint].

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route to list and create a user's transactions.
pub const TRANSACTIONS: &str = "/api/users/{user_id}/transactions";
/// The route to get, replace and delete a single transaction.
pub const TRANSACTION: &str = "/api/users/{user_id}/transactions/{transaction_id}";
/// The route to list and create a user's budgets.
pub const BUDGETS: &str = "/api/users/{user_id}/budgets";
/// The route to replace and delete a single budget.
pub const BUDGET: &str = "/api/users/{user_id}/budgets/{budget_id}";
/// The route to list and create a user's savings goals.
pub const GOALS: &str = "/api/users/{user_id}/goals";
/// The route to replace and delete a single savings goal.
pub const GOAL: &str = "/api/users/{user_id}/goals/{goal_id}";
/// The route for the dashboard summary.
pub const DASHBOARD: &str = "/api/users/{user_id}/dashboard";
/// The route for the analytics chart data.
pub const ANALYTICS: &str = "/api/users/{user_id}/analytics";
/// The route for AI spending insights.
pub const INSIGHTS: &str = "/api/users/{user_id}/insights";
/// The route for a user's settings.
pub const SETTINGS: &str = "/api/users/{user_id}/settings";

/// Replace the parameters in `endpoint_path` with `values`, in order.
///
/// A parameter is a string that starts with a left brace and ends with a
/// right brace. For example, in the endpoint path '/api/users/{user_id}',
/// '{user_id}' is the parameter.
///
/// Parameters without a matching value are left as they are.
pub fn format_endpoint(endpoint_path: &str, values: &[&str]) -> String {
    let mut formatted = String::with_capacity(endpoint_path.len());
    let mut rest = endpoint_path;
    let mut values = values.iter();

    while let Some(start) = rest.find('{') {
        let Some(length) = rest[start..].find('}') else {
            break;
        };
        let Some(value) = values.next() else {
            break;
        };

        formatted.push_str(&rest[..start]);
        formatted.push_str(value);
        rest = &rest[start + length + 1..];
    }

    formatted.push_str(rest);
    formatted
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::COFFEE);

        for endpoint in [
            endpoints::TRANSACTIONS,
            endpoints::TRANSACTION,
            endpoints::BUDGETS,
            endpoints::BUDGET,
            endpoints::GOALS,
            endpoints::GOAL,
            endpoints::DASHBOARD,
            endpoints::ANALYTICS,
            endpoints::INSIGHTS,
            endpoints::SETTINGS,
        ] {
            assert_endpoint_is_valid_uri(&format_endpoint(endpoint, &["user-1", "42"]));
        }
    }

    #[test]
    fn format_endpoint_replaces_parameters_in_order() {
        assert_eq!(
            format_endpoint(endpoints::TRANSACTION, &["user-1", "42"]),
            "/api/users/user-1/transactions/42"
        );
    }

    #[test]
    fn format_endpoint_leaves_unmatched_parameters() {
        assert_eq!(
            format_endpoint(endpoints::GOAL, &["user-1"]),
            "/api/users/user-1/goals/{goal_id}"
        );
    }

    #[test]
    fn format_endpoint_without_parameters_is_unchanged() {
        assert_eq!(format_endpoint(endpoints::COFFEE, &["1"]), endpoints::COFFEE);
    }
}

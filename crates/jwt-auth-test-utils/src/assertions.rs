//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for gateway outcomes and counters.

use jwt_auth::errors::AuthError;
use jwt_auth::gateway::AuthOutcome;
use jwt_auth::observability::metrics::AuthMetrics;

/// Custom assertions for authentication outcomes
///
/// # Example
/// ```rust,ignore
/// gateway
///     .authenticate(Some(&header))
///     .assert_success("impala");
/// ```
pub trait OutcomeAssertions {
    /// Assert that authentication succeeded with the given identity
    fn assert_success(&self, identity: &str) -> &Self;

    /// Assert that authentication failed with exactly this error
    fn assert_failure(&self, expected: &AuthError) -> &Self;

    /// Assert that authentication failed with one of the given errors
    fn assert_failure_in(&self, expected: &[AuthError]) -> &Self;

    /// Assert that the JWT mechanism did not attempt authentication
    fn assert_not_attempted(&self) -> &Self;
}

impl OutcomeAssertions for AuthOutcome {
    fn assert_success(&self, identity: &str) -> &Self {
        match self {
            AuthOutcome::Success(actual) => assert_eq!(
                actual, identity,
                "Expected identity '{}', got '{}'",
                identity, actual
            ),
            other => panic!("Expected success('{}'), got {:?}", identity, other),
        }
        self
    }

    fn assert_failure(&self, expected: &AuthError) -> &Self {
        match self {
            AuthOutcome::Failure(actual) => assert_eq!(
                actual, expected,
                "Expected failure {:?}, got {:?}",
                expected, actual
            ),
            other => panic!("Expected failure({:?}), got {:?}", expected, other),
        }
        self
    }

    fn assert_failure_in(&self, expected: &[AuthError]) -> &Self {
        match self {
            AuthOutcome::Failure(actual) => assert!(
                expected.contains(actual),
                "Expected one of {:?}, got {:?}",
                expected,
                actual
            ),
            other => panic!("Expected failure in {:?}, got {:?}", expected, other),
        }
        self
    }

    fn assert_not_attempted(&self) -> &Self {
        assert!(
            matches!(self, AuthOutcome::NotAttempted),
            "Expected not_attempted, got {:?}",
            self
        );
        self
    }
}

/// Assert both counters of an [`AuthMetrics`] at once
pub fn assert_counts(metrics: &AuthMetrics, success: u64, failure: u64) {
    assert_eq!(
        (metrics.success_count(), metrics.failure_count()),
        (success, failure),
        "Expected (success, failure) counters ({}, {})",
        success,
        failure
    );
}

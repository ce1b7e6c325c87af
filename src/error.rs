//! Error and result types.

use std::fmt;

use thiserror::Error;

/// Errors surfaced by the driver.
///
/// The engine itself surfaces no recoverable errors: a generator replaced
/// with one of a different output type while older typed state is live is a
/// programmer error and panics.
#[derive(Error, Debug)]
pub enum BriarError {
    /// A property failed with a counterexample.
    #[error("property failed after {tests_run} tests and {shrinks_performed} shrink passes: {counterexample}")]
    PropertyFailed {
        counterexample: String,
        tests_run: usize,
        shrinks_performed: usize,
    },
}

/// Result type for briar operations.
pub type Result<T> = std::result::Result<T, BriarError>;

/// Outcome of running a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    /// Every case passed.
    Pass,

    /// A case failed; the counterexample has been shrunk.
    Fail {
        counterexample: String,
        tests_run: usize,
        shrinks_performed: usize,
    },
}

impl TestResult {
    /// Whether the property passed.
    pub fn is_pass(&self) -> bool {
        matches!(self, TestResult::Pass)
    }

    /// Convert into a `Result`, so callers can use `?` in test helpers.
    pub fn into_result(self) -> Result<()> {
        match self {
            TestResult::Pass => Ok(()),
            TestResult::Fail { counterexample, tests_run, shrinks_performed } => {
                Err(BriarError::PropertyFailed { counterexample, tests_run, shrinks_performed })
            }
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestResult::Pass => write!(f, "✓ property passed"),
            TestResult::Fail { counterexample, tests_run, shrinks_performed } => {
                write!(
                    f,
                    "✗ property failed after {tests_run} tests and {shrinks_performed} shrink passes: {counterexample}"
                )
            }
        }
    }
}

impl From<BriarError> for TestResult {
    fn from(error: BriarError) -> Self {
        match error {
            BriarError::PropertyFailed { counterexample, tests_run, shrinks_performed } => {
                TestResult::Fail { counterexample, tests_run, shrinks_performed }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_round_trips_through_error() {
        let fail = TestResult::Fail {
            counterexample: "12".to_string(),
            tests_run: 3,
            shrinks_performed: 8,
        };
        let error = fail.clone().into_result().unwrap_err();
        assert_eq!(TestResult::from(error), fail);
        assert!(TestResult::Pass.into_result().is_ok());
    }

    #[test]
    fn display_mentions_the_counterexample() {
        let fail = TestResult::Fail {
            counterexample: "[2]".to_string(),
            tests_run: 1,
            shrinks_performed: 5,
        };
        assert!(fail.to_string().contains("[2]"));
        assert!(TestResult::Pass.to_string().contains("passed"));
    }
}

//! Driver configuration.

/// Configuration for running properties.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of test cases to run.
    pub test_limit: usize,

    /// Base seed for the run; a fresh entropy seed is drawn when unset.
    /// Per-case seeds are derived from it, so a fixed base seed reproduces
    /// the whole run.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config { test_limit: 100, seed: None }
    }
}

impl Config {
    /// Create a config running the given number of cases.
    pub fn with_tests(mut self, tests: usize) -> Self {
        self.test_limit = tests;
        self
    }

    /// Fix the base seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::default().with_tests(10).with_seed(99);
        assert_eq!(config.test_limit, 10);
        assert_eq!(config.seed, Some(99));
    }
}

//! Property definitions and the test driver.

use std::fmt::Debug;
use std::rc::Rc;

use log::debug;

use crate::data::Config;
use crate::error::TestResult;
use crate::gen::Gen;
use crate::random::RandomSource;
use crate::rose::Rose;

/// A property: a generator of inputs and a predicate over them.
pub struct Property<T> {
    generator: Gen<T>,
    predicate: Rc<dyn Fn(&T) -> bool>,
}

impl<T> Property<T>
where
    T: Clone + Debug + 'static,
{
    /// Create a property from a generator and a predicate.
    pub fn new<F>(generator: Gen<T>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Property { generator, predicate: Rc::new(predicate) }
    }

    /// Run the property under the given configuration.
    ///
    /// Each case owns a fresh tree and random source. On the first failing
    /// case the counterexample is shrunk to fixpoint and reported.
    pub fn run(&self, config: &Config) -> TestResult {
        let base_seed = config.seed.unwrap_or_else(RandomSource::entropy_seed);
        let outcome = self.as_outcome();

        for case in 0..config.test_limit {
            let seed = RandomSource::case_seed(base_seed, case);
            let mut rose = Rose::with_seed(seed);
            if rose.generate(&outcome) {
                continue;
            }

            debug!("case {case} failed with seed {seed}, shrinking");
            let shrink = rose.shrink(&outcome);
            let counterexample = rose.example().join(", ");
            debug!(
                "counterexample {counterexample:?} after {} passes (accepted any: {})",
                shrink.tries, shrink.success
            );
            return TestResult::Fail {
                counterexample,
                tests_run: case + 1,
                shrinks_performed: shrink.tries,
            };
        }

        TestResult::Pass
    }

    /// The property as a generator of its own outcome: producing picks the
    /// input as a child of the current node and applies the predicate, so
    /// the input shrinks at its own site while the outcome is re-evaluated.
    fn as_outcome(&self) -> Gen<bool> {
        let generator = self.generator.clone();
        let predicate = Rc::clone(&self.predicate);
        Gen::new(move |ctx| {
            let input = ctx.pick(&generator);
            predicate(&input)
        })
        .named("property")
    }
}

/// Create a property asserting `predicate` for all generated inputs.
pub fn for_all<T, F>(generator: Gen<T>, predicate: F) -> Property<T>
where
    T: Clone + Debug + 'static,
    F: Fn(&T) -> bool + 'static,
{
    Property::new(generator, predicate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_property_runs_every_case() {
        let property = for_all(Gen::int_range(0, 10), |value| (0..=10).contains(value));
        let config = Config::default().with_tests(50).with_seed(7);
        assert_eq!(property.run(&config), TestResult::Pass);
    }

    #[test]
    fn failing_property_reports_a_shrunk_counterexample() {
        let property = for_all(Gen::int_range(0, 1000), |value| *value < 10);
        let config = Config::default().with_tests(200).with_seed(7);

        match property.run(&config) {
            TestResult::Fail { counterexample, tests_run, shrinks_performed } => {
                let value: i64 = counterexample.parse().expect("integer counterexample");
                // Halving toward zero lands on the smallest failing value it
                // passes through; it still fails and sits near the boundary.
                assert!((10..20).contains(&value), "got {value}");
                assert!(tests_run >= 1);
                assert!(shrinks_performed >= 1);
            }
            other => panic!("expected failure, got {other}"),
        }
    }

    #[test]
    fn fixed_seed_reproduces_the_run() {
        let config = Config::default().with_tests(20).with_seed(1234);
        let first = for_all(Gen::int_range(0, 100), |value| *value < 50).run(&config);
        let second = for_all(Gen::int_range(0, 100), |value| *value < 50).run(&config);
        assert_eq!(first, second);
    }

    #[test]
    fn into_result_supports_question_mark() {
        fn check() -> crate::error::Result<()> {
            let config = Config::default().with_tests(10).with_seed(5);
            for_all(Gen::bool(), |value| *value || !*value).run(&config).into_result()
        }
        assert!(check().is_ok());
    }
}

use crate::core::counter::Counter;
use crate::iterators::{IterationValue, Stepped, Stepper};
use crate::Histogram;

/// An iterator that will yield at log-size steps through the histogram's value range.
#[derive(Debug)]
pub struct Iter<'a, C: Counter> {
    steps: Stepped<'a, C, Logarithmic>,
}

#[derive(Debug)]
pub(crate) struct Logarithmic {
    // > 1.0
    log_base: f64,
    // > 1.0, so the step's highest value never underflows
    next_value_reporting_level: f64,
}

impl Stepper for Logarithmic {
    fn next_step(&mut self) -> i64 {
        self.next_value_reporting_level *= self.log_base;
        // a level past the i64 range ends on the top of the value space
        if self.next_value_reporting_level >= i64::max_value() as f64 {
            return i64::max_value();
        }
        self.next_value_reporting_level as i64 - 1
    }
}

impl<'a, C: Counter> Iter<'a, C> {
    /// Construct a new logarithmic iterator. See `Histogram::iter_log` for details.
    pub fn new(
        hist: &'a Histogram<C>,
        value_units_in_first_bucket: i64,
        log_base: f64,
    ) -> Iter<'a, C> {
        assert!(
            value_units_in_first_bucket > 0,
            "value_units_in_first_bucket must be > 0"
        );
        assert!(log_base > 1.0, "log_base must be > 1.0");

        Iter {
            steps: Stepped::new(
                hist,
                value_units_in_first_bucket - 1,
                Logarithmic {
                    log_base,
                    next_value_reporting_level: value_units_in_first_bucket as f64,
                },
            ),
        }
    }
}

impl<'a, C: Counter> Iterator for Iter<'a, C> {
    type Item = IterationValue;

    fn next(&mut self) -> Option<Self::Item> {
        self.steps.next_step()
    }
}

use crate::core::counter::Counter;
use crate::iterators::{IterationValue, Stepped, Stepper};
use crate::Histogram;

/// An iterator that will yield at fixed-size steps through the histogram's value range.
#[derive(Debug)]
pub struct Iter<'a, C: Counter> {
    steps: Stepped<'a, C, Linear>,
}

#[derive(Debug)]
pub(crate) struct Linear {
    value_units_per_bucket: i64,
    step_highest_value: i64,
}

impl Stepper for Linear {
    fn next_step(&mut self) -> i64 {
        self.step_highest_value = self
            .step_highest_value
            .saturating_add(self.value_units_per_bucket);
        self.step_highest_value
    }
}

impl<'a, C: Counter> Iter<'a, C> {
    /// Construct a new linear iterator. See `Histogram::iter_linear` for details.
    pub fn new(hist: &'a Histogram<C>, value_units_per_bucket: i64) -> Iter<'a, C> {
        assert!(
            value_units_per_bucket > 0,
            "value_units_per_bucket must be > 0"
        );

        let first = value_units_per_bucket - 1;
        Iter {
            steps: Stepped::new(
                hist,
                first,
                Linear {
                    value_units_per_bucket,
                    step_highest_value: first,
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

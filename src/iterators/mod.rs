//! Read-only traversals of a histogram's slots.
//!
//! All iterators share [`Cursor`], which walks `(bucket, sub-bucket)` locations in value order
//! and keeps a running cumulative count. The traversals differ only in which locations they
//! report and how counts are grouped between reports.

use crate::core::counter::Counter;
use crate::Histogram;

/// An iterator that yields one item per non-empty slot.
pub mod recorded;
/// An iterator that yields items at percentile steps that get finer towards 100%.
pub mod percentile;
/// An iterator that yields items at fixed-width value steps.
pub mod linear;
/// An iterator that yields items at logarithmically growing value steps.
pub mod log;

/// One reporting point of a histogram iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationValue {
    value_iterated_to: i64,
    value_from_index: i64,
    percentile: f64,
    count_at_value: u64,
    cumulative_count: u64,
    count_since_last_iteration: u64,
}

impl IterationValue {
    /// The value that this step reached: the highest value of the reported slot, or the
    /// highest value of the reported step for the linear and logarithmic iterators.
    pub fn value_iterated_to(&self) -> i64 {
        self.value_iterated_to
    }

    /// The lowest value of the slot the iteration stopped at.
    pub fn value_from_index(&self) -> i64 {
        self.value_from_index
    }

    /// The percentile of recorded values that are at or below `value_iterated_to`. For the
    /// percentile iterator this is the percentile level that was iterated to.
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// The count in the slot the iteration stopped at.
    pub fn count_at_value(&self) -> u64 {
        self.count_at_value
    }

    /// Number of samples at or below the slot the iteration stopped at.
    pub fn cumulative_count(&self) -> u64 {
        self.cumulative_count
    }

    /// Number of samples added since the previous item was yielded.
    pub fn count_since_last_iteration(&self) -> u64 {
        self.count_since_last_iteration
    }
}

/// The traversal state machine: starts before the first slot, advances one sub-bucket at a
/// time, and on sub-bucket overflow wraps to the upper half of the next bucket.
#[derive(Debug)]
pub(crate) struct Cursor<'a, C: Counter> {
    pub(crate) hist: &'a Histogram<C>,
    pub(crate) total_count: u64,

    started: bool,
    bucket_index: u32,
    sub_bucket_index: u32,

    pub(crate) count_at_index: u64,
    pub(crate) count_to_index: u64,
    pub(crate) value_from_index: i64,
    pub(crate) highest_equivalent_value: i64,

    count_at_last_emission: u64,
}

impl<'a, C: Counter> Cursor<'a, C> {
    pub(crate) fn new(hist: &'a Histogram<C>) -> Cursor<'a, C> {
        Cursor {
            hist,
            total_count: hist.total_count(),
            started: false,
            bucket_index: 0,
            sub_bucket_index: 0,
            count_at_index: 0,
            count_to_index: 0,
            value_from_index: 0,
            highest_equivalent_value: 0,
            count_at_last_emission: 0,
        }
    }

    pub(crate) fn started(&self) -> bool {
        self.started
    }

    /// Have we not yet accumulated every recorded sample?
    pub(crate) fn has_next(&self) -> bool {
        self.count_to_index < self.total_count
    }

    fn has_buckets(&self) -> bool {
        self.bucket_index < self.hist.config().bucket_count
    }

    pub(crate) fn at_last_slot(&self) -> bool {
        let config = self.hist.config();
        self.bucket_index + 1 == config.bucket_count
            && self.sub_bucket_index + 1 == config.sub_bucket_count
    }

    /// The location after the current one.
    fn following(&self) -> (u32, u32) {
        if !self.started {
            return (0, 0);
        }
        let config = self.hist.config();
        let sub_bucket_index = self.sub_bucket_index + 1;
        if sub_bucket_index >= config.sub_bucket_count {
            (self.bucket_index + 1, config.sub_bucket_half_count)
        } else {
            (self.bucket_index, sub_bucket_index)
        }
    }

    /// Step to the next slot regardless of whether any samples remain. Returns false once the
    /// slots are exhausted.
    pub(crate) fn move_next(&mut self) -> bool {
        let (bucket_index, sub_bucket_index) = self.following();
        self.started = true;
        self.bucket_index = bucket_index;
        self.sub_bucket_index = sub_bucket_index;

        if !self.has_buckets() {
            return false;
        }

        let config = self.hist.config();
        self.count_at_index = self
            .hist
            .count_at(config.counts_index(bucket_index, sub_bucket_index));
        self.count_to_index += self.count_at_index;
        self.value_from_index = config.value_from_location(bucket_index, sub_bucket_index);
        self.highest_equivalent_value = self.hist.highest_equivalent_value(self.value_from_index);
        true
    }

    /// Step to the next slot if any recorded samples remain ahead.
    pub(crate) fn advance(&mut self) -> bool {
        self.has_next() && self.move_next()
    }

    /// Lowest value of the next slot, without moving.
    pub(crate) fn peek_next_value(&self) -> i64 {
        let (bucket_index, sub_bucket_index) = self.following();
        self.hist
            .config()
            .value_from_location(bucket_index, sub_bucket_index)
    }

    /// Percentile of samples at or below the current slot.
    pub(crate) fn percentile(&self) -> f64 {
        100.0 * self.count_to_index as f64 / self.total_count as f64
    }

    /// Build the item for the current position and mark it as reported.
    pub(crate) fn emit(&mut self, value_iterated_to: i64, percentile: f64) -> IterationValue {
        let v = IterationValue {
            value_iterated_to,
            value_from_index: self.value_from_index,
            percentile,
            count_at_value: self.count_at_index,
            cumulative_count: self.count_to_index,
            count_since_last_iteration: self.count_to_index - self.count_at_last_emission,
        };
        self.count_at_last_emission = self.count_to_index;
        v
    }
}

/// How a stepped iteration picks the highest value of each successive step.
pub(crate) trait Stepper {
    /// Highest value of the step after the current one.
    fn next_step(&mut self) -> i64;
}

/// Shared driver of the linear and logarithmic iterators: one item per value step, counting
/// every slot whose value falls in the step.
#[derive(Debug)]
pub(crate) struct Stepped<'a, C: Counter, S: Stepper> {
    cursor: Cursor<'a, C>,
    stepper: S,
    // highest value of the current step, and the lowest value equivalent to it
    step_highest_value: i64,
    step_lowest_equivalent: i64,
    // set once the step ending at i64::max_value() has been reported
    reported_top: bool,
}

impl<'a, C: Counter, S: Stepper> Stepped<'a, C, S> {
    pub(crate) fn new(
        hist: &'a Histogram<C>,
        first_step_highest_value: i64,
        stepper: S,
    ) -> Stepped<'a, C, S> {
        Stepped {
            cursor: Cursor::new(hist),
            stepper,
            step_highest_value: first_step_highest_value,
            step_lowest_equivalent: hist.lowest_equivalent_value(first_step_highest_value),
            reported_top: false,
        }
    }

    pub(crate) fn next_step(&mut self) -> Option<IterationValue> {
        // Keep going while samples remain, and also while the current step still lies inside
        // the slot we stopped at: a slot wider than a step is reported once per step (the
        // later ones empty) before the iteration is allowed to end.
        if self.reported_top
            || (!self.cursor.has_next()
                && self.step_highest_value >= self.cursor.peek_next_value())
        {
            return None;
        }

        loop {
            if self.cursor.started()
                && (self.cursor.value_from_index >= self.step_lowest_equivalent
                    || self.cursor.at_last_slot())
            {
                let percentile = self.cursor.percentile();
                let v = self.cursor.emit(self.step_highest_value, percentile);
                // no step can follow one that ends at the top of the value space
                self.reported_top = self.step_highest_value == i64::max_value();

                self.step_highest_value = self.stepper.next_step();
                self.step_lowest_equivalent = self
                    .cursor
                    .hist
                    .lowest_equivalent_value(self.step_highest_value);
                return Some(v);
            }

            if !self.cursor.move_next() {
                return None;
            }
        }
    }
}

//! hdrinterval records sampled integer values (typically latencies) into a High Dynamic Range
//! histogram with a fixed memory footprint and a guaranteed bound on the relative error of every
//! reported value, and provides an interval recorder that lets any number of threads keep
//! recording while a single reader periodically takes consistent snapshots.
//!
//! # HdrHistogram
//!
//! A histogram is configured with the lowest value it must discern from 0, the highest value it
//! must be able to record, and a number of significant decimal digits (1 to 5). Value
//! quantization anywhere in the range is then no larger than one part in
//! `10^significant_figures`. For example, a histogram tracking values between 1 microsecond and
//! 1 hour with 3 significant digits keeps a resolution of 1 microsecond up to 1 millisecond, of
//! 1 millisecond (or better) up to one second, and at its maximum tracked value (1 hour) a
//! resolution of 3.6 seconds (or better).
//!
//! The histogram allocates its counts array once, at construction, and never resizes it.
//! Recording a value is a constant amount of work: the slot index is computed directly from the
//! bits of the value.
//!
//! # Recording samples
//!
//! ```
//! use hdrinterval::Histogram;
//! let mut hist = Histogram::<u64>::new_with_bounds(1, 60 * 60 * 1000, 2).unwrap();
//!
//! // samples are recorded with .record_value, which will error if the value is out of range
//! hist.record_value(54321).expect("value 54321 should be in range");
//!
//! // for ergonomics, samples can also be recorded with +=
//! // this call will panic if the value is out of range!
//! hist += 54321;
//!
//! // if the code that generates the values is subject to Coordinated Omission,
//! // the self-correcting record method should be used instead.
//! // for example, if the expected sampling interval is 10 msec:
//! hist.record_corrected_value(54321, 10).expect("value 54321 should be in range");
//! ```
//!
//! Note the `u64` annotation. This type can be changed to reduce the storage overhead for all
//! the histogram bins, at the cost of a risk of overflowing if a large number of samples end up
//! in the same bin.
//!
//! # Querying samples
//!
//! ```
//! use hdrinterval::Histogram;
//! let hist = Histogram::<u64>::new_with_max(1_000_000, 3).unwrap();
//! // ...
//! println!("# of samples: {}", hist.total_count());
//! println!("99.9'th percentile: {}", hist.value_at_percentile(99.9));
//! ```
//!
//! Several iterators give an overview of the dataset: `iter_recorded` (one item per non-empty
//! bin), `iter_percentiles`, `iter_linear` and `iter_log`.
//!
//! ```
//! use hdrinterval::Histogram;
//! let hist = Histogram::<u64>::new_with_max(1_000_000, 3).unwrap();
//! // ...
//! for v in hist.iter_percentiles(5) {
//!     println!("{}% of samples are at or below {}", v.percentile(), v.value_iterated_to());
//! }
//! ```
//!
//! # Recording from many threads
//!
//! With the `sync` feature (on by default), [`sync::IntervalRecorder`] pairs two histograms
//! with a writer-reader phaser: writers record into the active histogram without blocking, and
//! the reader swaps the pair and waits only for the writers already in flight.
//!
//! ```
//! use hdrinterval::sync::IntervalRecorder;
//! use hdrinterval::Histogram;
//!
//! let recorder = IntervalRecorder::new(Histogram::<u64>::new_with_max(3_600_000, 3).unwrap());
//! recorder.record_value(1_500).unwrap();
//!
//! let mut snapshot = recorder.sample();
//! assert_eq!(snapshot.total_count(), 1);
//! // the snapshot becomes the active histogram again on the next sample
//! snapshot.reset();
//! ```

#![warn(missing_docs, missing_debug_implementations)]

use std::fmt;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::debug;

pub mod core;
pub mod errors;
pub mod iterators;
pub mod report;
#[cfg(feature = "sync")]
pub mod sync;

pub use crate::core::config::{BucketBounds, BucketConfig};
pub use crate::core::counter::{AtomicCount, Counter};
pub use crate::errors::*;
pub use crate::report::Format;

use crate::iterators::Cursor;

/// A fixed-footprint HDR histogram.
///
/// Recording goes through a shared reference: each slot is an atomic cell, so many threads may
/// record into the same histogram at once (this is what the interval recorder relies on).
/// Queries and iteration read the cells without synchronizing with concurrent writers; they see
/// a consistent picture only once writers are done, which is the caller's (or the interval
/// recorder's) responsibility.
pub struct Histogram<C: Counter = u64> {
    config: BucketConfig,

    total_count: AtomicU64,
    // i64::max_value() until a non-zero value is recorded
    min_value: AtomicI64,
    max_value: AtomicI64,

    counts: Box<[C::Atomic]>,
}

// Construction

impl<C: Counter> Histogram<C> {
    /// Construct a histogram given the highest value to be tracked and a number of significant
    /// decimal digits. The histogram will be constructed to implicitly track (distinguish from
    /// 0) values as low as 1.
    ///
    /// `highest_trackable_value` must be >= 2. `significant_figures` must be in `[1, 5]`.
    pub fn new_with_max(
        highest_trackable_value: i64,
        significant_figures: u8,
    ) -> Result<Histogram<C>, CreationError> {
        Self::new_with_bounds(1, highest_trackable_value, significant_figures)
    }

    /// Construct a histogram given the lowest and highest values to be tracked and a number of
    /// significant decimal digits. Providing a `lowest_trackable_value` is useful in situations
    /// where the units used for the histogram's values are much smaller that the minimal
    /// accuracy required. E.g. when tracking time values stated in nanosecond units, where the
    /// minimal accuracy required is a microsecond, the proper value for
    /// `lowest_trackable_value` would be 1000.
    ///
    /// `lowest_trackable_value` must be >= 1, and may be internally rounded down to the nearest
    /// power of 2. `highest_trackable_value` must be >= 2 * `lowest_trackable_value`.
    /// `significant_figures` must be in `[1, 5]`.
    pub fn new_with_bounds(
        lowest_trackable_value: i64,
        highest_trackable_value: i64,
        significant_figures: u8,
    ) -> Result<Histogram<C>, CreationError> {
        let config = BucketConfig::new(
            lowest_trackable_value,
            highest_trackable_value,
            significant_figures,
        )?;
        Self::with_config(config)
    }

    /// Construct an empty histogram with a precomputed layout.
    ///
    /// Fails with `CreationError::AllocationFailed` if the counts array cannot be allocated.
    pub fn with_config(config: BucketConfig) -> Result<Histogram<C>, CreationError> {
        let mut counts = Vec::new();
        counts
            .try_reserve_exact(config.counts_len)
            .map_err(|_| CreationError::AllocationFailed)?;
        counts.resize_with(config.counts_len, Default::default);

        let h = Self::from_parts(config, counts.into_boxed_slice());
        debug!(
            counts_len = config.counts_len,
            bucket_count = config.bucket_count,
            memory_size = h.memory_size(),
            "allocated histogram"
        );
        Ok(h)
    }

    /// Construct an empty histogram with the same layout as `source`.
    ///
    /// Like `Vec`, this aborts if the counts array cannot be allocated. Use
    /// `Histogram::with_config(*source.config())` to get `CreationError::AllocationFailed`
    /// instead.
    pub fn new_from<F: Counter>(source: &Histogram<F>) -> Histogram<C> {
        let counts = (0..source.len()).map(|_| Default::default()).collect();
        Self::from_parts(source.config, counts)
    }

    fn from_parts(config: BucketConfig, counts: Box<[C::Atomic]>) -> Histogram<C> {
        Histogram {
            config,
            total_count: AtomicU64::new(0),
            min_value: AtomicI64::new(i64::max_value()),
            max_value: AtomicI64::new(0),
            counts,
        }
    }
}

// accessors

impl<C: Counter> Histogram<C> {
    /// The layout this histogram was built from.
    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Get the current number of bins.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if this histogram has no recorded values.
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// Get the total number of samples recorded.
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Get the configured lowest trackable value.
    pub fn lowest_trackable_value(&self) -> i64 {
        self.config.lowest_trackable_value
    }

    /// Get the highest trackable value.
    pub fn highest_trackable_value(&self) -> i64 {
        self.config.highest_trackable_value
    }

    /// Get the configured number of significant value digits.
    pub fn significant_figures(&self) -> u8 {
        self.config.significant_figures
    }

    /// Number of power-of-two buckets.
    pub fn bucket_count(&self) -> u32 {
        self.config.bucket_count
    }

    /// Number of sub-buckets per bucket.
    pub fn sub_bucket_count(&self) -> u32 {
        self.config.sub_bucket_count
    }

    /// Bytes occupied by this histogram. Fixed at construction.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.counts.len() * std::mem::size_of::<C::Atomic>()
    }

    /// Get the count in the slot at `index`, if `index` is within the counts array.
    pub fn count_at_index(&self, index: usize) -> Option<C> {
        self.counts.get(index).map(|c| c.get())
    }

    /// Get the lowest value that is counted in the slot at `index`.
    pub fn value_at_index(&self, index: usize) -> i64 {
        self.config.value_from_index(index)
    }

    #[inline]
    pub(crate) fn count_at(&self, index: usize) -> u64 {
        self.counts[index].get().as_u64()
    }

    fn last_index(&self) -> usize {
        self.counts.len() - 1
    }

    /// Slot for `value`, clamped into the counts array.
    fn clamped_index_for(&self, value: i64) -> usize {
        self.config
            .counts_index_for(value.max(0))
            .unwrap_or_else(|| self.last_index())
    }
}

// recording

impl<C: Counter> Histogram<C> {
    /// Record `value` in the histogram.
    ///
    /// Returns an error if `value` is negative or exceeds the highest trackable value. Recording
    /// 0 is always allowed; it never affects `min()`.
    pub fn record_value(&self, value: i64) -> Result<(), RecordError> {
        self.record_values(value, C::one())
    }

    /// Record multiple samples for a value in the histogram, adding to the value's current
    /// count.
    ///
    /// `count` is the number of occurrences of this value to record. Counts wrap on overflow of
    /// `C`.
    pub fn record_values(&self, value: i64, count: C) -> Result<(), RecordError> {
        if value < 0 {
            return Err(RecordError::NegativeValue);
        }
        let index = self
            .config
            .counts_index_for(value)
            .ok_or(RecordError::ValueOutOfRange)?;

        self.counts[index].add(count);
        self.total_count.fetch_add(count.as_u64(), Ordering::Relaxed);
        self.update_min_max(value);
        Ok(())
    }

    /// Record a value in the histogram while correcting for coordinated omission.
    ///
    /// To compensate for the loss of sampled values when a recorded value is larger than the
    /// expected interval between value samples, the histogram will auto-generate an additional
    /// series of decreasingly-smaller (down to the `expected_interval`) value records.
    ///
    /// Backfill only happens when `expected_interval` is positive and `value` is strictly larger
    /// than it. If a backfilled value cannot be recorded the backfill stops and the error is
    /// returned, but `value` itself stays recorded.
    pub fn record_corrected_value(
        &self,
        value: i64,
        expected_interval: i64,
    ) -> Result<(), RecordError> {
        self.record_value(value)?;
        if expected_interval <= 0 || value <= expected_interval {
            return Ok(());
        }

        let mut missing_value = value - expected_interval;
        while missing_value >= expected_interval {
            self.record_value(missing_value)?;
            missing_value -= expected_interval;
        }
        Ok(())
    }

    fn update_min_max(&self, value: i64) {
        if value != 0 {
            self.min_value.fetch_min(value, Ordering::Relaxed);
        }
        self.max_value.fetch_max(value, Ordering::Relaxed);
    }
}

// merging and administrative

impl<C: Counter> Histogram<C> {
    /// Add the contents of another histogram to this one.
    ///
    /// Every non-empty slot of `source` is re-recorded at its lowest value, so histograms with
    /// different layouts can be merged. Samples that do not fit in this histogram (or whose
    /// count does not fit in `C`) are dropped, and the number of dropped samples is returned.
    /// Merging histograms of identical configuration never drops anything.
    pub fn add<F: Counter>(&self, source: &Histogram<F>) -> u64 {
        let mut dropped = 0;

        for v in source.iter_recorded() {
            let count = v.count_at_value();
            let recorded = C::from_u64(count)
                .map_or(false, |c| self.record_values(v.value_from_index(), c).is_ok());
            if !recorded {
                dropped += count;
            }
        }

        dropped
    }

    /// Reset the contents and stats of this histogram. The layout is untouched.
    pub fn reset(&mut self) {
        for c in self.counts.iter_mut() {
            c.set(C::zero());
        }
        *self.total_count.get_mut() = 0;
        *self.min_value.get_mut() = i64::max_value();
        *self.max_value.get_mut() = 0;
    }

    /// Recompute the total count, min and max from the counts array.
    ///
    /// Useful after the counts have been modified in bulk, and the only way to bring the stats
    /// back in line after a counter has wrapped.
    pub fn reset_internal_counters(&mut self) {
        let mut min_non_zero_index = None;
        let mut max_index = None;
        let mut observed_total_count = 0u64;

        for (i, c) in self.counts.iter().enumerate() {
            let count = c.get().as_u64();
            if count > 0 {
                observed_total_count += count;
                max_index = Some(i);
                if min_non_zero_index.is_none() && i != 0 {
                    min_non_zero_index = Some(i);
                }
            }
        }

        let max_value = max_index.map_or(0, |i| {
            self.highest_equivalent_value(self.config.value_from_index(i))
        });
        let min_value = min_non_zero_index
            .map_or(i64::max_value(), |i| self.config.value_from_index(i));

        *self.max_value.get_mut() = max_value;
        *self.min_value.get_mut() = min_value;
        *self.total_count.get_mut() = observed_total_count;
    }
}

// Aborts on allocation failure, as `Vec::clone` does.
impl<C: Counter> Clone for Histogram<C> {
    fn clone(&self) -> Self {
        let counts = self
            .counts
            .iter()
            .map(|c| {
                let mut cell = C::Atomic::default();
                cell.set(c.get());
                cell
            })
            .collect();
        Histogram {
            config: self.config,
            total_count: AtomicU64::new(self.total_count()),
            min_value: AtomicI64::new(self.min_value.load(Ordering::Relaxed)),
            max_value: AtomicI64::new(self.max_value.load(Ordering::Relaxed)),
            counts,
        }
    }
}

impl<C: Counter> fmt::Debug for Histogram<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("config", &self.config)
            .field("total_count", &self.total_count())
            .field("min", &self.min())
            .field("max", &self.max())
            .finish()
    }
}

impl<'a, C: Counter> AddAssign<&'a Histogram<C>> for Histogram<C> {
    /// Merge `source` into this histogram, discarding the dropped count.
    fn add_assign(&mut self, source: &'a Histogram<C>) {
        self.add(source);
    }
}

impl<C: Counter> AddAssign<i64> for Histogram<C> {
    /// Record `value`.
    ///
    /// Panics if the value is negative or out of range.
    fn add_assign(&mut self, value: i64) {
        self.record_value(value)
            .expect("value should be within the histogram's range");
    }
}

// comparison

impl<C: Counter, F: Counter> PartialEq<Histogram<F>> for Histogram<C> {
    fn eq(&self, other: &Histogram<F>) -> bool {
        if self.config != other.config {
            return false;
        }
        if self.total_count() != other.total_count() {
            return false;
        }
        if self.max() != other.max() {
            return false;
        }
        if self.min() != other.min() {
            return false;
        }
        (0..self.len()).all(|i| self.count_at(i) == other.count_at(i))
    }
}

// iterators

impl<C: Counter> Histogram<C> {
    /// Iterate through histogram values by percentile levels.
    ///
    /// The iteration mechanic for this iterator may appear somewhat confusing, but it yields
    /// fairly pleasing output. The iterator starts with a *percentile step size* of
    /// 100/`ticks_per_half_distance`. It will then iterate through the histogram in those
    /// steps, and each time it has covered half the remaining distance to 100%, it halves its
    /// step size. The last emitted item is always at percentile 100.
    ///
    /// Panics if `ticks_per_half_distance` is 0.
    pub fn iter_percentiles(
        &self,
        ticks_per_half_distance: u32,
    ) -> iterators::percentile::Iter<'_, C> {
        iterators::percentile::Iter::new(self, ticks_per_half_distance)
    }

    /// Iterates through histogram values using linear value steps. The iteration is performed
    /// in steps of size `value_units_per_bucket`, each yielding the count for all values in
    /// the preceding value range of size `value_units_per_bucket`, and terminates when all
    /// recorded histogram values are exhausted.
    ///
    /// Panics if `value_units_per_bucket` is not positive.
    pub fn iter_linear(
        &self,
        value_units_per_bucket: i64,
    ) -> iterators::linear::Iter<'_, C> {
        iterators::linear::Iter::new(self, value_units_per_bucket)
    }

    /// Iterates through histogram values at logarithmically increasing levels. The iteration
    /// is performed in steps that start at `value_units_in_first_bucket` and increase
    /// exponentially according to `log_base`, terminating when all recorded histogram values
    /// are exhausted.
    ///
    /// Panics if `value_units_in_first_bucket` is not positive or `log_base` is not > 1.0.
    pub fn iter_log(
        &self,
        value_units_in_first_bucket: i64,
        log_base: f64,
    ) -> iterators::log::Iter<'_, C> {
        iterators::log::Iter::new(self, value_units_in_first_bucket, log_base)
    }

    /// Iterates through all recorded histogram values using the finest granularity steps
    /// supported by the underlying representation. The iteration steps through all non-zero
    /// recorded value counts, and terminates when all recorded histogram values are exhausted.
    pub fn iter_recorded(&self) -> iterators::recorded::Iter<'_, C> {
        iterators::recorded::Iter::new(self)
    }
}

// minor data statistics

impl<C: Counter> Histogram<C> {
    /// Get the lowest recorded non-zero value level in the histogram, or `i64::max_value()` if
    /// no non-zero value was recorded.
    pub fn min(&self) -> i64 {
        let min = self.min_value.load(Ordering::Relaxed);
        if min == i64::max_value() {
            min
        } else {
            self.lowest_equivalent_value(min)
        }
    }

    /// Get the highest recorded value level in the histogram, or 0 if nothing was recorded.
    pub fn max(&self) -> i64 {
        let max = self.max_value.load(Ordering::Relaxed);
        if max == 0 {
            0
        } else {
            self.highest_equivalent_value(max)
        }
    }

    /// Get the lowest value that is equivalent to the given value within the histogram's
    /// resolution. Where "equivalent" means that value samples recorded for any two equivalent
    /// values are counted in a common total count. Negative values are treated as 0.
    pub fn lowest_equivalent_value(&self, value: i64) -> i64 {
        let value = value.max(0);
        let bucket_index = self.config.bucket_index_of(value);
        let sub_bucket_index = self.config.sub_bucket_index_of(value, bucket_index);
        self.config.value_from_location(bucket_index, sub_bucket_index)
    }

    /// Get the highest value that is equivalent to the given value within the histogram's
    /// resolution. Values in the topmost slot of the value space map to `i64::max_value()`.
    pub fn highest_equivalent_value(&self, value: i64) -> i64 {
        let next = self.next_non_equivalent_value(value);
        if next == i64::max_value() {
            next
        } else {
            next - 1
        }
    }

    /// Get a value that lies in the middle (rounded up) of the range of values equivalent the
    /// given value.
    pub fn median_equivalent_value(&self, value: i64) -> i64 {
        self.lowest_equivalent_value(value)
            .saturating_add(self.size_of_equivalent_value_range(value) >> 1)
    }

    /// Get the next value that is not equivalent to the given value within the histogram's
    /// resolution. Saturates at `i64::max_value()`.
    pub fn next_non_equivalent_value(&self, value: i64) -> i64 {
        self.lowest_equivalent_value(value)
            .saturating_add(self.size_of_equivalent_value_range(value))
    }

    /// Get the size (in value units) of the range of values that are equivalent to the given
    /// value within the histogram's resolution.
    pub fn size_of_equivalent_value_range(&self, value: i64) -> i64 {
        let value = value.max(0);
        let bucket_index = self.config.bucket_index_of(value);
        let sub_bucket_index = self.config.sub_bucket_index_of(value, bucket_index);
        let adjusted_bucket = if sub_bucket_index >= self.config.sub_bucket_count {
            bucket_index + 1
        } else {
            bucket_index
        };
        1_i64 << (self.config.unit_magnitude + adjusted_bucket)
    }

    /// Determine if two values are equivalent with the histogram's resolution.
    pub fn values_are_equivalent(&self, value1: i64, value2: i64) -> bool {
        self.lowest_equivalent_value(value1) == self.lowest_equivalent_value(value2)
    }

    /// Get the count of recorded values at a specific value (to within the histogram
    /// resolution at the value level). Values past the end are clamped to the last slot.
    pub fn count_at_value(&self, value: i64) -> u64 {
        self.count_at(self.clamped_index_for(value))
    }
}

// major data statistics

impl<C: Counter> Histogram<C> {
    /// Get the computed mean value of all recorded values in the histogram, or 0.0 if it is
    /// empty.
    pub fn mean(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }

        self.iter_recorded().fold(0.0_f64, |sum, v| {
            sum + self.median_equivalent_value(v.value_from_index()) as f64
                * v.count_at_value() as f64
                / total as f64
        })
    }

    /// Get the computed (population) standard deviation of all recorded values in the
    /// histogram, or 0.0 if it is empty.
    pub fn stddev(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }

        let mean = self.mean();
        let geom_dev_tot = self.iter_recorded().fold(0.0_f64, |gdt, v| {
            let dev = self.median_equivalent_value(v.value_from_index()) as f64 - mean;
            gdt + (dev * dev) * v.count_at_value() as f64
        });

        (geom_dev_tot / total as f64).sqrt()
    }

    /// Get the value at a given percentile.
    ///
    /// The value returned is the highest value that the given percentage of the overall
    /// recorded value entries in the histogram are either smaller than or equivalent to.
    /// Percentiles above 100 are treated as 100; at least the first recorded entry is always
    /// reached. Returns 0 if the histogram is empty.
    pub fn value_at_percentile(&self, percentile: f64) -> i64 {
        // Truncate down to 100%
        let percentile = percentile.min(100.0);

        // round to nearest
        let count_at_percentile =
            ((percentile / 100.0) * self.total_count() as f64 + 0.5) as u64;
        // Make sure we at least reach the first recorded entry
        let count_at_percentile = count_at_percentile.max(1);

        let mut cursor = Cursor::new(self);
        while cursor.advance() {
            if cursor.count_to_index >= count_at_percentile {
                return self.highest_equivalent_value(cursor.value_from_index);
            }
        }

        0
    }

    /// Get the percentile of recorded values that are smaller than or equivalent to `value`.
    ///
    /// Returns 100.0 for an empty histogram.
    pub fn percentile_below(&self, value: i64) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 100.0;
        }

        let target_index = self.clamped_index_for(value);
        let count_to_index: u64 = (0..=target_index).map(|i| self.count_at(i)).sum();
        100.0 * count_to_index as f64 / total as f64
    }

    /// Get the count of recorded values within a range of value levels (inclusive to within the
    /// histogram's resolution).
    ///
    /// `low` will be rounded down with `lowest_equivalent_value`, and `high` rounded up with
    /// `highest_equivalent_value`; both are clamped into the counts array.
    pub fn count_between(&self, low: i64, high: i64) -> u64 {
        let low_index = self.clamped_index_for(low);
        let high_index = self.clamped_index_for(high);
        if low_index > high_index {
            return 0;
        }
        (low_index..=high_index).map(|i| self.count_at(i)).sum()
    }
}

#[cfg(test)]
#[path = "tests/tests.rs"]
mod tests;

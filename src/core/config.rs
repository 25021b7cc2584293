use crate::errors::CreationError;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// The three user-facing parameters a [`BucketConfig`] is derived from.
///
/// This is also the serialized form of a `BucketConfig`: only the bounds are stored, and the
/// layout is re-derived (and re-validated) when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketBounds {
    /// Lowest value that can be discerned from 0. Must be >= 1.
    pub lowest_trackable_value: i64,
    /// Highest value that can be recorded. Must be >= 2 * `lowest_trackable_value`.
    pub highest_trackable_value: i64,
    /// Decimal digits of resolution maintained at every magnitude, in `[1, 5]`.
    pub significant_figures: u8,
}

/// The fixed index layout of a histogram.
///
/// The buckets (each of which has `sub_bucket_count` sub-buckets, here assumed to be 2048 as an
/// example) overlap:
///
/// ```text
/// The 0'th bucket covers 0...2047 in multiples of 1, using all 2048 sub-buckets
/// The 1'th bucket covers 2048..4097 in multiples of 2, using only the top 1024 sub-buckets
/// The 2'th bucket covers 4096..8191 in multiple of 4, using only the top 1024 sub-buckets
/// ...
/// ```
///
/// Bucket 0 is "special" here. It is the only one that has 2048 entries. All the rest have 1024
/// entries (because their bottom half overlaps with and is already covered by the all of the
/// previous buckets put together).
///
/// Identical inputs always produce an identical layout, which is what lets two histograms merge
/// slot for slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BucketBounds", into = "BucketBounds")]
pub struct BucketConfig {
    pub(crate) lowest_trackable_value: i64,
    pub(crate) highest_trackable_value: i64,
    pub(crate) significant_figures: u8,

    pub(crate) unit_magnitude: u32,
    pub(crate) sub_bucket_half_count_magnitude: u32,
    pub(crate) sub_bucket_count: u32,
    pub(crate) sub_bucket_half_count: u32,
    pub(crate) sub_bucket_mask: i64,
    pub(crate) bucket_count: u32,
    pub(crate) counts_len: usize,
}

/// Number of bits needed to represent `value`.
#[inline]
fn bit_length(value: u64) -> u32 {
    64 - value.leading_zeros()
}

impl BucketConfig {
    /// Derive the layout for values in `[lowest_trackable_value, highest_trackable_value]` kept
    /// to `significant_figures` decimal digits of precision.
    ///
    /// Rejects, in this order:
    ///
    /// - `lowest_trackable_value < 1` with `LowIsZero`
    /// - `significant_figures` outside `1..=5` with `SigFigOutOfRange`
    /// - `highest_trackable_value < 2 * lowest_trackable_value` with `HighLessThanTwiceLow`,
    ///   so `(1, 1, 3)` is an error even though a single-value range could be laid out
    /// - a `lowest_trackable_value` too large for the sub-buckets to fit in an `i64` at this
    ///   precision with `CannotRepresentSigFigBeyondLow`
    pub fn new(
        lowest_trackable_value: i64,
        highest_trackable_value: i64,
        significant_figures: u8,
    ) -> Result<BucketConfig, CreationError> {
        if lowest_trackable_value < 1 {
            return Err(CreationError::LowIsZero);
        }
        if significant_figures < 1 || significant_figures > 5 {
            return Err(CreationError::SigFigOutOfRange);
        }
        if highest_trackable_value < lowest_trackable_value.saturating_mul(2) {
            return Err(CreationError::HighLessThanTwiceLow);
        }

        // Given a 3 decimal point accuracy, the expectation is obviously for "+/- 1 unit at 1000".
        // It also means that it's "ok to be +/- 2 units at 2000". The "tricky" thing is that it
        // is NOT ok to be +/- 2 units at 1999. Only starting at 2000. So internally, we need to
        // maintain single unit resolution to 2x 10^significant_figures.
        let largest_value_with_single_unit_resolution = 2 * 10_u64.pow(u32::from(significant_figures));

        // ceil(log2(largest)); the largest value is never itself a power of two
        let sub_bucket_count_magnitude = bit_length(largest_value_with_single_unit_resolution - 1);
        let sub_bucket_half_count_magnitude = sub_bucket_count_magnitude.max(1) - 1;

        // floor(log2(lowest))
        let unit_magnitude = bit_length(lowest_trackable_value as u64) - 1;

        // the sub-bucket mask must fit in the positive half of an i64
        if unit_magnitude + sub_bucket_half_count_magnitude + 1 > 63 {
            return Err(CreationError::CannotRepresentSigFigBeyondLow);
        }

        let sub_bucket_count = 1_u32 << (sub_bucket_half_count_magnitude + 1);
        let sub_bucket_half_count = sub_bucket_count / 2;
        let sub_bucket_mask = (i64::from(sub_bucket_count) - 1) << unit_magnitude;

        // determine exponent range needed to support the trackable value with no overflow:
        let mut trackable_value = sub_bucket_mask;
        let mut bucket_count = 1;
        while trackable_value < highest_trackable_value {
            if trackable_value > i64::max_value() / 2 {
                // the next bucket reaches past i64::max_value(), so it's the last one
                bucket_count += 1;
                break;
            }
            trackable_value <<= 1;
            bucket_count += 1;
        }

        let counts_len = (bucket_count as usize + 1) * sub_bucket_half_count as usize;

        Ok(BucketConfig {
            lowest_trackable_value,
            highest_trackable_value,
            significant_figures,
            unit_magnitude,
            sub_bucket_half_count_magnitude,
            sub_bucket_count,
            sub_bucket_half_count,
            sub_bucket_mask,
            bucket_count,
            counts_len,
        })
    }

    /// Lowest value that can be discerned from 0.
    pub fn lowest_trackable_value(&self) -> i64 {
        self.lowest_trackable_value
    }

    /// Highest value the layout was asked to cover.
    pub fn highest_trackable_value(&self) -> i64 {
        self.highest_trackable_value
    }

    /// Configured number of significant decimal digits.
    pub fn significant_figures(&self) -> u8 {
        self.significant_figures
    }

    /// Number of power-of-two buckets.
    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    /// Number of sub-buckets in each bucket.
    pub fn sub_bucket_count(&self) -> u32 {
        self.sub_bucket_count
    }

    /// Number of slots in the counts array.
    pub fn counts_len(&self) -> usize {
        self.counts_len
    }

    /// Return the lowest (and therefore highest precision) bucket index that can represent the
    /// value. `value` must be non-negative.
    #[inline]
    pub(crate) fn bucket_index_of(&self, value: i64) -> u32 {
        // Calculates the number of powers of two by which the value is greater than the biggest
        // value that fits in bucket 0. This is the bucket index since each successive bucket can
        // hold a value 2x greater. The mask maps small values (0 included) to bucket 0.
        let pow2_ceiling = bit_length((value | self.sub_bucket_mask) as u64);
        pow2_ceiling - self.unit_magnitude - (self.sub_bucket_half_count_magnitude + 1)
    }

    /// For `bucket_index` 0 this is just the value in units, so it may be anywhere in
    /// `0..sub_bucket_count`. For any other bucket it always lands in the top half.
    #[inline]
    pub(crate) fn sub_bucket_index_of(&self, value: i64, bucket_index: u32) -> u32 {
        (value >> (bucket_index + self.unit_magnitude)) as u32
    }

    /// Index into the counts array for a (bucket, sub-bucket) location. May be past the end.
    #[inline]
    pub(crate) fn counts_index(&self, bucket_index: u32, sub_bucket_index: u32) -> usize {
        // Calculate the index for the first entry that will be used in the bucket (halfway
        // through sub_bucket_count). For bucket_index 0, all sub_bucket_count entries may be
        // used, but bucket_base_index is still set in the middle.
        let bucket_base_index =
            (bucket_index as usize + 1) << self.sub_bucket_half_count_magnitude;
        // Bucket 0 gets twice the space, so the offset may only be negative there and the sum
        // never is.
        bucket_base_index + sub_bucket_index as usize - self.sub_bucket_half_count as usize
    }

    /// Slot for `value`, or `None` if it falls past the last slot. `value` must be non-negative.
    #[inline]
    pub(crate) fn counts_index_for(&self, value: i64) -> Option<usize> {
        let bucket_index = self.bucket_index_of(value);
        let sub_bucket_index = self.sub_bucket_index_of(value, bucket_index);
        let index = self.counts_index(bucket_index, sub_bucket_index);
        if index < self.counts_len {
            Some(index)
        } else {
            None
        }
    }

    /// Lowest value of a (bucket, sub-bucket) location, clamped to `i64::max_value()` for the
    /// locations past the top of the value space.
    #[inline]
    pub(crate) fn value_from_location(&self, bucket_index: u32, sub_bucket_index: u32) -> i64 {
        let shift = bucket_index + self.unit_magnitude;
        if bit_length(u64::from(sub_bucket_index)) + shift > 63 {
            return i64::max_value();
        }
        i64::from(sub_bucket_index) << shift
    }

    /// Lowest value of the slot at `index`.
    pub(crate) fn value_from_index(&self, index: usize) -> i64 {
        let half_count = self.sub_bucket_half_count as usize;
        let bucket_index = (index >> self.sub_bucket_half_count_magnitude) as i64 - 1;
        let sub_bucket_index = (index & (half_count - 1)) + half_count;
        if bucket_index < 0 {
            self.value_from_location(0, (sub_bucket_index - half_count) as u32)
        } else {
            self.value_from_location(bucket_index as u32, sub_bucket_index as u32)
        }
    }
}

impl TryFrom<BucketBounds> for BucketConfig {
    type Error = CreationError;

    fn try_from(bounds: BucketBounds) -> Result<Self, Self::Error> {
        BucketConfig::new(
            bounds.lowest_trackable_value,
            bounds.highest_trackable_value,
            bounds.significant_figures,
        )
    }
}

impl From<BucketConfig> for BucketBounds {
    fn from(config: BucketConfig) -> Self {
        BucketBounds {
            lowest_trackable_value: config.lowest_trackable_value,
            highest_trackable_value: config.highest_trackable_value,
            significant_figures: config.significant_figures,
        }
    }
}

use crate::core::counter::Counter;
use crate::iterators::{Cursor, IterationValue};
use crate::Histogram;

/// An iterator that will yield at percentile steps through the histogram's value range.
#[derive(Debug)]
pub struct Iter<'a, C: Counter> {
    cursor: Cursor<'a, C>,

    ticks_per_half_distance: u32,
    percentile_to_iterate_to: f64,
    seen_last_value: bool,
}

impl<'a, C: Counter> Iter<'a, C> {
    /// Construct a new percentile iterator. See `Histogram::iter_percentiles` for details.
    pub fn new(hist: &'a Histogram<C>, ticks_per_half_distance: u32) -> Iter<'a, C> {
        assert!(
            ticks_per_half_distance > 0,
            "Ticks per half distance must be > 0"
        );

        Iter {
            cursor: Cursor::new(hist),
            ticks_per_half_distance,
            percentile_to_iterate_to: 0.0,
            seen_last_value: false,
        }
    }

    /// The final item, reported at exactly 100%, exactly once.
    fn finish(&mut self) -> Option<IterationValue> {
        if self.seen_last_value {
            return None;
        }
        self.seen_last_value = true;
        let value = self.cursor.highest_equivalent_value;
        Some(self.cursor.emit(value, 100.0))
    }
}

impl<'a, C: Counter> Iterator for Iter<'a, C> {
    type Item = IterationValue;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.total_count == 0 {
            return None;
        }

        if !self.cursor.has_next() {
            return self.finish();
        }

        if !self.cursor.started() && !self.cursor.advance() {
            return None;
        }

        loop {
            // the same slot is considered again after it is reported, so one slot may be yielded
            // for several percentile levels
            if self.cursor.count_at_index != 0
                && self.percentile_to_iterate_to <= self.cursor.percentile()
            {
                let percentile = self.percentile_to_iterate_to;

                // The choice to maintain fixed-sized "ticks" in each half-distance to 100%
                // [starting from 0%], as opposed to a "tick" size that varies with each
                // interval, was made to make the steps easily comprehensible and readable to
                // humans. The resulting percentile steps are much easier to browse through in a
                // percentile distribution output, for example.
                //
                // Calculate the number of times we've halved the distance to 100%: this is 1 at
                // 50%, 2 at 75%, 3 at 87.5%, etc. Each halving doubles the number of ticks that
                // fit into the whole 0-100 range.
                let num_halvings = (100.0 / (100.0 - self.percentile_to_iterate_to))
                    .log2()
                    .floor();
                let half_distance = 2_f64.powf(num_halvings + 1.0);
                let percentile_reporting_ticks =
                    f64::from(self.ticks_per_half_distance) * half_distance;
                self.percentile_to_iterate_to += 100.0 / percentile_reporting_ticks;

                let value = self.cursor.highest_equivalent_value;
                return Some(self.cursor.emit(value, percentile));
            }

            if !self.cursor.advance() {
                break;
            }
        }

        // the scan ran out before reaching the next level
        self.finish()
    }
}

use crate::core::counter::Counter;
use crate::iterators::{Cursor, IterationValue};
use crate::Histogram;

/// An iterator that will yield only bins with at least one sample.
#[derive(Debug)]
pub struct Iter<'a, C: Counter> {
    cursor: Cursor<'a, C>,
}

impl<'a, C: Counter> Iter<'a, C> {
    /// Construct a new recorded-values iterator. See `Histogram::iter_recorded` for details.
    pub fn new(hist: &'a Histogram<C>) -> Iter<'a, C> {
        Iter {
            cursor: Cursor::new(hist),
        }
    }
}

impl<'a, C: Counter> Iterator for Iter<'a, C> {
    type Item = IterationValue;

    fn next(&mut self) -> Option<Self::Item> {
        // stops as soon as the cumulative count reaches the total, so trailing empty slots are
        // never visited
        while self.cursor.advance() {
            if self.cursor.count_at_index != 0 {
                let value = self.cursor.highest_equivalent_value;
                let percentile = self.cursor.percentile();
                return Some(self.cursor.emit(value, percentile));
            }
        }
        None
    }
}

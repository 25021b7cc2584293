use super::phaser::{Phaser, ReaderGuard};
use crate::errors::*;
use crate::{BucketConfig, Counter, Histogram};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicPtr, Ordering};
use std::time::Duration;
use tracing::debug;

/// A pair of histograms that many threads record into while one reader periodically takes
/// consistent snapshots.
///
/// Writers go through [`update`](IntervalRecorder::update) (or the `record_*` shorthands),
/// which never block: each one enters a phaser critical section, records into whichever
/// histogram is currently active, and exits. [`sample`](IntervalRecorder::sample) swaps the
/// active and inactive histograms and flips the phaser, so that the returned snapshot holds
/// exactly the writes that finished before the swap (plus those already in flight against it),
/// and none that start afterwards.
///
/// ```
/// use hdrinterval::sync::IntervalRecorder;
/// use hdrinterval::Histogram;
/// use std::sync::Arc;
/// use std::thread;
///
/// let recorder = Arc::new(IntervalRecorder::new(Histogram::<u64>::new_with_max(1000, 3).unwrap()));
/// let writers: Vec<_> = (0..4)
///     .map(|_| {
///         let recorder = Arc::clone(&recorder);
///         thread::spawn(move || {
///             for v in 1..=100 {
///                 recorder.record_value(v).unwrap();
///             }
///         })
///     })
///     .collect();
/// for w in writers {
///     w.join().unwrap();
/// }
///
/// let mut snapshot = recorder.sample();
/// assert_eq!(snapshot.total_count(), 400);
/// snapshot.reset();
/// ```
pub struct IntervalRecorder<C: Counter = u64> {
    active: AtomicPtr<Histogram<C>>,
    // only touched while holding the phaser's reader lock
    inactive: UnsafeCell<*mut Histogram<C>>,
    phaser: Phaser,
}

// Both histograms are owned by the recorder. Writers only ever reach the active one, through a
// shared reference, and every histogram operation available through `&Histogram` is atomic.
// The inactive one is only handed out under the reader lock, once the phaser has drained the
// writers that could still hold it.
unsafe impl<C: Counter> Send for IntervalRecorder<C> {}
unsafe impl<C: Counter> Sync for IntervalRecorder<C> {}

impl<C: Counter> IntervalRecorder<C> {
    /// Build a recorder around `hist`, which becomes the first active histogram. The inactive
    /// one is created empty with the same layout, through [`Histogram::new_from`], which aborts
    /// if it cannot be allocated.
    pub fn new(hist: Histogram<C>) -> IntervalRecorder<C> {
        let inactive = Histogram::new_from(&hist);
        IntervalRecorder::from_pair(hist, inactive)
    }

    /// Build a recorder over two empty histograms tracking `[low, high]` at `sigfig`
    /// significant figures.
    ///
    /// Fails with `CreationError::AllocationFailed` if either histogram cannot be allocated.
    pub fn new_with_bounds(low: i64, high: i64, sigfig: u8) -> Result<Self, CreationError> {
        let config = BucketConfig::new(low, high, sigfig)?;
        let active = Histogram::with_config(config)?;
        let inactive = Histogram::with_config(config)?;
        Ok(IntervalRecorder::from_pair(active, inactive))
    }

    fn from_pair(active: Histogram<C>, inactive: Histogram<C>) -> IntervalRecorder<C> {
        IntervalRecorder {
            active: AtomicPtr::new(Box::into_raw(Box::new(active))),
            inactive: UnsafeCell::new(Box::into_raw(Box::new(inactive))),
            phaser: Phaser::new(),
        }
    }

    /// Run `f` against the active histogram inside a writer critical section. Never blocks.
    ///
    /// `f` should be short: a reader sampling concurrently waits for it to return.
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Histogram<C>) -> R,
    {
        let _section = self.phaser.writer_critical_section();
        let active = self.active.load(Ordering::SeqCst);
        // The pointer always refers to one of our two live boxes. If a sample swaps it out from
        // under us, the flip in that sample waits for this section to exit before the histogram
        // is handed to the reader.
        f(unsafe { &*active })
    }

    /// Record `value` into the active histogram.
    pub fn record_value(&self, value: i64) -> Result<(), RecordError> {
        self.update(|h| h.record_value(value))
    }

    /// Record `count` occurrences of `value` into the active histogram.
    pub fn record_values(&self, value: i64, count: C) -> Result<(), RecordError> {
        self.update(|h| h.record_values(value, count))
    }

    /// Record `value` into the active histogram, backfilling for coordinated omission. See
    /// [`Histogram::record_corrected_value`].
    pub fn record_corrected_value(
        &self,
        value: i64,
        expected_interval: i64,
    ) -> Result<(), RecordError> {
        self.update(|h| h.record_corrected_value(value, expected_interval))
    }

    /// Swap the active and inactive histograms and return the one that was active, once no
    /// writer can touch it anymore.
    ///
    /// The snapshot holds the reader lock until it is dropped, so a concurrent `sample` waits
    /// for it. Calling `sample` again on the same thread while a snapshot is alive deadlocks:
    /// drop the snapshot first. Writers are never held up by it. The snapshot becomes the active histogram
    /// again at the next `sample`, and whatever it still holds at that point is carried into
    /// the next interval; call [`Histogram::reset`] on it to start that interval empty.
    pub fn sample(&self) -> Snapshot<'_, C> {
        let mut reader = self.phaser.reader_lock();

        // Only the holder of the reader lock touches `inactive`.
        let inactive = unsafe { &mut *self.inactive.get() };
        *inactive = self.active.swap(*inactive, Ordering::SeqCst);

        reader.flip(Duration::from_nanos(0));

        // The flip drained every writer that loaded this pointer, and new writers load the
        // other one.
        let hist = unsafe { &mut **inactive };
        debug!(total_count = hist.total_count(), "sampled interval");

        Snapshot {
            _reader: reader,
            hist,
        }
    }
}

impl<C: Counter> Drop for IntervalRecorder<C> {
    fn drop(&mut self) {
        // both pointers came from Box::into_raw and nobody else can hold them past `&mut self`
        unsafe {
            drop(Box::from_raw(*self.active.get_mut()));
            drop(Box::from_raw(*self.inactive.get_mut()));
        }
    }
}

impl<C: Counter> fmt::Debug for IntervalRecorder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalRecorder")
            .field("phaser", &self.phaser)
            .finish()
    }
}

/// The histogram of one finished interval, as returned by [`IntervalRecorder::sample`].
///
/// Dereferences to the [`Histogram`]. Holds the recorder's reader lock while alive.
pub struct Snapshot<'a, C: Counter> {
    _reader: ReaderGuard<'a>,
    hist: &'a mut Histogram<C>,
}

impl<'a, C: Counter> Deref for Snapshot<'a, C> {
    type Target = Histogram<C>;

    fn deref(&self) -> &Histogram<C> {
        self.hist
    }
}

impl<'a, C: Counter> DerefMut for Snapshot<'a, C> {
    fn deref_mut(&mut self) -> &mut Histogram<C> {
        self.hist
    }
}

impl<'a, C: Counter> fmt::Debug for Snapshot<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Snapshot").field(&*self.hist).finish()
    }
}

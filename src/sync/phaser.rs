use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::trace;

/// A writer-reader phaser.
///
/// Any number of writers may enter and exit short critical sections without ever blocking. A
/// single reader at a time may [`flip`](ReaderGuard::flip) the phase, which waits for every
/// writer that entered *before* the flip to exit, and never for writers that enter after it.
///
/// The phase is encoded in the sign of the epoch counters: during an even phase `start_epoch`
/// counts up from 0, during an odd phase it counts up from `i64::min_value()`. Each writer
/// remembers the value it entered with, and on exit bumps the end epoch matching that sign.
/// When the end epoch of the old phase catches up with the start epoch captured at the flip,
/// the old cohort of writers has drained.
#[derive(Debug)]
pub struct Phaser {
    start_epoch: AtomicI64,
    even_end_epoch: AtomicI64,
    odd_end_epoch: AtomicI64,
    reader: Mutex<()>,
}

impl Default for Phaser {
    fn default() -> Self {
        Phaser::new()
    }
}

impl Phaser {
    /// Create a phaser in the even phase with no writers inside.
    pub fn new() -> Phaser {
        Phaser {
            start_epoch: AtomicI64::new(0),
            even_end_epoch: AtomicI64::new(0),
            odd_end_epoch: AtomicI64::new(i64::min_value()),
            reader: Mutex::new(()),
        }
    }

    /// Enter a writer critical section. Never blocks.
    ///
    /// The returned token must be handed back to [`writer_exit`](Phaser::writer_exit) exactly
    /// once; its sign identifies the phase the writer entered in.
    pub fn writer_enter(&self) -> i64 {
        self.start_epoch
            .fetch_add(1, Ordering::SeqCst)
            .wrapping_add(1)
    }

    /// Leave the writer critical section entered with `token`. Never blocks.
    pub fn writer_exit(&self, token: i64) {
        let end_epoch = if token < 0 {
            &self.odd_end_epoch
        } else {
            &self.even_end_epoch
        };
        end_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Enter a writer critical section that is left when the returned guard is dropped.
    pub fn writer_critical_section(&self) -> WriterGuard<'_> {
        WriterGuard {
            phaser: self,
            token: self.writer_enter(),
        }
    }

    /// Take the reader lock, blocking while another reader holds it.
    ///
    /// The lock only serializes readers against each other; writers never wait on it. It is
    /// released when the returned guard is dropped.
    pub fn reader_lock(&self) -> ReaderGuard<'_> {
        // the mutex protects no data, so a reader that panicked leaves nothing inconsistent
        let lock = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        ReaderGuard {
            phaser: self,
            _lock: lock,
        }
    }

    fn flip(&self, sleep: Duration) {
        let start_epoch = self.start_epoch.load(Ordering::SeqCst);
        let next_phase_is_even = start_epoch < 0;

        // clear the end epoch of the phase we are about to start
        let initial_start_value = if next_phase_is_even {
            self.even_end_epoch.store(0, Ordering::SeqCst);
            0
        } else {
            self.odd_end_epoch.store(i64::min_value(), Ordering::SeqCst);
            i64::min_value()
        };

        // new writers now enter in the next phase
        let start_value_at_flip = self
            .start_epoch
            .swap(initial_start_value, Ordering::SeqCst);

        let previous_end_epoch = if next_phase_is_even {
            &self.odd_end_epoch
        } else {
            &self.even_end_epoch
        };

        let mut rounds = 0_u64;
        while previous_end_epoch.load(Ordering::SeqCst) != start_value_at_flip {
            if sleep == Duration::from_nanos(0) {
                thread::yield_now();
            } else {
                thread::sleep(sleep);
            }
            rounds += 1;
        }

        trace!(
            next_phase_is_even,
            start_value_at_flip,
            rounds,
            "phaser flipped"
        );
    }
}

/// An open writer critical section. Exits the section on drop.
#[derive(Debug)]
pub struct WriterGuard<'a> {
    phaser: &'a Phaser,
    token: i64,
}

impl<'a> WriterGuard<'a> {
    /// The token this section entered with.
    pub fn token(&self) -> i64 {
        self.token
    }
}

impl<'a> Drop for WriterGuard<'a> {
    fn drop(&mut self) {
        self.phaser.writer_exit(self.token);
    }
}

/// The held reader lock of a [`Phaser`]. Unlocks on drop.
#[derive(Debug)]
pub struct ReaderGuard<'a> {
    phaser: &'a Phaser,
    _lock: MutexGuard<'a, ()>,
}

impl<'a> ReaderGuard<'a> {
    /// Start a new phase and wait until every writer that entered during the previous phase has
    /// exited.
    ///
    /// While waiting, the reader yields its time slice if `sleep` is zero and sleeps for `sleep`
    /// otherwise. A writer that entered and never exits makes this spin forever.
    pub fn flip(&mut self, sleep: Duration) {
        self.phaser.flip(sleep);
    }

    /// Release the reader lock.
    pub fn unlock(self) {}
}

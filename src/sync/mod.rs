//! Recording into a histogram from many threads while one reader takes interval snapshots.
//!
//! [`Phaser`] is the synchronization primitive: writers enter and leave cheap critical
//! sections, and the reader flips the phase to wait for the writers already inside.
//! [`IntervalRecorder`] builds on it to double-buffer two histograms.

mod phaser;
mod recorder;

pub use self::phaser::{Phaser, ReaderGuard, WriterGuard};
pub use self::recorder::{IntervalRecorder, Snapshot};

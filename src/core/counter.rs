use num_traits as num;
use std::fmt;
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// This trait represents the operations a histogram must be able to perform on the underlying
/// counter type. The `ToPrimitive` trait is needed to perform floating point operations on the
/// counts (usually for percentiles and the mean). The `FromPrimitive` to convert back into an
/// integer count.
///
/// Every counter width names the atomic cell it is stored in, so that a histogram can be
/// recorded into through a shared reference from many threads at once.
pub trait Counter:
    num::Num
    + num::ToPrimitive
    + num::FromPrimitive
    + num::Unsigned
    + Copy
    + PartialOrd<Self>
    + fmt::Debug
    + Send
    + Sync
    + 'static
{
    /// The atomic storage cell for this counter width.
    type Atomic: AtomicCount<Self>;

    /// Counter as a f64.
    fn as_f64(&self) -> f64;
    /// Counter as a u64.
    fn as_u64(&self) -> u64;
}

/// A single slot of histogram storage.
///
/// Increments are relaxed read-modify-writes: ordering with respect to a reader is established
/// by whoever hands the histogram over (the interval recorder's phaser, or a thread join).
pub trait AtomicCount<C>: Default + fmt::Debug + Send + Sync {
    /// Current count.
    fn get(&self) -> C;
    /// Add `n` to the count, wrapping on overflow.
    fn add(&self, n: C);
    /// Overwrite the count through an exclusive borrow.
    fn set(&mut self, n: C);
}

macro_rules! counter_impl {
    ($counter:ty, $atomic:ty) => {
        impl Counter for $counter {
            type Atomic = $atomic;

            #[inline]
            fn as_f64(&self) -> f64 {
                *self as f64
            }
            #[inline]
            fn as_u64(&self) -> u64 {
                *self as u64
            }
        }

        impl AtomicCount<$counter> for $atomic {
            #[inline]
            fn get(&self) -> $counter {
                self.load(Ordering::Relaxed)
            }
            #[inline]
            fn add(&self, n: $counter) {
                self.fetch_add(n, Ordering::Relaxed);
            }
            #[inline]
            fn set(&mut self, n: $counter) {
                *self.get_mut() = n;
            }
        }
    };
}

counter_impl!(u8, AtomicU8);
counter_impl!(u16, AtomicU16);
counter_impl!(u32, AtomicU32);
counter_impl!(u64, AtomicU64);

//! Error types used throughout this library.

use std::error::Error;
use std::fmt;

/// Errors that can occur when creating a histogram.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum CreationError {
    /// Lowest trackable value must be >= 1.
    LowIsZero,
    /// Number of significant figures must be in the range `[1, 5]`. It is capped at 5 because 5
    /// significant digits is already more than almost anyone needs, and memory usage scales
    /// exponentially as this increases.
    SigFigOutOfRange,
    /// Highest trackable value must be >= 2 * lowest trackable value for some internal
    /// calculations to work out. In practice, high is typically much higher than 2 * low.
    HighLessThanTwiceLow,
    /// Cannot represent sigfig worth of values beyond the lowest trackable value. Decrease the
    /// significant figures, lowest trackable value, or both.
    ///
    /// This could happen if low is very large (like 2^50) and sigfigs is 5, which requires 18
    /// additional bits, which would then require more bits than will fit in an i64.
    CannotRepresentSigFigBeyondLow,
    /// The counts array could not be allocated.
    AllocationFailed,
}

impl fmt::Display for CreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationError::LowIsZero => write!(f, "lowest trackable value must be >= 1"),
            CreationError::SigFigOutOfRange => {
                write!(f, "significant figures must be between 1 and 5")
            }
            CreationError::HighLessThanTwiceLow => write!(
                f,
                "highest trackable value must be >= 2 * lowest trackable value"
            ),
            CreationError::CannotRepresentSigFigBeyondLow => write!(
                f,
                "cannot represent significant figures worth of values beyond lowest value"
            ),
            CreationError::AllocationFailed => write!(f, "could not allocate counts array"),
        }
    }
}

impl Error for CreationError {}

/// Errors that can occur while recording a value and its associated count.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum RecordError {
    /// Recorded values cannot be negative.
    NegativeValue,
    /// The value maps past the last slot of the histogram. Configure a higher maximum value.
    ValueOutOfRange,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::NegativeValue => write!(f, "value must not be negative"),
            RecordError::ValueOutOfRange => {
                write!(f, "value is outside the histogram's trackable range")
            }
        }
    }
}

impl Error for RecordError {}

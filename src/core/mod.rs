//! core components and types used throughout this library

/// Bucket layout derivation and the index math built on it.
pub mod config;

/// Counter type defining operations required by the histogram and impls for primitives.
pub mod counter;

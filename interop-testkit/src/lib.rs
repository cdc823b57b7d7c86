//! Interop Test Kit - fixtures and round-trip checks.
//!
//! Shared by the integration tests under `tests/` and usable from any crate
//! that registers its own converters.
//!
//! # Contents
//!
//! | Item | Description |
//! |------|-------------|
//! | [`fixtures`] | The 6x6 sparse matrix, a daily xts series, a small data frame, one value per kind |
//! | [`round_trip`] | Lift then project through a registry |
//! | [`assert_round_trip`] | Same, panicking with the failing size and type on mismatch |
//! | [`SIZES`] | Lengths every round-trip test covers |
//!
//! # Example
//!
//! ```
//! use interop_testkit::{assert_round_trip, SIZES};
//! use interop_core::ConversionRegistry;
//!
//! let mut registry = ConversionRegistry::new();
//! registry.seal();
//! for n in SIZES {
//!     assert_round_trip(&registry, (0..n as i32).collect::<Vec<i32>>());
//! }
//! ```

pub mod fixtures;
mod roundtrip;

pub use roundtrip::{assert_round_trip, round_trip, SIZES};

/// Re-export interop_core for convenience in tests.
pub use interop_core;

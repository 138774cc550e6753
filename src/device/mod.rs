//! Device abstraction layer
//!
//! Defines the capability trait the host's GPU backend implements, plus the
//! recording mock device used for tests and GPU-less development.

pub mod traits;
pub mod types;

#[cfg(feature = "mock-device")]
pub mod mock;

pub use traits::*;
pub use types::*;

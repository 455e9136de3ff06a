//! sl-core: shared foundation for sigloop.
//!
//! Contains:
//! - error (shared error types)
//! - ids (component and net identifiers, ground net)
//! - numeric (Real + tolerances + float helpers)
//! - units (uom SI types for measured electrical quantities)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{SlError, SlResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;

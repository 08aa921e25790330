//! Merge-patch engine for mfst objects.
//!
//! [`Patcher::diff`] computes a minimal JSON overlay between two states of an
//! object, [`Patcher::apply`] merges an overlay onto an encoded base and
//! validates the result, and [`Patcher::create`] derives an overlay from a
//! mutation closure.
//!
//! # Example
//!
//! ```ignore
//! let overlay = patcher.create_resource(&car, |c| c.status.speed = 24.7)?;
//! assert_eq!(overlay, br#"{"status":{"speed":24.7}}"#);
//! ```

mod merge;
mod patcher;

pub use merge::{merge_apply, merge_diff};
pub use patcher::{PatchError, Patcher};

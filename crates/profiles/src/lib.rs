//! Behavior profile registry for promptline.
//!
//! Holds the built-in and custom profiles, the currently active profile, and
//! the log of profile switches. Registration is the only way to add a
//! profile, and every candidate passes length bounds and the security screen
//! first.

pub mod builtin;
pub mod registry;

pub use builtin::{DEFAULT_PROFILE_ID, builtin_profiles};
pub use registry::{DEFAULT_HISTORY_CAPACITY, ProfileRegistry, validate_new_profile};

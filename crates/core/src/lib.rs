//! # promptline core
//!
//! Domain types, traits, and error definitions shared by every promptline
//! crate. Nothing here talks to the network or owns a runtime; the concrete
//! generator, audit sinks, and HTTP surface live in their own crates and
//! implement the traits defined here.

pub mod error;
pub mod generator;
pub mod profile;

pub use error::{AuditError, Error, GenerationError, ProfileError, Result};
pub use generator::{GenerationRequest, Generator};
pub use profile::{NewProfile, Profile, ProfileOrigin, ProfileSummary, ProfileTransition};

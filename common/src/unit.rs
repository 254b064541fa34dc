//! Marker types distinguishing [`DateTimeOf`] kinds.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker of an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker of an entity last modification.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker of an entity expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

//! Identifier and secret newtypes shared by the registry, cache, and flows.

pub mod id;
pub mod secret;

pub use id::*;
pub use secret::*;

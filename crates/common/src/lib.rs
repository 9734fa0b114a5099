//! Shared types for the OAuth client workspace: secret handling and
//! configuration-loading errors.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;

//! Shared types for the roadmap generation service

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;

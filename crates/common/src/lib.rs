//! Shared types for the interview admin workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;

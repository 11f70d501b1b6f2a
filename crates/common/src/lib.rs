//! Types shared by the playlist gallery crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;

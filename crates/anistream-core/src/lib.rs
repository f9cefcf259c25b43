//! anistream-core: shared errors, configuration, and the playback data model.
//!
//! This crate is the foundational dependency for the `anistream` server,
//! providing a unified error type with HTTP status mapping, the TOML-backed
//! application configuration, and the source/link types that flow from the
//! catalog through the resolver to the client.

pub mod config;
pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use media::*;

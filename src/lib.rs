//! anistream: episode source resolution and a streaming reverse proxy for an
//! obfuscated anime catalog.
//!
//! The library crate exposes every component so integration tests can build
//! the server around stubbed collaborators.

pub mod cache;
pub mod catalog;
pub mod decoder;
pub mod http;
pub mod images;
pub mod proxy;
pub mod resolver;
pub mod schedule;
pub mod server;
pub mod skip;

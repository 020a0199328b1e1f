//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the session client:
//! - Durable key/value storage (the browser-storage equivalent)
//! - HTTP client construction and bearer headers
//! - Hashing helpers for log-safe secret fingerprints

pub mod client;
pub mod crypto;
pub mod storage;

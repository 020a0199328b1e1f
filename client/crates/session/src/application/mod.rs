//! Application Layer
//!
//! Session lifecycle, token handling, role resolution and configuration.

pub mod config;
pub mod controller;
pub mod identity;
pub mod role_resolver;
pub mod session_exchange;
pub mod session_state;
pub mod token_store;

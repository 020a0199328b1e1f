//! Shared Kernel - Cross-crate minimal core
//!
//! The smallest vocabulary every other crate in the workspace agrees on:
//! - User-facing error type and result alias
//! - Error classification that maps onto HTTP status codes
//!
//! Only things that are hard to change and mean the same thing
//! everywhere belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}

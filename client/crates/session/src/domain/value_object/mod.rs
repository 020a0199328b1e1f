//! Value Object Module

pub mod account_status;
pub mod email;
pub mod role;
pub mod session_token;

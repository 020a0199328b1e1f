//! Entity Module

pub mod application_user;
pub mod provider_identity;
pub mod registration;

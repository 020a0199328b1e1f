//! Infrastructure Layer
//!
//! HTTP adapters for the HR API and the identity provider.

pub mod dto;
pub mod gateway;
pub mod http_api;
pub mod identity_rest;
pub mod memory;

pub use gateway::RequestGateway;
pub use http_api::HttpSessionApi;
pub use identity_rest::RestIdentityProvider;
pub use memory::InMemoryIdentityProvider;

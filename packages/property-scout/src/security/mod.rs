//! Handling of API keys for the external services.

pub mod credentials;

pub use credentials::{ApiKey, ServiceCredentials};

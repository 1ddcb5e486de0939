// veeamly-api: Async Rust client for the Veeam Backup & Replication REST API

pub mod auth;
pub mod client;
pub mod error;
pub mod jobs;
pub mod repositories;
pub mod system;
pub mod transport;
pub mod version;

pub use auth::{TokenGrant, TokenResponse};
pub use client::{API_VERSION_HEADER, VeeamClient};
pub use error::Error;
pub use repositories::ExtentMode;
pub use transport::{TlsMode, TransportConfig};
pub use version::{ApiVersion, Capabilities, Capability};

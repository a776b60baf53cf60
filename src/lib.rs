//! external-dns webhook provider for the Synology DSM DNS Server package.

pub mod config;
pub mod dns;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod health;
pub mod provider;
pub mod synology;
pub mod translate;

pub use error::{ClientError, ProviderError};
pub use provider::{Cancel, Provider, SynologyProvider};

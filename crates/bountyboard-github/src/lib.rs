//! GitHub adapter for Bountyboard
//!
//! Implements the core's tracker and identity seams against the GitHub REST
//! API and verifies webhook delivery signatures.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod signature;

pub use client::GithubClient;
pub use config::{GithubConfig, DEFAULT_API_URL};
pub use error::GithubError;
pub use model::{BountyMarker, MIGRATED_LABEL};
pub use signature::{sign, verify_signature, SIGNATURE_HEADER};

/// Result type for GitHub adapter operations
pub type Result<T> = std::result::Result<T, GithubError>;

//! # scout-gcp
//!
//! Upstream GCP API clients for cloudscout.
//!
//! This crate provides:
//! - An authenticated HTTP client handle shared by all API calls
//! - OAuth2 token providers (static token, GCE metadata server)
//! - The Kubernetes Engine cluster lister used by the collection core
//! - Project discovery via the Cloud Resource Manager API
//!
//! Credential material itself is never managed here: a token provider is an
//! externally-chosen strategy handed to the client at construction.

pub mod auth;
pub mod client;
pub mod container;
pub mod resource_manager;

// Re-export commonly used types
pub use auth::{MetadataTokenProvider, StaticTokenProvider};
pub use client::GcpApiClient;
pub use container::GkeClusterClient;
pub use resource_manager::ProjectDiscovery;

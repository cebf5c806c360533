//! Core type definitions for cloudscout

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a monitored GCP project.
///
/// Supplied at collector construction (from configuration or project
/// discovery) and shared read-only across all concurrent work units during a
/// scrape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef(String);

impl ProjectRef {
    /// Create a new ProjectRef from a project id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation of the project id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ProjectRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One Kubernetes Engine cluster as reported by the upstream API at scrape
/// time.
///
/// Exists only transiently within one collection cycle; never persisted or
/// cached across cycles. Field values are taken verbatim from the API
/// response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// Cluster name
    pub name: String,

    /// Zone or region the cluster lives in
    pub location: String,

    /// Upstream status string (e.g. "RUNNING", "PROVISIONING", "ERROR")
    pub status: String,

    /// Version currently running on the cluster's nodes
    pub current_node_version: String,

    /// Number of nodes currently in the cluster
    pub current_node_count: i64,
}

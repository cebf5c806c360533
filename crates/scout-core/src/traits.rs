//! Core traits for cloudscout components
//!
//! These traits define the seams between the collection core and the
//! upstream GCP APIs. The GCP implementations live in scout-gcp; tests
//! substitute in-memory fakes.

use crate::{ClusterSnapshot, ProjectRef, Result};
use async_trait::async_trait;

/// Trait for listing Kubernetes Engine clusters in a project.
///
/// One `begin_cycle` call precedes the per-project fan-out of each
/// collection cycle; `list_clusters` is then invoked once per monitored
/// project, concurrently.
#[async_trait]
pub trait ClusterLister: Send + Sync {
    /// Prepare the client for one collection cycle.
    ///
    /// For the GCP implementation this obtains or refreshes the OAuth2
    /// access token. A failure here aborts the whole cycle: no project can
    /// be queried without a working client.
    async fn begin_cycle(&self) -> Result<()>;

    /// List the clusters currently visible in the given project.
    async fn list_clusters(&self, project: &ProjectRef) -> Result<Vec<ClusterSnapshot>>;
}

/// Trait for supplying OAuth2 access tokens to API clients.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a token valid for at least the next request.
    async fn access_token(&self) -> Result<String>;
}

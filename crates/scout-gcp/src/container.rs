//! Kubernetes Engine API client

use crate::client::GcpApiClient;
use async_trait::async_trait;
use scout_core::{ClusterLister, ClusterSnapshot, ProjectRef, Result};
use serde::Deserialize;
use tracing::debug;

/// Lists clusters through the Kubernetes Engine v1 REST API.
///
/// One instance serves all monitored projects; the project id is embedded in
/// each request path. The wildcard `-` location scans every zone and region
/// the project has clusters in.
pub struct GkeClusterClient {
    api: GcpApiClient,
    endpoint: String,
}

/// Response to a cluster list call
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListClustersResponse {
    #[serde(default)]
    clusters: Vec<ClusterDto>,
}

/// One cluster as returned by the API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterDto {
    #[serde(default)]
    name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    current_node_version: String,
    #[serde(default)]
    current_node_count: i64,
}

impl ClusterDto {
    fn into_snapshot(self) -> ClusterSnapshot {
        ClusterSnapshot {
            name: self.name,
            location: self.location,
            status: self.status,
            current_node_version: self.current_node_version,
            current_node_count: self.current_node_count,
        }
    }
}

impl GkeClusterClient {
    /// Create a new cluster client against the given API endpoint
    pub fn new(api: GcpApiClient, endpoint: impl Into<String>) -> Self {
        Self {
            api,
            endpoint: endpoint.into(),
        }
    }

    fn clusters_url(&self, project: &ProjectRef) -> String {
        format!(
            "{}/v1/projects/{}/locations/-/clusters",
            self.endpoint.trim_end_matches('/'),
            project
        )
    }
}

#[async_trait]
impl ClusterLister for GkeClusterClient {
    async fn begin_cycle(&self) -> Result<()> {
        self.api.ensure_token().await
    }

    async fn list_clusters(&self, project: &ProjectRef) -> Result<Vec<ClusterSnapshot>> {
        let url = self.clusters_url(project);
        let response: ListClustersResponse = self.api.get_json(&url).await?;

        debug!(
            "project {}: listed {} clusters",
            project,
            response.clusters.len()
        );

        Ok(response
            .clusters
            .into_iter()
            .map(ClusterDto::into_snapshot)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn client(endpoint: &str) -> GkeClusterClient {
        let api = GcpApiClient::new(
            Arc::new(StaticTokenProvider::new("test-token")),
            Duration::from_secs(5),
        )
        .unwrap();
        GkeClusterClient::new(api, endpoint)
    }

    #[test]
    fn test_clusters_url_embeds_project() {
        let client = client("https://container.googleapis.com/");
        assert_eq!(
            client.clusters_url(&ProjectRef::new("proj-a")),
            "https://container.googleapis.com/v1/projects/proj-a/locations/-/clusters"
        );
    }

    #[test]
    fn test_list_response_deserialization() {
        let json = r#"{
            "clusters": [
                {
                    "name": "c1",
                    "location": "us-central1-a",
                    "status": "RUNNING",
                    "currentNodeVersion": "1.27.3-gke.100",
                    "currentNodeCount": 3,
                    "currentMasterVersion": "1.27.3-gke.100",
                    "network": "default"
                },
                {
                    "name": "c2",
                    "location": "europe-west1",
                    "status": "PROVISIONING",
                    "currentNodeVersion": "1.26.5-gke.200"
                }
            ]
        }"#;

        let response: ListClustersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.clusters.len(), 2);

        let c1 = response.clusters[0].clone().into_snapshot();
        assert_eq!(c1.name, "c1");
        assert_eq!(c1.location, "us-central1-a");
        assert_eq!(c1.status, "RUNNING");
        assert_eq!(c1.current_node_version, "1.27.3-gke.100");
        assert_eq!(c1.current_node_count, 3);

        // currentNodeCount absent defaults to zero.
        let c2 = response.clusters[1].clone().into_snapshot();
        assert_eq!(c2.current_node_count, 0);
        assert_eq!(c2.status, "PROVISIONING");
    }

    #[test]
    fn test_empty_list_response() {
        let response: ListClustersResponse = serde_json::from_str("{}").unwrap();
        assert!(response.clusters.is_empty());
    }
}

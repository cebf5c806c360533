//! Cloud Resource Manager API client for project discovery

use crate::client::GcpApiClient;
use scout_core::{ProjectRef, Result};
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info};

/// Discovers the active projects visible to the exporter's credentials.
///
/// Used once at startup when no explicit project list is configured.
pub struct ProjectDiscovery {
    api: GcpApiClient,
    endpoint: String,
}

/// One page of the project list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListProjectsResponse {
    #[serde(default)]
    projects: Vec<ProjectDto>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDto {
    #[serde(default)]
    project_id: String,
}

impl ProjectDiscovery {
    /// Create a new discovery client against the given API endpoint
    pub fn new(api: GcpApiClient, endpoint: impl Into<String>) -> Self {
        Self {
            api,
            endpoint: endpoint.into(),
        }
    }

    fn projects_url(&self, page_token: Option<&str>) -> String {
        let base = format!(
            "{}/v1/projects?filter=lifecycleState:ACTIVE",
            self.endpoint.trim_end_matches('/')
        );
        match page_token {
            Some(token) => format!("{}&pageToken={}", base, token),
            None => base,
        }
    }

    /// List all active projects, following pagination to exhaustion
    pub async fn list_projects(&self) -> Result<Vec<ProjectRef>> {
        let projects = collect_pages(|page_token| async move {
            let url = self.projects_url(page_token.as_deref());
            self.api.get_json::<ListProjectsResponse>(&url).await
        })
        .await?;

        info!("discovered {} active projects", projects.len());
        Ok(projects)
    }
}

/// Drive a page-fetch callback until the API stops returning page tokens
async fn collect_pages<F, Fut>(fetch: F) -> Result<Vec<ProjectRef>>
where
    F: Fn(Option<String>) -> Fut,
    Fut: Future<Output = Result<ListProjectsResponse>>,
{
    let mut projects = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = fetch(page_token.take()).await?;
        debug!("project list page: {} entries", page.projects.len());

        projects.extend(
            page.projects
                .into_iter()
                .filter(|p| !p.project_id.is_empty())
                .map(|p| ProjectRef::new(p.project_id)),
        );

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use scout_core::Error;
    use std::sync::Arc;
    use std::time::Duration;

    fn discovery(endpoint: &str) -> ProjectDiscovery {
        let api = GcpApiClient::new(
            Arc::new(StaticTokenProvider::new("test-token")),
            Duration::from_secs(5),
        )
        .unwrap();
        ProjectDiscovery::new(api, endpoint)
    }

    #[test]
    fn test_projects_url() {
        let discovery = discovery("https://cloudresourcemanager.googleapis.com");
        assert_eq!(
            discovery.projects_url(None),
            "https://cloudresourcemanager.googleapis.com/v1/projects?filter=lifecycleState:ACTIVE"
        );
        assert_eq!(
            discovery.projects_url(Some("tok-123")),
            "https://cloudresourcemanager.googleapis.com/v1/projects?filter=lifecycleState:ACTIVE&pageToken=tok-123"
        );
    }

    #[test]
    fn test_list_response_deserialization() {
        let json = r#"{
            "projects": [
                {"projectId": "proj-a", "name": "Project A", "lifecycleState": "ACTIVE"},
                {"projectId": "proj-b", "name": "Project B", "lifecycleState": "ACTIVE"}
            ],
            "nextPageToken": "tok-456"
        }"#;

        let response: ListProjectsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.projects.len(), 2);
        assert_eq!(response.projects[0].project_id, "proj-a");
        assert_eq!(response.next_page_token.as_deref(), Some("tok-456"));
    }

    #[tokio::test]
    async fn test_pagination_follows_tokens_to_exhaustion() {
        let fetch = |page_token: Option<String>| async move {
            match page_token.as_deref() {
                None => Ok(ListProjectsResponse {
                    projects: vec![ProjectDto {
                        project_id: "proj-a".to_string(),
                    }],
                    next_page_token: Some("page-2".to_string()),
                }),
                Some("page-2") => Ok(ListProjectsResponse {
                    projects: vec![ProjectDto {
                        project_id: "proj-b".to_string(),
                    }],
                    next_page_token: None,
                }),
                Some(other) => Err(Error::internal(format!("unexpected token {}", other))),
            }
        };

        let projects = collect_pages(fetch).await.unwrap();
        assert_eq!(
            projects,
            vec![ProjectRef::new("proj-a"), ProjectRef::new("proj-b")]
        );
    }

    #[tokio::test]
    async fn test_pagination_propagates_page_errors() {
        let fetch = |_page_token: Option<String>| async move {
            Err(Error::api(403, "forbidden".to_string()))
        };

        let result = collect_pages(fetch).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_project_ids_are_skipped() {
        let fetch = |_page_token: Option<String>| async move {
            Ok(ListProjectsResponse {
                projects: vec![
                    ProjectDto {
                        project_id: String::new(),
                    },
                    ProjectDto {
                        project_id: "proj-a".to_string(),
                    },
                ],
                next_page_token: None,
            })
        };

        let projects = collect_pages(fetch).await.unwrap();
        assert_eq!(projects, vec![ProjectRef::new("proj-a")]);
    }
}

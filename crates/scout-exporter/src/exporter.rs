//! Exporter lifecycle

use crate::{endpoint::MetricsEndpoint, Result};
use scout_collector::{CollectorRegistry, KubernetesCollector};
use scout_core::{Config, ProjectRef};
use scout_gcp::{GcpApiClient, GkeClusterClient, ProjectDiscovery};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

/// The cloudscout exporter daemon.
///
/// Construction resolves the monitored project list and registers the
/// collectors; `run` serves scrapes until a shutdown signal arrives.
pub struct Exporter {
    config: Config,
    endpoint: MetricsEndpoint,
}

impl Exporter {
    /// Create a new exporter from configuration.
    ///
    /// Fails fast on configuration problems or when project resolution
    /// yields nothing to monitor; per-cycle collection failures later on
    /// never terminate the process.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let api = GcpApiClient::from_config(&config.gcp)?;
        let projects = resolve_projects(&config, &api).await?;
        info!("monitoring {} projects", projects.len());

        let lister = Arc::new(GkeClusterClient::new(
            api.clone(),
            config.gcp.container_endpoint.clone(),
        ));

        let mut registry = CollectorRegistry::new();
        registry.register(Arc::new(KubernetesCollector::new(
            lister,
            projects,
            Duration::from_secs(config.scrape.project_timeout_seconds),
        )))?;

        let endpoint = MetricsEndpoint::new(Arc::new(registry), config.metrics_bind_addr());

        Ok(Self { config, endpoint })
    }

    /// Get the exporter configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start serving scrapes
    pub async fn start(&mut self) -> Result<()> {
        self.endpoint.start().await?;
        info!("cloudscout exporter started, metrics at {}", self.endpoint.metrics_url());
        Ok(())
    }

    /// Stop serving scrapes
    pub async fn stop(&mut self) {
        info!("Stopping cloudscout exporter");
        self.endpoint.stop().await;
    }

    /// Run the exporter until a shutdown signal is received
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }

        self.stop().await;

        Ok(())
    }
}

/// Resolve the projects to monitor: the configured list when present,
/// Resource Manager discovery otherwise.
async fn resolve_projects(config: &Config, api: &GcpApiClient) -> Result<Vec<ProjectRef>> {
    if !config.projects.ids.is_empty() {
        return Ok(config
            .projects
            .ids
            .iter()
            .map(|id| ProjectRef::new(id.as_str()))
            .collect());
    }

    info!("no projects configured, discovering via Cloud Resource Manager");
    let discovery = ProjectDiscovery::new(
        api.clone(),
        config.gcp.resource_manager_endpoint.clone(),
    );
    let projects = discovery.list_projects().await?;

    if projects.is_empty() {
        return Err(crate::ExporterError::Config(
            "project discovery returned no active projects".to_string(),
        ));
    }

    Ok(projects)
}

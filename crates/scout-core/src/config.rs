//! Configuration management for cloudscout
//!
//! Provides a unified configuration system that supports YAML files,
//! environment variables, and command-line argument overrides.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Main configuration structure for the exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Monitored projects configuration
    pub projects: ProjectsConfig,

    /// Upstream GCP API configuration
    pub gcp: GcpConfig,

    /// Scrape behavior configuration
    pub scrape: ScrapeConfig,

    /// Network configuration
    pub network: NetworkConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Configuration file
    /// 3. Defaults (lowest)
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        // Start with defaults
        builder = builder.add_source(config::Config::try_from(&Self::default())?);

        // Add configuration file if it exists
        if let Ok(config_path) = std::env::var("SCOUT_CONFIG") {
            builder = builder.add_source(config::File::with_name(&config_path).required(false));
        } else {
            // Try common config file locations
            for path in &["./cloudscout.yaml", "/etc/cloudscout/config.yaml"] {
                builder = builder.add_source(config::File::with_name(path).required(false));
            }
        }

        // Add environment variables with SCOUT_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("SCOUT")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let parsed: Self = config.try_deserialize()?;

        parsed.validate()?;

        Ok(parsed)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path));

        let config = builder.build()?;
        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;

        Ok(parsed)
    }

    /// Write the configuration to a YAML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.projects.validate()?;
        self.gcp.validate()?;
        self.scrape.validate()?;
        self.network.validate()?;

        Ok(())
    }

    /// Get the bind address for the metrics server
    pub fn metrics_bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.network.bind_ip, self.network.metrics_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects: ProjectsConfig::default(),
            gcp: GcpConfig::default(),
            scrape: ScrapeConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Which projects to monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Explicit project ids to monitor. Takes precedence over discovery.
    pub ids: Vec<String>,

    /// Discover active projects via the Cloud Resource Manager API when no
    /// explicit ids are configured.
    pub discover: bool,
}

impl ProjectsConfig {
    /// Validate the projects configuration
    pub fn validate(&self) -> Result<()> {
        if self.ids.is_empty() && !self.discover {
            return Err(crate::Error::config(
                "no projects configured: set projects.ids or enable projects.discover",
            ));
        }

        if self.ids.iter().any(|id| id.trim().is_empty()) {
            return Err(crate::Error::config("projects.ids contains an empty id"));
        }

        Ok(())
    }
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            discover: true,
        }
    }
}

/// Upstream GCP API endpoints and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcpConfig {
    /// Kubernetes Engine API endpoint
    pub container_endpoint: String,

    /// Cloud Resource Manager API endpoint
    pub resource_manager_endpoint: String,

    /// GCE metadata server endpoint (token source on GCP-hosted deployments)
    pub metadata_endpoint: String,

    /// Static OAuth2 access token. When set, the metadata server is never
    /// contacted. Intended for local runs and tests.
    pub access_token: Option<String>,

    /// Timeout for individual upstream HTTP requests (seconds)
    pub request_timeout_seconds: u64,
}

impl GcpConfig {
    /// Validate the GCP configuration
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("gcp.container_endpoint", &self.container_endpoint),
            (
                "gcp.resource_manager_endpoint",
                &self.resource_manager_endpoint,
            ),
            ("gcp.metadata_endpoint", &self.metadata_endpoint),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(crate::Error::config(format!(
                    "{} must be an http(s) URL, got {:?}",
                    field, value
                )));
            }
        }

        if self.request_timeout_seconds == 0 {
            return Err(crate::Error::config(
                "gcp.request_timeout_seconds must be greater than zero",
            ));
        }

        Ok(())
    }
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            container_endpoint: "https://container.googleapis.com".to_string(),
            resource_manager_endpoint: "https://cloudresourcemanager.googleapis.com".to_string(),
            metadata_endpoint: "http://metadata.google.internal".to_string(),
            access_token: None,
            request_timeout_seconds: 30,
        }
    }
}

/// Scrape behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Deadline for one project's list call within a collection cycle
    /// (seconds). A project that exceeds it is logged as failed for that
    /// cycle without delaying the others.
    pub project_timeout_seconds: u64,
}

impl ScrapeConfig {
    /// Validate the scrape configuration
    pub fn validate(&self) -> Result<()> {
        if self.project_timeout_seconds == 0 {
            return Err(crate::Error::config(
                "scrape.project_timeout_seconds must be greater than zero",
            ));
        }

        Ok(())
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            project_timeout_seconds: 10,
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// IP address to bind servers to
    pub bind_ip: IpAddr,

    /// Port for the metrics HTTP endpoint
    pub metrics_port: u16,
}

impl NetworkConfig {
    /// Validate the network configuration
    pub fn validate(&self) -> Result<()> {
        if self.metrics_port == 0 {
            return Err(crate::Error::config("network.metrics_port must be non-zero"));
        }

        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            metrics_port: 9402,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,

    /// Show target in logs
    pub show_target: bool,

    /// Show thread IDs in logs
    pub show_thread_ids: bool,

    /// Show line numbers in logs
    pub show_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_line_numbers: false,
        }
    }
}

//! # scout-collector
//!
//! The multi-project collection core for cloudscout.
//!
//! This crate implements the pull-based metrics contract: per-resource-family
//! collectors that describe a fixed metric set and, on each collection cycle,
//! fan a scrape out across every monitored project concurrently, tolerate
//! per-project failure, and stream the resulting samples into a shared
//! channel. The [`CollectorRegistry`] hosts the collectors and turns drained
//! samples into Prometheus metric families.

pub mod fanout;
pub mod kubernetes;
pub mod registry;

// Re-export commonly used types
pub use fanout::{fan_out, CollectReport, ProjectFailure};
pub use kubernetes::KubernetesCollector;
pub use registry::CollectorRegistry;

use async_trait::async_trait;
use scout_core::{MetricDescriptor, Sample};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The two-phase pull contract implemented by every per-resource-family
/// collector.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short name for logs and self-observation labels
    fn name(&self) -> &'static str;

    /// The fixed descriptor set for this collector.
    ///
    /// Must be identical across calls, must not block, and must not touch
    /// the upstream API. The registry uses it to pre-register and validate
    /// metrics before any collect call.
    fn describe(&self) -> Vec<Arc<MetricDescriptor>>;

    /// Perform one full scrape, writing samples to `tx`.
    ///
    /// Returns only once every per-project unit of work has completed;
    /// dropping the last sender signals the registry that the cycle's final
    /// sample has been written. Partial failure is reported through the
    /// [`CollectReport`], never as an error.
    async fn collect(&self, tx: mpsc::UnboundedSender<Sample>) -> CollectReport;
}

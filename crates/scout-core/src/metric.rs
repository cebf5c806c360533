//! The labeled-metric model
//!
//! Collectors describe their metrics once as [`MetricDescriptor`]s and emit
//! point-in-time [`Sample`]s referencing those descriptors. Label matching is
//! positional: a sample's label values line up with its descriptor's label
//! keys by index, and the [`Sample::new`] constructor rejects arity
//! mismatches.

use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Whether a metric is cumulative or a point-in-time value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}

/// Static metadata for one exported metric.
///
/// Created once at collector construction and held behind an [`Arc`] for the
/// collector's lifetime. Identity is the fully-qualified name, which must be
/// stable across repeated describe calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Fully-qualified metric name (e.g. "gcp_kubernetes_engine_cluster_up")
    pub name: String,

    /// Help text shown in the exposition format
    pub help: String,

    /// Ordered label key set; sample label values match by position
    pub label_keys: Vec<&'static str>,
}

impl MetricDescriptor {
    /// Create a new descriptor behind an Arc, ready to share with samples
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        label_keys: Vec<&'static str>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            help: help.into(),
            label_keys,
        })
    }
}

/// One point-in-time metric value emitted during a collection cycle.
///
/// Consumed immediately by the registry host; not retained across cycles.
#[derive(Debug, Clone)]
pub struct Sample {
    /// The descriptor this sample instantiates
    pub descriptor: Arc<MetricDescriptor>,

    /// Counter or Gauge
    pub kind: MetricKind,

    /// The sampled value
    pub value: f64,

    /// Label values, positionally matching the descriptor's label keys
    pub label_values: Vec<String>,
}

impl Sample {
    /// Create a sample, checking that the label values match the
    /// descriptor's label keys in arity.
    pub fn new(
        descriptor: Arc<MetricDescriptor>,
        kind: MetricKind,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<Self> {
        if label_values.len() != descriptor.label_keys.len() {
            return Err(Error::internal(format!(
                "sample for {} has {} label values, descriptor declares {} keys",
                descriptor.name,
                label_values.len(),
                descriptor.label_keys.len()
            )));
        }

        Ok(Self {
            descriptor,
            kind,
            value,
            label_values,
        })
    }
}

/// Map an upstream cluster status string to the "up" metric value.
///
/// 1.0 iff the status is exactly "RUNNING"; any other status string,
/// including empty or unknown values, maps to 0.0.
pub fn status_up_value(status: &str) -> f64 {
    if status == "RUNNING" {
        1.0
    } else {
        0.0
    }
}

//! Collector registry: the pull-based host side of the metrics contract
//!
//! The registry owns the describe-phase validation (descriptor names unique
//! and pre-registered before any collect call) and the collect-phase channel
//! lifetime: per scrape it runs every collector, drains the sample channel,
//! and converts the result into Prometheus metric families ready for text
//! encoding.

use crate::fanout::CollectReport;
use crate::Collector;
use prometheus::proto;
use prometheus::{Encoder, TextEncoder};
use scout_core::{Error, MetricDescriptor, MetricKind, Result, Sample};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Registry of per-resource-family collectors.
///
/// Collection never fails from the host's point of view: partial data from a
/// cycle with unreachable projects is a valid, complete result. What did go
/// wrong is visible through logs and the per-collector self-observation
/// metrics.
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
    descriptor_names: HashSet<String>,

    scrape_duration: Arc<MetricDescriptor>,
    scrape_errors: Arc<MetricDescriptor>,
}

impl CollectorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        let scrape_duration = MetricDescriptor::new(
            "scout_scrape_duration_seconds",
            "Time spent collecting from one resource family during the last scrape",
            vec!["collector"],
        );
        let scrape_errors = MetricDescriptor::new(
            "scout_scrape_project_errors",
            "Number of projects that failed during the last scrape",
            vec!["collector"],
        );

        let mut descriptor_names = HashSet::new();
        descriptor_names.insert(scrape_duration.name.clone());
        descriptor_names.insert(scrape_errors.name.clone());

        Self {
            collectors: Vec::new(),
            descriptor_names,
            scrape_duration,
            scrape_errors,
        }
    }

    /// Register a collector, validating its descriptor set.
    ///
    /// Runs the describe phase once and rejects empty or duplicate metric
    /// names before the collector can ever be collected from.
    pub fn register(&mut self, collector: Arc<dyn Collector>) -> Result<()> {
        let descriptors = collector.describe();

        if descriptors.is_empty() {
            return Err(Error::internal(format!(
                "collector {} describes no metrics",
                collector.name()
            )));
        }

        let mut incoming = HashSet::new();
        for desc in &descriptors {
            if desc.name.is_empty() {
                return Err(Error::internal(format!(
                    "collector {} describes a metric with an empty name",
                    collector.name()
                )));
            }
            if self.descriptor_names.contains(&desc.name) || !incoming.insert(&desc.name) {
                return Err(Error::internal(format!(
                    "metric {} is already registered",
                    desc.name
                )));
            }
        }

        for desc in &descriptors {
            self.descriptor_names.insert(desc.name.clone());
        }

        debug!(
            "registered collector {} with {} metrics",
            collector.name(),
            descriptors.len()
        );
        self.collectors.push(collector);
        Ok(())
    }

    /// Number of registered collectors
    pub fn collector_count(&self) -> usize {
        self.collectors.len()
    }

    /// Run one scrape cycle across all registered collectors.
    ///
    /// Infallible by design: per-project errors are consumed by the fan-out
    /// layer, and a collector whose whole cycle aborted simply contributes
    /// no families beyond the self-observation ones.
    pub async fn gather(&self) -> Vec<proto::MetricFamily> {
        let mut families = Vec::new();
        let mut durations = Vec::new();
        let mut error_counts = Vec::new();

        for collector in &self.collectors {
            let start = Instant::now();

            let (tx, mut rx) = mpsc::unbounded_channel();
            let report = collector.collect(tx).await;

            // All senders are gone once collect returns, so this drains to
            // completion without blocking on future writes.
            let mut samples = Vec::new();
            while let Some(sample) = rx.recv().await {
                samples.push(sample);
            }

            let elapsed = start.elapsed().as_secs_f64();
            log_report(collector.name(), &report);

            families.extend(group_samples(collector.as_ref(), samples));
            durations.push((collector.name(), elapsed));
            error_counts.push((collector.name(), report.failure_count() as f64));
        }

        families.push(const_gauge_family(&self.scrape_duration, &durations));
        families.push(const_gauge_family(&self.scrape_errors, &error_counts));

        families
    }

    /// Run one scrape cycle and encode the result in the Prometheus text
    /// exposition format.
    pub async fn encode_text(&self) -> Result<String> {
        let families = self.gather().await;

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| Error::internal(format!("failed to encode metrics: {}", e)))?;

        String::from_utf8(buffer)
            .map_err(|e| Error::internal(format!("metrics are not valid UTF-8: {}", e)))
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn log_report(collector: &str, report: &CollectReport) {
    if let Some(reason) = &report.cycle_error {
        warn!("collector {}: cycle aborted: {}", collector, reason);
    } else if report.failure_count() > 0 {
        warn!(
            "collector {}: {} samples from {} projects, {} projects failed",
            collector,
            report.samples_emitted,
            report.projects_scanned,
            report.failure_count()
        );
    } else {
        debug!(
            "collector {}: {} samples from {} projects",
            collector, report.samples_emitted, report.projects_scanned
        );
    }
}

/// Group drained samples into metric families, in describe order.
///
/// Samples that violate the describe contract (unknown descriptor, label
/// arity mismatch, inconsistent kind) are dropped with a warning rather than
/// corrupting the exposition output.
fn group_samples(collector: &dyn Collector, samples: Vec<Sample>) -> Vec<proto::MetricFamily> {
    let mut by_name: HashMap<String, Vec<Sample>> = HashMap::new();

    for sample in samples {
        if sample.label_values.len() != sample.descriptor.label_keys.len() {
            warn!(
                "collector {}: dropping sample for {} with {} label values ({} expected)",
                collector.name(),
                sample.descriptor.name,
                sample.label_values.len(),
                sample.descriptor.label_keys.len()
            );
            continue;
        }
        by_name
            .entry(sample.descriptor.name.clone())
            .or_default()
            .push(sample);
    }

    let mut families = Vec::new();
    for desc in collector.describe() {
        let Some(samples) = by_name.remove(&desc.name) else {
            continue;
        };

        let kind = samples[0].kind;
        let (matching, mismatched): (Vec<_>, Vec<_>) =
            samples.into_iter().partition(|s| s.kind == kind);
        if !mismatched.is_empty() {
            warn!(
                "collector {}: dropping {} samples for {} with inconsistent metric kind",
                collector.name(),
                mismatched.len(),
                desc.name
            );
        }

        families.push(to_family(&desc, kind, &matching));
    }

    for name in by_name.keys() {
        warn!(
            "collector {}: dropping samples for undescribed metric {}",
            collector.name(),
            name
        );
    }

    families
}

fn to_family(desc: &MetricDescriptor, kind: MetricKind, samples: &[Sample]) -> proto::MetricFamily {
    let mut family = proto::MetricFamily::default();
    family.set_name(desc.name.clone());
    family.set_help(desc.help.clone());
    family.set_field_type(match kind {
        MetricKind::Counter => proto::MetricType::COUNTER,
        MetricKind::Gauge => proto::MetricType::GAUGE,
    });

    for sample in samples {
        let mut metric = proto::Metric::default();

        for (key, value) in desc.label_keys.iter().zip(&sample.label_values) {
            let mut pair = proto::LabelPair::default();
            pair.set_name((*key).to_string());
            pair.set_value(value.clone());
            metric.mut_label().push(pair);
        }

        match kind {
            MetricKind::Counter => {
                let mut counter = proto::Counter::default();
                counter.set_value(sample.value);
                metric.set_counter(counter);
            }
            MetricKind::Gauge => {
                let mut gauge = proto::Gauge::default();
                gauge.set_value(sample.value);
                metric.set_gauge(gauge);
            }
        }

        family.mut_metric().push(metric);
    }

    family
}

/// Build a gauge family with one series per (label value, value) pair
fn const_gauge_family(
    desc: &MetricDescriptor,
    values: &[(&'static str, f64)],
) -> proto::MetricFamily {
    let mut family = proto::MetricFamily::default();
    family.set_name(desc.name.clone());
    family.set_help(desc.help.clone());
    family.set_field_type(proto::MetricType::GAUGE);

    for (label, value) in values {
        let mut metric = proto::Metric::default();

        let mut pair = proto::LabelPair::default();
        pair.set_name(desc.label_keys[0].to_string());
        pair.set_value((*label).to_string());
        metric.mut_label().push(pair);

        let mut gauge = proto::Gauge::default();
        gauge.set_value(*value);
        metric.set_gauge(gauge);

        family.mut_metric().push(metric);
    }

    family
}

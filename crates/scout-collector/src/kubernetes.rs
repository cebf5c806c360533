//! Kubernetes Engine cluster collector

use crate::fanout::{fan_out, CollectReport};
use crate::Collector;
use async_trait::async_trait;
use scout_core::{
    status_up_value, ClusterLister, ClusterSnapshot, MetricDescriptor, MetricKind, ProjectRef,
    Result, Sample,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::error;

/// Prefix shared by all Kubernetes Engine metrics
fn fq_name(name: &str) -> String {
    format!("gcp_kubernetes_engine_{}", name)
}

/// Collector for Kubernetes Engine clusters across all monitored projects.
///
/// Exports one "up" sample and one node-count sample per cluster, labeled by
/// cluster name, location, and current node version.
pub struct KubernetesCollector {
    lister: Arc<dyn ClusterLister>,
    projects: Vec<ProjectRef>,
    project_timeout: Duration,

    up: Arc<MetricDescriptor>,
    nodes: Arc<MetricDescriptor>,
}

impl KubernetesCollector {
    /// Create a new KubernetesCollector.
    ///
    /// The client handle and project list are captured immutably; a
    /// collector is safe to share across concurrent scrapes.
    pub fn new(
        lister: Arc<dyn ClusterLister>,
        projects: Vec<ProjectRef>,
        project_timeout: Duration,
    ) -> Self {
        let label_keys = vec!["name", "location", "version"];

        Self {
            lister,
            projects,
            project_timeout,
            up: MetricDescriptor::new(
                fq_name("cluster_up"),
                "1 if the cluster is running, 0 otherwise",
                label_keys.clone(),
            ),
            nodes: MetricDescriptor::new(
                fq_name("cluster_nodes"),
                "Number of nodes currently in the cluster",
                label_keys,
            ),
        }
    }

    /// Map one cluster snapshot to its samples.
    ///
    /// Label values are [name, location, version], taken verbatim from the
    /// snapshot.
    fn cluster_samples(
        up: &Arc<MetricDescriptor>,
        nodes: &Arc<MetricDescriptor>,
        cluster: &ClusterSnapshot,
    ) -> Result<Vec<Sample>> {
        let labels = vec![
            cluster.name.clone(),
            cluster.location.clone(),
            cluster.current_node_version.clone(),
        ];

        Ok(vec![
            Sample::new(
                up.clone(),
                MetricKind::Counter,
                status_up_value(&cluster.status),
                labels.clone(),
            )?,
            Sample::new(
                nodes.clone(),
                MetricKind::Gauge,
                cluster.current_node_count as f64,
                labels,
            )?,
        ])
    }
}

#[async_trait]
impl Collector for KubernetesCollector {
    fn name(&self) -> &'static str {
        "kubernetes_engine"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![self.up.clone(), self.nodes.clone()]
    }

    async fn collect(&self, tx: mpsc::UnboundedSender<Sample>) -> CollectReport {
        // One client initialization per cycle; without a working client no
        // project can be queried, so the whole cycle is skipped.
        if let Err(e) = self.lister.begin_cycle().await {
            error!("Kubernetes Engine client initialization failed, skipping cycle: {}", e);
            return CollectReport::aborted(e.to_string());
        }

        let lister = self.lister.clone();
        let list = move |project: ProjectRef| {
            let lister = lister.clone();
            async move { lister.list_clusters(&project).await }
        };

        let up = self.up.clone();
        let nodes = self.nodes.clone();
        let mapper = move |_project: &ProjectRef, cluster: &ClusterSnapshot| {
            Self::cluster_samples(&up, &nodes, cluster)
        };

        fan_out(&self.projects, list, mapper, &tx, self.project_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::Error;
    use std::collections::HashMap;

    /// In-memory lister with per-project fixtures and optional injected
    /// cycle failure.
    struct FakeLister {
        clusters: HashMap<ProjectRef, Result<Vec<ClusterSnapshot>>>,
        fail_cycle: bool,
    }

    #[async_trait]
    impl ClusterLister for FakeLister {
        async fn begin_cycle(&self) -> Result<()> {
            if self.fail_cycle {
                return Err(Error::auth("credentials unavailable"));
            }
            Ok(())
        }

        async fn list_clusters(&self, project: &ProjectRef) -> Result<Vec<ClusterSnapshot>> {
            match self.clusters.get(project) {
                Some(Ok(clusters)) => Ok(clusters.clone()),
                Some(Err(e)) => Err(Error::network(e.to_string())),
                None => Ok(Vec::new()),
            }
        }
    }

    fn running_cluster() -> ClusterSnapshot {
        ClusterSnapshot {
            name: "c1".to_string(),
            location: "us-central1-a".to_string(),
            status: "RUNNING".to_string(),
            current_node_version: "1.27".to_string(),
            current_node_count: 3,
        }
    }

    fn collector(lister: FakeLister, projects: &[&str]) -> KubernetesCollector {
        KubernetesCollector::new(
            Arc::new(lister),
            projects.iter().map(|p| ProjectRef::new(*p)).collect(),
            Duration::from_secs(5),
        )
    }

    async fn collect_samples(
        collector: &KubernetesCollector,
    ) -> (Vec<Sample>, CollectReport) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = collector.collect(tx).await;

        let mut samples = Vec::new();
        while let Some(sample) = rx.recv().await {
            samples.push(sample);
        }
        (samples, report)
    }

    #[test]
    fn test_describe_is_stable_and_complete() {
        let collector = collector(
            FakeLister {
                clusters: HashMap::new(),
                fail_cycle: false,
            },
            &["proj-a"],
        );

        let first = collector.describe();
        let second = collector.describe();

        let names: Vec<&str> = first.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "gcp_kubernetes_engine_cluster_up",
                "gcp_kubernetes_engine_cluster_nodes"
            ]
        );
        assert_eq!(first, second);

        for desc in &first {
            assert_eq!(desc.label_keys, vec!["name", "location", "version"]);
        }
    }

    #[tokio::test]
    async fn test_running_cluster_maps_to_up_and_nodes() {
        let mut clusters = HashMap::new();
        clusters.insert(ProjectRef::new("proj-a"), Ok(vec![running_cluster()]));

        let collector = collector(
            FakeLister {
                clusters,
                fail_cycle: false,
            },
            &["proj-a"],
        );

        let (samples, report) = collect_samples(&collector).await;
        assert!(report.failures.is_empty());
        assert_eq!(samples.len(), 2);

        let up = &samples[0];
        assert_eq!(up.descriptor.name, "gcp_kubernetes_engine_cluster_up");
        assert_eq!(up.kind, MetricKind::Counter);
        assert_eq!(up.value, 1.0);
        assert_eq!(up.label_values, vec!["c1", "us-central1-a", "1.27"]);

        let nodes = &samples[1];
        assert_eq!(nodes.descriptor.name, "gcp_kubernetes_engine_cluster_nodes");
        assert_eq!(nodes.kind, MetricKind::Gauge);
        assert_eq!(nodes.value, 3.0);
        assert_eq!(nodes.label_values, up.label_values);
    }

    #[tokio::test]
    async fn test_non_running_cluster_reports_zero_up() {
        let mut cluster = running_cluster();
        cluster.status = "PROVISIONING".to_string();

        let mut clusters = HashMap::new();
        clusters.insert(ProjectRef::new("proj-a"), Ok(vec![cluster]));

        let collector = collector(
            FakeLister {
                clusters,
                fail_cycle: false,
            },
            &["proj-a"],
        );

        let (samples, _) = collect_samples(&collector).await;
        assert_eq!(samples[0].value, 0.0);
        assert_eq!(samples[1].value, 3.0);
    }

    #[tokio::test]
    async fn test_failing_project_does_not_affect_others() {
        let mut clusters = HashMap::new();
        clusters.insert(ProjectRef::new("proj-a"), Ok(vec![running_cluster()]));
        clusters.insert(
            ProjectRef::new("proj-b"),
            Err(Error::network("network timeout")),
        );
        clusters.insert(ProjectRef::new("proj-c"), Ok(Vec::new()));

        let collector = collector(
            FakeLister {
                clusters,
                fail_cycle: false,
            },
            &["proj-a", "proj-b", "proj-c"],
        );

        let (samples, report) = collect_samples(&collector).await;

        // proj-a's two samples survive; proj-b and proj-c contribute none.
        assert_eq!(samples.len(), 2);
        assert_eq!(report.projects_scanned, 3);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failures[0].project, ProjectRef::new("proj-b"));
    }

    #[tokio::test]
    async fn test_cycle_abort_emits_nothing() {
        let mut clusters = HashMap::new();
        clusters.insert(ProjectRef::new("proj-a"), Ok(vec![running_cluster()]));

        let collector = collector(
            FakeLister {
                clusters,
                fail_cycle: true,
            },
            &["proj-a"],
        );

        let (samples, report) = collect_samples(&collector).await;
        assert!(samples.is_empty());
        assert_eq!(report.projects_scanned, 0);
        assert!(report.cycle_error.is_some());
    }
}

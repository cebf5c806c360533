//! Concurrent per-project fan-out shared by all resource-family collectors
//!
//! One collection cycle launches one task per monitored project, applies a
//! per-project deadline, and streams mapped samples into the shared output
//! channel. A failing or slow project terminates only its own unit of work;
//! the cycle completes with whatever the remaining projects returned.

use scout_core::{Error, ProjectRef, Result, Sample};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Outcome of one collection cycle.
///
/// Per-project errors land here as data rather than propagating to the
/// registry host: a scrape with failing projects is still a valid, complete
/// collect result.
#[derive(Debug, Clone, Default)]
pub struct CollectReport {
    /// Number of projects the cycle attempted to scan
    pub projects_scanned: usize,

    /// Number of samples written to the output channel
    pub samples_emitted: usize,

    /// Projects whose list call failed this cycle
    pub failures: Vec<ProjectFailure>,

    /// Set when the cycle was aborted before fan-out (client initialization
    /// failed); no samples were emitted.
    pub cycle_error: Option<String>,
}

impl CollectReport {
    /// Report for a cycle aborted before any project was queried
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            cycle_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Number of projects that failed this cycle
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// One project's failure within a collection cycle
#[derive(Debug, Clone)]
pub struct ProjectFailure {
    /// The project that failed
    pub project: ProjectRef,

    /// Error category (see [`scout_core::Error::category`])
    pub category: &'static str,

    /// Rendered error message
    pub error: String,
}

/// Fan one scrape out across every project concurrently.
///
/// Generic over the upstream list call and the snapshot-to-samples mapper so
/// that every resource-family collector shares the same fan-out behavior:
///
/// - one task per project, no ordering between projects;
/// - `project_timeout` bounds each project's list-and-emit work;
/// - a project failure is logged and recorded, never propagated;
/// - all of one snapshot's samples are written contiguously by its unit;
/// - the call returns once every unit has completed, signaling that the
///   channel has received the cycle's final write.
pub async fn fan_out<S, L, Fut, M>(
    projects: &[ProjectRef],
    list: L,
    mapper: M,
    tx: &mpsc::UnboundedSender<Sample>,
    project_timeout: Duration,
) -> CollectReport
where
    S: Send + 'static,
    L: Fn(ProjectRef) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<Vec<S>>> + Send + 'static,
    M: Fn(&ProjectRef, &S) -> Result<Vec<Sample>> + Send + Sync + Clone + 'static,
{
    let mut tasks = JoinSet::new();

    for project in projects.iter().cloned() {
        let list = list.clone();
        let mapper = mapper.clone();
        let tx = tx.clone();

        tasks.spawn(async move {
            let scan = async {
                let snapshots = list(project.clone()).await?;
                debug!("project {}: {} resources", project, snapshots.len());

                let mut emitted = 0usize;
                for snapshot in &snapshots {
                    for sample in mapper(&project, snapshot)? {
                        if tx.send(sample).is_err() {
                            // Receiver dropped; the host abandoned the cycle.
                            return Err(Error::internal("sample channel closed"));
                        }
                        emitted += 1;
                    }
                }

                Ok(emitted)
            };

            let outcome = match tokio::time::timeout(project_timeout, scan).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::timeout(format!(
                    "list call exceeded {}s deadline",
                    project_timeout.as_secs()
                ))),
            };

            (project, outcome)
        });
    }

    let mut report = CollectReport {
        projects_scanned: projects.len(),
        ..CollectReport::default()
    };

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(emitted))) => {
                report.samples_emitted += emitted;
            }
            Ok((project, Err(e))) => {
                warn!("project {} failed this cycle: {}", project, e);
                report.failures.push(ProjectFailure {
                    project,
                    category: e.category(),
                    error: e.to_string(),
                });
            }
            Err(e) => {
                // Only reachable if a scan task panicked.
                error!("project scan task aborted: {}", e);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::{MetricDescriptor, MetricKind};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn projects(ids: &[&str]) -> Vec<ProjectRef> {
        ids.iter().map(|id| ProjectRef::new(*id)).collect()
    }

    fn descriptor() -> Arc<MetricDescriptor> {
        MetricDescriptor::new("test_resources", "Resources seen", vec!["project", "resource"])
    }

    /// List closure backed by a fixed map of project -> outcome
    fn fixture_list(
        fixtures: HashMap<ProjectRef, Result<Vec<String>>>,
    ) -> impl Fn(ProjectRef) -> std::pin::Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send>>
           + Send
           + Sync
           + Clone
           + 'static {
        let fixtures = Arc::new(fixtures);
        move |project: ProjectRef| {
            let fixtures = fixtures.clone();
            Box::pin(async move {
                match fixtures.get(&project) {
                    Some(Ok(resources)) => Ok(resources.clone()),
                    Some(Err(e)) => Err(Error::network(e.to_string())),
                    None => Ok(Vec::new()),
                }
            }) as std::pin::Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send>>
        }
    }

    fn fixture_mapper(
        desc: Arc<MetricDescriptor>,
    ) -> impl Fn(&ProjectRef, &String) -> Result<Vec<Sample>> + Send + Sync + Clone + 'static {
        move |project: &ProjectRef, resource: &String| {
            Ok(vec![Sample::new(
                desc.clone(),
                MetricKind::Gauge,
                1.0,
                vec![project.to_string(), resource.clone()],
            )?])
        }
    }

    async fn drain(rx: &mut mpsc::UnboundedReceiver<Sample>) -> Vec<Sample> {
        let mut samples = Vec::new();
        while let Some(sample) = rx.recv().await {
            samples.push(sample);
        }
        samples
    }

    #[tokio::test]
    async fn test_all_projects_succeed() {
        let mut fixtures = HashMap::new();
        fixtures.insert(
            ProjectRef::new("proj-a"),
            Ok(vec!["r1".to_string(), "r2".to_string()]),
        );
        fixtures.insert(ProjectRef::new("proj-b"), Ok(vec!["r3".to_string()]));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = fan_out(
            &projects(&["proj-a", "proj-b"]),
            fixture_list(fixtures),
            fixture_mapper(descriptor()),
            &tx,
            Duration::from_secs(5),
        )
        .await;
        drop(tx);

        assert_eq!(report.projects_scanned, 2);
        assert_eq!(report.samples_emitted, 3);
        assert!(report.failures.is_empty());
        assert!(report.cycle_error.is_none());

        let samples = drain(&mut rx).await;
        assert_eq!(samples.len(), 3);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_projects() {
        let mut fixtures = HashMap::new();
        fixtures.insert(ProjectRef::new("proj-a"), Ok(vec!["r1".to_string()]));
        fixtures.insert(
            ProjectRef::new("proj-b"),
            Err(Error::network("connection refused")),
        );
        // proj-c returns zero resources, which is not a failure.
        fixtures.insert(ProjectRef::new("proj-c"), Ok(Vec::new()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = fan_out(
            &projects(&["proj-a", "proj-b", "proj-c"]),
            fixture_list(fixtures),
            fixture_mapper(descriptor()),
            &tx,
            Duration::from_secs(5),
        )
        .await;
        drop(tx);

        assert_eq!(report.projects_scanned, 3);
        assert_eq!(report.samples_emitted, 1);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failures[0].project, ProjectRef::new("proj-b"));
        assert_eq!(report.failures[0].category, "network");

        let samples = drain(&mut rx).await;
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label_values[0], "proj-a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_project_hits_deadline() {
        let hung = |project: ProjectRef| {
            Box::pin(async move {
                if project.as_str() == "proj-slow" {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                Ok(vec!["r1".to_string()])
            })
                as std::pin::Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send>>
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = fan_out(
            &projects(&["proj-fast", "proj-slow"]),
            hung,
            fixture_mapper(descriptor()),
            &tx,
            Duration::from_secs(10),
        )
        .await;
        drop(tx);

        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failures[0].project, ProjectRef::new("proj-slow"));
        assert_eq!(report.failures[0].category, "timeout");
        assert_eq!(report.samples_emitted, 1);

        let samples = drain(&mut rx).await;
        assert_eq!(samples.len(), 1);
    }

    #[tokio::test]
    async fn test_one_units_samples_are_contiguous_in_order() {
        let mut fixtures = HashMap::new();
        fixtures.insert(
            ProjectRef::new("proj-a"),
            Ok(vec!["r1".to_string(), "r2".to_string(), "r3".to_string()]),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        fan_out(
            &projects(&["proj-a"]),
            fixture_list(fixtures),
            fixture_mapper(descriptor()),
            &tx,
            Duration::from_secs(5),
        )
        .await;
        drop(tx);

        let samples = drain(&mut rx).await;
        let resources: Vec<&str> = samples
            .iter()
            .map(|s| s.label_values[1].as_str())
            .collect();
        assert_eq!(resources, vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn test_empty_project_list_is_a_noop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = fan_out(
            &projects(&[]),
            fixture_list(HashMap::new()),
            fixture_mapper(descriptor()),
            &tx,
            Duration::from_secs(5),
        )
        .await;
        drop(tx);

        assert_eq!(report.projects_scanned, 0);
        assert_eq!(report.samples_emitted, 0);
        assert!(drain(&mut rx).await.is_empty());
    }
}

//! Fetchers
//!
//! Request/response functions over a [`ClusterClient`]. Each returns owned
//! data so the runtime can run it as an independent task and hand the result
//! back to the dashboard as a single event.

use tracing::{debug, instrument};

use crate::client::{ClusterClient, CollaboratorError, LogRequest, events_for};
use crate::doctor::{AnalysisResult, analyze_pod, diagnose_pipeline_run};
use crate::events::{EventSection, TimelineEvent, build_timeline};
use crate::model::{PipelineRun, Pod, TaskRun, parse_timestamp};
use crate::resource::{ResourceItem, ResourceKind};

pub const DEFAULT_LOG_LINES: usize = 100;
pub const DEFAULT_PIPELINE_LOG_LINES: usize = 50;

/// Tail sizes used by the Logs tab.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchLimits {
    pub log_lines: usize,
    pub pipeline_log_lines: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            log_lines: DEFAULT_LOG_LINES,
            pipeline_log_lines: DEFAULT_PIPELINE_LOG_LINES,
        }
    }
}

/// Log output of one container, or why it could not be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSection {
    pub title: String,
    pub text: Result<String, CollaboratorError>,
}

#[instrument(skip(client), fields(backend = client.name()))]
pub async fn list_resources(
    client: &dyn ClusterClient,
    kind: ResourceKind,
) -> Result<Vec<ResourceItem>, CollaboratorError> {
    let items: Vec<ResourceItem> = match kind {
        ResourceKind::Pod => client
            .list_pods()
            .await?
            .into_iter()
            .map(ResourceItem::Pod)
            .collect(),
        ResourceKind::PipelineRun => client
            .list_pipeline_runs()
            .await?
            .into_iter()
            .map(ResourceItem::PipelineRun)
            .collect(),
    };
    debug!(count = items.len(), "listed resources");
    Ok(items)
}

pub async fn fetch_resource_detail(
    client: &dyn ClusterClient,
    kind: ResourceKind,
    name: &str,
) -> Result<ResourceItem, CollaboratorError> {
    match kind {
        ResourceKind::Pod => client.get_pod(name).await.map(ResourceItem::Pod),
        ResourceKind::PipelineRun => client
            .get_pipeline_run(name)
            .await
            .map(ResourceItem::PipelineRun),
    }
}

/// Tail of one container's log.
pub async fn fetch_container_logs(
    client: &dyn ClusterClient,
    pod: &str,
    container: &str,
    max_lines: usize,
    previous: bool,
) -> Result<String, CollaboratorError> {
    let request = LogRequest::new(pod, container, max_lines).previous(previous);
    client.logs(&request).await
}

/// Log sections for the Logs tab.
pub async fn fetch_logs(
    client: &dyn ClusterClient,
    item: &ResourceItem,
    limits: FetchLimits,
) -> Result<Vec<LogSection>, CollaboratorError> {
    let sections = match item {
        ResourceItem::Pod(pod) => pod_logs(client, pod, limits.log_lines).await?,
        ResourceItem::PipelineRun(pr) => {
            pipeline_run_logs(client, pr, limits.pipeline_log_lines).await?
        }
    };
    debug!(resource = item.name(), sections = sections.len(), "fetched logs");
    Ok(sections)
}

fn pod_log_containers(pod: &Pod) -> Vec<&str> {
    let running: Vec<&str> = pod
        .status
        .container_statuses
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    if !running.is_empty() {
        return running;
    }
    pod.spec
        .containers
        .first()
        .map(|c| vec![c.name.as_str()])
        .unwrap_or_default()
}

async fn pod_logs(
    client: &dyn ClusterClient,
    pod: &Pod,
    tail: usize,
) -> Result<Vec<LogSection>, CollaboratorError> {
    let name = &pod.metadata.name;
    let containers = pod_log_containers(pod);
    if containers.is_empty() {
        return Err(CollaboratorError::not_found(format!(
            "containers in pod {}",
            name
        )));
    }

    let mut sections = Vec::with_capacity(containers.len());
    for container in containers {
        sections.push(LogSection {
            title: format!("Container: {}", container),
            text: fetch_container_logs(client, name, container, tail, false).await,
        });
    }
    Ok(sections)
}

async fn task_run_pod(client: &dyn ClusterClient, tr: &TaskRun) -> Result<Pod, CollaboratorError> {
    let pod_name = client.pod_for_task_run(tr).await?;
    client.get_pod(&pod_name).await
}

async fn pipeline_run_logs(
    client: &dyn ClusterClient,
    pr: &PipelineRun,
    tail: usize,
) -> Result<Vec<LogSection>, CollaboratorError> {
    let task_runs = client.task_runs_for(&pr.metadata.name).await?;

    let mut sections = Vec::with_capacity(task_runs.len());
    for tr in &task_runs {
        let title = format!("TaskRun: {}", tr.display_name());
        let text = match task_run_pod(client, tr).await {
            Ok(pod) => {
                let first = pod
                    .spec
                    .containers
                    .first()
                    .map(|c| c.name.clone())
                    .or_else(|| pod.status.container_statuses.first().map(|c| c.name.clone()));
                match first {
                    Some(container) => {
                        fetch_container_logs(client, &pod.metadata.name, &container, tail, false)
                            .await
                    }
                    None => Err(CollaboratorError::not_found(format!(
                        "containers in pod {}",
                        pod.metadata.name
                    ))),
                }
            }
            Err(e) => Err(e),
        };
        sections.push(LogSection { title, text });
    }
    Ok(sections)
}

/// Event timelines for the Events tab.
pub async fn fetch_events(
    client: &dyn ClusterClient,
    item: &ResourceItem,
) -> Result<Vec<EventSection>, CollaboratorError> {
    match item {
        ResourceItem::Pod(pod) => {
            let raw = events_for(client, ResourceKind::Pod, &pod.metadata.name).await?;
            Ok(vec![EventSection {
                title: format!("Pod: {}", pod.metadata.name),
                events: build_timeline(raw, item.created_at()),
            }])
        }
        ResourceItem::PipelineRun(pr) => pipeline_run_events(client, pr).await,
    }
}

async fn pipeline_run_events(
    client: &dyn ClusterClient,
    pr: &PipelineRun,
) -> Result<Vec<EventSection>, CollaboratorError> {
    let task_runs = client.task_runs_for(&pr.metadata.name).await?;

    let mut sections = Vec::new();
    for tr in &task_runs {
        let mut raw = match client.events("TaskRun", &tr.metadata.name).await {
            Ok(events) => events,
            Err(e) => {
                debug!(task_run = %tr.metadata.name, error = %e, "skipping task run events");
                Vec::new()
            }
        };
        if let Ok(pod_name) = client.pod_for_task_run(tr).await {
            match events_for(client, ResourceKind::Pod, &pod_name).await {
                Ok(pod_events) => raw.extend(pod_events),
                Err(e) => debug!(pod = %pod_name, error = %e, "skipping pod events"),
            }
        }

        let anchor = tr
            .metadata
            .creation_timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| tr.status.start_time.as_deref().and_then(parse_timestamp));
        let events: Vec<TimelineEvent> = build_timeline(raw, anchor);
        sections.push(EventSection {
            title: format!("TaskRun: {}", tr.display_name()),
            events,
        });
    }
    Ok(sections)
}

/// Fresh diagnosis of the resource. Re-reads it so findings reflect the
/// current container state rather than the last list refresh.
pub async fn fetch_doctor(
    client: &dyn ClusterClient,
    item: &ResourceItem,
) -> Result<AnalysisResult, CollaboratorError> {
    let result = match fetch_resource_detail(client, item.kind(), item.name()).await? {
        ResourceItem::Pod(pod) => analyze_pod(client, &pod).await,
        ResourceItem::PipelineRun(pr) => diagnose_pipeline_run(client, &pr).await?,
    };
    let (critical, warning, info) = result.counts();
    debug!(
        resource = item.name(),
        critical, warning, info, "diagnosis complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doctor::Severity;
    use crate::fake::FakeCluster;
    use crate::model::{ContainerState, ContainerStatus, ObjectMeta, RawEvent};

    fn two_container_pod() -> Pod {
        Pod::new("api", "Running")
            .with_container(ContainerStatus::new("app", ContainerState::running()))
            .with_container(ContainerStatus::new("proxy", ContainerState::running()))
    }

    #[tokio::test]
    async fn test_list_resources_by_kind() {
        let cluster = FakeCluster::demo();
        let pods = list_resources(&cluster, ResourceKind::Pod).await.unwrap();
        assert!(pods.iter().all(|i| i.kind() == ResourceKind::Pod));
        let runs = list_resources(&cluster, ResourceKind::PipelineRun).await.unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[tokio::test]
    async fn test_list_failure_is_collaborator_error() {
        let cluster = FakeCluster::new().failing("list_pods", "forbidden");
        let err = list_resources(&cluster, ResourceKind::Pod).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Command { .. }));
    }

    #[tokio::test]
    async fn test_pod_logs_cover_every_container() {
        let pod = two_container_pod();
        let cluster = FakeCluster::new()
            .with_pod(pod.clone())
            .with_logs("api", "app", "app line\n")
            .with_logs("api", "proxy", "proxy line\n");

        let sections = fetch_logs(&cluster, &ResourceItem::Pod(pod), FetchLimits::default())
            .await
            .unwrap();
        let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Container: app", "Container: proxy"]);
        assert_eq!(sections[1].text.as_deref(), Ok("proxy line\n"));
    }

    #[tokio::test]
    async fn test_per_container_log_errors_are_inline() {
        let pod = two_container_pod();
        let cluster = FakeCluster::new()
            .with_pod(pod.clone())
            .failing("logs", "container not ready");
        let sections = fetch_logs(&cluster, &ResourceItem::Pod(pod), FetchLimits::default())
            .await
            .unwrap();
        assert_eq!(sections.len(), 2);
        assert!(sections.iter().all(|s| s.text.is_err()));
    }

    #[tokio::test]
    async fn test_pipeline_run_logs_per_task() {
        let cluster = FakeCluster::demo();
        let pr = cluster.get_pipeline_run("release-1042").await.unwrap();
        let limits = FetchLimits {
            log_lines: 100,
            pipeline_log_lines: 1,
        };
        let sections = fetch_logs(&cluster, &ResourceItem::PipelineRun(pr), limits)
            .await
            .unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, "TaskRun: build");
        assert_eq!(sections[0].text.as_deref(), Ok("finished release build\n"));
        assert!(sections[2].text.is_err());
    }

    #[tokio::test]
    async fn test_pod_events_are_a_sorted_timeline() {
        let mut pod = Pod::new("api", "Running");
        pod.metadata.creation_timestamp = Some("2024-05-01T12:00:00Z".into());
        let raw = |ts: &str, reason: &str| RawEvent {
            last_timestamp: Some(ts.into()),
            kind: "Normal".into(),
            reason: reason.into(),
            message: String::new(),
            count: 1,
        };
        let cluster = FakeCluster::new().with_pod(pod.clone()).with_events(
            "Pod",
            "api",
            vec![
                raw("2024-05-01T12:01:00Z", "Started"),
                raw("2024-05-01T12:00:10Z", "Scheduled"),
            ],
        );

        let sections = fetch_events(&cluster, &ResourceItem::Pod(pod)).await.unwrap();
        assert_eq!(sections.len(), 1);
        let labels: Vec<_> = sections[0]
            .events
            .iter()
            .map(|e| (e.reason.as_str(), e.offset_label()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Scheduled", "00:10".to_string()),
                ("Started", "01:00".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_task_run_events_failure_keeps_pod_events() {
        let pr = PipelineRun {
            metadata: ObjectMeta::named("nightly-7"),
            ..Default::default()
        };
        let cluster = FakeCluster::new()
            .with_pipeline_run(pr.clone())
            .with_task_run("nightly-7", "test", Some("nightly-7-test-pod"))
            .with_events(
                "Pod",
                "nightly-7-test-pod",
                vec![RawEvent {
                    last_timestamp: Some("2024-05-01T12:00:30Z".into()),
                    kind: "Warning".into(),
                    reason: "OOMKilling".into(),
                    message: "Memory cgroup out of memory".into(),
                    count: 1,
                }],
            )
            .failing_events("TaskRun", "forbidden");

        let sections = fetch_events(&cluster, &ResourceItem::PipelineRun(pr))
            .await
            .unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "TaskRun: test");
        let reasons: Vec<_> = sections[0].events.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["OOMKilling"]);
    }

    #[tokio::test]
    async fn test_doctor_rereads_resource() {
        let cluster = FakeCluster::demo();
        let stale = ResourceItem::Pod(Pod::new("frontend-84b2", "Unknown"));
        let result = fetch_doctor(&cluster, &stale).await.unwrap();
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].severity(), Severity::Critical);
    }

    #[tokio::test]
    async fn test_doctor_missing_resource_errors() {
        let cluster = FakeCluster::new();
        let item = ResourceItem::Pod(Pod::new("gone", "Running"));
        assert!(fetch_doctor(&cluster, &item).await.is_err());
    }
}

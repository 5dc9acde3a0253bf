//! In-memory cluster
//!
//! [`FakeCluster`] answers every [`ClusterClient`] call from data it was built
//! with. Tests use it to drive fetchers and the doctor without a cluster, and
//! the CLI uses [`FakeCluster::demo`] for `--demo` mode.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::client::{ClusterClient, CollaboratorError, LogRequest};
use crate::model::{
    Condition, ContainerState, ContainerStatus, ObjectMeta, PipelineRun, Pod, RawEvent, RunStatus,
    TaskRun,
};

pub const PIPELINE_RUN_LABEL: &str = "tekton.dev/pipelineRun";
pub const TASK_RUN_LABEL: &str = "tekton.dev/taskRun";
pub const PIPELINE_TASK_LABEL: &str = "tekton.dev/pipelineTask";

#[derive(Clone, Debug, Default)]
pub struct FakeCluster {
    namespace: String,
    pods: Vec<Pod>,
    pipeline_runs: Vec<PipelineRun>,
    task_runs: Vec<TaskRun>,
    logs: HashMap<(String, String, bool), String>,
    events: HashMap<(String, String), Vec<RawEvent>>,
    failures: HashMap<&'static str, String>,
    event_failures: HashMap<String, String>,
    latency: Option<Duration>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            namespace: "default".into(),
            ..Default::default()
        }
    }

    pub fn with_pod(mut self, mut pod: Pod) -> Self {
        if pod.metadata.namespace.is_empty() {
            pod.metadata.namespace = self.namespace.clone();
        }
        self.pods.push(pod);
        self
    }

    pub fn with_pipeline_run(mut self, mut pr: PipelineRun) -> Self {
        if pr.metadata.namespace.is_empty() {
            pr.metadata.namespace = self.namespace.clone();
        }
        self.pipeline_runs.push(pr);
        self
    }

    /// Register a TaskRun of `pipeline_run` for pipeline task `task`.
    /// When `pod` is given the TaskRun reports it in its status.
    pub fn with_task_run(mut self, pipeline_run: &str, task: &str, pod: Option<&str>) -> Self {
        let mut metadata = ObjectMeta::named(&format!("{}-{}", pipeline_run, task));
        metadata.namespace = self.namespace.clone();
        metadata
            .labels
            .insert(PIPELINE_RUN_LABEL.into(), pipeline_run.into());
        metadata
            .labels
            .insert(PIPELINE_TASK_LABEL.into(), task.into());
        self.task_runs.push(TaskRun {
            metadata,
            status: RunStatus {
                pod_name: pod.map(String::from),
                ..Default::default()
            },
        });
        self
    }

    pub fn with_logs(mut self, pod: &str, container: &str, text: &str) -> Self {
        self.logs
            .insert((pod.into(), container.into(), false), text.into());
        self
    }

    pub fn with_previous_logs(mut self, pod: &str, container: &str, text: &str) -> Self {
        self.logs
            .insert((pod.into(), container.into(), true), text.into());
        self
    }

    pub fn with_events(mut self, kind: &str, name: &str, events: Vec<RawEvent>) -> Self {
        self.events
            .entry((kind.into(), name.into()))
            .or_default()
            .extend(events);
        self
    }

    /// Make every call of `operation` fail with `message`.
    /// Operation names match the [`ClusterClient`] method names.
    pub fn failing(mut self, operation: &'static str, message: &str) -> Self {
        self.failures.insert(operation, message.into());
        self
    }

    /// Make `events` fail for objects of `kind` only.
    pub fn failing_events(mut self, kind: &str, message: &str) -> Self {
        self.event_failures.insert(kind.into(), message.into());
        self
    }

    /// Delay every call, to exercise in-flight behaviour.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn enter(&self, operation: &'static str) -> Result<(), CollaboratorError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.failures.get(operation) {
            Some(message) => Err(CollaboratorError::command(operation, message.clone())),
            None => Ok(()),
        }
    }

    /// A small namespace with one example of every failure the doctor knows.
    pub fn demo() -> Self {
        let now = Utc::now();
        let ago = |minutes: i64| Some((now - chrono::Duration::minutes(minutes)).to_rfc3339());
        let event = |minutes: i64, kind: &str, reason: &str, message: &str, count: u32| RawEvent {
            last_timestamp: ago(minutes),
            kind: kind.into(),
            reason: reason.into(),
            message: message.into(),
            count,
        };
        let aged = |mut pod: Pod, minutes: i64| {
            pod.metadata.creation_timestamp = ago(minutes);
            pod.status.start_time = ago(minutes);
            pod.spec.node_name = Some("worker-2".into());
            pod.status.pod_ip = Some(format!("10.42.0.{}", 10 + minutes % 200));
            pod
        };

        let api = aged(
            Pod::new("api-7d9f8", "Running")
                .with_container(ContainerStatus::new("api", ContainerState::running())),
            180,
        );
        let payments = aged(
            Pod::new("payments-5c6d", "Running").with_container(
                ContainerStatus::new("payments", ContainerState::running())
                    .with_restarts(2)
                    .with_last_state(ContainerState::terminated(137)),
            ),
            95,
        );
        let frontend = aged(
            Pod::new("frontend-84b2", "Pending").with_container(ContainerStatus::new(
                "frontend",
                ContainerState::waiting("ImagePullBackOff"),
            )),
            12,
        );
        let worker = aged(
            Pod::new("worker-66a1", "Running").with_container(
                ContainerStatus::new("worker", ContainerState::waiting("CrashLoopBackOff"))
                    .with_restarts(7)
                    .with_last_state(ContainerState::terminated(1)),
            ),
            40,
        );
        let cache = aged(
            Pod::new("cache-0", "Pending").with_container(ContainerStatus::new(
                "redis",
                ContainerState::waiting("ContainerCreating"),
            )),
            1,
        );
        let build = aged(
            Pod::new("release-1042-build-pod", "Succeeded")
                .with_container(ContainerStatus::new("step-build", ContainerState::terminated(0))),
            30,
        );
        let test = aged(
            Pod::new("release-1042-test-pod", "Failed")
                .with_container(ContainerStatus::new("step-test", ContainerState::terminated(2))),
            25,
        );

        let release = |name: &str, minutes: i64, status: &str, reason: &str| PipelineRun {
            metadata: ObjectMeta {
                creation_timestamp: ago(minutes),
                ..ObjectMeta::named(name)
            },
            status: RunStatus {
                conditions: vec![Condition {
                    kind: "Succeeded".into(),
                    status: status.into(),
                    reason: Some(reason.into()),
                    message: None,
                }],
                start_time: ago(minutes),
                completion_time: if status == "Unknown" { None } else { ago(minutes - 8) },
                pod_name: None,
            },
        };

        Self::new()
            .with_pod(api)
            .with_pod(payments)
            .with_pod(frontend)
            .with_pod(worker)
            .with_pod(cache)
            .with_pod(build)
            .with_pod(test)
            .with_logs("api-7d9f8", "api", "listening on :8080\nGET /healthz 200\n")
            .with_logs("payments-5c6d", "payments", "warming cache\n")
            .with_previous_logs(
                "payments-5c6d",
                "payments",
                "loading ledger snapshot\nallocating 2GiB buffer\n",
            )
            .with_previous_logs(
                "worker-66a1",
                "worker",
                "connecting to postgres\ndial tcp 10.43.0.12:5432: connect: connection refused\n",
            )
            .with_logs(
                "release-1042-build-pod",
                "step-build",
                "compiling 212 crates\nfinished release build\n",
            )
            .with_logs(
                "release-1042-test-pod",
                "step-test",
                "running 48 tests\ntest db::migrate ... FAILED: context deadline exceeded\n",
            )
            .with_events(
                "Pod",
                "frontend-84b2",
                vec![
                    event(12, "Normal", "Scheduled", "Successfully assigned default/frontend-84b2 to worker-2", 1),
                    event(11, "Warning", "Failed", "Failed to pull image \"registry.local/frontend:v9\": not found", 4),
                    event(2, "Warning", "BackOff", "Back-off pulling image \"registry.local/frontend:v9\"", 31),
                ],
            )
            .with_events(
                "Pod",
                "worker-66a1",
                vec![
                    event(40, "Normal", "Scheduled", "Successfully assigned default/worker-66a1 to worker-2", 1),
                    event(39, "Normal", "Started", "Started container worker", 8),
                    event(1, "Warning", "BackOff", "Back-off restarting failed container", 96),
                ],
            )
            .with_events(
                "Pod",
                "api-7d9f8",
                vec![event(180, "Normal", "Scheduled", "Successfully assigned default/api-7d9f8 to worker-2", 1)],
            )
            .with_pipeline_run(release("release-1042", 30, "False", "Failed"))
            .with_pipeline_run(release("release-1041", 300, "True", "Succeeded"))
            .with_task_run("release-1042", "build", Some("release-1042-build-pod"))
            .with_task_run("release-1042", "test", Some("release-1042-test-pod"))
            .with_task_run("release-1042", "deploy", None)
            .with_events(
                "TaskRun",
                "release-1042-test",
                vec![event(22, "Warning", "Failed", "TaskRun release-1042-test failed", 1)],
            )
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, CollaboratorError> {
        self.enter("list_pods").await?;
        Ok(self.pods.clone())
    }

    async fn list_pipeline_runs(&self) -> Result<Vec<PipelineRun>, CollaboratorError> {
        self.enter("list_pipeline_runs").await?;
        Ok(self.pipeline_runs.clone())
    }

    async fn get_pod(&self, name: &str) -> Result<Pod, CollaboratorError> {
        self.enter("get_pod").await?;
        self.pods
            .iter()
            .find(|p| p.metadata.name == name)
            .cloned()
            .ok_or_else(|| CollaboratorError::not_found(format!("pod {}", name)))
    }

    async fn get_pipeline_run(&self, name: &str) -> Result<PipelineRun, CollaboratorError> {
        self.enter("get_pipeline_run").await?;
        self.pipeline_runs
            .iter()
            .find(|p| p.metadata.name == name)
            .cloned()
            .ok_or_else(|| CollaboratorError::not_found(format!("pipelinerun {}", name)))
    }

    async fn task_runs_for(&self, pipeline_run: &str) -> Result<Vec<TaskRun>, CollaboratorError> {
        self.enter("task_runs_for").await?;
        Ok(self
            .task_runs
            .iter()
            .filter(|tr| {
                tr.metadata.labels.get(PIPELINE_RUN_LABEL).map(String::as_str)
                    == Some(pipeline_run)
            })
            .cloned()
            .collect())
    }

    async fn pod_for_task_run(&self, task_run: &TaskRun) -> Result<String, CollaboratorError> {
        self.enter("pod_for_task_run").await?;
        if let Some(pod) = task_run.status.pod_name.as_deref().filter(|p| !p.is_empty()) {
            return Ok(pod.to_string());
        }
        self.pods
            .iter()
            .find(|p| {
                p.metadata.labels.get(TASK_RUN_LABEL) == Some(&task_run.metadata.name)
            })
            .map(|p| p.metadata.name.clone())
            .ok_or_else(|| {
                CollaboratorError::not_found(format!("pod for taskrun {}", task_run.metadata.name))
            })
    }

    async fn logs(&self, request: &LogRequest) -> Result<String, CollaboratorError> {
        self.enter("logs").await?;
        let key = (
            request.pod.clone(),
            request.container.clone(),
            request.previous,
        );
        match self.logs.get(&key) {
            Some(text) => {
                let lines: Vec<&str> = text.lines().collect();
                let start = lines.len().saturating_sub(request.tail_lines);
                let mut tail = lines[start..].join("\n");
                if !tail.is_empty() {
                    tail.push('\n');
                }
                Ok(tail)
            }
            None if request.previous => Err(CollaboratorError::command(
                "logs",
                format!(
                    "previous terminated container \"{}\" in pod \"{}\" not found",
                    request.container, request.pod
                ),
            )),
            None => Ok(String::new()),
        }
    }

    async fn events(&self, kind: &str, name: &str) -> Result<Vec<RawEvent>, CollaboratorError> {
        self.enter("events").await?;
        if let Some(message) = self.event_failures.get(kind) {
            return Err(CollaboratorError::command("events", message.clone()));
        }
        Ok(self
            .events
            .get(&(kind.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

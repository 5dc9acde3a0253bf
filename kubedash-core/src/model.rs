use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Container waiting reasons that mean the container will not start on its own.
pub const FAILED_WAITING_REASONS: [&str; 5] = [
    "ImagePullBackOff",
    "CrashLoopBackOff",
    "ErrImagePull",
    "CreateContainerConfigError",
    "InvalidImageName",
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingState {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningState {
    #[serde(default)]
    pub started_at: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedState {
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

/// Lifecycle phase of a container. At most one variant is set by the API server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerState {
    #[serde(default)]
    pub waiting: Option<WaitingState>,
    #[serde(default)]
    pub running: Option<RunningState>,
    #[serde(default)]
    pub terminated: Option<TerminatedState>,
}

impl ContainerState {
    pub fn waiting(reason: &str) -> Self {
        Self {
            waiting: Some(WaitingState {
                reason: reason.to_string(),
                message: None,
            }),
            ..Default::default()
        }
    }

    pub fn running() -> Self {
        Self {
            running: Some(RunningState::default()),
            ..Default::default()
        }
    }

    pub fn terminated(exit_code: i32) -> Self {
        Self {
            terminated: Some(TerminatedState {
                exit_code,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn waiting_reason(&self) -> Option<&str> {
        self.waiting.as_ref().map(|w| w.reason.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: String,
    #[serde(default)]
    pub state: ContainerState,
    #[serde(default)]
    pub last_state: Option<ContainerState>,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl ContainerStatus {
    pub fn new(name: &str, state: ContainerState) -> Self {
        Self {
            name: name.to_string(),
            state,
            ..Default::default()
        }
    }

    pub fn with_restarts(mut self, restart_count: u32) -> Self {
        self.restart_count = restart_count;
        self
    }

    pub fn with_last_state(mut self, last_state: ContainerState) -> Self {
        self.last_state = Some(last_state);
        self
    }

    /// Short human label for the current state, plus whether the container is running.
    pub fn state_label(&self) -> (String, bool) {
        if self.state.running.is_some() {
            return ("running".into(), true);
        }
        if let Some(waiting) = &self.state.waiting {
            let reason = if waiting.reason.is_empty() {
                "waiting"
            } else {
                waiting.reason.as_str()
            };
            return (format!("waiting: {}", reason), false);
        }
        if let Some(terminated) = &self.state.terminated {
            let reason = match terminated.message.as_deref() {
                Some(msg) if !msg.is_empty() => msg.to_string(),
                _ => format!("exit {}", terminated.exit_code),
            };
            return (format!("terminated: {}", reason), false);
        }
        ("unknown".into(), false)
    }

    pub fn has_failure(&self) -> bool {
        if let Some(reason) = self.state.waiting_reason() {
            if FAILED_WAITING_REASONS.contains(&reason) {
                return true;
            }
        }
        matches!(&self.state.terminated, Some(t) if t.exit_code != 0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodCondition {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default, rename = "podIP")]
    pub pod_ip: Option<String>,
    #[serde(default, rename = "hostIP")]
    pub host_ip: Option<String>,
    #[serde(default)]
    pub qos_class: Option<String>,
    #[serde(default)]
    pub init_container_statuses: Vec<ContainerStatus>,
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
    #[serde(default)]
    pub conditions: Vec<PodCondition>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub creation_timestamp: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub init_containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub service_account_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Pod {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

impl Pod {
    pub fn new(name: &str, phase: &str) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            status: PodStatus {
                phase: phase.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_container(mut self, status: ContainerStatus) -> Self {
        self.spec.containers.push(ContainerSpec {
            name: status.name.clone(),
            image: status.image.clone(),
        });
        self.status.container_statuses.push(status);
        self
    }

    pub fn with_init_container(mut self, status: ContainerStatus) -> Self {
        self.spec.init_containers.push(ContainerSpec {
            name: status.name.clone(),
            image: status.image.clone(),
        });
        self.status.init_container_statuses.push(status);
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PodList {
    #[serde(default)]
    pub items: Vec<Pod>,
}

/// Tekton-style status condition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub completion_time: Option<String>,
    #[serde(default)]
    pub pod_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineRun {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: RunStatus,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PipelineRunList {
    #[serde(default)]
    pub items: Vec<PipelineRun>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskRun {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: RunStatus,
}

impl TaskRun {
    /// Pipeline task name when labelled, otherwise the object name.
    pub fn display_name(&self) -> &str {
        let labels = &self.metadata.labels;
        for key in ["tekton.dev/pipelineTask", "tekton.dev/task"] {
            if let Some(name) = labels.get(key) {
                if !name.is_empty() {
                    return name;
                }
            }
        }
        &self.metadata.name
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TaskRunList {
    #[serde(default)]
    pub items: Vec<TaskRun>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Succeeded,
    Failed,
    Running,
    Unknown,
}

impl RunPhase {
    pub fn label(&self) -> &'static str {
        match self {
            RunPhase::Succeeded => "Succeeded",
            RunPhase::Failed => "Failed",
            RunPhase::Running => "Running",
            RunPhase::Unknown => "Unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLabel {
    pub phase: RunPhase,
    pub reason: Option<String>,
    pub message: Option<String>,
}

/// Derive the run phase from the `Succeeded` condition.
pub fn succeeded_status(conditions: &[Condition]) -> StatusLabel {
    let Some(cond) = conditions.iter().find(|c| c.kind == "Succeeded") else {
        return StatusLabel {
            phase: RunPhase::Unknown,
            reason: None,
            message: None,
        };
    };

    let phase = match cond.status.as_str() {
        "True" => RunPhase::Succeeded,
        "False" => RunPhase::Failed,
        _ => RunPhase::Running,
    };
    StatusLabel {
        phase,
        reason: cond.reason.clone(),
        message: cond.message.clone(),
    }
}

/// An event as reported by the cluster, before timeline processing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default)]
    pub last_timestamp: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<RawEvent>,
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Compact age such as `42s`, `5m`, `3h` or `2d`.
pub fn format_age(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(since) = since else {
        return "N/A".into();
    };
    let secs = (now - since).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3_600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3_600),
        s => format!("{}d", s / 86_400),
    }
}

/// Elapsed time between two timestamps as `1h2m3s`, `4m5s` or `6s`.
pub fn format_elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let secs = (end - start).num_seconds().max(0);
    let (h, m, s) = (secs / 3_600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pod_json_decodes_with_missing_fields() {
        let json = r#"{
            "metadata": {"name": "api-7d9", "namespace": "default"},
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    {"name": "api", "restartCount": 2,
                     "state": {"terminated": {"exitCode": 137}},
                     "lastState": {"terminated": {"exitCode": 1}}}
                ]
            }
        }"#;
        let pod: Pod = serde_json::from_str(json).unwrap();
        assert_eq!(pod.metadata.name, "api-7d9");
        assert_eq!(pod.status.container_statuses.len(), 1);
        let c = &pod.status.container_statuses[0];
        assert_eq!(c.restart_count, 2);
        assert_eq!(c.state.terminated.as_ref().unwrap().exit_code, 137);
        assert!(pod.spec.containers.is_empty());
    }

    #[test]
    fn test_state_label() {
        let running = ContainerStatus::new("a", ContainerState::running());
        assert_eq!(running.state_label(), ("running".to_string(), true));

        let waiting = ContainerStatus::new("a", ContainerState::waiting("ErrImagePull"));
        assert_eq!(waiting.state_label().0, "waiting: ErrImagePull");

        let terminated = ContainerStatus::new("a", ContainerState::terminated(2));
        assert_eq!(terminated.state_label().0, "terminated: exit 2");

        let unknown = ContainerStatus::new("a", ContainerState::default());
        assert_eq!(unknown.state_label(), ("unknown".to_string(), false));
    }

    #[test]
    fn test_succeeded_status() {
        let conditions = vec![Condition {
            kind: "Succeeded".into(),
            status: "False".into(),
            reason: Some("Failed".into()),
            message: None,
        }];
        let label = succeeded_status(&conditions);
        assert_eq!(label.phase, RunPhase::Failed);
        assert_eq!(label.reason.as_deref(), Some("Failed"));
        assert_eq!(succeeded_status(&[]).phase, RunPhase::Unknown);
    }

    #[test]
    fn test_task_run_display_name() {
        let mut tr = TaskRun {
            metadata: ObjectMeta::named("pr-1-build-x8k"),
            ..Default::default()
        };
        assert_eq!(tr.display_name(), "pr-1-build-x8k");
        tr.metadata
            .labels
            .insert("tekton.dev/task".into(), "build".into());
        assert_eq!(tr.display_name(), "build");
        tr.metadata
            .labels
            .insert("tekton.dev/pipelineTask".into(), "compile".into());
        assert_eq!(tr.display_name(), "compile");
    }

    #[test]
    fn test_format_age() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let at = |secs: i64| Some(now - chrono::Duration::seconds(secs));
        assert_eq!(format_age(at(30), now), "30s");
        assert_eq!(format_age(at(300), now), "5m");
        assert_eq!(format_age(at(7_200), now), "2h");
        assert_eq!(format_age(at(3 * 86_400), now), "3d");
        assert_eq!(format_age(None, now), "N/A");
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-05-01T12:00:00Z").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}

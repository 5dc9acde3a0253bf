//! Doctor - heuristic diagnosis of container failures
//!
//! `analyze_container_state` and `analyze_logs` are pure rule tables. The
//! orchestration (`diagnose_pod`, `diagnose_pipeline_run`) pulls logs through
//! a [`ClusterClient`] and turns issue strings into [`Finding`]s whose severity
//! is always derived from the message text by [`classify`].

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::client::{ClusterClient, CollaboratorError, LogRequest};
use crate::model::{ContainerStatus, PipelineRun, Pod, TerminatedState};
use crate::resource::ResourceKind;

/// Log lines pulled per container when diagnosing.
pub const DOCTOR_LOG_LINES: usize = 100;

/// Restart count above which a running container gets a stability warning.
pub const STABILITY_RESTART_THRESHOLD: u32 = 3;

pub const MSG_OOM_KILLED: &str =
    "Likely OOMKilled (Out of Memory). Your container exceeded its memory limits.";
pub const MSG_COMMAND_NOT_FOUND: &str =
    "Command not found. Check your container's entrypoint or command.";
pub const MSG_IMAGE_PULL: &str = "Failed to pull image. Check if the image name/tag is correct and if the registry requires authentication.";
pub const MSG_CRASH_LOOP: &str =
    "Container is crashing repeatedly. Check application logs for errors during startup.";
pub const MSG_CONFIG_ERROR: &str = "Configuration error. Likely a missing ConfigMap or Secret.";
pub const MSG_NETWORK: &str = "Network error detected (Connection Refused). Check if dependent services are reachable.";
pub const MSG_TIMEOUT: &str =
    "Timeout detected. A service or resource might be slow or unreachable.";
pub const MSG_PERMISSION: &str =
    "Permission denied. Check the Pod's SecurityContext or file system permissions.";
pub const MSG_MISSING_FILE: &str =
    "Missing file or configuration. Check your volume mounts and ConfigMaps.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// One diagnostic observation about a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    severity: Severity,
    remediation: &'static str,
    pub message: String,
    pub container: String,
    pub is_init: bool,
}

impl Finding {
    /// Build a finding; severity and remediation follow from the message.
    pub fn new(message: impl Into<String>, container: impl Into<String>, is_init: bool) -> Self {
        let message = message.into();
        let (severity, remediation) = classify(&message);
        Self {
            severity,
            remediation,
            message,
            container: container.into(),
            is_init,
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn remediation(&self) -> Option<&'static str> {
        if self.remediation.is_empty() {
            None
        } else {
            Some(self.remediation)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisResult {
    pub resource_name: String,
    pub kind: ResourceKind,
    pub findings: Vec<Finding>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(resource_name: &str, kind: ResourceKind) -> Self {
        Self {
            resource_name: resource_name.to_string(),
            kind,
            findings: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }

    /// (critical, warning, info)
    pub fn counts(&self) -> (usize, usize, usize) {
        self.findings
            .iter()
            .fold((0, 0, 0), |(c, w, i), f| match f.severity() {
                Severity::Critical => (c + 1, w, i),
                Severity::Warning => (c, w + 1, i),
                Severity::Info => (c, w, i + 1),
            })
    }
}

/// Severity and remediation for a doctor message.
pub fn classify(message: &str) -> (Severity, &'static str) {
    let lower = message.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("oomkilled") {
        return (
            Severity::Critical,
            "Increase memory limits in pod spec. Check resource usage patterns in monitoring.",
        );
    }
    if has("failed to pull image") {
        return (
            Severity::Critical,
            "Verify image name/tag. Check imagePullSecrets if registry requires authentication.",
        );
    }
    if has("crashing repeatedly") {
        return (
            Severity::Critical,
            "Review application logs for startup errors. Check readiness/liveness probe configuration.",
        );
    }
    if has("configuration error") {
        return (
            Severity::Critical,
            "Verify referenced ConfigMaps and Secrets exist. Check volume mount configurations.",
        );
    }
    if has("exit code") {
        return (
            Severity::Warning,
            "Application exited with error. Review logs and check application health.",
        );
    }
    if has("command not found") {
        return (
            Severity::Warning,
            "Verify container entrypoint/command in pod spec. Check binary exists in container image.",
        );
    }
    if has("connection refused") {
        return (
            Severity::Warning,
            "Ensure dependent services are running and accessible. Check service DNS and network policies.",
        );
    }
    if has("timeout") {
        return (
            Severity::Warning,
            "Increase timeout values if appropriate. Check service responsiveness and network latency.",
        );
    }
    if has("permission denied") {
        return (
            Severity::Warning,
            "Review Pod SecurityContext, serviceAccount permissions, and file ownership.",
        );
    }
    if has("missing file") {
        return (
            Severity::Warning,
            "Verify volume mounts and ConfigMap/Secret contents. Check file paths in application config.",
        );
    }
    if has("has restarted") {
        return (
            Severity::Warning,
            "Check logs for intermittent crashes. Consider increasing memory/CPU limits or reviewing application stability.",
        );
    }
    if has("unable to fetch pod") {
        return (
            Severity::Warning,
            "Check TaskRun status for pod scheduling issues and verify the pod still exists.",
        );
    }

    (
        Severity::Info,
        "Review container status and logs for additional context.",
    )
}

fn terminated_issue(state: &TerminatedState) -> Option<String> {
    match state.exit_code {
        137 => Some(MSG_OOM_KILLED.to_string()),
        1 | 2 => Some(format!(
            "Application crashed (Exit Code {}). This is usually an internal application error.",
            state.exit_code
        )),
        127 => Some(MSG_COMMAND_NOT_FOUND.to_string()),
        _ => None,
    }
}

/// Known failure patterns in the container status. All matching rules fire.
pub fn analyze_container_state(container: &ContainerStatus) -> Vec<String> {
    let mut issues = Vec::new();

    let terminated = container.state.terminated.as_ref().or_else(|| {
        container
            .last_state
            .as_ref()
            .and_then(|last| last.terminated.as_ref())
    });
    if let Some(issue) = terminated.and_then(terminated_issue) {
        issues.push(issue);
    }

    match container.state.waiting_reason() {
        Some("ImagePullBackOff" | "ErrImagePull") => issues.push(MSG_IMAGE_PULL.to_string()),
        Some("CrashLoopBackOff") => issues.push(MSG_CRASH_LOOP.to_string()),
        Some("CreateContainerConfigError") => issues.push(MSG_CONFIG_ERROR.to_string()),
        _ => {}
    }

    issues
}

/// Common error patterns in log text, matched case-insensitively.
pub fn analyze_logs(logs: &str) -> Vec<String> {
    let mut issues = Vec::new();
    if logs.is_empty() {
        return issues;
    }

    let lower = logs.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("connection refused") || has("dial tcp") {
        issues.push(MSG_NETWORK.to_string());
    }
    if has("timeout") || has("deadline exceeded") {
        issues.push(MSG_TIMEOUT.to_string());
    }
    if has("permission denied") || has("forbidden") {
        issues.push(MSG_PERMISSION.to_string());
    }
    if has("not found") && (has("config") || has("file")) {
        issues.push(MSG_MISSING_FILE.to_string());
    }
    issues
}

fn should_analyze_logs(container: &ContainerStatus) -> bool {
    container.state.terminated.is_some()
        || container.restart_count > 0
        || container.state.waiting_reason() == Some("CrashLoopBackOff")
}

/// Previous-instance log when the container restarted, else the current one.
async fn diagnosis_logs(client: &dyn ClusterClient, pod: &str, container: &ContainerStatus) -> String {
    let request = LogRequest::new(pod, &container.name, DOCTOR_LOG_LINES);
    let use_previous = container.restart_count > 0;

    if use_previous {
        match client.logs(&request.clone().previous(true)).await {
            Ok(text) if !text.is_empty() => return text,
            Ok(_) => debug!(pod, container = %container.name, "previous log empty, using current"),
            Err(e) => debug!(pod, container = %container.name, error = %e, "previous log unavailable"),
        }
    }

    match client.logs(&request).await {
        Ok(text) => text,
        Err(e) => {
            debug!(pod, container = %container.name, error = %e, "log fetch failed during diagnosis");
            String::new()
        }
    }
}

async fn diagnose_container(
    client: &dyn ClusterClient,
    pod: &str,
    container: &ContainerStatus,
    is_init: bool,
) -> Vec<Finding> {
    let mut issues = analyze_container_state(container);

    if should_analyze_logs(container) {
        let logs = diagnosis_logs(client, pod, container).await;
        issues.extend(analyze_logs(&logs));
    }

    if issues.is_empty()
        && container.state.running.is_some()
        && container.restart_count > STABILITY_RESTART_THRESHOLD
    {
        issues.push(format!(
            "Container is running but has restarted {} times.",
            container.restart_count
        ));
    }

    issues
        .into_iter()
        .map(|issue| Finding::new(issue, &container.name, is_init))
        .collect()
}

/// Findings for every init container, then every regular container of a pod.
/// Healthy containers contribute nothing.
pub async fn diagnose_pod(client: &dyn ClusterClient, pod: &Pod) -> Vec<Finding> {
    let name = &pod.metadata.name;
    let mut findings = Vec::new();

    for container in &pod.status.init_container_statuses {
        findings.extend(diagnose_container(client, name, container, true).await);
    }
    for container in &pod.status.container_statuses {
        findings.extend(diagnose_container(client, name, container, false).await);
    }

    findings
}

pub async fn analyze_pod(client: &dyn ClusterClient, pod: &Pod) -> AnalysisResult {
    let mut result = AnalysisResult::new(&pod.metadata.name, ResourceKind::Pod);
    result.findings = diagnose_pod(client, pod).await;
    result.analyzed_at = Utc::now();
    result
}

/// Diagnose the pod of every TaskRun of a pipeline run. Container names are
/// prefixed with the TaskRun display name.
pub async fn diagnose_pipeline_run(
    client: &dyn ClusterClient,
    pr: &PipelineRun,
) -> Result<AnalysisResult, CollaboratorError> {
    let mut result = AnalysisResult::new(&pr.metadata.name, ResourceKind::PipelineRun);
    let task_runs = client.task_runs_for(&pr.metadata.name).await?;

    for tr in &task_runs {
        let task = tr.display_name();

        let pod_name = match client.pod_for_task_run(tr).await {
            Ok(name) => name,
            Err(e) => {
                debug!(task_run = %tr.metadata.name, error = %e, "no pod for task run");
                result.findings.push(Finding::new(
                    format!("TaskRun {}: Unable to fetch pod", task),
                    task,
                    false,
                ));
                continue;
            }
        };

        let pod = match client.get_pod(&pod_name).await {
            Ok(pod) => pod,
            Err(e) => {
                debug!(pod = %pod_name, error = %e, "could not fetch task run pod");
                result.findings.push(Finding::new(
                    format!("TaskRun {}: Unable to fetch pod {}", task, pod_name),
                    task,
                    false,
                ));
                continue;
            }
        };

        for container in &pod.status.container_statuses {
            for mut finding in diagnose_container(client, &pod_name, container, false).await {
                finding.container = format!("{}/{}", task, finding.container);
                result.findings.push(finding);
            }
        }
    }

    result.analyzed_at = Utc::now();
    Ok(result)
}

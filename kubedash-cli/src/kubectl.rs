//! `kubectl`-backed cluster client
//!
//! Every call shells out to the configured binary with `-o json` and decodes
//! the output. Non-zero exits become [`CollaboratorError::Command`] carrying
//! the tool's own stderr, undecodable output becomes `Parse`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::process::Command;
use tracing::{debug, warn};

use kubedash_core::client::{ClusterClient, CollaboratorError, LogRequest};
use kubedash_core::model::{
    EventList, PipelineRun, PipelineRunList, Pod, PodList, RawEvent, TaskRun, TaskRunList,
};

const TASK_RUN_POD_LABELS: [&str; 2] = ["tekton.dev/taskRun", "tekton.dev/taskrun"];

#[derive(Clone, Debug)]
pub struct KubectlClient {
    binary: String,
    namespace: Option<String>,
}

impl KubectlClient {
    pub fn new(binary: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            binary: binary.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()),
        }
    }

    /// Global arguments placed before every subcommand.
    fn scope_args(&self) -> Vec<String> {
        match &self.namespace {
            Some(ns) => vec!["-n".into(), ns.clone()],
            None => Vec::new(),
        }
    }

    async fn run(&self, context: &str, args: &[String]) -> Result<String, CollaboratorError> {
        let mut full = self.scope_args();
        full.extend(args.iter().cloned());
        debug!(binary = %self.binary, args = ?full, "running collaborator");

        let output = Command::new(&self.binary)
            .args(&full)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CollaboratorError::command(context, format!("could not run {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            warn!(context, %message, "collaborator failed");
            return Err(CollaboratorError::command(context, message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        context: &str,
        args: Vec<String>,
    ) -> Result<T, CollaboratorError> {
        let raw = self.run(context, &args).await?;
        decode(context, &raw)
    }
}

fn decode<T: DeserializeOwned>(context: &str, raw: &str) -> Result<T, CollaboratorError> {
    serde_json::from_str(raw).map_err(|e| CollaboratorError::parse(context, e))
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

fn log_args(request: &LogRequest) -> Vec<String> {
    let mut out = vec![
        "logs".to_string(),
        format!("--tail={}", request.tail_lines),
        request.pod.clone(),
        "-c".to_string(),
        request.container.clone(),
    ];
    if request.previous {
        out.push("-p".into());
    }
    out
}

fn event_args(kind: &str, name: &str) -> Vec<String> {
    vec![
        "get".into(),
        "events".into(),
        "--field-selector".into(),
        format!("involvedObject.name={},involvedObject.kind={}", name, kind),
        "-o".into(),
        "json".into(),
    ]
}

#[async_trait]
impl ClusterClient for KubectlClient {
    fn name(&self) -> &'static str {
        "kubectl"
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, CollaboratorError> {
        let list: PodList = self
            .get_json("could not list pods", args(&["get", "pods", "-o", "json"]))
            .await?;
        Ok(list.items)
    }

    async fn list_pipeline_runs(&self) -> Result<Vec<PipelineRun>, CollaboratorError> {
        let list: PipelineRunList = self
            .get_json(
                "could not list pipelineruns",
                args(&["get", "pipelineruns", "-o", "json"]),
            )
            .await?;
        Ok(list.items)
    }

    async fn get_pod(&self, name: &str) -> Result<Pod, CollaboratorError> {
        self.get_json(
            &format!("could not fetch pod {}", name),
            args(&["get", "pod", name, "-o", "json"]),
        )
        .await
    }

    async fn get_pipeline_run(&self, name: &str) -> Result<PipelineRun, CollaboratorError> {
        self.get_json(
            &format!("could not fetch pipelinerun {}", name),
            args(&["get", "pipelinerun", name, "-o", "json"]),
        )
        .await
    }

    async fn task_runs_for(&self, pipeline_run: &str) -> Result<Vec<TaskRun>, CollaboratorError> {
        let selector = format!("tekton.dev/pipelineRun={}", pipeline_run);
        let list: TaskRunList = self
            .get_json(
                &format!("could not fetch taskruns for pipelinerun {}", pipeline_run),
                args(&["get", "taskruns", "-l", &selector, "-o", "json"]),
            )
            .await?;
        Ok(list.items)
    }

    async fn pod_for_task_run(&self, task_run: &TaskRun) -> Result<String, CollaboratorError> {
        if let Some(pod) = task_run.status.pod_name.as_deref().filter(|p| !p.is_empty()) {
            return Ok(pod.to_string());
        }

        for label in TASK_RUN_POD_LABELS {
            let selector = format!("{}={}", label, task_run.metadata.name);
            let lookup = args(&[
                "get",
                "pods",
                "-l",
                &selector,
                "-o",
                "jsonpath={.items[0].metadata.name}",
            ]);
            match self.run("could not look up task run pod", &lookup).await {
                Ok(out) if !out.trim().is_empty() => return Ok(out.trim().to_string()),
                Ok(_) => {}
                Err(e) => debug!(selector = %selector, error = %e, "pod lookup failed"),
            }
        }

        Err(CollaboratorError::not_found(format!(
            "pod for taskrun {}",
            task_run.metadata.name
        )))
    }

    async fn logs(&self, request: &LogRequest) -> Result<String, CollaboratorError> {
        let context = format!(
            "could not read logs of {}/{}",
            request.pod, request.container
        );
        self.run(&context, &log_args(request)).await
    }

    async fn events(&self, kind: &str, name: &str) -> Result<Vec<RawEvent>, CollaboratorError> {
        let list: EventList = self
            .get_json(
                &format!("could not fetch events for {} {}", kind, name),
                event_args(kind, name),
            )
            .await?;
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_scope() {
        let scoped = KubectlClient::new("kubectl", Some("payments".into()));
        assert_eq!(scoped.scope_args(), vec!["-n", "payments"]);
        let unscoped = KubectlClient::new("kubectl", Some(String::new()));
        assert!(unscoped.scope_args().is_empty());
    }

    #[test]
    fn test_log_args() {
        let request = LogRequest::new("api-1", "app", 100).previous(true);
        assert_eq!(
            log_args(&request),
            vec!["logs", "--tail=100", "api-1", "-c", "app", "-p"]
        );
        let request = LogRequest::new("api-1", "app", 50);
        assert_eq!(log_args(&request).last().map(String::as_str), Some("app"));
    }

    #[test]
    fn test_event_selector() {
        let args = event_args("TaskRun", "build-x");
        assert_eq!(
            args[3],
            "involvedObject.name=build-x,involvedObject.kind=TaskRun"
        );
    }

    #[test]
    fn test_decode_errors_are_parse_errors() {
        let err = decode::<PodList>("could not list pods", "error: You must be logged in")
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Parse { .. }));

        let list: PodList = decode("pods", r#"{"items": []}"#).unwrap();
        assert!(list.items.is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_command_error() {
        let client = KubectlClient::new("kubedash-test-no-such-binary", None);
        let err = client.list_pods().await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Command { .. }));
    }
}

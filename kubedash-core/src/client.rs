//! Cluster client trait
//!
//! The dashboard never talks to the control plane directly. Everything it
//! needs goes through a [`ClusterClient`], which lets the CLI plug in a
//! `kubectl`-backed implementation and tests plug in [`crate::fake::FakeCluster`].

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{PipelineRun, Pod, RawEvent, TaskRun};
use crate::resource::ResourceKind;

/// A failed or unparseable collaborator call. Always recovered locally.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("{context}: {message}")]
    Command { context: String, message: String },
    #[error("{context}: invalid output: {message}")]
    Parse { context: String, message: String },
    #[error("{what} not found")]
    NotFound { what: String },
}

impl CollaboratorError {
    pub fn command(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn parse(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

/// Parameters of a single log retrieval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRequest {
    pub pod: String,
    pub container: String,
    pub tail_lines: usize,
    /// Read the log of the previous terminated instance.
    pub previous: bool,
}

impl LogRequest {
    pub fn new(pod: &str, container: &str, tail_lines: usize) -> Self {
        Self {
            pod: pod.to_string(),
            container: container.to_string(),
            tail_lines,
            previous: false,
        }
    }

    pub fn previous(mut self, previous: bool) -> Self {
        self.previous = previous;
        self
    }
}

/// Request/response contract against the cluster control plane.
///
/// Implementations are scoped to a namespace when they are constructed.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Human-readable name of this backend
    fn name(&self) -> &'static str;

    async fn list_pods(&self) -> Result<Vec<Pod>, CollaboratorError>;

    async fn list_pipeline_runs(&self) -> Result<Vec<PipelineRun>, CollaboratorError>;

    async fn get_pod(&self, name: &str) -> Result<Pod, CollaboratorError>;

    async fn get_pipeline_run(&self, name: &str) -> Result<PipelineRun, CollaboratorError>;

    /// TaskRuns labelled as belonging to the given pipeline run.
    async fn task_runs_for(&self, pipeline_run: &str) -> Result<Vec<TaskRun>, CollaboratorError>;

    /// Resolve the pod backing a TaskRun.
    async fn pod_for_task_run(&self, task_run: &TaskRun) -> Result<String, CollaboratorError>;

    /// Tail-limited log text of one container.
    async fn logs(&self, request: &LogRequest) -> Result<String, CollaboratorError>;

    /// Events whose involved object matches the given kind and name.
    async fn events(&self, kind: &str, name: &str) -> Result<Vec<RawEvent>, CollaboratorError>;
}

/// Events for a resource of a known kind.
pub async fn events_for(
    client: &dyn ClusterClient,
    kind: ResourceKind,
    name: &str,
) -> Result<Vec<RawEvent>, CollaboratorError> {
    client.events(kind.object_kind(), name).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollaboratorError::command("could not list pods", "connection refused");
        assert_eq!(err.to_string(), "could not list pods: connection refused");

        let err = CollaboratorError::parse("pod list", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "pod list: invalid output: expected value at line 1"
        );

        assert_eq!(
            CollaboratorError::not_found("pod api").to_string(),
            "pod api not found"
        );
    }

    #[test]
    fn test_log_request_builder() {
        let req = LogRequest::new("api-1", "app", 100).previous(true);
        assert_eq!(req.tail_lines, 100);
        assert!(req.previous);
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{PipelineRun, Pod, format_age, parse_timestamp};

/// Which kind of resource the dashboard lists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Pod,
    PipelineRun,
}

impl ResourceKind {
    /// Name used on the kubectl command line.
    pub fn cli_name(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::PipelineRun => "pipelinerun",
        }
    }

    /// Kind as it appears in `involvedObject.kind`.
    pub fn object_kind(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::PipelineRun => "PipelineRun",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pods",
            ResourceKind::PipelineRun => "PipelineRuns",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pod" | "pods" | "po" => Ok(ResourceKind::Pod),
            "pipelinerun" | "pipelineruns" | "pr" => Ok(ResourceKind::PipelineRun),
            other => Err(format!("unknown resource kind: {}", other)),
        }
    }
}

/// One row of the resource list. The whole list is replaced on every refresh.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceItem {
    Pod(Pod),
    PipelineRun(PipelineRun),
}

impl ResourceItem {
    pub fn name(&self) -> &str {
        match self {
            ResourceItem::Pod(pod) => &pod.metadata.name,
            ResourceItem::PipelineRun(pr) => &pr.metadata.name,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            ResourceItem::Pod(pod) => &pod.metadata.namespace,
            ResourceItem::PipelineRun(pr) => &pr.metadata.namespace,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceItem::Pod(_) => ResourceKind::Pod,
            ResourceItem::PipelineRun(_) => ResourceKind::PipelineRun,
        }
    }

    pub fn status_label(&self) -> &str {
        match self {
            ResourceItem::Pod(pod) if !pod.status.phase.is_empty() => &pod.status.phase,
            ResourceItem::Pod(_) => "Unknown",
            ResourceItem::PipelineRun(pr) => pr
                .status
                .conditions
                .first()
                .and_then(|c| c.reason.as_deref())
                .filter(|r| !r.is_empty())
                .unwrap_or("Unknown"),
        }
    }

    /// Creation time, falling back to the start time reported in status.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let (created, started) = match self {
            ResourceItem::Pod(pod) => (
                pod.metadata.creation_timestamp.as_deref(),
                pod.status.start_time.as_deref(),
            ),
            ResourceItem::PipelineRun(pr) => (
                pr.metadata.creation_timestamp.as_deref(),
                pr.status.start_time.as_deref(),
            ),
        };
        created
            .and_then(parse_timestamp)
            .or_else(|| started.and_then(parse_timestamp))
    }

    pub fn description(&self, now: DateTime<Utc>) -> String {
        format!(
            "Status: {} | Age: {}",
            self.status_label(),
            format_age(self.created_at(), now)
        )
    }
}

//! Generated explanations of a failing resource
//!
//! Gathers status, events and the logs of failing containers, wraps them in a
//! persona-flavoured prompt and asks the Gemini `generateContent` endpoint for
//! a short diagnosis.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use kubedash_core::client::{ClusterClient, CollaboratorError, LogRequest};
use kubedash_core::model::{ContainerStatus, Pod, RawEvent, RunPhase, succeeded_status};
use kubedash_core::persona::Persona;
use kubedash_core::resource::ResourceItem;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const EXPLAIN_LOG_LINES: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("GEMINI_API_KEY not set. Cannot provide an explanation.")]
    MissingKey,
    #[error("{0}")]
    Collaborator(#[from] CollaboratorError),
    #[error("Failed to encode resource: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Error calling the generation API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Generation API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("No candidates returned. The request may have been blocked by safety settings.")]
    NoCandidates,
}

/// Everything the prompt is built from.
#[derive(Clone, Debug, Default)]
pub struct ExplainContext {
    pub kind: &'static str,
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub status_json: String,
    pub events: String,
    pub logs: String,
}

// --- Wire types ---

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Debug, Default, Deserialize)]
struct PartIn {
    #[serde(default)]
    text: String,
}

fn safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: "BLOCK_NONE",
    })
    .collect()
}

/// First text part of the first candidate.
pub fn parse_response(response: GenerateResponse) -> Result<String, ExplainError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .filter(|t| !t.trim().is_empty())
        .ok_or(ExplainError::NoCandidates)
}

pub fn build_prompt(persona: Persona, ctx: &ExplainContext) -> String {
    format!(
        "{instructions}
Your task is to diagnose a {kind} failure.

Context:
- {kind} Name: {name}
- Namespace: {namespace}
- Phase: {phase}

Status (JSON):
{status}

Events:
{events}

Logs:
{logs}

Instructions:
1. Stay in your persona.
2. Use the logs and events to identify the root cause.
3. Prefer logs of previous (crashed) container instances when present.
4. Explain the failure in one or two sentences.
5. Give a specific kubectl command or YAML change that fixes it.
6. Use Markdown with code blocks for commands.",
        instructions = persona.instructions(),
        kind = ctx.kind,
        name = ctx.name,
        namespace = ctx.namespace,
        phase = ctx.phase,
        status = ctx.status_json,
        events = if ctx.events.is_empty() { "(none)" } else { &ctx.events },
        logs = if ctx.logs.is_empty() { "(none)" } else { &ctx.logs },
    )
}

fn format_events(events: &[RawEvent]) -> String {
    let mut out = String::new();
    for event in events {
        let _ = writeln!(
            out,
            "{} {} {}: {}",
            event.last_timestamp.as_deref().unwrap_or("-"),
            event.kind,
            event.reason,
            event.message
        );
    }
    out
}

async fn failing_container_logs(
    client: &dyn ClusterClient,
    pod: &Pod,
    prefix: &str,
    out: &mut String,
) {
    let containers: Vec<&ContainerStatus> = pod
        .status
        .init_container_statuses
        .iter()
        .chain(&pod.status.container_statuses)
        .filter(|c| c.has_failure() || c.restart_count > 0)
        .collect();

    for container in containers {
        let name = &pod.metadata.name;
        if container.restart_count > 0 {
            let request = LogRequest::new(name, &container.name, EXPLAIN_LOG_LINES).previous(true);
            if let Ok(text) = client.logs(&request).await {
                if !text.trim().is_empty() {
                    let _ = write!(
                        out,
                        "\n--- {}Previous logs for container {} (crashed instance) ---\n{}\n",
                        prefix, container.name, text
                    );
                }
            }
        }
        let request = LogRequest::new(name, &container.name, EXPLAIN_LOG_LINES);
        if let Ok(text) = client.logs(&request).await {
            if !text.trim().is_empty() {
                let _ = write!(
                    out,
                    "\n--- {}Current logs for container {} ---\n{}\n",
                    prefix, container.name, text
                );
            }
        }
    }
}

/// Collect status, events and failing-container logs for one resource.
pub async fn gather_context(
    client: &dyn ClusterClient,
    item: &ResourceItem,
) -> Result<ExplainContext, ExplainError> {
    let mut ctx = ExplainContext {
        kind: item.kind().object_kind(),
        name: item.name().to_string(),
        namespace: item.namespace().to_string(),
        phase: item.status_label().to_string(),
        ..Default::default()
    };

    match item {
        ResourceItem::Pod(pod) => {
            ctx.status_json = serde_json::to_string_pretty(pod)?;
            ctx.events = format_events(&client.events("Pod", item.name()).await.unwrap_or_default());
            failing_container_logs(client, pod, "", &mut ctx.logs).await;
        }
        ResourceItem::PipelineRun(pr) => {
            ctx.status_json = serde_json::to_string_pretty(pr)?;
            ctx.events = format_events(
                &client
                    .events("PipelineRun", item.name())
                    .await
                    .unwrap_or_default(),
            );
            for task_run in client.task_runs_for(item.name()).await? {
                if succeeded_status(&task_run.status.conditions).phase != RunPhase::Failed {
                    continue;
                }
                let Ok(pod_name) = client.pod_for_task_run(&task_run).await else {
                    continue;
                };
                let Ok(pod) = client.get_pod(&pod_name).await else {
                    continue;
                };
                let prefix = format!("TaskRun {}: ", task_run.display_name());
                failing_container_logs(client, &pod, &prefix, &mut ctx.logs).await;
            }
        }
    }
    Ok(ctx)
}

pub struct Explainer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl Explainer {
    /// Reads the API key from the environment.
    pub fn from_env(model: impl Into<String>) -> Result<Self, ExplainError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ExplainError::MissingKey)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Ok(Self {
            http,
            api_key,
            model: model.into(),
        })
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ExplainError> {
        let url = format!("{}/{}:generateContent", ENDPOINT, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![PartOut { text: prompt }],
            }],
            safety_settings: safety_settings(),
        };
        debug!(model = %self.model, prompt_len = prompt.len(), "requesting explanation");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExplainError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        parse_response(parsed)
    }
}

/// Explain one resource in the given persona's voice.
pub async fn explain(
    client: &dyn ClusterClient,
    item: &ResourceItem,
    persona: Persona,
    model: &str,
) -> Result<String, ExplainError> {
    let explainer = Explainer::from_env(model)?;
    info!(resource = item.name(), persona = persona.key(), "explaining resource");
    let ctx = gather_context(client, item).await?;
    explainer.generate(&build_prompt(persona, &ctx)).await
}

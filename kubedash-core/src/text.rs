//! Semantic text layout
//!
//! Tab bodies are built here as lines of toned spans. The CLI maps each
//! [`Tone`] to a terminal style, so nothing in this module knows about colors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthChar;

use crate::client::CollaboratorError;
use crate::doctor::{AnalysisResult, Finding, Severity};
use crate::events::EventSection;
use crate::fetch::LogSection;
use crate::model::{
    ContainerStatus, PipelineRun, Pod, RunPhase, format_age, format_elapsed, parse_timestamp,
    succeeded_status,
};
use crate::resource::ResourceItem;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tone {
    Plain,
    Header,
    Section,
    Muted,
    Label,
    Success,
    Warning,
    Critical,
    Info,
    Remediation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub tone: Tone,
    pub text: String,
}

impl Span {
    pub fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextLine(pub Vec<Span>);

impl TextLine {
    pub fn blank() -> Self {
        Self(Vec::new())
    }

    pub fn styled(tone: Tone, text: impl Into<String>) -> Self {
        Self(vec![Span::new(tone, text)])
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::styled(Tone::Plain, text)
    }

    pub fn push(mut self, tone: Tone, text: impl Into<String>) -> Self {
        self.0.push(Span::new(tone, text));
        self
    }

    pub fn spans(&self) -> &[Span] {
        &self.0
    }

    /// Concatenated text without tones.
    pub fn content(&self) -> String {
        self.0.iter().map(|s| s.text.as_str()).collect()
    }

    /// Width in terminal cells.
    pub fn width(&self) -> usize {
        self.0
            .iter()
            .flat_map(|s| s.text.chars())
            .map(cell_width)
            .sum()
    }

    /// Split into display rows at most `width` cells wide, keeping tones.
    /// A zero width leaves the line whole.
    pub fn wrap(&self, width: usize) -> Vec<TextLine> {
        if width == 0 || self.width() <= width {
            return vec![self.clone()];
        }

        let mut rows = Vec::new();
        let mut row: Vec<Span> = Vec::new();
        let mut used = 0;
        for span in &self.0 {
            let mut piece = String::new();
            for ch in span.text.chars() {
                let w = cell_width(ch);
                if used > 0 && used + w > width {
                    if !piece.is_empty() {
                        row.push(Span::new(span.tone, std::mem::take(&mut piece)));
                    }
                    rows.push(TextLine(std::mem::take(&mut row)));
                    used = 0;
                }
                piece.push(ch);
                used += w;
            }
            if !piece.is_empty() {
                row.push(Span::new(span.tone, piece));
            }
        }
        if !row.is_empty() {
            rows.push(TextLine(row));
        }
        rows
    }
}

fn cell_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

fn row(label: &str, value: impl Into<String>, tone: Tone) -> TextLine {
    TextLine::styled(Tone::Label, format!("{:<12}", label)).push(tone, value)
}

fn phase_tone(phase: &str) -> Tone {
    match phase {
        "Running" | "Succeeded" => Tone::Success,
        "Failed" | "Error" => Tone::Critical,
        "Pending" => Tone::Warning,
        _ => Tone::Muted,
    }
}

fn container_tone(container: &ContainerStatus) -> Tone {
    let (_, running) = container.state_label();
    if running || matches!(&container.state.terminated, Some(t) if t.exit_code == 0) {
        Tone::Success
    } else if container.has_failure() {
        Tone::Critical
    } else {
        Tone::Muted
    }
}

/// Overview body, recomputed from the item on every frame.
pub fn overview_lines(item: &ResourceItem, now: DateTime<Utc>) -> Vec<TextLine> {
    match item {
        ResourceItem::Pod(pod) => pod_overview(pod, item, now),
        ResourceItem::PipelineRun(pr) => pipeline_run_overview(pr, item, now),
    }
}

fn pod_overview(pod: &Pod, item: &ResourceItem, now: DateTime<Utc>) -> Vec<TextLine> {
    let phase = item.status_label();
    let mut lines = vec![
        TextLine::styled(Tone::Header, format!("Pod: {}", pod.metadata.name)),
        TextLine::blank(),
        row("Namespace", &pod.metadata.namespace, Tone::Plain),
        row("Phase", phase, phase_tone(phase)),
        row("Age", format_age(item.created_at(), now), Tone::Plain),
    ];
    if let Some(node) = pod.spec.node_name.as_deref() {
        lines.push(row("Node", node, Tone::Plain));
    }
    if let Some(ip) = pod.status.pod_ip.as_deref() {
        lines.push(row("IP", ip, Tone::Plain));
    }

    let groups = [
        ("Init Containers", &pod.status.init_container_statuses),
        ("Containers", &pod.status.container_statuses),
    ];
    for (title, containers) in groups {
        if containers.is_empty() {
            continue;
        }
        lines.push(TextLine::blank());
        lines.push(TextLine::styled(Tone::Section, title));
        for c in containers.iter() {
            let (label, _) = c.state_label();
            let tone = container_tone(c);
            let mut line = TextLine::plain("  ")
                .push(tone, "• ")
                .push(Tone::Plain, format!("{}: ", c.name))
                .push(tone, label);
            if c.restart_count > 0 {
                line = line.push(Tone::Muted, format!(" ({} restarts)", c.restart_count));
            }
            lines.push(line);
        }
    }
    lines
}

fn pipeline_run_overview(pr: &PipelineRun, item: &ResourceItem, now: DateTime<Utc>) -> Vec<TextLine> {
    let status = succeeded_status(&pr.status.conditions);
    let tone = match status.phase {
        RunPhase::Succeeded => Tone::Success,
        RunPhase::Failed => Tone::Critical,
        RunPhase::Running => Tone::Warning,
        RunPhase::Unknown => Tone::Muted,
    };
    let text = match status.reason.as_deref() {
        Some(reason) if !reason.is_empty() && status.phase != RunPhase::Succeeded => {
            format!("{} ({})", status.phase.label(), reason)
        }
        _ => status.phase.label().to_string(),
    };

    let mut lines = vec![
        TextLine::styled(Tone::Header, format!("PipelineRun: {}", pr.metadata.name)),
        TextLine::blank(),
        row("Namespace", &pr.metadata.namespace, Tone::Plain),
        row("Status", text, tone),
        row("Age", format_age(item.created_at(), now), Tone::Plain),
    ];

    let start = pr.status.start_time.as_deref().and_then(parse_timestamp);
    let end = pr.status.completion_time.as_deref().and_then(parse_timestamp);
    if let (Some(start), Some(end)) = (start, end) {
        lines.push(row("Duration", format_elapsed(start, end), Tone::Plain));
    }
    if let Some(message) = status.message.as_deref().filter(|m| !m.is_empty()) {
        lines.push(TextLine::blank());
        lines.push(TextLine::styled(Tone::Muted, message));
    }
    lines
}

/// Inline error text for a failed fetch, e.g. `Error fetching logs: ...`.
pub fn error_lines(action: &str, err: &CollaboratorError) -> Vec<TextLine> {
    vec![TextLine::styled(
        Tone::Critical,
        format!("Error {}: {}", action, err),
    )]
}

pub fn logs_lines(resource: &str, sections: &[LogSection]) -> Vec<TextLine> {
    let mut lines = vec![
        TextLine::styled(Tone::Header, format!("Logs for {}", resource)),
        TextLine::blank(),
    ];
    if sections.is_empty() {
        lines.push(TextLine::styled(Tone::Muted, "No TaskRuns found for this PipelineRun."));
        return lines;
    }

    for section in sections {
        lines.push(TextLine::styled(Tone::Section, format!("--- {} ---", section.title)));
        match &section.text {
            Ok(text) if text.trim().is_empty() => {
                lines.push(TextLine::styled(Tone::Muted, "(no output)"));
            }
            Ok(text) => lines.extend(text.lines().map(TextLine::plain)),
            Err(e) => lines.push(TextLine::styled(Tone::Critical, format!("Error: {}", e))),
        }
        lines.push(TextLine::blank());
    }
    lines
}

pub fn events_lines(resource: &str, sections: &[EventSection]) -> Vec<TextLine> {
    let mut lines = vec![
        TextLine::styled(Tone::Header, format!("Events for {}", resource)),
        TextLine::blank(),
    ];
    if sections.iter().all(|s| s.events.is_empty()) {
        lines.push(TextLine::styled(Tone::Muted, format!("No events found for {}", resource)));
        return lines;
    }

    let titled = sections.len() > 1;
    for section in sections.iter().filter(|s| !s.events.is_empty()) {
        if titled {
            lines.push(TextLine::styled(Tone::Section, &section.title));
        }
        for event in &section.events {
            let (icon, tone) = if event.is_severe() {
                ("✖", Tone::Critical)
            } else if event.is_warning() {
                ("⚠", Tone::Warning)
            } else {
                ("•", Tone::Success)
            };
            lines.push(
                TextLine::styled(Tone::Muted, format!("+{} ", event.offset_label()))
                    .push(tone, format!("{} ", icon))
                    .push(Tone::Label, &event.reason),
            );
            lines.push(TextLine::plain(format!("  {}", event.message)));
            if event.count > 1 {
                lines.push(TextLine::styled(
                    Tone::Muted,
                    format!("  (occurred {} times)", event.count),
                ));
            }
        }
        lines.push(TextLine::blank());
    }
    lines
}

fn severity_marker(severity: Severity) -> (&'static str, Tone) {
    match severity {
        Severity::Critical => ("✖", Tone::Critical),
        Severity::Warning => ("⚠", Tone::Warning),
        Severity::Info => ("ℹ", Tone::Info),
    }
}

fn finding_lines(finding: &Finding) -> Vec<TextLine> {
    let (marker, tone) = severity_marker(finding.severity());
    let mut lines = vec![TextLine::plain("  ")
        .push(tone, format!("{} ", marker))
        .push(Tone::Plain, &finding.message)];
    if let Some(remediation) = finding.remediation() {
        lines.push(TextLine::styled(Tone::Remediation, format!("    → {}", remediation)));
    }
    lines
}

/// Findings grouped by container, most severe first, then a summary line.
pub fn doctor_lines(result: &AnalysisResult) -> Vec<TextLine> {
    let mut lines = vec![
        TextLine::styled(Tone::Header, format!("Doctor Analysis: {}", result.resource_name)),
        TextLine::styled(
            Tone::Muted,
            format!("Analyzed at: {}", result.analyzed_at.format("%H:%M:%S")),
        ),
        TextLine::blank(),
    ];

    if result.findings.is_empty() {
        lines.push(TextLine::styled(
            Tone::Success,
            "No issues detected. All containers appear healthy.",
        ));
        return lines;
    }

    let mut by_container: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
    for finding in &result.findings {
        by_container
            .entry(finding.container.as_str())
            .or_default()
            .push(finding);
    }

    for (container, mut findings) in by_container {
        let prefix = if findings[0].is_init { "(Init) " } else { "" };
        lines.push(TextLine::styled(
            Tone::Section,
            format!("{}Container: {}", prefix, container),
        ));
        findings.sort_by_key(|f| std::cmp::Reverse(f.severity()));
        for finding in findings {
            lines.extend(finding_lines(finding));
        }
        lines.push(TextLine::blank());
    }

    let (critical, warning, info) = result.counts();
    let mut summary = TextLine::styled(Tone::Section, "Summary: ");
    if critical > 0 {
        summary = summary.push(Tone::Critical, format!("{} critical  ", critical));
    }
    if warning > 0 {
        summary = summary.push(Tone::Warning, format!("{} warnings  ", warning));
    }
    if info > 0 {
        summary = summary.push(Tone::Info, format!("{} info", info));
    }
    lines.push(summary);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doctor::{MSG_NETWORK, MSG_OOM_KILLED};
    use crate::model::ContainerState;
    use crate::resource::ResourceKind;
    use chrono::TimeZone;

    fn text(lines: &[TextLine]) -> Vec<String> {
        lines.iter().map(TextLine::content).collect()
    }

    #[test]
    fn test_wrap_splits_across_spans() {
        let line = TextLine::styled(Tone::Muted, "+00:05 ").push(Tone::Label, "BackOff restarting");
        let rows = line.wrap(10);
        assert_eq!(text(&rows), vec!["+00:05 Bac", "kOff resta", "rting"]);
        assert_eq!(rows[0].spans()[1].tone, Tone::Label);
        assert!(rows.iter().all(|r| r.width() <= 10));

        assert_eq!(line.wrap(0), vec![line.clone()]);
        assert_eq!(TextLine::blank().wrap(10), vec![TextLine::blank()]);
    }

    #[test]
    fn test_wrap_counts_cells_not_bytes() {
        let line = TextLine::plain("    → retry");
        assert_eq!(line.width(), 11);
        assert_eq!(line.wrap(11).len(), 1);
    }

    #[test]
    fn test_pod_overview() {
        let mut pod = Pod::new("api", "Running").with_container(
            ContainerStatus::new("app", ContainerState::waiting("CrashLoopBackOff")).with_restarts(3),
        );
        pod.metadata.namespace = "shop".into();
        pod.metadata.creation_timestamp = Some("2024-05-01T11:00:00Z".into());
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let lines = overview_lines(&ResourceItem::Pod(pod), now);
        let rendered = text(&lines);
        assert_eq!(rendered[0], "Pod: api");
        assert!(rendered.iter().any(|l| l.contains("shop")));
        assert!(rendered.iter().any(|l| l.ends_with("1h")));
        let container = rendered.last().unwrap();
        assert!(container.contains("app: waiting: CrashLoopBackOff (3 restarts)"));
        assert_eq!(lines.last().unwrap().spans()[1].tone, Tone::Critical);
    }

    #[test]
    fn test_doctor_lines_order_and_summary() {
        let mut result = AnalysisResult::new("api", ResourceKind::Pod);
        result.findings = vec![
            Finding::new(MSG_NETWORK, "web", false),
            Finding::new(MSG_OOM_KILLED, "web", false),
            Finding::new("something odd", "init-db", true),
        ];
        let rendered = text(&doctor_lines(&result));

        let init = rendered.iter().position(|l| l == "(Init) Container: init-db").unwrap();
        let web = rendered.iter().position(|l| l == "Container: web").unwrap();
        assert!(init < web);
        assert!(rendered[web + 1].contains("OOMKilled"));
        assert!(rendered[web + 3].contains("Network error"));
        assert_eq!(
            rendered.last().unwrap().trim_end(),
            "Summary: 1 critical  1 warnings  1 info"
        );
    }

    #[test]
    fn test_doctor_lines_healthy() {
        let result = AnalysisResult::new("api", ResourceKind::Pod);
        let rendered = text(&doctor_lines(&result));
        assert!(rendered.last().unwrap().contains("No issues detected"));
    }

    #[test]
    fn test_logs_lines_inline_errors() {
        let sections = vec![
            LogSection {
                title: "Container: app".into(),
                text: Ok("line one\nline two\n".into()),
            },
            LogSection {
                title: "Container: proxy".into(),
                text: Err(CollaboratorError::command("logs", "container not ready")),
            },
        ];
        let rendered = text(&logs_lines("api", &sections));
        assert!(rendered.contains(&"line two".to_string()));
        assert!(rendered.contains(&"Error: logs: container not ready".to_string()));
    }

    #[test]
    fn test_events_lines_empty() {
        let rendered = text(&events_lines("api", &[]));
        assert_eq!(rendered.last().unwrap(), "No events found for api");
    }
}

//! Plain-text diagnosis report
//!
//! Printed after the dashboard commits a selection, and by `kubedash doctor`
//! without the dashboard. Labels, annotations, container logs and events are
//! added on request.

use std::collections::BTreeMap;

use chrono::Utc;
use regex::Regex;

use kubedash_core::client::ClusterClient;
use kubedash_core::doctor::AnalysisResult;
use kubedash_core::fetch::{FetchLimits, fetch_doctor, fetch_events, fetch_logs, fetch_resource_detail};
use kubedash_core::model::Pod;
use kubedash_core::resource::{ResourceItem, ResourceKind};
use kubedash_core::text::{
    TextLine, Tone, doctor_lines, error_lines, events_lines, logs_lines, overview_lines,
};

/// Optional report sections.
#[derive(Clone, Debug, Default)]
pub struct ReportOptions {
    pub logs: bool,
    pub events: bool,
    pub labels: bool,
    pub annotations: bool,
    /// Only pod containers whose name matches are shown.
    pub restrict: Option<Regex>,
    pub limits: FetchLimits,
}

fn join(lines: &[TextLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.content().trim_end());
        out.push('\n');
    }
    out
}

/// Copy of `item` without the pod containers `restrict` rejects.
pub fn restrict_containers(item: &ResourceItem, restrict: &Regex) -> ResourceItem {
    match item {
        ResourceItem::Pod(pod) => {
            let mut pod: Pod = pod.clone();
            pod.spec.containers.retain(|c| restrict.is_match(&c.name));
            pod.spec.init_containers.retain(|c| restrict.is_match(&c.name));
            pod.status.container_statuses.retain(|c| restrict.is_match(&c.name));
            pod.status
                .init_container_statuses
                .retain(|c| restrict.is_match(&c.name));
            ResourceItem::Pod(pod)
        }
        ResourceItem::PipelineRun(_) => item.clone(),
    }
}

fn map_lines(title: &str, entries: &BTreeMap<String, String>) -> Vec<TextLine> {
    let mut lines = vec![TextLine::styled(Tone::Section, title)];
    if entries.is_empty() {
        lines.push(TextLine::styled(Tone::Muted, "  (none)"));
    }
    for (key, value) in entries {
        lines.push(
            TextLine::plain("  ")
                .push(Tone::Label, key.as_str())
                .push(Tone::Plain, format!(": {}", value)),
        );
    }
    lines.push(TextLine::blank());
    lines
}

fn end_section(lines: &mut Vec<TextLine>) {
    if lines.last().is_some_and(|l| !l.spans().is_empty()) {
        lines.push(TextLine::blank());
    }
}

/// Requested optional sections, in print order. Fetch failures are reported
/// inline.
pub async fn extra_lines(
    client: &dyn ClusterClient,
    item: &ResourceItem,
    options: &ReportOptions,
) -> Vec<TextLine> {
    let meta = match item {
        ResourceItem::Pod(pod) => &pod.metadata,
        ResourceItem::PipelineRun(pr) => &pr.metadata,
    };
    let mut lines = Vec::new();
    if options.labels {
        lines.extend(map_lines("Labels", &meta.labels));
    }
    if options.annotations {
        lines.extend(map_lines("Annotations", &meta.annotations));
    }
    if options.logs {
        match fetch_logs(client, item, options.limits).await {
            Ok(sections) => lines.extend(logs_lines(item.name(), &sections)),
            Err(e) => lines.extend(error_lines("fetching logs", &e)),
        }
        end_section(&mut lines);
    }
    if options.events {
        match fetch_events(client, item).await {
            Ok(sections) => lines.extend(events_lines(item.name(), &sections)),
            Err(e) => lines.extend(error_lines("fetching events", &e)),
        }
        end_section(&mut lines);
    }
    lines
}

/// Overview of the resource, the optional sections, then its findings.
pub fn format_report(item: &ResourceItem, extra: &[TextLine], result: &AnalysisResult) -> String {
    let mut out = join(&overview_lines(item, Utc::now()));
    out.push('\n');
    out.push_str(&join(extra));
    out.push_str(&join(&doctor_lines(result)));
    out
}

/// Re-read the resource, diagnose it and print the report.
pub async fn run_doctor(
    client: &dyn ClusterClient,
    kind: ResourceKind,
    name: &str,
    options: &ReportOptions,
) -> Result<ResourceItem, String> {
    let item = fetch_resource_detail(client, kind, name)
        .await
        .map_err(|e| e.to_string())?;
    let result = fetch_doctor(client, &item)
        .await
        .map_err(|e| format!("Error performing doctor analysis: {}", e))?;

    let shown = match &options.restrict {
        Some(restrict) => restrict_containers(&item, restrict),
        None => item.clone(),
    };
    let extra = extra_lines(client, &shown, options).await;
    print!("{}", format_report(&shown, &extra, &result));
    Ok(item)
}

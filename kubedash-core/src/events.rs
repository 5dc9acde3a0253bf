//! Event timelines
//!
//! Raw cluster events are filtered, ordered and anchored to the creation time
//! of the resource they belong to so the Events tab can show relative offsets.

use chrono::{DateTime, Duration, Utc};

use crate::model::{RawEvent, parse_timestamp};

/// A timestamped event positioned on a resource timeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub reason: String,
    pub message: String,
    pub count: u32,
    pub offset: Duration,
}

impl TimelineEvent {
    pub fn is_warning(&self) -> bool {
        self.kind == "Warning"
    }

    /// Warning whose reason points at a failure or a back-off loop.
    pub fn is_severe(&self) -> bool {
        if !self.is_warning() {
            return false;
        }
        let reason = self.reason.to_lowercase();
        reason.contains("failed") || reason.contains("backoff")
    }

    pub fn offset_label(&self) -> String {
        format_offset(self.offset)
    }
}

/// A titled group of events, one per resource or task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSection {
    pub title: String,
    pub events: Vec<TimelineEvent>,
}

/// Drop events without a usable timestamp, sort them ascending and compute
/// offsets from `anchor`, or from the earliest event when there is none.
pub fn build_timeline(raw: Vec<RawEvent>, anchor: Option<DateTime<Utc>>) -> Vec<TimelineEvent> {
    let mut stamped: Vec<(DateTime<Utc>, RawEvent)> = raw
        .into_iter()
        .filter_map(|e| {
            let ts = e.last_timestamp.as_deref().and_then(parse_timestamp)?;
            Some((ts, e))
        })
        .collect();

    stamped.sort_by_key(|(ts, _)| *ts);

    let Some(anchor) = anchor.or_else(|| stamped.first().map(|(ts, _)| *ts)) else {
        return Vec::new();
    };

    stamped
        .into_iter()
        .map(|(timestamp, e)| TimelineEvent {
            offset: (timestamp - anchor).max(Duration::zero()),
            timestamp,
            kind: e.kind,
            reason: e.reason,
            message: e.message,
            count: e.count,
        })
        .collect()
}

/// `MM:SS`, or `HH:MM:SS` once an hour has passed.
pub fn format_offset(offset: Duration) -> String {
    let total = offset.num_seconds().max(0);
    let hours = total / 3_600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(ts: Option<&str>, kind: &str, reason: &str) -> RawEvent {
        RawEvent {
            last_timestamp: ts.map(String::from),
            kind: kind.into(),
            reason: reason.into(),
            message: format!("{} happened", reason),
            count: 1,
        }
    }

    #[test]
    fn test_drops_untimed_and_sorts() {
        let events = vec![
            raw(Some("2024-05-01T12:00:30Z"), "Normal", "Started"),
            raw(None, "Normal", "Ghost"),
            raw(Some("not a time"), "Normal", "Garbled"),
            raw(Some("2024-05-01T12:00:05Z"), "Normal", "Pulled"),
        ];
        let timeline = build_timeline(events, None);
        let reasons: Vec<_> = timeline.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["Pulled", "Started"]);
        assert_eq!(timeline[0].offset, Duration::zero());
        assert_eq!(timeline[1].offset, Duration::seconds(25));
    }

    #[test]
    fn test_offsets_from_creation_anchor() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let events = vec![
            raw(Some("2024-05-01T13:02:03Z"), "Warning", "BackOff"),
            raw(Some("2024-05-01T11:59:00Z"), "Normal", "Scheduled"),
        ];
        let timeline = build_timeline(events, Some(created));
        assert_eq!(timeline[0].offset_label(), "00:00");
        assert_eq!(timeline[1].offset_label(), "01:02:03");
    }

    #[test]
    fn test_empty_input() {
        assert!(build_timeline(Vec::new(), None).is_empty());
    }

    #[test]
    fn test_format_offset_wraps_minutes() {
        assert_eq!(format_offset(Duration::seconds(59)), "00:59");
        assert_eq!(format_offset(Duration::seconds(61 * 60 + 5)), "01:01:05");
        assert_eq!(format_offset(Duration::seconds(-3)), "00:00");
    }

    #[test]
    fn test_severity_flag() {
        let timeline = build_timeline(
            vec![
                raw(Some("2024-05-01T12:00:00Z"), "Warning", "FailedMount"),
                raw(Some("2024-05-01T12:00:01Z"), "Warning", "Unhealthy"),
                raw(Some("2024-05-01T12:00:02Z"), "Normal", "BackOff"),
            ],
            None,
        );
        assert!(timeline[0].is_severe());
        assert!(!timeline[1].is_severe());
        assert!(timeline[1].is_warning());
        assert!(!timeline[2].is_severe());
    }
}

//! Uptime summaries derived from check history.

use serde::Serialize;

use crate::check::ServiceStatus;
use crate::db::HistoryEntry;

/// A maximal run of consecutive same-status history entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub status: ServiceStatus,
    pub count: usize,
}

/// Derived view over a history window. Never stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeSummary {
    /// Percentage of entries with status up, rounded to one decimal.
    /// `None` when the window holds no entries: zero-length history is
    /// "no data", not 0% uptime.
    pub percent_up: Option<f64>,
    pub segments: Vec<Segment>,
}

/// Summarize an ordered history window.
pub fn summarize(entries: &[HistoryEntry]) -> UptimeSummary {
    if entries.is_empty() {
        return UptimeSummary {
            percent_up: None,
            segments: Vec::new(),
        };
    }

    let up_count = entries
        .iter()
        .filter(|e| e.status == ServiceStatus::Up)
        .count();
    let percent_up = (up_count as f64 / entries.len() as f64 * 1000.0).round() / 10.0;

    let mut segments: Vec<Segment> = Vec::new();
    for entry in entries {
        match segments.last_mut() {
            Some(seg) if seg.status == entry.status => seg.count += 1,
            _ => segments.push(Segment {
                status: entry.status,
                count: 1,
            }),
        }
    }

    UptimeSummary {
        percent_up: Some(percent_up),
        segments,
    }
}

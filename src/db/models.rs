//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check::ServiceStatus;

/// One timestamped status sample for a target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub status: ServiceStatus,
    pub response_time_ms: u64,
}

/// A persisted alert row, written when a target goes down.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub id: i64,
    pub target_id: String,
    pub target_name: String,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Kanban-style workflow column for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lane {
    Backlog,
    InProgress,
    Review,
    Done,
}

impl Lane {
    pub const VARIANTS: &'static [&'static str] = &["backlog", "in-progress", "review", "done"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Backlog => "backlog",
            Lane::InProgress => "in-progress",
            Lane::Review => "review",
            Lane::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "backlog" => Some(Lane::Backlog),
            "in-progress" => Some(Lane::InProgress),
            "review" => Some(Lane::Review),
            "done" => Some(Lane::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const VARIANTS: &'static [&'static str] = &["low", "medium", "high", "critical"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaStatus {
    Proposed,
    Approved,
    Rejected,
    Deferred,
    Converted,
}

impl IdeaStatus {
    pub const VARIANTS: &'static [&'static str] =
        &["proposed", "approved", "rejected", "deferred", "converted"];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::Proposed => "proposed",
            IdeaStatus::Approved => "approved",
            IdeaStatus::Rejected => "rejected",
            IdeaStatus::Deferred => "deferred",
            IdeaStatus::Converted => "converted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "proposed" => Some(IdeaStatus::Proposed),
            "approved" => Some(IdeaStatus::Approved),
            "rejected" => Some(IdeaStatus::Rejected),
            "deferred" => Some(IdeaStatus::Deferred),
            "converted" => Some(IdeaStatus::Converted),
            _ => None,
        }
    }
}

/// A tracked work item with a human-readable sequential id (`TASK-007`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub lane: Lane,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub branch: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a ticket, after validation.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub lane: Lane,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub branch: Option<String>,
}

/// Partial ticket update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lane: Option<Lane>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub branch: Option<String>,
}

/// An idea in the lightweight tracker (`IDEA-003`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: IdeaStatus,
    pub tags: Vec<String>,
    pub submitted_by: String,
    pub converted_ticket_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIdea {
    pub title: String,
    pub description: String,
    pub status: IdeaStatus,
    pub tags: Vec<String>,
    pub submitted_by: String,
}

/// Partial idea update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct IdeaUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IdeaStatus>,
    pub tags: Option<Vec<String>>,
    pub submitted_by: Option<String>,
}

/// Last observed state of an auxiliary agent machine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub name: String,
    pub status: String,
    pub current_task: Option<String>,
    pub last_update: DateTime<Utc>,
}

//! SQLite store for history, alerts, tickets, ideas, and agent state.
//!
//! Every write is a single statement or transaction, so a crash mid-sweep
//! can lose at most the in-flight row, never the rest of a series. There
//! are no cross-table transactions: a history write and an alert write for
//! the same outcome are independent.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::models::*;
use crate::check::ServiceStatus;

/// History retention window in days. Older entries are discarded on every
/// append, not archived.
pub const HISTORY_RETENTION_DAYS: i64 = 7;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
}

/// Thread-safe database store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(())
    }

    // --- History ---

    /// Append a check sample for a target, then prune that target's series
    /// past the retention window. One transaction per call.
    pub fn record_check(
        &self,
        target_id: &str,
        status: ServiceStatus,
        response_time_ms: u64,
    ) -> Result<(), DbError> {
        self.record_check_at(target_id, status, response_time_ms, Utc::now())
    }

    pub(crate) fn record_check_at(
        &self,
        target_id: &str,
        status: ServiceStatus,
        response_time_ms: u64,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO history (target_id, status, response_time_ms, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![target_id, status.as_str(), response_time_ms as i64, fmt_time(at)],
        )?;

        let cutoff = Utc::now() - ChronoDuration::days(HISTORY_RETENTION_DAYS);
        tx.execute(
            "DELETE FROM history WHERE target_id = ?1 AND timestamp < ?2",
            params![target_id, fmt_time(cutoff)],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Entries for a target within the trailing `hours` window, in stored
    /// chronological order. Hours are clamped to [1, 168].
    pub fn history(&self, target_id: &str, hours: i64) -> Result<Vec<HistoryEntry>, DbError> {
        let hours = hours.clamp(1, 168);
        let cutoff = Utc::now() - ChronoDuration::hours(hours);

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT timestamp, status, response_time_ms FROM history
             WHERE target_id = ?1 AND timestamp > ?2 ORDER BY timestamp ASC, id ASC",
        )?;

        let entries = stmt
            .query_map(params![target_id, fmt_time(cutoff)], |row| {
                let time_str: String = row.get(0)?;
                let status: String = row.get(1)?;
                let response_time_ms: i64 = row.get(2)?;
                Ok(HistoryEntry {
                    timestamp: parse_db_time(&time_str).unwrap_or_else(Utc::now),
                    status: ServiceStatus::parse(&status),
                    response_time_ms: response_time_ms.max(0) as u64,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(entries)
    }

    /// The most recently recorded status for a target, if any.
    pub fn last_status(&self, target_id: &str) -> Result<Option<ServiceStatus>, DbError> {
        let conn = self.conn.lock().unwrap();
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM history WHERE target_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT 1",
                params![target_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.map(|s| ServiceStatus::parse(&s)))
    }

    // --- Alerts ---

    /// Append one alert event.
    pub fn record_alert(
        &self,
        target_id: &str,
        target_name: &str,
        status: ServiceStatus,
        message: &str,
    ) -> Result<(), DbError> {
        self.record_alert_at(target_id, target_name, status, message, Utc::now())
    }

    pub(crate) fn record_alert_at(
        &self,
        target_id: &str,
        target_name: &str,
        status: ServiceStatus,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO alerts (target_id, target_name, status, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![target_id, target_name, status.as_str(), message, fmt_time(at)],
        )?;
        Ok(())
    }

    /// The last `limit` alerts, most recent first.
    pub fn recent_alerts(&self, limit: i64) -> Result<Vec<AlertEvent>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, target_name, status, message, created_at FROM alerts
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let alerts = stmt
            .query_map(params![limit], alert_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(alerts)
    }

    /// Alerts for one target, most recent first.
    pub fn alerts_for_target(
        &self,
        target_id: &str,
        limit: i64,
    ) -> Result<Vec<AlertEvent>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, target_name, status, message, created_at FROM alerts
             WHERE target_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let alerts = stmt
            .query_map(params![target_id, limit], alert_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(alerts)
    }

    /// Delete alerts older than the cutoff; returns the number removed.
    pub fn prune_alerts(&self, max_age_days: i64) -> Result<usize, DbError> {
        let cutoff = Utc::now() - ChronoDuration::days(max_age_days);
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM alerts WHERE created_at < ?1",
            params![fmt_time(cutoff)],
        )?;
        Ok(removed)
    }

    // --- Tickets ---

    /// Create a ticket with the next sequential id.
    ///
    /// The id is computed from the max existing suffix; the primary key
    /// guards the race between two creates landing on the same id.
    pub fn create_ticket(&self, new: &NewTicket) -> Result<Ticket, DbError> {
        let conn = self.conn.lock().unwrap();
        Self::insert_ticket(&conn, new)
    }

    fn insert_ticket(conn: &Connection, new: &NewTicket) -> Result<Ticket, DbError> {
        for _ in 0..3 {
            let id = next_prefixed_id(conn, "tickets", "TASK")?;
            let now = Utc::now();
            let result = conn.execute(
                "INSERT INTO tickets (id, title, description, lane, priority, assignee, branch, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    new.title,
                    new.description,
                    new.lane.as_str(),
                    new.priority.as_str(),
                    new.assignee,
                    new.branch,
                    fmt_time(now),
                    fmt_time(now),
                ],
            );
            match result {
                Ok(_) => {
                    return Ok(Ticket {
                        id,
                        title: new.title.clone(),
                        description: new.description.clone(),
                        lane: new.lane,
                        priority: new.priority,
                        assignee: new.assignee.clone(),
                        branch: new.branch.clone(),
                        created_at: now,
                        updated_at: now,
                    })
                }
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    continue
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DbError::Conflict("could not allocate a ticket id".to_string()))
    }

    /// List tickets, optionally filtered by lane and assignee.
    pub fn list_tickets(
        &self,
        lane: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<Vec<Ticket>, DbError> {
        let mut sql = String::from(
            "SELECT id, title, description, lane, priority, assignee, branch, created_at, updated_at
             FROM tickets WHERE 1=1",
        );
        let mut args: Vec<String> = Vec::new();

        if let Some(lane) = lane {
            sql.push_str(&format!(" AND lane = ?{}", args.len() + 1));
            args.push(lane.to_string());
        }
        if let Some(assignee) = assignee {
            sql.push_str(&format!(" AND assignee = ?{}", args.len() + 1));
            args.push(assignee.to_string());
        }
        sql.push_str(" ORDER BY created_at DESC");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let tickets = stmt
            .query_map(params_from_iter(args.iter()), ticket_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(tickets)
    }

    pub fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, DbError> {
        let conn = self.conn.lock().unwrap();
        let ticket = conn
            .query_row(
                "SELECT id, title, description, lane, priority, assignee, branch, created_at, updated_at
                 FROM tickets WHERE id = ?1",
                params![id],
                ticket_from_row,
            )
            .optional()?;
        Ok(ticket)
    }

    /// Apply a partial update; returns the updated record, or `None` if
    /// the id is unknown.
    pub fn update_ticket(
        &self,
        id: &str,
        update: &TicketUpdate,
    ) -> Result<Option<Ticket>, DbError> {
        let Some(mut ticket) = self.get_ticket(id)? else {
            return Ok(None);
        };

        if let Some(title) = &update.title {
            ticket.title = title.clone();
        }
        if let Some(description) = &update.description {
            ticket.description = description.clone();
        }
        if let Some(lane) = update.lane {
            ticket.lane = lane;
        }
        if let Some(priority) = update.priority {
            ticket.priority = priority;
        }
        if let Some(assignee) = &update.assignee {
            ticket.assignee = Some(assignee.clone());
        }
        if let Some(branch) = &update.branch {
            ticket.branch = Some(branch.clone());
        }
        ticket.updated_at = Utc::now();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE tickets SET title=?1, description=?2, lane=?3, priority=?4, assignee=?5, branch=?6, updated_at=?7
             WHERE id=?8",
            params![
                ticket.title,
                ticket.description,
                ticket.lane.as_str(),
                ticket.priority.as_str(),
                ticket.assignee,
                ticket.branch,
                fmt_time(ticket.updated_at),
                id,
            ],
        )?;
        Ok(Some(ticket))
    }

    pub fn delete_ticket(&self, id: &str) -> Result<bool, DbError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM tickets WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // --- Ideas ---

    pub fn create_idea(&self, new: &NewIdea) -> Result<Idea, DbError> {
        let conn = self.conn.lock().unwrap();
        for _ in 0..3 {
            let id = next_prefixed_id(&conn, "ideas", "IDEA")?;
            let now = Utc::now();
            let result = conn.execute(
                "INSERT INTO ideas (id, title, description, status, tags, submitted_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    new.title,
                    new.description,
                    new.status.as_str(),
                    serialize_tags(&new.tags),
                    new.submitted_by,
                    fmt_time(now),
                    fmt_time(now),
                ],
            );
            match result {
                Ok(_) => {
                    return Ok(Idea {
                        id,
                        title: new.title.clone(),
                        description: new.description.clone(),
                        status: new.status,
                        tags: new.tags.clone(),
                        submitted_by: new.submitted_by.clone(),
                        converted_ticket_id: None,
                        created_at: now,
                        updated_at: now,
                    })
                }
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    continue
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DbError::Conflict("could not allocate an idea id".to_string()))
    }

    /// List ideas, optionally filtered by status and tag.
    pub fn list_ideas(
        &self,
        status: Option<&str>,
        tag: Option<&str>,
    ) -> Result<Vec<Idea>, DbError> {
        let mut sql = String::from(
            "SELECT id, title, description, status, tags, submitted_by, converted_ticket_id, created_at, updated_at
             FROM ideas WHERE 1=1",
        );
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = status {
            sql.push_str(&format!(" AND status = ?{}", args.len() + 1));
            args.push(status.to_string());
        }
        if let Some(tag) = tag {
            sql.push_str(&format!(" AND tags LIKE ?{}", args.len() + 1));
            args.push(format!("%{}%", tag));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let ideas = stmt
            .query_map(params_from_iter(args.iter()), idea_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(ideas)
    }

    pub fn get_idea(&self, id: &str) -> Result<Option<Idea>, DbError> {
        let conn = self.conn.lock().unwrap();
        let idea = conn
            .query_row(
                "SELECT id, title, description, status, tags, submitted_by, converted_ticket_id, created_at, updated_at
                 FROM ideas WHERE id = ?1",
                params![id],
                idea_from_row,
            )
            .optional()?;
        Ok(idea)
    }

    pub fn update_idea(&self, id: &str, update: &IdeaUpdate) -> Result<Option<Idea>, DbError> {
        let Some(mut idea) = self.get_idea(id)? else {
            return Ok(None);
        };

        if let Some(title) = &update.title {
            idea.title = title.clone();
        }
        if let Some(description) = &update.description {
            idea.description = description.clone();
        }
        if let Some(status) = update.status {
            idea.status = status;
        }
        if let Some(tags) = &update.tags {
            idea.tags = tags.clone();
        }
        if let Some(submitted_by) = &update.submitted_by {
            idea.submitted_by = submitted_by.clone();
        }
        idea.updated_at = Utc::now();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE ideas SET title=?1, description=?2, status=?3, tags=?4, submitted_by=?5, updated_at=?6
             WHERE id=?7",
            params![
                idea.title,
                idea.description,
                idea.status.as_str(),
                serialize_tags(&idea.tags),
                idea.submitted_by,
                fmt_time(idea.updated_at),
                id,
            ],
        )?;
        Ok(Some(idea))
    }

    pub fn delete_idea(&self, id: &str) -> Result<bool, DbError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM ideas WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Convert an idea into a backlog ticket and mark it converted.
    ///
    /// An idea that is already converted, or already linked to a ticket,
    /// is rejected without creating anything.
    pub fn convert_idea(&self, id: &str) -> Result<Ticket, DbError> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;

        let idea = tx
            .query_row(
                "SELECT id, title, description, status, tags, submitted_by, converted_ticket_id, created_at, updated_at
                 FROM ideas WHERE id = ?1",
                params![id],
                idea_from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound)?;

        if idea.status == IdeaStatus::Converted || idea.converted_ticket_id.is_some() {
            return Err(DbError::Conflict("Idea already converted".to_string()));
        }

        let ticket = Self::insert_ticket(
            &tx,
            &NewTicket {
                title: idea.title.clone(),
                description: idea.description.clone(),
                lane: Lane::Backlog,
                priority: Priority::Medium,
                assignee: None,
                branch: None,
            },
        )?;

        tx.execute(
            "UPDATE ideas SET status = ?1, converted_ticket_id = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                IdeaStatus::Converted.as_str(),
                ticket.id,
                fmt_time(Utc::now()),
                id,
            ],
        )?;

        tx.commit()?;
        Ok(ticket)
    }

    // --- Agents ---

    /// Record the latest observed state of an agent machine.
    pub fn upsert_agent(
        &self,
        name: &str,
        status: &str,
        current_task: Option<&str>,
    ) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO agents (name, status, current_task, last_update) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET status=excluded.status,
             current_task=excluded.current_task, last_update=excluded.last_update",
            params![name, status, current_task, fmt_time(Utc::now())],
        )?;
        Ok(())
    }

    pub fn agents(&self) -> Result<Vec<AgentStatus>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT name, status, current_task, last_update FROM agents ORDER BY name ASC",
        )?;
        let agents = stmt
            .query_map([], |row| {
                let last_update: String = row.get(3)?;
                Ok(AgentStatus {
                    name: row.get(0)?,
                    status: row.get(1)?,
                    current_task: row.get(2)?,
                    last_update: parse_db_time(&last_update).unwrap_or_else(Utc::now),
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(agents)
    }
}

fn alert_from_row(row: &rusqlite::Row<'_>) -> SqlResult<AlertEvent> {
    let created_at: String = row.get(5)?;
    Ok(AlertEvent {
        id: row.get(0)?,
        target_id: row.get(1)?,
        target_name: row.get(2)?,
        status: row.get(3)?,
        message: row.get(4)?,
        created_at: parse_db_time(&created_at).unwrap_or_else(Utc::now),
    })
}

fn ticket_from_row(row: &rusqlite::Row<'_>) -> SqlResult<Ticket> {
    let lane: String = row.get(3)?;
    let priority: String = row.get(4)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(Ticket {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        lane: Lane::parse(&lane).unwrap_or(Lane::Backlog),
        priority: Priority::parse(&priority).unwrap_or(Priority::Medium),
        assignee: row.get(5)?,
        branch: row.get(6)?,
        created_at: parse_db_time(&created_at).unwrap_or_else(Utc::now),
        updated_at: parse_db_time(&updated_at).unwrap_or_else(Utc::now),
    })
}

fn idea_from_row(row: &rusqlite::Row<'_>) -> SqlResult<Idea> {
    let status: String = row.get(3)?;
    let tags: Option<String> = row.get(4)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(Idea {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        status: IdeaStatus::parse(&status).unwrap_or(IdeaStatus::Proposed),
        tags: deserialize_tags(tags.as_deref()),
        submitted_by: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        converted_ticket_id: row.get(6)?,
        created_at: parse_db_time(&created_at).unwrap_or_else(Utc::now),
        updated_at: parse_db_time(&updated_at).unwrap_or_else(Utc::now),
    })
}

/// Next sequential human-readable id for a table (`TASK-007` style): one
/// query for the max existing suffix, no counter table.
fn next_prefixed_id(conn: &Connection, table: &str, prefix: &str) -> Result<String, DbError> {
    // prefix + '-' is skipped; SQLite SUBSTR is 1-based.
    let sql = format!(
        "SELECT id FROM {} WHERE id LIKE '{}-%' ORDER BY CAST(SUBSTR(id, {}) AS INTEGER) DESC LIMIT 1",
        table,
        prefix,
        prefix.len() + 2
    );
    let last: Option<String> = conn.query_row(&sql, [], |row| row.get(0)).optional()?;

    let next = last
        .and_then(|id| id[prefix.len() + 1..].parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    Ok(format!("{}-{:03}", prefix, next))
}

fn serialize_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

fn deserialize_tags(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn fmt_time(t: DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [TIME_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];
    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn store() -> (NamedTempFile, Store) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        (tmp, store)
    }

    #[test]
    fn history_record_and_query() {
        let (_tmp, store) = store();
        store.record_check("svc", ServiceStatus::Up, 12).unwrap();
        store.record_check("svc", ServiceStatus::Down, 0).unwrap();

        let entries = store.history("svc", 24).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, ServiceStatus::Up);
        assert_eq!(entries[1].status, ServiceStatus::Down);
        assert!(entries[0].timestamp <= entries[1].timestamp);
    }

    #[test]
    fn history_query_respects_window() {
        let (_tmp, store) = store();
        let old = Utc::now() - ChronoDuration::hours(30);
        store
            .record_check_at("svc", ServiceStatus::Up, 10, old)
            .unwrap();
        store.record_check("svc", ServiceStatus::Up, 10).unwrap();

        assert_eq!(store.history("svc", 24).unwrap().len(), 1);
        assert_eq!(store.history("svc", 48).unwrap().len(), 2);
    }

    #[test]
    fn history_prunes_past_retention_on_record() {
        let (_tmp, store) = store();
        let stale = Utc::now() - ChronoDuration::days(8);
        store
            .record_check_at("svc", ServiceStatus::Up, 10, stale)
            .unwrap();
        // Present until the next append prunes it (8 days is outside any
        // query window, so check via the widest window after a prune).
        store.record_check("svc", ServiceStatus::Down, 0).unwrap();

        let entries = store.history("svc", 168).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ServiceStatus::Down);
    }

    #[test]
    fn history_hours_are_clamped() {
        let (_tmp, store) = store();
        let old = Utc::now() - ChronoDuration::hours(2);
        store
            .record_check_at("svc", ServiceStatus::Up, 10, old)
            .unwrap();

        // hours=0 clamps to 1, excluding the 2h-old entry.
        assert!(store.history("svc", 0).unwrap().is_empty());
        // hours=9999 clamps to 168, including it.
        assert_eq!(store.history("svc", 9999).unwrap().len(), 1);
    }

    #[test]
    fn last_status_follows_appends() {
        let (_tmp, store) = store();
        assert_eq!(store.last_status("svc").unwrap(), None);
        store.record_check("svc", ServiceStatus::Up, 5).unwrap();
        store.record_check("svc", ServiceStatus::Down, 0).unwrap();
        assert_eq!(store.last_status("svc").unwrap(), Some(ServiceStatus::Down));
    }

    #[test]
    fn alerts_most_recent_first_and_pruned() {
        let (_tmp, store) = store();
        let old = Utc::now() - ChronoDuration::days(10);
        store
            .record_alert_at("a", "A", ServiceStatus::Down, "old", old)
            .unwrap();
        store
            .record_alert("a", "A", ServiceStatus::Down, "first")
            .unwrap();
        store
            .record_alert("b", "B", ServiceStatus::Down, "second")
            .unwrap();

        let recent = store.recent_alerts(10).unwrap();
        assert_eq!(recent.len(), 3);

        let for_a = store.alerts_for_target("a", 10).unwrap();
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[0].message, "first");

        let removed = store.prune_alerts(7).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.recent_alerts(10).unwrap().len(), 2);
    }

    #[test]
    fn ticket_ids_increment_with_prefix() {
        let (_tmp, store) = store();
        let new = NewTicket {
            title: "First".to_string(),
            description: String::new(),
            lane: Lane::Backlog,
            priority: Priority::Medium,
            assignee: None,
            branch: None,
        };
        let t1 = store.create_ticket(&new).unwrap();
        let t2 = store.create_ticket(&new).unwrap();
        assert_eq!(t1.id, "TASK-001");
        assert_eq!(t2.id, "TASK-002");
    }

    #[test]
    fn ticket_update_and_delete() {
        let (_tmp, store) = store();
        let ticket = store
            .create_ticket(&NewTicket {
                title: "Fix the thing".to_string(),
                description: String::new(),
                lane: Lane::Backlog,
                priority: Priority::Medium,
                assignee: None,
                branch: None,
            })
            .unwrap();

        let updated = store
            .update_ticket(
                &ticket.id,
                &TicketUpdate {
                    lane: Some(Lane::InProgress),
                    assignee: Some("sam".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.lane, Lane::InProgress);
        assert_eq!(updated.assignee.as_deref(), Some("sam"));
        assert_eq!(updated.title, "Fix the thing");

        assert!(store.delete_ticket(&ticket.id).unwrap());
        assert!(!store.delete_ticket(&ticket.id).unwrap());
        assert!(store.get_ticket(&ticket.id).unwrap().is_none());
    }

    #[test]
    fn ticket_list_filters() {
        let (_tmp, store) = store();
        for (title, lane) in [("a", Lane::Backlog), ("b", Lane::Done)] {
            store
                .create_ticket(&NewTicket {
                    title: title.to_string(),
                    description: String::new(),
                    lane,
                    priority: Priority::Low,
                    assignee: None,
                    branch: None,
                })
                .unwrap();
        }
        assert_eq!(store.list_tickets(None, None).unwrap().len(), 2);
        assert_eq!(store.list_tickets(Some("done"), None).unwrap().len(), 1);
        assert!(store
            .list_tickets(Some("review"), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn idea_convert_creates_ticket_once() {
        let (_tmp, store) = store();
        let idea = store
            .create_idea(&NewIdea {
                title: "Dashboard dark mode".to_string(),
                description: "please".to_string(),
                status: IdeaStatus::Proposed,
                tags: vec!["ui".to_string()],
                submitted_by: "sam".to_string(),
            })
            .unwrap();
        assert_eq!(idea.id, "IDEA-001");

        let ticket = store.convert_idea(&idea.id).unwrap();
        assert_eq!(ticket.title, "Dashboard dark mode");
        assert_eq!(ticket.lane, Lane::Backlog);
        assert_eq!(ticket.priority, Priority::Medium);

        let converted = store.get_idea(&idea.id).unwrap().unwrap();
        assert_eq!(converted.status, IdeaStatus::Converted);
        assert_eq!(converted.converted_ticket_id.as_deref(), Some(ticket.id.as_str()));

        // Second conversion is rejected and creates no duplicate.
        assert!(matches!(
            store.convert_idea(&idea.id),
            Err(DbError::Conflict(_))
        ));
        assert_eq!(store.list_tickets(None, None).unwrap().len(), 1);
    }

    #[test]
    fn idea_convert_unknown_is_not_found() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.convert_idea("IDEA-999"),
            Err(DbError::NotFound)
        ));
    }

    #[test]
    fn idea_tags_roundtrip_and_filter() {
        let (_tmp, store) = store();
        store
            .create_idea(&NewIdea {
                title: "Tagged idea".to_string(),
                description: String::new(),
                status: IdeaStatus::Proposed,
                tags: vec!["infra".to_string(), "gpu".to_string()],
                submitted_by: "anonymous".to_string(),
            })
            .unwrap();

        let ideas = store.list_ideas(None, Some("gpu")).unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].tags, vec!["infra", "gpu"]);
        assert!(store.list_ideas(None, Some("web")).unwrap().is_empty());
        assert_eq!(store.list_ideas(Some("proposed"), None).unwrap().len(), 1);
    }

    #[test]
    fn agent_upsert_overwrites() {
        let (_tmp, store) = store();
        store.upsert_agent("eugene", "online", Some("standby")).unwrap();
        store.upsert_agent("eugene", "offline", None).unwrap();

        let agents = store.agents().unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].status, "offline");
        assert_eq!(agents[0].current_task, None);
    }
}

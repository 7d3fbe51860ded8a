//! Per-agent current-state files.
//!
//! Layout:
//!   .cursor/agents/current_state/{agent-id}-current_state.md
//!
//! Exactly one file per agent. The file moves through the task lifecycle
//! (`in_progress`, `paused`, `blocked`, `failed`, `completed`) and, once
//! the task is completed, is overwritten with a short cleared marker rather
//! than deleted. Every mutation is appended to the audit log.

use crate::audit::{self, AuditFilter, AuditLog, AuditRecord};
use crate::clock;
use crate::config::Config;
use crate::document::{Document, Writer};
use crate::error::{AgentError, Result};
use crate::handoff::{self, HandoffFilter};
use crate::io;
use crate::paths;
use crate::request_id::RequestId;
use crate::types::{AuditResult, FileStatus, Operation, TaskStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::path::Path;

// ---------------------------------------------------------------------------
// Field and section names
// ---------------------------------------------------------------------------

pub const FIELD_AGENT_ID: &str = "Agent ID";
pub const FIELD_REQUEST_ID: &str = "Request ID";
pub const FIELD_STATUS: &str = "Status";
pub const FIELD_FILE_STATUS: &str = "File Status";
pub const FIELD_STARTED_AT: &str = "Started At";
pub const FIELD_LAST_UPDATED: &str = "Last Updated";
pub const FIELD_COMPLETED_AT: &str = "Completed At";
pub const FIELD_LAST_REQUEST_ID: &str = "Last Request ID";
pub const FIELD_CLEARED_AT: &str = "Cleared At";

pub const SECTION_CURRENT_TASK: &str = "Current Task";
pub const SECTION_APPROACH: &str = "Approach";
pub const SECTION_COMPLETED_STEPS: &str = "Completed Steps";
pub const SECTION_IN_PROGRESS: &str = "In Progress";
pub const SECTION_REMAINING_STEPS: &str = "Remaining Steps";
pub const SECTION_CONTEXT: &str = "Context";
pub const SECTION_FILES_TOUCHED: &str = "Files Touched";
pub const SECTION_NOTES: &str = "Notes";
pub const SECTION_RESUME_INSTRUCTIONS: &str = "Resume Instructions";

/// Sections every non-cleared file carries, in render order.
pub const REQUIRED_SECTIONS: &[&str] = &[
    SECTION_CURRENT_TASK,
    SECTION_APPROACH,
    SECTION_COMPLETED_STEPS,
    SECTION_IN_PROGRESS,
    SECTION_REMAINING_STEPS,
    SECTION_CONTEXT,
    SECTION_FILES_TOUCHED,
    SECTION_NOTES,
    SECTION_RESUME_INSTRUCTIONS,
];

/// Fields allowed in a cleared file. Anything else is leftover content.
pub const CLEARED_FIELDS: &[&str] = &[
    FIELD_AGENT_ID,
    FIELD_FILE_STATUS,
    FIELD_LAST_REQUEST_ID,
    FIELD_CLEARED_AT,
];

pub const CLEARED_NOTICE: &str = "_No active task. Ready for a new request._";

pub fn title_for(agent_id: &str) -> String {
    format!("{agent_id} Current State")
}

// ---------------------------------------------------------------------------
// CurrentState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentState {
    pub agent_id: String,
    pub request_id: RequestId,
    pub status: TaskStatus,
    pub file_status: FileStatus,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub task: String,
    pub approach: String,
    pub completed_steps: Vec<String>,
    pub in_progress: Vec<String>,
    pub remaining_steps: Vec<String>,
    pub context: String,
    pub files_touched: Vec<String>,
    pub notes: Vec<String>,
    pub resume_instructions: String,
    /// Sections beyond the standard set, preserved verbatim.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_sections: Vec<(String, String)>,
}

impl CurrentState {
    pub fn new(agent_id: impl Into<String>, request_id: RequestId, task: impl Into<String>) -> Self {
        let now = clock::now();
        Self {
            agent_id: agent_id.into(),
            request_id,
            status: TaskStatus::InProgress,
            file_status: FileStatus::Active,
            started_at: now,
            last_updated: now,
            completed_at: None,
            task: task.into(),
            approach: String::new(),
            completed_steps: Vec::new(),
            in_progress: Vec::new(),
            remaining_steps: Vec::new(),
            context: String::new(),
            files_touched: Vec::new(),
            notes: Vec::new(),
            resume_instructions: String::new(),
            extra_sections: Vec::new(),
        }
    }

    pub fn render(&self) -> String {
        let mut w = Writer::new(&title_for(&self.agent_id));
        w.field(FIELD_AGENT_ID, &self.agent_id)
            .field(FIELD_REQUEST_ID, &self.request_id)
            .field(FIELD_STATUS, self.status)
            .field(FIELD_FILE_STATUS, self.file_status)
            .field(FIELD_STARTED_AT, clock::format_ts(&self.started_at))
            .field(FIELD_LAST_UPDATED, clock::format_ts(&self.last_updated));
        if let Some(done) = &self.completed_at {
            w.field(FIELD_COMPLETED_AT, clock::format_ts(done));
        }
        let files: Vec<String> = self.files_touched.iter().map(|f| format!("`{f}`")).collect();
        w.section(SECTION_CURRENT_TASK, &self.task)
            .section(SECTION_APPROACH, &self.approach)
            .list_section(SECTION_COMPLETED_STEPS, &self.completed_steps, Some(true))
            .list_section(SECTION_IN_PROGRESS, &self.in_progress, Some(false))
            .list_section(SECTION_REMAINING_STEPS, &self.remaining_steps, Some(false))
            .section(SECTION_CONTEXT, &self.context)
            .list_section(SECTION_FILES_TOUCHED, &files, None)
            .list_section(SECTION_NOTES, &self.notes, None)
            .section(SECTION_RESUME_INSTRUCTIONS, &self.resume_instructions);
        for (title, body) in &self.extra_sections {
            w.section(title, body);
        }
        w.finish()
    }

    fn from_document(doc: &Document, file_status: FileStatus) -> Result<Self> {
        let agent_id = required(doc, FIELD_AGENT_ID)?.to_string();
        let request_id = RequestId::parse(required(doc, FIELD_REQUEST_ID)?)?;
        let status: TaskStatus = required(doc, FIELD_STATUS)?.parse()?;
        let started_at = timestamp(doc, FIELD_STARTED_AT)?;
        let last_updated = timestamp(doc, FIELD_LAST_UPDATED)?;
        let completed_at = match doc.field_value(FIELD_COMPLETED_AT) {
            Some(_) => Some(timestamp(doc, FIELD_COMPLETED_AT)?),
            None => None,
        };
        let extra_sections = doc
            .sections
            .iter()
            .filter(|s| {
                !REQUIRED_SECTIONS
                    .iter()
                    .any(|r| r.eq_ignore_ascii_case(&s.title))
            })
            .map(|s| (s.title.clone(), s.body.clone()))
            .collect();

        Ok(Self {
            agent_id,
            request_id,
            status,
            file_status,
            started_at,
            last_updated,
            completed_at,
            task: doc.section_text(SECTION_CURRENT_TASK),
            approach: doc.section_text(SECTION_APPROACH),
            completed_steps: doc.section_items(SECTION_COMPLETED_STEPS),
            in_progress: doc.section_items(SECTION_IN_PROGRESS),
            remaining_steps: doc.section_items(SECTION_REMAINING_STEPS),
            context: doc.section_text(SECTION_CONTEXT),
            files_touched: doc.section_items(SECTION_FILES_TOUCHED),
            notes: doc.section_items(SECTION_NOTES),
            resume_instructions: doc.section_text(SECTION_RESUME_INSTRUCTIONS),
            extra_sections,
        })
    }

    fn touch(&mut self) {
        self.last_updated = clock::now();
    }

    fn add_note(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.notes
                .push(format!("{}: {}", clock::format_ts(&clock::now()), text));
        }
    }

    /// Move to `to`, enforcing the lifecycle table.
    fn transition(&mut self, to: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            let reason = match self.status {
                TaskStatus::Completed | TaskStatus::Failed => {
                    format!("task {} is {}; start a new task instead", self.request_id, self.status)
                }
                _ if self.status == to => format!("task is already {to}"),
                _ => format!("{} tasks must be resumed first", self.status),
            };
            return Err(AgentError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
                reason,
            });
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    /// Apply a progress update. The status is unchanged.
    pub fn apply(&mut self, update: &StateUpdate) {
        if let Some(step) = update.completed_step.as_deref() {
            self.in_progress.retain(|s| s != step);
            self.remaining_steps.retain(|s| s != step);
            self.completed_steps.push(step.to_string());
        }
        if let Some(step) = update.in_progress.as_deref() {
            self.remaining_steps.retain(|s| s != step);
            self.in_progress = vec![step.to_string()];
        }
        for step in &update.add_steps {
            if !self.remaining_steps.contains(step) {
                self.remaining_steps.push(step.clone());
            }
        }
        for file in &update.files {
            let file = file.trim().trim_matches('`');
            if !file.is_empty() && !self.files_touched.iter().any(|f| f == file) {
                self.files_touched.push(file.to_string());
            }
        }
        if let Some(context) = &update.context {
            self.context = context.clone();
        }
        if let Some(approach) = &update.approach {
            self.approach = approach.clone();
        }
        if let Some(note) = &update.note {
            self.add_note(note);
        }
        self.touch();
    }
}

// ---------------------------------------------------------------------------
// ClearedState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearedState {
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_request_id: Option<RequestId>,
    pub cleared_at: DateTime<Utc>,
}

impl ClearedState {
    pub fn render(&self) -> String {
        let mut w = Writer::new(&title_for(&self.agent_id));
        w.field(FIELD_AGENT_ID, &self.agent_id)
            .field(FIELD_FILE_STATUS, FileStatus::Cleared);
        if let Some(id) = &self.last_request_id {
            w.field(FIELD_LAST_REQUEST_ID, id);
        }
        w.field(FIELD_CLEARED_AT, clock::format_ts(&self.cleared_at))
            .line(CLEARED_NOTICE);
        w.finish()
    }

    fn from_document(doc: &Document) -> Result<Self> {
        let last_request_id = match doc.field_value(FIELD_LAST_REQUEST_ID) {
            Some(v) => Some(RequestId::parse(v)?),
            None => None,
        };
        Ok(Self {
            agent_id: required(doc, FIELD_AGENT_ID)?.to_string(),
            last_request_id,
            cleared_at: timestamp(doc, FIELD_CLEARED_AT)?,
        })
    }
}

// ---------------------------------------------------------------------------
// StateFile
// ---------------------------------------------------------------------------

/// Parsed contents of a current-state file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "file_status_kind", rename_all = "snake_case")]
pub enum StateFile {
    Task(CurrentState),
    Cleared(ClearedState),
}

impl StateFile {
    pub fn parse(content: &str) -> Result<Self> {
        Self::from_document(&Document::parse(content))
    }

    pub fn from_document(doc: &Document) -> Result<Self> {
        let raw = required(doc, FIELD_FILE_STATUS)?;
        let file_status: FileStatus = raw.parse().map_err(|_| AgentError::InvalidField {
            field: FIELD_FILE_STATUS.to_string(),
            value: raw.to_string(),
        })?;
        match file_status {
            FileStatus::Cleared => Ok(StateFile::Cleared(ClearedState::from_document(doc)?)),
            other => Ok(StateFile::Task(CurrentState::from_document(doc, other)?)),
        }
    }

    pub fn render(&self) -> String {
        match self {
            StateFile::Task(s) => s.render(),
            StateFile::Cleared(c) => c.render(),
        }
    }

    pub fn agent_id(&self) -> &str {
        match self {
            StateFile::Task(s) => &s.agent_id,
            StateFile::Cleared(c) => &c.agent_id,
        }
    }

    /// Current request for a task file, last request for a cleared one.
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            StateFile::Task(s) => Some(&s.request_id),
            StateFile::Cleared(c) => c.last_request_id.as_ref(),
        }
    }

    pub fn file_status(&self) -> FileStatus {
        match self {
            StateFile::Task(s) => s.file_status,
            StateFile::Cleared(_) => FileStatus::Cleared,
        }
    }

    pub fn task_status(&self) -> Option<TaskStatus> {
        match self {
            StateFile::Task(s) => Some(s.status),
            StateFile::Cleared(_) => None,
        }
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        match self {
            StateFile::Task(s) => s.last_updated,
            StateFile::Cleared(c) => c.cleared_at,
        }
    }
}

fn required<'a>(doc: &'a Document, key: &str) -> Result<&'a str> {
    doc.field_value(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AgentError::MissingField(key.to_string()))
}

fn timestamp(doc: &Document, key: &str) -> Result<DateTime<Utc>> {
    let raw = required(doc, key)?;
    clock::parse_utc(raw).ok_or_else(|| AgentError::InvalidField {
        field: key.to_string(),
        value: raw.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub task: String,
    pub approach: Option<String>,
    pub context: Option<String>,
    pub steps: Vec<String>,
    pub files: Vec<String>,
    /// Explicit request ID; generated from the agent's prefix when absent.
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub completed_step: Option<String>,
    pub in_progress: Option<String>,
    pub add_steps: Vec<String>,
    pub files: Vec<String>,
    pub note: Option<String>,
    pub context: Option<String>,
    pub approach: Option<String>,
}

impl StateUpdate {
    pub fn is_empty(&self) -> bool {
        self.completed_step.is_none()
            && self.in_progress.is_none()
            && self.add_steps.is_empty()
            && self.files.is_empty()
            && self.note.is_none()
            && self.context.is_none()
            && self.approach.is_none()
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

pub fn try_load(root: &Path, agent_id: &str) -> Result<Option<StateFile>> {
    paths::validate_agent_id(agent_id)?;
    let path = paths::current_state_path(root, agent_id);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    StateFile::parse(&content).map(Some)
}

pub fn load(root: &Path, agent_id: &str) -> Result<StateFile> {
    try_load(root, agent_id)?.ok_or_else(|| AgentError::AgentNotFound(agent_id.to_string()))
}

/// Load the agent's task record; cleared or missing files are an error.
pub fn load_task(root: &Path, agent_id: &str) -> Result<CurrentState> {
    match load(root, agent_id)? {
        StateFile::Task(s) => Ok(s),
        StateFile::Cleared(_) => Err(AgentError::NoActiveTask(agent_id.to_string())),
    }
}

fn save(root: &Path, agent_id: &str, rendered: &str) -> Result<()> {
    let path = paths::current_state_path(root, agent_id);
    io::atomic_write(&path, rendered.as_bytes())
}

/// All parseable current-state files, sorted by agent ID. Unparseable files
/// are skipped with a warning; `lint` reports them in detail.
pub fn list(root: &Path) -> Result<Vec<StateFile>> {
    let dir = paths::current_state_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if paths::agent_id_from_state_file(&path).is_none() {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        match StateFile::parse(&content) {
            Ok(f) => files.push(f),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping malformed current-state file");
            }
        }
    }
    files.sort_by(|a, b| a.agent_id().cmp(b.agent_id()));
    Ok(files)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Create a new task for `agent_id`.
///
/// Allowed when the agent has no file, a cleared file, or a task that is
/// completed or failed. An open task (in progress, paused, blocked) must be
/// finished first.
pub fn start(root: &Path, config: &Config, agent_id: &str, new: NewTask) -> Result<CurrentState> {
    paths::validate_agent_id(agent_id)?;
    if new.task.trim().is_empty() {
        return Err(AgentError::MissingField(SECTION_CURRENT_TASK.to_string()));
    }
    let existing = try_load(root, agent_id)?;
    if let Some(StateFile::Task(t)) = &existing {
        if t.status.is_open() {
            return Err(AgentError::ActiveTask {
                agent: agent_id.to_string(),
                request_id: t.request_id.to_string(),
                status: t.status.to_string(),
            });
        }
    }

    let prefix = config.prefix_for(agent_id);
    let known = known_request_ids(root, agent_id, existing.as_ref())?;
    let request_id = match new.request_id {
        Some(id) => {
            check_explicit_request_id(agent_id, &prefix, &id, &known)?;
            id
        }
        None => RequestId::next(&prefix, clock::today(), &known)?,
    };

    let mut state = CurrentState::new(agent_id, request_id, new.task.trim());
    state.approach = new.approach.unwrap_or_default();
    state.context = new.context.unwrap_or_default();
    state.apply(&StateUpdate {
        add_steps: new.steps,
        files: new.files,
        ..Default::default()
    });
    state.started_at = state.last_updated;

    save(root, agent_id, &state.render())?;
    audit_transition(root, &state, "start", None, state.status.as_str());
    tracing::debug!(agent = agent_id, request_id = %state.request_id, "started task");
    Ok(state)
}

/// Record progress without changing status.
pub fn update(root: &Path, agent_id: &str, update: &StateUpdate) -> Result<CurrentState> {
    let mut state = load_task(root, agent_id)?;
    if !state.status.is_open() {
        return Err(AgentError::InvalidTransition {
            from: state.status.to_string(),
            to: state.status.to_string(),
            reason: "only open tasks accept updates".to_string(),
        });
    }
    state.apply(update);
    persist(root, state, "update", None)
}

/// Pause an in-progress or blocked task. Resume instructions are mandatory
/// so the next session can pick the work back up.
pub fn pause(root: &Path, agent_id: &str, resume_instructions: &str) -> Result<CurrentState> {
    if resume_instructions.trim().is_empty() {
        return Err(AgentError::MissingField(
            SECTION_RESUME_INSTRUCTIONS.to_string(),
        ));
    }
    let mut state = load_task(root, agent_id)?;
    let from = state.status;
    state.transition(TaskStatus::Paused)?;
    state.resume_instructions = resume_instructions.trim().to_string();
    persist(root, state, "pause", Some(from))
}

/// Resume a paused or blocked task.
pub fn resume(root: &Path, agent_id: &str) -> Result<CurrentState> {
    let mut state = load_task(root, agent_id)?;
    let from = state.status;
    state.transition(TaskStatus::InProgress)?;
    state.add_note(&format!("resumed from {from}"));
    persist(root, state, "resume", Some(from))
}

pub fn block(root: &Path, agent_id: &str, reason: &str) -> Result<CurrentState> {
    let mut state = load_task(root, agent_id)?;
    let from = state.status;
    state.transition(TaskStatus::Blocked)?;
    state.add_note(&format!("blocked: {}", reason.trim()));
    persist(root, state, "block", Some(from))
}

pub fn fail(root: &Path, agent_id: &str, reason: &str) -> Result<CurrentState> {
    let mut state = load_task(root, agent_id)?;
    let from = state.status;
    state.transition(TaskStatus::Failed)?;
    state.add_note(&format!("failed: {}", reason.trim()));
    persist(root, state, "fail", Some(from))
}

pub fn complete(root: &Path, agent_id: &str, summary: Option<&str>) -> Result<CurrentState> {
    let mut state = load_task(root, agent_id)?;
    let from = state.status;
    state.transition(TaskStatus::Completed)?;
    state.in_progress.clear();
    state.file_status = FileStatus::Completed;
    state.completed_at = Some(state.last_updated);
    if let Some(summary) = summary {
        state.add_note(&format!("completed: {}", summary.trim()));
    }
    persist(root, state, "complete", Some(from))
}

/// Replace a completed task with the cleared marker.
pub fn clear(root: &Path, agent_id: &str) -> Result<ClearedState> {
    let state = load_task(root, agent_id)?;
    if state.status != TaskStatus::Completed {
        return Err(AgentError::InvalidTransition {
            from: state.status.to_string(),
            to: FileStatus::Cleared.to_string(),
            reason: "only completed tasks can be cleared".to_string(),
        });
    }
    let cleared = ClearedState {
        agent_id: state.agent_id.clone(),
        last_request_id: Some(state.request_id.clone()),
        cleared_at: clock::now(),
    };
    save(root, agent_id, &cleared.render())?;
    audit_transition(
        root,
        &state,
        "clear",
        Some(TaskStatus::Completed),
        "cleared",
    );
    tracing::debug!(agent = agent_id, request_id = %state.request_id, "cleared current state");
    Ok(cleared)
}

fn persist(
    root: &Path,
    state: CurrentState,
    action: &str,
    from: Option<TaskStatus>,
) -> Result<CurrentState> {
    save(root, &state.agent_id, &state.render())?;
    audit_transition(root, &state, action, from, state.status.as_str());
    tracing::debug!(
        agent = %state.agent_id,
        request_id = %state.request_id,
        action,
        status = %state.status,
        "updated current state"
    );
    Ok(state)
}

fn audit_transition(
    root: &Path,
    state: &CurrentState,
    action: &str,
    from: Option<TaskStatus>,
    to: &str,
) {
    let path = paths::display_relative(root, &paths::current_state_path(root, &state.agent_id));
    let details = json!({
        "action": action,
        "request_id": state.request_id.to_string(),
        "from": from.map(|s| s.as_str()),
        "to": to,
    });
    audit::record(
        root,
        AuditRecord::new(&state.agent_id, Operation::State, path, AuditResult::Success)
            .with_details(details),
    );
}

/// An explicit request ID must carry the agent's prefix and sort after every
/// ID already issued under that prefix on the same date.
fn check_explicit_request_id(
    agent_id: &str,
    prefix: &str,
    id: &RequestId,
    known: &[RequestId],
) -> Result<()> {
    if id.prefix != prefix {
        return Err(AgentError::RequestIdRejected {
            id: id.to_string(),
            reason: format!("agent '{agent_id}' issues request IDs with prefix '{prefix}'"),
        });
    }
    let latest = known
        .iter()
        .filter(|k| k.prefix == id.prefix && k.date == id.date)
        .max();
    if let Some(latest) = latest.filter(|latest| latest.seq >= id.seq) {
        return Err(AgentError::RequestIdRejected {
            id: id.to_string(),
            reason: format!("{latest} was already issued; request IDs must increase"),
        });
    }
    Ok(())
}

/// Request IDs previously issued to this agent: the one in its state file,
/// any recorded in the audit log, and handoff request IDs carrying the
/// agent's prefix.
fn known_request_ids(
    root: &Path,
    agent_id: &str,
    existing: Option<&StateFile>,
) -> Result<Vec<RequestId>> {
    let mut ids: Vec<RequestId> = existing
        .and_then(|f| f.request_id())
        .cloned()
        .into_iter()
        .collect();
    let readout = AuditLog::for_root(root).read(&AuditFilter {
        agent_id: Some(agent_id.to_string()),
        ..Default::default()
    })?;
    ids.extend(
        readout
            .records
            .iter()
            .filter_map(|r| r.request_id())
            .filter_map(|s| RequestId::parse(s).ok()),
    );
    ids.extend(
        handoff::list(root, &HandoffFilter::default())?
            .into_iter()
            .filter_map(|h| h.request_id),
    );
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

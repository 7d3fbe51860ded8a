//! Agent-to-agent handoffs.
//!
//! Layout:
//!   .cursor/agents/handoffs/{handoff-id}.json
//!
//! IDs follow the request-ID shape with the `HO` prefix:
//! `HO-2026-10-18-001`, `HO-2026-10-18-002`, …
//! Accepting a handoff starts the receiving agent's current-state file
//! from the handoff's task, context and files.

use crate::audit::{self, AuditRecord};
use crate::clock;
use crate::config::Config;
use crate::current_state::{self, CurrentState, NewTask};
use crate::error::{AgentError, Result};
use crate::io;
use crate::paths;
use crate::request_id::RequestId;
use crate::types::{AuditResult, Finding, Operation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

pub const HANDOFF_PREFIX: &str = "HO";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Priority {
    type Err = AgentError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(AgentError::InvalidHandoff(format!(
                "unknown priority '{s}': must be low, normal, high, or critical"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl std::fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandoffStatus::Pending => f.write_str("pending"),
            HandoffStatus::Accepted => f.write_str("accepted"),
            HandoffStatus::Rejected => f.write_str("rejected"),
        }
    }
}

impl std::str::FromStr for HandoffStatus {
    type Err = AgentError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(HandoffStatus::Pending),
            "accepted" => Ok(HandoffStatus::Accepted),
            "rejected" => Ok(HandoffStatus::Rejected),
            _ => Err(AgentError::InvalidHandoff(format!(
                "unknown status '{s}': must be pending, accepted, or rejected"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub handoff_id: RequestId,
    pub from_agent: String,
    pub to_agent: String,
    /// The sender's request this work belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: HandoffStatus,
    pub task: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewHandoff {
    pub from_agent: String,
    pub to_agent: String,
    pub task: String,
    pub context: String,
    pub files: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub priority: Priority,
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, Default)]
pub struct HandoffFilter {
    pub to_agent: Option<String>,
    pub from_agent: Option<String>,
    pub status: Option<HandoffStatus>,
}

impl HandoffFilter {
    fn matches(&self, h: &Handoff) -> bool {
        self.to_agent.as_deref().map_or(true, |a| h.to_agent == a)
            && self.from_agent.as_deref().map_or(true, |a| h.from_agent == a)
            && self.status.map_or(true, |s| h.status == s)
    }
}

// ---------------------------------------------------------------------------
// Internal file I/O
// ---------------------------------------------------------------------------

fn save(root: &Path, handoff: &Handoff) -> Result<()> {
    let path = paths::handoff_path(root, &handoff.handoff_id.to_string());
    let data = serde_json::to_string_pretty(handoff)?;
    io::atomic_write(&path, data.as_bytes())
}

/// IDs of every stored handoff file, parseable or not.
fn stored_ids(root: &Path) -> Result<Vec<RequestId>> {
    let dir = paths::handoffs_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| RequestId::parse(s).ok())
        {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn load_all(root: &Path) -> Result<Vec<Handoff>> {
    let dir = paths::handoffs_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut items = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<Handoff>(&content) {
            Ok(h) => items.push(h),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping malformed handoff");
            }
        }
    }
    items.sort_by(|a, b| a.handoff_id.cmp(&b.handoff_id));
    Ok(items)
}

fn audit(root: &Path, agent: &str, handoff: &Handoff, action: &str, result: AuditResult) {
    let path = paths::display_relative(
        root,
        &paths::handoff_path(root, &handoff.handoff_id.to_string()),
    );
    audit::record(
        root,
        AuditRecord::new(agent, Operation::Handoff, path, result).with_details(json!({
            "action": action,
            "handoff_id": handoff.handoff_id.to_string(),
            "from_agent": handoff.from_agent,
            "to_agent": handoff.to_agent,
        })),
    );
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Create a pending handoff from one registered agent to another.
pub fn create(root: &Path, config: &Config, new: NewHandoff) -> Result<Handoff> {
    config.require_agent(&new.from_agent)?;
    config.require_agent(&new.to_agent)?;
    if new.from_agent == new.to_agent {
        return Err(AgentError::InvalidHandoff(
            "an agent cannot hand off to itself".to_string(),
        ));
    }
    if new.task.trim().is_empty() {
        return Err(AgentError::InvalidHandoff("task must not be empty".to_string()));
    }

    let ids = stored_ids(root)?;
    let handoff_id = RequestId::next(HANDOFF_PREFIX, clock::today(), &ids)?;
    if paths::handoff_path(root, &handoff_id.to_string()).exists() {
        return Err(AgentError::InvalidHandoff(format!("{handoff_id} already exists")));
    }
    let handoff = Handoff {
        handoff_id,
        from_agent: new.from_agent,
        to_agent: new.to_agent,
        request_id: new.request_id,
        created_at: clock::now(),
        priority: new.priority,
        status: HandoffStatus::Pending,
        task: new.task.trim().to_string(),
        context: new.context,
        files: new.files,
        acceptance_criteria: new.acceptance_criteria,
        resolved_at: None,
        resolution: None,
    };
    save(root, &handoff)?;
    audit(root, &handoff.from_agent, &handoff, "create", AuditResult::Success);
    tracing::debug!(id = %handoff.handoff_id, to = %handoff.to_agent, "created handoff");
    Ok(handoff)
}

pub fn load(root: &Path, handoff_id: &str) -> Result<Handoff> {
    let path = paths::handoff_path(root, handoff_id);
    if RequestId::parse(handoff_id).is_err() || !path.exists() {
        return Err(AgentError::HandoffNotFound(handoff_id.to_string()));
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Handoffs matching `filter`, highest priority first, then oldest first.
pub fn list(root: &Path, filter: &HandoffFilter) -> Result<Vec<Handoff>> {
    let mut items: Vec<Handoff> = load_all(root)?
        .into_iter()
        .filter(|h| filter.matches(h))
        .collect();
    items.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.handoff_id.cmp(&b.handoff_id))
    });
    Ok(items)
}

/// Accept a pending handoff and start the receiving agent's task from it.
///
/// Fails without changing anything if the receiving agent still has an
/// open task.
pub fn accept(root: &Path, config: &Config, handoff_id: &str) -> Result<(Handoff, CurrentState)> {
    let mut handoff = load(root, handoff_id)?;
    require_pending(&handoff)?;

    let mut context = handoff.context.clone();
    if !handoff.acceptance_criteria.is_empty() {
        if !context.is_empty() {
            context.push_str("\n\n");
        }
        context.push_str("Acceptance criteria:\n");
        for c in &handoff.acceptance_criteria {
            context.push_str(&format!("- {c}\n"));
        }
    }
    context.push_str(&format!(
        "\nHanded off by {} ({}).",
        handoff.from_agent, handoff.handoff_id
    ));

    let state = current_state::start(
        root,
        config,
        &handoff.to_agent,
        NewTask {
            task: handoff.task.clone(),
            context: Some(context.trim().to_string()),
            files: handoff.files.clone(),
            ..Default::default()
        },
    )?;

    handoff.status = HandoffStatus::Accepted;
    handoff.resolved_at = Some(clock::now());
    handoff.resolution = Some(format!("started {}", state.request_id));
    save(root, &handoff)?;
    audit(root, &handoff.to_agent, &handoff, "accept", AuditResult::Success);
    Ok((handoff, state))
}

pub fn reject(root: &Path, handoff_id: &str, reason: &str) -> Result<Handoff> {
    let mut handoff = load(root, handoff_id)?;
    require_pending(&handoff)?;
    if reason.trim().is_empty() {
        return Err(AgentError::InvalidHandoff(
            "a rejection needs a reason".to_string(),
        ));
    }
    handoff.status = HandoffStatus::Rejected;
    handoff.resolved_at = Some(clock::now());
    handoff.resolution = Some(reason.trim().to_string());
    save(root, &handoff)?;
    audit(root, &handoff.to_agent, &handoff, "reject", AuditResult::Success);
    Ok(handoff)
}

fn require_pending(handoff: &Handoff) -> Result<()> {
    if handoff.status != HandoffStatus::Pending {
        return Err(AgentError::InvalidHandoff(format!(
            "{} is already {}",
            handoff.handoff_id, handoff.status
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

const REQUIRED_KEYS: &[&str] = &["handoff_id", "from_agent", "to_agent", "created_at", "task"];

/// Check an arbitrary handoff JSON document (e.g. a shared example) for
/// structural problems. When `config` is given, agents must be registered.
pub fn validate_content(content: &str, config: Option<&Config>) -> Vec<Finding> {
    let value: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => return vec![Finding::error("invalid-json", format!("not valid JSON: {e}"))],
    };
    let Some(obj) = value.as_object() else {
        return vec![Finding::error("not-an-object", "handoff must be a JSON object")];
    };

    let mut findings = Vec::new();
    for key in REQUIRED_KEYS {
        if !obj.contains_key(*key) {
            findings.push(Finding::error("missing-key", format!("missing required key '{key}'")));
        }
    }
    if !findings.is_empty() {
        return findings;
    }

    let handoff: Handoff = match serde_json::from_value(value) {
        Ok(h) => h,
        Err(e) => {
            findings.push(Finding::error("invalid-value", e.to_string()));
            return findings;
        }
    };

    for agent in [&handoff.from_agent, &handoff.to_agent] {
        if paths::validate_agent_id(agent).is_err() {
            findings.push(Finding::error("invalid-agent-id", format!("invalid agent id '{agent}'")));
        } else if let Some(cfg) = config {
            if cfg.agent(agent).is_none() {
                findings.push(Finding::warning(
                    "unknown-agent",
                    format!("agent '{agent}' is not registered"),
                ));
            }
        }
    }
    if handoff.from_agent == handoff.to_agent {
        findings.push(Finding::error("self-handoff", "from_agent and to_agent are the same"));
    }
    if handoff.task.trim().is_empty() {
        findings.push(Finding::error("empty-task", "task must not be empty"));
    }
    if handoff.handoff_id.prefix != HANDOFF_PREFIX {
        findings.push(Finding::warning(
            "handoff-prefix",
            format!("handoff_id should use the '{HANDOFF_PREFIX}' prefix"),
        ));
    }
    if handoff.created_at > clock::now() {
        findings.push(Finding::error("future-timestamp", "created_at is in the future"));
    }
    match (handoff.status, handoff.resolved_at) {
        (HandoffStatus::Pending, Some(_)) => findings.push(Finding::warning(
            "resolved-pending",
            "pending handoff has resolved_at set",
        )),
        (HandoffStatus::Accepted | HandoffStatus::Rejected, None) => findings.push(
            Finding::warning("unresolved", "resolved handoff has no resolved_at"),
        ),
        _ => {}
    }
    findings
}

pub fn validate_file(path: &Path, config: Option<&Config>) -> Result<Vec<Finding>> {
    let content = std::fs::read_to_string(path)?;
    let file = path.display().to_string();
    Ok(validate_content(&content, config)
        .into_iter()
        .map(|f| f.in_file(file.clone()))
        .collect())
}

/// Example used to seed `.cursor/agents/examples/handoffs/standard-handoff.json`.
pub fn standard_example(config: &Config) -> Handoff {
    let from = config
        .agents
        .first()
        .map(|a| a.id.clone())
        .unwrap_or_else(|| "planner-agent".to_string());
    let to = config
        .agents
        .iter()
        .map(|a| a.id.clone())
        .find(|id| *id != from)
        .unwrap_or_else(|| {
            if from == "frontend-agent" { "backend-agent" } else { "frontend-agent" }.to_string()
        });
    let today = clock::today();
    Handoff {
        handoff_id: RequestId {
            prefix: HANDOFF_PREFIX.to_string(),
            date: today,
            seq: 1,
        },
        from_agent: from,
        to_agent: to,
        request_id: None,
        created_at: clock::now(),
        priority: Priority::Normal,
        status: HandoffStatus::Pending,
        task: "Describe the unit of work being handed over".to_string(),
        context: "What the receiving agent needs to know: decisions made, open questions, constraints."
            .to_string(),
        files: vec!["path/to/relevant/file".to_string()],
        acceptance_criteria: vec!["Observable condition that marks the work done".to_string()],
        resolved_at: None,
        resolution: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentDefinition;
    use crate::types::{Level, TaskStatus};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("proj");
        cfg.agents.push(AgentDefinition::new("planner-agent", "PL"));
        cfg.agents.push(AgentDefinition::new("backend-agent", "BE"));
        cfg.save(dir.path()).unwrap();
        (dir, cfg)
    }

    fn new(priority: Priority) -> NewHandoff {
        NewHandoff {
            from_agent: "planner-agent".to_string(),
            to_agent: "backend-agent".to_string(),
            task: "Implement session endpoints".to_string(),
            context: "Sessions belong to a planner week".to_string(),
            files: vec!["apps/backend/src/sessions.ts".to_string()],
            acceptance_criteria: vec!["POST /sessions returns 201".to_string()],
            priority,
            request_id: None,
        }
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let (dir, cfg) = setup();
        let a = create(dir.path(), &cfg, new(Priority::Normal)).unwrap();
        let b = create(dir.path(), &cfg, new(Priority::Normal)).unwrap();
        assert_eq!(a.handoff_id.prefix, "HO");
        assert_eq!(a.handoff_id.seq, 1);
        assert_eq!(b.handoff_id.seq, 2);
        assert_eq!(load(dir.path(), &b.handoff_id.to_string()).unwrap(), b);
    }

    #[test]
    fn create_never_overwrites_unreadable_handoff() {
        let (dir, cfg) = setup();
        let taken = RequestId::new(HANDOFF_PREFIX, clock::today(), 1).unwrap().to_string();
        let path = paths::handoff_path(dir.path(), &taken);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let h = create(dir.path(), &cfg, new(Priority::Normal)).unwrap();
        assert_eq!(h.handoff_id.seq, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn create_rejects_unknown_and_self_handoffs() {
        let (dir, cfg) = setup();
        let mut n = new(Priority::Normal);
        n.to_agent = "ghost-agent".to_string();
        assert!(matches!(
            create(dir.path(), &cfg, n),
            Err(AgentError::UnknownAgent(_))
        ));
        let mut n = new(Priority::Normal);
        n.to_agent = "planner-agent".to_string();
        assert!(matches!(
            create(dir.path(), &cfg, n),
            Err(AgentError::InvalidHandoff(_))
        ));
    }

    #[test]
    fn list_orders_by_priority() {
        let (dir, cfg) = setup();
        create(dir.path(), &cfg, new(Priority::Low)).unwrap();
        create(dir.path(), &cfg, new(Priority::Critical)).unwrap();
        create(dir.path(), &cfg, new(Priority::Normal)).unwrap();
        let items = list(dir.path(), &HandoffFilter::default()).unwrap();
        let prios: Vec<Priority> = items.iter().map(|h| h.priority).collect();
        assert_eq!(prios, vec![Priority::Critical, Priority::Normal, Priority::Low]);

        let none = list(
            dir.path(),
            &HandoffFilter {
                to_agent: Some("planner-agent".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn accept_starts_receiver_state() {
        let (dir, cfg) = setup();
        let h = create(dir.path(), &cfg, new(Priority::High)).unwrap();
        let (accepted, state) = accept(dir.path(), &cfg, &h.handoff_id.to_string()).unwrap();
        assert_eq!(accepted.status, HandoffStatus::Accepted);
        assert!(accepted.resolved_at.is_some());
        assert_eq!(state.agent_id, "backend-agent");
        assert_eq!(state.status, TaskStatus::InProgress);
        assert_eq!(state.request_id.prefix, "BE");
        assert_eq!(state.files_touched, vec!["apps/backend/src/sessions.ts"]);
        assert!(state.context.contains("POST /sessions returns 201"));

        let again = accept(dir.path(), &cfg, &h.handoff_id.to_string()).unwrap_err();
        assert!(matches!(again, AgentError::InvalidHandoff(_)));
    }

    #[test]
    fn accept_fails_when_receiver_busy() {
        let (dir, cfg) = setup();
        let first = create(dir.path(), &cfg, new(Priority::Normal)).unwrap();
        let second = create(dir.path(), &cfg, new(Priority::Normal)).unwrap();
        accept(dir.path(), &cfg, &first.handoff_id.to_string()).unwrap();
        let err = accept(dir.path(), &cfg, &second.handoff_id.to_string()).unwrap_err();
        assert!(matches!(err, AgentError::ActiveTask { .. }));
        let still = load(dir.path(), &second.handoff_id.to_string()).unwrap();
        assert_eq!(still.status, HandoffStatus::Pending);
    }

    #[test]
    fn reject_requires_reason() {
        let (dir, cfg) = setup();
        let h = create(dir.path(), &cfg, new(Priority::Normal)).unwrap();
        let id = h.handoff_id.to_string();
        assert!(reject(dir.path(), &id, " ").is_err());
        let r = reject(dir.path(), &id, "out of scope").unwrap();
        assert_eq!(r.status, HandoffStatus::Rejected);
        assert_eq!(r.resolution.as_deref(), Some("out of scope"));
    }

    #[test]
    fn validate_content_reports_structure() {
        let findings = validate_content("{", None);
        assert_eq!(findings[0].code, "invalid-json");

        let findings = validate_content(r#"{"from_agent":"a"}"#, None);
        assert!(findings.iter().all(|f| f.code == "missing-key"));
        assert_eq!(findings.len(), 4);

        let (_dir, cfg) = setup();
        let example = serde_json::to_string(&standard_example(&cfg)).unwrap();
        let findings = validate_content(&example, Some(&cfg));
        assert!(findings.iter().all(|f| f.level != Level::Error), "{findings:?}");
    }

    #[test]
    fn validate_content_flags_unknown_agents() {
        let (_dir, cfg) = setup();
        let mut h = standard_example(&cfg);
        h.to_agent = "frontend-agent".to_string();
        let findings = validate_content(&serde_json::to_string(&h).unwrap(), Some(&cfg));
        assert!(findings.iter().any(|f| f.code == "unknown-agent"));
    }
}

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Paused,
    Completed,
    Blocked,
    Failed,
}

impl TaskStatus {
    pub fn all() -> &'static [TaskStatus] {
        &[
            TaskStatus::InProgress,
            TaskStatus::Paused,
            TaskStatus::Completed,
            TaskStatus::Blocked,
            TaskStatus::Failed,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Paused => "paused",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Failed => "failed",
        }
    }

    /// Work on the task can still continue (possibly after a resume).
    pub fn is_open(self) -> bool {
        matches!(
            self,
            TaskStatus::InProgress | TaskStatus::Paused | TaskStatus::Blocked
        )
    }

    /// Whether the lifecycle permits moving from `self` to `to`.
    ///
    /// `in_progress -> in_progress` is not a transition; periodic updates
    /// keep the status unchanged.
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, to),
            (InProgress, Paused | Blocked | Failed | Completed)
                | (Paused, InProgress | Blocked | Failed)
                | (Blocked, InProgress | Paused | Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(TaskStatus::InProgress),
            "paused" => Ok(TaskStatus::Paused),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(AgentError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// FileStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    Active,
    Completed,
    Cleared,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Active => "Active",
            FileStatus::Completed => "Completed",
            FileStatus::Cleared => "Cleared",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileStatus {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(FileStatus::Active),
            "Completed" => Ok(FileStatus::Completed),
            "Cleared" => Ok(FileStatus::Cleared),
            _ => Err(AgentError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Kind of operation an agent performs, as recorded in the audit log and
/// checked by the operation validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
    Create,
    Delete,
    Execute,
    State,
    Handoff,
}

impl Operation {
    /// Operations that touch project files and are subject to path policy.
    pub fn file_operations() -> &'static [Operation] {
        &[
            Operation::Read,
            Operation::Write,
            Operation::Create,
            Operation::Delete,
            Operation::Execute,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Execute => "execute",
            Operation::State => "state",
            Operation::Handoff => "handoff",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Operation::Read),
            "write" | "edit" => Ok(Operation::Write),
            "create" => Ok(Operation::Create),
            "delete" => Ok(Operation::Delete),
            "execute" | "exec" => Ok(Operation::Execute),
            "state" => Ok(Operation::State),
            "handoff" => Ok(Operation::Handoff),
            _ => Err(AgentError::InvalidStatus(format!(
                "unknown operation '{s}': must be read, write, create, delete, execute, state, or handoff"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// AuditResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Allowed,
    Denied,
    Success,
    Failure,
}

impl AuditResult {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditResult::Allowed => "allowed",
            AuditResult::Denied => "denied",
            AuditResult::Success => "success",
            AuditResult::Failure => "failure",
        }
    }
}

impl fmt::Display for AuditResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditResult {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allowed" => Ok(AuditResult::Allowed),
            "denied" => Ok(AuditResult::Denied),
            "success" => Ok(AuditResult::Success),
            "failure" => Ok(AuditResult::Failure),
            _ => Err(AgentError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single diagnostic produced by a validator or linter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub level: Level,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Finding {
    pub fn new(level: Level, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
            message: message.into(),
            file: None,
            line: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Error, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Info, code, message)
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.level == Level::Error)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn task_status_parse() {
        for status in TaskStatus::all() {
            assert_eq!(TaskStatus::from_str(status.as_str()).unwrap(), *status);
        }
        assert!(TaskStatus::from_str("done").is_err());
        assert!(TaskStatus::from_str("In Progress").is_err());
    }

    #[test]
    fn lifecycle_transitions() {
        use TaskStatus::*;
        assert!(InProgress.can_transition_to(Paused));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Paused.can_transition_to(InProgress));
        assert!(Blocked.can_transition_to(InProgress));
        assert!(!Paused.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Failed.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(InProgress));
    }

    #[test]
    fn open_statuses() {
        assert!(TaskStatus::InProgress.is_open());
        assert!(TaskStatus::Blocked.is_open());
        assert!(!TaskStatus::Completed.is_open());
        assert!(!TaskStatus::Failed.is_open());
    }

    #[test]
    fn file_status_is_case_sensitive() {
        assert_eq!(FileStatus::from_str("Cleared").unwrap(), FileStatus::Cleared);
        assert!(FileStatus::from_str("cleared").is_err());
    }

    #[test]
    fn operation_aliases() {
        assert_eq!(Operation::from_str("edit").unwrap(), Operation::Write);
        assert_eq!(Operation::from_str("exec").unwrap(), Operation::Execute);
        assert!(Operation::from_str("chmod").is_err());
    }

    #[test]
    fn audit_result_serializes_snake_case() {
        let json = serde_json::to_string(&AuditResult::Denied).unwrap();
        assert_eq!(json, "\"denied\"");
    }

    #[test]
    fn findings_error_detection() {
        let findings = vec![Finding::warning("w", "meh")];
        assert!(!has_errors(&findings));
        let findings = vec![Finding::warning("w", "meh"), Finding::error("e", "bad")];
        assert!(has_errors(&findings));
    }
}

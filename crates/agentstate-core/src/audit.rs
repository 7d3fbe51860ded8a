//! Append-only JSONL audit log at `.cursor/logs/agent_operations.log`.
//!
//! One record per line:
//! `{"timestamp":…,"agent_id":…,"operation":…,"file_path":…,"result":…,"details":{…}}`

use crate::clock;
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::types::{AuditResult, Operation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// AuditRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub operation: Operation,
    #[serde(default)]
    pub file_path: String,
    pub result: AuditResult,
    #[serde(default = "empty_details")]
    pub details: Value,
}

fn empty_details() -> Value {
    Value::Object(serde_json::Map::new())
}

impl AuditRecord {
    pub fn new(
        agent_id: impl Into<String>,
        operation: Operation,
        file_path: impl Into<String>,
        result: AuditResult,
    ) -> Self {
        Self {
            timestamp: clock::now(),
            agent_id: agent_id.into(),
            operation,
            file_path: file_path.into(),
            result,
            details: empty_details(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// `details.request_id`, when the record carries one.
    pub fn request_id(&self) -> Option<&str> {
        self.details.get("request_id").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub agent_id: Option<String>,
    pub operation: Option<Operation>,
    pub result: Option<AuditResult>,
    pub since: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.agent_id
            .as_deref()
            .map_or(true, |a| record.agent_id == a)
            && self.operation.map_or(true, |o| record.operation == o)
            && self.result.map_or(true, |r| record.result == r)
            && self.since.map_or(true, |s| record.timestamp >= s)
    }
}

// ---------------------------------------------------------------------------
// AuditLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

/// Records read back from the log, plus how many lines could not be parsed.
#[derive(Debug, Default)]
pub struct AuditReadout {
    pub records: Vec<AuditRecord>,
    pub malformed_lines: usize,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_root(root: &Path) -> Self {
        Self::new(paths::audit_log_path(root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &AuditRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        io::append_line(&self.path, &line)
    }

    pub fn read(&self, filter: &AuditFilter) -> Result<AuditReadout> {
        let mut out = AuditReadout::default();
        if !self.path.exists() {
            return Ok(out);
        }
        let content = std::fs::read_to_string(&self.path)?;
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditRecord>(line) {
                Ok(record) => {
                    if filter.matches(&record) {
                        out.records.push(record);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        error = %e,
                        "skipping malformed audit record"
                    );
                    out.malformed_lines += 1;
                }
            }
        }
        Ok(out)
    }
}

/// Append a record to the project's audit log. Failures are logged, not
/// propagated: an unwritable log must not abort the operation being audited.
pub fn record(root: &Path, record: AuditRecord) {
    let log = AuditLog::for_root(root);
    if let Err(e) = log.append(&record) {
        tracing::warn!(
            path = %log.path().display(),
            error = %e,
            "audit log write failed"
        );
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub by_agent: BTreeMap<String, usize>,
    pub by_operation: BTreeMap<String, usize>,
    pub by_result: BTreeMap<String, usize>,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

pub fn summarize(records: &[AuditRecord]) -> AuditSummary {
    let mut summary = AuditSummary {
        total: records.len(),
        ..Default::default()
    };
    for r in records {
        *summary.by_agent.entry(r.agent_id.clone()).or_default() += 1;
        *summary
            .by_operation
            .entry(r.operation.to_string())
            .or_default() += 1;
        *summary.by_result.entry(r.result.to_string()).or_default() += 1;
        summary.first = Some(summary.first.map_or(r.timestamp, |f| f.min(r.timestamp)));
        summary.last = Some(summary.last.map_or(r.timestamp, |l| l.max(r.timestamp)));
    }
    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn append_writes_one_json_object_per_line() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::for_root(dir.path());
        log.append(&AuditRecord::new(
            "backend-agent",
            Operation::Write,
            "apps/backend/src/feed.ts",
            AuditResult::Allowed,
        ))
        .unwrap();
        log.append(
            &AuditRecord::new("qa-agent", Operation::State, "", AuditResult::Success)
                .with_details(json!({ "action": "start", "request_id": "QA-2026-10-18-001" })),
        )
        .unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        for key in ["timestamp", "agent_id", "operation", "file_path", "result", "details"] {
            assert!(first.get(key).is_some(), "missing {key}");
        }
        assert_eq!(first["operation"], "write");
        assert_eq!(first["result"], "allowed");
    }

    #[test]
    fn read_filters_and_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::for_root(dir.path());
        log.append(&AuditRecord::new("a", Operation::Read, "x", AuditResult::Allowed))
            .unwrap();
        io::append_line(log.path(), "not json").unwrap();
        log.append(&AuditRecord::new("b", Operation::Delete, "y", AuditResult::Denied))
            .unwrap();

        let all = log.read(&AuditFilter::default()).unwrap();
        assert_eq!(all.records.len(), 2);
        assert_eq!(all.malformed_lines, 1);

        let denied = log
            .read(&AuditFilter {
                result: Some(AuditResult::Denied),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(denied.records.len(), 1);
        assert_eq!(denied.records[0].agent_id, "b");
    }

    #[test]
    fn missing_details_default_to_empty_object() {
        let line = r#"{"timestamp":"2026-10-18T09:00:00Z","agent_id":"a","operation":"read","result":"allowed"}"#;
        let rec: AuditRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.details, json!({}));
        assert_eq!(rec.file_path, "");
        assert!(rec.request_id().is_none());
    }

    #[test]
    fn read_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let out = AuditLog::for_root(dir.path())
            .read(&AuditFilter::default())
            .unwrap();
        assert!(out.records.is_empty());
    }

    #[test]
    fn summary_counts() {
        let records = vec![
            AuditRecord::new("a", Operation::Read, "x", AuditResult::Allowed),
            AuditRecord::new("a", Operation::Write, "x", AuditResult::Denied),
            AuditRecord::new("b", Operation::Write, "y", AuditResult::Allowed),
        ];
        let s = summarize(&records);
        assert_eq!(s.total, 3);
        assert_eq!(s.by_agent["a"], 2);
        assert_eq!(s.by_operation["write"], 2);
        assert_eq!(s.by_result["allowed"], 2);
        assert!(s.first.is_some() && s.last.is_some());
    }
}

//! Content checks for current-state files and agent prompt files.

use crate::clock;
use crate::config::{compile_patterns, Config};
use crate::current_state::{
    CLEARED_FIELDS, CLEARED_NOTICE, FIELD_AGENT_ID, FIELD_CLEARED_AT, FIELD_COMPLETED_AT,
    FIELD_FILE_STATUS, FIELD_LAST_REQUEST_ID, FIELD_LAST_UPDATED, FIELD_REQUEST_ID,
    FIELD_STARTED_AT, FIELD_STATUS, REQUIRED_SECTIONS,
};
use crate::document::Document;
use crate::error::Result;
use crate::paths;
use crate::request_id::RequestId;
use crate::types::{FileStatus, Finding, TaskStatus};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Default, Serialize)]
pub struct LintReport {
    pub files_checked: usize,
    pub findings: Vec<Finding>,
}

static REFERENCE_RE: OnceLock<Regex> = OnceLock::new();

fn reference_re() -> &'static Regex {
    REFERENCE_RE.get_or_init(|| Regex::new(r"`(\.cursor/[^`\s]+)`").unwrap())
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Lint every current-state file and agent prompt file under `root`.
pub fn lint_all(root: &Path, config: &Config) -> Result<LintReport> {
    let mut targets: Vec<PathBuf> = Vec::new();
    let state_dir = paths::current_state_dir(root);
    if state_dir.exists() {
        for entry in std::fs::read_dir(&state_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("md") {
                targets.push(path);
            }
        }
    }
    let agents_dir = paths::agents_dir(root);
    if agents_dir.exists() {
        for entry in std::fs::read_dir(&agents_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("md") {
                targets.push(path);
            }
        }
    }
    targets.sort();
    lint_paths(root, config, &targets)
}

/// Lint specific files. Files named `*-current_state.md` or living in the
/// current-state directory get the full state checks; anything else only
/// gets reference and placeholder checks.
pub fn lint_paths(root: &Path, config: &Config, targets: &[PathBuf]) -> Result<LintReport> {
    let mut report = LintReport::default();
    let (placeholders, bad_patterns) =
        compile_patterns("lint.placeholder_patterns", &config.lint.placeholder_patterns);
    report.findings.extend(bad_patterns);
    for path in targets {
        let content = std::fs::read_to_string(path)?;
        let rel = paths::display_relative(root, path);
        let is_state_file = paths::agent_id_from_state_file(path).is_some()
            || path.parent() == Some(paths::current_state_dir(root).as_path());
        let mut findings = if is_state_file {
            lint_state_content(path, &content, config, clock::now())
        } else {
            Vec::new()
        };
        findings.extend(find_placeholders(&content, &placeholders));
        findings.extend(lint_references(root, &content));
        report
            .findings
            .extend(findings.into_iter().map(|f| f.in_file(rel.clone())));
        report.files_checked += 1;
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Current-state checks
// ---------------------------------------------------------------------------

/// Structural checks for one current-state file. `now` bounds timestamps.
pub fn lint_state_content(
    path: &Path,
    content: &str,
    config: &Config,
    now: DateTime<Utc>,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    let doc = Document::parse(content);
    // No upper bound when the configured skew is out of chrono's range.
    let latest = Duration::try_minutes(config.lint.max_future_skew_minutes)
        .and_then(|skew| now.checked_add_signed(skew));

    let file_agent = paths::agent_id_from_state_file(path);
    if file_agent.is_none() {
        findings.push(Finding::error(
            "file-name",
            "current-state files must be named {agent-id}-current_state.md",
        ));
    }
    match doc.field(FIELD_AGENT_ID) {
        None => findings.push(missing(FIELD_AGENT_ID)),
        Some(f) => {
            if let Some(expected) = file_agent {
                if f.value != expected {
                    findings.push(
                        Finding::error(
                            "agent-mismatch",
                            format!("Agent ID '{}' does not match file name '{expected}'", f.value),
                        )
                        .at_line(f.line),
                    );
                }
            }
        }
    }

    let file_status = match doc.field(FIELD_FILE_STATUS) {
        None => {
            findings.push(missing(FIELD_FILE_STATUS));
            None
        }
        Some(f) => match f.value.parse::<FileStatus>() {
            Ok(s) => Some(s),
            Err(_) => {
                findings.push(
                    Finding::error(
                        "invalid-file-status",
                        format!(
                            "File Status '{}' must be one of Active, Completed, Cleared",
                            f.value
                        ),
                    )
                    .at_line(f.line),
                );
                None
            }
        },
    };

    if file_status == Some(FileStatus::Cleared) {
        lint_cleared(&doc, latest, &mut findings);
    } else {
        lint_task(&doc, file_status, latest, &mut findings);
    }
    findings
}

fn lint_task(
    doc: &Document,
    file_status: Option<FileStatus>,
    latest: Option<DateTime<Utc>>,
    findings: &mut Vec<Finding>,
) {
    let status = match doc.field(FIELD_STATUS) {
        None => {
            findings.push(missing(FIELD_STATUS));
            None
        }
        Some(f) => match f.value.parse::<TaskStatus>() {
            Ok(s) => Some(s),
            Err(_) => {
                let allowed: Vec<&str> = TaskStatus::all().iter().map(|s| s.as_str()).collect();
                findings.push(
                    Finding::error(
                        "invalid-status",
                        format!("Status '{}' must be one of {}", f.value, allowed.join(", ")),
                    )
                    .at_line(f.line),
                );
                None
            }
        },
    };

    let started = check_timestamp(doc, FIELD_STARTED_AT, true, latest, findings);
    let updated = check_timestamp(doc, FIELD_LAST_UPDATED, true, latest, findings);
    let completed = check_timestamp(doc, FIELD_COMPLETED_AT, false, latest, findings);
    if let (Some(s), Some(u)) = (started, updated) {
        if s > u {
            findings.push(Finding::error(
                "timestamp-order",
                "Started At is later than Last Updated",
            ));
        }
    }

    match doc.field(FIELD_REQUEST_ID) {
        None => findings.push(missing(FIELD_REQUEST_ID)),
        Some(f) => match RequestId::parse(&f.value) {
            Err(_) => findings.push(
                Finding::error(
                    "invalid-request-id",
                    format!("Request ID '{}' must match PREFIX-YYYY-MM-DD-NNN", f.value),
                )
                .at_line(f.line),
            ),
            Ok(id) => {
                if let Some(u) = updated {
                    if id.date > u.date_naive() {
                        findings.push(
                            Finding::error(
                                "request-date",
                                format!("Request ID date {} is after Last Updated", id.date),
                            )
                            .at_line(f.line),
                        );
                    }
                }
            }
        },
    }

    for section in REQUIRED_SECTIONS {
        if doc.section(section).is_none() {
            findings.push(Finding::error(
                "missing-section",
                format!("missing required section '## {section}'"),
            ));
        }
    }

    match (status, file_status, completed) {
        (Some(TaskStatus::Completed), Some(FileStatus::Active), _) => findings.push(
            Finding::warning("status-mismatch", "task is completed but File Status is Active"),
        ),
        (Some(s), Some(FileStatus::Completed), _) if s != TaskStatus::Completed => {
            findings.push(Finding::error(
                "status-mismatch",
                format!("File Status is Completed but task status is {s}"),
            ))
        }
        (Some(TaskStatus::Completed), _, None) => findings.push(Finding::warning(
            "missing-completed-at",
            "completed task has no Completed At",
        )),
        _ => {}
    }

    for (line, text) in &doc.loose_lines {
        findings.push(
            Finding::warning("stray-content", format!("unexpected header content: {text}"))
                .at_line(*line),
        );
    }
}

fn lint_cleared(doc: &Document, latest: Option<DateTime<Utc>>, findings: &mut Vec<Finding>) {
    for field in &doc.fields {
        if !CLEARED_FIELDS.iter().any(|k| k.eq_ignore_ascii_case(&field.key)) {
            findings.push(
                Finding::error(
                    "cleared-leftover",
                    format!("cleared file still carries field '{}'", field.key),
                )
                .at_line(field.line),
            );
        }
    }
    for section in &doc.sections {
        findings.push(
            Finding::error(
                "cleared-leftover",
                format!("cleared file still carries section '## {}'", section.title),
            )
            .at_line(section.line),
        );
    }
    for (line, text) in &doc.loose_lines {
        if text != CLEARED_NOTICE {
            findings.push(
                Finding::error("cleared-leftover", format!("unexpected content: {text}"))
                    .at_line(*line),
            );
        }
    }
    check_timestamp(doc, FIELD_CLEARED_AT, true, latest, findings);
    if let Some(f) = doc.field(FIELD_LAST_REQUEST_ID) {
        if RequestId::parse(&f.value).is_err() {
            findings.push(
                Finding::error(
                    "invalid-request-id",
                    format!("Last Request ID '{}' must match PREFIX-YYYY-MM-DD-NNN", f.value),
                )
                .at_line(f.line),
            );
        }
    }
}

fn check_timestamp(
    doc: &Document,
    key: &str,
    required: bool,
    latest: Option<DateTime<Utc>>,
    findings: &mut Vec<Finding>,
) -> Option<DateTime<Utc>> {
    let Some(field) = doc.field(key) else {
        if required {
            findings.push(missing(key));
        }
        return None;
    };
    let Some(ts) = clock::parse_utc(&field.value) else {
        findings.push(
            Finding::error(
                "invalid-timestamp",
                format!("{key} '{}' is not an ISO-8601 UTC timestamp", field.value),
            )
            .at_line(field.line),
        );
        return None;
    };
    if latest.is_some_and(|latest| ts > latest) {
        findings.push(
            Finding::error("future-timestamp", format!("{key} {} is in the future", field.value))
                .at_line(field.line),
        );
    }
    Some(ts)
}

fn missing(key: &str) -> Finding {
    Finding::error("missing-field", format!("missing required field '**{key}**'"))
}

// ---------------------------------------------------------------------------
// Content-wide checks
// ---------------------------------------------------------------------------

/// Placeholder or template dates left in the text. Configured patterns that
/// do not compile are reported as errors.
pub fn lint_placeholders(content: &str, config: &Config) -> Vec<Finding> {
    let (patterns, mut findings) =
        compile_patterns("lint.placeholder_patterns", &config.lint.placeholder_patterns);
    findings.extend(find_placeholders(content, &patterns));
    findings
}

fn find_placeholders(content: &str, patterns: &[Regex]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if let Some(m) = patterns.iter().find_map(|re| re.find(line)) {
            findings.push(
                Finding::warning(
                    "hardcoded-date",
                    format!("hardcoded date found: '{}'", m.as_str()),
                )
                .at_line(idx + 1),
            );
        }
    }
    findings
}

/// Backticked `.cursor/...` references that do not exist on disk.
pub fn lint_references(root: &Path, content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        for caps in reference_re().captures_iter(line) {
            let reference = caps[1].trim_end_matches(['.', ',', ':', ')']);
            if !root.join(reference).exists() {
                findings.push(
                    Finding::error(
                        "missing-reference",
                        format!("referenced path {reference} does not exist"),
                    )
                    .at_line(idx + 1),
                );
            }
        }
    }
    findings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentDefinition;
    use crate::current_state::{self, NewTask};
    use crate::types::{has_errors, Level};
    use tempfile::TempDir;

    fn codes(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.code.as_str()).collect()
    }

    fn state_path() -> PathBuf {
        PathBuf::from("backend-agent-current_state.md")
    }

    fn now() -> DateTime<Utc> {
        clock::parse_utc("2026-10-18T12:00:00Z").unwrap()
    }

    const VALID: &str = "\
# backend-agent Current State

**Agent ID**: backend-agent
**Request ID**: BE-2026-10-18-001
**Status**: in_progress
**File Status**: Active
**Started At**: 2026-10-18T09:00:00Z
**Last Updated**: 2026-10-18T09:30:00Z

## Current Task
Build feed
## Approach
_None_
## Completed Steps
_None_
## In Progress
_None_
## Remaining Steps
_None_
## Context
_None_
## Files Touched
_None_
## Notes
_None_
## Resume Instructions
_None_
";

    #[test]
    fn valid_file_is_clean() {
        let f = lint_state_content(&state_path(), VALID, &Config::new("p"), now());
        assert!(f.is_empty(), "{f:?}");
    }

    #[test]
    fn status_outside_enum_is_error() {
        let content = VALID.replace("**Status**: in_progress", "**Status**: done");
        let f = lint_state_content(&state_path(), &content, &Config::new("p"), now());
        assert_eq!(codes(&f), vec!["invalid-status"]);
        assert_eq!(f[0].line, Some(5));
    }

    #[test]
    fn non_utc_and_future_timestamps() {
        let content = VALID
            .replace("2026-10-18T09:00:00Z", "2026-10-18T09:00:00+02:00")
            .replace("2026-10-18T09:30:00Z", "2026-10-19T09:30:00Z");
        let f = lint_state_content(&state_path(), &content, &Config::new("p"), now());
        let c = codes(&f);
        assert!(c.contains(&"invalid-timestamp"));
        assert!(c.contains(&"future-timestamp"));
    }

    #[test]
    fn request_id_dated_after_last_update() {
        let content = VALID.replace("BE-2026-10-18-001", "BE-2026-10-19-001");
        let f = lint_state_content(&state_path(), &content, &Config::new("p"), now());
        assert_eq!(codes(&f), vec!["request-date"]);
        assert_eq!(f[0].line, Some(4));
    }

    #[test]
    fn started_after_last_update() {
        let content = VALID.replace("2026-10-18T09:00:00Z", "2026-10-18T10:00:00Z");
        let f = lint_state_content(&state_path(), &content, &Config::new("p"), now());
        assert_eq!(codes(&f), vec!["timestamp-order"]);
    }

    #[test]
    fn unknown_file_status() {
        let content = VALID.replace("**File Status**: Active", "**File Status**: Archived");
        let f = lint_state_content(&state_path(), &content, &Config::new("p"), now());
        assert_eq!(codes(&f), vec!["invalid-file-status"]);
        assert_eq!(f[0].line, Some(6));
    }

    #[test]
    fn out_of_range_skew_disables_future_check() {
        let mut cfg = Config::new("p");
        cfg.lint.max_future_skew_minutes = 1_000_000_000_000;
        let content = VALID.replace("2026-10-18T09:30:00Z", "2099-01-01T00:00:00Z");
        let f = lint_state_content(&state_path(), &content, &cfg, now());
        assert!(f.is_empty(), "{f:?}");
    }

    #[test]
    fn bad_request_id_and_missing_section() {
        let content = VALID
            .replace("BE-2026-10-18-001", "BE-YYYY-MM-DD-001")
            .replace("## Notes\n_None_\n", "");
        let f = lint_state_content(&state_path(), &content, &Config::new("p"), now());
        let c = codes(&f);
        assert!(c.contains(&"invalid-request-id"));
        assert!(c.contains(&"missing-section"));
    }

    #[test]
    fn agent_id_must_match_file_name() {
        let f = lint_state_content(
            Path::new("frontend-agent-current_state.md"),
            VALID,
            &Config::new("p"),
            now(),
        );
        assert_eq!(codes(&f), vec!["agent-mismatch"]);
    }

    #[test]
    fn cleared_file_with_leftovers() {
        let content = "\
# backend-agent Current State

**Agent ID**: backend-agent
**File Status**: Cleared
**Last Request ID**: BE-2026-10-18-001
**Cleared At**: 2026-10-18T10:00:00Z
**Status**: completed

_No active task. Ready for a new request._

## Notes
- forgot to erase
";
        let f = lint_state_content(&state_path(), content, &Config::new("p"), now());
        assert_eq!(codes(&f), vec!["cleared-leftover", "cleared-leftover"]);
    }

    #[test]
    fn generated_files_lint_clean() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("p");
        cfg.agents.push(AgentDefinition::new("backend-agent", "BE"));
        current_state::start(
            dir.path(),
            &cfg,
            "backend-agent",
            NewTask {
                task: "Build feed".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        let report = lint_all(dir.path(), &cfg).unwrap();
        assert_eq!(report.files_checked, 1);
        assert!(report.findings.is_empty(), "{:?}", report.findings);

        current_state::complete(dir.path(), "backend-agent", None).unwrap();
        current_state::clear(dir.path(), "backend-agent").unwrap();
        let report = lint_all(dir.path(), &cfg).unwrap();
        assert!(report.findings.is_empty(), "{:?}", report.findings);
    }

    #[test]
    fn placeholders_are_warnings() {
        let f = lint_placeholders(
            "Started: YYYY-MM-DD\nDue {{date}}\nok line\nAt 2024-01-01T00:00:00Z\n",
            &Config::new("p"),
        );
        assert_eq!(f.len(), 3);
        assert!(f.iter().all(|x| x.level == Level::Warning));
        assert_eq!(f[0].message, "hardcoded date found: 'YYYY-MM-DD'");
        assert_eq!(f.iter().map(|x| x.line.unwrap()).collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn invalid_placeholder_pattern_is_reported() {
        let mut cfg = Config::new("p");
        cfg.lint.placeholder_patterns = vec!["(YYYY".to_string(), "YYYY-MM-DD".to_string()];
        let f = lint_placeholders("Started: YYYY-MM-DD\n", &cfg);
        assert_eq!(codes(&f), vec!["invalid-regex", "hardcoded-date"]);
        assert!(has_errors(&f));

        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        std::fs::write(&a, "fine\n").unwrap();
        std::fs::write(&b, "fine\n").unwrap();
        let report = lint_paths(dir.path(), &cfg, &[a, b]).unwrap();
        assert_eq!(codes(&report.findings), vec!["invalid-regex"]);
        assert_eq!(report.findings[0].file.as_deref(), Some(paths::CONFIG_FILE));
    }

    #[test]
    fn references_must_exist() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join(paths::STANDARD_HANDOFF_EXAMPLE);
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, "{}").unwrap();
        let content = "See `.cursor/agents/examples/handoffs/standard-handoff.json`.\n\
                       Also `.cursor/agents/examples/handoffs/urgent-handoff.json`.\n";
        let f = lint_references(dir.path(), content);
        assert_eq!(f.len(), 1);
        assert!(has_errors(&f));
        assert!(f[0].message.contains("urgent-handoff.json"));
        assert_eq!(f[0].line, Some(2));
    }
}

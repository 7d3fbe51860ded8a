//! Cursor `.mdc` rule files.
//!
//! A rule file is YAML frontmatter between `---` lines followed by a
//! markdown body:
//!
//! ```text
//! ---
//! description: Backend conventions
//! globs: apps/backend/**/*.ts, apps/backend/**/*.sql
//! alwaysApply: false
//! ---
//! Use the repository pattern for all data access.
//! ```
//!
//! `globs` may be a comma-separated string or a YAML list. Unquoted globs
//! such as `**/*.ts` are not valid YAML, so frontmatter that fails to parse
//! falls back to plain `key: value` lines.

use crate::error::{AgentError, Result};
use crate::paths;
use crate::types::Finding;
use globset::{Glob, GlobSetBuilder};
use serde::Serialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const KEY_DESCRIPTION: &str = "description";
const KEY_GLOBS: &str = "globs";
const KEY_ALWAYS_APPLY: &str = "alwaysApply";
const KEY_TAGS: &str = "tags";
const KNOWN_KEYS: &[&str] = &[KEY_DESCRIPTION, KEY_GLOBS, KEY_ALWAYS_APPLY, KEY_TAGS];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub globs: Vec<String>,
    pub always_apply: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_keys: Vec<String>,
    pub body: String,
    /// Line where the body starts (1-based).
    #[serde(skip)]
    pub body_line: usize,
}

impl RuleFile {
    /// Does this rule attach to `file` (root-relative, `/` separators)?
    pub fn applies_to(&self, file: &str) -> bool {
        if self.always_apply {
            return true;
        }
        self.globs
            .iter()
            .filter_map(|g| Glob::new(g).ok())
            .any(|g| g.compile_matcher().is_match(file))
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split frontmatter from body and interpret the known keys.
pub fn parse(content: &str) -> std::result::Result<RuleFile, String> {
    let mut lines = content.lines();
    if lines.next().map(str::trim_end) != Some("---") {
        return Err("missing frontmatter (file must start with '---')".to_string());
    }
    let mut front = Vec::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        front.push(line);
    }
    if !closed {
        return Err("frontmatter is not closed with '---'".to_string());
    }
    let body_line = front.len() + 3;
    let body: String = lines.collect::<Vec<_>>().join("\n");

    let entries = parse_frontmatter(&front.join("\n"))?;
    let mut rule = RuleFile {
        body: body.trim().to_string(),
        body_line,
        ..Default::default()
    };
    for (key, value) in entries {
        match key.as_str() {
            KEY_DESCRIPTION => {
                rule.description = scalar(&value).filter(|s| !s.trim().is_empty());
            }
            KEY_GLOBS => rule.globs = list_value(&value),
            KEY_ALWAYS_APPLY => {
                rule.always_apply = match &value {
                    Value::Bool(b) => *b,
                    other => scalar(other).is_some_and(|s| s.eq_ignore_ascii_case("true")),
                };
            }
            KEY_TAGS => rule.tags = list_value(&value),
            _ => rule.unknown_keys.push(key),
        }
    }
    Ok(rule)
}

fn parse_frontmatter(text: &str) -> std::result::Result<Vec<(String, Value)>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Mapping(map)) => Ok(map
            .into_iter()
            .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v)))
            .collect()),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(_) => Err("frontmatter is not a key/value mapping".to_string()),
        Err(e) => {
            tracing::debug!(error = %e, "frontmatter is not strict YAML, reading plain lines");
            plain_frontmatter(text)
        }
    }
}

fn plain_frontmatter(text: &str) -> std::result::Result<Vec<(String, Value)>, String> {
    let mut entries = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let Some((key, value)) = line.split_once(':') else {
            return Err(format!("cannot read frontmatter line '{}'", line.trim()));
        };
        entries.push((
            key.trim().to_string(),
            Value::String(value.trim().to_string()),
        ));
    }
    Ok(entries)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn list_value(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar).collect(),
        other => scalar(other)
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().trim_matches(['"', '\'']).to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Discovery and loading
// ---------------------------------------------------------------------------

/// Every `*.mdc` file under `.cursor/rules`, sorted.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    let dir = paths::rules_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(&dir).follow_links(false) {
        let entry = entry.map_err(|e| AgentError::Io(e.into()))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(paths::RULE_FILE_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

pub fn load(root: &Path, path: &Path) -> Result<RuleFile> {
    let content = std::fs::read_to_string(path)?;
    parse(&content).map_err(|reason| AgentError::InvalidRuleFile {
        path: paths::display_relative(root, path),
        reason,
    })
}

/// Rules that attach to `file`, with their paths. Unparseable rules are
/// skipped with a warning.
pub fn matching(root: &Path, file: &str) -> Result<Vec<(String, RuleFile)>> {
    let mut out = Vec::new();
    for path in discover(root)? {
        match load(root, &path) {
            Ok(rule) if rule.applies_to(file) => {
                out.push((paths::display_relative(root, &path), rule))
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "skipping rule file"),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Lint
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
pub struct RulesReport {
    pub files_checked: usize,
    pub findings: Vec<Finding>,
}

/// Lint the content of one rule file. Findings carry no file name.
pub fn lint_content(content: &str) -> Vec<Finding> {
    let rule = match parse(content) {
        Ok(rule) => rule,
        Err(reason) => return vec![Finding::error("invalid-frontmatter", reason).at_line(1)],
    };
    let mut findings = Vec::new();

    if rule.description.is_none() {
        findings.push(Finding::error(
            "missing-description",
            "frontmatter needs a non-empty 'description'",
        ));
    }
    let mut builder = GlobSetBuilder::new();
    for glob in &rule.globs {
        match Glob::new(glob) {
            Ok(g) => {
                builder.add(g);
            }
            Err(e) => findings.push(Finding::error(
                "invalid-glob",
                format!("glob '{glob}' does not compile: {e}"),
            )),
        }
    }
    if rule.always_apply && !rule.globs.is_empty() {
        findings.push(Finding::warning(
            "globs-ignored",
            "alwaysApply is true, so globs are ignored",
        ));
    }
    if !rule.always_apply && rule.globs.is_empty() {
        findings.push(Finding::warning(
            "never-attached",
            "no globs and alwaysApply is false; the rule never attaches automatically",
        ));
    }
    if rule.body.is_empty() {
        findings.push(Finding::warning("empty-body", "rule body is empty").at_line(rule.body_line));
    }
    for key in &rule.unknown_keys {
        findings.push(Finding::warning(
            "unknown-key",
            format!(
                "unknown frontmatter key '{key}' (expected one of {})",
                KNOWN_KEYS.join(", ")
            ),
        ));
    }
    findings
}

pub fn lint_paths(root: &Path, targets: &[PathBuf]) -> Result<RulesReport> {
    let mut report = RulesReport::default();
    for path in targets {
        let content = std::fs::read_to_string(path)?;
        let rel = paths::display_relative(root, path);
        report
            .findings
            .extend(lint_content(&content).into_iter().map(|f| f.in_file(rel.clone())));
        report.files_checked += 1;
    }
    Ok(report)
}

pub fn lint_all(root: &Path) -> Result<RulesReport> {
    lint_paths(root, &discover(root)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

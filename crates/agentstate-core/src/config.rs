use crate::clock;
use crate::error::{AgentError, Result};
use crate::paths;
use crate::types::{Finding, Operation};
use globset::Glob;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// AgentDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    /// Request-ID prefix, e.g. `BE` for `BE-2026-10-18-001`.
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    #[serde(default)]
    pub forbidden_paths: Vec<String>,
    #[serde(default = "default_operations")]
    pub operations: Vec<Operation>,
}

fn default_operations() -> Vec<Operation> {
    Operation::file_operations().to_vec()
}

impl AgentDefinition {
    pub fn new(id: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prefix: prefix.into(),
            description: None,
            allowed_paths: Vec::new(),
            forbidden_paths: Vec::new(),
            operations: default_operations(),
        }
    }
}

// ---------------------------------------------------------------------------
// SecurityConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Globs no agent may touch, regardless of its own allow-list.
    #[serde(default = "default_forbidden_paths")]
    pub forbidden_paths: Vec<String>,
    /// Regexes that must never match an agent prompt file.
    #[serde(default = "default_secret_patterns")]
    pub secret_patterns: Vec<String>,
    /// `## Heading` sections every agent prompt file must contain.
    #[serde(default = "default_required_sections")]
    pub required_sections: Vec<String>,
}

fn default_forbidden_paths() -> Vec<String> {
    vec![
        ".env".to_string(),
        ".env.*".to_string(),
        "**/*.pem".to_string(),
        "**/*.key".to_string(),
        "**/secrets/**".to_string(),
        ".git/**".to_string(),
    ]
}

fn default_secret_patterns() -> Vec<String> {
    vec![
        r#"(?i)\b(api[_-]?key|secret|password|token)\b\s*[:=]\s*['"]?[A-Za-z0-9_\-/+]{12,}"#.to_string(),
        r"-----BEGIN [A-Z ]*PRIVATE KEY-----".to_string(),
        r"\bAKIA[0-9A-Z]{16}\b".to_string(),
        r"\bgh[pousr]_[A-Za-z0-9]{36,}\b".to_string(),
    ]
}

fn default_required_sections() -> Vec<String> {
    vec!["Responsibilities".to_string(), "Security".to_string()]
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            forbidden_paths: default_forbidden_paths(),
            secret_patterns: default_secret_patterns(),
            required_sections: default_required_sections(),
        }
    }
}

// ---------------------------------------------------------------------------
// LintConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    /// Regexes for placeholder or template dates left in content.
    #[serde(default = "default_placeholder_patterns")]
    pub placeholder_patterns: Vec<String>,
    /// How far in the future a timestamp may be before it is flagged.
    #[serde(default = "default_max_future_skew")]
    pub max_future_skew_minutes: i64,
}

fn default_placeholder_patterns() -> Vec<String> {
    vec![
        r"YYYY-MM-DD".to_string(),
        r"\{\{[^}]*\}\}".to_string(),
        r"\[(DATE|TIMESTAMP|CURRENT_DATE)\]".to_string(),
        r"\b\d{4}-\d{2}-\d{2}T00:00:00(\.0+)?Z\b".to_string(),
    ]
}

fn default_max_future_skew() -> i64 {
    5
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            placeholder_patterns: default_placeholder_patterns(),
            max_future_skew_minutes: default_max_future_skew(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub agents: Vec<AgentDefinition>,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub lint: LintConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
            },
            agents: Vec::new(),
            security: SecurityConfig::default(),
            lint: LintConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(AgentError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn agent(&self, id: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn require_agent(&self, id: &str) -> Result<&AgentDefinition> {
        self.agent(id)
            .ok_or_else(|| AgentError::UnknownAgent(id.to_string()))
    }

    /// Prefix used for this agent's request IDs. Unregistered agents fall
    /// back to the initials of their hyphenated ID (`backend-agent` -> `BA`).
    pub fn prefix_for(&self, agent_id: &str) -> String {
        if let Some(agent) = self.agent(agent_id) {
            return agent.prefix.clone();
        }
        let initials: String = agent_id
            .split('-')
            .filter_map(|part| part.chars().next())
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match initials.chars().next() {
            Some(c) if c.is_ascii_alphabetic() => initials,
            _ => format!("A{initials}"),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        let file = paths::CONFIG_FILE;

        let mut seen_ids = HashSet::new();
        let mut seen_prefixes = HashSet::new();
        for agent in &self.agents {
            if paths::validate_agent_id(&agent.id).is_err() {
                findings.push(
                    Finding::error(
                        "invalid-agent-id",
                        format!("agent id '{}' must be lowercase alphanumeric with hyphens", agent.id),
                    )
                    .in_file(file),
                );
            }
            if !seen_ids.insert(agent.id.as_str()) {
                findings.push(
                    Finding::error("duplicate-agent", format!("agent '{}' is defined twice", agent.id))
                        .in_file(file),
                );
            }
            if !paths::is_valid_prefix(&agent.prefix) {
                findings.push(
                    Finding::error(
                        "invalid-prefix",
                        format!(
                            "agent '{}' has prefix '{}': must be uppercase alphanumeric starting with a letter",
                            agent.id, agent.prefix
                        ),
                    )
                    .in_file(file),
                );
            }
            if !seen_prefixes.insert(agent.prefix.as_str()) {
                findings.push(
                    Finding::error(
                        "duplicate-prefix",
                        format!("prefix '{}' is used by more than one agent", agent.prefix),
                    )
                    .in_file(file),
                );
            }
            if agent.allowed_paths.is_empty() {
                findings.push(
                    Finding::warning(
                        "no-allowed-paths",
                        format!("agent '{}' has no allowed_paths: every file operation will be denied", agent.id),
                    )
                    .in_file(file),
                );
            }
            for pattern in agent.allowed_paths.iter().chain(&agent.forbidden_paths) {
                if let Err(e) = Glob::new(pattern) {
                    findings.push(
                        Finding::error(
                            "invalid-glob",
                            format!("agent '{}' has invalid glob '{}': {e}", agent.id, pattern),
                        )
                        .in_file(file),
                    );
                }
            }
        }

        for pattern in &self.security.forbidden_paths {
            if let Err(e) = Glob::new(pattern) {
                findings.push(
                    Finding::error(
                        "invalid-glob",
                        format!("security.forbidden_paths has invalid glob '{pattern}': {e}"),
                    )
                    .in_file(file),
                );
            }
        }

        let (_, bad_secrets) =
            compile_patterns("security.secret_patterns", &self.security.secret_patterns);
        let (_, bad_placeholders) =
            compile_patterns("lint.placeholder_patterns", &self.lint.placeholder_patterns);
        findings.extend(bad_secrets);
        findings.extend(bad_placeholders);

        if self.lint.max_future_skew_minutes < 0 {
            findings.push(
                Finding::warning(
                    "negative-skew",
                    "lint.max_future_skew_minutes is negative; every fresh timestamp will be flagged",
                )
                .in_file(file),
            );
        }
        let skew_in_range = chrono::Duration::try_minutes(self.lint.max_future_skew_minutes)
            .and_then(|skew| clock::now().checked_add_signed(skew))
            .is_some();
        if !skew_in_range {
            findings.push(
                Finding::error(
                    "skew-out-of-range",
                    format!(
                        "lint.max_future_skew_minutes {} is out of range; future timestamps will not be checked",
                        self.lint.max_future_skew_minutes
                    ),
                )
                .in_file(file),
            );
        }

        findings
    }
}

/// Compile the patterns configured under `key`. Each pattern that does not
/// compile yields an `invalid-regex` error, so callers that scan with the
/// compiled set can fail closed.
pub(crate) fn compile_patterns(key: &str, patterns: &[String]) -> (Vec<Regex>, Vec<Finding>) {
    let mut compiled = Vec::new();
    let mut findings = Vec::new();
    for pattern in patterns {
        match Regex::new(pattern) {
            Ok(re) => compiled.push(re),
            Err(e) => findings.push(
                Finding::error("invalid-regex", format!("{key} has invalid regex '{pattern}': {e}"))
                    .in_file(paths::CONFIG_FILE),
            ),
        }
    }
    (compiled, findings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;
    use tempfile::TempDir;

    fn backend() -> AgentDefinition {
        let mut a = AgentDefinition::new("backend-agent", "BE");
        a.allowed_paths = vec!["apps/backend/**".to_string()];
        a
    }

    #[test]
    fn minimal_yaml_gets_defaults() {
        let yaml = "project:\n  name: fitness\nagents:\n  - id: backend-agent\n    prefix: BE\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.agents[0].operations, Operation::file_operations());
        assert!(cfg.security.forbidden_paths.contains(&".env".to_string()));
        assert_eq!(cfg.lint.max_future_skew_minutes, 5);
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("proj");
        cfg.agents.push(backend());
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.agents, cfg.agents);
    }

    #[test]
    fn load_without_config_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(AgentError::NotInitialized)
        ));
    }

    #[test]
    fn default_config_is_clean() {
        let mut cfg = Config::new("proj");
        cfg.agents.push(backend());
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    }

    #[test]
    fn validate_flags_duplicates_and_bad_patterns() {
        let mut cfg = Config::new("proj");
        cfg.agents.push(backend());
        let mut dup = backend();
        dup.allowed_paths = vec!["apps/[".to_string()];
        cfg.agents.push(dup);
        cfg.security.secret_patterns.push("(unclosed".to_string());

        let codes: Vec<String> = cfg.validate().into_iter().map(|f| f.code).collect();
        assert!(codes.contains(&"duplicate-agent".to_string()));
        assert!(codes.contains(&"duplicate-prefix".to_string()));
        assert!(codes.contains(&"invalid-glob".to_string()));
        assert!(codes.contains(&"invalid-regex".to_string()));
    }

    #[test]
    fn agent_without_paths_is_a_warning() {
        let mut cfg = Config::new("proj");
        cfg.agents.push(AgentDefinition::new("docs-agent", "DOC"));
        let findings = cfg.validate();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, Level::Warning);
        assert_eq!(findings[0].code, "no-allowed-paths");
    }

    #[test]
    fn prefix_fallback_uses_initials() {
        let mut cfg = Config::new("proj");
        cfg.agents.push(backend());
        assert_eq!(cfg.prefix_for("backend-agent"), "BE");
        assert_eq!(cfg.prefix_for("planner-agent"), "PA");
        assert_eq!(cfg.prefix_for("qa"), "Q");
        assert_eq!(cfg.prefix_for("2d-agent"), "A2A");
    }

    #[test]
    fn huge_skew_is_out_of_range() {
        let mut cfg = Config::new("proj");
        cfg.agents.push(backend());
        cfg.lint.max_future_skew_minutes = 1_000_000_000_000;
        let findings = cfg.validate();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, "skew-out-of-range");
        assert_eq!(findings[0].level, Level::Error);
    }

    #[test]
    fn compile_patterns_reports_each_bad_pattern() {
        let patterns = vec![
            "sk-[A-Za-z0-9]{20,}".to_string(),
            "(unclosed".to_string(),
            "[z-a]".to_string(),
        ];
        let (compiled, findings) = compile_patterns("security.secret_patterns", &patterns);
        assert_eq!(compiled.len(), 1);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.code == "invalid-regex" && f.level == Level::Error));
        assert!(findings[0].message.contains("(unclosed"));
    }
}

//! Operation validator: may agent X perform operation Y on file Z?
//!
//! Decision order:
//!   1. unknown agent                         -> denied
//!   2. path escapes the project root         -> denied
//!   3. path matches a forbidden glob         -> denied (global, then agent)
//!   4. operation not granted to the agent    -> denied
//!   5. path not matched by an allowed glob   -> denied
//!   6. otherwise                             -> allowed

use crate::config::{AgentDefinition, Config};
use crate::current_state::{self, StateFile};
use crate::error::Result;
use crate::types::Operation;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::path::{Component, Path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub agent_id: String,
    pub operation: Operation,
    pub file_path: String,
    pub allowed: bool,
    pub reason: String,
}

fn build_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if !pattern.trim().is_empty() {
            builder.add(Glob::new(pattern.trim())?);
        }
    }
    Ok(builder.build()?)
}

/// Compiled path rules for one agent.
#[derive(Debug)]
pub struct AgentPolicy {
    agent: AgentDefinition,
    global_forbidden: GlobSet,
    forbidden: GlobSet,
    allowed: GlobSet,
}

impl AgentPolicy {
    pub fn new(config: &Config, agent: &AgentDefinition) -> Result<Self> {
        Ok(Self {
            agent: agent.clone(),
            global_forbidden: build_set(&config.security.forbidden_paths)?,
            forbidden: build_set(&agent.forbidden_paths)?,
            allowed: build_set(&agent.allowed_paths)?,
        })
    }

    pub fn check(&self, operation: Operation, file: &str) -> Decision {
        let decide = |allowed: bool, reason: String| Decision {
            agent_id: self.agent.id.clone(),
            operation,
            file_path: file.to_string(),
            allowed,
            reason,
        };

        let Some(normalized) = normalize(file) else {
            return decide(false, format!("'{file}' escapes the project root"));
        };
        if self.global_forbidden.is_match(&normalized) {
            return decide(false, format!("'{normalized}' matches a globally forbidden path"));
        }
        if self.forbidden.is_match(&normalized) {
            return decide(
                false,
                format!("'{normalized}' is forbidden for agent '{}'", self.agent.id),
            );
        }
        if !self.agent.operations.contains(&operation) {
            return decide(
                false,
                format!("agent '{}' may not perform '{operation}'", self.agent.id),
            );
        }
        if !self.allowed.is_match(&normalized) {
            return decide(
                false,
                format!(
                    "'{normalized}' is outside the allowed paths of agent '{}'",
                    self.agent.id
                ),
            );
        }
        decide(true, "allowed".to_string())
    }
}

/// Check a single operation against the configured policy.
pub fn check(config: &Config, agent_id: &str, operation: Operation, file: &str) -> Result<Decision> {
    let Some(agent) = config.agent(agent_id) else {
        return Ok(Decision {
            agent_id: agent_id.to_string(),
            operation,
            file_path: file.to_string(),
            allowed: false,
            reason: format!("agent '{agent_id}' is not registered"),
        });
    };
    Ok(AgentPolicy::new(config, agent)?.check(operation, file))
}

/// Root-relative path with `/` separators and `.` segments removed.
/// Returns `None` for absolute paths and paths that climb above the root.
pub fn normalize(file: &str) -> Option<String> {
    let unified = file.trim().replace('\\', "/");
    let path = Path::new(&unified);
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(p) => parts.push(p.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Check every file listed under "Files Touched" in the current-state files
/// (one agent or all) as a `write`. Returns only the denied decisions.
pub fn scan(root: &Path, config: &Config, agent_id: Option<&str>) -> Result<Vec<Decision>> {
    let files: Vec<StateFile> = match agent_id {
        Some(id) => current_state::try_load(root, id)?.into_iter().collect(),
        None => current_state::list(root)?,
    };
    let mut violations = Vec::new();
    for file in files {
        let StateFile::Task(state) = file else {
            continue;
        };
        for touched in &state.files_touched {
            let decision = check(config, &state.agent_id, Operation::Write, touched)?;
            if !decision.allowed {
                violations.push(decision);
            }
        }
    }
    Ok(violations)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::current_state::{NewTask, StateUpdate};
    use tempfile::TempDir;

    fn config() -> Config {
        let mut cfg = Config::new("proj");
        let mut backend = AgentDefinition::new("backend-agent", "BE");
        backend.allowed_paths = vec!["apps/backend/**".to_string(), "docs/api/*.md".to_string()];
        backend.forbidden_paths = vec!["apps/backend/migrations/**".to_string()];
        cfg.agents.push(backend);
        let mut reviewer = AgentDefinition::new("review-agent", "RV");
        reviewer.allowed_paths = vec!["**".to_string()];
        reviewer.operations = vec![Operation::Read];
        cfg.agents.push(reviewer);
        cfg
    }

    #[test]
    fn allowed_path_passes() {
        let d = check(&config(), "backend-agent", Operation::Write, "apps/backend/src/feed.ts").unwrap();
        assert!(d.allowed, "{}", d.reason);
    }

    #[test]
    fn outside_allowed_paths_denied() {
        let d = check(&config(), "backend-agent", Operation::Write, "apps/frontend/src/App.tsx").unwrap();
        assert!(!d.allowed);
        assert!(d.reason.contains("outside the allowed paths"));
    }

    #[test]
    fn agent_forbidden_beats_allowed() {
        let d = check(
            &config(),
            "backend-agent",
            Operation::Write,
            "apps/backend/migrations/001_init.sql",
        )
        .unwrap();
        assert!(!d.allowed);
        assert!(d.reason.contains("forbidden for agent"));
    }

    #[test]
    fn global_forbidden_applies_to_everyone() {
        let cfg = config();
        for file in [".env", ".env.local", "apps/backend/certs/server.pem", "config/secrets/db.yaml"] {
            let d = check(&cfg, "review-agent", Operation::Read, file).unwrap();
            assert!(!d.allowed, "expected {file} denied");
            assert!(d.reason.contains("globally forbidden"));
        }
    }

    #[test]
    fn operation_not_granted() {
        let d = check(&config(), "review-agent", Operation::Delete, "README.md").unwrap();
        assert!(!d.allowed);
        assert!(d.reason.contains("may not perform 'delete'"));
    }

    #[test]
    fn unknown_agent_denied() {
        let d = check(&config(), "ghost-agent", Operation::Read, "README.md").unwrap();
        assert!(!d.allowed);
    }

    #[test]
    fn traversal_is_normalized_or_denied() {
        let cfg = config();
        let d = check(&cfg, "backend-agent", Operation::Write, "apps/backend/../frontend/x.ts").unwrap();
        assert!(!d.allowed);
        assert_eq!(d.reason, "'apps/frontend/x.ts' is outside the allowed paths of agent 'backend-agent'");
        let d = check(&cfg, "backend-agent", Operation::Write, "../outside.ts").unwrap();
        assert!(d.reason.contains("escapes the project root"));
        let d = check(&cfg, "backend-agent", Operation::Write, "/etc/passwd").unwrap();
        assert!(!d.allowed);
    }

    #[test]
    fn normalize_cases() {
        assert_eq!(normalize("./a/b").as_deref(), Some("a/b"));
        assert_eq!(normalize("a\\b\\c").as_deref(), Some("a/b/c"));
        assert_eq!(normalize("a/../b").as_deref(), Some("b"));
        assert_eq!(normalize(".."), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn scan_reports_touched_files_outside_policy() {
        let dir = TempDir::new().unwrap();
        let cfg = config();
        cfg.save(dir.path()).unwrap();
        current_state::start(
            dir.path(),
            &cfg,
            "backend-agent",
            NewTask {
                task: "Feed".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        current_state::update(
            dir.path(),
            "backend-agent",
            &StateUpdate {
                files: vec![
                    "apps/backend/src/feed.ts".to_string(),
                    "apps/frontend/src/Feed.tsx".to_string(),
                ],
                ..Default::default()
            },
        )
        .unwrap();
        let violations = scan(dir.path(), &cfg, None).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].file_path, "apps/frontend/src/Feed.tsx");
        assert!(scan(dir.path(), &cfg, Some("review-agent")).unwrap().is_empty());
    }
}

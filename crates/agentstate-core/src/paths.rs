use crate::error::{AgentError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CURSOR_DIR: &str = ".cursor";
pub const AGENTS_DIR: &str = ".cursor/agents";
pub const CURRENT_STATE_DIR: &str = ".cursor/agents/current_state";
pub const HANDOFFS_DIR: &str = ".cursor/agents/handoffs";
pub const EXAMPLE_HANDOFFS_DIR: &str = ".cursor/agents/examples/handoffs";
pub const LOGS_DIR: &str = ".cursor/logs";
pub const RULES_DIR: &str = ".cursor/rules";
pub const GIT_HOOKS_DIR: &str = ".git/hooks";

pub const CONFIG_FILE: &str = ".cursor/agents/config.yaml";
pub const AUDIT_LOG_FILE: &str = ".cursor/logs/agent_operations.log";
pub const STANDARD_HANDOFF_EXAMPLE: &str =
    ".cursor/agents/examples/handoffs/standard-handoff.json";

pub const CURRENT_STATE_SUFFIX: &str = "-current_state.md";
pub const RULE_FILE_EXTENSION: &str = "mdc";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn agents_dir(root: &Path) -> PathBuf {
    root.join(AGENTS_DIR)
}

/// `.cursor/agents/{agent-id}.md`: the agent's prompt/configuration file.
pub fn agent_prompt_path(root: &Path, agent_id: &str) -> PathBuf {
    agents_dir(root).join(format!("{agent_id}.md"))
}

pub fn current_state_dir(root: &Path) -> PathBuf {
    root.join(CURRENT_STATE_DIR)
}

pub fn current_state_path(root: &Path, agent_id: &str) -> PathBuf {
    current_state_dir(root).join(format!("{agent_id}{CURRENT_STATE_SUFFIX}"))
}

/// Extract the agent ID from a `{agent-id}-current_state.md` file name.
pub fn agent_id_from_state_file(path: &Path) -> Option<&str> {
    path.file_name()?
        .to_str()?
        .strip_suffix(CURRENT_STATE_SUFFIX)
        .filter(|s| !s.is_empty())
}

pub fn handoffs_dir(root: &Path) -> PathBuf {
    root.join(HANDOFFS_DIR)
}

pub fn handoff_path(root: &Path, handoff_id: &str) -> PathBuf {
    handoffs_dir(root).join(format!("{handoff_id}.json"))
}

pub fn audit_log_path(root: &Path) -> PathBuf {
    root.join(AUDIT_LOG_FILE)
}

pub fn rules_dir(root: &Path) -> PathBuf {
    root.join(RULES_DIR)
}

pub fn git_hooks_dir(root: &Path) -> PathBuf {
    root.join(GIT_HOOKS_DIR)
}

/// Render `path` relative to `root` with `/` separators, for display and
/// glob matching. Paths outside `root` are returned unchanged.
pub fn display_relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

static AGENT_ID_RE: OnceLock<Regex> = OnceLock::new();
static PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn agent_id_re() -> &'static Regex {
    AGENT_ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

fn prefix_re() -> &'static Regex {
    PREFIX_RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9]*$").unwrap())
}

pub fn validate_agent_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !agent_id_re().is_match(id) {
        return Err(AgentError::InvalidAgentId(id.to_string()));
    }
    Ok(())
}

/// Request-ID prefixes are short uppercase tags such as `BE` or `PLAN`.
pub fn is_valid_prefix(prefix: &str) -> bool {
    prefix.len() <= 10 && prefix_re().is_match(prefix)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_agent_ids() {
        for id in ["backend-agent", "a", "planner-agent-2", "qa"] {
            validate_agent_id(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_agent_ids() {
        for id in ["", "-backend", "backend-", "Backend", "back end", "back_end"] {
            assert!(validate_agent_id(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn prefixes() {
        assert!(is_valid_prefix("BE"));
        assert!(is_valid_prefix("QA2"));
        assert!(!is_valid_prefix("be"));
        assert!(!is_valid_prefix("2BE"));
        assert!(!is_valid_prefix(""));
        assert!(!is_valid_prefix("WAYTOOLONGPREFIX"));
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            current_state_path(root, "backend-agent"),
            PathBuf::from("/tmp/proj/.cursor/agents/current_state/backend-agent-current_state.md")
        );
        assert_eq!(
            audit_log_path(root),
            PathBuf::from("/tmp/proj/.cursor/logs/agent_operations.log")
        );
        assert_eq!(
            handoff_path(root, "HO-2026-10-18-001"),
            PathBuf::from("/tmp/proj/.cursor/agents/handoffs/HO-2026-10-18-001.json")
        );
    }

    #[test]
    fn agent_id_from_file_name() {
        let p = Path::new("/x/backend-agent-current_state.md");
        assert_eq!(agent_id_from_state_file(p), Some("backend-agent"));
        assert_eq!(agent_id_from_state_file(Path::new("-current_state.md")), None);
        assert_eq!(agent_id_from_state_file(Path::new("notes.md")), None);
    }

    #[test]
    fn relative_display_uses_forward_slashes() {
        let root = Path::new("/tmp/proj");
        let p = root.join("apps").join("backend").join("x.ts");
        assert_eq!(display_relative(root, &p), "apps/backend/x.ts");
    }
}

//! Managed git hooks.
//!
//! Each hook carries an `agentstate` block between marker comments. A hook
//! that already exists keeps its own content: the block is appended once and
//! afterwards refreshed in place.

use crate::error::{AgentError, Result};
use crate::io;
use crate::paths;
use serde::Serialize;
use std::fmt;
use std::path::Path;

pub const BLOCK_START: &str = "# >>> agentstate managed block >>>";
pub const BLOCK_END: &str = "# <<< agentstate managed block <<<";

const SHEBANG: &str = "#!/bin/sh";

/// Hook name and the commands its managed block runs.
pub const HOOKS: &[(&str, &[&str])] = &[
    (
        "pre-commit",
        &["agentstate lint", "agentstate security --all"],
    ),
    (
        "pre-push",
        &["agentstate security --all --strict", "agentstate check --scan"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookAction {
    Created,
    Appended,
    Updated,
    Unchanged,
    Removed,
    Deleted,
    NotInstalled,
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookAction::Created => "created",
            HookAction::Appended => "appended",
            HookAction::Updated => "updated",
            HookAction::Unchanged => "unchanged",
            HookAction::Removed => "removed",
            HookAction::Deleted => "deleted",
            HookAction::NotInstalled => "not installed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HookOutcome {
    pub hook: String,
    pub path: String,
    pub action: HookAction,
}

fn managed_block(commands: &[&str]) -> String {
    let mut block = String::new();
    block.push_str(BLOCK_START);
    block.push('\n');
    for cmd in commands {
        block.push_str(cmd);
        block.push_str(" || exit 1\n");
    }
    block.push_str(BLOCK_END);
    block
}

fn hooks_dir(root: &Path) -> Result<std::path::PathBuf> {
    if !root.join(".git").is_dir() {
        return Err(AgentError::GitNotFound(root.join(".git").display().to_string()));
    }
    let dir = paths::git_hooks_dir(root);
    io::ensure_dir(&dir)?;
    Ok(dir)
}

/// Install or refresh every managed hook.
pub fn install(root: &Path) -> Result<Vec<HookOutcome>> {
    let dir = hooks_dir(root)?;
    let mut outcomes = Vec::new();
    for (name, commands) in HOOKS {
        let path = dir.join(name);
        let block = managed_block(commands);
        let action = if !path.exists() {
            io::atomic_write(&path, format!("{SHEBANG}\n{block}\n").as_bytes())?;
            HookAction::Created
        } else {
            let existing = std::fs::read_to_string(&path)?;
            match io::find_marked_block(&existing, BLOCK_START, BLOCK_END) {
                Some(range) if existing[range.clone()] == block => HookAction::Unchanged,
                Some(range) => {
                    let mut updated = existing.clone();
                    updated.replace_range(range, &block);
                    io::atomic_write(&path, updated.as_bytes())?;
                    HookAction::Updated
                }
                None => {
                    let sep = if existing.ends_with('\n') { "" } else { "\n" };
                    let updated = format!("{existing}{sep}\n{block}\n");
                    io::atomic_write(&path, updated.as_bytes())?;
                    HookAction::Appended
                }
            }
        };
        make_executable(&path)?;
        tracing::info!(hook = name, %action, "git hook");
        outcomes.push(HookOutcome {
            hook: name.to_string(),
            path: paths::display_relative(root, &path),
            action,
        });
    }
    Ok(outcomes)
}

/// Remove the managed blocks. A hook left with nothing but a shebang is
/// deleted.
pub fn uninstall(root: &Path) -> Result<Vec<HookOutcome>> {
    let dir = hooks_dir(root)?;
    let mut outcomes = Vec::new();
    for (name, _) in HOOKS {
        let path = dir.join(name);
        let action = if !path.exists() {
            HookAction::NotInstalled
        } else {
            let existing = std::fs::read_to_string(&path)?;
            match io::find_marked_block(&existing, BLOCK_START, BLOCK_END) {
                None => HookAction::NotInstalled,
                Some(range) => {
                    let mut remaining = existing.clone();
                    remaining.replace_range(range, "");
                    let leftover = remaining
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty() && *l != SHEBANG)
                        .count();
                    if leftover == 0 {
                        std::fs::remove_file(&path)?;
                        HookAction::Deleted
                    } else {
                        let cleaned = format!("{}\n", remaining.trim_end());
                        io::atomic_write(&path, cleaned.as_bytes())?;
                        make_executable(&path)?;
                        HookAction::Removed
                    }
                }
            }
        };
        outcomes.push(HookOutcome {
            hook: name.to_string(),
            path: paths::display_relative(root, &path),
            action,
        });
    }
    Ok(outcomes)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        dir
    }

    fn read(dir: &TempDir, hook: &str) -> String {
        std::fs::read_to_string(dir.path().join(".git/hooks").join(hook)).unwrap()
    }

    #[test]
    fn requires_git_dir() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(install(dir.path()), Err(AgentError::GitNotFound(_))));
        assert!(matches!(uninstall(dir.path()), Err(AgentError::GitNotFound(_))));
    }

    #[test]
    fn install_creates_executable_hooks() {
        let dir = git_repo();
        let out = install(dir.path()).unwrap();
        assert!(out.iter().all(|o| o.action == HookAction::Created));
        let pre_commit = read(&dir, "pre-commit");
        assert!(pre_commit.starts_with("#!/bin/sh\n"));
        assert!(pre_commit.contains("agentstate lint || exit 1"));
        assert!(pre_commit.contains("agentstate security --all || exit 1"));
        let pre_push = read(&dir, "pre-push");
        assert!(pre_push.contains("agentstate security --all --strict"));
        assert!(pre_push.contains("agentstate check --scan"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dir.path().join(".git/hooks/pre-commit"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn install_is_idempotent() {
        let dir = git_repo();
        install(dir.path()).unwrap();
        let before = read(&dir, "pre-commit");
        let out = install(dir.path()).unwrap();
        assert!(out.iter().all(|o| o.action == HookAction::Unchanged));
        assert_eq!(read(&dir, "pre-commit"), before);
    }

    #[test]
    fn existing_hook_is_preserved() {
        let dir = git_repo();
        let hook = dir.path().join(".git/hooks/pre-commit");
        std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
        std::fs::write(&hook, "#!/bin/sh\nnpm test\n").unwrap();

        let out = install(dir.path()).unwrap();
        assert_eq!(out[0].action, HookAction::Appended);
        let content = read(&dir, "pre-commit");
        assert!(content.starts_with("#!/bin/sh\nnpm test\n"));
        assert_eq!(content.matches(BLOCK_START).count(), 1);

        let out = uninstall(dir.path()).unwrap();
        assert_eq!(out[0].action, HookAction::Removed);
        assert_eq!(out[1].action, HookAction::Deleted);
        assert_eq!(read(&dir, "pre-commit"), "#!/bin/sh\nnpm test\n");
        assert!(!dir.path().join(".git/hooks/pre-push").exists());
    }

    #[test]
    fn stale_block_is_refreshed() {
        let dir = git_repo();
        let hook = dir.path().join(".git/hooks/pre-commit");
        std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
        std::fs::write(
            &hook,
            format!("#!/bin/sh\n{BLOCK_START}\nagentstate old-command\n{BLOCK_END}\necho done\n"),
        )
        .unwrap();
        let out = install(dir.path()).unwrap();
        assert_eq!(out[0].action, HookAction::Updated);
        let content = read(&dir, "pre-commit");
        assert!(!content.contains("old-command"));
        assert!(content.ends_with("echo done\n"));
    }
}

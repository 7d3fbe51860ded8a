//! Project scaffolding for `agentstate init`. Safe to re-run: existing
//! files are never overwritten.

use crate::config::{AgentDefinition, Config};
use crate::error::Result;
use crate::handoff;
use crate::io;
use crate::paths;
use serde::Serialize;
use std::path::Path;

pub const EXAMPLE_AGENT_ID: &str = "backend-agent";
pub const EXAMPLE_AGENT_PREFIX: &str = "BE";
pub const STATE_RULE_FILE: &str = ".cursor/rules/agent-state.mdc";

const LOGS_GITIGNORE_ENTRY: &str = ".cursor/logs/";

#[derive(Debug, Clone, Default, Serialize)]
pub struct InitReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

impl InitReport {
    fn note(&mut self, root: &Path, path: &Path, written: bool) {
        let rel = paths::display_relative(root, path);
        if written {
            self.created.push(rel);
        } else {
            self.existing.push(rel);
        }
    }
}

fn example_agent() -> AgentDefinition {
    let mut agent = AgentDefinition::new(EXAMPLE_AGENT_ID, EXAMPLE_AGENT_PREFIX);
    agent.description = Some("Owns the backend service and its tests".to_string());
    agent.allowed_paths = vec!["apps/backend/**".to_string(), "docs/api/**".to_string()];
    agent.forbidden_paths = vec!["apps/backend/migrations/**".to_string()];
    agent
}

fn example_prompt(agent: &AgentDefinition) -> String {
    let allowed: String = agent
        .allowed_paths
        .iter()
        .map(|p| format!("- `{p}`\n"))
        .collect();
    format!(
        "# {id}\n\n\
         {desc}.\n\n\
         ## Responsibilities\n\
         {allowed}\n\
         ## State\n\
         Keep {id}-current_state.md under `.cursor/agents/current_state/` current\n\
         with `agentstate state` after every step.\n\n\
         ## Handoffs\n\
         Follow the shape of `{example}`.\n\n\
         ## Security\n\
         Never read or write `.env` files, keys or anything under `secrets/`.\n",
        id = agent.id,
        desc = agent.description.as_deref().unwrap_or("Example agent"),
        example = paths::STANDARD_HANDOFF_EXAMPLE,
    )
}

fn state_rule() -> String {
    "---\n\
     description: Keep agent current-state files accurate\n\
     globs: .cursor/agents/**/*.md\n\
     alwaysApply: false\n\
     ---\n\
     Update your current-state file through `agentstate state` after every step.\n\
     Timestamps are written by the tool; never type a date by hand.\n\
     Clear the file once the task is complete.\n"
        .to_string()
}

/// Create the `.cursor` tree. A default config with one example agent is
/// written only when no config exists yet.
pub fn init(root: &Path, project_name: &str) -> Result<InitReport> {
    let mut report = InitReport::default();

    for dir in [
        paths::agents_dir(root),
        paths::current_state_dir(root),
        paths::handoffs_dir(root),
        root.join(paths::EXAMPLE_HANDOFFS_DIR),
        root.join(paths::LOGS_DIR),
        paths::rules_dir(root),
    ] {
        io::ensure_dir(&dir)?;
    }

    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        report.note(root, &config_path, false);
        Config::load(root)?
    } else {
        let mut config = Config::new(project_name);
        config.agents.push(example_agent());
        config.save(root)?;
        report.note(root, &config_path, true);
        config
    };

    for agent in &config.agents {
        let path = paths::agent_prompt_path(root, &agent.id);
        let written = io::write_if_missing(&path, example_prompt(agent).as_bytes())?;
        report.note(root, &path, written);
    }

    let example_path = root.join(paths::STANDARD_HANDOFF_EXAMPLE);
    let example = serde_json::to_string_pretty(&handoff::standard_example(&config))?;
    let written = io::write_if_missing(&example_path, format!("{example}\n").as_bytes())?;
    report.note(root, &example_path, written);

    let rule_path = root.join(STATE_RULE_FILE);
    let written = io::write_if_missing(&rule_path, state_rule().as_bytes())?;
    report.note(root, &rule_path, written);

    io::ensure_gitignore_entry(root, LOGS_GITIGNORE_ENTRY)?;
    tracing::info!(
        root = %root.display(),
        created = report.created.len(),
        "initialized agent state"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{self, SecurityOptions};
    use crate::{lint, rules};
    use tempfile::TempDir;

    #[test]
    fn init_scaffolds_everything() {
        let dir = TempDir::new().unwrap();
        let report = init(dir.path(), "demo").unwrap();
        assert!(report.existing.is_empty());
        assert!(report.created.contains(&paths::CONFIG_FILE.to_string()));
        assert!(dir.path().join(paths::STANDARD_HANDOFF_EXAMPLE).exists());
        assert!(paths::current_state_dir(dir.path()).is_dir());
        assert!(paths::handoffs_dir(dir.path()).is_dir());

        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.project.name, "demo");
        assert_eq!(cfg.agents.len(), 1);

        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(gitignore.lines().any(|l| l == ".cursor/logs/"));
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        init(dir.path(), "demo").unwrap();
        let cfg_before = std::fs::read_to_string(paths::config_path(dir.path())).unwrap();
        let report = init(dir.path(), "other-name").unwrap();
        assert!(report.created.is_empty(), "{:?}", report.created);
        assert_eq!(
            std::fs::read_to_string(paths::config_path(dir.path())).unwrap(),
            cfg_before
        );
        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(gitignore.matches(".cursor/logs/").count(), 1);
    }

    #[test]
    fn scaffold_passes_its_own_checks() {
        let dir = TempDir::new().unwrap();
        init(dir.path(), "demo").unwrap();
        let cfg = Config::load(dir.path()).unwrap();

        let reports = security::validate_all(dir.path(), &cfg, &SecurityOptions::default()).unwrap();
        assert!(reports.iter().all(|r| r.passed), "{reports:?}");

        let report = lint::lint_all(dir.path(), &cfg).unwrap();
        assert!(report.findings.is_empty(), "{:?}", report.findings);

        assert!(rules::lint_all(dir.path()).unwrap().findings.is_empty());

        let example = std::fs::read_to_string(dir.path().join(paths::STANDARD_HANDOFF_EXAMPLE)).unwrap();
        let findings = handoff::validate_content(&example, Some(&cfg));
        assert!(!crate::types::has_errors(&findings), "{findings:?}");
    }
}

use crate::output::{print_findings, print_json, print_table, tally};
use agentstate_core::{config::Config, types::has_errors};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show registered agents and security settings
    Show,
    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        return print_json(&config);
    }

    println!("Project: {}", config.project.name);
    println!();
    if config.agents.is_empty() {
        println!("Agents: (none)");
    } else {
        let rows = config
            .agents
            .iter()
            .map(|a| {
                let ops: Vec<String> = a.operations.iter().map(|o| o.to_string()).collect();
                vec![
                    a.id.clone(),
                    a.prefix.clone(),
                    a.allowed_paths.join(", "),
                    ops.join(","),
                ]
            })
            .collect();
        print_table(&["AGENT", "PREFIX", "ALLOWED PATHS", "OPERATIONS"], rows);
    }
    println!();
    println!("Forbidden paths:   {}", config.security.forbidden_paths.join(", "));
    println!("Required sections: {}", config.security.required_sections.join(", "));
    println!("Secret patterns:   {}", config.security.secret_patterns.len());
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let findings = config.validate();

    if json {
        print_json(&serde_json::json!({ "findings": findings }))?;
    } else if findings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        print_findings(&findings);
        println!("{}", tally(&findings));
    }

    if has_errors(&findings) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

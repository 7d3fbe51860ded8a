use crate::output::{print_findings, print_json, print_table, tally};
use agentstate_core::{paths, rules, types::has_errors};
use clap::Subcommand;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum RulesSubcommand {
    /// Lint .mdc rule files (default: everything under .cursor/rules)
    Lint { paths: Vec<PathBuf> },
    /// List rule files, or only those attaching to a file
    Show {
        /// Root-relative file path to match against rule globs
        #[arg(long)]
        file: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: RulesSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RulesSubcommand::Lint { paths } => lint(root, &paths, json),
        RulesSubcommand::Show { file } => show(root, file.as_deref(), json),
    }
}

fn lint(root: &Path, targets: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let report = if targets.is_empty() {
        rules::lint_all(root)?
    } else {
        rules::lint_paths(root, targets)?
    };
    if json {
        print_json(&report)?;
    } else {
        print_findings(&report.findings);
        println!(
            "{} rule file(s) checked: {}",
            report.files_checked,
            tally(&report.findings)
        );
    }
    if has_errors(&report.findings) {
        anyhow::bail!("rule lint found errors");
    }
    Ok(())
}

#[derive(Serialize)]
struct RuleEntry {
    path: String,
    #[serde(flatten)]
    rule: rules::RuleFile,
}

fn show(root: &Path, file: Option<&str>, json: bool) -> anyhow::Result<()> {
    let entries: Vec<RuleEntry> = match file {
        Some(f) => rules::matching(root, f)?
            .into_iter()
            .map(|(path, rule)| RuleEntry { path, rule })
            .collect(),
        None => {
            let mut out = Vec::new();
            for path in rules::discover(root)? {
                match rules::load(root, &path) {
                    Ok(rule) => out.push(RuleEntry {
                        path: paths::display_relative(root, &path),
                        rule,
                    }),
                    Err(e) => eprintln!("warning: {e}"),
                }
            }
            out
        }
    };

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No rule files.");
        return Ok(());
    }
    let rows = entries
        .iter()
        .map(|e| {
            let attach = if e.rule.always_apply {
                "always".to_string()
            } else if e.rule.globs.is_empty() {
                "manual".to_string()
            } else {
                e.rule.globs.join(", ")
            };
            vec![
                e.path.clone(),
                attach,
                e.rule.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["RULE", "ATTACHES", "DESCRIPTION"], rows);
    Ok(())
}

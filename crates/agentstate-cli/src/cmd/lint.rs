use crate::output::{print_findings, print_json, tally};
use agentstate_core::{config::Config, lint, types::has_errors};
use anyhow::Context;
use std::path::{Path, PathBuf};

pub fn run(root: &Path, targets: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let report = if targets.is_empty() {
        lint::lint_all(root, &config)?
    } else {
        lint::lint_paths(root, &config, targets)?
    };

    if json {
        print_json(&report)?;
    } else {
        print_findings(&report.findings);
        println!(
            "{} file(s) checked: {}",
            report.files_checked,
            tally(&report.findings)
        );
    }
    if has_errors(&report.findings) {
        anyhow::bail!("lint found errors");
    }
    Ok(())
}

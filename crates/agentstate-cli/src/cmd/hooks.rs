use crate::output::print_json;
use agentstate_core::hooks::{self, HookOutcome};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum HooksSubcommand {
    /// Install pre-commit and pre-push hooks that run the agentstate checks
    Install,
    /// Remove the managed blocks from the git hooks
    Uninstall,
}

pub fn run(root: &Path, subcmd: HooksSubcommand, json: bool) -> anyhow::Result<()> {
    let outcomes = match subcmd {
        HooksSubcommand::Install => {
            hooks::install(root).context("failed to install git hooks")?
        }
        HooksSubcommand::Uninstall => {
            hooks::uninstall(root).context("failed to uninstall git hooks")?
        }
    };
    if json {
        return print_json(&outcomes);
    }
    for HookOutcome { path, action, .. } in &outcomes {
        println!("  {action}: {path}");
    }
    Ok(())
}

use crate::output::{print_findings, print_json, tally};
use agentstate_core::{
    config::Config,
    security::{self, AgentReport, SecurityOptions},
};
use anyhow::Context;
use std::path::Path;

pub fn run(
    root: &Path,
    all: bool,
    agent: Option<&str>,
    strict: bool,
    verbose: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let opts = SecurityOptions { strict, verbose };

    let reports: Vec<AgentReport> = match (all, agent) {
        (true, _) => security::validate_all(root, &config, &opts)?,
        (false, Some(id)) => vec![security::validate_agent(root, &config, id, &opts)?],
        (false, None) => anyhow::bail!("pass --all or --agent <id>"),
    };

    if json {
        print_json(&reports)?;
    } else {
        for r in &reports {
            let verdict = if r.passed { "PASS" } else { "FAIL" };
            println!("{verdict} {}", r.agent_id);
            print_findings(&r.findings);
        }
        let findings: Vec<_> = reports.iter().flat_map(|r| r.findings.clone()).collect();
        let failed = reports.iter().filter(|r| !r.passed).count();
        println!(
            "{} agent(s) checked, {failed} failed: {}",
            reports.len(),
            tally(&findings)
        );
    }

    if reports.iter().any(|r| !r.passed) {
        anyhow::bail!("security validation failed");
    }
    Ok(())
}

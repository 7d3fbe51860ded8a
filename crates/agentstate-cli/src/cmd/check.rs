use crate::output::{print_json, print_table};
use agentstate_core::{
    audit::{self, AuditRecord},
    config::Config,
    policy::{self, Decision},
    types::{AuditResult, Operation},
};
use anyhow::Context;
use serde_json::json;
use std::path::Path;

pub fn run(
    root: &Path,
    agent: Option<&str>,
    operation: &str,
    file: Option<&str>,
    scan: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if scan {
        return run_scan(root, &config, agent, json);
    }
    let (Some(agent), Some(file)) = (agent, file) else {
        anyhow::bail!("--agent and --file are required unless --scan is given");
    };
    let operation: Operation = operation.parse()?;
    let decision = policy::check(&config, agent, operation, file)?;
    record(root, &decision);

    if json {
        print_json(&decision)?;
    } else if decision.allowed {
        println!("ALLOWED: {agent} may {operation} {file}");
    } else {
        println!("DENIED: {}", decision.reason);
    }
    if !decision.allowed {
        anyhow::bail!("operation denied");
    }
    Ok(())
}

fn record(root: &Path, decision: &Decision) {
    let result = if decision.allowed {
        AuditResult::Allowed
    } else {
        AuditResult::Denied
    };
    audit::record(
        root,
        AuditRecord::new(
            &decision.agent_id,
            decision.operation,
            &decision.file_path,
            result,
        )
        .with_details(json!({ "reason": decision.reason })),
    );
}

fn run_scan(root: &Path, config: &Config, agent: Option<&str>, json: bool) -> anyhow::Result<()> {
    let violations = policy::scan(root, config, agent)?;
    for v in &violations {
        record(root, v);
    }

    if json {
        print_json(&json!({ "violations": violations }))?;
    } else if violations.is_empty() {
        println!("No policy violations in touched files.");
    } else {
        let rows = violations
            .iter()
            .map(|v| vec![v.agent_id.clone(), v.file_path.clone(), v.reason.clone()])
            .collect();
        print_table(&["AGENT", "FILE", "REASON"], rows);
    }
    if !violations.is_empty() {
        anyhow::bail!("{} touched file(s) violate agent policy", violations.len());
    }
    Ok(())
}

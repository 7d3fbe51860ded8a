use crate::output::print_json;
use agentstate_core::init;
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    });

    let report = init::init(root, &project_name)
        .with_context(|| format!("failed to initialize {}", root.display()))?;

    if json {
        return print_json(&report);
    }

    println!("Initializing agent state in: {}", root.display());
    for path in &report.created {
        println!("  created: {path}");
    }
    for path in &report.existing {
        println!("  exists:  {path}");
    }
    println!();
    println!("Next: edit .cursor/agents/config.yaml to register your agents,");
    println!("then run `agentstate hooks install` to enforce checks on commit.");
    Ok(())
}

use crate::output::{print_findings, print_json, print_table, tally};
use agentstate_core::{
    clock,
    config::Config,
    handoff::{self, HandoffFilter, HandoffStatus, NewHandoff, Priority},
    paths,
    request_id::RequestId,
    types::{has_errors, Finding},
};
use anyhow::Context;
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum HandoffSubcommand {
    /// Hand a unit of work from one agent to another
    Create {
        /// Sending agent
        #[arg(long)]
        from: String,
        /// Receiving agent
        #[arg(long)]
        to: String,
        /// What the receiving agent should do
        #[arg(required = true)]
        task: Vec<String>,
        /// Decisions, constraints and open questions
        #[arg(long, default_value = "")]
        context: String,
        /// Relevant file (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
        /// Acceptance criterion (repeatable)
        #[arg(long = "criterion")]
        criteria: Vec<String>,
        /// low, normal, high or critical
        #[arg(long, default_value = "normal")]
        priority: String,
        /// The sender's request this work belongs to
        #[arg(long)]
        request_id: Option<String>,
    },
    /// List handoffs, highest priority first
    List {
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        from: Option<String>,
        /// pending, accepted or rejected
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one handoff
    Show { id: String },
    /// Accept a pending handoff and start the receiver's task
    Accept { id: String },
    /// Reject a pending handoff
    Reject {
        id: String,
        #[arg(required = true)]
        reason: Vec<String>,
    },
    /// Validate handoff JSON files (default: the shared example and every stored handoff)
    Validate { paths: Vec<PathBuf> },
}

pub fn run(root: &Path, subcmd: HandoffSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        HandoffSubcommand::Create {
            from,
            to,
            task,
            context,
            files,
            criteria,
            priority,
            request_id,
        } => {
            let priority: Priority = priority.parse()?;
            let request_id = request_id
                .as_deref()
                .map(RequestId::parse)
                .transpose()
                .context("invalid --request-id")?;
            let new = NewHandoff {
                from_agent: from,
                to_agent: to,
                task: task.join(" "),
                context,
                files,
                acceptance_criteria: criteria,
                priority,
                request_id,
            };
            create(root, new, json)
        }
        HandoffSubcommand::List { to, from, status } => {
            let status: Option<HandoffStatus> = status.as_deref().map(str::parse).transpose()?;
            let filter = HandoffFilter {
                to_agent: to,
                from_agent: from,
                status,
            };
            list(root, &filter, json)
        }
        HandoffSubcommand::Show { id } => show(root, &id, json),
        HandoffSubcommand::Accept { id } => accept(root, &id, json),
        HandoffSubcommand::Reject { id, reason } => reject(root, &id, &reason.join(" "), json),
        HandoffSubcommand::Validate { paths } => validate(root, &paths, json),
    }
}

fn create(root: &Path, new: NewHandoff, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let h = handoff::create(root, &config, new).context("cannot create handoff")?;
    if json {
        return print_json(&h);
    }
    println!(
        "Created handoff {} ({} -> {}, {})",
        h.handoff_id, h.from_agent, h.to_agent, h.priority
    );
    Ok(())
}

fn list(root: &Path, filter: &HandoffFilter, json: bool) -> anyhow::Result<()> {
    let handoffs = handoff::list(root, filter)?;
    if json {
        return print_json(&handoffs);
    }
    if handoffs.is_empty() {
        println!("No handoffs.");
        return Ok(());
    }
    let rows = handoffs
        .iter()
        .map(|h| {
            vec![
                h.handoff_id.to_string(),
                h.priority.to_string(),
                h.status.to_string(),
                h.from_agent.clone(),
                h.to_agent.clone(),
                h.task.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "PRIORITY", "STATUS", "FROM", "TO", "TASK"], rows);
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let h = handoff::load(root, id)?;
    if json {
        return print_json(&h);
    }
    println!("Handoff:    {}", h.handoff_id);
    println!("From:       {}", h.from_agent);
    println!("To:         {}", h.to_agent);
    println!("Priority:   {}", h.priority);
    println!("Status:     {}", h.status);
    println!("Created:    {}", clock::format_ts(&h.created_at));
    if let Some(req) = &h.request_id {
        println!("Request:    {req}");
    }
    if let (Some(at), Some(resolution)) = (&h.resolved_at, &h.resolution) {
        println!("Resolved:   {} ({resolution})", clock::format_ts(at));
    }
    println!();
    println!("Task:");
    println!("  {}", h.task);
    if !h.context.trim().is_empty() {
        println!("Context:");
        for line in h.context.lines() {
            println!("  {line}");
        }
    }
    if !h.files.is_empty() {
        println!("Files:");
        for f in &h.files {
            println!("  - {f}");
        }
    }
    if !h.acceptance_criteria.is_empty() {
        println!("Acceptance criteria:");
        for c in &h.acceptance_criteria {
            println!("  - {c}");
        }
    }
    Ok(())
}

fn accept(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let (h, state) =
        handoff::accept(root, &config, id).with_context(|| format!("cannot accept {id}"))?;
    if json {
        return print_json(&serde_json::json!({ "handoff": h, "state": state }));
    }
    println!(
        "Accepted {}: {} started {}",
        h.handoff_id, state.agent_id, state.request_id
    );
    Ok(())
}

fn reject(root: &Path, id: &str, reason: &str, json: bool) -> anyhow::Result<()> {
    let h = handoff::reject(root, id, reason).with_context(|| format!("cannot reject {id}"))?;
    if json {
        return print_json(&h);
    }
    println!("Rejected {}: {reason}", h.handoff_id);
    Ok(())
}

fn default_targets(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut targets = Vec::new();
    let example = root.join(paths::STANDARD_HANDOFF_EXAMPLE);
    if example.exists() {
        targets.push(example);
    }
    let dir = paths::handoffs_dir(root);
    if dir.exists() {
        let mut stored = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                stored.push(path);
            }
        }
        stored.sort();
        targets.extend(stored);
    }
    Ok(targets)
}

fn validate(root: &Path, targets: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).ok();
    let targets = if targets.is_empty() {
        default_targets(root)?
    } else {
        targets.to_vec()
    };

    let mut findings: Vec<Finding> = Vec::new();
    for path in &targets {
        let rel = paths::display_relative(root, path);
        let file_findings = handoff::validate_file(path, config.as_ref())
            .with_context(|| format!("failed to read {}", path.display()))?;
        findings.extend(file_findings.into_iter().map(|f| f.in_file(rel.clone())));
    }

    if json {
        print_json(&serde_json::json!({
            "files_checked": targets.len(),
            "findings": findings,
        }))?;
    } else {
        print_findings(&findings);
        println!("{} handoff file(s) checked: {}", targets.len(), tally(&findings));
    }
    if has_errors(&findings) {
        anyhow::bail!("handoff validation found errors");
    }
    Ok(())
}

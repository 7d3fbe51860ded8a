use crate::output::{print_json, print_table};
use agentstate_core::{
    audit::{self, AuditFilter, AuditLog, AuditRecord},
    clock,
    paths,
    types::{AuditResult, Operation},
};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum AuditSubcommand {
    /// Append a record to the operations log
    Log {
        #[arg(long)]
        agent: String,
        /// read, write, create, delete, execute, state, handoff
        #[arg(long)]
        operation: String,
        #[arg(long, default_value = "")]
        file: String,
        /// allowed, denied, success, failure
        #[arg(long, default_value = "success")]
        result: String,
        /// Extra details as a JSON object
        #[arg(long)]
        details: Option<String>,
    },
    /// List records, oldest first
    List {
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        operation: Option<String>,
        #[arg(long)]
        result: Option<String>,
        /// Only records at or after this UTC timestamp
        #[arg(long)]
        since: Option<String>,
        /// Show only the last N records
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Counts per agent, operation and result
    Summary {
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        since: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: AuditSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        AuditSubcommand::Log {
            agent,
            operation,
            file,
            result,
            details,
        } => log(root, &agent, &operation, &file, &result, details.as_deref(), json),
        AuditSubcommand::List {
            agent,
            operation,
            result,
            since,
            limit,
        } => {
            let filter = AuditFilter {
                agent_id: agent,
                operation: operation.as_deref().map(str::parse).transpose()?,
                result: result.as_deref().map(str::parse).transpose()?,
                since: parse_since(since.as_deref())?,
            };
            list(root, &filter, limit, json)
        }
        AuditSubcommand::Summary { agent, since } => {
            let filter = AuditFilter {
                agent_id: agent,
                since: parse_since(since.as_deref())?,
                ..Default::default()
            };
            summary(root, &filter, json)
        }
    }
}

fn parse_since(since: Option<&str>) -> anyhow::Result<Option<chrono::DateTime<chrono::Utc>>> {
    since
        .map(|s| {
            clock::parse_utc(s)
                .ok_or_else(|| anyhow::anyhow!("--since '{s}' is not an ISO-8601 UTC timestamp"))
        })
        .transpose()
}

fn log(
    root: &Path,
    agent: &str,
    operation: &str,
    file: &str,
    result: &str,
    details: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    paths::validate_agent_id(agent)?;
    let operation: Operation = operation.parse()?;
    let result: AuditResult = result.parse()?;
    let mut record = AuditRecord::new(agent, operation, file, result);
    if let Some(raw) = details {
        let value: serde_json::Value =
            serde_json::from_str(raw).context("--details must be valid JSON")?;
        if !value.is_object() {
            anyhow::bail!("--details must be a JSON object");
        }
        record = record.with_details(value);
    }
    AuditLog::for_root(root)
        .append(&record)
        .context("failed to write audit log")?;
    if json {
        return print_json(&record);
    }
    println!("Logged {} {} by {} ({})", record.operation, file, agent, record.result);
    Ok(())
}

fn list(root: &Path, filter: &AuditFilter, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let readout = AuditLog::for_root(root).read(filter)?;
    let mut records = readout.records;
    if let Some(n) = limit {
        let skip = records.len().saturating_sub(n);
        records.drain(..skip);
    }
    if json {
        return print_json(&serde_json::json!({
            "records": records,
            "malformed_lines": readout.malformed_lines,
        }));
    }
    if records.is_empty() {
        println!("No audit records.");
    } else {
        let rows = records
            .iter()
            .map(|r| {
                vec![
                    clock::format_ts(&r.timestamp),
                    r.agent_id.clone(),
                    r.operation.to_string(),
                    r.result.to_string(),
                    r.file_path.clone(),
                ]
            })
            .collect();
        print_table(&["TIMESTAMP", "AGENT", "OPERATION", "RESULT", "FILE"], rows);
    }
    if readout.malformed_lines > 0 {
        eprintln!("warning: skipped {} malformed line(s)", readout.malformed_lines);
    }
    Ok(())
}

fn summary(root: &Path, filter: &AuditFilter, json: bool) -> anyhow::Result<()> {
    let readout = AuditLog::for_root(root).read(filter)?;
    let s = audit::summarize(&readout.records);
    if json {
        return print_json(&s);
    }
    println!("Records: {}", s.total);
    if let (Some(first), Some(last)) = (&s.first, &s.last) {
        println!("Span:    {} .. {}", clock::format_ts(first), clock::format_ts(last));
    }
    for (title, counts) in [
        ("By agent", &s.by_agent),
        ("By operation", &s.by_operation),
        ("By result", &s.by_result),
    ] {
        if counts.is_empty() {
            continue;
        }
        println!();
        println!("{title}:");
        for (key, n) in counts {
            println!("  {key:<20} {n}");
        }
    }
    Ok(())
}

use crate::output::{print_json, print_table};
use agentstate_core::{
    clock,
    config::Config,
    current_state::{self, CurrentState, NewTask, StateFile, StateUpdate},
    request_id::RequestId,
};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum StateSubcommand {
    /// Start a new task for an agent
    Start {
        agent: String,
        /// Task description
        #[arg(required = true)]
        task: Vec<String>,
        /// Planned approach
        #[arg(long)]
        approach: Option<String>,
        /// Background the agent needs
        #[arg(long)]
        context: Option<String>,
        /// Remaining step (repeatable)
        #[arg(long = "step")]
        steps: Vec<String>,
        /// File the task will touch (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
        /// Use this request ID instead of generating one; it must carry the
        /// agent's prefix and follow its latest ID for that date
        #[arg(long)]
        request_id: Option<String>,
    },
    /// Show an agent's current-state file
    Show { agent: String },
    /// Record progress on the active task
    Update {
        agent: String,
        /// Mark a step as completed
        #[arg(long)]
        done: Option<String>,
        /// Set the step currently in progress
        #[arg(long)]
        doing: Option<String>,
        /// Add a remaining step (repeatable)
        #[arg(long = "step")]
        steps: Vec<String>,
        /// Record a touched file (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
        /// Append a timestamped note
        #[arg(long)]
        note: Option<String>,
        /// Replace the context section
        #[arg(long)]
        context: Option<String>,
        /// Replace the approach section
        #[arg(long)]
        approach: Option<String>,
    },
    /// Pause the active task
    Pause {
        agent: String,
        /// What the next session must do to pick the task back up
        #[arg(long = "resume", required = true)]
        resume_instructions: String,
    },
    /// Resume a paused or blocked task
    Resume { agent: String },
    /// Mark the active task as blocked
    Block {
        agent: String,
        #[arg(required = true)]
        reason: Vec<String>,
    },
    /// Mark the active task as failed
    Fail {
        agent: String,
        #[arg(required = true)]
        reason: Vec<String>,
    },
    /// Complete the active task and clear the file
    Complete {
        agent: String,
        /// Completion summary, kept as a note
        #[arg(long)]
        summary: Option<String>,
        /// Keep the completed file instead of clearing it
        #[arg(long)]
        no_clear: bool,
    },
    /// Replace a completed file with the cleared marker
    Clear { agent: String },
    /// List every current-state file
    List,
}

pub fn run(root: &Path, subcmd: StateSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        StateSubcommand::Start {
            agent,
            task,
            approach,
            context,
            steps,
            files,
            request_id,
        } => {
            let request_id = request_id
                .as_deref()
                .map(RequestId::parse)
                .transpose()
                .context("invalid --request-id")?;
            let new = NewTask {
                task: task.join(" "),
                approach,
                context,
                steps,
                files,
                request_id,
            };
            start(root, &agent, new, json)
        }
        StateSubcommand::Show { agent } => show(root, &agent, json),
        StateSubcommand::Update {
            agent,
            done,
            doing,
            steps,
            files,
            note,
            context,
            approach,
        } => {
            let update = StateUpdate {
                completed_step: done,
                in_progress: doing,
                add_steps: steps,
                files,
                note,
                context,
                approach,
            };
            update_state(root, &agent, &update, json)
        }
        StateSubcommand::Pause {
            agent,
            resume_instructions,
        } => {
            let state = current_state::pause(root, &agent, &resume_instructions)
                .with_context(|| format!("cannot pause '{agent}'"))?;
            report(&state, "Paused", json)
        }
        StateSubcommand::Resume { agent } => resume(root, &agent, json),
        StateSubcommand::Block { agent, reason } => {
            let state = current_state::block(root, &agent, &reason.join(" "))
                .with_context(|| format!("cannot block '{agent}'"))?;
            report(&state, "Blocked", json)
        }
        StateSubcommand::Fail { agent, reason } => {
            let state = current_state::fail(root, &agent, &reason.join(" "))
                .with_context(|| format!("cannot fail '{agent}'"))?;
            report(&state, "Failed", json)
        }
        StateSubcommand::Complete {
            agent,
            summary,
            no_clear,
        } => complete(root, &agent, summary.as_deref(), no_clear, json),
        StateSubcommand::Clear { agent } => clear(root, &agent, json),
        StateSubcommand::List => list(root, json),
    }
}

fn report(state: &CurrentState, verb: &str, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(state);
    }
    println!(
        "{verb} {} for {} (status: {})",
        state.request_id, state.agent_id, state.status
    );
    Ok(())
}

fn start(root: &Path, agent: &str, new: NewTask, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let state = current_state::start(root, &config, agent, new)
        .with_context(|| format!("cannot start a task for '{agent}'"))?;
    report(&state, "Started", json)
}

fn show(root: &Path, agent: &str, json: bool) -> anyhow::Result<()> {
    let file = current_state::load(root, agent)?;
    if json {
        print_json(&file)?;
    } else {
        print!("{}", file.render());
    }
    Ok(())
}

fn update_state(root: &Path, agent: &str, update: &StateUpdate, json: bool) -> anyhow::Result<()> {
    if update.is_empty() {
        anyhow::bail!("nothing to update: pass --done, --doing, --step, --file, --note, --context or --approach");
    }
    let state = current_state::update(root, agent, update)
        .with_context(|| format!("cannot update '{agent}'"))?;
    report(&state, "Updated", json)
}

fn resume(root: &Path, agent: &str, json: bool) -> anyhow::Result<()> {
    let state = current_state::resume(root, agent)
        .with_context(|| format!("cannot resume '{agent}'"))?;
    if json {
        return print_json(&state);
    }
    println!("Resumed {} for {}", state.request_id, state.agent_id);
    println!("Task: {}", state.task);
    if !state.resume_instructions.trim().is_empty() {
        println!();
        println!("Resume instructions:");
        println!("{}", state.resume_instructions.trim());
    }
    if !state.remaining_steps.is_empty() {
        println!();
        println!("Remaining steps:");
        for step in &state.remaining_steps {
            println!("  - {step}");
        }
    }
    Ok(())
}

fn complete(
    root: &Path,
    agent: &str,
    summary: Option<&str>,
    no_clear: bool,
    json: bool,
) -> anyhow::Result<()> {
    let state = current_state::complete(root, agent, summary)
        .with_context(|| format!("cannot complete '{agent}'"))?;
    if no_clear {
        return report(&state, "Completed", json);
    }
    let cleared = current_state::clear(root, agent)
        .with_context(|| format!("completed but could not clear '{agent}'"))?;
    if json {
        return print_json(&serde_json::json!({
            "completed": state,
            "cleared": cleared,
        }));
    }
    println!(
        "Completed {} for {} and cleared the state file",
        state.request_id, state.agent_id
    );
    Ok(())
}

fn clear(root: &Path, agent: &str, json: bool) -> anyhow::Result<()> {
    let cleared =
        current_state::clear(root, agent).with_context(|| format!("cannot clear '{agent}'"))?;
    if json {
        return print_json(&cleared);
    }
    match &cleared.last_request_id {
        Some(id) => println!("Cleared {agent} (last request: {id})"),
        None => println!("Cleared {agent}"),
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let files = current_state::list(root)?;
    if json {
        return print_json(&files);
    }
    if files.is_empty() {
        println!("No current-state files.");
        return Ok(());
    }
    let rows = files
        .iter()
        .map(|f: &StateFile| {
            vec![
                f.agent_id().to_string(),
                f.request_id().map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
                f.task_status().map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                f.file_status().to_string(),
                clock::format_ts(&f.last_updated()),
            ]
        })
        .collect();
    print_table(
        &["AGENT", "REQUEST", "STATUS", "FILE STATUS", "LAST UPDATED"],
        rows,
    );
    Ok(())
}

mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    audit::AuditSubcommand, config::ConfigSubcommand, handoff::HandoffSubcommand,
    hooks::HooksSubcommand, rules::RulesSubcommand, state::StateSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agentstate",
    about = "Agent current-state files, handoffs, audit log and security checks for multi-agent Cursor projects",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .cursor/ or .git/)
    #[arg(long, global = true, env = "AGENTSTATE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold .cursor/agents, logs and rules in the current project
    Init {
        /// Project name (default: root directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Manage an agent's current-state file
    State {
        #[command(subcommand)]
        subcommand: StateSubcommand,
    },

    /// Create, inspect and resolve handoffs between agents
    Handoff {
        #[command(subcommand)]
        subcommand: HandoffSubcommand,
    },

    /// Write to and read from the agent operations log
    Audit {
        #[command(subcommand)]
        subcommand: AuditSubcommand,
    },

    /// Check whether an agent may perform an operation on a file
    Check {
        /// Agent ID
        #[arg(long, required_unless_present = "scan")]
        agent: Option<String>,
        /// Operation: read, write, create, delete, execute
        #[arg(long, default_value = "write")]
        operation: String,
        /// File path relative to the project root
        #[arg(long, required_unless_present = "scan")]
        file: Option<String>,
        /// Check every "Files Touched" entry in the current-state files
        #[arg(long, conflicts_with = "file")]
        scan: bool,
    },

    /// Validate agent prompt files and path policy
    Security {
        /// Validate every agent
        #[arg(long, conflicts_with = "agent")]
        all: bool,
        /// Validate a single agent
        #[arg(long, required_unless_present = "all")]
        agent: Option<String>,
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
        /// Show passing checks too
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Lint current-state and agent prompt files
    Lint {
        /// Files to lint (default: every file under .cursor/agents)
        paths: Vec<PathBuf>,
    },

    /// Inspect and lint .mdc rule files
    Rules {
        #[command(subcommand)]
        subcommand: RulesSubcommand,
    },

    /// Install or remove the managed git hooks
    Hooks {
        #[command(subcommand)]
        subcommand: HooksSubcommand,
    },

    /// Show and validate .cursor/agents/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    tracing::debug!(root = %root.display(), "resolved project root");

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref(), cli.json),
        Commands::State { subcommand } => cmd::state::run(&root, subcommand, cli.json),
        Commands::Handoff { subcommand } => cmd::handoff::run(&root, subcommand, cli.json),
        Commands::Audit { subcommand } => cmd::audit::run(&root, subcommand, cli.json),
        Commands::Check {
            agent,
            operation,
            file,
            scan,
        } => cmd::check::run(
            &root,
            agent.as_deref(),
            &operation,
            file.as_deref(),
            scan,
            cli.json,
        ),
        Commands::Security {
            all,
            agent,
            strict,
            verbose,
        } => cmd::security::run(&root, all, agent.as_deref(), strict, verbose, cli.json),
        Commands::Lint { paths } => cmd::lint::run(&root, &paths, cli.json),
        Commands::Rules { subcommand } => cmd::rules::run(&root, subcommand, cli.json),
        Commands::Hooks { subcommand } => cmd::hooks::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

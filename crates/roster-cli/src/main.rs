#![forbid(unsafe_code)]

mod cmd;
mod directory;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use roster_core::config::resolve_config;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "roster: daily directory membership snapshots and change reports",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides --json and the FORMAT env var).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a roster project",
        long_about = "Write .roster/config.toml and create the snapshot database.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    roster init\n\n    # Emit machine-readable output\n    roster init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Recording",
        about = "Record today's membership snapshot",
        long_about = "Fetch every directory member, flatten the records, and append them under the run date.",
        after_help = "EXAMPLES:\n    # Fetch from Slack (needs SLACK_TOKEN)\n    roster snapshot\n\n    # Load a saved member list under a fixed date\n    roster snapshot --from-file members.json --run-date 2024-03-01"
    )]
    Snapshot(cmd::snapshot::SnapshotArgs),

    #[command(
        next_help_heading = "Recording",
        about = "Snapshot, compare, and append the change report",
        long_about = "The daily job: record a snapshot, classify changes against the previous run, and append the dated report to the report file. The comparison is skipped on the first run.",
        after_help = "EXAMPLES:\n    # Daily run\n    roster run\n\n    # Dry run from a file without touching the report file\n    roster run --from-file members.json --no-append"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        next_help_heading = "Comparing",
        about = "Show raw set differences against the previous run",
        after_help = "EXAMPLES:\n    # Compare identity and status\n    roster diff --attrs name,deleted\n\n    # Compare every stored column\n    roster diff"
    )]
    Diff(cmd::diff::DiffArgs),

    #[command(
        next_help_heading = "Comparing",
        about = "Classify new, deleted, and reactivated members",
        after_help = "EXAMPLES:\n    # Report for today\n    roster changes\n\n    # Report for an earlier run and append it\n    roster changes --as-of 2024-03-02 --append-report"
    )]
    Changes(cmd::changes::ChangesArgs),

    #[command(
        next_help_heading = "Inspecting",
        about = "List the stored column set",
        after_help = "EXAMPLES:\n    roster columns --json"
    )]
    Columns(cmd::columns::ColumnsArgs),

    #[command(
        next_help_heading = "Inspecting",
        about = "List recorded run dates",
        after_help = "EXAMPLES:\n    roster dates"
    )]
    Dates(cmd::dates::DatesArgs),

    #[command(
        next_help_heading = "Inspecting",
        about = "Category headcounts and weekly deactivations",
        after_help = "EXAMPLES:\n    # Members per title category\n    roster stats\n\n    # Weekly deactivation series as JSON\n    roster stats --view series --json"
    )]
    Stats(cmd::stats::StatsArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    roster completions bash > ~/.local/share/bash-completion/completions/roster"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ROSTER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "roster=debug,info"
        } else {
            "roster=info,warn"
        })
    });

    let format = env::var("ROSTER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let output = cli.output_mode();

    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, output, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
        Commands::Snapshot(args) => {
            let config = resolve_config(&project_root)?;
            cmd::snapshot::run_snapshot(&args, &config, output, &project_root)
        }
        Commands::Run(args) => {
            let config = resolve_config(&project_root)?;
            cmd::run::run_run(&args, &config, output, &project_root)
        }
        Commands::Diff(args) => {
            let config = resolve_config(&project_root)?;
            cmd::diff::run_diff(&args, &config, output, &project_root)
        }
        Commands::Changes(args) => {
            let config = resolve_config(&project_root)?;
            cmd::changes::run_changes(&args, &config, output, &project_root)
        }
        Commands::Columns(args) => {
            let config = resolve_config(&project_root)?;
            cmd::columns::run_columns(&args, &config, output, &project_root)
        }
        Commands::Dates(args) => {
            let config = resolve_config(&project_root)?;
            cmd::dates::run_dates(&args, &config, output, &project_root)
        }
        Commands::Stats(args) => {
            let config = resolve_config(&project_root)?;
            cmd::stats::run_stats(&args, &config, output, &project_root)
        }
    }
}

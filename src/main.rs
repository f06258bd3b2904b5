//! Approvalctl — manual approval gate for CI pipelines.
//!
//! Pauses a workflow job until a human approves or rejects it by commenting
//! on a GitHub issue.
//!
//! Usage:
//!   approvalctl run        # open the approval issue and wait for a verdict
//!   approvalctl cleanup    # post phase: close an issue left open by a cancelled run
//!
//! Step inputs come from `INPUT_*` environment variables; see `--help`.

use approvalctl::cli;
use approvalctl::config::Inputs;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

/// Approvalctl — wait for a human to approve a pipeline step.
#[derive(Parser)]
#[command(
    name = "approvalctl",
    version,
    about = "Manual approval gate backed by GitHub issues",
    long_about = "Approvalctl opens a GitHub issue and waits until an allowed user\n\
                  comments with an approval or rejection keyword, the issue is\n\
                  closed, or the timeout expires.\n\n\
                  Commands:\n  \
                  approvalctl run        # main phase\n  \
                  approvalctl cleanup    # post phase (always runs)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the approval issue and wait for a verdict
    Run(Inputs),

    /// Close the approval issue left open by an interrupted run
    Cleanup {
        /// Token used for the GitHub API (falls back to GITHUB_TOKEN)
        #[arg(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
        github_token: Option<String>,
    },
}

/// `RUST_LOG` wins; otherwise `RUNNER_DEBUG=1` enables debug output.
fn log_filter() -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        return EnvFilter::from_default_env();
    }
    let level = match std::env::var("RUNNER_DEBUG").as_deref() {
        Ok("1") => "debug",
        _ => "info",
    };
    EnvFilter::new(format!("approvalctl={}", level))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(inputs) => cli::run::run_gate(inputs).await,
        Commands::Cleanup { github_token } => {
            cli::cleanup::run_cleanup(github_token).await.map(|()| false)
        }
    };

    match result {
        Ok(false) => {}
        Ok(true) => std::process::exit(1),
        Err(e) => {
            eprintln!();
            eprintln!("  {} {}", "✗".red().bold(), e);
            for cause in e.chain().skip(1) {
                eprintln!("  {} {}", "caused by:".dimmed(), cause);
            }
            eprintln!();
            println!("{}", approvalctl::actions::error_annotation(&format!("{:#}", e)));
            std::process::exit(1);
        }
    }
}

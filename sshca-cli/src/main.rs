//! sshca CLI - policy inspection, filters and manual authentication

mod commands;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sshca_auth::authn::IoTerminal;
use sshca_auth::policy::Policy;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

const DEFAULT_CONFIG: &str = "/etc/pam_sshca.conf";

/// sshca - SSH certificate authority login policy
#[derive(Parser)]
#[command(name = "sshca", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect policy files
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },

    /// Run an embedded filter from stdin to stdout
    Filter {
        #[command(subcommand)]
        filter: FilterCommands,
    },

    /// Authenticate a user by pasting a certificate and a signed challenge
    Manual {
        #[command(flatten)]
        target: Target,
    },

    /// Sign a challenge request read from stdin
    Respond {
        /// Unencrypted OpenSSH private key
        #[arg(long)]
        key: PathBuf,
    },
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Print the policy resolved for a user as JSON
    Check {
        #[command(flatten)]
        target: Target,
    },

    /// Print the policy file in canonical form
    Fmt {
        /// Policy file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

#[derive(Subcommand)]
enum FilterCommands {
    /// Keep certificates not restricted to SSH login
    SudoRegular,
}

#[derive(clap::Args)]
struct Target {
    /// Policy file
    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// User being authenticated
    #[arg(long)]
    user: String,

    /// The user's home directory
    #[arg(long)]
    home: PathBuf,
}

type LogHandle = reload::Handle<EnvFilter, Registry>;

/// Log to stderr at `warn` unless `RUST_LOG` says otherwise.
fn init_logging() -> LogHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
    handle
}

/// Apply the policy's `Debug` directive.
fn apply_debug(handle: &LogHandle, policy: &Policy) {
    if !policy.debug {
        return;
    }
    if let Err(e) = handle.reload(EnvFilter::new("debug")) {
        tracing::warn!(error = %e, "cannot raise log level");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let logs = init_logging();

    match run(cli, &logs) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, logs: &LogHandle) -> Result<ExitCode> {
    match cli.command {
        Commands::Policy { command } => match command {
            PolicyCommands::Check { target } => {
                println!(
                    "{}",
                    commands::policy::check(&target.config, &target.user, &target.home)?
                );
            }
            PolicyCommands::Fmt { config } => {
                print!("{}", commands::policy::fmt(&config)?);
                io::stdout().flush()?;
            }
        },

        Commands::Filter { filter } => match filter {
            FilterCommands::SudoRegular => {
                commands::filter::sudo_regular(io::stdin().lock(), io::stdout().lock())?;
            }
        },

        Commands::Manual { target } => {
            let policy = commands::policy::resolve(&target.config, &target.user, &target.home);
            apply_debug(logs, &policy);
            let mut terminal = IoTerminal::new(io::stdin().lock(), io::stdout());
            let decision = commands::manual::run(&policy, &target.user, &mut terminal);
            if !decision.is_granted() {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Respond { key } => {
            let key = commands::respond::load_key(&key)?;
            eprintln!("Paste the challenge data from the server:");
            commands::respond::run(&key, io::stdin().lock(), io::stdout().lock())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

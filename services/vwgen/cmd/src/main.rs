//! vwgen command line tool.
//!
//! Generates and maintains configuration for VXLAN-over-WireGuard mesh
//! networks. Each network lives in `<dir>/<network>.conf`; every subcommand is
//! one locked load, mutate, save session against that file.

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vwgen_store::ConfigStore;

mod commands;
mod config;
mod logging;

use commands::Status;
use config::Settings;
use logging::VwgenLogFormatter;

// Component logging macros are defined in logging.rs and available via #[macro_export]

/// Crates whose log output follows `--log-level`
const LOG_TARGETS: &[&str] = &["vwgen", "vwgen_store", "vwgen_alloc", "vwgen_crypto"];

/// Exit code for failures that are not a command status (I/O, parse errors)
const EXIT_FAILURE: u8 = 1;

/// Configuration generator for VXLAN-over-WireGuard mesh networks
#[derive(Parser, Debug)]
#[command(name = "vwgen", version, about)]
struct Args {
    /// Directory holding network configuration files
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Settings file path
    #[arg(long, global = true, default_value = "vwgen.yaml")]
    settings: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one or more networks
    Show {
        /// Print JSON instead of the human-readable listing
        #[arg(long)]
        json: bool,

        #[arg(required = true)]
        networks: Vec<String>,
    },

    /// Add nodes, creating the network if needed
    ///
    /// Exits with ENOSPC (28) when an address pool is full; nodes added before
    /// that are kept.
    Add {
        network: String,

        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Change network or node settings
    Set {
        network: String,

        /// Directives such as `vxlan-id 42` or `node alice listen-port 51820`
        #[arg(required = true, allow_hyphen_values = true, num_args = 1..)]
        directives: Vec<String>,
    },

    /// Delete nodes from a network
    Del {
        network: String,

        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Add or delete pairs of nodes that must not peer
    Blacklist {
        network: String,

        /// `add` or `delete`, or any prefix of them
        operation: String,

        left: String,

        #[arg(required = true)]
        right: Vec<String>,
    },

    /// Print a new private key
    Genkey,

    /// Print a new preshared key
    Genpsk,

    /// Read a private key from stdin and print its public key
    Pubkey,
}

fn init_tracing(settings: &Settings) {
    let directives = std::iter::once("warn".to_string())
        .chain(
            LOG_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, settings.log_level)),
        )
        .collect::<Vec<_>>()
        .join(",");
    let env_filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!(
            "vwgen: Ignoring invalid log level '{}': {}",
            settings.log_level, e
        );
        EnvFilter::new("warn")
    });

    let formatter = VwgenLogFormatter::new("vwgen".to_string(), settings.color);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(settings.color)
        .event_format(formatter)
        .init();
}

fn dispatch(command: Command, settings: &Settings) -> anyhow::Result<Status> {
    let mut store = ConfigStore::new(&settings.dir);
    let stdout = io::stdout();

    match command {
        Command::Show { json, networks } => {
            commands::show::run(&mut store, &networks, json, settings.color, &mut stdout.lock())
        }
        Command::Add { network, nodes } => commands::add::run(&mut store, &network, &nodes),
        Command::Set {
            network,
            directives,
        } => commands::set::run(&mut store, &network, &directives),
        Command::Del { network, nodes } => commands::del::run(&mut store, &network, &nodes),
        Command::Blacklist {
            network,
            operation,
            left,
            right,
        } => commands::blacklist::run(&mut store, &network, &operation, &left, &right),
        Command::Genkey => commands::keys::genkey(&mut stdout.lock()),
        Command::Genpsk => commands::keys::genpsk(&mut stdout.lock()),
        Command::Pubkey => commands::keys::pubkey(&mut io::stdin().lock(), &mut stdout.lock()),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut settings = match Settings::load_from_file(&args.settings, logging::is_terminal()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("vwgen: {:#}", e);
            return ExitCode::from(Status::EINVAL.code());
        }
    };
    settings.apply_cli(args.dir, args.log_level);

    init_tracing(&settings);
    debug!("Using network directory {:?}", settings.dir);

    match dispatch(args.command, &settings) {
        Ok(status) => {
            if !status.is_ok() {
                debug!("Finished with status {}", status);
            }
            status.into()
        }
        Err(e) => {
            eprintln!("vwgen: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

//! provreg: private provider registry server and admin CLI.

mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::{Overrides, Settings};

#[derive(Parser)]
#[command(name = "provreg", version, about = "Private provider registry")]
struct Cli {
    /// Configuration file (default: ./provreg.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Artifact store root directory
    #[arg(long, global = true, env = "PROVREG_ROOT")]
    root: Option<PathBuf>,
    /// Signing key identity served as the key ID
    #[arg(long, global = true, env = "PGP_ID")]
    identity: Option<String>,
    /// Pre-exported armored public key (skips the export command)
    #[arg(long, global = true, env = "PGP_PUBKEY_FILE")]
    key_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter provreg.toml in the current directory
    Init,
    /// Run the registry HTTP server
    Serve {
        /// Socket address to bind (e.g., 0.0.0.0:8080)
        #[arg(long, env = "PROVREG_LISTEN")]
        listen: Option<String>,
    },
    /// List the stored versions of a provider
    Versions {
        namespace: String,
        name: String,
        /// Print the API response body instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the stored record for one build
    Show {
        namespace: String,
        name: String,
        version: String,
        os: String,
        arch: String,
    },
    /// Register a build from a JSON file, as the POST endpoint would
    Register {
        namespace: String,
        name: String,
        version: String,
        /// JSON body with os, arch, filename, download_url, shasum
        body: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    if let Commands::Init = cli.command {
        return commands::init::run(&cwd);
    }

    let listen = match &cli.command {
        Commands::Serve { listen } => listen.clone(),
        _ => None,
    };
    let (registry, server) = Settings::load(cli.config.as_deref(), &cwd)?.resolve(Overrides {
        listen,
        root: cli.root,
        identity: cli.identity,
        key_file: cli.key_file,
    })?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Serve { .. } => commands::serve::run(registry, server),
        Commands::Versions {
            namespace,
            name,
            json,
        } => commands::registry::versions(&registry, &namespace, &name, json),
        Commands::Show {
            namespace,
            name,
            version,
            os,
            arch,
        } => commands::registry::show(&registry, &namespace, &name, &version, &os, &arch),
        Commands::Register {
            namespace,
            name,
            version,
            body,
        } => commands::registry::register(&registry, &namespace, &name, &version, &body),
    }
}

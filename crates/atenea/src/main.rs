// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atenea - omnichannel contact center core.
//!
//! This is the binary entry point for the Atenea service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod migrate;
mod serve;

use std::path::PathBuf;

use atenea_config::AteneaConfig;
use clap::{Parser, Subcommand};

/// Atenea - omnichannel contact center core.
#[derive(Parser, Debug)]
#[command(name = "atenea", version, about, long_about = None)]
struct Cli {
    /// Explicit config file (skips the default search path).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the contact center HTTP gateway.
    Serve,
    /// Validate configuration and probe its dependencies.
    CheckConfig,
    /// Create or upgrade the database and sync catalogs.
    Migrate,
}

fn load_config(path: Option<&std::path::Path>) -> AteneaConfig {
    let loaded = match path {
        Some(path) => atenea_config::load_and_validate_path(path),
        None => atenea_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            atenea_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::CheckConfig) => check::run_check(&config).await,
        Some(Commands::Migrate) => migrate::run_migrate(&config).await,
        None => {
            println!("atenea: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["atenea", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));

        let cli = Cli::try_parse_from(["atenea", "serve", "--config", "/etc/atenea/prod.toml"])
            .unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/atenea/prod.toml")));

        assert!(Cli::try_parse_from(["atenea", "shell"]).is_err());
    }

    #[test]
    fn default_config_is_valid() {
        let config = atenea_config::load_and_validate_str("").unwrap();
        assert_eq!(config.service.name, "atenea");
    }
}

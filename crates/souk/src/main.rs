// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! souk - real-time chat and presence gateway for customer/vendor messaging.
//!
//! This is the binary entry point for the souk gateway.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;

/// souk - real-time customer/vendor chat gateway.
#[derive(Parser, Debug)]
#[command(name = "souk", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the souk gateway server.
    Serve,
    /// Print the effective configuration after merging files and env vars.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match souk_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            souk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("error: failed to render config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("souk: use --help for available commands");
        }
    }
}

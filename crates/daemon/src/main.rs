// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mutagend` - the Mutagen daemon binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mutagen_daemon::{client, lifecycle, registration, ClientError, ClientOptions, DaemonClient};

#[derive(Parser)]
#[command(name = "mutagend", version, about = "Mutagen daemon", disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daemon lifecycle commands
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

#[derive(Subcommand)]
enum DaemonCommand {
    /// Run the daemon in the foreground
    Run,
    /// Start the daemon in the background
    Start,
    /// Stop the running daemon
    Stop,
    /// Register the daemon with the system service manager
    Register,
    /// Remove the daemon's system service registration
    Unregister,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Daemon { command } => match command {
            DaemonCommand::Run => run().await,
            DaemonCommand::Start => start(),
            DaemonCommand::Stop => stop().await,
            DaemonCommand::Register => registration::register().map_err(|e| e.to_string()),
            DaemonCommand::Unregister => registration::unregister().map_err(|e| e.to_string()),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = lifecycle::Config::load().map_err(|e| e.to_string())?;
    lifecycle::run(config).await.map_err(|e| e.to_string())
}

fn start() -> Result<(), String> {
    if registration::registered_start().map_err(|e| e.to_string())? {
        return Ok(());
    }
    client::start_daemon().map_err(|e| e.to_string())
}

async fn stop() -> Result<(), String> {
    if registration::registered_stop().map_err(|e| e.to_string())? {
        return Ok(());
    }

    // Stop skips version enforcement so any client build can terminate
    // any daemon build.
    let options = ClientOptions { enforce_version_match: false, autostart: false };
    match DaemonClient::connect(options).await {
        Ok(daemon) => daemon.terminate().await.map_err(|e| e.to_string()),
        Err(ClientError::DialFailed) => {
            println!("daemon not running");
            Ok(())
        }
        Err(error) => Err(error.to_string()),
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::transport::{Transport, DEFAULT_BAUD};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "ymboot-upload")]
#[command(about = "YMODEM image upload tool for the ymboot bootloader")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyACM0)
    #[arg(short, long)]
    pub port: String,

    /// Baud rate (ignored by USB CDC, used by UART bridges)
    #[arg(short, long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Request an upgrade and upload an application image
    Upload {
        /// Application binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Name announced in the header packet (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Abort a running transfer
    Abort,
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let mut transport = Transport::new(&cli.port, cli.baud)?;

    match cli.command {
        Commands::Upload { file, name } => commands::upload(&mut transport, &file, name.as_deref()),
        Commands::Abort => commands::abort(&mut transport),
    }
}

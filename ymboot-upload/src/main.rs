// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Image upload tool for the ymboot bootloader.
//!
//! Usage:
//!   ymboot-upload --port /dev/ttyACM0 upload app.bin
//!   ymboot-upload --port /dev/ttyACM0 upload build/out.bin --name app.bin
//!   ymboot-upload --port /dev/ttyACM0 abort

mod cli;
mod commands;
mod transport;
mod ymodem;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}

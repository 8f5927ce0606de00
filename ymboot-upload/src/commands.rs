// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for bootloader operations.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use ymboot_common::protocol::{APP_ENTRY_ADDR, APP_IMAGE_CAPACITY};

use crate::transport::Transport;
use crate::ymodem;

/// Upload an application image.
pub fn upload(transport: &mut Transport, file: &Path, name: Option<&str>) -> Result<()> {
    let image = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if image.is_empty() {
        bail!("{} is empty", file.display());
    }
    if image.len() > APP_IMAGE_CAPACITY as usize {
        bail!(
            "{} is {} bytes, the application area holds {}",
            file.display(),
            image.len(),
            APP_IMAGE_CAPACITY
        );
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Cannot derive a name from the file path, use --name")?,
    };

    println!("Image:   {} ({} bytes)", file.display(), image.len());
    println!("Name:    {}", name);
    println!("Target:  0x{:08x}", APP_ENTRY_ADDR);
    println!();

    transport.drain_rx();

    let pb = ProgressBar::new(image.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let result = ymodem::upload(transport, &name, &image, |n| pb.set_position(n as u64));
    if let Err(e) = result {
        pb.abandon();
        return Err(e);
    }

    pb.finish_with_message("Upload complete");
    println!();
    println!("Image uploaded successfully, the device is starting it.");

    Ok(())
}

/// Abort a running transfer.
pub fn abort(transport: &mut Transport) -> Result<()> {
    println!("Aborting transfer on {}...", transport.port_name());

    transport.drain_rx();
    if ymodem::abort(transport)? {
        println!("Device confirmed the abort.");
    } else {
        println!("No confirmation: no transfer was running.");
    }

    Ok(())
}

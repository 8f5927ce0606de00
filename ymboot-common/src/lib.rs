// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Core of the ymboot YMODEM bootloader.
//!
//! Everything in this crate is hardware independent: the byte link, the
//! flash device and the board are reached through the [`Transport`],
//! [`NvStore`] and [`Board`] traits, so the whole upload path can be driven
//! from host tests.
//!
//! - `defmt` feature: log through `defmt` and derive `defmt::Format`

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod crc16;
pub mod entry;
pub mod numeric;
pub mod packet;
pub mod protocol;
pub mod session;
pub mod storage;
pub mod transport;
pub mod ymodem;

// Re-export commonly used types
pub use config::{BootConfig, Layout, Timeouts};
pub use entry::{Board, EntrySequencer, VoltageGate};
pub use session::{SessionController, SessionOutcome};
pub use storage::{NorFlashStore, NvStore};
pub use transport::Transport;
pub use ymodem::{Receiver, ReceiverState, SessionResult, TransferSession};

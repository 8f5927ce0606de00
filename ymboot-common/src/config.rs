// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Runtime configuration of a boot. Defaults come from [`crate::protocol`].

use crate::protocol::{
    ACK_DELAY_US, ACTIVATION_TIMEOUT_MS, APP_ENTRY_ADDR, APP_FLASH_OFFSET, APP_IMAGE_CAPACITY,
    DOWNLOAD_TIMEOUT_MS, MAX_ERRORS, PACKET_TIMEOUT_MS, VDD_MIN_SAMPLE,
};

/// Deadlines used while talking to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeouts {
    /// Wait for the two activation bytes after reset.
    pub activation_ms: u32,
    /// Wait for a packet designator, a packet body, or one start-command poll.
    pub download_ms: u32,
    /// Wait for the second byte of a cancel pair.
    pub packet_ms: u32,
    /// Pause before the start ACK and the header ACK.
    pub ack_delay_us: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            activation_ms: ACTIVATION_TIMEOUT_MS,
            download_ms: DOWNLOAD_TIMEOUT_MS,
            packet_ms: PACKET_TIMEOUT_MS,
            ack_delay_us: ACK_DELAY_US,
        }
    }
}

/// Where the received image lands, in storage offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    pub base: u32,
    pub capacity: u32,
}

impl Layout {
    /// One past the last writable offset.
    pub fn end(&self) -> u32 {
        self.base.saturating_add(self.capacity)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            base: APP_FLASH_OFFSET,
            capacity: APP_IMAGE_CAPACITY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfig {
    pub timeouts: Timeouts,
    pub layout: Layout,
    pub max_errors: u32,
    /// Number of `download_ms` polls spent waiting for the start command.
    /// `None` waits forever.
    pub start_command_polls: Option<u32>,
    /// Address control is transferred to after the session.
    pub app_entry: u32,
    /// Minimum supply sample before anything else runs.
    pub vdd_min: u16,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            layout: Layout::default(),
            max_errors: MAX_ERRORS,
            start_command_polls: None,
            app_entry: APP_ENTRY_ADDR,
            vdd_min: VDD_MIN_SAMPLE,
        }
    }
}

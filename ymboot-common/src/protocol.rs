// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Wire constants for the YMODEM upload protocol and the flash layout
//! shared by the bootloader and the host tool.

// --- Packet designators and control bytes ---

/// 128-byte packet.
pub const SOH: u8 = 0x01;
/// 1024-byte packet.
pub const STX: u8 = 0x02;
/// End of transmission.
pub const EOT: u8 = 0x04;
pub const ACK: u8 = 0x06;
/// Cancel. Two in a row end the session.
pub const CA: u8 = 0x18;
/// `'C'`: start in CRC mode, also used as the retransmit request.
pub const CRC16: u8 = 0x43;
/// `'A'`: abort request from the host.
pub const ABORT1: u8 = 0x41;
/// `'a'`: abort request from the host.
pub const ABORT2: u8 = 0x61;
/// Payload padding used by senders for the last data packet.
pub const CPMEOF: u8 = 0x1A;

/// Reply to an accepted header packet.
pub const HEADER_ACK: [u8; 2] = [ACK, CRC16];
/// Double cancel sent when the receiver ends the session.
pub const DOUBLE_CANCEL: [u8; 2] = [CA, CA];

// --- Session handshake ---

/// Sent by the host right after reset to request an upgrade.
pub const ACTIVATION_CODE: [u8; 2] = [0x41, 0x35];
/// Sent by the host once it is ready to start the transfer.
pub const START_COMMAND: u8 = b'1';

// --- Packet geometry ---

pub const PACKET_SIZE: usize = 128;
pub const PACKET_1K_SIZE: usize = 1024;
/// Designator, sequence and complement.
pub const PACKET_HEADER: usize = 3;
pub const PACKET_TRAILER: usize = 2;
pub const PACKET_OVERHEAD: usize = PACKET_HEADER + PACKET_TRAILER;
pub const MAX_PACKET_LEN: usize = PACKET_1K_SIZE + PACKET_OVERHEAD;

/// Upper bound on the stored file name (bytes, without terminator).
pub const FILE_NAME_LENGTH: usize = 64;
/// Upper bound on the stored size field (bytes, without terminator).
pub const FILE_SIZE_LENGTH: usize = 16;

/// Recoverable errors tolerated per session before giving up.
pub const MAX_ERRORS: u32 = 5;

// --- Timing defaults ---

pub const ACTIVATION_TIMEOUT_MS: u32 = 1000;
pub const DOWNLOAD_TIMEOUT_MS: u32 = 1000;
/// Wait for the second CA of a cancel pair.
pub const PACKET_TIMEOUT_MS: u32 = 100;
pub const ACK_DELAY_US: u32 = 10_000;

// --- Flash layout constants ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SIZE: u32 = 2 * 1024 * 1024;
pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

/// Application image offset from the start of flash.
pub const APP_FLASH_OFFSET: u32 = 0x1_0000;
pub const APP_ENTRY_ADDR: u32 = FLASH_BASE + APP_FLASH_OFFSET;
pub const APP_IMAGE_CAPACITY: u32 = FLASH_SIZE - APP_FLASH_OFFSET;

// --- Supply gate ---

/// ADC counts for ~3.0 V on VSYS through the 1/3 divider (12-bit, 3.3 V ref).
pub const VDD_MIN_SAMPLE: u16 = 1241;
/// Consecutive samples at or above the threshold before booting on.
pub const SUPPLY_STABLE_SAMPLES: u8 = 16;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};

use ymboot_common::entry::Board;
use ymboot_common::packet::{self, PacketKind};
use ymboot_common::protocol::{CPMEOF, MAX_PACKET_LEN, PACKET_SIZE};
use ymboot_common::storage::NorFlashStore;
use ymboot_common::transport::Transport;

// =============================================================================
// Link
// =============================================================================

/// One scripted event on the incoming side of the link.
#[derive(Clone, Copy, Debug)]
pub enum Rx {
    Byte(u8),
    /// The pending `receive` call times out here.
    Timeout,
}

/// Link fed from a script; everything sent is recorded.
#[derive(Default)]
pub struct ScriptedLink {
    incoming: VecDeque<Rx>,
    pub sent: Vec<u8>,
    pub receive_calls: usize,
    pub timeouts_seen: Vec<u32>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> &mut Self {
        self.incoming.extend(bytes.iter().map(|&b| Rx::Byte(b)));
        self
    }

    pub fn push_timeout(&mut self) -> &mut Self {
        self.incoming.push_back(Rx::Timeout);
        self
    }

    pub fn remaining(&self) -> usize {
        self.incoming.len()
    }
}

impl Transport for ScriptedLink {
    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> usize {
        self.receive_calls += 1;
        self.timeouts_seen.push(timeout_ms);

        let mut n = 0;
        while n < buf.len() {
            match self.incoming.pop_front() {
                Some(Rx::Byte(b)) => {
                    buf[n] = b;
                    n += 1;
                }
                Some(Rx::Timeout) | None => break,
            }
        }
        n
    }

    fn send(&mut self, buf: &[u8]) {
        self.sent.extend_from_slice(buf);
    }
}

// =============================================================================
// Flash
// =============================================================================

pub const RAM_PAGE_SIZE: usize = 2048;
pub const RAM_WORD_SIZE: usize = 4;
pub const RAM_FLASH_SIZE: usize = 64 * 1024;

/// NOR flash in RAM: erase sets 0xFF, programming can only clear bits.
/// Starts filled with a stale pattern so unerased writes are visible.
pub struct RamFlash {
    pub mem: Vec<u8>,
    pub erased_pages: Vec<u32>,
    pub writes: Vec<(u32, usize)>,
    pub fail_writes: bool,
    /// Flip one bit in every read.
    pub corrupt_reads: bool,
}

impl RamFlash {
    pub fn new() -> Self {
        Self {
            mem: vec![0x5A; RAM_FLASH_SIZE],
            erased_pages: Vec::new(),
            writes: Vec::new(),
            fail_writes: false,
            corrupt_reads: false,
        }
    }
}

impl ErrorType for RamFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for RamFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.mem.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        bytes.copy_from_slice(&self.mem[start..end]);
        if self.corrupt_reads && !bytes.is_empty() {
            bytes[0] ^= 0x01;
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.mem.len()
    }
}

impl NorFlash for RamFlash {
    const WRITE_SIZE: usize = RAM_WORD_SIZE;
    const ERASE_SIZE: usize = RAM_PAGE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        let (from, to) = (from as usize, to as usize);
        if from % RAM_PAGE_SIZE != 0 || to % RAM_PAGE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        if to > self.mem.len() || from > to {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        self.mem[from..to].fill(0xFF);
        for page in from / RAM_PAGE_SIZE..to / RAM_PAGE_SIZE {
            self.erased_pages.push(page as u32);
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(NorFlashErrorKind::Other);
        }
        let start = offset as usize;
        if start % RAM_WORD_SIZE != 0 || bytes.len() % RAM_WORD_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        let end = start + bytes.len();
        if end > self.mem.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        for (cell, &b) in self.mem[start..end].iter_mut().zip(bytes) {
            *cell &= b;
        }
        self.writes.push((offset, bytes.len()));
        Ok(())
    }
}

pub type RamStore = NorFlashStore<RamFlash>;

pub fn ram_store() -> RamStore {
    NorFlashStore::new(RamFlash::new())
}

// =============================================================================
// Delay
// =============================================================================

/// Delay that only accounts for the requested time.
#[derive(Default)]
pub struct NoDelay {
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

// =============================================================================
// Packets
// =============================================================================

pub fn packet(kind: PacketKind, seq: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = [0u8; MAX_PACKET_LEN];
    let len = packet::encode(kind, seq, payload, CPMEOF, &mut buf).unwrap();
    buf[..len].to_vec()
}

/// Header packet (seq 0, SOH) announcing `name` of `size` bytes.
pub fn header(name: &str, size: u32) -> Vec<u8> {
    let mut payload = [0u8; PACKET_SIZE];
    packet::encode_header_payload(name.as_bytes(), size, &mut payload).unwrap();
    packet(PacketKind::Short, 0, &payload)
}

/// Header packet with an arbitrary raw payload.
pub fn raw_header(payload: &[u8]) -> Vec<u8> {
    let mut buf = [0u8; PACKET_SIZE];
    buf[..payload.len()].copy_from_slice(payload);
    let mut framed = [0u8; MAX_PACKET_LEN];
    let len = packet::encode(PacketKind::Short, 0, &buf, 0, &mut framed).unwrap();
    framed[..len].to_vec()
}

/// Deterministic payload for data packet `seq`.
pub fn pattern(seq: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31) ^ seq).collect()
}

// =============================================================================
// Board
// =============================================================================

/// Board whose reset panics, so `EntrySequencer::boot` can be observed.
pub struct MockBoard {
    pub supply: VecDeque<u16>,
    pub supply_reads: usize,
    pub link: Option<ScriptedLink>,
    pub store: RamStore,
    pub delay: NoDelay,
    pub hardware_ready: bool,
    pub transport_ready: bool,
    pub jumped_to: Option<u32>,
}

impl MockBoard {
    pub fn new(link: ScriptedLink) -> Self {
        Self {
            supply: VecDeque::new(),
            supply_reads: 0,
            link: Some(link),
            store: ram_store(),
            delay: NoDelay::default(),
            hardware_ready: false,
            transport_ready: false,
            jumped_to: None,
        }
    }
}

impl Board for MockBoard {
    type Link = ScriptedLink;
    type Flash = RamStore;
    type Delay = NoDelay;

    fn supply_sample(&mut self) -> u16 {
        self.supply_reads += 1;
        self.supply.pop_front().unwrap_or(u16::MAX)
    }

    fn init_hardware(&mut self) {
        self.hardware_ready = true;
    }

    fn init_transport(&mut self) -> Self::Link {
        self.transport_ready = true;
        self.link.take().unwrap_or_default()
    }

    fn flash_and_delay(&mut self) -> (&mut Self::Flash, &mut Self::Delay) {
        (&mut self.store, &mut self.delay)
    }

    fn jump_to_application(&mut self, entry: u32) {
        self.jumped_to = Some(entry);
    }

    fn system_reset(&mut self) -> ! {
        panic!("system reset");
    }
}

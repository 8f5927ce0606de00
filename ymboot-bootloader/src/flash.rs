// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! QSPI flash driver over the RP2040 ROM routines.
//!
//! On RP2040, flash operations (erase/program) require disabling XIP first.
//! The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash, so the
//! two entry points live in `.data` and the ROM function pointers are
//! resolved once by [`init`].
//!
//! [`RpFlash`] exposes the chip as a `NorFlash` with 4 KiB erase sectors and
//! 4-byte write words. The ROM programs whole 256-byte pages; partial writes
//! are merged into an 0xFF-filled page, which leaves the other bytes as they
//! are.

use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};
use ymboot_common::protocol::{FLASH_BASE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, FLASH_SIZE};

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// 4 KiB sector erase.
const SECTOR_ERASE_CMD: u8 = 0x20;

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup = core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
        *(0x18 as *const u16) as usize,
    );
    lookup(fn_table, u16::from_le_bytes(*tag) as u32)
}

/// Resolve the ROM flash routines. Must run once, with XIP active, before
/// any erase or program.
pub fn init() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE = core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

/// # Safety
/// [`init`] must have been called; `offset` and `size` are sector aligned.
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_erase(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_SECTOR_SIZE, SECTOR_ERASE_CMD);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// # Safety
/// [`init`] must have been called; `offset` and `len` are page aligned.
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_program(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// Handle to the on-board flash. Only offsets at or above `writable_from`
/// may be erased or programmed.
pub struct RpFlash {
    writable_from: u32,
}

impl RpFlash {
    /// [`init`] must have run before the first erase or write.
    pub fn new(writable_from: u32) -> Self {
        Self { writable_from }
    }

    fn check_writable(&self, from: u32, to: u32) -> Result<(), NorFlashErrorKind> {
        if from < self.writable_from || to > FLASH_SIZE || from > to {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        Ok(())
    }
}

impl ErrorType for RpFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for RpFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let end = offset
            .checked_add(bytes.len() as u32)
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        if end > FLASH_SIZE {
            return Err(NorFlashErrorKind::OutOfBounds);
        }

        let base = FLASH_BASE + offset;
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = unsafe { ((base + i as u32) as *const u8).read_volatile() };
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        FLASH_SIZE as usize
    }
}

impl NorFlash for RpFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.check_writable(from, to)?;
        if from % FLASH_SECTOR_SIZE != 0 || to % FLASH_SECTOR_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }

        unsafe { flash_erase(from, to - from) };
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let end = offset
            .checked_add(bytes.len() as u32)
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        self.check_writable(offset, end)?;
        if offset % Self::WRITE_SIZE as u32 != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }

        let mut pos = offset;
        let mut rest = bytes;
        while !rest.is_empty() {
            let page_start = pos - pos % FLASH_PAGE_SIZE;
            let in_page = (pos - page_start) as usize;
            let n = rest.len().min(FLASH_PAGE_SIZE as usize - in_page);

            let mut page = [0xFFu8; FLASH_PAGE_SIZE as usize];
            page[in_page..in_page + n].copy_from_slice(&rest[..n]);
            unsafe { flash_program(page_start, page.as_ptr(), page.len()) };

            pos += n as u32;
            rest = &rest[n..];
        }
        Ok(())
    }
}

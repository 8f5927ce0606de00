// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Non-volatile storage boundary and image programming.
//!
//! [`NvStore`] is the page/word oriented interface the receiver programs
//! through. [`NorFlashStore`] provides it for any
//! `embedded_storage::nor_flash::NorFlash` driver, mapping pages to erase
//! blocks and words to write units.

use embedded_storage::nor_flash::NorFlash;

use crate::crc16;

/// Page-erase, word-write, offset-read storage.
///
/// Offsets used by callers are always multiples of [`Self::WORD_SIZE`].
pub trait NvStore {
    /// Erase granularity in bytes.
    const PAGE_SIZE: u32;
    /// Write granularity in bytes.
    const WORD_SIZE: u32;

    type Error: core::fmt::Debug;

    /// Erase page `page` (byte range `page * PAGE_SIZE ..`).
    fn erase(&mut self, page: u32) -> Result<(), Self::Error>;

    /// Program `data.len() / WORD_SIZE` words starting at word index `word`.
    fn write(&mut self, word: u32, data: &[u8]) -> Result<(), Self::Error>;

    /// Read `buf.len()` bytes starting `offset` bytes into page `page`.
    fn read(&mut self, page: u32, offset: u32, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// [`NvStore`] over a NOR flash driver.
pub struct NorFlashStore<F> {
    flash: F,
}

impl<F: NorFlash> NorFlashStore<F> {
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    pub fn inner(&self) -> &F {
        &self.flash
    }

    pub fn inner_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F: NorFlash> NvStore for NorFlashStore<F> {
    const PAGE_SIZE: u32 = F::ERASE_SIZE as u32;
    const WORD_SIZE: u32 = F::WRITE_SIZE as u32;

    type Error = F::Error;

    fn erase(&mut self, page: u32) -> Result<(), Self::Error> {
        let from = page * Self::PAGE_SIZE;
        self.flash.erase(from, from + Self::PAGE_SIZE)
    }

    fn write(&mut self, word: u32, data: &[u8]) -> Result<(), Self::Error> {
        self.flash.write(word * Self::WORD_SIZE, data)
    }

    fn read(&mut self, page: u32, offset: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.flash.read(page * Self::PAGE_SIZE + offset, buf)
    }
}

/// Pages whose first byte lies inside `addr..addr + len`.
pub fn pages_starting_in(page_size: u32, addr: u32, len: u32) -> impl Iterator<Item = u32> {
    let first = addr.div_ceil(page_size);
    let end = (addr + len).div_ceil(page_size);
    first..end
}

/// Erase every page that `data` starts, then program `data` at `addr`.
pub fn program<S: NvStore>(store: &mut S, addr: u32, data: &[u8]) -> Result<(), S::Error> {
    debug_assert_eq!(addr % S::WORD_SIZE, 0);
    debug_assert_eq!(data.len() as u32 % S::WORD_SIZE, 0);

    for page in pages_starting_in(S::PAGE_SIZE, addr, data.len() as u32) {
        debug!("erase page {=u32}", page);
        store.erase(page)?;
    }

    store.write(addr / S::WORD_SIZE, data)
}

/// CRC-16 of `len` stored bytes starting at `addr`, read page by page.
pub fn stored_crc<S: NvStore>(store: &mut S, addr: u32, len: u32) -> Result<u16, S::Error> {
    let mut digest = crc16::digest();
    let mut chunk = [0u8; 128];
    let mut pos = addr;
    let end = addr + len;

    while pos < end {
        let offset = pos % S::PAGE_SIZE;
        let n = (end - pos)
            .min(S::PAGE_SIZE - offset)
            .min(chunk.len() as u32);
        let buf = &mut chunk[..n as usize];
        store.read(pos / S::PAGE_SIZE, offset, buf)?;
        digest.update(buf);
        pos += n;
    }

    Ok(digest.finalize())
}

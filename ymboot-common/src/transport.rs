// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Byte link to the host.

/// Blocking, unframed byte transport with receive deadlines.
pub trait Transport {
    /// Fill `buf`, waiting at most `timeout_ms` overall.
    ///
    /// Returns the number of bytes read; anything short of `buf.len()`
    /// means the deadline passed.
    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> usize;

    /// Send all of `buf`.
    fn send(&mut self, buf: &[u8]);

    /// Read a single byte.
    fn receive_byte(&mut self, timeout_ms: u32) -> Option<u8> {
        let mut byte = [0u8; 1];
        (self.receive(&mut byte, timeout_ms) == 1).then_some(byte[0])
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> usize {
        (**self).receive(buf, timeout_ms)
    }

    fn send(&mut self, buf: &[u8]) {
        (**self).send(buf)
    }
}

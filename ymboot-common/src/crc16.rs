// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! CRC-16/CCITT as used by YMODEM: polynomial 0x1021, initial value 0,
//! no reflection, no final XOR (the `XMODEM` catalogue entry).

use crc::{Crc, Digest, CRC_16_XMODEM};

pub static CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Checksum of a whole buffer.
pub fn checksum(data: &[u8]) -> u16 {
    CRC.checksum(data)
}

/// Incremental checksum for data read back in chunks.
pub fn digest() -> Digest<'static, u16> {
    CRC.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bit-by-bit reference form of the same CRC.
    fn reference(data: &[u8]) -> u16 {
        let mut crc: u16 = 0;
        for &byte in data {
            crc ^= (byte as u16) << 8;
            for _ in 0..8 {
                if crc & 0x8000 != 0 {
                    crc = (crc << 1) ^ 0x1021;
                } else {
                    crc <<= 1;
                }
            }
        }
        crc
    }

    #[test]
    fn test_empty_buffer_is_zero() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_check_value() {
        assert_eq!(checksum(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_matches_shift_register_form() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
        assert_eq!(checksum(&data), reference(&data));
        assert_eq!(checksum(&[0x1A; 128]), reference(&[0x1A; 128]));
    }

    #[test]
    fn test_digest_matches_one_shot() {
        let data: Vec<u8> = (0..200u8).collect();
        let mut digest = digest();
        for chunk in data.chunks(64) {
            digest.update(chunk);
        }
        assert_eq!(digest.finalize(), checksum(&data));
    }
}

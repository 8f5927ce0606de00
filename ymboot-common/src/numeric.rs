// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! ASCII integer parsing for the size field of the header packet.
//!
//! Accepted forms, each ended by a NUL or by the end of the input:
//! - `0x1F00` / `0X1f00`: up to 8 hex digits
//! - `4096`: up to 10 decimal digits
//! - `4k` / `4K`, `2m` / `2M`: decimal scaled by 1024 or 1024 * 1024; the
//!   suffix ends the number, whatever follows it is ignored

const MAX_HEX_DIGITS: usize = 8;
const MAX_DEC_DIGITS: usize = 10;

/// Parse `input`, returning `None` on any malformed or overflowing value.
pub fn parse_size(input: &[u8]) -> Option<u32> {
    match input {
        [b'0', b'x' | b'X', body @ ..] => parse_hex(body),
        _ => parse_decimal(input),
    }
}

fn at(input: &[u8], i: usize) -> u8 {
    input.get(i).copied().unwrap_or(0)
}

fn parse_hex(body: &[u8]) -> Option<u32> {
    if at(body, 0) == 0 {
        return None;
    }

    let mut value: u32 = 0;
    for i in 0..=MAX_HEX_DIGITS {
        let c = at(body, i);
        if c == 0 {
            return Some(value);
        }
        if i == MAX_HEX_DIGITS {
            break;
        }
        let digit = (c as char).to_digit(16)?;
        value = (value << 4) | digit;
    }

    None
}

fn parse_decimal(input: &[u8]) -> Option<u32> {
    let mut value: u32 = 0;
    for i in 0..=MAX_DEC_DIGITS {
        match at(input, i) {
            0 => return Some(value),
            b'k' | b'K' if i > 0 => return value.checked_mul(1024),
            b'm' | b'M' if i > 0 => return value.checked_mul(1024 * 1024),
            c @ b'0'..=b'9' if i < MAX_DEC_DIGITS => {
                value = value.checked_mul(10)?.checked_add((c - b'0') as u32)?;
            }
            _ => return None,
        }
    }

    None
}

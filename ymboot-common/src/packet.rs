// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! YMODEM packet framing.
//!
//! A packet on the wire is `[designator][seq][!seq][payload][crc_hi][crc_lo]`.
//! The receiver reads the designator on its own, then the rest of the packet
//! (the "body") in one go; [`Packet::parse`] works on that body.

use heapless::Vec;

use crate::crc16;
use crate::protocol::{
    FILE_NAME_LENGTH, FILE_SIZE_LENGTH, PACKET_1K_SIZE, PACKET_HEADER, PACKET_SIZE,
    PACKET_TRAILER, SOH, STX,
};

/// Payload size announced by the designator byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketKind {
    /// SOH, 128 bytes.
    Short,
    /// STX, 1024 bytes.
    Long,
}

impl PacketKind {
    pub fn from_designator(byte: u8) -> Option<Self> {
        match byte {
            SOH => Some(Self::Short),
            STX => Some(Self::Long),
            _ => None,
        }
    }

    pub fn designator(self) -> u8 {
        match self {
            Self::Short => SOH,
            Self::Long => STX,
        }
    }

    pub fn payload_len(self) -> usize {
        match self {
            Self::Short => PACKET_SIZE,
            Self::Long => PACKET_1K_SIZE,
        }
    }

    /// Bytes following the designator.
    pub fn body_len(self) -> usize {
        self.payload_len() + PACKET_HEADER - 1 + PACKET_TRAILER
    }

    /// Whole packet including the designator.
    pub fn wire_len(self) -> usize {
        self.body_len() + 1
    }
}

/// Why a packet body was rejected. All of these are retransmit conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Fewer bytes arrived than the designator announced.
    Short { got: usize },
    /// The complement byte does not match the sequence byte.
    Complement { seq: u8, complement: u8 },
    /// The trailing CRC does not match the payload.
    Crc { expected: u16, actual: u16 },
}

/// A structurally valid packet borrowed from the receive buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet<'a> {
    pub kind: PacketKind,
    pub seq: u8,
    pub payload: &'a [u8],
    /// CRC as transmitted (big-endian on the wire).
    pub crc: u16,
}

impl<'a> Packet<'a> {
    /// Validate a body of `kind`: length, sequence complement and CRC.
    pub fn parse(kind: PacketKind, body: &'a [u8]) -> Result<Self, FrameError> {
        if body.len() < kind.body_len() {
            return Err(FrameError::Short { got: body.len() });
        }

        let seq = body[0];
        let complement = body[1];
        if seq != !complement {
            return Err(FrameError::Complement { seq, complement });
        }

        let payload_end = 2 + kind.payload_len();
        let payload = &body[2..payload_end];
        let crc = u16::from_be_bytes([body[payload_end], body[payload_end + 1]]);
        let actual = crc16::checksum(payload);
        if actual != crc {
            return Err(FrameError::Crc {
                expected: crc,
                actual,
            });
        }

        Ok(Self {
            kind,
            seq,
            payload,
            crc,
        })
    }
}

/// Frame `payload` as a packet of `kind` into `out`, padding the payload
/// with `pad`. Returns the number of bytes written, or `None` when the
/// payload does not fit the kind or `out` is too small.
pub fn encode(kind: PacketKind, seq: u8, payload: &[u8], pad: u8, out: &mut [u8]) -> Option<usize> {
    let len = kind.wire_len();
    if payload.len() > kind.payload_len() || out.len() < len {
        return None;
    }

    out[0] = kind.designator();
    out[1] = seq;
    out[2] = !seq;

    let data = &mut out[PACKET_HEADER..PACKET_HEADER + kind.payload_len()];
    data[..payload.len()].copy_from_slice(payload);
    data[payload.len()..].fill(pad);

    let crc = crc16::checksum(data);
    out[len - 2..len].copy_from_slice(&crc.to_be_bytes());

    Some(len)
}

/// File metadata carried by the header packet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// File name, truncated to [`FILE_NAME_LENGTH`].
    pub name: Vec<u8, FILE_NAME_LENGTH>,
    /// Raw size field, truncated to [`FILE_SIZE_LENGTH`].
    pub size_field: Vec<u8, FILE_SIZE_LENGTH>,
}

impl FileInfo {
    /// Split a header payload `name\0size[ ...]\0`.
    ///
    /// Missing terminators end the field at the end of the payload; the
    /// stored copies are truncated to their capacity and never overrun.
    pub fn parse(payload: &[u8]) -> Self {
        let name_len = field_len(payload, |b| b == 0);
        let name = &payload[..name_len];

        let rest = payload.get(name_len + 1..).unwrap_or(&[]);
        let size_len = field_len(rest, |b| b == 0 || b == b' ');
        let size = &rest[..size_len];

        Self {
            name: bounded_copy(name),
            size_field: bounded_copy(size),
        }
    }
}

/// Write `name\0size\0` into a header payload buffer, returning the used
/// length. `None` if it does not fit.
pub fn encode_header_payload(name: &[u8], size: u32, out: &mut [u8]) -> Option<usize> {
    let mut digits = [0u8; 10];
    let mut n = size;
    let mut start = digits.len();
    loop {
        start -= 1;
        digits[start] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    let digits = &digits[start..];

    let len = name.len() + 1 + digits.len() + 1;
    if len > out.len() || name.contains(&0) {
        return None;
    }

    out[..name.len()].copy_from_slice(name);
    out[name.len()] = 0;
    let size_at = name.len() + 1;
    out[size_at..size_at + digits.len()].copy_from_slice(digits);
    out[len - 1] = 0;

    Some(len)
}

fn field_len(data: &[u8], is_end: impl Fn(u8) -> bool) -> usize {
    data.iter().position(|&b| is_end(b)).unwrap_or(data.len())
}

fn bounded_copy<const N: usize>(src: &[u8]) -> Vec<u8, N> {
    let take = src.len().min(N);
    let mut dst = Vec::new();
    // Cannot fail: `take` never exceeds the capacity.
    let _ = dst.extend_from_slice(&src[..take]);
    dst
}

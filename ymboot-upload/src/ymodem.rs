// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Sender side of the upload protocol: activation handshake, header
//! packet, 1K data packets and EOT.

use std::io::{ErrorKind, Read, Write};

use anyhow::{bail, Context, Result};
use ymboot_common::packet::{self, PacketKind};
use ymboot_common::protocol::{
    ABORT1, ACK, ACTIVATION_CODE, CA, CPMEOF, CRC16, EOT, PACKET_SIZE, START_COMMAND,
};

/// Attempts per packet before giving up.
pub const MAX_RETRIES: u32 = 10;

/// One byte from the device, `None` on timeout.
fn read_byte<P: Read>(port: &mut P) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match port.read(&mut byte) {
            Ok(1) => return Ok(Some(byte[0])),
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Serial read error"),
        }
    }
}

fn write_all<P: Write>(port: &mut P, bytes: &[u8]) -> Result<()> {
    port.write_all(bytes)
        .context("Failed to write to serial port")?;
    port.flush()?;
    Ok(())
}

fn frame(kind: PacketKind, seq: u8, payload: &[u8], pad: u8) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; kind.wire_len()];
    packet::encode(kind, seq, payload, pad, &mut buf)
        .with_context(|| format!("{} bytes do not fit a {:?} packet", payload.len(), kind))?;
    Ok(buf)
}

/// The device answered with CA: swallow the second one and report.
fn cancelled<P: Read>(port: &mut P, what: &str) -> anyhow::Error {
    let _ = read_byte(port);
    anyhow::anyhow!("Device cancelled the transfer during {}", what)
}

/// Request an upgrade: activation code, start command, then the device's ACK.
pub fn activate<P: Read + Write>(port: &mut P) -> Result<()> {
    write_all(port, &ACTIVATION_CODE)?;
    write_all(port, &[START_COMMAND])?;

    match read_byte(port)? {
        Some(ACK) => Ok(()),
        Some(b) => bail!("Unexpected reply 0x{:02x} to start command", b),
        None => bail!("No answer to activation (reset the device right before uploading)"),
    }
}

/// Send the header packet announcing `name` of `size` bytes.
pub fn send_header<P: Read + Write>(port: &mut P, name: &str, size: u32) -> Result<()> {
    let mut payload = [0u8; PACKET_SIZE];
    packet::encode_header_payload(name.as_bytes(), size, &mut payload)
        .with_context(|| format!("File name {:?} does not fit the header packet", name))?;
    let frame = frame(PacketKind::Short, 0, &payload, 0)?;

    for _ in 0..MAX_RETRIES {
        write_all(port, &frame)?;
        match read_byte(port)? {
            Some(ACK) => match read_byte(port)? {
                Some(CRC16) => return Ok(()),
                other => bail!("Expected 'C' after header ACK, got {:02x?}", other),
            },
            Some(CA) => {
                let _ = read_byte(port);
                bail!("Device refused the image (empty name or larger than the application area)");
            }
            _ => continue,
        }
    }

    bail!("Header not acknowledged after {} attempts", MAX_RETRIES)
}

fn send_packet<P: Read + Write>(port: &mut P, frame: &[u8]) -> Result<()> {
    for _ in 0..MAX_RETRIES {
        write_all(port, frame)?;
        match read_byte(port)? {
            Some(ACK) => return Ok(()),
            Some(CA) => return Err(cancelled(port, "data")),
            _ => continue,
        }
    }

    bail!("No ACK after {} attempts", MAX_RETRIES)
}

/// Send `data` as numbered packets: 1K while more than 128 bytes remain,
/// a 128-byte packet for a short tail. `on_progress` gets the byte count
/// acknowledged so far.
pub fn send_data<P: Read + Write>(
    port: &mut P,
    data: &[u8],
    mut on_progress: impl FnMut(usize),
) -> Result<()> {
    let mut offset = 0;
    let mut seq: u8 = 1;

    while offset < data.len() {
        let remaining = data.len() - offset;
        let kind = if remaining <= PACKET_SIZE {
            PacketKind::Short
        } else {
            PacketKind::Long
        };
        let chunk = &data[offset..offset + remaining.min(kind.payload_len())];

        let frame = frame(kind, seq, chunk, CPMEOF)?;
        send_packet(port, &frame)
            .with_context(|| format!("Packet {} at offset {}", seq, offset))?;

        offset += chunk.len();
        seq = seq.wrapping_add(1);
        on_progress(offset);
    }

    Ok(())
}

/// End of transmission.
pub fn finish<P: Read + Write>(port: &mut P) -> Result<()> {
    for _ in 0..MAX_RETRIES {
        write_all(port, &[EOT])?;
        match read_byte(port)? {
            Some(ACK) => return Ok(()),
            Some(CA) => return Err(cancelled(port, "EOT")),
            _ => continue,
        }
    }

    bail!("EOT not acknowledged after {} attempts", MAX_RETRIES)
}

/// Full upload: handshake, header, data, EOT.
pub fn upload<P: Read + Write>(
    port: &mut P,
    name: &str,
    data: &[u8],
    on_progress: impl FnMut(usize),
) -> Result<()> {
    let size = u32::try_from(data.len()).context("Image larger than 4 GiB")?;

    activate(port)?;
    send_header(port, name, size)?;
    send_data(port, data, on_progress)?;
    finish(port)
}

/// Ask a running session to stop. Returns whether the device confirmed.
pub fn abort<P: Read + Write>(port: &mut P) -> Result<bool> {
    write_all(port, &[ABORT1])?;
    Ok(read_byte(port)? == Some(CA))
}

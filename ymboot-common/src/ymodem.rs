// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! YMODEM receive state machine - pure logic plus a blocking driver.
//!
//! [`Receiver::step`] consumes one input (a designator byte, a packet body,
//! or a timeout), updates the [`TransferSession`], programs flash for data
//! packets and returns the bytes to answer with. It never touches the link
//! or a clock, which keeps it testable byte by byte. [`Receiver::run`] is
//! the driver that reads from a [`Transport`] according to the current
//! state and sends the replies.
//!
//! Every recoverable problem (short read, bad sequence, bad CRC, flash
//! failure, stray byte, timeout) is answered with a `C` retransmit request
//! and counts against one session-wide error budget.

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::config::{Layout, Timeouts};
use crate::numeric;
use crate::packet::{FileInfo, FrameError, Packet, PacketKind};
use crate::protocol::{
    ABORT1, ABORT2, ACK, CA, CRC16, DOUBLE_CANCEL, EOT, FILE_NAME_LENGTH, FILE_SIZE_LENGTH,
    HEADER_ACK, MAX_PACKET_LEN,
};
use crate::storage::{self, NvStore};
use crate::transport::Transport;

/// How a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionResult {
    /// EOT received after the image.
    Success,
    /// The header packet carried no file name: the sender had nothing to send.
    FilenameEmpty,
    /// The announced size, or the data actually sent, exceeds the image capacity.
    FileTooLarge,
    /// The error budget ran out.
    TooManyErrors,
    /// The host cancelled or aborted.
    UserAbort,
}

/// Receiver states. `Done` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiverState {
    AwaitPacketStart,
    ReceivePacketBody(PacketKind),
    AwaitCancelConfirm,
    Done(SessionResult),
}

/// One event fed to the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Byte(u8),
    /// Bytes read after a designator; shorter than expected on timeout.
    Body(&'a [u8]),
    Timeout,
}

/// Bytes to send back, optionally after the ACK delay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    bytes: Vec<u8, 4>,
    delayed: bool,
}

impl Reply {
    fn none() -> Self {
        Self::default()
    }

    fn bytes(bytes: &[u8]) -> Self {
        let mut reply = Self::default();
        reply.push(bytes);
        reply
    }

    fn push(&mut self, bytes: &[u8]) {
        // Replies are at most three bytes.
        let _ = self.bytes.extend_from_slice(bytes);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the ACK delay must elapse before sending.
    pub fn is_delayed(&self) -> bool {
        self.delayed
    }
}

/// Result of one [`Receiver::step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: ReceiverState,
    pub reply: Reply,
}

/// Mutable state of one upload, owned by the receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferSession {
    /// Storage offset the next data packet is written to.
    pub cursor: u32,
    /// Packets accepted so far, header included.
    pub packets_received: u32,
    /// Recoverable errors so far.
    pub errors: u32,
    pub file_name: Vec<u8, FILE_NAME_LENGTH>,
    /// Size field as received.
    pub size_field: Vec<u8, FILE_SIZE_LENGTH>,
    /// Parsed size; 0 when the field was missing or unparseable.
    pub file_size: u32,
    base: u32,
}

impl TransferSession {
    pub fn new(base: u32) -> Self {
        Self {
            cursor: base,
            packets_received: 0,
            errors: 0,
            file_name: Vec::new(),
            size_field: Vec::new(),
            file_size: 0,
            base,
        }
    }

    /// Sequence number the next packet must carry.
    pub fn expected_seq(&self) -> u8 {
        (self.packets_received & 0xFF) as u8
    }

    pub fn bytes_written(&self) -> u32 {
        self.cursor - self.base
    }
}

/// YMODEM receiver for a single session.
pub struct Receiver {
    state: ReceiverState,
    session: TransferSession,
    layout: Layout,
    max_errors: u32,
}

impl Receiver {
    pub fn new(layout: Layout, max_errors: u32) -> Self {
        Self {
            state: ReceiverState::AwaitPacketStart,
            session: TransferSession::new(layout.base),
            layout,
            max_errors,
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    pub fn into_session(self) -> TransferSession {
        self.session
    }

    /// Terminal result, once reached.
    pub fn result(&self) -> Option<SessionResult> {
        match self.state {
            ReceiverState::Done(result) => Some(result),
            _ => None,
        }
    }

    /// Feed one input and move to the next state.
    ///
    /// Inputs after a terminal state are ignored.
    pub fn step<S: NvStore>(&mut self, store: &mut S, input: Input<'_>) -> Transition {
        let transition = match (self.state, input) {
            (ReceiverState::Done(_), _) => Transition {
                next: self.state,
                reply: Reply::none(),
            },
            (ReceiverState::AwaitPacketStart, Input::Byte(byte)) => self.on_designator(byte),
            (ReceiverState::AwaitPacketStart, _) => self.transport_error(),
            (ReceiverState::ReceivePacketBody(kind), Input::Body(body)) => {
                self.on_body(store, kind, body)
            }
            (ReceiverState::ReceivePacketBody(_), _) => self.transport_error(),
            (ReceiverState::AwaitCancelConfirm, Input::Byte(CA)) => {
                info!("transfer cancelled by host");
                finish(SessionResult::UserAbort, &[ACK])
            }
            (ReceiverState::AwaitCancelConfirm, _) => self.transport_error(),
        };

        self.state = transition.next;
        transition
    }

    fn on_designator(&mut self, byte: u8) -> Transition {
        if let Some(kind) = PacketKind::from_designator(byte) {
            return Transition {
                next: ReceiverState::ReceivePacketBody(kind),
                reply: Reply::none(),
            };
        }

        match byte {
            EOT => {
                info!(
                    "transfer complete: {=u32} bytes written",
                    self.session.bytes_written()
                );
                finish(SessionResult::Success, &[ACK])
            }
            CA => Transition {
                next: ReceiverState::AwaitCancelConfirm,
                reply: Reply::none(),
            },
            ABORT1 | ABORT2 => {
                info!("transfer aborted by host");
                finish(SessionResult::UserAbort, &DOUBLE_CANCEL)
            }
            _ => self.transport_error(),
        }
    }

    fn on_body<S: NvStore>(&mut self, store: &mut S, kind: PacketKind, body: &[u8]) -> Transition {
        let packet = match Packet::parse(kind, body) {
            Ok(packet) => packet,
            Err(err) => {
                log_frame_error(err);
                return self.transport_error();
            }
        };

        if packet.seq != self.session.expected_seq() {
            debug!(
                "sequence {=u8}, expected {=u8}",
                packet.seq,
                self.session.expected_seq()
            );
            return self.transport_error();
        }

        if self.session.packets_received == 0 {
            self.on_header(packet)
        } else {
            self.on_data(store, packet)
        }
    }

    fn on_header(&mut self, packet: Packet<'_>) -> Transition {
        if packet.payload[0] == 0 {
            info!("empty header, nothing to receive");
            return finish(SessionResult::FilenameEmpty, &DOUBLE_CANCEL);
        }

        let info = FileInfo::parse(packet.payload);
        let file_size = numeric::parse_size(&info.size_field).unwrap_or_else(|| {
            warn!("unparseable size field, size unknown");
            0
        });
        self.session.file_name = info.name;
        self.session.size_field = info.size_field;
        self.session.file_size = file_size;

        if file_size > self.layout.capacity {
            warn!(
                "image of {=u32} bytes exceeds capacity {=u32}",
                file_size,
                self.layout.capacity
            );
            return finish(SessionResult::FileTooLarge, &DOUBLE_CANCEL);
        }

        info!(
            "receiving {=[u8]:a} ({=u32} bytes)",
            &self.session.file_name[..],
            file_size
        );
        self.session.packets_received += 1;

        let mut reply = Reply::bytes(&HEADER_ACK);
        reply.delayed = true;
        Transition {
            next: ReceiverState::AwaitPacketStart,
            reply,
        }
    }

    fn on_data<S: NvStore>(&mut self, store: &mut S, packet: Packet<'_>) -> Transition {
        let addr = self.session.cursor;
        let len = packet.payload.len() as u32;

        if addr.checked_add(len).map_or(true, |end| end > self.layout.end()) {
            warn!("data beyond image capacity at {=u32}", addr);
            return finish(SessionResult::FileTooLarge, &DOUBLE_CANCEL);
        }

        if let Err(_err) = storage::program(store, addr, packet.payload) {
            warn!("flash program failed at {=u32}", addr);
            return self.transport_error();
        }

        match storage::stored_crc(store, addr, len) {
            Ok(crc) if crc == packet.crc => {}
            Ok(crc) => {
                warn!(
                    "read-back CRC {=u16:#06x} != {=u16:#06x} at {=u32}",
                    crc,
                    packet.crc,
                    addr
                );
                return self.transport_error();
            }
            Err(_err) => {
                warn!("flash read-back failed at {=u32}", addr);
                return self.transport_error();
            }
        }

        self.session.cursor += len;
        self.session.packets_received += 1;
        Transition {
            next: ReceiverState::AwaitPacketStart,
            reply: Reply::bytes(&[ACK]),
        }
    }

    /// Ask for a retransmit and charge the error budget.
    fn transport_error(&mut self) -> Transition {
        self.session.errors += 1;
        let mut reply = Reply::bytes(&[CRC16]);

        if self.session.errors > self.max_errors {
            warn!("too many errors ({=u32}), giving up", self.session.errors);
            reply.push(&DOUBLE_CANCEL);
            return Transition {
                next: ReceiverState::Done(SessionResult::TooManyErrors),
                reply,
            };
        }

        Transition {
            next: ReceiverState::AwaitPacketStart,
            reply,
        }
    }

    /// Run the session to a terminal result over `link`.
    pub fn run<T, S, D>(
        &mut self,
        link: &mut T,
        store: &mut S,
        delay: &mut D,
        timeouts: &Timeouts,
    ) -> SessionResult
    where
        T: Transport,
        S: NvStore,
        D: DelayNs,
    {
        let mut buf = [0u8; MAX_PACKET_LEN];

        loop {
            let transition = match self.state {
                ReceiverState::Done(result) => return result,
                ReceiverState::AwaitPacketStart => {
                    let input = read_byte(link, timeouts.download_ms);
                    self.step(store, input)
                }
                ReceiverState::ReceivePacketBody(kind) => {
                    let body = &mut buf[..kind.body_len()];
                    let n = link.receive(body, timeouts.download_ms);
                    self.step(store, Input::Body(&body[..n]))
                }
                ReceiverState::AwaitCancelConfirm => {
                    let input = read_byte(link, timeouts.packet_ms);
                    self.step(store, input)
                }
            };

            let reply = transition.reply;
            if reply.is_delayed() {
                delay.delay_us(timeouts.ack_delay_us);
            }
            if !reply.is_empty() {
                link.send(reply.as_bytes());
            }
        }
    }
}

fn read_byte<T: Transport>(link: &mut T, timeout_ms: u32) -> Input<'static> {
    match link.receive_byte(timeout_ms) {
        Some(byte) => Input::Byte(byte),
        None => Input::Timeout,
    }
}

fn finish(result: SessionResult, reply: &[u8]) -> Transition {
    Transition {
        next: ReceiverState::Done(result),
        reply: Reply::bytes(reply),
    }
}

fn log_frame_error(err: FrameError) {
    match err {
        FrameError::Short { got } => debug!("short packet: {=usize} bytes", got),
        FrameError::Complement { seq, complement } => {
            debug!("bad complement {=u8:#04x} for seq {=u8}", complement, seq)
        }
        FrameError::Crc { expected, actual } => {
            debug!("packet CRC {=u16:#06x}, computed {=u16:#06x}", expected, actual)
        }
    }
}

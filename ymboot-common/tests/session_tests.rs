// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the upgrade handshake in front of the receiver.

mod common;

use std::cell::RefCell;

use common::{header, packet, pattern, raw_header, ram_store, NoDelay, ScriptedLink};
use ymboot_common::config::{BootConfig, Layout};
use ymboot_common::packet::PacketKind;
use ymboot_common::protocol::{
    ABORT1, ACK, ACTIVATION_CODE, ACTIVATION_TIMEOUT_MS, CA, CRC16, EOT, PACKET_SIZE,
    START_COMMAND,
};
use ymboot_common::session::{SessionController, SessionOutcome};
use ymboot_common::ymodem::SessionResult;

fn config() -> BootConfig {
    BootConfig {
        layout: Layout {
            base: 4096,
            capacity: 16 * 1024,
        },
        start_command_polls: Some(3),
        ..Default::default()
    }
}

fn run(config: BootConfig, link: &mut ScriptedLink) -> (Option<SessionOutcome>, Vec<SessionOutcome>) {
    let mut store = ram_store();
    let mut delay = NoDelay::default();
    let seen = RefCell::new(Vec::new());

    let outcome = SessionController::new(config).run(link, &mut store, &mut delay, |o| {
        seen.borrow_mut().push(o.clone())
    });
    (outcome, seen.into_inner())
}

// =============================================================================
// Activation
// =============================================================================

#[test]
fn test_silent_link_is_normal_boot() {
    let mut link = ScriptedLink::new();

    let (outcome, seen) = run(config(), &mut link);

    assert!(outcome.is_none());
    assert!(seen.is_empty());
    assert!(link.sent.is_empty());
    assert_eq!(link.timeouts_seen, vec![ACTIVATION_TIMEOUT_MS]);
}

#[test]
fn test_wrong_activation_code_is_normal_boot() {
    let mut link = ScriptedLink::new();
    link.push(&[0x41, 0x36]).push(&[START_COMMAND]);

    let (outcome, _) = run(config(), &mut link);

    assert!(outcome.is_none());
    assert!(link.sent.is_empty());
}

#[test]
fn test_partial_activation_code_is_normal_boot() {
    let mut link = ScriptedLink::new();
    link.push(&ACTIVATION_CODE[..1]);

    let (outcome, _) = run(config(), &mut link);
    assert!(outcome.is_none());
}

// =============================================================================
// Start command
// =============================================================================

#[test]
fn test_missing_start_command_gives_up_after_polls() {
    let mut link = ScriptedLink::new();
    link.push(&ACTIVATION_CODE);

    let (outcome, seen) = run(config(), &mut link);

    assert!(outcome.is_none());
    assert!(seen.is_empty());
    assert!(link.sent.is_empty());
    // Activation read plus three polls.
    assert_eq!(link.receive_calls, 4);
}

#[test]
fn test_other_bytes_before_start_command_are_ignored() {
    let mut link = ScriptedLink::new();
    link.push(&ACTIVATION_CODE)
        .push(b"xy")
        .push(&[START_COMMAND])
        .push(&[ABORT1]);

    let (outcome, _) = run(config(), &mut link);

    let outcome = outcome.unwrap();
    assert_eq!(outcome.result, SessionResult::UserAbort);
    assert_eq!(link.sent, vec![ACK, CA, CA]);
}

#[test]
fn test_unbounded_start_wait() {
    let mut link = ScriptedLink::new();
    link.push(&ACTIVATION_CODE);
    for _ in 0..20 {
        link.push_timeout();
    }
    link.push(&[START_COMMAND]).push(&[ABORT1]);

    let config = BootConfig {
        start_command_polls: None,
        ..config()
    };
    let (outcome, _) = run(config, &mut link);

    assert_eq!(outcome.map(|o| o.result), Some(SessionResult::UserAbort));
}

// =============================================================================
// Transfer
// =============================================================================

#[test]
fn test_full_upgrade_reports_outcome() {
    let data = pattern(1, PACKET_SIZE);
    let mut link = ScriptedLink::new();
    link.push(&ACTIVATION_CODE)
        .push(&[START_COMMAND])
        .push(&header("app.bin", 128))
        .push(&packet(PacketKind::Short, 1, &data))
        .push(&[EOT]);

    let (outcome, seen) = run(config(), &mut link);

    let outcome = outcome.unwrap();
    assert_eq!(outcome.result, SessionResult::Success);
    assert_eq!(&outcome.session.file_name[..], b"app.bin");
    assert_eq!(outcome.session.bytes_written(), 128);
    assert_eq!(seen, vec![outcome]);
    assert_eq!(link.sent, vec![ACK, ACK, CRC16, ACK, ACK]);
}

#[test]
fn test_start_and_header_acks_are_delayed() {
    let mut store = ram_store();
    let mut delay = NoDelay::default();
    let mut link = ScriptedLink::new();
    link.push(&ACTIVATION_CODE)
        .push(&[START_COMMAND])
        .push(&header("app.bin", 128))
        .push(&[EOT]);

    SessionController::new(config()).run(&mut link, &mut store, &mut delay, |_| {});

    assert_eq!(delay.total_ns, 2 * 10_000 * 1_000);
}

#[test]
fn test_empty_header_is_reported() {
    let mut link = ScriptedLink::new();
    link.push(&ACTIVATION_CODE)
        .push(&[START_COMMAND])
        .push(&raw_header(&[0]));

    let (outcome, seen) = run(config(), &mut link);

    assert_eq!(outcome.unwrap().result, SessionResult::FilenameEmpty);
    assert_eq!(seen.len(), 1);
    assert_eq!(link.sent, vec![ACK, CA, CA]);
}

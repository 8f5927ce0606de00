// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the supply gate and the boot entry sequence.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use common::{header, packet, pattern, MockBoard, ScriptedLink};
use ymboot_common::config::{BootConfig, Layout};
use ymboot_common::entry::{EntrySequencer, VoltageGate};
use ymboot_common::packet::PacketKind;
use ymboot_common::protocol::{
    ACTIVATION_CODE, APP_ENTRY_ADDR, EOT, PACKET_SIZE, START_COMMAND, SUPPLY_STABLE_SAMPLES,
};
use ymboot_common::ymodem::SessionResult;

const THRESHOLD: u16 = 1241;

fn config() -> BootConfig {
    BootConfig {
        layout: Layout {
            base: 4096,
            capacity: 16 * 1024,
        },
        vdd_min: THRESHOLD,
        ..Default::default()
    }
}

fn samples(values: &[u16]) -> impl FnMut() -> u16 + '_ {
    let mut it = values.iter().copied();
    move || it.next().unwrap_or(u16::MAX)
}

// =============================================================================
// VoltageGate
// =============================================================================

#[test]
fn test_gate_needs_stable_run() {
    let mut gate = VoltageGate::new();

    let taken = gate.wait(THRESHOLD, samples(&[]));

    assert_eq!(taken, SUPPLY_STABLE_SAMPLES as u32);
    assert_eq!(gate.verified(), Some(THRESHOLD));
}

#[test]
fn test_gate_low_sample_restarts_count() {
    let mut readings = vec![THRESHOLD; 10];
    readings.push(THRESHOLD - 1);
    let mut gate = VoltageGate::new();

    let taken = gate.wait(THRESHOLD, samples(&readings));

    assert_eq!(taken, 11 + SUPPLY_STABLE_SAMPLES as u32);
}

#[test]
fn test_gate_threshold_is_inclusive() {
    let readings = vec![THRESHOLD; SUPPLY_STABLE_SAMPLES as usize];
    let mut gate = VoltageGate::new();

    assert_eq!(
        gate.wait(THRESHOLD, samples(&readings)),
        SUPPLY_STABLE_SAMPLES as u32
    );
}

#[test]
fn test_gate_caches_verified_threshold() {
    let mut gate = VoltageGate::new();
    gate.wait(THRESHOLD, samples(&[]));

    let mut called = false;
    let taken = gate.wait(THRESHOLD, || {
        called = true;
        0
    });
    assert_eq!(taken, 0);
    assert!(!called);

    assert_eq!(gate.wait(THRESHOLD - 100, samples(&[0])), 0);
    assert_eq!(gate.verified(), Some(THRESHOLD));
}

#[test]
fn test_gate_higher_threshold_is_verified_again() {
    let mut gate = VoltageGate::new();
    gate.wait(THRESHOLD, samples(&[]));

    let taken = gate.wait(THRESHOLD + 1, samples(&[THRESHOLD]));

    assert_eq!(taken, 1 + SUPPLY_STABLE_SAMPLES as u32);
    assert_eq!(gate.verified(), Some(THRESHOLD + 1));
}

// =============================================================================
// EntrySequencer
// =============================================================================

#[test]
fn test_prepare_without_host_is_normal_boot() {
    let mut board = MockBoard::new(ScriptedLink::new());
    board.supply.extend([0, 100, 0]);
    let mut seq = EntrySequencer::new(config());

    let outcome = seq.prepare(&mut board, |_| panic!("no session expected"));

    assert!(outcome.is_none());
    assert_eq!(board.supply_reads, 3 + SUPPLY_STABLE_SAMPLES as usize);
    assert!(board.hardware_ready);
    assert!(board.transport_ready);
    assert_eq!(seq.gate().verified(), Some(THRESHOLD));
}

#[test]
fn test_prepare_runs_upgrade() {
    let data = pattern(7, PACKET_SIZE);
    let mut link = ScriptedLink::new();
    link.push(&ACTIVATION_CODE)
        .push(&[START_COMMAND])
        .push(&header("app.bin", 128))
        .push(&packet(PacketKind::Short, 1, &data))
        .push(&[EOT]);
    let mut board = MockBoard::new(link);
    let mut seq = EntrySequencer::new(config());
    let mut reported = None;

    let outcome = seq.prepare(&mut board, |o| reported = Some(o.result));

    assert_eq!(outcome.map(|o| o.result), Some(SessionResult::Success));
    assert_eq!(reported, Some(SessionResult::Success));
    assert_eq!(&board.store.inner().mem[4096..4096 + PACKET_SIZE], &data[..]);
}

#[test]
fn test_second_prepare_skips_supply_check() {
    let mut board = MockBoard::new(ScriptedLink::new());
    let mut seq = EntrySequencer::new(config());

    seq.prepare(&mut board, |_| {});
    let reads = board.supply_reads;
    seq.prepare(&mut board, |_| {});

    assert_eq!(board.supply_reads, reads);
}

#[test]
#[should_panic(expected = "system reset")]
fn test_boot_resets_when_application_returns() {
    let mut board = MockBoard::new(ScriptedLink::new());
    EntrySequencer::new(config()).boot(&mut board, |_| {});
}

#[test]
fn test_boot_jumps_to_configured_entry() {
    let mut board = MockBoard::new(ScriptedLink::new());
    let mut seq = EntrySequencer::new(config());

    let result = catch_unwind(AssertUnwindSafe(|| seq.boot(&mut board, |_| {})));

    assert!(result.is_err());
    assert_eq!(board.jumped_to, Some(APP_ENTRY_ADDR));
}

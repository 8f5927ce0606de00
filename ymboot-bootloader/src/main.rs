// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! ymboot: YMODEM upload bootloader for RP2040 over USB CDC.

#![no_std]
#![no_main]

mod boot;
mod flash;
mod peripherals;
mod usb_transport;

use defmt_rtt as _;
use panic_probe as _;
use ymboot_common::{BootConfig, EntrySequencer, SessionOutcome, Timeouts};

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

/// USB enumeration eats into the activation window; give the host time to
/// open the port.
const USB_ACTIVATION_TIMEOUT_MS: u32 = 3000;

fn report(outcome: &SessionOutcome) {
    defmt::println!(
        "Session ended: {} after {=u32} packets, {=u32} bytes, {=u32} errors",
        outcome.result,
        outcome.session.packets_received,
        outcome.session.bytes_written(),
        outcome.session.errors
    );
}

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader init");

    let mut p = peripherals::init();

    let config = BootConfig {
        timeouts: Timeouts {
            activation_ms: USB_ACTIVATION_TIMEOUT_MS,
            ..Timeouts::default()
        },
        ..BootConfig::default()
    };

    EntrySequencer::new(config).boot(&mut p, report)
}

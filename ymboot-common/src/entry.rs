// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Reset-to-application sequence: supply gate, board bring-up, optional
//! upgrade session, then hand-off.

use embedded_hal::delay::DelayNs;

use crate::config::BootConfig;
use crate::protocol::SUPPLY_STABLE_SAMPLES;
use crate::session::{SessionController, SessionOutcome};
use crate::storage::NvStore;
use crate::transport::Transport;

/// Hardware the sequencer drives.
pub trait Board {
    type Link: Transport;
    type Flash: NvStore;
    type Delay: DelayNs;

    /// One raw supply-voltage sample.
    fn supply_sample(&mut self) -> u16;

    fn init_hardware(&mut self);

    /// Bring up the host link.
    fn init_transport(&mut self) -> Self::Link;

    fn flash_and_delay(&mut self) -> (&mut Self::Flash, &mut Self::Delay);

    /// Transfer control to the application at `entry`. Returns only if the
    /// transfer could not happen.
    fn jump_to_application(&mut self, entry: u32);

    fn system_reset(&mut self) -> !;
}

/// Blocks until the supply is stable above a threshold.
///
/// The highest threshold verified so far is remembered: waiting again for
/// the same or a lower level returns at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoltageGate {
    verified: Option<u16>,
}

impl VoltageGate {
    pub const fn new() -> Self {
        Self { verified: None }
    }

    pub fn verified(&self) -> Option<u16> {
        self.verified
    }

    /// Poll `sample` until [`SUPPLY_STABLE_SAMPLES`] consecutive readings
    /// are at or above `threshold`. Returns the number of samples taken.
    pub fn wait(&mut self, threshold: u16, mut sample: impl FnMut() -> u16) -> u32 {
        if self.verified.is_some_and(|v| threshold <= v) {
            return 0;
        }

        let mut taken = 0u32;
        let mut streak = 0u8;
        while streak < SUPPLY_STABLE_SAMPLES {
            taken += 1;
            if sample() >= threshold {
                streak += 1;
            } else {
                streak = 0;
            }
        }

        self.verified = Some(threshold);
        taken
    }
}

/// Owns the per-boot context: configuration and the supply gate.
pub struct EntrySequencer {
    config: BootConfig,
    gate: VoltageGate,
}

impl EntrySequencer {
    pub fn new(config: BootConfig) -> Self {
        Self {
            config,
            gate: VoltageGate::new(),
        }
    }

    pub fn gate(&self) -> &VoltageGate {
        &self.gate
    }

    /// Everything before the hand-off: supply gate, bring-up and the
    /// optional upgrade session.
    pub fn prepare<B: Board>(
        &mut self,
        board: &mut B,
        on_result: impl FnOnce(&SessionOutcome),
    ) -> Option<SessionOutcome> {
        let samples = self.gate.wait(self.config.vdd_min, || board.supply_sample());
        debug!("supply stable after {=u32} samples", samples);

        board.init_hardware();
        let mut link = board.init_transport();
        let (flash, delay) = board.flash_and_delay();

        SessionController::new(self.config).run(&mut link, flash, delay, on_result)
    }

    /// Full boot: [`Self::prepare`], jump to the application, reset if the
    /// jump comes back.
    pub fn boot<B: Board>(&mut self, board: &mut B, on_result: impl FnOnce(&SessionOutcome)) -> ! {
        let _ = self.prepare(board, on_result);

        info!("jumping to application at {=u32:#010x}", self.config.app_entry);
        board.jump_to_application(self.config.app_entry);

        warn!("application did not take over, resetting");
        board.system_reset()
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Upgrade handshake: activation code, start command, then the transfer.

use embedded_hal::delay::DelayNs;

use crate::config::BootConfig;
use crate::protocol::{ACK, ACTIVATION_CODE, START_COMMAND};
use crate::storage::NvStore;
use crate::transport::Transport;
use crate::ymodem::{Receiver, SessionResult, TransferSession};

/// Terminal result of a transfer with the session it ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    pub result: SessionResult,
    pub session: TransferSession,
}

pub struct SessionController {
    config: BootConfig,
}

impl SessionController {
    pub fn new(config: BootConfig) -> Self {
        Self { config }
    }

    /// Run the upgrade handshake and, if the host asks for it, a transfer.
    ///
    /// Returns `None` when no activation code arrived (normal boot) or the
    /// start command never came. A finished transfer is passed to
    /// `on_result` before being returned; nothing else depends on the result.
    pub fn run<T, S, D>(
        &self,
        link: &mut T,
        store: &mut S,
        delay: &mut D,
        on_result: impl FnOnce(&SessionOutcome),
    ) -> Option<SessionOutcome>
    where
        T: Transport,
        S: NvStore,
        D: DelayNs,
    {
        if !self.wait_activation(link) {
            return None;
        }
        info!("upgrade requested");

        if !self.wait_start_command(link) {
            warn!("start command not received");
            return None;
        }

        let timeouts = &self.config.timeouts;
        delay.delay_us(timeouts.ack_delay_us);
        link.send(&[ACK]);

        let mut receiver = Receiver::new(self.config.layout, self.config.max_errors);
        let result = receiver.run(link, store, delay, timeouts);
        let outcome = SessionOutcome {
            result,
            session: receiver.into_session(),
        };

        on_result(&outcome);
        Some(outcome)
    }

    fn wait_activation<T: Transport>(&self, link: &mut T) -> bool {
        let mut code = [0u8; 2];
        let n = link.receive(&mut code, self.config.timeouts.activation_ms);
        n == code.len() && code == ACTIVATION_CODE
    }

    fn wait_start_command<T: Transport>(&self, link: &mut T) -> bool {
        let mut polls = 0u32;
        loop {
            if link.receive_byte(self.config.timeouts.download_ms) == Some(START_COMMAND) {
                return true;
            }

            polls += 1;
            if self.config.start_command_polls.is_some_and(|max| polls >= max) {
                return false;
            }
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global process-state word.
//!
//! One record holding the daemon-wide counters and health bits, stored in
//! its own single-element map file so monitoring collaborators can attach
//! it cheaply.

use crate::map::{MapError, Record};
use crate::wire::{Reader, Writer};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Daemon status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct StatusFlags: u32 {
        /// The configuration compiler is rewriting the job-ID catalog and
        /// the current-message list.
        const WRITING_JID_STRUCT = 1 << 0;
        /// Dispatching is paused.
        const DISPATCH_PAUSED    = 1 << 1;
        /// Shutdown has been requested.
        const SHUTDOWN_PENDING   = 1 << 2;
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        StatusFlags::empty()
    }
}

/// Global counters shared with every monitoring process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AfdStatus {
    /// Workers currently alive; decremented exactly once per completion.
    pub no_of_transfers: i32,
    pub jobs_in_queue: i32,
    pub flags: StatusFlags,
    /// Health LEDs of the cooperating services.
    pub led: [u8; 4],
}

impl Record for AfdStatus {
    const SIZE: usize = 4 + 4 + 4 + 4;
    const VERSION: u8 = 1;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = Writer::new(buf);
        w.i32(self.no_of_transfers);
        w.i32(self.jobs_in_queue);
        w.u32(self.flags.bits());
        w.bytes(&self.led);
    }

    fn decode(buf: &[u8]) -> Result<Self, MapError> {
        let mut r = Reader::new(buf);
        let no_of_transfers = r.i32()?;
        let jobs_in_queue = r.i32()?;
        let flags = StatusFlags::from_bits_truncate(r.u32()?);
        let mut led = [0u8; 4];
        led.copy_from_slice(r.bytes(4)?);
        Ok(Self {
            no_of_transfers,
            jobs_in_queue,
            flags,
            led,
        })
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-directory retrieve status record (one FRA slot).

use crate::host::{DEFAULT_MAX_ERRORS, DEFAULT_RETRY_INTERVAL};
use crate::id::DirId;
use crate::protocol::ProtocolSet;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Directory status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DirFlags: u32 {
        /// Error counter has reached the directory's limit.
        const DIR_ERROR_SET = 1 << 0;
        /// Directory removed from service.
        const DIR_DISABLED  = 1 << 1;
        /// Scanning stopped administratively.
        const DIR_STOPPED   = 1 << 2;
    }
}

/// One entry of a directory's check schedule.
///
/// Minute, hour, and weekday masks in the usual cron shape; a set bit
/// means the unit is allowed. Weekday bit 0 is Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub minutes: u64,
    pub hours: u32,
    pub days_of_week: u8,
}

pub const ALL_MINUTES: u64 = (1 << 60) - 1;
pub const ALL_HOURS: u32 = (1 << 24) - 1;
pub const ALL_WEEKDAYS: u8 = (1 << 7) - 1;

impl TimeEntry {
    /// An entry matching every minute.
    pub fn always() -> Self {
        Self {
            minutes: ALL_MINUTES,
            hours: ALL_HOURS,
            days_of_week: ALL_WEEKDAYS,
        }
    }

    fn matches(&self, epoch_secs: u64) -> bool {
        let minute = (epoch_secs / 60) % 60;
        let hour = (epoch_secs / 3600) % 24;
        // The epoch (1970-01-01) was a Thursday; bit 0 is Monday.
        let weekday = ((epoch_secs / 86_400) + 3) % 7;
        self.minutes & (1 << minute) != 0
            && self.hours & (1 << hour) != 0
            && self.days_of_week & (1 << weekday) != 0
    }

    /// First matching minute boundary strictly after `epoch_secs`.
    ///
    /// Scans at minute granularity, bounded to one week ahead; `None`
    /// means the masks can never match.
    pub fn next_after(&self, epoch_secs: u64) -> Option<u64> {
        let mut t = (epoch_secs / 60 + 1) * 60;
        let limit = epoch_secs + 7 * 86_400 + 60;
        while t <= limit {
            if self.matches(t) {
                return Some(t);
            }
            t += 60;
        }
        None
    }
}

/// One watched input directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dir {
    pub alias: String,
    pub dir_id: DirId,
    pub host_alias: String,
    pub protocol: ProtocolSet,
    pub flags: DirFlags,
    /// Number of queue items currently referencing this directory.
    pub queued: u32,
    pub error_counter: u32,
    pub max_errors: u32,
    pub retry_interval: u64,
    pub start_event_handle: u64,
    pub end_event_handle: u64,
    pub next_check_time: u64,
    pub time_entries: Vec<TimeEntry>,
}

impl Dir {
    pub fn new(alias: impl Into<String>, dir_id: DirId) -> Self {
        Self {
            alias: alias.into(),
            dir_id,
            host_alias: String::new(),
            protocol: ProtocolSet::empty(),
            flags: DirFlags::empty(),
            queued: 0,
            error_counter: 0,
            max_errors: DEFAULT_MAX_ERRORS,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            start_event_handle: 0,
            end_event_handle: 0,
            next_check_time: 0,
            time_entries: Vec::new(),
        }
    }

    /// Earliest schedule boundary after `now` across all entries.
    ///
    /// Directories without a schedule are checked continuously; their next
    /// check time stays 0.
    pub fn recalc_next_check_time(&mut self, now: u64) {
        self.next_check_time = self
            .time_entries
            .iter()
            .filter_map(|te| te.next_after(now))
            .min()
            .unwrap_or(0);
    }
}

#[cfg(test)]
#[path = "dir_tests.rs"]
mod tests;

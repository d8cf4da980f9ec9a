// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-host transfer status record (one FSA slot).

use crate::id::{HostId, JobId};
use crate::protocol::ProtocolSet;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on parallel transfers to one host; also the fixed number of
/// job slots carried by every host record.
pub const MAX_PARALLEL_TRANSFERS: usize = 5;

/// Length of the per-host error-history ring.
pub const ERROR_HISTORY_LENGTH: usize = 5;

/// First byte of `real_hostname[0]` marking a grouping pseudo-host.
pub const GROUP_IDENTIFIER: char = '+';

pub const DEFAULT_MAX_ERRORS: u32 = 10;
pub const DEFAULT_RETRY_INTERVAL: u64 = 120;
pub const DEFAULT_TRANSFER_BLOCKSIZE: u32 = 4096;
pub const DEFAULT_TRANSFER_TIMEOUT: u64 = 120;

bitflags! {
    /// Host status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct HostFlags: u32 {
        /// Queueing is paused; items stay in the queue untouched.
        const PAUSE_QUEUE     = 1 << 0;
        /// Transfers are administratively stopped.
        const STOP_TRANSFER   = 1 << 1;
        /// Host removed from service entirely.
        const DISABLED        = 1 << 2;
        /// Sustained failure; error counter has reached its limit.
        const NOT_WORKING     = 1 << 3;
        /// Host has entries sitting in the error queue.
        const ERROR_QUEUE_SET = 1 << 4;
    }
}

/// Which of the two configured real hostnames is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostToggle {
    One,
    Two,
}

impl HostToggle {
    pub fn flipped(self) -> Self {
        match self {
            HostToggle::One => HostToggle::Two,
            HostToggle::Two => HostToggle::One,
        }
    }

    /// Character shown at the toggle position of the display name.
    pub fn display_char(self) -> char {
        match self {
            HostToggle::One => '1',
            HostToggle::Two => '2',
        }
    }

    /// Index into `real_hostname`.
    pub fn index(self) -> usize {
        match self {
            HostToggle::One => 0,
            HostToggle::Two => 1,
        }
    }
}

impl Default for HostToggle {
    fn default() -> Self {
        HostToggle::One
    }
}

impl fmt::Display for HostToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_char())
    }
}

/// Connection state of one worker slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectStatus {
    #[default]
    Disconnect,
    NotWorking,
    Connecting,
    FtpActive,
    SftpActive,
    ScpActive,
    HttpActive,
    SmtpActive,
    WmoActive,
    RetrieveActive,
}

impl ConnectStatus {
    pub const fn code(self) -> u8 {
        match self {
            ConnectStatus::Disconnect => 0,
            ConnectStatus::NotWorking => 1,
            ConnectStatus::Connecting => 2,
            ConnectStatus::FtpActive => 3,
            ConnectStatus::SftpActive => 4,
            ConnectStatus::ScpActive => 5,
            ConnectStatus::HttpActive => 6,
            ConnectStatus::SmtpActive => 7,
            ConnectStatus::WmoActive => 8,
            ConnectStatus::RetrieveActive => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => ConnectStatus::Disconnect,
            1 => ConnectStatus::NotWorking,
            2 => ConnectStatus::Connecting,
            3 => ConnectStatus::FtpActive,
            4 => ConnectStatus::SftpActive,
            5 => ConnectStatus::ScpActive,
            6 => ConnectStatus::HttpActive,
            7 => ConnectStatus::SmtpActive,
            8 => ConnectStatus::WmoActive,
            9 => ConnectStatus::RetrieveActive,
            _ => return None,
        })
    }
}

/// State of one parallel worker slot within a host record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSlot {
    pub connect_status: ConnectStatus,
    /// Worker pid, -1 when the slot is idle.
    pub proc_id: i32,
    pub job_id: JobId,
    pub unique_name: String,
    pub no_of_files: u32,
    pub no_of_files_done: u32,
    pub file_size: u64,
    pub file_size_done: u64,
    pub file_size_in_use: u64,
    pub file_name_in_use: String,
}

impl JobSlot {
    pub fn idle() -> Self {
        Self {
            connect_status: ConnectStatus::Disconnect,
            proc_id: -1,
            job_id: JobId::NONE,
            unique_name: String::new(),
            no_of_files: 0,
            no_of_files_done: 0,
            file_size: 0,
            file_size_done: 0,
            file_size_in_use: 0,
            file_name_in_use: String::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.proc_id == -1
            && self.job_id == JobId::NONE
            && self.unique_name.is_empty()
            && self.connect_status == ConnectStatus::Disconnect
    }

    /// Return the slot to its idle shape.
    pub fn reset(&mut self) {
        *self = JobSlot::idle();
    }
}

impl Default for JobSlot {
    fn default() -> Self {
        Self::idle()
    }
}

/// One remote destination: the full per-host transfer status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub alias: String,
    /// Display name; the character at `toggle_pos` mirrors the active toggle.
    pub dsp_name: String,
    pub real_hostname: [String; 2],
    pub toggle_pos: usize,
    pub host_id: HostId,
    pub toggle: HostToggle,
    pub auto_toggle: bool,
    /// Toggle value before the first automatic switch, once one happened.
    pub original_toggle: Option<HostToggle>,
    pub protocol: ProtocolSet,
    pub status: HostFlags,
    pub allowed_transfers: u32,
    pub active_transfers: u32,
    pub error_counter: u32,
    pub total_errors: u64,
    pub error_history: [u8; ERROR_HISTORY_LENGTH],
    pub max_errors: u32,
    pub retry_interval: u64,
    pub last_retry_time: u64,
    pub total_file_counter: u32,
    pub total_file_size: u64,
    /// Bytes per second for the whole host; 0 means unlimited.
    pub transfer_rate_limit: u64,
    /// Per-worker share of the rate limit, kept current on open/close.
    pub trl_per_process: u64,
    pub block_size: u32,
    pub transfer_timeout: u64,
    pub job_status: Vec<JobSlot>,
}

impl Host {
    /// A host with defaults and the given identity.
    pub fn new(alias: impl Into<String>, host_id: HostId) -> Self {
        let alias = alias.into();
        Self {
            dsp_name: alias.clone(),
            real_hostname: [alias.clone(), String::new()],
            alias,
            toggle_pos: 0,
            host_id,
            toggle: HostToggle::One,
            auto_toggle: false,
            original_toggle: None,
            protocol: ProtocolSet::empty(),
            status: HostFlags::empty(),
            allowed_transfers: 1,
            active_transfers: 0,
            error_counter: 0,
            total_errors: 0,
            error_history: [0; ERROR_HISTORY_LENGTH],
            max_errors: DEFAULT_MAX_ERRORS,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            last_retry_time: 0,
            total_file_counter: 0,
            total_file_size: 0,
            transfer_rate_limit: 0,
            trl_per_process: 0,
            block_size: DEFAULT_TRANSFER_BLOCKSIZE,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            job_status: vec![JobSlot::idle(); MAX_PARALLEL_TRANSFERS],
        }
    }

    /// Grouping pseudo-hosts carry no traffic.
    pub fn is_group(&self) -> bool {
        self.real_hostname[0].starts_with(GROUP_IDENTIFIER)
    }

    /// Hostname currently selected by the toggle.
    pub fn active_hostname(&self) -> &str {
        let name = &self.real_hostname[self.toggle.index()];
        if name.is_empty() {
            &self.real_hostname[0]
        } else {
            name
        }
    }

    /// Record an error code at the head of the history ring.
    pub fn push_error_history(&mut self, code: u8) {
        self.error_history.rotate_right(1);
        self.error_history[0] = code;
    }

    /// A host transitioning back to OK writes a zero at the head.
    pub fn clear_error_history_head(&mut self) {
        self.error_history[0] = 0;
        if ERROR_HISTORY_LENGTH > 1 {
            self.error_history[1] = 0;
        }
    }

    /// Flip the toggle and mirror it into the display name.
    pub fn flip_toggle(&mut self) {
        self.toggle = self.toggle.flipped();
        let pos = self.toggle_pos;
        if pos < self.dsp_name.len() {
            let mut chars: Vec<char> = self.dsp_name.chars().collect();
            if pos < chars.len() {
                chars[pos] = self.toggle.display_char();
                self.dsp_name = chars.into_iter().collect();
            }
        }
    }

    /// Recompute the per-worker rate-limit share.
    pub fn recalc_trl(&mut self) {
        self.trl_per_process = if self.transfer_rate_limit == 0 {
            0
        } else {
            self.transfer_rate_limit / u64::from(self.active_transfers.max(1))
        };
    }

    /// Smallest idle job-slot index, if any.
    pub fn free_job_slot(&self) -> Option<usize> {
        self.job_status.iter().position(|s| s.proc_id == -1)
    }

    /// Whether the host is past its error limit and still inside the
    /// retry window at `now`.
    pub fn retry_pending(&self, now: u64) -> bool {
        self.error_counter >= self.max_errors
            && now < self.last_retry_time.saturating_add(self.retry_interval)
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layouts of the status-area records.
//!
//! One [`Record`] impl per area. Field order here *is* the file format;
//! bump the area's version constant when it changes.

use crate::map::{MapError, Record};
use crate::wire::{Reader, Writer};
use afd_core::dir::TimeEntry;
use afd_core::host::{ConnectStatus, HostFlags, HostToggle, JobSlot, ERROR_HISTORY_LENGTH};
use afd_core::protocol::ProtocolSet;
use afd_core::queue::QueueFlags;
use afd_core::{CacheRecord, Dir, DirId, Host, HostId, JobId, JobRecord, MsgName, QueueItem};

pub const MAX_ALIAS_LENGTH: usize = 16;
pub const MAX_DIR_ALIAS_LENGTH: usize = 32;
pub const MAX_DSP_NAME_LENGTH: usize = 20;
pub const MAX_REAL_HOSTNAME_LENGTH: usize = 64;
pub const MAX_UNIQUE_NAME_LENGTH: usize = 48;
pub const MAX_FILENAME_LENGTH: usize = 64;
pub const MAX_RECIPIENT_LENGTH: usize = 128;
pub const MAX_OPTION_LENGTH: usize = 256;
pub const MAX_TIME_ENTRIES: usize = 4;

const JOB_SLOT_SIZE: usize = 1 + 4 + 4 + MAX_UNIQUE_NAME_LENGTH + 4 + 4 + 8 + 8 + 8 + MAX_FILENAME_LENGTH;
const TIME_ENTRY_SIZE: usize = 8 + 4 + 1;

fn corrupt(message: impl Into<String>) -> MapError {
    MapError::Corrupt {
        offset: 0,
        message: message.into(),
    }
}

fn encode_job_slot(w: &mut Writer<'_>, slot: &JobSlot) {
    w.u8(slot.connect_status.code());
    w.i32(slot.proc_id);
    w.u32(slot.job_id.get());
    w.str(&slot.unique_name, MAX_UNIQUE_NAME_LENGTH);
    w.u32(slot.no_of_files);
    w.u32(slot.no_of_files_done);
    w.u64(slot.file_size);
    w.u64(slot.file_size_done);
    w.u64(slot.file_size_in_use);
    w.str(&slot.file_name_in_use, MAX_FILENAME_LENGTH);
}

fn decode_job_slot(r: &mut Reader<'_>) -> Result<JobSlot, MapError> {
    let code = r.u8()?;
    Ok(JobSlot {
        connect_status: ConnectStatus::from_code(code)
            .ok_or_else(|| corrupt(format!("unknown connect status {code}")))?,
        proc_id: r.i32()?,
        job_id: JobId::new(r.u32()?),
        unique_name: r.str(MAX_UNIQUE_NAME_LENGTH)?,
        no_of_files: r.u32()?,
        no_of_files_done: r.u32()?,
        file_size: r.u64()?,
        file_size_done: r.u64()?,
        file_size_in_use: r.u64()?,
        file_name_in_use: r.str(MAX_FILENAME_LENGTH)?,
    })
}

fn encode_toggle(toggle: HostToggle) -> u8 {
    match toggle {
        HostToggle::One => 1,
        HostToggle::Two => 2,
    }
}

fn decode_toggle(byte: u8) -> Result<HostToggle, MapError> {
    match byte {
        1 => Ok(HostToggle::One),
        2 => Ok(HostToggle::Two),
        other => Err(corrupt(format!("bad toggle byte {other}"))),
    }
}

impl Record for Host {
    const SIZE: usize = MAX_ALIAS_LENGTH
        + MAX_DSP_NAME_LENGTH
        + 2 * MAX_REAL_HOSTNAME_LENGTH
        + 4  // toggle_pos
        + 4  // host_id
        + 1  // toggle
        + 1  // auto_toggle
        + 1  // original_toggle
        + 4  // protocol
        + 4  // status
        + 4  // allowed_transfers
        + 4  // active_transfers
        + 4  // error_counter
        + 8  // total_errors
        + ERROR_HISTORY_LENGTH
        + 4  // max_errors
        + 8  // retry_interval
        + 8  // last_retry_time
        + 4  // total_file_counter
        + 8  // total_file_size
        + 8  // transfer_rate_limit
        + 8  // trl_per_process
        + 4  // block_size
        + 8  // transfer_timeout
        + afd_core::host::MAX_PARALLEL_TRANSFERS * JOB_SLOT_SIZE;
    const VERSION: u8 = 3;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = Writer::new(buf);
        w.str(&self.alias, MAX_ALIAS_LENGTH);
        w.str(&self.dsp_name, MAX_DSP_NAME_LENGTH);
        w.str(&self.real_hostname[0], MAX_REAL_HOSTNAME_LENGTH);
        w.str(&self.real_hostname[1], MAX_REAL_HOSTNAME_LENGTH);
        w.u32(self.toggle_pos as u32);
        w.u32(self.host_id.get());
        w.u8(encode_toggle(self.toggle));
        w.u8(u8::from(self.auto_toggle));
        w.u8(self.original_toggle.map_or(0, encode_toggle));
        w.u32(self.protocol.bits());
        w.u32(self.status.bits());
        w.u32(self.allowed_transfers);
        w.u32(self.active_transfers);
        w.u32(self.error_counter);
        w.u64(self.total_errors);
        w.bytes(&self.error_history);
        w.u32(self.max_errors);
        w.u64(self.retry_interval);
        w.u64(self.last_retry_time);
        w.u32(self.total_file_counter);
        w.u64(self.total_file_size);
        w.u64(self.transfer_rate_limit);
        w.u64(self.trl_per_process);
        w.u32(self.block_size);
        w.u64(self.transfer_timeout);
        for slot in self
            .job_status
            .iter()
            .take(afd_core::host::MAX_PARALLEL_TRANSFERS)
        {
            encode_job_slot(&mut w, slot);
        }
    }

    fn decode(buf: &[u8]) -> Result<Self, MapError> {
        let mut r = Reader::new(buf);
        let alias = r.str(MAX_ALIAS_LENGTH)?;
        let dsp_name = r.str(MAX_DSP_NAME_LENGTH)?;
        let real0 = r.str(MAX_REAL_HOSTNAME_LENGTH)?;
        let real1 = r.str(MAX_REAL_HOSTNAME_LENGTH)?;
        let toggle_pos = r.u32()? as usize;
        let host_id = HostId::new(r.u32()?);
        let toggle = decode_toggle(r.u8()?)?;
        let auto_toggle = r.u8()? != 0;
        let original_toggle = match r.u8()? {
            0 => None,
            byte => Some(decode_toggle(byte)?),
        };
        let protocol = ProtocolSet::from_bits_truncate(r.u32()?);
        let status = HostFlags::from_bits_truncate(r.u32()?);
        let allowed_transfers = r.u32()?;
        let active_transfers = r.u32()?;
        let error_counter = r.u32()?;
        let total_errors = r.u64()?;
        let mut error_history = [0u8; ERROR_HISTORY_LENGTH];
        error_history.copy_from_slice(r.bytes(ERROR_HISTORY_LENGTH)?);
        let max_errors = r.u32()?;
        let retry_interval = r.u64()?;
        let last_retry_time = r.u64()?;
        let total_file_counter = r.u32()?;
        let total_file_size = r.u64()?;
        let transfer_rate_limit = r.u64()?;
        let trl_per_process = r.u64()?;
        let block_size = r.u32()?;
        let transfer_timeout = r.u64()?;
        let mut job_status = Vec::with_capacity(afd_core::host::MAX_PARALLEL_TRANSFERS);
        for _ in 0..afd_core::host::MAX_PARALLEL_TRANSFERS {
            job_status.push(decode_job_slot(&mut r)?);
        }
        Ok(Host {
            alias,
            dsp_name,
            real_hostname: [real0, real1],
            toggle_pos,
            host_id,
            toggle,
            auto_toggle,
            original_toggle,
            protocol,
            status,
            allowed_transfers,
            active_transfers,
            error_counter,
            total_errors,
            error_history,
            max_errors,
            retry_interval,
            last_retry_time,
            total_file_counter,
            total_file_size,
            transfer_rate_limit,
            trl_per_process,
            block_size,
            transfer_timeout,
            job_status,
        })
    }
}

impl Record for Dir {
    const SIZE: usize = MAX_DIR_ALIAS_LENGTH
        + 4  // dir_id
        + MAX_ALIAS_LENGTH
        + 4  // protocol
        + 4  // flags
        + 4  // queued
        + 4  // error_counter
        + 4  // max_errors
        + 8  // retry_interval
        + 8  // start_event_handle
        + 8  // end_event_handle
        + 8  // next_check_time
        + 4  // no_of_time_entries
        + MAX_TIME_ENTRIES * TIME_ENTRY_SIZE;
    const VERSION: u8 = 2;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = Writer::new(buf);
        w.str(&self.alias, MAX_DIR_ALIAS_LENGTH);
        w.u32(self.dir_id.get());
        w.str(&self.host_alias, MAX_ALIAS_LENGTH);
        w.u32(self.protocol.bits());
        w.u32(self.flags.bits());
        w.u32(self.queued);
        w.u32(self.error_counter);
        w.u32(self.max_errors);
        w.u64(self.retry_interval);
        w.u64(self.start_event_handle);
        w.u64(self.end_event_handle);
        w.u64(self.next_check_time);
        w.u32(self.time_entries.len().min(MAX_TIME_ENTRIES) as u32);
        for te in self.time_entries.iter().take(MAX_TIME_ENTRIES) {
            w.u64(te.minutes);
            w.u32(te.hours);
            w.u8(te.days_of_week);
        }
        for _ in self.time_entries.len()..MAX_TIME_ENTRIES {
            w.u64(0);
            w.u32(0);
            w.u8(0);
        }
    }

    fn decode(buf: &[u8]) -> Result<Self, MapError> {
        let mut r = Reader::new(buf);
        let alias = r.str(MAX_DIR_ALIAS_LENGTH)?;
        let dir_id = DirId::new(r.u32()?);
        let host_alias = r.str(MAX_ALIAS_LENGTH)?;
        let protocol = ProtocolSet::from_bits_truncate(r.u32()?);
        let flags = afd_core::DirFlags::from_bits_truncate(r.u32()?);
        let queued = r.u32()?;
        let error_counter = r.u32()?;
        let max_errors = r.u32()?;
        let retry_interval = r.u64()?;
        let start_event_handle = r.u64()?;
        let end_event_handle = r.u64()?;
        let next_check_time = r.u64()?;
        let no_of_time_entries = r.u32()? as usize;
        if no_of_time_entries > MAX_TIME_ENTRIES {
            return Err(corrupt(format!(
                "directory schedule claims {no_of_time_entries} entries"
            )));
        }
        let mut time_entries = Vec::with_capacity(no_of_time_entries);
        for i in 0..MAX_TIME_ENTRIES {
            let minutes = r.u64()?;
            let hours = r.u32()?;
            let days_of_week = r.u8()?;
            if i < no_of_time_entries {
                time_entries.push(TimeEntry {
                    minutes,
                    hours,
                    days_of_week,
                });
            }
        }
        Ok(Dir {
            alias,
            dir_id,
            host_alias,
            protocol,
            flags,
            queued,
            error_counter,
            max_errors,
            retry_interval,
            start_event_handle,
            end_event_handle,
            next_check_time,
            time_entries,
        })
    }
}

impl Record for QueueItem {
    const SIZE: usize = 16 // msg_name
        + 8  // msg_number
        + 8  // creation_time
        + 1  // priority
        + 4  // pos
        + 4  // special_flag
        + 4  // pid
        + 4  // files_to_send
        + 8  // file_size_to_send
        + 4  // retries
        + 4; // connect_pos
    const VERSION: u8 = 1;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = Writer::new(buf);
        w.u64(self.msg_name.creation_time);
        w.u32(self.msg_name.unique);
        w.u32(self.msg_name.split);
        w.u64(self.msg_number);
        w.u64(self.creation_time);
        w.u8(self.priority);
        w.u32(self.pos);
        w.u32(self.special_flag.bits());
        w.i32(self.pid);
        w.u32(self.files_to_send);
        w.u64(self.file_size_to_send);
        w.u32(self.retries);
        w.i32(self.connect_pos);
    }

    fn decode(buf: &[u8]) -> Result<Self, MapError> {
        let mut r = Reader::new(buf);
        Ok(QueueItem {
            msg_name: MsgName {
                creation_time: r.u64()?,
                unique: r.u32()?,
                split: r.u32()?,
            },
            msg_number: r.u64()?,
            creation_time: r.u64()?,
            priority: r.u8()?,
            pos: r.u32()?,
            special_flag: QueueFlags::from_bits_truncate(r.u32()?),
            pid: r.i32()?,
            files_to_send: r.u32()?,
            file_size_to_send: r.u64()?,
            retries: r.u32()?,
            connect_pos: r.i32()?,
        })
    }
}

impl Record for CacheRecord {
    const SIZE: usize = 4 + 4 + 4 + 8 + 1 + 8 + 8;
    const VERSION: u8 = 1;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = Writer::new(buf);
        w.u32(self.job_id.get());
        w.u32(self.host_id.get());
        w.i32(self.fsa_pos);
        w.u64(self.retry_interval);
        w.u8(u8::from(self.in_current_fsa));
        w.u64(self.created_at);
        w.u64(self.last_transfer_time);
    }

    fn decode(buf: &[u8]) -> Result<Self, MapError> {
        let mut r = Reader::new(buf);
        Ok(CacheRecord {
            job_id: JobId::new(r.u32()?),
            host_id: HostId::new(r.u32()?),
            fsa_pos: r.i32()?,
            retry_interval: r.u64()?,
            in_current_fsa: r.u8()? != 0,
            created_at: r.u64()?,
            last_transfer_time: r.u64()?,
        })
    }
}

impl Record for JobRecord {
    const SIZE: usize = 4 + 4 + 1 + MAX_RECIPIENT_LENGTH + 4 + MAX_OPTION_LENGTH;
    const VERSION: u8 = 2;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = Writer::new(buf);
        w.u32(self.job_id.get());
        w.u32(self.dir_id.get());
        w.u8(self.priority);
        w.str(&self.recipient, MAX_RECIPIENT_LENGTH);
        w.u32(self.loptions.len() as u32);
        w.str(&self.loptions.join("\n"), MAX_OPTION_LENGTH);
    }

    fn decode(buf: &[u8]) -> Result<Self, MapError> {
        let mut r = Reader::new(buf);
        let job_id = JobId::new(r.u32()?);
        let dir_id = DirId::new(r.u32()?);
        let priority = r.u8()?;
        let recipient = r.str(MAX_RECIPIENT_LENGTH)?;
        let no_of_loptions = r.u32()? as usize;
        let blob = r.str(MAX_OPTION_LENGTH)?;
        let loptions: Vec<String> = if blob.is_empty() {
            Vec::new()
        } else {
            blob.split('\n').map(str::to_string).collect()
        };
        if loptions.len() != no_of_loptions {
            return Err(corrupt(format!(
                "job record claims {no_of_loptions} options, found {}",
                loptions.len()
            )));
        }
        Ok(JobRecord {
            job_id,
            dir_id,
            priority,
            recipient,
            loptions,
        })
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;

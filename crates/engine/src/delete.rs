// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message deletion.
//!
//! One removal routine shared by the fifo command path (dispatcher
//! running) and the direct path (dispatcher quiescent). Signalling a
//! worker that still owns the message is the dispatcher's job and
//! happens before this runs.

use crate::env::WorkEnv;
use crate::error::EngineError;
use crate::error_queue::ErrorQueue;
use crate::state::{Dirty, StatusAreas};
use afd_core::{Event, MsgName};
use afd_storage::{LockDir, Region};
use std::io;
use tracing::{info, warn};

/// Remove a queued message by name: queue entry, staged payload
/// directory, host counters, and error-queue entry.
pub fn delete_message(
    state: &mut StatusAreas,
    error_queue: &mut ErrorQueue,
    env: &WorkEnv,
    locks: &LockDir,
    msg_name: &MsgName,
    now: u64,
) -> Result<Vec<Event>, EngineError> {
    let mut events = Vec::new();

    let qb_pos = match state.queue_pos_by_msg_name(msg_name) {
        Some(pos) => pos,
        None => {
            warn!(msg = %msg_name, "delete request for an unknown message");
            return Ok(events);
        }
    };

    // Host counters shrink by the message's on-disk footprint.
    if let Some(fsa_pos) = state.host_pos_for_item(qb_pos) {
        let item = &state.queue[qb_pos];
        let files = item.files_to_send;
        let bytes = item.file_size_to_send;
        let _tfc = locks.lock_region_w(Region::TotalFileCounter(fsa_pos))?;
        let host = &mut state.hosts[fsa_pos];
        host.total_file_counter = host.total_file_counter.saturating_sub(files);
        host.total_file_size = host.total_file_size.saturating_sub(bytes);
        state.dirty |= Dirty::FSA;
    }

    // Staged payload goes away with the queue entry.
    let outgoing = env.outgoing_dir(msg_name);
    match std::fs::remove_dir_all(&outgoing) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    error_queue.remove(msg_name);
    events.extend(state.remove_msg(qb_pos, now));
    events.push(Event::MessageDeleted {
        msg_name: *msg_name,
    });
    info!(msg = %msg_name, "message deleted");
    Ok(events)
}

#[cfg(test)]
#[path = "delete_tests.rs"]
mod tests;

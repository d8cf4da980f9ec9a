// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error, retry, and toggle accounting on worker exit.

use crate::connection::ConnectionTable;
use crate::error::EngineError;
use crate::positions;
use crate::state::{Dirty, StatusAreas};
use afd_core::host::{ConnectStatus, HostFlags};
use afd_core::{DirFlags, Event};
use afd_storage::{LockDir, Region};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// How a worker's exit counts against its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faulty {
    Yes,
    No,
    /// Killed or cancelled; moves no error counters.
    Neither,
}

/// Error-history code for a failed transfer.
const EH_TRANSFER_ERROR: u8 = 1;

/// Settle a finished worker: error accounting, toggle decision, counter
/// teardown, and connection-slot release.
pub fn remove_connection(
    state: &mut StatusAreas,
    connections: &mut ConnectionTable,
    conn_pos: usize,
    faulty: Faulty,
    now: u64,
    locks: &LockDir,
) -> Result<Vec<Event>, EngineError> {
    let mut events = Vec::new();

    let conn = connections
        .get(conn_pos)
        .filter(|c| !c.is_free())
        .ok_or(EngineError::EmptyConnection(conn_pos))?
        .clone();

    // The FSA may have been rebuilt while the worker ran; resync before
    // touching any counters through a stale position.
    let resolved = (conn.fsa_pos >= 0)
        .then(|| conn.fsa_pos as usize)
        .filter(|&pos| {
            state
                .hosts
                .get(pos)
                .map(|h| h.host_id == conn.host_id)
                .unwrap_or(false)
        });
    if resolved.is_none() {
        events.extend(positions::get_new_positions(state, connections)?);
    }
    let conn = connections
        .get(conn_pos)
        .filter(|c| !c.is_free())
        .ok_or(EngineError::EmptyConnection(conn_pos))?
        .clone();
    let fsa_pos = conn.fsa_pos as usize;
    if conn.fsa_pos < 0 || fsa_pos >= state.hosts.len() {
        warn!(pid = conn.pid, host = %conn.host_id, "worker host vanished, dropping accounting");
        connections
            .get_mut(conn_pos)
            .ok_or(EngineError::EmptyConnection(conn_pos))?
            .reset();
        return Ok(events);
    }

    match faulty {
        Faulty::Yes => {
            // Retrieve side first: the directory's own error counter.
            if conn.fra_pos >= 0 {
                let fra_pos = conn.fra_pos as usize;
                if fra_pos < state.dirs.len() {
                    let _dir_ec = locks.lock_region_w(Region::DirErrorCounter(fra_pos))?;
                    let dir = &mut state.dirs[fra_pos];
                    dir.error_counter += 1;
                    if dir.error_counter >= dir.max_errors
                        && !dir.flags.contains(DirFlags::DIR_ERROR_SET)
                    {
                        dir.flags.insert(DirFlags::DIR_ERROR_SET);
                        events.push(Event::DirErrorStart {
                            dir_id: dir.dir_id,
                            alias: dir.alias.clone(),
                        });
                    }
                    state.dirty |= Dirty::FRA;
                }
            }

            let _ec = locks.lock_region_w(Region::ErrorCounter(fsa_pos))?;
            let host = &mut state.hosts[fsa_pos];
            host.error_counter += 1;
            host.total_errors += 1;
            host.push_error_history(EH_TRANSFER_ERROR);
            host.last_retry_time = now;

            if host.error_counter == host.max_errors {
                if host.original_toggle.is_none() {
                    host.original_toggle = Some(host.toggle);
                }
                host.status.insert(HostFlags::NOT_WORKING);
            }

            if host.auto_toggle
                && host.max_errors > 0
                && host.error_counter % host.max_errors == 0
                && !host.real_hostname[1].is_empty()
            {
                let from = host.toggle;
                host.flip_toggle();
                info!(
                    host = %host.alias,
                    from = %from,
                    to = %host.toggle,
                    "Automatic host switch initiated"
                );
                events.push(Event::HostSwitch {
                    host_id: host.host_id,
                    alias: host.alias.clone(),
                    from,
                    to: host.toggle,
                });
            }
            state.dirty |= Dirty::FSA;
        }
        Faulty::No => {
            let _ec = locks.lock_region_w(Region::ErrorCounter(fsa_pos))?;
            let host = &mut state.hosts[fsa_pos];
            if host.error_counter > 0 && !conn.temp_toggle {
                host.error_counter = 0;
                host.clear_error_history_head();
                host.status.remove(HostFlags::NOT_WORKING);
                for slot in &mut host.job_status {
                    if slot.connect_status == ConnectStatus::NotWorking {
                        slot.connect_status = ConnectStatus::Disconnect;
                    }
                }
                events.push(Event::HostErrorEnd {
                    host_id: host.host_id,
                    alias: host.alias.clone(),
                });
                state.dirty |= Dirty::FSA;
            }
        }
        Faulty::Neither => {}
    }

    // Counter teardown happens for every exit, faulty or not.
    {
        let host = &mut state.hosts[fsa_pos];
        if host.active_transfers > host.allowed_transfers {
            warn!(
                host = %host.alias,
                active = host.active_transfers,
                allowed = host.allowed_transfers,
                "active transfer counter above limit, clamping"
            );
            host.active_transfers = host.allowed_transfers;
        }
        host.active_transfers = host.active_transfers.saturating_sub(1);
        host.recalc_trl();
        if conn.job_no >= 0 {
            if let Some(slot) = host.job_status.get_mut(conn.job_no as usize) {
                slot.reset();
            }
        }
        state.dirty |= Dirty::FSA;
    }

    if state.status.no_of_transfers > 0 {
        state.status.no_of_transfers -= 1;
    }
    state.dirty |= Dirty::STATUS;

    connections
        .get_mut(conn_pos)
        .ok_or(EngineError::EmptyConnection(conn_pos))?
        .reset();

    Ok(events)
}

#[cfg(test)]
#[path = "error_engine_tests.rs"]
mod tests;

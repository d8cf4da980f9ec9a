// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Position resync after a status-area rebuild.
//!
//! When the configuration compiler rebuilds the FSA or FRA, cached array
//! positions can point at the wrong record. Live workers are re-anchored
//! by stable ID; a worker whose host vanished is moved behind the live
//! area onto a placeholder slot so its data path survives the rename.

use crate::connection::ConnectionTable;
use crate::error::EngineError;
use crate::state::{Dirty, StatusAreas};
use afd_core::host::MAX_PARALLEL_TRANSFERS;
use afd_core::{Dir, Event, Host};
use tracing::{debug, warn};

/// Re-anchor every live connection after a layout change.
pub fn get_new_positions(
    state: &mut StatusAreas,
    connections: &mut ConnectionTable,
) -> Result<Vec<Event>, EngineError> {
    let events = Vec::new();

    for conn_pos in 0..connections.capacity() {
        let conn = match connections.get(conn_pos) {
            Some(c) if !c.is_free() => c.clone(),
            _ => continue,
        };

        let old_fsa_pos = conn.fsa_pos;

        // Look in the live area first, then among existing placeholders.
        let new_pos = state
            .host_pos_by_id(conn.host_id)
            .or_else(|| {
                state.hosts[state.live_hosts..]
                    .iter()
                    .position(|h| h.host_id == conn.host_id)
                    .map(|i| state.live_hosts + i)
            });

        let new_pos = match new_pos {
            Some(pos) => {
                debug!(
                    pid = conn.pid,
                    host = %conn.host_alias,
                    from = old_fsa_pos,
                    to = pos,
                    "re-anchored worker host position"
                );
                pos
            }
            None => {
                // Host removed or renamed away: park the worker behind the
                // live FSA with sane defaults and its preserved identity.
                warn!(
                    pid = conn.pid,
                    host = %conn.host_alias,
                    host_id = %conn.host_id,
                    "host vanished from the FSA, parking worker on a placeholder slot"
                );
                let mut placeholder = Host::new(conn.host_alias.clone(), conn.host_id);
                placeholder.real_hostname[0] = conn.hostname.clone();
                placeholder.allowed_transfers = MAX_PARALLEL_TRANSFERS as u32;
                placeholder.active_transfers = 0;
                state.hosts.push(placeholder);
                state.hosts.len() - 1
            }
        };

        // Carry the worker's footprint onto the new slot. A live host kept
        // its counters through the rebuild; only placeholder slots start
        // from zero and must count this worker in.
        {
            let on_placeholder = new_pos >= state.live_hosts;
            let host = &mut state.hosts[new_pos];
            if on_placeholder {
                host.active_transfers = (host.active_transfers + 1).min(host.allowed_transfers);
            }
            if conn.job_no >= 0 {
                if let Some(slot) = host.job_status.get_mut(conn.job_no as usize) {
                    slot.proc_id = conn.pid;
                    if let Some(msg_name) = conn.msg_name {
                        slot.unique_name = msg_name.to_string();
                    }
                }
            }
        }

        // Free the job slot on the host the worker used to point at, so
        // new work can be dispatched there.
        if old_fsa_pos >= 0 && (old_fsa_pos as usize) != new_pos {
            if let Some(old_host) = state.hosts.get_mut(old_fsa_pos as usize) {
                if conn.job_no >= 0 {
                    if let Some(slot) = old_host.job_status.get_mut(conn.job_no as usize) {
                        if slot.proc_id == conn.pid {
                            slot.reset();
                            old_host.active_transfers = old_host.active_transfers.saturating_sub(1);
                        }
                    }
                }
            }
        }

        if let Some(c) = connections.get_mut(conn_pos) {
            c.fsa_pos = new_pos as i32;
        }

        // Retrieve side: the directory ID rides in the message name.
        if conn.fra_pos >= 0 {
            let dir_id = conn.msg_name.and_then(|m| m.dir_id());
            let new_fra = dir_id.and_then(|id| state.dir_pos_by_id(id));
            let new_fra = match (new_fra, dir_id) {
                (Some(pos), _) => pos,
                (None, Some(id)) => {
                    warn!(
                        pid = conn.pid,
                        dir = %conn.dir_alias,
                        dir_id = %id,
                        "directory vanished from the FRA, faking a placeholder slot"
                    );
                    state.dirs.push(Dir::new(conn.dir_alias.clone(), id));
                    state.dirs.len() - 1
                }
                (None, None) => {
                    warn!(
                        pid = conn.pid,
                        dir = %conn.dir_alias,
                        "cannot recover a directory ID from the message name"
                    );
                    continue;
                }
            };
            if let Some(c) = connections.get_mut(conn_pos) {
                c.fra_pos = new_fra as i32;
            }
        }
    }

    invalidate_cache_positions(state);
    state.dirty |= Dirty::FSA | Dirty::FRA | Dirty::CACHE;
    Ok(events)
}

/// Mark cache entries whose position no longer matches their stable host
/// ID; the next lookup re-resolves them.
pub fn invalidate_cache_positions(state: &mut StatusAreas) {
    let live = state.live_hosts;
    let mut stale = 0;
    for rec in &mut state.cache {
        let ok = rec.fsa_pos >= 0
            && (rec.fsa_pos as usize) < live
            && state.hosts[rec.fsa_pos as usize].host_id == rec.host_id;
        if !ok && rec.in_current_fsa {
            rec.in_current_fsa = false;
            stale += 1;
        }
    }
    if stale > 0 {
        debug!(stale, "invalidated cached host positions");
        state.dirty |= Dirty::CACHE;
    }
}

#[cfg(test)]
#[path = "positions_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic FSA sanity sweep.
//!
//! Shared counters drift when workers die at the wrong moment. The sweep
//! runs under the global check region and corrects, in place, every host
//! that provably has nothing going on. Bookkeeping inconsistencies never
//! abort running transfers; they are logged and fixed.

use crate::connection::ConnectionTable;
use crate::error::EngineError;
use crate::error_queue::ErrorQueue;
use crate::state::{Dirty, StatusAreas};
use afd_core::host::{HostFlags, JobSlot, MAX_PARALLEL_TRANSFERS};
use afd_storage::{LockDir, Region};
use tracing::warn;

/// Sweep every live host, correcting counter drift on quiescent ones and
/// clearing stale error-queue bits.
pub fn check_fsa_entries(
    state: &mut StatusAreas,
    connections: &ConnectionTable,
    error_queue: &ErrorQueue,
    locks: &LockDir,
    now: u64,
) -> Result<(), EngineError> {
    let _check = locks.lock_region_w(Region::CheckFsaEntries)?;

    for fsa_pos in 0..state.live_hosts {
        if state.hosts[fsa_pos].is_group() {
            continue;
        }

        // Overlong slot tables are corrected regardless of queue state.
        if state.hosts[fsa_pos].allowed_transfers > MAX_PARALLEL_TRANSFERS as u32 {
            let host = &mut state.hosts[fsa_pos];
            warn!(
                host = %host.alias,
                allowed = host.allowed_transfers,
                "allowed transfers above the slot table size, resetting slots"
            );
            host.allowed_transfers = MAX_PARALLEL_TRANSFERS as u32;
            for slot in &mut host.job_status {
                *slot = JobSlot::idle();
            }
            state.dirty |= Dirty::FSA;
        }

        let has_queued = (0..state.queue.len())
            .any(|qb_pos| {
                // Skip resolution churn for running items; they hold the
                // host busy anyway.
                state.host_pos_for_item(qb_pos) == Some(fsa_pos)
            });
        let has_workers = connections
            .active()
            .any(|(_, c)| c.fsa_pos == fsa_pos as i32);
        if has_queued || has_workers {
            continue;
        }

        let alias = state.hosts[fsa_pos].alias.clone();
        let mut corrected_active = false;
        {
            let host = &mut state.hosts[fsa_pos];
            if host.active_transfers != 0 {
                warn!(
                    host = %alias,
                    active = host.active_transfers,
                    "active transfers on a quiescent host, clearing"
                );
                host.active_transfers = 0;
                host.recalc_trl();
                corrected_active = true;
            }
            if host.total_file_counter != 0 || host.total_file_size != 0 {
                warn!(
                    host = %alias,
                    files = host.total_file_counter,
                    bytes = host.total_file_size,
                    "file totals on a quiescent host, clearing"
                );
                host.total_file_counter = 0;
                host.total_file_size = 0;
                corrected_active = true;
            }
            if host.error_counter != 0 {
                host.error_counter = 0;
                corrected_active = true;
            }
            if host.error_history[0] != 0 || host.error_history[1] != 0 {
                host.error_history[0] = 0;
                host.error_history[1] = 0;
                if host.error_history.len() > 2 {
                    host.error_history[2] = 0;
                }
                corrected_active = true;
            }
            for slot in &mut host.job_status {
                if !slot.is_idle() {
                    *slot = JobSlot::idle();
                    corrected_active = true;
                }
            }
            if corrected_active {
                state.dirty |= Dirty::FSA;
            }
        }

        // A corrected retrieve host drags its directories' queued
        // counters back to zero with it.
        if corrected_active && state.hosts[fsa_pos].protocol.is_retrieve() {
            for dir in &mut state.dirs[..state.live_dirs] {
                if dir.host_alias == alias && dir.queued != 0 {
                    warn!(dir = %dir.alias, queued = dir.queued, "clearing queued counter");
                    dir.queued = 0;
                    state.dirty |= Dirty::FRA;
                }
            }
        }
    }

    // Error-queue bit sweep: a host claiming queued errors must actually
    // have retriable entries.
    for fsa_pos in 0..state.live_hosts {
        let host_id = state.hosts[fsa_pos].host_id;
        if state.hosts[fsa_pos].status.contains(HostFlags::ERROR_QUEUE_SET)
            && !error_queue.has_retriable(host_id, now)
        {
            let _hs = locks.lock_region_w(Region::HostStatus(fsa_pos))?;
            state.hosts[fsa_pos].status.remove(HostFlags::ERROR_QUEUE_SET);
            state.dirty |= Dirty::FSA;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "fsa_check_tests.rs"]
mod tests;

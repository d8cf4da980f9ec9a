// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory status areas.
//!
//! The dispatcher process is the single owner of these tables; cooperating
//! processes see them through the map files and region locks. Cross-table
//! references are indices paired with stable IDs, re-resolved on demand —
//! never pointers.

use afd_core::{CacheRecord, Dir, DirFlags, DirId, Event, Host, HostId, JobRecord, QueueItem};
use afd_storage::AfdStatus;
use bitflags::bitflags;

bitflags! {
    /// Which areas have unpersisted mutations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Dirty: u32 {
        const FSA    = 1 << 0;
        const FRA    = 1 << 1;
        const QUEUE  = 1 << 2;
        const CACHE  = 1 << 3;
        const STATUS = 1 << 4;
    }
}

impl Default for Dirty {
    fn default() -> Self {
        Dirty::empty()
    }
}

/// All shared state owned by the dispatcher.
#[derive(Debug, Default)]
pub struct StatusAreas {
    pub hosts: Vec<Host>,
    /// Hosts `0..live_hosts` are the live FSA; anything beyond is a
    /// placeholder carrying orphaned work after a layout change.
    pub live_hosts: usize,
    pub dirs: Vec<Dir>,
    /// Same split for the FRA.
    pub live_dirs: usize,
    pub queue: Vec<QueueItem>,
    pub cache: Vec<CacheRecord>,
    pub jobs: Vec<JobRecord>,
    pub status: AfdStatus,
    pub dirty: Dirty,
}

impl StatusAreas {
    /// Build from freshly loaded tables.
    pub fn new(
        hosts: Vec<Host>,
        dirs: Vec<Dir>,
        queue: Vec<QueueItem>,
        cache: Vec<CacheRecord>,
        jobs: Vec<JobRecord>,
        status: AfdStatus,
    ) -> Self {
        Self {
            live_hosts: hosts.len(),
            live_dirs: dirs.len(),
            hosts,
            dirs,
            queue,
            cache,
            jobs,
            status,
            dirty: Dirty::empty(),
        }
    }

    /// Resolve a stable host ID to its current live FSA index.
    pub fn host_pos_by_id(&self, host_id: HostId) -> Option<usize> {
        self.hosts[..self.live_hosts]
            .iter()
            .position(|h| h.host_id == host_id)
    }

    pub fn host_pos_by_alias(&self, alias: &str) -> Option<usize> {
        self.hosts[..self.live_hosts]
            .iter()
            .position(|h| h.alias == alias)
    }

    /// Resolve a stable directory ID to its current live FRA index.
    pub fn dir_pos_by_id(&self, dir_id: DirId) -> Option<usize> {
        self.dirs[..self.live_dirs]
            .iter()
            .position(|d| d.dir_id == dir_id)
    }

    pub fn dir_pos_by_alias(&self, alias: &str) -> Option<usize> {
        self.dirs[..self.live_dirs]
            .iter()
            .position(|d| d.alias == alias)
    }

    /// Resolve the FSA position serving a queue item.
    ///
    /// Fetch jobs go through their directory's host alias; send jobs go
    /// through the message cache, falling back to the stable host ID when
    /// the cached position went stale.
    pub fn host_pos_for_item(&mut self, qb_pos: usize) -> Option<usize> {
        let item = self.queue.get(qb_pos)?;
        if item.is_fetch() {
            let dir = self.dirs.get(item.pos as usize)?;
            let alias = dir.host_alias.clone();
            return self.host_pos_by_alias(&alias);
        }

        let cache_pos = item.pos as usize;
        let rec = self.cache.get(cache_pos)?;
        let cached = rec.fsa_pos;
        let host_id = rec.host_id;
        if rec.in_current_fsa
            && cached >= 0
            && (cached as usize) < self.live_hosts
            && self.hosts[cached as usize].host_id == host_id
        {
            return Some(cached as usize);
        }

        // Stale cache entry: re-resolve via the stable ID and repair it.
        let resolved = self.host_pos_by_id(host_id)?;
        if let Some(rec) = self.cache.get_mut(cache_pos) {
            rec.fsa_pos = resolved as i32;
            rec.in_current_fsa = true;
            self.dirty |= Dirty::CACHE;
        }
        Some(resolved)
    }

    /// Ordered insert by `(priority, msg_number)`; ties keep insertion
    /// order. Returns the slot the item landed in.
    pub fn insert_queue_item(&mut self, item: QueueItem) -> usize {
        let key = item.sort_key();
        let pos = self.queue.partition_point(|q| q.sort_key() <= key);
        self.queue.insert(pos, item);
        self.status.jobs_in_queue = self.queue.len() as i32;
        self.dirty |= Dirty::QUEUE | Dirty::STATUS;
        pos
    }

    /// Remove one queue slot, with the fetch-side directory bookkeeping.
    ///
    /// The tail moves one slot left; relative order of the survivors is
    /// untouched.
    pub fn remove_msg(&mut self, qb_pos: usize, now: u64) -> Vec<Event> {
        let mut events = Vec::new();
        if qb_pos >= self.queue.len() {
            return events;
        }

        let item = self.queue.remove(qb_pos);
        if item.is_fetch() {
            if let Some(dir) = self.dirs.get_mut(item.pos as usize) {
                dir.queued = dir.queued.saturating_sub(1);
                if dir.error_counter > 0 && dir.flags.contains(DirFlags::DIR_ERROR_SET) {
                    dir.flags.remove(DirFlags::DIR_ERROR_SET);
                    events.push(Event::DirErrorEnd {
                        dir_id: dir.dir_id,
                        alias: dir.alias.clone(),
                    });
                }
                dir.recalc_next_check_time(now);
                self.dirty |= Dirty::FRA;
            }
        }

        self.status.jobs_in_queue = self.queue.len() as i32;
        self.dirty |= Dirty::QUEUE | Dirty::STATUS;
        events
    }

    /// Queue position owned by the given worker pid.
    pub fn queue_pos_by_pid(&self, pid: i32) -> Option<usize> {
        self.queue.iter().position(|q| q.pid == pid)
    }

    pub fn queue_pos_by_msg_name(&self, msg_name: &afd_core::MsgName) -> Option<usize> {
        self.queue.iter().position(|q| &q.msg_name == msg_name)
    }

    /// Slots the queue file must hold: the next bucket boundary at or
    /// above the current length. Grows a bucket at a time and never
    /// shrinks within a run.
    pub fn queue_file_slots(&self) -> usize {
        let bucket = afd_core::MSG_QUE_BUF_SIZE;
        let len = self.queue.len();
        (len / bucket + 1) * bucket
    }

    /// True when nothing references the host: no queued item resolves to
    /// it and no worker runs against it.
    pub fn host_is_quiescent(&mut self, fsa_pos: usize) -> bool {
        if self
            .hosts
            .get(fsa_pos)
            .map(|h| h.active_transfers > 0)
            .unwrap_or(true)
        {
            return false;
        }
        for qb_pos in 0..self.queue.len() {
            if self.host_pos_for_item(qb_pos) == Some(fsa_pos) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

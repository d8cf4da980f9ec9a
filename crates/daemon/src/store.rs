// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Map-file persistence for the dispatcher's status areas.
//!
//! The dispatcher owns the tables in memory; this half pushes dirty
//! tables back into the fixed-layout files and pulls them up again at
//! startup or after a configuration rebuild.

use afd_core::{CacheRecord, Dir, Host, JobRecord, QueueItem};
use afd_engine::state::{Dirty, StatusAreas};
use afd_engine::WorkEnv;
use afd_storage::{read_id_file, write_id_file, AfdStatus, MapError, MapFile};
use std::io;
use tracing::{info, warn};

/// Open handles on every status-area file.
pub struct Store {
    fsa: MapFile<Host>,
    fra: MapFile<Dir>,
    queue: MapFile<QueueItem>,
    cache: MapFile<CacheRecord>,
    jid: MapFile<JobRecord>,
    status: MapFile<AfdStatus>,
    pub generation: i32,
}

impl Store {
    /// Attach every area, creating missing or stale files empty.
    pub fn open_or_create(env: &WorkEnv) -> Result<Self, MapError> {
        let generation = read_id_file(&env.fsa_id_path()).unwrap_or(0);
        write_id_file(&env.fsa_id_path(), generation)?;
        write_id_file(&env.fra_id_path(), generation)?;

        let fsa = attach_or_create(&env.fsa_path(generation))?;
        let fra = attach_or_create(&env.fra_path(generation))?;
        let queue = attach_or_create(&env.msg_queue_path())?;
        let cache = attach_or_create(&env.msg_cache_path())?;
        let jid = attach_or_create(&env.jid_path())?;

        let status = match MapFile::<AfdStatus>::attach(&env.status_path()) {
            Ok(map) => map,
            Err(MapError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                MapFile::create(&env.status_path(), &[AfdStatus::default()])?
            }
            Err(MapError::Stale { .. }) => {
                MapFile::create(&env.status_path(), &[AfdStatus::default()])?
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            fsa,
            fra,
            queue,
            cache,
            jid,
            status,
            generation,
        })
    }

    /// Read every table into a fresh in-memory state.
    pub fn load(&mut self) -> Result<StatusAreas, MapError> {
        let hosts = self.fsa.read_all()?;
        let dirs = self.fra.read_all()?;
        let queue = self.queue.read_all()?;
        let cache = self.cache.read_all()?;
        let jobs = self.jid.read_all()?;
        let status = self.status.read_pos(0)?;
        info!(
            hosts = hosts.len(),
            dirs = dirs.len(),
            queued = queue.len(),
            "status areas loaded"
        );
        Ok(StatusAreas::new(hosts, dirs, queue, cache, jobs, status))
    }

    /// Reload only the host and directory tables (configuration rebuild).
    pub fn load_layout(&mut self) -> Result<(Vec<Host>, Vec<Dir>), MapError> {
        Ok((self.fsa.read_all()?, self.fra.read_all()?))
    }

    /// Push every dirty table back to disk and clear the dirty set.
    pub fn save_dirty(&mut self, state: &mut StatusAreas) -> Result<(), MapError> {
        if state.dirty.contains(Dirty::FSA) {
            self.fsa.write_all(&state.hosts[..state.live_hosts])?;
        }
        if state.dirty.contains(Dirty::FRA) {
            self.fra.write_all(&state.dirs[..state.live_dirs])?;
        }
        if state.dirty.contains(Dirty::QUEUE) {
            self.queue.write_all(&state.queue)?;
            self.queue.reserve_capacity(state.queue_file_slots())?;
        }
        if state.dirty.contains(Dirty::CACHE) {
            self.cache.write_all(&state.cache)?;
        }
        if state.dirty.contains(Dirty::STATUS) {
            self.status.write_pos(0, &state.status)?;
        }
        state.dirty = Dirty::empty();
        Ok(())
    }

    /// Unconditional full write, used at shutdown.
    pub fn save_all(&mut self, state: &mut StatusAreas) -> Result<(), MapError> {
        state.dirty = Dirty::all();
        self.save_dirty(state)
    }
}

fn attach_or_create<R: afd_storage::Record>(path: &std::path::Path) -> Result<MapFile<R>, MapError> {
    match MapFile::<R>::attach(path) {
        Ok(map) => Ok(map),
        Err(MapError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            MapFile::create(path, &[])
        }
        Err(MapError::Stale { ref path, count }) => {
            warn!(path = %path.display(), count, "stale map, recreating empty");
            MapFile::create(path, &[])
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

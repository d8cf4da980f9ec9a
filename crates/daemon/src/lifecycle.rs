// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, crash recovery, shutdown.

use crate::env::Config;
use crate::store::Store;
use afd_engine::state::{Dirty, StatusAreas};
use afd_engine::{
    Dispatcher, DispatcherConfig, EngineError, ProcessSpawner, TransferSpawner, WorkEnv,
};
use afd_core::{Clock, SystemClock};
use afd_storage::heartbeat::Heartbeat;
use afd_storage::MapError;
use fs2::FileExt;
use std::fs::File;
use std::io::{self, Write as _};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("another afdd already holds the lock")]
    LockFailed(#[source] io::Error),
}

/// Everything `main` needs after a successful startup.
pub struct Startup {
    pub dispatcher: Dispatcher<ProcessSpawner, SystemClock>,
    pub store: Store,
    pub heartbeat: Heartbeat,
    // NOTE(lifetime): held to maintain the exclusive instance lock;
    // released on drop.
    #[allow(dead_code)]
    lock_file: File,
}

/// Bring the daemon up: lock, fifos, maps, recovery, dispatcher.
pub fn startup(config: &Config) -> Result<Startup, LifecycleError> {
    let env = config.work_env();
    env.ensure_layout()?;

    let lock_file = acquire_instance_lock(config)?;
    crate::listener::make_fifos(&env)?;

    let mut store = Store::open_or_create(&env)?;
    let mut state = store.load()?;
    recover(&mut state, &env);
    store.save_dirty(&mut state)?;

    let heartbeat = Heartbeat::create(&env.afd_active_path(), std::process::id() as i32)?;

    let dispatcher_cfg = DispatcherConfig {
        max_connections: config.max_connections,
        grace_window: config.grace_window,
        ..DispatcherConfig::default()
    };
    let spawner = ProcessSpawner::new(&config.worker_dir, env.progress_fifo_path());
    let dispatcher = Dispatcher::new(env, dispatcher_cfg, state, spawner, SystemClock)?;

    info!(work_dir = %config.work_dir.display(), "daemon started");
    Ok(Startup {
        dispatcher,
        store,
        heartbeat,
        lock_file,
    })
}

/// Walk the loaded state and clear everything a crash left behind.
///
/// Worker pids from a previous daemon are dead (or orphaned beyond our
/// reach), so every running marker is dropped and queue entries whose
/// staged payload vanished are removed.
pub fn recover(state: &mut StatusAreas, env: &WorkEnv) {
    let mut cleared_pids = 0;
    for item in &mut state.queue {
        if item.pid != 0 {
            item.pid = 0;
            item.connect_pos = -1;
            cleared_pids += 1;
        }
    }
    if cleared_pids > 0 {
        warn!(cleared_pids, "cleared stale worker pids from the queue");
        state.dirty |= Dirty::QUEUE;
    }

    for host in &mut state.hosts {
        if host.active_transfers != 0 {
            host.active_transfers = 0;
            host.recalc_trl();
            state.dirty |= Dirty::FSA;
        }
        for slot in &mut host.job_status {
            if !slot.is_idle() {
                slot.reset();
                state.dirty |= Dirty::FSA;
            }
        }
    }
    if state.status.no_of_transfers != 0 {
        state.status.no_of_transfers = 0;
        state.dirty |= Dirty::STATUS;
    }

    // Send jobs whose staged payload is gone cannot run; drop them.
    let mut qb_pos = 0;
    while qb_pos < state.queue.len() {
        let item = &state.queue[qb_pos];
        if !item.is_fetch() && !env.outgoing_dir(&item.msg_name).is_dir() {
            warn!(msg = %item.msg_name, "staged payload missing, dropping queue entry");
            state.remove_msg(qb_pos, SystemClock.epoch_secs());
        } else {
            qb_pos += 1;
        }
    }
}

/// Cancel outstanding workers, drain, persist, and release the lock.
pub async fn shutdown<S: TransferSpawner, C: Clock>(
    dispatcher: &mut Dispatcher<S, C>,
    store: &mut Store,
    drain_timeout: Duration,
) -> Result<(), LifecycleError> {
    dispatcher.begin_shutdown();

    let deadline = tokio::time::Instant::now() + drain_timeout;
    while !dispatcher.drained() {
        if tokio::time::Instant::now() >= deadline {
            warn!("drain timeout elapsed with workers outstanding");
            break;
        }
        dispatcher.tick()?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    store.save_all(&mut dispatcher.state)?;
    info!("daemon stopped");
    Ok(())
}

fn acquire_instance_lock(config: &Config) -> Result<File, LifecycleError> {
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&config.lock_path)?;
    file.try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher loop.
//!
//! Single-threaded owner of the status areas. Each tick reaps finished
//! workers, settles their accounting, enforces kill deadlines, sweeps the
//! FSA, walks the ready queue under the per-host and global caps, and
//! reports how long the shell may sleep before the next deadline.

use crate::connection::ConnectionTable;
use crate::delete;
use crate::env::WorkEnv;
use crate::error::EngineError;
use crate::error_engine::{remove_connection, Faulty};
use crate::error_queue::ErrorQueue;
use crate::fsa_check;
use crate::positions;
use crate::spawn::{SpawnRequest, TransferSpawner};
use crate::state::{Dirty, StatusAreas};
use afd_core::host::{ConnectStatus, HostFlags};
use afd_core::{Clock, Dir, Event, Host, MsgName, Protocol, ProtocolSet};
use afd_storage::{LockDir, Region};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Commands fed to the dispatcher by the fifo listener.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Resume dispatching.
    Start,
    /// Hold new work; running transfers finish.
    Stop,
    /// Stop dispatching, cancel outstanding workers, drain, exit.
    Shutdown,
    /// Remove one message wherever it is.
    DeleteMessage(MsgName),
    /// Force a queue walk now.
    FlushMsgFifo,
    /// Status-area layout changed; resync positions.
    CheckFsa,
}

/// Tunables of the dispatcher loop.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Global cap on simultaneously running workers.
    pub max_connections: usize,
    /// Sleep when nothing has a nearer deadline.
    pub idle_tick: Duration,
    /// Window between the stop signal and the hard kill.
    pub grace_window: Duration,
    /// Cadence of the FSA sanity sweep.
    pub fsa_check_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_connections: 50,
            idle_tick: Duration::from_secs(5),
            grace_window: Duration::from_secs(2),
            fsa_check_interval: Duration::from_secs(60),
        }
    }
}

/// The dispatcher core.
pub struct Dispatcher<S: TransferSpawner, C: Clock> {
    env: WorkEnv,
    cfg: DispatcherConfig,
    pub state: StatusAreas,
    pub connections: ConnectionTable,
    pub error_queue: ErrorQueue,
    spawner: S,
    clock: C,
    locks: LockDir,
    dispatching: bool,
    shutdown: bool,
    pending_kills: Vec<(i32, Instant)>,
    last_fsa_check: Instant,
}

impl<S: TransferSpawner, C: Clock> Dispatcher<S, C> {
    pub fn new(
        env: WorkEnv,
        cfg: DispatcherConfig,
        state: StatusAreas,
        spawner: S,
        clock: C,
    ) -> Result<Self, EngineError> {
        let locks = LockDir::new(env.fifo_dir())?;
        let connections = ConnectionTable::new(cfg.max_connections);
        let last_fsa_check = clock.now();
        Ok(Self {
            env,
            cfg,
            state,
            connections,
            error_queue: ErrorQueue::new(),
            spawner,
            clock,
            locks,
            dispatching: true,
            shutdown: false,
            pending_kills: Vec::new(),
            last_fsa_check,
        })
    }

    pub fn env(&self) -> &WorkEnv {
        &self.env
    }

    pub fn spawner_mut(&mut self) -> &mut S {
        &mut self.spawner
    }

    pub fn locks(&self) -> &LockDir {
        &self.locks
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown
    }

    /// True once every worker has been reaped after a shutdown request.
    pub fn drained(&self) -> bool {
        self.shutdown && self.connections.active_count() == 0
    }

    /// One scheduling round. Returns how long the shell may sleep.
    pub fn tick(&mut self) -> Result<(Duration, Vec<Event>), EngineError> {
        let mut events = Vec::new();
        let now = self.clock.epoch_secs();

        // Progress first, so a worker's final frames land before its exit
        // resets the slot.
        self.apply_progress();
        events.extend(self.reap_workers(now)?);
        self.enforce_kill_deadlines();

        if self.clock.now() >= self.last_fsa_check + self.cfg.fsa_check_interval {
            fsa_check::check_fsa_entries(
                &mut self.state,
                &self.connections,
                &self.error_queue,
                &self.locks,
                now,
            )?;
            self.last_fsa_check = self.clock.now();
        }

        if self.dispatching && !self.shutdown {
            self.scan_queue(now)?;
        }

        Ok((self.next_sleep(now), events))
    }

    /// Apply one command from the fifo listener.
    pub fn handle_command(&mut self, cmd: Command) -> Result<Vec<Event>, EngineError> {
        match cmd {
            Command::Start => {
                info!("dispatching started");
                self.dispatching = true;
                Ok(Vec::new())
            }
            Command::Stop => {
                info!("dispatching stopped");
                self.dispatching = false;
                Ok(Vec::new())
            }
            Command::Shutdown => {
                self.begin_shutdown();
                Ok(Vec::new())
            }
            Command::DeleteMessage(msg_name) => self.handle_delete(&msg_name),
            Command::FlushMsgFifo => {
                let now = self.clock.epoch_secs();
                if self.dispatching && !self.shutdown {
                    self.scan_queue(now)?;
                }
                Ok(Vec::new())
            }
            Command::CheckFsa => {
                let events = positions::get_new_positions(&mut self.state, &mut self.connections)?;
                Ok(events)
            }
        }
    }

    /// Swap in freshly reloaded status areas and re-anchor live workers.
    pub fn reload_areas(
        &mut self,
        hosts: Vec<Host>,
        dirs: Vec<Dir>,
    ) -> Result<Vec<Event>, EngineError> {
        self.state.live_hosts = hosts.len();
        self.state.hosts = hosts;
        self.state.live_dirs = dirs.len();
        self.state.dirs = dirs;
        positions::get_new_positions(&mut self.state, &mut self.connections)
    }

    /// Stop dispatching and push every worker down the INT → KILL ladder.
    pub fn begin_shutdown(&mut self) {
        if self.shutdown {
            return;
        }
        info!("shutdown requested, cancelling outstanding workers");
        self.dispatching = false;
        self.shutdown = true;
        let deadline = self.clock.now() + self.cfg.grace_window;
        let pids: Vec<i32> = self.connections.active().map(|(_, c)| c.pid).collect();
        for pid in pids {
            if let Err(e) = self.spawner.signal_stop(pid) {
                warn!(pid, error = %e, "stop signal failed");
            }
            self.pending_kills.push((pid, deadline));
        }
    }

    fn handle_delete(&mut self, msg_name: &MsgName) -> Result<Vec<Event>, EngineError> {
        let now = self.clock.epoch_secs();
        if let Some(qb_pos) = self.state.queue_pos_by_msg_name(msg_name) {
            let pid = self.state.queue[qb_pos].pid;
            if pid > 0 {
                // Best-effort immediate: interrupt now, hard-kill after
                // one grace window.
                if let Err(e) = self.spawner.signal_stop(pid) {
                    warn!(pid, error = %e, "stop signal failed");
                }
                self.pending_kills
                    .push((pid, self.clock.now() + self.cfg.grace_window));
            }
        }
        delete::delete_message(
            &mut self.state,
            &mut self.error_queue,
            &self.env,
            &self.locks,
            msg_name,
            now,
        )
    }

    /// Fold reported progress frames into the owning job slots.
    ///
    /// This is the update half of the worker hop: the fork/signal/reap
    /// side moves processes, this side moves the live transfer state the
    /// monitors read.
    fn apply_progress(&mut self) {
        for report in self.spawner.drain_progress() {
            let Some(conn_pos) = self.connections.pos_by_pid(report.pid) else {
                debug!(pid = report.pid, "progress from an unknown pid, dropping");
                continue;
            };
            let (fsa_pos, job_no) = match self.connections.get(conn_pos) {
                Some(c) if c.fsa_pos >= 0 && c.job_no >= 0 => {
                    (c.fsa_pos as usize, c.job_no as usize)
                }
                _ => continue,
            };
            let Some(slot) = self
                .state
                .hosts
                .get_mut(fsa_pos)
                .and_then(|h| h.job_status.get_mut(job_no))
            else {
                continue;
            };
            if slot.proc_id != report.pid {
                debug!(pid = report.pid, "progress for a recycled job slot, dropping");
                continue;
            }
            slot.connect_status = report.connect_status;
            slot.no_of_files_done = report.no_of_files_done;
            slot.file_size_done = report.file_size_done;
            slot.file_size_in_use = report.file_size_in_use;
            slot.file_name_in_use = report.file_name_in_use;
            self.state.dirty |= Dirty::FSA;
        }
    }

    fn reap_workers(&mut self, now: u64) -> Result<Vec<Event>, EngineError> {
        let mut events = Vec::new();
        for reaped in self.spawner.reap() {
            self.pending_kills.retain(|(pid, _)| *pid != reaped.pid);

            let conn_pos = match self.connections.pos_by_pid(reaped.pid) {
                Some(pos) => pos,
                None => {
                    debug!(pid = reaped.pid, "reaped a pid with no connection slot, ignoring");
                    continue;
                }
            };
            let msg_name = self
                .connections
                .get(conn_pos)
                .and_then(|c| c.msg_name);
            let host_id = self.connections.get(conn_pos).map(|c| c.host_id);

            events.extend(remove_connection(
                &mut self.state,
                &mut self.connections,
                conn_pos,
                reaped.faulty,
                now,
                &self.locks,
            )?);

            let qb_pos = self.state.queue_pos_by_pid(reaped.pid);
            match (reaped.faulty, qb_pos) {
                (Faulty::No, Some(qb_pos)) => {
                    self.settle_successful(qb_pos, now)?;
                    if let Some(msg_name) = msg_name {
                        self.error_queue.remove(&msg_name);
                    }
                    events.extend(self.state.remove_msg(qb_pos, now));
                }
                (Faulty::Yes, Some(qb_pos)) => {
                    let item = &mut self.state.queue[qb_pos];
                    item.pid = 0;
                    item.connect_pos = -1;
                    item.retries += 1;
                    self.state.dirty |= Dirty::QUEUE;
                    if let (Some(msg_name), Some(host_id)) = (msg_name, host_id) {
                        if let Some(fsa_pos) = self.state.host_pos_by_id(host_id) {
                            let retry = self.state.hosts[fsa_pos].retry_interval;
                            self.error_queue.add(msg_name, host_id, now + retry);
                            let _hs = self.locks.lock_region_w(Region::HostStatus(fsa_pos))?;
                            self.state.hosts[fsa_pos]
                                .status
                                .insert(HostFlags::ERROR_QUEUE_SET);
                            self.state.dirty |= Dirty::FSA;
                        }
                    }
                }
                (Faulty::Neither, Some(qb_pos)) => {
                    let item = &mut self.state.queue[qb_pos];
                    item.pid = 0;
                    item.connect_pos = -1;
                    self.state.dirty |= Dirty::QUEUE;
                }
                (_, None) => {
                    // Deleted while running; nothing left to settle.
                }
            }
        }
        Ok(events)
    }

    /// On a clean exit the staged payload is gone; the host's file totals
    /// follow it down.
    fn settle_successful(&mut self, qb_pos: usize, now: u64) -> Result<(), EngineError> {
        if let Some(fsa_pos) = self.state.host_pos_for_item(qb_pos) {
            let item = &self.state.queue[qb_pos];
            let files = item.files_to_send;
            let bytes = item.file_size_to_send;
            let _tfc = self
                .locks
                .lock_region_w(Region::TotalFileCounter(fsa_pos))?;
            let host = &mut self.state.hosts[fsa_pos];
            host.total_file_counter = host.total_file_counter.saturating_sub(files);
            host.total_file_size = host.total_file_size.saturating_sub(bytes);
            self.state.dirty |= Dirty::FSA;
        }
        let item = &self.state.queue[qb_pos];
        if !item.is_fetch() {
            let cache_pos = item.pos as usize;
            if let Some(rec) = self.state.cache.get_mut(cache_pos) {
                rec.last_transfer_time = now;
                self.state.dirty |= Dirty::CACHE;
            }
        }
        Ok(())
    }

    fn enforce_kill_deadlines(&mut self) {
        let now = self.clock.now();
        let due: Vec<i32> = self
            .pending_kills
            .iter()
            .filter(|(_, deadline)| *deadline <= now)
            .map(|(pid, _)| *pid)
            .collect();
        for pid in due {
            warn!(pid, "grace window elapsed, killing worker");
            if let Err(e) = self.spawner.kill(pid) {
                warn!(pid, error = %e, "kill failed");
            }
            self.pending_kills.retain(|(p, _)| *p != pid);
        }
    }

    fn scan_queue(&mut self, now: u64) -> Result<(), EngineError> {
        for qb_pos in 0..self.state.queue.len() {
            if self.state.queue[qb_pos].pid != 0 {
                continue;
            }
            if self.connections.active_count() >= self.connections.capacity() {
                debug!("connection table full, deferring the rest of the queue");
                break;
            }

            let fsa_pos = match self.state.host_pos_for_item(qb_pos) {
                Some(pos) => pos,
                None => continue,
            };
            {
                let host = &self.state.hosts[fsa_pos];
                if host.is_group()
                    || host.status.intersects(
                        HostFlags::PAUSE_QUEUE | HostFlags::STOP_TRANSFER | HostFlags::DISABLED,
                    )
                    || host.active_transfers >= host.allowed_transfers
                    || host.retry_pending(now)
                {
                    continue;
                }
            }
            self.start_worker(qb_pos, fsa_pos, now)?;
        }
        Ok(())
    }

    fn start_worker(&mut self, qb_pos: usize, fsa_pos: usize, now: u64) -> Result<(), EngineError> {
        let item = self.state.queue[qb_pos].clone();
        let host = &self.state.hosts[fsa_pos];

        let job_no = match host.free_job_slot() {
            Some(slot) => slot,
            None => {
                // Counter said a slot was free but the table disagrees;
                // the self-check sweep will reconcile.
                debug!(host = %host.alias, "no free job slot despite free counter");
                return Ok(());
            }
        };
        let conn_pos = match self.connections.alloc() {
            Some(pos) => pos,
            None => return Ok(()),
        };

        let protocol = primary_protocol(host.protocol);
        let protocol = match protocol {
            Some(p) => p,
            None => {
                debug!(host = %host.alias, "host has no usable protocol, skipping");
                return Ok(());
            }
        };
        let retrieve = item.is_fetch() || host.protocol.is_retrieve();
        let job_id = if item.is_fetch() {
            afd_core::JobId::NONE
        } else {
            self.state
                .cache
                .get(item.pos as usize)
                .map(|c| c.job_id)
                .unwrap_or(afd_core::JobId::NONE)
        };

        let req = SpawnRequest {
            msg_name: item.msg_name,
            host_alias: host.alias.clone(),
            hostname: host.active_hostname().to_string(),
            job_no,
            protocol,
            retrieve,
            outgoing: self.env.outgoing_dir(&item.msg_name),
            block_size: host.block_size,
            transfer_timeout: host.transfer_timeout,
            trl_per_process: host.trl_per_process,
            retries: item.retries,
            temp_toggle: false,
        };

        let pid = match self.spawner.spawn(&req) {
            Ok(pid) => pid,
            Err(e) => {
                // Soft error: the item stays runnable and no counters move.
                warn!(host = %req.host_alias, error = %e, "worker fork failed, retrying next tick");
                return Ok(());
            }
        };

        // Claim the connection slot.
        {
            let conn = self
                .connections
                .get_mut(conn_pos)
                .ok_or(EngineError::EmptyConnection(conn_pos))?;
            conn.pid = pid;
            conn.host_alias = req.host_alias.clone();
            conn.hostname = req.hostname.clone();
            conn.host_id = self.state.hosts[fsa_pos].host_id;
            conn.msg_name = Some(item.msg_name);
            conn.job_no = job_no as i32;
            conn.fsa_pos = fsa_pos as i32;
            conn.fra_pos = if item.is_fetch() { item.pos as i32 } else { -1 };
            conn.protocol = Some(protocol);
            conn.temp_toggle = false;
            if item.is_fetch() {
                conn.dir_alias = self
                    .state
                    .dirs
                    .get(item.pos as usize)
                    .map(|d| d.alias.clone())
                    .unwrap_or_default();
            }
        }

        // Mark the queue item as owned by this worker.
        {
            let qb = &mut self.state.queue[qb_pos];
            qb.pid = pid;
            qb.connect_pos = conn_pos as i32;
        }

        // Host-side bookkeeping moves under the host's counter lock.
        {
            let _ec = self.locks.lock_region_w(Region::ErrorCounter(fsa_pos))?;
            let host = &mut self.state.hosts[fsa_pos];
            let slot = &mut host.job_status[job_no];
            slot.connect_status = ConnectStatus::Connecting;
            slot.proc_id = pid;
            slot.job_id = job_id;
            slot.unique_name = item.msg_name.to_string();
            slot.no_of_files = item.files_to_send;
            slot.no_of_files_done = 0;
            slot.file_size = item.file_size_to_send;
            slot.file_size_done = 0;
            host.active_transfers += 1;
            host.recalc_trl();
        }
        self.state.status.no_of_transfers += 1;
        self.state.dirty |= Dirty::FSA | Dirty::QUEUE | Dirty::STATUS;

        debug!(
            pid,
            msg = %item.msg_name,
            host = %req.host_alias,
            job_no,
            "worker started"
        );
        Ok(())
    }

    fn next_sleep(&self, now: u64) -> Duration {
        let mut sleep = self.cfg.idle_tick;

        let mono_now = self.clock.now();
        for (_, deadline) in &self.pending_kills {
            let until = deadline.saturating_duration_since(mono_now);
            sleep = sleep.min(until.max(Duration::from_millis(10)));
        }

        if let Some(expiry) = self.error_queue.next_expiry() {
            let until = Duration::from_secs(expiry.saturating_sub(now));
            sleep = sleep.min(until);
        }
        for host in &self.state.hosts[..self.state.live_hosts] {
            if host.error_counter >= host.max_errors {
                let expiry = host.last_retry_time.saturating_add(host.retry_interval);
                sleep = sleep.min(Duration::from_secs(expiry.saturating_sub(now)));
            }
        }
        for dir in &self.state.dirs[..self.state.live_dirs] {
            if dir.next_check_time > now {
                sleep = sleep.min(Duration::from_secs(dir.next_check_time - now));
            }
        }

        sleep.max(Duration::from_millis(100))
    }
}

/// The first configured wire protocol of a host.
fn primary_protocol(set: ProtocolSet) -> Option<Protocol> {
    [
        (ProtocolSet::FTP, Protocol::Ftp),
        (ProtocolSet::SFTP, Protocol::Sftp),
        (ProtocolSet::SCP, Protocol::Scp),
        (ProtocolSet::HTTP, Protocol::Http),
        (ProtocolSet::SMTP, Protocol::Smtp),
        (ProtocolSet::WMO, Protocol::Wmo),
    ]
    .into_iter()
    .find(|(flag, _)| set.contains(*flag))
    .map(|(_, p)| p)
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

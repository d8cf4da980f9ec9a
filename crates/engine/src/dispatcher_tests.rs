// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::spawn::FakeSpawner;
use afd_core::host::MAX_PARALLEL_TRANSFERS;
use afd_core::{CacheRecord, FakeClock, HostId, JobId, QueueFlags, QueueItem};
use afd_storage::AfdStatus;

fn push_host(state: &mut StatusAreas, mut host: Host) {
    if host.protocol.is_empty() {
        host.protocol = ProtocolSet::FTP;
    }
    state.hosts.push(host);
    state.live_hosts = state.hosts.len();
}

fn enqueue(disp: &mut Dispatcher<FakeSpawner, FakeClock>, seq: u16, cache_pos: u32) -> MsgName {
    let creation = disp.state.queue.len() as u64 + 1_000;
    let msg_name = MsgName::new(creation, u32::from(seq), 0);
    let mut item = QueueItem::new(msg_name, creation, seq, b'5');
    item.pos = cache_pos;
    item.files_to_send = 5;
    item.file_size_to_send = 5_000;
    disp.state.insert_queue_item(item);
    msg_name
}

fn dispatcher(hosts: Vec<Host>) -> (tempfile::TempDir, Dispatcher<FakeSpawner, FakeClock>, FakeClock) {
    let tmp = tempfile::tempdir().unwrap();
    let env = WorkEnv::new(tmp.path());
    env.ensure_layout().unwrap();

    let mut state = StatusAreas::new(
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        AfdStatus::default(),
    );
    for (i, host) in hosts.into_iter().enumerate() {
        push_host(&mut state, host);
        state.cache.push(CacheRecord::new(
            JobId::new(i as u32 + 1),
            state.hosts[i].host_id,
            i as i32,
            0,
        ));
    }

    let clock = FakeClock::at_epoch(10_000);
    let cfg = DispatcherConfig {
        max_connections: 4,
        idle_tick: Duration::from_secs(5),
        grace_window: Duration::from_secs(2),
        fsa_check_interval: Duration::from_secs(3600),
    };
    let disp = Dispatcher::new(env, cfg, state, FakeSpawner::new(), clock.clone()).unwrap();
    (tmp, disp, clock)
}

fn default_host() -> Host {
    let mut host = Host::new("ber", HostId::new(0xa1b2));
    host.real_hostname = ["ber-a".to_string(), "ber-b".to_string()];
    host.allowed_transfers = 2;
    host.max_errors = 3;
    host.retry_interval = 120;
    host
}

#[test]
fn dispatch_honours_per_host_cap() {
    let (_tmp, mut disp, _clock) = dispatcher(vec![default_host()]);
    for seq in 0..3 {
        enqueue(&mut disp, seq, 0);
    }

    disp.tick().unwrap();

    assert_eq!(disp.spawner_mut().running.len(), 2);
    assert_eq!(disp.state.hosts[0].active_transfers, 2);
    assert_eq!(disp.state.status.no_of_transfers, 2);
    assert_eq!(
        disp.state.queue.iter().filter(|q| q.pid != 0).count(),
        2
    );
    // Job slots 0 and 1 are claimed, smallest first.
    assert!(disp.state.hosts[0].job_status[0].proc_id > 0);
    assert!(disp.state.hosts[0].job_status[1].proc_id > 0);
    assert_eq!(disp.state.hosts[0].job_status[2].proc_id, -1);
}

#[test]
fn global_connection_cap_defers_work() {
    let mut hosts = Vec::new();
    for i in 0..6 {
        let mut h = Host::new(format!("h{i}"), HostId::new(i as u32 + 1));
        h.allowed_transfers = 1;
        hosts.push(h);
    }
    let (_tmp, mut disp, _clock) = dispatcher(hosts);
    for i in 0..6u16 {
        enqueue(&mut disp, i, u32::from(i));
    }

    disp.tick().unwrap();
    // max_connections = 4 in the test config.
    assert_eq!(disp.spawner_mut().running.len(), 4);
}

#[test]
fn fork_failure_is_soft() {
    let (_tmp, mut disp, _clock) = dispatcher(vec![default_host()]);
    enqueue(&mut disp, 0, 0);
    disp.spawner_mut().fail_next_spawn = true;

    disp.tick().unwrap();
    assert_eq!(disp.state.queue[0].pid, 0);
    assert_eq!(disp.state.hosts[0].active_transfers, 0);
    assert_eq!(disp.state.status.no_of_transfers, 0);

    // Next tick succeeds.
    disp.tick().unwrap();
    assert_eq!(disp.state.queue[0].pid, 1001);
}

#[test]
fn successful_exit_clears_queue_and_counters() {
    // Scenario 1: one item, worker exits clean, error state resets.
    let mut host = default_host();
    host.error_counter = 3;
    host.error_history = [1, 1, 1, 0, 0];
    host.total_file_counter = 5;
    host.total_file_size = 5_000;
    let (_tmp, mut disp, _clock) = dispatcher(vec![host]);
    enqueue(&mut disp, 0, 0);

    disp.tick().unwrap();
    let pid = disp.spawner_mut().exit_next(Faulty::No).unwrap();
    assert!(pid > 0);
    disp.tick().unwrap();

    assert!(disp.state.queue.is_empty());
    let host = &disp.state.hosts[0];
    assert_eq!(host.active_transfers, 0);
    assert_eq!(host.error_counter, 0);
    assert_eq!(host.error_history[0], 0);
    assert_eq!(host.error_history[1], 0);
    assert_eq!(host.total_file_counter, 0);
    assert_eq!(host.total_file_size, 0);
    assert_eq!(disp.state.status.no_of_transfers, 0);
    assert!(host.job_status.iter().all(|s| s.proc_id == -1));
    assert_eq!(disp.connections.active_count(), 0);
}

#[test]
fn faulty_exit_requeues_with_backoff() {
    let (_tmp, mut disp, clock) = dispatcher(vec![default_host()]);
    let msg_name = enqueue(&mut disp, 0, 0);

    disp.tick().unwrap();
    disp.spawner_mut().exit_next(Faulty::Yes);
    disp.tick().unwrap();

    assert_eq!(disp.state.queue.len(), 1);
    assert_eq!(disp.state.queue[0].pid, 0);
    assert_eq!(disp.state.queue[0].retries, 1);
    assert_eq!(disp.state.hosts[0].error_counter, 1);
    assert!(disp.error_queue.contains(&msg_name));
    assert!(disp.state.hosts[0]
        .status
        .contains(HostFlags::ERROR_QUEUE_SET));

    // Host below max_errors: retried immediately on the next walk.
    disp.tick().unwrap();
    assert!(disp.state.queue[0].pid > 0);

    // Two more failures reach max_errors; now the retry window gates.
    disp.spawner_mut().exit_next(Faulty::Yes);
    disp.tick().unwrap();
    disp.spawner_mut().exit_next(Faulty::Yes);
    disp.tick().unwrap();
    assert_eq!(disp.state.hosts[0].error_counter, 3);
    disp.tick().unwrap();
    assert_eq!(disp.state.queue[0].pid, 0, "inside the retry window");

    clock.advance(Duration::from_secs(121));
    disp.tick().unwrap();
    assert!(disp.state.queue[0].pid > 0, "retry window elapsed");
}

#[test]
fn paused_disabled_and_group_hosts_are_skipped() {
    let mut paused = default_host();
    paused.status = HostFlags::PAUSE_QUEUE;
    let mut disabled = Host::new("off", HostId::new(2));
    disabled.status = HostFlags::DISABLED;
    let mut group = Host::new("eu", HostId::new(3));
    group.real_hostname[0] = format!("{}eu", afd_core::host::GROUP_IDENTIFIER);

    let (_tmp, mut disp, _clock) = dispatcher(vec![paused, disabled, group]);
    enqueue(&mut disp, 0, 0);
    enqueue(&mut disp, 1, 1);
    enqueue(&mut disp, 2, 2);

    disp.tick().unwrap();
    assert!(disp.spawner_mut().running.is_empty());
    assert!(disp.state.queue.iter().all(|q| q.pid == 0));
}

#[test]
fn stop_and_start_gate_dispatching() {
    let (_tmp, mut disp, _clock) = dispatcher(vec![default_host()]);
    enqueue(&mut disp, 0, 0);

    disp.handle_command(Command::Stop).unwrap();
    disp.tick().unwrap();
    assert!(disp.spawner_mut().running.is_empty());

    disp.handle_command(Command::Start).unwrap();
    disp.tick().unwrap();
    assert_eq!(disp.spawner_mut().running.len(), 1);
}

#[test]
fn delete_running_message_signals_then_kills() {
    let (_tmp, mut disp, clock) = dispatcher(vec![default_host()]);
    let msg_name = enqueue(&mut disp, 0, 0);
    let outgoing = disp.env().outgoing_dir(&msg_name);
    std::fs::create_dir_all(&outgoing).unwrap();

    disp.tick().unwrap();
    let pid = *disp.spawner_mut().running.first().unwrap();

    disp.handle_command(Command::DeleteMessage(msg_name)).unwrap();
    assert!(disp.state.queue.is_empty());
    assert!(!outgoing.exists());
    assert!(disp
        .spawner_mut()
        .signals
        .contains(&(pid, "INT")));

    // Counters shrank by the deleted footprint under the TFC region.
    assert_eq!(disp.state.hosts[0].total_file_counter, 0);

    // Worker ignores the interrupt; the grace window expires.
    clock.advance(Duration::from_secs(3));
    disp.tick().unwrap();
    assert!(disp.spawner_mut().signals.contains(&(pid, "KILL")));

    // The kill surfaces as a reaped exit on the next tick; the stale
    // connection is settled without error accounting.
    disp.tick().unwrap();
    assert_eq!(disp.connections.active_count(), 0);
    assert_eq!(disp.state.hosts[0].error_counter, 0);
}

#[test]
fn delete_idle_message_needs_no_signals() {
    let (_tmp, mut disp, _clock) = dispatcher(vec![default_host()]);
    let msg_name = enqueue(&mut disp, 0, 0);

    disp.handle_command(Command::DeleteMessage(msg_name)).unwrap();
    assert!(disp.state.queue.is_empty());
    assert!(disp.spawner_mut().signals.is_empty());
}

#[test]
fn shutdown_stops_dispatch_and_drains_workers() {
    let (_tmp, mut disp, clock) = dispatcher(vec![default_host()]);
    enqueue(&mut disp, 0, 0);
    enqueue(&mut disp, 1, 0);

    disp.tick().unwrap();
    assert_eq!(disp.spawner_mut().running.len(), 2);

    disp.handle_command(Command::Shutdown).unwrap();
    assert!(disp.shutdown_requested());
    assert!(!disp.drained());
    let ints = disp
        .spawner_mut()
        .signals
        .iter()
        .filter(|(_, s)| *s == "INT")
        .count();
    assert_eq!(ints, 2);

    // Workers ignore the interrupt; the grace kill reaps them.
    clock.advance(Duration::from_secs(3));
    disp.tick().unwrap();
    disp.tick().unwrap();
    assert!(disp.drained());
    assert_eq!(disp.state.status.no_of_transfers, 0);
}

#[test]
fn fetch_jobs_carry_their_directory() {
    let mut host = default_host();
    host.protocol = ProtocolSet::FTP | ProtocolSet::RETRIEVE;
    let (_tmp, mut disp, _clock) = dispatcher(vec![host]);

    let mut dir = afd_core::Dir::new("wx-in", afd_core::DirId::new(0xd1));
    dir.host_alias = "ber".to_string();
    disp.state.dirs.push(dir);
    disp.state.live_dirs = 1;

    let msg_name = MsgName::new(0xd1, 1, 0);
    let mut item = QueueItem::new(msg_name, 0xd1, 1, b'5');
    item.special_flag |= QueueFlags::FETCH_JOB;
    item.pos = 0;
    disp.state.insert_queue_item(item);

    disp.tick().unwrap();

    assert_eq!(disp.spawner_mut().running.len(), 1);
    let (_, req) = &disp.spawner_mut().spawned[0];
    assert!(req.retrieve);
    let conn = disp.connections.active().next().unwrap().1;
    assert_eq!(conn.fra_pos, 0);
    assert_eq!(conn.dir_alias, "wx-in");
}

#[test]
fn progress_frames_move_the_job_slot() {
    let (_tmp, mut disp, _clock) = dispatcher(vec![default_host()]);
    enqueue(&mut disp, 0, 0);

    disp.tick().unwrap();
    let pid = *disp.spawner_mut().running.first().unwrap();
    assert_eq!(
        disp.state.hosts[0].job_status[0].connect_status,
        ConnectStatus::Connecting
    );

    disp.spawner_mut().report_progress(crate::spawn::ProgressReport {
        pid,
        connect_status: ConnectStatus::FtpActive,
        no_of_files_done: 3,
        file_size_done: 3_000,
        file_size_in_use: 512,
        file_name_in_use: "wx_data_004".to_string(),
    });
    disp.tick().unwrap();

    let slot = &disp.state.hosts[0].job_status[0];
    assert_eq!(slot.connect_status, ConnectStatus::FtpActive);
    assert_eq!(slot.no_of_files_done, 3);
    assert_eq!(slot.file_size_done, 3_000);
    assert_eq!(slot.file_size_in_use, 512);
    assert_eq!(slot.file_name_in_use, "wx_data_004");

    // A link gone bad mid-run surfaces through the same channel.
    disp.spawner_mut().report_progress(crate::spawn::ProgressReport {
        pid,
        connect_status: ConnectStatus::NotWorking,
        no_of_files_done: 3,
        file_size_done: 3_000,
        file_size_in_use: 0,
        file_name_in_use: String::new(),
    });
    disp.tick().unwrap();
    assert_eq!(
        disp.state.hosts[0].job_status[0].connect_status,
        ConnectStatus::NotWorking
    );

    // The exit still settles cleanly afterwards.
    disp.spawner_mut().exit_next(Faulty::No);
    disp.tick().unwrap();
    assert!(disp.state.hosts[0].job_status[0].is_idle());
}

#[test]
fn progress_from_unknown_pids_is_dropped() {
    let (_tmp, mut disp, _clock) = dispatcher(vec![default_host()]);
    disp.spawner_mut().report_progress(crate::spawn::ProgressReport {
        pid: 9_999,
        connect_status: ConnectStatus::FtpActive,
        no_of_files_done: 1,
        file_size_done: 1,
        file_size_in_use: 0,
        file_name_in_use: String::new(),
    });
    disp.tick().unwrap();
    assert!(disp.state.hosts[0].job_status.iter().all(|s| s.is_idle()));
}

#[test]
fn unknown_reaped_pid_is_ignored() {
    let (_tmp, mut disp, _clock) = dispatcher(vec![default_host()]);
    disp.spawner_mut().exit_worker(9_999, Faulty::No);
    disp.tick().unwrap();
    assert_eq!(disp.state.status.no_of_transfers, 0);
}

#[test]
fn next_sleep_tracks_the_earliest_deadline() {
    let (_tmp, mut disp, _clock) = dispatcher(vec![default_host()]);
    let (sleep, _) = disp.tick().unwrap();
    assert_eq!(sleep, Duration::from_secs(5), "idle tick with nothing due");

    // A host sitting out its retry interval pulls the deadline in.
    disp.state.hosts[0].error_counter = 3;
    disp.state.hosts[0].last_retry_time = 10_000;
    disp.state.hosts[0].retry_interval = 3;
    let (sleep, _) = disp.tick().unwrap();
    assert!(sleep <= Duration::from_secs(3));
}

#[test]
fn max_parallel_slots_bound_job_numbers() {
    let mut host = default_host();
    host.allowed_transfers = MAX_PARALLEL_TRANSFERS as u32;
    let (_tmp, mut disp, _clock) = dispatcher(vec![host]);
    for seq in 0..MAX_PARALLEL_TRANSFERS as u16 + 2 {
        enqueue(&mut disp, seq, 0);
    }

    disp.tick().unwrap();
    assert_eq!(disp.spawner_mut().running.len(), MAX_PARALLEL_TRANSFERS.min(4));
}

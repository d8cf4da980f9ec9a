//! Scenario: the periodic sweep corrects counter drift.

use crate::prelude::*;
use afd_engine::fsa_check::check_fsa_entries;
use afd_engine::{ConnectionTable, ErrorQueue};
use afd_storage::LockDir;

#[test]
fn sweep_corrects_a_quiescent_host() {
    let tmp = tempfile::tempdir().unwrap();
    let env = WorkEnv::new(tmp.path());
    env.ensure_layout().unwrap();
    let locks = LockDir::new(env.fifo_dir()).unwrap();

    // Drifted: two active transfers recorded, but no workers exist and
    // nothing is queued.
    let mut host = Host::new("ber", HostId::new(0xa1b2));
    host.protocol = ProtocolSet::FTP | ProtocolSet::RETRIEVE;
    host.active_transfers = 2;
    host.total_file_counter = 4;
    host.total_file_size = 4_000;
    host.error_counter = 1;
    host.error_history = [2, 2, 0, 0, 0];
    host.job_status[1].proc_id = 4242;

    let mut dir = Dir::new("wx-in", DirId::new(0xd1));
    dir.host_alias = "ber".to_string();
    dir.queued = 3;

    let mut state = StatusAreas::new(
        vec![host],
        vec![dir],
        Vec::new(),
        Vec::new(),
        Vec::new(),
        AfdStatus::default(),
    );

    let connections = ConnectionTable::new(4);
    let error_queue = ErrorQueue::new();
    check_fsa_entries(&mut state, &connections, &error_queue, &locks, 1_000).unwrap();

    let host = &state.hosts[0];
    assert_eq!(host.active_transfers, 0);
    assert_eq!(host.total_file_counter, 0);
    assert_eq!(host.total_file_size, 0);
    assert_eq!(host.error_counter, 0);
    assert_eq!(&host.error_history[..3], &[0, 0, 0]);
    assert!(host.job_status.iter().all(|s| s.is_idle()));

    // Retrieve host: matching directories lose their queued counter too.
    assert_eq!(state.dirs[0].queued, 0);
}

#[test]
fn sweep_leaves_busy_hosts_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let env = WorkEnv::new(tmp.path());
    env.ensure_layout().unwrap();
    let locks = LockDir::new(env.fifo_dir()).unwrap();

    let mut host = Host::new("ber", HostId::new(0xa1b2));
    host.protocol = ProtocolSet::FTP;
    host.active_transfers = 1;
    let mut state = StatusAreas::new(
        vec![host],
        Vec::new(),
        Vec::new(),
        vec![CacheRecord::new(JobId::new(1), HostId::new(0xa1b2), 0, 0)],
        Vec::new(),
        AfdStatus::default(),
    );
    let mut item = QueueItem::new(MsgName::new(1_000, 1, 0), 1_000, 1, b'5');
    item.pos = 0;
    state.insert_queue_item(item);

    let connections = ConnectionTable::new(4);
    let error_queue = ErrorQueue::new();
    check_fsa_entries(&mut state, &connections, &error_queue, &locks, 1_000).unwrap();

    // Still referenced by a queued item: untouched.
    assert_eq!(state.hosts[0].active_transfers, 1);
}

#[test]
fn sweep_clears_a_stale_error_queue_bit() {
    let tmp = tempfile::tempdir().unwrap();
    let env = WorkEnv::new(tmp.path());
    env.ensure_layout().unwrap();
    let locks = LockDir::new(env.fifo_dir()).unwrap();

    let mut host = Host::new("ber", HostId::new(0xa1b2));
    host.protocol = ProtocolSet::FTP;
    host.status = HostFlags::ERROR_QUEUE_SET;
    let mut state = StatusAreas::new(
        vec![host],
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        AfdStatus::default(),
    );

    let connections = ConnectionTable::new(4);
    let error_queue = ErrorQueue::new();
    check_fsa_entries(&mut state, &connections, &error_queue, &locks, 1_000).unwrap();

    assert!(!state.hosts[0].status.contains(HostFlags::ERROR_QUEUE_SET));
}

#[test]
fn oversized_slot_tables_are_reset() {
    let tmp = tempfile::tempdir().unwrap();
    let env = WorkEnv::new(tmp.path());
    env.ensure_layout().unwrap();
    let locks = LockDir::new(env.fifo_dir()).unwrap();

    let mut host = Host::new("ber", HostId::new(0xa1b2));
    host.protocol = ProtocolSet::FTP;
    host.allowed_transfers = 99;
    host.job_status[0].proc_id = 17;
    let mut state = StatusAreas::new(
        vec![host],
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        AfdStatus::default(),
    );

    let connections = ConnectionTable::new(4);
    let error_queue = ErrorQueue::new();
    check_fsa_entries(&mut state, &connections, &error_queue, &locks, 1_000).unwrap();

    assert_eq!(
        state.hosts[0].allowed_transfers,
        MAX_PARALLEL_TRANSFERS as u32
    );
    assert!(state.hosts[0].job_status.iter().all(|s| s.is_idle()));
}

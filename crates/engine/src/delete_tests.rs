// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use afd_core::{CacheRecord, Host, HostId, JobId, QueueItem};
use afd_storage::AfdStatus;

fn setup() -> (tempfile::TempDir, WorkEnv, LockDir, StatusAreas, ErrorQueue) {
    let tmp = tempfile::tempdir().unwrap();
    let env = WorkEnv::new(tmp.path());
    env.ensure_layout().unwrap();
    let locks = LockDir::new(env.fifo_dir()).unwrap();

    let mut host = Host::new("ber", HostId::new(0xa1b2));
    host.total_file_counter = 8;
    host.total_file_size = 9_000;
    let state = StatusAreas::new(
        vec![host],
        Vec::new(),
        Vec::new(),
        vec![CacheRecord::new(JobId::new(1), HostId::new(0xa1b2), 0, 0)],
        Vec::new(),
        AfdStatus::default(),
    );
    (tmp, env, locks, state, ErrorQueue::new())
}

fn queued_message(state: &mut StatusAreas, env: &WorkEnv) -> MsgName {
    let msg_name = MsgName::new(0x65a01c2f, 0x4e2, 0);
    let mut item = QueueItem::new(msg_name, 0x65a01c2f, 0, b'5');
    item.pos = 0;
    item.files_to_send = 5;
    item.file_size_to_send = 5_000;
    state.insert_queue_item(item);

    let outgoing = env.outgoing_dir(&msg_name);
    std::fs::create_dir_all(&outgoing).unwrap();
    std::fs::write(outgoing.join("payload_1"), b"x").unwrap();
    msg_name
}

#[test]
fn delete_removes_entry_files_and_counters() {
    // P6: queue entry gone, outgoing directory gone, counters shrunk by
    // exactly the message's footprint.
    let (_tmp, env, locks, mut state, mut eq) = setup();
    let msg_name = queued_message(&mut state, &env);
    eq.add(msg_name, HostId::new(0xa1b2), 9_999);

    let events = delete_message(&mut state, &mut eq, &env, &locks, &msg_name, 0).unwrap();

    assert!(state.queue.is_empty());
    assert!(!env.outgoing_dir(&msg_name).exists());
    assert_eq!(state.hosts[0].total_file_counter, 3);
    assert_eq!(state.hosts[0].total_file_size, 4_000);
    assert!(!eq.contains(&msg_name));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::MessageDeleted { msg_name: m } if *m == msg_name)));
}

#[test]
fn unknown_message_is_ignored() {
    let (_tmp, env, locks, mut state, mut eq) = setup();
    let ghost = MsgName::new(1, 2, 3);
    let events = delete_message(&mut state, &mut eq, &env, &locks, &ghost, 0).unwrap();
    assert!(events.is_empty());
}

#[test]
fn counters_clamp_at_zero() {
    let (_tmp, env, locks, mut state, mut eq) = setup();
    state.hosts[0].total_file_counter = 2;
    state.hosts[0].total_file_size = 100;
    let msg_name = queued_message(&mut state, &env);

    delete_message(&mut state, &mut eq, &env, &locks, &msg_name, 0).unwrap();
    assert_eq!(state.hosts[0].total_file_counter, 0);
    assert_eq!(state.hosts[0].total_file_size, 0);
}

#[test]
fn missing_outgoing_directory_is_tolerated() {
    let (_tmp, env, locks, mut state, mut eq) = setup();
    let msg_name = queued_message(&mut state, &env);
    std::fs::remove_dir_all(env.outgoing_dir(&msg_name)).unwrap();

    delete_message(&mut state, &mut eq, &env, &locks, &msg_name, 0).unwrap();
    assert!(state.queue.is_empty());
}

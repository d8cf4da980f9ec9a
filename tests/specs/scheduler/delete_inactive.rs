//! Scenario: deleting a queued message while the dispatcher is down.
//!
//! With no dispatcher to forward the fifo command to, the removal runs
//! directly against the shared state under the same region locks.

use crate::prelude::*;
use afd_engine::delete::delete_message;
use afd_engine::ErrorQueue;
use afd_storage::LockDir;

#[test]
fn direct_delete_mirrors_the_fifo_path() {
    let tmp = tempfile::tempdir().unwrap();
    let env = WorkEnv::new(tmp.path());
    env.ensure_layout().unwrap();
    let locks = LockDir::new(env.fifo_dir()).unwrap();

    let mut host = Host::new("ber", HostId::new(0xa1b2));
    host.total_file_counter = 7;
    host.total_file_size = 9_000;
    let mut state = StatusAreas::new(
        vec![host],
        Vec::new(),
        Vec::new(),
        vec![CacheRecord::new(JobId::new(1), HostId::new(0xa1b2), 0, 0)],
        Vec::new(),
        AfdStatus::default(),
    );

    let msg_name = MsgName::new(0x65a01c2f, 0x4e2, 0);
    let mut item = QueueItem::new(msg_name, 0x65a01c2f, 0, b'5');
    item.pos = 0;
    item.files_to_send = 5;
    item.file_size_to_send = 5_000;
    state.insert_queue_item(item);

    let outgoing = env.outgoing_dir(&msg_name);
    std::fs::create_dir_all(&outgoing).unwrap();
    std::fs::write(outgoing.join("staged_1"), b"x").unwrap();

    let mut error_queue = ErrorQueue::new();
    error_queue.add(msg_name, HostId::new(0xa1b2), 99);

    delete_message(&mut state, &mut error_queue, &env, &locks, &msg_name, 0).unwrap();

    // P6 / scenario 5: entry gone, payload gone, counters decreased by
    // exactly the removed footprint.
    assert!(state.queue.is_empty());
    assert!(!outgoing.exists());
    assert_eq!(state.hosts[0].total_file_counter, 2);
    assert_eq!(state.hosts[0].total_file_size, 4_000);
    assert!(!error_queue.contains(&msg_name));
}

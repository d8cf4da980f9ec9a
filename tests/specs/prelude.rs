//! Shared helpers for scheduler scenarios.

pub use afd_core::host::{HostFlags, MAX_PARALLEL_TRANSFERS};
pub use afd_core::{
    CacheRecord, Dir, DirId, FakeClock, Host, HostId, JobId, MsgName, ProtocolSet, QueueFlags,
    QueueItem,
};
pub use afd_engine::{
    Command, Dispatcher, DispatcherConfig, FakeSpawner, Faulty, StatusAreas, WorkEnv,
};
pub use afd_storage::AfdStatus;
pub use std::time::Duration;

pub type TestDispatcher = Dispatcher<FakeSpawner, FakeClock>;

/// A dispatcher over a real temporary work directory.
pub fn dispatcher_with(
    hosts: Vec<Host>,
) -> (tempfile::TempDir, TestDispatcher, FakeClock) {
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
    for (i, mut host) in hosts.into_iter().enumerate() {
        if host.protocol.is_empty() {
            host.protocol = ProtocolSet::FTP;
        }
        let host_id = host.host_id;
        state.hosts.push(host);
        state.live_hosts = state.hosts.len();
        state
            .cache
            .push(CacheRecord::new(JobId::new(i as u32 + 1), host_id, i as i32, 0));
    }

    let clock = FakeClock::at_epoch(1_700_000_000);
    let cfg = DispatcherConfig {
        max_connections: 8,
        idle_tick: Duration::from_secs(5),
        grace_window: Duration::from_secs(2),
        fsa_check_interval: Duration::from_secs(3600),
    };
    let dispatcher =
        Dispatcher::new(env, cfg, state, FakeSpawner::new(), clock.clone()).unwrap();
    (tmp, dispatcher, clock)
}

/// Queue one send job against the cache entry at `cache_pos`, staging a
/// payload directory for it.
pub fn enqueue_send_job(
    disp: &mut TestDispatcher,
    cache_pos: u32,
    files: u32,
    bytes: u64,
) -> MsgName {
    let seq = disp.state.queue.len() as u16;
    let creation = 1_700_000_000 + u64::from(seq);
    let msg_name = MsgName::new(creation, u32::from(seq) + 1, 0);
    let mut item = QueueItem::new(msg_name, creation, seq, b'5');
    item.pos = cache_pos;
    item.files_to_send = files;
    item.file_size_to_send = bytes;
    disp.state.insert_queue_item(item);

    let outgoing = disp.env().outgoing_dir(&msg_name);
    std::fs::create_dir_all(&outgoing).unwrap();
    for i in 0..files {
        std::fs::write(outgoing.join(format!("file_{i}")), vec![0u8; 8]).unwrap();
    }
    msg_name
}

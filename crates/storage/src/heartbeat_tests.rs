// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_file_is_distinct_from_stalled() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("AFD_ACTIVE");

    assert_eq!(
        probe(&path, Duration::from_millis(10)).unwrap(),
        Presence::Missing
    );

    Heartbeat::create(&path, 1234).unwrap();
    assert_eq!(
        probe(&path, Duration::from_millis(60)).unwrap(),
        Presence::Stalled
    );
}

#[test]
fn moving_heartbeat_reads_alive() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("AFD_ACTIVE");
    let mut hb = Heartbeat::create(&path, 1234).unwrap();

    let probe_path = path.clone();
    let handle = std::thread::spawn(move || probe(&probe_path, Duration::from_millis(500)));

    for _ in 0..5 {
        std::thread::sleep(Duration::from_millis(20));
        hb.bump().unwrap();
    }
    assert_eq!(handle.join().unwrap().unwrap(), Presence::Alive);
}

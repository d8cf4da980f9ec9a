//! Scenario: one queued message delivered cleanly.

use crate::prelude::*;

fn seeded_host() -> Host {
    let mut host = Host::new("ber", HostId::new(0xa1b2));
    host.real_hostname = ["ber-a".to_string(), String::new()];
    host.allowed_transfers = 2;
    host.max_errors = 10;
    host.error_counter = 3;
    host.error_history = [1, 1, 1, 0, 0];
    host
}

#[test]
fn single_success_resets_the_host() {
    let (_tmp, mut disp, _clock) = dispatcher_with(vec![seeded_host()]);
    disp.state.hosts[0].total_file_counter = 5;
    disp.state.hosts[0].total_file_size = 5_000;
    enqueue_send_job(&mut disp, 0, 5, 5_000);

    let transfers_before = disp.state.status.no_of_transfers;

    disp.tick().unwrap();
    assert_eq!(disp.spawner_mut().running.len(), 1);
    assert_eq!(disp.state.status.no_of_transfers, transfers_before + 1);

    disp.spawner_mut().exit_next(Faulty::No);
    disp.tick().unwrap();

    // Queue empty, error state cleared, counters net-unchanged.
    assert!(disp.state.queue.is_empty());
    let host = &disp.state.hosts[0];
    assert_eq!(host.active_transfers, 0);
    assert_eq!(host.error_counter, 0, "prior errors reset on clean completion");
    assert_eq!(&host.error_history[..3], &[0, 0, 0]);
    assert_eq!(host.total_file_counter, 0);
    assert_eq!(host.total_file_size, 0);
    assert_eq!(disp.state.status.no_of_transfers, transfers_before);
    assert!(host.job_status.iter().all(|s| s.proc_id == -1));
}

#[test]
fn quiescent_counters_conserve() {
    // P1/P2: at quiescence nothing is negative and nothing is left over.
    let (_tmp, mut disp, _clock) = dispatcher_with(vec![seeded_host()]);
    disp.state.hosts[0].total_file_counter = 10;
    disp.state.hosts[0].total_file_size = 10_000;
    for _ in 0..2 {
        enqueue_send_job(&mut disp, 0, 5, 5_000);
    }

    disp.tick().unwrap();
    while disp.spawner_mut().exit_next(Faulty::No).is_some() {
        disp.tick().unwrap();
    }
    disp.tick().unwrap();

    let host = &disp.state.hosts[0];
    assert!(disp.state.queue.is_empty());
    assert_eq!(host.active_transfers, 0);
    assert_eq!(host.total_file_counter, 0);
    assert_eq!(host.total_file_size, 0);
    assert_eq!(disp.state.status.no_of_transfers, 0);
}

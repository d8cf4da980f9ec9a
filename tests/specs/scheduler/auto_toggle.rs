//! Scenario: sustained failure flips the host to its second hostname.

use crate::prelude::*;
use afd_core::host::HostToggle;

fn toggling_host() -> Host {
    let mut host = Host::new("ber", HostId::new(0xa1b2));
    host.dsp_name = "ber1".to_string();
    host.toggle_pos = 3;
    host.real_hostname = ["ber-a".to_string(), "ber-b".to_string()];
    host.auto_toggle = true;
    host.max_errors = 3;
    host.allowed_transfers = 1;
    host.retry_interval = 120;
    host
}

#[test]
fn three_faulty_exits_toggle_the_host() {
    let (_tmp, mut disp, clock) = dispatcher_with(vec![toggling_host()]);
    enqueue_send_job(&mut disp, 0, 1, 100);

    for round in 0..3 {
        disp.tick().unwrap();
        assert_eq!(
            disp.spawner_mut().running.len(),
            1,
            "round {round}: worker should be running"
        );
        disp.spawner_mut().exit_next(Faulty::Yes);
        disp.tick().unwrap();
        // Stay outside the retry window between rounds.
        clock.advance(Duration::from_secs(121));
    }

    let host = &disp.state.hosts[0];
    assert_eq!(host.toggle, HostToggle::Two);
    assert_eq!(host.original_toggle, Some(HostToggle::One));
    assert_eq!(host.error_counter, 3);
    assert_eq!(host.total_errors, 3);
    assert_eq!(host.dsp_name, "ber2");
    assert!(host.status.contains(HostFlags::NOT_WORKING));

    // The next worker goes to the alternate hostname.
    disp.tick().unwrap();
    let (_, last_req) = disp.spawner_mut().spawned.last().unwrap().clone();
    assert_eq!(last_req.hostname, "ber-b");
}

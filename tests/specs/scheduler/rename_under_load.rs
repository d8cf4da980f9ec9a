//! Scenarios: configuration rebuild while a worker is running.

use crate::prelude::*;

fn seeded_host(alias: &str) -> Host {
    let mut host = Host::new(alias, HostId::new(0xa1b2));
    host.real_hostname = [format!("{alias}-a"), String::new()];
    host.allowed_transfers = 2;
    host
}

fn start_one_worker(disp: &mut TestDispatcher) {
    enqueue_send_job(disp, 0, 1, 100);
    disp.tick().unwrap();
    assert_eq!(disp.spawner_mut().running.len(), 1);
}

#[test]
fn rename_keeps_the_worker_on_its_host() {
    // Scenario 3: same host ID, new alias, rebuilt FSA.
    let (_tmp, mut disp, _clock) = dispatcher_with(vec![seeded_host("ber")]);
    start_one_worker(&mut disp);

    let mut renamed = disp.state.hosts[0].clone();
    renamed.alias = "berlin".to_string();
    let rebuilt = vec![Host::new("unrelated", HostId::new(0x1)), renamed];
    disp.reload_areas(rebuilt, Vec::new()).unwrap();

    let conn = disp.connections.active().next().unwrap().1.clone();
    assert_eq!(conn.fsa_pos, 1);
    assert_eq!(disp.state.hosts[1].host_id, HostId::new(0xa1b2));
    assert_eq!(disp.state.hosts[1].active_transfers, 1);

    // The worker's exit still settles against the renamed host.
    disp.spawner_mut().exit_next(Faulty::No);
    disp.tick().unwrap();
    assert_eq!(disp.state.hosts[1].active_transfers, 0);
}

#[test]
fn removed_host_parks_the_worker_behind_the_fsa() {
    // Scenario 4: the host is gone from the rebuilt FSA entirely.
    let (_tmp, mut disp, _clock) = dispatcher_with(vec![seeded_host("ber")]);
    start_one_worker(&mut disp);
    let pid = *disp.spawner_mut().running.first().unwrap();

    disp.reload_areas(vec![Host::new("unrelated", HostId::new(0x1))], Vec::new())
        .unwrap();

    let conn = disp.connections.active().next().unwrap().1.clone();
    assert_eq!(conn.fsa_pos as usize, disp.state.live_hosts);

    let placeholder = &disp.state.hosts[disp.state.live_hosts];
    assert_eq!(placeholder.alias, "ber");
    assert_eq!(placeholder.host_id, HostId::new(0xa1b2));
    assert_eq!(placeholder.allowed_transfers, MAX_PARALLEL_TRANSFERS as u32);
    assert_eq!(placeholder.active_transfers, 1);
    assert_eq!(placeholder.job_status[0].proc_id, pid);

    // The old position's slot is free for new work.
    assert_eq!(disp.state.hosts[0].job_status[0].proc_id, -1);

    // Draining the worker still works against the placeholder.
    disp.spawner_mut().exit_next(Faulty::No);
    disp.tick().unwrap();
    assert_eq!(disp.state.hosts[disp.state.live_hosts].active_transfers, 0);
    assert_eq!(disp.connections.active_count(), 0);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn alloc_returns_smallest_free_slot() {
    let mut table = ConnectionTable::new(3);
    assert_eq!(table.alloc(), Some(0));

    table.get_mut(0).unwrap().pid = 100;
    table.get_mut(2).unwrap().pid = 300;
    assert_eq!(table.alloc(), Some(1));

    table.get_mut(1).unwrap().pid = 200;
    assert_eq!(table.alloc(), None);
    assert_eq!(table.active_count(), 3);
}

#[test]
fn reset_zeroes_every_field() {
    let mut table = ConnectionTable::new(1);
    {
        let c = table.get_mut(0).unwrap();
        c.pid = 4242;
        c.host_alias = "ber".to_string();
        c.hostname = "ber-a".to_string();
        c.host_id = HostId::new(0xa1b2);
        c.dir_alias = "wx-in".to_string();
        c.msg_name = Some(MsgName::new(1, 2, 3));
        c.job_no = 2;
        c.fsa_pos = 4;
        c.fra_pos = 1;
        c.protocol = Some(Protocol::Ftp);
        c.temp_toggle = true;
    }
    table.get_mut(0).unwrap().reset();

    let c = table.get(0).unwrap();
    assert!(c.is_free());
    assert_eq!(c.job_no, -1);
    assert_eq!(c.fsa_pos, -1);
    assert_eq!(c.fra_pos, -1);
    assert!(c.host_alias.is_empty());
    assert!(c.hostname.is_empty());
    assert!(c.msg_name.is_none());
    assert!(!c.temp_toggle);
}

#[test]
fn pid_lookup_ignores_free_slots() {
    let table = ConnectionTable::new(2);
    assert_eq!(table.pos_by_pid(0), None);

    let mut table = ConnectionTable::new(2);
    table.get_mut(1).unwrap().pid = 77;
    assert_eq!(table.pos_by_pid(77), Some(1));
    assert_eq!(table.pos_by_pid(78), None);
}

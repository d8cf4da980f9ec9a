// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn item(creation_time: u64, sequence: u16, priority: u8) -> QueueItem {
    QueueItem::new(
        MsgName::new(creation_time, u32::from(sequence), 0),
        creation_time,
        sequence,
        priority,
    )
}

#[test]
fn msg_number_orders_by_time_then_sequence() {
    let early = QueueItem::msg_number(1_000, 9);
    let late_same_second = QueueItem::msg_number(1_000, 10);
    let next_second = QueueItem::msg_number(1_001, 0);

    assert!(early < late_same_second);
    assert!(late_same_second < next_second);
}

#[test]
fn sort_key_puts_priority_first() {
    let urgent_new = item(2_000, 0, b'0');
    let lazy_old = item(1_000, 0, b'9');
    assert!(urgent_new.sort_key() < lazy_old.sort_key());
}

#[test]
fn fetch_flag_switches_pos_meaning() {
    let mut it = item(1_000, 0, b'5');
    assert!(!it.is_fetch());
    it.special_flag |= QueueFlags::FETCH_JOB;
    assert!(it.is_fetch());
}

#[test]
fn fresh_item_is_not_running() {
    let it = item(1_000, 0, b'5');
    assert!(!it.is_running());
    assert_eq!(it.connect_pos, -1);
}

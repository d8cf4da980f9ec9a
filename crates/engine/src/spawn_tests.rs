// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn report(pid: i32) -> ProgressReport {
    ProgressReport {
        pid,
        connect_status: ConnectStatus::FtpActive,
        no_of_files_done: 3,
        file_size_done: 3_000,
        file_size_in_use: 512,
        file_name_in_use: "wx_data_004".to_string(),
    }
}

#[test]
fn progress_frame_round_trips() {
    let rep = report(4242);
    let parsed: ProgressReport = rep.to_string().parse().unwrap();
    assert_eq!(parsed, rep);
}

#[test]
fn frame_format_is_pipe_delimited() {
    assert_eq!(report(4242).to_string(), "4242|3|3|3000|512|wx_data_004");
}

#[test]
fn empty_file_name_round_trips() {
    let mut rep = report(1);
    rep.file_name_in_use = String::new();
    rep.connect_status = ConnectStatus::NotWorking;
    let parsed: ProgressReport = rep.to_string().parse().unwrap();
    assert_eq!(parsed, rep);
}

#[parameterized(
    too_few = { "1|2|3" },
    empty = { "" },
)]
fn wrong_field_count_is_rejected(frame: &str) {
    assert!(matches!(
        frame.parse::<ProgressReport>(),
        Err(ProgressError::FieldCount(_))
    ));
}

#[parameterized(
    bad_pid = { "x|0|0|0|0|f" },
    bad_status = { "1|200|0|0|0|f" },
    bad_count = { "1|0|x|0|0|f" },
)]
fn bad_fields_are_rejected(frame: &str) {
    assert!(matches!(
        frame.parse::<ProgressReport>(),
        Err(ProgressError::BadField(_))
    ));
}

#[test]
fn fake_spawner_hands_back_scripted_progress() {
    let mut spawner = FakeSpawner::new();
    spawner.report_progress(report(7));
    assert_eq!(spawner.drain_progress(), vec![report(7)]);
    assert!(spawner.drain_progress().is_empty());
}

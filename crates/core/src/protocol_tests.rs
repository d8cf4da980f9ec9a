// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    ftp = { "ftp://user@box", Protocol::Ftp },
    ftps = { "ftps://user@box", Protocol::Ftp },
    sftp = { "sftp://user@box:22/dir", Protocol::Sftp },
    scp = { "scp://box", Protocol::Scp },
    http = { "http://box/path", Protocol::Http },
    https = { "https://box/path", Protocol::Http },
    mail = { "mailto://ops@site", Protocol::Smtp },
    wmo = { "wmo://box:4000", Protocol::Wmo },
)]
fn sniffs_scheme(recipient: &str, expected: Protocol) {
    assert_eq!(Protocol::from_scheme(recipient), Some(expected));
}

#[test]
fn unknown_scheme_is_none() {
    assert_eq!(Protocol::from_scheme("gopher://box"), None);
}

#[test]
fn retrieve_marker_is_independent_of_protocols() {
    let set = ProtocolSet::with(Protocol::Ftp) | ProtocolSet::RETRIEVE;
    assert!(set.is_retrieve());
    assert!(set.contains(ProtocolSet::FTP));
    assert!(!ProtocolSet::with(Protocol::Ftp).is_retrieve());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocols a host can be reached over.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One outbound (or pull) transfer protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ftp,
    Sftp,
    Scp,
    Http,
    Smtp,
    Wmo,
}

impl Protocol {
    /// Sniff the protocol from a recipient URL scheme, e.g. `ftp://user@host`.
    pub fn from_scheme(recipient: &str) -> Option<Self> {
        let scheme = recipient.split("://").next()?;
        match scheme {
            "ftp" | "ftps" => Some(Protocol::Ftp),
            "sftp" => Some(Protocol::Sftp),
            "scp" => Some(Protocol::Scp),
            "http" | "https" => Some(Protocol::Http),
            "smtp" | "mailto" => Some(Protocol::Smtp),
            "wmo" => Some(Protocol::Wmo),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Ftp => "ftp",
            Protocol::Sftp => "sftp",
            Protocol::Scp => "scp",
            Protocol::Http => "http",
            Protocol::Smtp => "smtp",
            Protocol::Wmo => "wmo",
        };
        write!(f, "{s}")
    }
}

bitflags! {
    /// The set of protocols configured for a host, plus the retrieve marker
    /// for hosts that are polled rather than pushed to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ProtocolSet: u32 {
        const FTP      = 1 << 0;
        const SFTP     = 1 << 1;
        const SCP      = 1 << 2;
        const HTTP     = 1 << 3;
        const SMTP     = 1 << 4;
        const WMO      = 1 << 5;
        /// Host is served by the fetch path; its jobs index the FRA.
        const RETRIEVE = 1 << 16;
    }
}

impl ProtocolSet {
    pub fn with(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Ftp => ProtocolSet::FTP,
            Protocol::Sftp => ProtocolSet::SFTP,
            Protocol::Scp => ProtocolSet::SCP,
            Protocol::Http => ProtocolSet::HTTP,
            Protocol::Smtp => ProtocolSet::SMTP,
            Protocol::Wmo => ProtocolSet::WMO,
        }
    }

    pub fn is_retrieve(self) -> bool {
        self.contains(ProtocolSet::RETRIEVE)
    }
}

impl Default for ProtocolSet {
    fn default() -> Self {
        ProtocolSet::empty()
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

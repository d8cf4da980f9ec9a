// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-transition events emitted by the dispatcher core.
//!
//! Handlers return these instead of writing log fifos directly; the daemon
//! shell routes each to the right log stream.

use crate::host::HostToggle;
use crate::id::{DirId, HostId};
use crate::msg_name::MsgName;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A directory's error counter reached its limit.
    DirErrorStart { dir_id: DirId, alias: String },
    /// A directory recovered below its limit.
    DirErrorEnd { dir_id: DirId, alias: String },
    /// An automatic host switch was initiated.
    HostSwitch {
        host_id: HostId,
        alias: String,
        from: HostToggle,
        to: HostToggle,
    },
    /// A host recovered after a non-faulty completion.
    HostErrorEnd { host_id: HostId, alias: String },
    /// A queued message was deleted on request.
    MessageDeleted { msg_name: MsgName },
    /// A duplicate file was handled.
    DuplicateHandled {
        file_name: String,
        job_id: crate::id::JobId,
        deleted: bool,
    },
}

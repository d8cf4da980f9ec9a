// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message-cache record (one MDB slot).
//!
//! Remembers per-message properties across brief worker exits so a retry
//! does not have to re-derive them from the job-ID catalog.

use crate::id::{HostId, JobId};
use serde::{Deserialize, Serialize};

/// Cached properties of one send job, indexed by the queue item's `pos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub job_id: JobId,
    /// Stable identity of the owning host, used to re-resolve `fsa_pos`.
    pub host_id: HostId,
    /// Cached FSA index of the owning host; invalidated by layout changes.
    pub fsa_pos: i32,
    pub retry_interval: u64,
    /// False once the owning host stopped resolving in the current FSA.
    pub in_current_fsa: bool,
    pub created_at: u64,
    pub last_transfer_time: u64,
}

impl CacheRecord {
    pub fn new(job_id: JobId, host_id: HostId, fsa_pos: i32, created_at: u64) -> Self {
        Self {
            job_id,
            host_id,
            fsa_pos,
            retry_interval: crate::host::DEFAULT_RETRY_INTERVAL,
            in_current_fsa: true,
            created_at,
            last_transfer_time: 0,
        }
    }
}

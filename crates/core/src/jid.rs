// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-ID catalog record.

use crate::id::{DirId, JobId};
use serde::{Deserialize, Serialize};

/// Stable mapping from a job ID to its recipient template.
///
/// Records are immutable once written; the separate current-message list
/// says which IDs are live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub dir_id: DirId,
    pub priority: u8,
    pub recipient: String,
    pub loptions: Vec<String>,
}

impl JobRecord {
    pub fn new(job_id: JobId, dir_id: DirId, priority: u8, recipient: impl Into<String>) -> Self {
        Self {
            job_id,
            dir_id,
            priority,
            recipient: recipient.into(),
            loptions: Vec::new(),
        }
    }
}

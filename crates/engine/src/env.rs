// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work-directory environment.
//!
//! One value carrying every canonical path under the work directory,
//! threaded explicitly through the APIs that touch disk.

use afd_core::{JobId, MsgName};
use std::io;
use std::path::{Path, PathBuf};

/// Canonical layout under `$AFD_WORK_DIR`.
#[derive(Debug, Clone)]
pub struct WorkEnv {
    work_dir: PathBuf,
}

impl WorkEnv {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn fifo_dir(&self) -> PathBuf {
        self.work_dir.join("fifo")
    }

    pub fn etc_dir(&self) -> PathBuf {
        self.work_dir.join("etc")
    }

    pub fn files_dir(&self) -> PathBuf {
        self.work_dir.join("files")
    }

    pub fn fsa_path(&self, id: i32) -> PathBuf {
        self.fifo_dir().join(format!("FSA_STAT_FILE.{id}"))
    }

    pub fn fsa_id_path(&self) -> PathBuf {
        self.fifo_dir().join("FSA_ID_FILE")
    }

    pub fn fra_path(&self, id: i32) -> PathBuf {
        self.fifo_dir().join(format!("FRA_STAT_FILE.{id}"))
    }

    pub fn fra_id_path(&self) -> PathBuf {
        self.fifo_dir().join("FRA_ID_FILE")
    }

    pub fn msg_queue_path(&self) -> PathBuf {
        self.fifo_dir().join("MSG_QUEUE_FILE")
    }

    pub fn msg_cache_path(&self) -> PathBuf {
        self.fifo_dir().join("MSG_CACHE_FILE")
    }

    pub fn jid_path(&self) -> PathBuf {
        self.fifo_dir().join("JOB_ID_DATA_FILE")
    }

    pub fn current_msg_list_path(&self) -> PathBuf {
        self.fifo_dir().join("CURRENT_MSG_LIST_FILE")
    }

    pub fn status_path(&self) -> PathBuf {
        self.fifo_dir().join("AFD_STATUS_FILE")
    }

    pub fn afd_active_path(&self) -> PathBuf {
        self.fifo_dir().join("AFD_ACTIVE")
    }

    pub fn cmd_fifo_path(&self) -> PathBuf {
        self.fifo_dir().join("AFD_CMD_FIFO")
    }

    pub fn resp_fifo_path(&self) -> PathBuf {
        self.fifo_dir().join("AFD_RESP_FIFO")
    }

    pub fn delete_fifo_path(&self) -> PathBuf {
        self.fifo_dir().join("FD_DELETE_FIFO")
    }

    pub fn progress_fifo_path(&self) -> PathBuf {
        self.fifo_dir().join("FD_PROGRESS_FIFO")
    }

    pub fn receive_log_path(&self) -> PathBuf {
        self.fifo_dir().join("RECEIVE_LOG_FIFO")
    }

    pub fn trans_debug_log_path(&self) -> PathBuf {
        self.fifo_dir().join("TRANS_DEBUG_LOG_FIFO")
    }

    pub fn system_log_path(&self) -> PathBuf {
        self.fifo_dir().join("SYSTEM_LOG_FIFO")
    }

    pub fn delete_log_path(&self) -> PathBuf {
        self.fifo_dir().join("DELETE_LOG_FIFO")
    }

    pub fn group_file_path(&self) -> PathBuf {
        self.etc_dir().join("GROUP_FILE")
    }

    pub fn file_mask_path(&self, dir_alias: &str) -> PathBuf {
        self.files_dir()
            .join("incoming")
            .join("file_mask")
            .join(dir_alias)
    }

    /// Staged payload directory of one queued message.
    pub fn outgoing_dir(&self, msg_name: &MsgName) -> PathBuf {
        self.files_dir().join("outgoing").join(msg_name.to_string())
    }

    /// Duplicate-check storage for one job.
    pub fn store_dir(&self, job_id: JobId) -> PathBuf {
        self.files_dir().join("store").join(job_id.to_hex())
    }

    /// Create the directory skeleton the daemon expects.
    pub fn ensure_layout(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.fifo_dir())?;
        std::fs::create_dir_all(self.etc_dir())?;
        std::fs::create_dir_all(self.files_dir().join("incoming").join("file_mask"))?;
        std::fs::create_dir_all(self.files_dir().join("outgoing"))?;
        std::fs::create_dir_all(self.files_dir().join("store"))?;
        Ok(())
    }
}

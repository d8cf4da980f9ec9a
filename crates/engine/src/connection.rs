// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection table: one slot per active worker process.
//!
//! The table is owned exclusively by the dispatcher; workers never write
//! it. A slot is claimed for the full life of one worker and zeroed when
//! the worker is reaped.

use afd_core::{HostId, MsgName, Protocol};
use serde::{Deserialize, Serialize};

/// One active outbound (or fetch) worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Worker pid; 0 marks a free slot.
    pub pid: i32,
    pub host_alias: String,
    /// Toggle-resolved hostname the worker connects to.
    pub hostname: String,
    pub host_id: HostId,
    pub dir_alias: String,
    pub msg_name: Option<MsgName>,
    /// Job slot index within the host record, -1 when free.
    pub job_no: i32,
    pub fsa_pos: i32,
    pub fra_pos: i32,
    pub protocol: Option<Protocol>,
    /// Worker was told to use the non-primary hostname for this run only.
    pub temp_toggle: bool,
}

impl Connection {
    fn free() -> Self {
        Self {
            pid: 0,
            host_alias: String::new(),
            hostname: String::new(),
            host_id: HostId::new(0),
            dir_alias: String::new(),
            msg_name: None,
            job_no: -1,
            fsa_pos: -1,
            fra_pos: -1,
            protocol: None,
            temp_toggle: false,
        }
    }

    pub fn is_free(&self) -> bool {
        self.pid == 0
    }

    /// Zero every field back to the free shape.
    pub fn reset(&mut self) {
        *self = Connection::free();
    }
}

/// Fixed-capacity table of worker slots.
#[derive(Debug)]
pub struct ConnectionTable {
    slots: Vec<Connection>,
}

impl ConnectionTable {
    pub fn new(max_connections: usize) -> Self {
        Self {
            slots: vec![Connection::free(); max_connections],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|c| !c.is_free()).count()
    }

    /// Claim the smallest free slot.
    pub fn alloc(&mut self) -> Option<usize> {
        self.slots.iter().position(Connection::is_free)
    }

    pub fn get(&self, index: usize) -> Option<&Connection> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Connection> {
        self.slots.get_mut(index)
    }

    pub fn pos_by_pid(&self, pid: i32) -> Option<usize> {
        if pid <= 0 {
            return None;
        }
        self.slots.iter().position(|c| c.pid == pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Connection)> {
        self.slots.iter().enumerate()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Connection)> {
        self.slots.iter_mut().enumerate()
    }

    /// Active workers only.
    pub fn active(&self) -> impl Iterator<Item = (usize, &Connection)> {
        self.iter().filter(|(_, c)| !c.is_free())
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;

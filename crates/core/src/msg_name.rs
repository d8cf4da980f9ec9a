// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message-name codec.
//!
//! A queued message is named `<creation_time>_<unique>_<split>` with all
//! three components in lowercase hex. The name doubles as the directory
//! name under `files/outgoing/`, so it must be filesystem-safe and must
//! round-trip exactly.

use crate::id::DirId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Parse failure for a message name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MsgNameError {
    #[error("message name has {0} components, expected 3")]
    ComponentCount(usize),
    #[error("message name component '{0}' is not hex")]
    BadComponent(String),
}

/// Identity of one queued message.
///
/// For fetch jobs the `creation_time` component carries the originating
/// directory ID instead of a wall-clock stamp; [`MsgName::dir_id`] reads it
/// back out during position resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MsgName {
    pub creation_time: u64,
    pub unique: u32,
    pub split: u32,
}

impl MsgName {
    pub fn new(creation_time: u64, unique: u32, split: u32) -> Self {
        Self {
            creation_time,
            unique,
            split,
        }
    }

    /// The first hex component interpreted as a directory ID.
    pub fn dir_id(&self) -> Option<DirId> {
        u32::try_from(self.creation_time).ok().map(DirId::new)
    }
}

impl fmt::Display for MsgName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}_{:x}_{:x}", self.creation_time, self.unique, self.split)
    }
}

impl FromStr for MsgName {
    type Err = MsgNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        if parts.len() != 3 {
            return Err(MsgNameError::ComponentCount(parts.len()));
        }
        let hex = |p: &str| -> Result<u64, MsgNameError> {
            if p.is_empty() {
                return Err(MsgNameError::BadComponent(p.to_string()));
            }
            u64::from_str_radix(p, 16).map_err(|_| MsgNameError::BadComponent(p.to_string()))
        };
        let creation_time = hex(parts[0])?;
        let unique = hex(parts[1])? as u32;
        let split = hex(parts[2])? as u32;
        Ok(Self {
            creation_time,
            unique,
            split,
        })
    }
}

#[cfg(test)]
#[path = "msg_name_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group-file reader.
//!
//! The group file collects recipient aliases into bracketed sections:
//!
//! ```text
//! [europe]
//! ber
//! ham \
//! burg
//!
//! # next section
//! [asia]
//! tok
//! ```
//!
//! A section runs until a blank line or the next header. `#` starts a
//! comment line, a trailing `\` joins the next line, and `\` anywhere else
//! escapes the following character.

use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupListError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("group [{0}] not found")]
    MissingGroup(String),
}

/// Expand the named `[alias]` section into its member list.
pub fn read_group_list(path: &Path, alias: &str) -> Result<Vec<String>, GroupListError> {
    let text = std::fs::read_to_string(path)?;
    let header = format!("[{alias}]");

    let mut members = Vec::new();
    let mut in_section = false;
    let mut pending = String::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if !pending.is_empty() {
            // Continuation of an escaped newline.
            pending.push_str(line);
            if let Some(joined) = finish_line(&mut pending) {
                members.push(joined);
            }
            continue;
        }

        if line.starts_with('[') {
            if in_section {
                break;
            }
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if line.is_empty() {
            break;
        }
        if line.starts_with('#') {
            continue;
        }

        pending.push_str(line);
        if let Some(done) = finish_line(&mut pending) {
            members.push(done);
        }
    }

    if !pending.is_empty() {
        members.push(unescape(&pending));
    }

    if members.is_empty() && !in_section {
        return Err(GroupListError::MissingGroup(alias.to_string()));
    }
    Ok(members)
}

/// If `pending` does not end in a line continuation, unescape and take it.
fn finish_line(pending: &mut String) -> Option<String> {
    let backslashes = pending.chars().rev().take_while(|&c| c == '\\').count();
    if backslashes % 2 == 1 {
        // Odd trailing backslash escapes the newline; keep accumulating.
        pending.pop();
        return None;
    }
    let done = unescape(pending);
    pending.clear();
    Some(done)
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[path = "group_list_tests.rs"]
mod tests;

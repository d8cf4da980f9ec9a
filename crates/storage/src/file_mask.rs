// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-directory file-mask reader.
//!
//! Binary format: `i32 nfg`, then for each group `i32 fc`, `i32 fbl`, and
//! `fbl` bytes holding `fc` NUL-terminated filter strings. The list is
//! read whole and used read-only.

use std::io::{self, Read as _};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileMaskError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt file-mask list: {0}")]
    Corrupt(String),
}

/// One group of filename filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMaskGroup {
    pub filters: Vec<String>,
}

/// Read the whole file-mask list for one directory.
pub fn read_file_masks(path: &Path) -> Result<Vec<FileMaskGroup>, FileMaskError> {
    let mut file = std::fs::File::open(path)?;

    let nfg = read_i32(&mut file)?;
    if nfg < 0 {
        return Err(FileMaskError::Corrupt(format!("negative group count {nfg}")));
    }

    let mut groups = Vec::with_capacity(nfg as usize);
    for g in 0..nfg {
        let fc = read_i32(&mut file)?;
        let fbl = read_i32(&mut file)?;
        if fc < 0 || fbl < 0 {
            return Err(FileMaskError::Corrupt(format!(
                "group {g}: filter count {fc}, byte length {fbl}"
            )));
        }

        let mut bytes = vec![0u8; fbl as usize];
        file.read_exact(&mut bytes)?;

        let filters: Vec<String> = bytes
            .split(|&b| b == 0)
            .filter(|part| !part.is_empty())
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .collect();
        if filters.len() != fc as usize {
            return Err(FileMaskError::Corrupt(format!(
                "group {g}: header says {fc} filters, block holds {}",
                filters.len()
            )));
        }
        groups.push(FileMaskGroup { filters });
    }
    Ok(groups)
}

/// Write a file-mask list; the deposit-side collaborators produce these,
/// tests and tools reuse the same writer.
pub fn write_file_masks(path: &Path, groups: &[FileMaskGroup]) -> Result<(), FileMaskError> {
    use std::io::Write as _;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = Vec::new();
    out.extend_from_slice(&(groups.len() as i32).to_le_bytes());
    for group in groups {
        let mut block = Vec::new();
        for filter in &group.filters {
            block.extend_from_slice(filter.as_bytes());
            block.push(0);
        }
        out.extend_from_slice(&(group.filters.len() as i32).to_le_bytes());
        out.extend_from_slice(&(block.len() as i32).to_le_bytes());
        out.extend_from_slice(&block);
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(&out)?;
    file.sync_all()?;
    Ok(())
}

fn read_i32(file: &mut std::fs::File) -> Result<i32, FileMaskError> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

#[cfg(test)]
#[path = "file_mask_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-layout map files.
//!
//! Each status area is a file with a word-aligned header followed by a
//! dense array of fixed-size records:
//!
//! ```text
//! offset 0   i32  element count
//! offset 4   u8   layout version
//! offset 5        reserved
//! offset 8   i32  creator's page size
//! offset 12       reserved
//! offset 16       records, element i at 16 + i * SIZE
//! ```
//!
//! The header prefix can always be read, even while a writer holds a
//! region lock elsewhere in the file. Records carry no pointers and are
//! addressed purely by index.

use std::fs::{File, OpenOptions};
use std::io::{self, Read as _, Seek, SeekFrom, Write as _};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Size of the map-file header.
pub const WORD_OFFSET: u64 = 16;

/// Page size recorded by map creators on this build.
const PAGE_SIZE: u32 = 4096;

/// Errors from map-file operations.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("wrong map version in {path}: found {found}, expected {expected}")]
    WrongVersion {
        path: PathBuf,
        found: u8,
        expected: u8,
    },
    #[error("stale map {path}: element count {count}")]
    Stale { path: PathBuf, count: i32 },
    #[error("corrupt record at offset {offset}: {message}")]
    Corrupt { offset: u64, message: String },
    #[error("index {index} out of range, map holds {count}")]
    OutOfRange { index: usize, count: usize },
}

/// A fixed-size record stored in a map file.
pub trait Record: Sized {
    /// Encoded size in bytes; every element occupies exactly this much.
    const SIZE: usize;
    /// Layout version written into the map header.
    const VERSION: u8;

    /// Encode into a buffer of exactly [`Record::SIZE`] bytes.
    fn encode(&self, buf: &mut [u8]);

    /// Decode from a buffer of exactly [`Record::SIZE`] bytes.
    fn decode(buf: &[u8]) -> Result<Self, MapError>;
}

/// Handle on one attached map file.
#[derive(Debug)]
pub struct MapFile<R: Record> {
    file: File,
    path: PathBuf,
    count: usize,
    page_size: u32,
    _marker: PhantomData<R>,
}

impl<R: Record> MapFile<R> {
    /// Create a fresh map holding the given records, replacing any old file.
    pub fn create(path: &Path, records: &[R]) -> Result<Self, MapError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)?;
        write_header(&mut file, records.len() as i32, R::VERSION)?;
        let mut buf = vec![0u8; R::SIZE];
        for record in records {
            buf.fill(0);
            record.encode(&mut buf);
            file.write_all(&buf)?;
        }
        file.sync_all()?;
        Ok(Self {
            file,
            path: path.to_owned(),
            count: records.len(),
            page_size: PAGE_SIZE,
            _marker: PhantomData,
        })
    }

    /// Attach an existing map read/write, validating the header.
    pub fn attach(path: &Path) -> Result<Self, MapError> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let (count, version, page_size) = read_header(&mut file)?;
        if version != R::VERSION {
            return Err(MapError::WrongVersion {
                path: path.to_owned(),
                found: version,
                expected: R::VERSION,
            });
        }
        if count <= 0 {
            return Err(MapError::Stale {
                path: path.to_owned(),
                count,
            });
        }
        Ok(Self {
            file,
            path: path.to_owned(),
            count: count as usize,
            page_size,
            _marker: PhantomData,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole array.
    pub fn read_all(&mut self) -> Result<Vec<R>, MapError> {
        self.file.seek(SeekFrom::Start(WORD_OFFSET))?;
        let mut buf = vec![0u8; R::SIZE];
        let mut out = Vec::with_capacity(self.count);
        for _ in 0..self.count {
            self.file.read_exact(&mut buf)?;
            out.push(R::decode(&buf)?);
        }
        Ok(out)
    }

    /// Rewrite the whole array, resizing the file to fit.
    pub fn write_all(&mut self, records: &[R]) -> Result<(), MapError> {
        self.file
            .set_len(WORD_OFFSET + (records.len() * R::SIZE) as u64)?;
        write_header(&mut self.file, records.len() as i32, R::VERSION)?;
        let mut buf = vec![0u8; R::SIZE];
        for record in records {
            buf.fill(0);
            record.encode(&mut buf);
            self.file.write_all(&buf)?;
        }
        self.file.sync_data()?;
        self.count = records.len();
        Ok(())
    }

    /// Read a single element through a page-aligned window.
    ///
    /// Maps only the pages containing element `index`: the window starts at
    /// `⌊start/pagesize⌋·pagesize` and the record is recovered at
    /// `start − window_start` within it. This is how a cooperating process
    /// touches one entry of a large area without reading the whole array.
    pub fn read_pos(&mut self, index: usize) -> Result<R, MapError> {
        if index >= self.count {
            return Err(MapError::OutOfRange {
                index,
                count: self.count,
            });
        }
        let start = WORD_OFFSET + (index * R::SIZE) as u64;
        let page = u64::from(self.page_size);
        let window_start = (start / page) * page;
        let map_offset = (start - window_start) as usize;
        let window_len = map_offset + R::SIZE;

        self.file.seek(SeekFrom::Start(window_start))?;
        let mut window = vec![0u8; window_len];
        self.file.read_exact(&mut window)?;
        R::decode(&window[map_offset..map_offset + R::SIZE])
    }

    /// Write a single element in place.
    pub fn write_pos(&mut self, index: usize, record: &R) -> Result<(), MapError> {
        if index >= self.count {
            return Err(MapError::OutOfRange {
                index,
                count: self.count,
            });
        }
        let start = WORD_OFFSET + (index * R::SIZE) as u64;
        let mut buf = vec![0u8; R::SIZE];
        record.encode(&mut buf);
        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(&buf)?;
        Ok(())
    }

    /// Grow or shrink the array to `new_count`, filling new tail slots
    /// with copies of `fill`.
    pub fn resize(&mut self, new_count: usize, fill: &R) -> Result<(), MapError> {
        self.file
            .set_len(WORD_OFFSET + (new_count * R::SIZE) as u64)?;
        if new_count > self.count {
            let mut buf = vec![0u8; R::SIZE];
            fill.encode(&mut buf);
            self.file
                .seek(SeekFrom::Start(WORD_OFFSET + (self.count * R::SIZE) as u64))?;
            for _ in self.count..new_count {
                self.file.write_all(&buf)?;
            }
        }
        write_header(&mut self.file, new_count as i32, R::VERSION)?;
        self.file.sync_data()?;
        self.count = new_count;
        Ok(())
    }

    /// Grow the file to hold at least `slots` elements without changing
    /// the element count. Pre-sizing in buckets keeps appends from
    /// resizing on every insert; the file never shrinks this way.
    pub fn reserve_capacity(&mut self, slots: usize) -> Result<(), MapError> {
        let wanted = WORD_OFFSET + (slots * R::SIZE) as u64;
        if self.file.metadata()?.len() < wanted {
            self.file.set_len(wanted)?;
        }
        Ok(())
    }

    /// Unmap and close. Dropping the handle does the same; this form
    /// surfaces the final flush error.
    pub fn detach(mut self) -> Result<(), MapError> {
        self.file.sync_data()?;
        Ok(())
    }
}

fn write_header(file: &mut File, count: i32, version: u8) -> Result<(), MapError> {
    let mut header = [0u8; WORD_OFFSET as usize];
    header[0..4].copy_from_slice(&count.to_le_bytes());
    header[4] = version;
    header[8..12].copy_from_slice(&(PAGE_SIZE as i32).to_le_bytes());
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header)?;
    Ok(())
}

fn read_header(file: &mut File) -> Result<(i32, u8, u32), MapError> {
    let mut header = [0u8; WORD_OFFSET as usize];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut header)?;
    let count = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let version = header[4];
    let page_size = i32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    let page_size = if page_size <= 0 {
        warn!(page_size, "map header carries no page size, assuming default");
        PAGE_SIZE
    } else {
        page_size as u32
    };
    Ok((count, version, page_size))
}

/// Read a generation-ID file (a single little-endian i32).
pub fn read_id_file(path: &Path) -> Result<i32, MapError> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Write a generation-ID file.
pub fn write_id_file(path: &Path, id: i32) -> Result<(), MapError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(&id.to_le_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
#[path = "map_tests.rs"]
mod tests;

//! Per-worker append-only archive
//!
//! Every worker owns exactly one archive file and records each row it
//! successfully inserted. A later verification pass replays the archive from
//! offset zero and checks each entry against the database.
//!
//! # Cursors
//!
//! - `write_offset`: file length at open, advanced by bytes actually written.
//! - `read_offset`: file position of the next byte not yet pulled into the
//!   read buffer. Bytes in the buffer past `consumed` are read but not yet
//!   decoded.
//!
//! The same file handle serves appends and scans. Scans seek to
//! `read_offset` before pulling bytes; appends must be preceded by
//! [`ArchiveLog::seek_for_append`] (done implicitly after any scan).
//!
//! # Invariants
//!
//! - Entries appear in append order and are never rewritten.
//! - `read_offset <= write_offset`.
//! - A scan never reads past `write_offset`.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rowcheck_core::Entry;

use crate::error::{ArchiveError, Result};
use crate::paths::archive_path;

/// Size of one read-ahead chunk.
pub const READ_CHUNK: usize = 10 * 1024;

/// Append-only entry log owned by a single worker.
#[derive(Debug)]
pub struct ArchiveLog {
    worker: usize,
    path: PathBuf,
    file: File,
    read_offset: u64,
    write_offset: u64,
    buffer: Vec<u8>,
    consumed: usize,
    entries_appended: u64,
    positioned_for_append: bool,
}

impl ArchiveLog {
    /// Open (creating if absent) the archive for `worker` under `dir`.
    pub fn open(dir: &Path, worker: usize) -> Result<Self> {
        Self::open_path(archive_path(dir, worker), worker)
    }

    /// Open (creating if absent) the archive at an explicit path.
    pub fn open_path(path: impl Into<PathBuf>, worker: usize) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| ArchiveError::Open {
                path: path.clone(),
                source,
            })?;
        let write_offset = file
            .metadata()
            .map_err(|source| ArchiveError::Open {
                path: path.clone(),
                source,
            })?
            .len();

        tracing::debug!(
            target: "rowcheck::archive",
            worker,
            path = %path.display(),
            bytes = write_offset,
            "Opened archive"
        );

        Ok(Self {
            worker,
            path,
            file,
            read_offset: 0,
            write_offset,
            buffer: Vec::with_capacity(READ_CHUNK),
            consumed: 0,
            entries_appended: 0,
            positioned_for_append: false,
        })
    }

    /// Worker index this archive belongs to.
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes durably or pending-durably stored (the append cursor).
    pub fn write_offset(&self) -> u64 {
        self.write_offset
    }

    /// Byte offset of the next entry a scan will return.
    pub fn read_position(&self) -> u64 {
        self.read_offset - self.pending().len() as u64
    }

    /// Entries appended through this handle since it was opened.
    pub fn entries_appended(&self) -> u64 {
        self.entries_appended
    }

    // ========================================================================
    // Append path
    // ========================================================================

    /// Position the file handle at the append cursor.
    ///
    /// Call once before the first append of an insertion run; the handle may
    /// have been left elsewhere by a scan.
    pub fn seek_for_append(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(self.write_offset))?;
        self.positioned_for_append = true;
        Ok(())
    }

    /// Append pre-serialized entries.
    ///
    /// `data` must hold exactly `count` encoded entries. On success the
    /// append cursor advances by `data.len()` and the entry counter by
    /// `count`. On failure the cursor advances only by the bytes the OS
    /// actually accepted and the entry counter is unchanged.
    pub fn append_entries(&mut self, data: &[u8], count: u64) -> Result<()> {
        if !self.positioned_for_append {
            self.seek_for_append()?;
        }

        let mut written = 0usize;
        while written < data.len() {
            match self.file.write(&data[written..]) {
                Ok(0) => {
                    self.write_offset += written as u64;
                    return Err(ArchiveError::ShortWrite {
                        worker: self.worker,
                        written,
                        expected: data.len(),
                    });
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.write_offset += written as u64;
                    tracing::error!(
                        target: "rowcheck::archive",
                        worker = self.worker,
                        written,
                        expected = data.len(),
                        error = %e,
                        "Append to archive failed"
                    );
                    return Err(e.into());
                }
            }
        }

        self.write_offset += written as u64;
        self.entries_appended += count;
        Ok(())
    }

    /// Append a single entry.
    pub fn append_entry(&mut self, entry: &Entry) -> Result<()> {
        self.append_entries(&entry.encode(), 1)
    }

    /// Force appended bytes to stable storage.
    ///
    /// Called once at the end of an insertion run, not per append.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    // ========================================================================
    // Scan path
    // ========================================================================

    /// Read the next entry, expecting `extra_count` extra fields.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::EndOfData`] once every appended byte has been
    ///   returned. This terminates a scan normally.
    /// - [`ArchiveError::Incomplete`] if the file ends inside an entry.
    /// - [`ArchiveError::Corrupt`] if the bytes cannot be decoded.
    pub fn get_one_entry(&mut self, extra_count: usize) -> Result<Entry> {
        if self.read_offset == self.write_offset && self.pending().is_empty() {
            return Err(ArchiveError::EndOfData);
        }

        self.file.seek(SeekFrom::Start(self.read_offset))?;
        self.positioned_for_append = false;

        loop {
            match Entry::decode(self.pending(), extra_count) {
                Ok((entry, used)) => {
                    self.consumed += used;
                    return Ok(entry);
                }
                Err(e) if e.is_insufficient() => {
                    if self.fill()? == 0 {
                        return Err(ArchiveError::Incomplete {
                            worker: self.worker,
                            offset: self.read_position(),
                        });
                    }
                }
                Err(source) => {
                    return Err(ArchiveError::Corrupt {
                        worker: self.worker,
                        offset: self.read_position(),
                        source,
                    });
                }
            }
        }
    }

    /// Restart scanning from offset zero.
    pub fn rewind(&mut self) {
        self.read_offset = 0;
        self.buffer.clear();
        self.consumed = 0;
    }

    fn pending(&self) -> &[u8] {
        &self.buffer[self.consumed..]
    }

    /// Pull up to one chunk from the file into the buffer.
    ///
    /// Returns the number of bytes added; zero means no more data below the
    /// append cursor.
    fn fill(&mut self) -> Result<usize> {
        if self.consumed > 0 {
            self.buffer.drain(..self.consumed);
            self.consumed = 0;
        }

        let remaining = self.write_offset - self.read_offset;
        let want = READ_CHUNK.min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if want == 0 {
            return Ok(0);
        }

        let start = self.buffer.len();
        self.buffer.resize(start + want, 0);
        let read = loop {
            match self.file.read(&mut self.buffer[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e.into());
                }
            }
        };
        self.buffer.truncate(start + read);
        self.read_offset += read as u64;
        Ok(read)
    }
}

/// Open the archives of workers `0..workers` under `dir`.
pub fn open_all(dir: &Path, workers: usize) -> Result<Vec<ArchiveLog>> {
    (0..workers).map(|w| ArchiveLog::open(dir, w)).collect()
}

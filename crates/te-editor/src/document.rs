//! Document: the ordered row store plus its file binding.
//!
//! A [`Document`] is a `Vec<Row>` where index `i` is line `i` of the file,
//! a dirty counter, and an optional path. All structural edits go through
//! it: insert/delete a row, append to a row, insert/delete a byte inside a
//! row. Each successful edit bumps the dirty counter; a fresh load or a
//! successful save resets it to zero.
//!
//! Out-of-range indices are silent no-ops. They can only come from a
//! broken cursor invariant, and refusing the edit keeps the text intact.
//!
//! # File format
//!
//! Plain bytes, one row per line. Loading splits on `\n` and strips every
//! trailing `\n`/`\r` from each line. Saving writes each row followed by
//! exactly one `\n`.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::row::Row;

/// Lines, dirty counter, and the file they came from.
#[derive(Debug, Default)]
pub struct Document {
    rows: Vec<Row>,
    dirty: u64,
    path: Option<PathBuf>,
}

impl Document {
    // -- Construction -------------------------------------------------------

    /// An empty, unnamed document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse file content into rows. The result is clean.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let rows = bytes
            .split_inclusive(|&b| b == b'\n')
            .map(|line| Row::new(trim_line_end(line)))
            .collect();
        Self {
            rows,
            dirty: 0,
            path: None,
        }
    }

    /// Load `path`. A missing file yields an empty document bound to `path`,
    /// so saving creates it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] for any read failure other than "not found".
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut doc = match fs::read(&path) {
            Ok(bytes) => Self::from_bytes(&bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "new file");
                Self::new()
            }
            Err(source) => return Err(Error::Io { path, source }),
        };
        debug!(path = %path.display(), rows = doc.rows.len(), "opened");
        doc.path = Some(path);
        Ok(doc)
    }

    // -- Metadata -------------------------------------------------------------

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// Whether there are unsaved changes.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty != 0
    }

    /// Number of edits since the last load or save.
    #[inline]
    #[must_use]
    pub const fn dirty(&self) -> u64 {
        self.dirty
    }

    // -- Row access -----------------------------------------------------------

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn numrows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    #[must_use]
    pub fn row(&self, at: usize) -> Option<&Row> {
        self.rows.get(at)
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Length of row `at`, or 0 past the end.
    #[inline]
    #[must_use]
    pub fn row_len(&self, at: usize) -> usize {
        self.rows.get(at).map_or(0, Row::len)
    }

    // -- Row store ------------------------------------------------------------

    /// Insert a new row at `at` (which may equal `numrows`).
    pub fn insert_row(&mut self, at: usize, content: &[u8]) -> bool {
        if at > self.rows.len() {
            return false;
        }
        self.rows.insert(at, Row::new(content));
        self.dirty += 1;
        true
    }

    /// Remove row `at`.
    pub fn delete_row(&mut self, at: usize) -> bool {
        if at >= self.rows.len() {
            return false;
        }
        self.rows.remove(at);
        self.dirty += 1;
        true
    }

    /// Append `bytes` to row `at`.
    pub fn append_to_row(&mut self, at: usize, bytes: &[u8]) -> bool {
        let Some(row) = self.rows.get_mut(at) else {
            return false;
        };
        row.append(bytes);
        self.dirty += 1;
        true
    }

    /// Cut row `at` down to `len` bytes.
    pub fn truncate_row(&mut self, at: usize, len: usize) -> bool {
        let Some(row) = self.rows.get_mut(at) else {
            return false;
        };
        row.truncate(len);
        self.dirty += 1;
        true
    }

    /// Insert `byte` into row `at` at buffer column `cx` (clamped to the end).
    pub fn insert_char(&mut self, at: usize, cx: usize, byte: u8) -> bool {
        let Some(row) = self.rows.get_mut(at) else {
            return false;
        };
        row.insert(cx, byte);
        self.dirty += 1;
        true
    }

    /// Remove the byte at buffer column `cx` of row `at`.
    pub fn delete_char(&mut self, at: usize, cx: usize) -> bool {
        let Some(row) = self.rows.get_mut(at) else {
            return false;
        };
        if !row.remove(cx) {
            return false;
        }
        self.dirty += 1;
        true
    }

    // -- Saving ---------------------------------------------------------------

    /// The on-disk form: every row followed by `\n`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.rows.iter().map(|r| r.len() + 1).sum();
        let mut out = Vec::with_capacity(len);
        for row in &self.rows {
            out.extend_from_slice(row.chars());
            out.push(b'\n');
        }
        out
    }

    /// Write the document to its path and mark it clean.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`Error::NoFileName`] if the document has no path, [`Error::Io`] if
    /// the write fails. The document stays dirty on failure.
    pub fn save(&mut self) -> Result<usize> {
        let path = self.path.clone().ok_or(Error::NoFileName)?;
        let bytes = self.to_bytes();

        write_file(&path, &bytes).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "saved");
        self.dirty = 0;
        Ok(bytes.len())
    }
}

/// Open (creating with 0644), size to exactly `bytes`, then write them.
fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true).create(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }

    let mut file = opts.open(path)?;
    file.set_len(bytes.len() as u64)?;
    file.write_all(bytes)
}

/// Strip every trailing `\n` and `\r`.
fn trim_line_end(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = line {
        line = rest;
    }
    line
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

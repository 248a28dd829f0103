//! Record file - the external newline-delimited record store.
//!
//! The index never interprets record content beyond line boundaries: each
//! line's first `key_len` bytes are its key, and the value stored in the
//! tree is the byte offset of the line's first character. This module is the
//! only place that touches the record file.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::Result;

/// Append-only access to a newline-delimited text record store.
///
/// # Offsets
/// A record's identity is the byte offset of its first character. Offsets
/// are stable because the file is append-only; no record is ever rewritten
/// or removed.
pub struct RecordFile {
    file: File,
}

impl RecordFile {
    /// Open an existing record file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self { file })
    }

    /// Open an existing record file for reading and appending.
    pub fn open_rw<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Current length of the record file in bytes.
    ///
    /// This is the offset the next appended record will land at.
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Whether the record file is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Read the single line starting at `offset`, without its newline.
    pub fn line_at(&mut self, offset: u64) -> Result<String> {
        self.file.seek(SeekFrom::Start(offset))?;

        let mut reader = BufReader::new(&mut self.file);
        let mut line = String::new();
        reader.read_line(&mut line)?;

        if line.ends_with('\n') {
            line.pop();
        }
        Ok(line)
    }

    /// Append one record line, returning the offset it landed at.
    ///
    /// A trailing newline is added; `text` itself must not contain one.
    pub fn append_line(&mut self, text: &str) -> Result<u64> {
        let offset = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(text.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.sync_all()?;
        Ok(offset)
    }

    /// Stream every record as `(offset, line)`, in file order.
    ///
    /// Offsets advance by the line's byte length plus one for the newline,
    /// which is exactly the offset arithmetic the index stores.
    pub fn records(&mut self) -> Result<Records<'_>> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(Records {
            reader: BufReader::new(&mut self.file),
            offset: 0,
        })
    }
}

/// Iterator over `(offset, line)` pairs of a record file.
///
/// Produced by [`RecordFile::records`]; used by the bulk build.
pub struct Records<'a> {
    reader: BufReader<&'a mut File>,
    offset: u64,
}

impl Iterator for Records<'_> {
    type Item = Result<(u64, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(n) => {
                let offset = self.offset;
                self.offset += n as u64;
                if line.ends_with('\n') {
                    line.pop();
                }
                Some(Ok((offset, line)))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

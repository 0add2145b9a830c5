//! Line-offset table for random access into a deck by line number.
//!
//! The file is scanned once to record the byte offset of every line start.
//! Afterwards any line can be fetched with a single seek, so large meshes are
//! never held in memory as a whole.

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

use crate::error::{InpError, Result};

/// A readable deck with O(1) access to any 1-based line number.
#[derive(Debug)]
pub struct LineFile<R> {
    reader: BufReader<R>,
    offsets: Vec<u64>,
}

impl<R: Read + Seek> LineFile<R> {
    /// Wrap a reader and build its line-offset table.
    pub fn new(inner: R) -> Result<Self> {
        let mut reader = BufReader::new(inner);
        reader.seek(SeekFrom::Start(0))?;

        let mut offsets = Vec::new();
        let mut position = 0u64;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            offsets.push(position);
            position += read as u64;
        }

        Ok(Self { reader, offsets })
    }

    /// Number of lines in the file.
    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Read line `line_no` (1-based) without its terminator, or `None` past EOF.
    pub fn get_line(&mut self, line_no: usize) -> Result<Option<String>> {
        let Some(&offset) = line_no
            .checked_sub(1)
            .and_then(|idx| self.offsets.get(idx))
        else {
            return Ok(None);
        };

        self.reader.seek(SeekFrom::Start(offset))?;
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        strip_terminator(&mut line);
        Ok(Some(line))
    }

    /// Read line `line_no` (1-based), failing when it does not exist.
    pub fn line(&mut self, line_no: usize) -> Result<String> {
        let total = self.line_count();
        self.get_line(line_no)?
            .ok_or(InpError::LineOutOfRange {
                line: line_no,
                total,
            })
    }

    /// Read a block body starting at `start`.
    ///
    /// Stops (exclusive) at the first line whose first non-blank character is
    /// the block marker, at a blank line, or at end of file.
    pub fn block_lines(&mut self, start: usize) -> Result<Vec<(usize, String)>> {
        let mut body = Vec::new();
        let mut line_no = start;
        while let Some(line) = self.get_line(line_no)? {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('*') {
                break;
            }
            body.push((line_no, line));
            line_no += 1;
        }
        Ok(body)
    }

    /// Visit every line in file order, starting from the top of the file.
    pub fn scan<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(usize, &str),
    {
        self.reader.seek(SeekFrom::Start(0))?;
        let mut line = String::new();
        let mut line_no = 0usize;
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;
            strip_terminator(&mut line);
            visit(line_no, &line);
        }
        Ok(())
    }

    /// Rewind the underlying reader and hand it back.
    pub fn into_inner(mut self) -> Result<R> {
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(self.reader.into_inner())
    }
}

fn strip_terminator(line: &mut String) {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
}

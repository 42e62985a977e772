//! Bounded line reading for raw log files.
//!
//! A record is one line; the trailing `\n` / `\r\n` is stripped and blank
//! lines are skipped. The read buffer has a fixed capacity so a scan never
//! holds more than one block of the file besides the current line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Default read-ahead per open table.
pub const DEFAULT_READ_CAPACITY: usize = 64 * 1024;

/// Iterator over the records (lines) of a reader.
pub struct RecordLines<R: Read> {
    inner: BufReader<R>,
    line: String,
    line_no: u64,
}

impl<R: Read> RecordLines<R> {
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, reader),
            line: String::new(),
            line_no: 0,
        }
    }

    /// 1-based number of the last line read.
    pub fn line_no(&self) -> u64 {
        self.line_no
    }
}

impl<R: Read> Iterator for RecordLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.inner.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let record = self.line.trim_end_matches(['\n', '\r']);
                    if record.is_empty() {
                        continue;
                    }
                    return Some(Ok(record.to_string()));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub fn lines_from_path<P: AsRef<Path>>(path: P, capacity: usize) -> io::Result<RecordLines<File>> {
    let file = File::open(path)?;
    Ok(RecordLines::with_capacity(capacity, file))
}

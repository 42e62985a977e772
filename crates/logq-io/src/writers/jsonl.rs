//! Streaming NDJSON writer for query results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use logq_core::row::Row;

use crate::error::Result;

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    rows: u64,
}

impl JsonlWriter<File> {
    pub fn to_path(path: impl AsRef<Path>) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            rows: 0,
        }
    }

    /// One JSON object per line, keys sorted.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &row.to_json())?;
        self.writer.write_all(b"\n")?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_all<'a>(&mut self, rows: impl IntoIterator<Item = &'a Row>) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        self.flush()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::Error::Io(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_sorted_objects_per_line() {
        let mut w = JsonlWriter::to_writer(Vec::new());
        let rows = vec![
            Row::new().with("b", 2i64).with("a", "x"),
            Row::from_raw("r s"),
        ];
        w.write_all(&rows).unwrap();
        assert_eq!(w.rows_written(), 2);
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(out, "{\"a\":\"x\",\"b\":2}\n{\"_data\":\"r s\"}\n");
    }
}

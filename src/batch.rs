/*! HIT csv batching.

HIT files have a single `json_variables` column. Each row holds a JSON array of `batch_size` items,
every field being quoted.

Items are buffered until a batch is full. What happens to the last, partial batch is decided when finishing:
it is dropped by default, matching how HIT files have always been produced, or written with `flush_partial`.
!*/
use std::{fs::File, io::Write, path::Path};

use log::{debug, warn};
use serde::Serialize;

use crate::error::Error;

pub const HEADER: &str = "json_variables";
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Counts of a finished batching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Written rows, header excluded.
    pub rows: usize,
    /// Written items.
    pub items: usize,
    /// Items of the dropped partial batch.
    pub dropped: usize,
}

pub struct BatchWriter<W: Write, T> {
    writer: csv::Writer<W>,
    batch: Vec<T>,
    batch_size: usize,
    summary: BatchSummary,
}

impl<T: Serialize> BatchWriter<File, T> {
    pub fn from_path(dst: &Path, batch_size: usize) -> Result<Self, Error> {
        debug!("creating hit file {:?}", dst);
        Self::new(File::create(dst)?, batch_size)
    }
}

impl<W: Write, T: Serialize> BatchWriter<W, T> {
    /// Create a new batch writer, writing the header right away.
    pub fn new(w: W, batch_size: usize) -> Result<Self, Error> {
        if batch_size == 0 {
            return Err(Error::Custom("batch size must be positive".to_string()));
        }
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(w);
        writer.write_record([HEADER])?;
        Ok(Self {
            writer,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            summary: BatchSummary::default(),
        })
    }

    /// 1-based index the next pushed item will have in its row.
    pub fn next_index(&self) -> usize {
        self.batch.len() + 1
    }

    /// Number of written rows.
    pub fn rows(&self) -> usize {
        self.summary.rows
    }

    /// Number of buffered items.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Add an item, writing the batch if it is full.
    ///
    /// Returns `true` if a row has been written.
    pub fn push(&mut self, item: T) -> Result<bool, Error> {
        self.batch.push(item);
        if self.batch.len() == self.batch_size {
            self.write_batch()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn write_batch(&mut self) -> Result<(), Error> {
        let row = serde_json::to_string(&self.batch)?;
        self.writer.write_record([row])?;
        self.summary.rows += 1;
        self.summary.items += self.batch.len();
        self.batch.clear();
        Ok(())
    }

    /// Write or drop the last partial batch and flush the underlying writer.
    pub fn finish(&mut self, flush_partial: bool) -> Result<BatchSummary, Error> {
        if !self.batch.is_empty() {
            if flush_partial {
                debug!("writing partial batch of {} items", self.batch.len());
                self.write_batch()?;
            } else {
                warn!(
                    "dropping last partial batch of {} items (use --flush-partial to keep it)",
                    self.batch.len()
                );
                self.summary.dropped += self.batch.len();
                self.batch.clear();
            }
        }
        self.writer.flush()?;
        Ok(self.summary)
    }

    /// Get back the underlying writer.
    pub fn into_inner(self) -> Result<W, Error> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(buf: Vec<u8>) -> Vec<Vec<u32>> {
        let mut reader = csv::Reader::from_reader(buf.as_slice());
        assert_eq!(&reader.headers().unwrap()[0], HEADER);
        reader
            .records()
            .map(|r| serde_json::from_str(&r.unwrap()[0]).unwrap())
            .collect()
    }

    #[test]
    fn full_batches_only() {
        let mut w = BatchWriter::new(Vec::new(), 5).unwrap();
        let mut written = 0;
        for i in 0..12u32 {
            if w.push(i).unwrap() {
                written += 1;
            }
        }
        assert_eq!(written, 2);
        assert_eq!(w.pending(), 2);
        assert_eq!(w.next_index(), 3);

        let summary = w.finish(false).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                rows: 2,
                items: 10,
                dropped: 2
            }
        );
        let rows = rows(w.into_inner().unwrap());
        assert_eq!(rows, vec![vec![0, 1, 2, 3, 4], vec![5, 6, 7, 8, 9]]);
    }

    #[test]
    fn flush_partial() {
        let mut w = BatchWriter::new(Vec::new(), 5).unwrap();
        for i in 0..7u32 {
            w.push(i).unwrap();
        }
        let summary = w.finish(true).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.dropped, 0);
        let rows = rows(w.into_inner().unwrap());
        assert_eq!(rows[1], vec![5, 6]);
    }

    #[test]
    fn quoted_fields() {
        let mut w = BatchWriter::new(Vec::new(), 1).unwrap();
        w.push("a").unwrap();
        w.finish(false).unwrap();
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(out, "\"json_variables\"\n\"[\"\"a\"\"]\"\n");
    }

    #[test]
    fn zero_batch_size() {
        assert!(BatchWriter::<_, u32>::new(Vec::new(), 0).is_err());
    }
}

//! Reporting sink for per-separation concordance rows.

use crate::concord::ConcordanceResult;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub trait ReportSink {
    fn write_row(&mut self, result: &ConcordanceResult) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes `<separation>\t<ratio to 4 decimal places>` rows.
pub struct TsvReport<W: Write> {
    writer: W,
}

impl TsvReport<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(TsvReport {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl<W: Write> TsvReport<W> {
    pub fn new(writer: W) -> Self {
        TsvReport { writer }
    }
}

impl<W: Write> ReportSink for TsvReport<W> {
    fn write_row(&mut self, result: &ConcordanceResult) -> io::Result<()> {
        writeln!(self.writer, "{}\t{:.4}", result.separation, result.ratio())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

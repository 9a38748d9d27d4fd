use std::io;

use crate::faidx::FastaIndex;

/// Boundary through which fragment sequences are fetched. The store only
/// needs "give me sequence X between these 1-based inclusive coordinates";
/// anything that can answer that works, including in-memory test doubles.
pub trait SequenceFetch {
    fn fetch_sequence(&self, seq_name: &str, start: u64, end: u64) -> io::Result<Vec<u8>>;
}

impl SequenceFetch for FastaIndex {
    fn fetch_sequence(&self, seq_name: &str, start: u64, end: u64) -> io::Result<Vec<u8>> {
        FastaIndex::fetch(self, seq_name, start, end)
    }
}

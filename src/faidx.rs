//! Indexed FASTA access for the reference genome.
//!
//! Sequence names and lengths come from the `.fai` sidecar, which is
//! created on demand through rust-htslib if missing. The entries keep
//! their `.fai` file order so the catalog (and therefore the sampler)
//! sees a stable sequence order.

use rust_htslib::faidx;
use std::io;
use std::path::Path;

pub struct FastaIndex {
    path: String,
    sequences: Vec<(String, u64)>,
    reader: faidx::Reader,
}

impl FastaIndex {
    pub fn from_path(fasta_path: &str) -> io::Result<Self> {
        let fai_path = format!("{fasta_path}.fai");

        // Opening the reader creates the .fai if it does not exist yet
        let reader = faidx::Reader::from_path(fasta_path).map_err(|e| {
            io::Error::other(format!("Failed to open FASTA file '{fasta_path}': {e}"))
        })?;

        if !Path::new(&fai_path).exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("FASTA index '{fai_path}' was not created"),
            ));
        }

        let fai_content = std::fs::read_to_string(&fai_path)?;
        let mut sequences = Vec::new();
        for line in fai_content.lines() {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() >= 2 && !fields[0].is_empty() {
                if let Ok(length) = fields[1].parse::<u64>() {
                    sequences.push((fields[0].to_string(), length));
                }
            }
        }

        Ok(FastaIndex {
            path: fasta_path.to_string(),
            sequences,
            reader,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sequences in `.fai` file order.
    pub fn sequences(&self) -> &[(String, u64)] {
        &self.sequences
    }

    /// Fetch a subsequence by 1-based inclusive coordinates, uppercased.
    pub fn fetch(&self, seq_name: &str, start: u64, end: u64) -> io::Result<Vec<u8>> {
        if start == 0 || end < start {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid range {start}-{end} for sequence '{seq_name}'"),
            ));
        }

        // rust-htslib expects 0-based inclusive end coordinates
        match self
            .reader
            .fetch_seq(seq_name, (start - 1) as usize, (end - 1) as usize)
        {
            Ok(seq) => {
                let mut seq_vec = seq.to_vec();
                unsafe { libc::free(seq.as_ptr() as *mut std::ffi::c_void) }; // Free up memory to avoid memory leak (bug https://github.com/rust-bio/rust-htslib/issues/401#issuecomment-1704290171)
                seq_vec
                    .iter_mut()
                    .for_each(|byte| *byte = byte.to_ascii_uppercase());
                Ok(seq_vec)
            }
            Err(e) => Err(io::Error::other(format!(
                "Failed to fetch {seq_name}:{start}-{end}: {e}"
            ))),
        }
    }
}

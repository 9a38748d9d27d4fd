//! Persisted fragment pairs, keyed by (seed, separation, read_count).
//!
//! Simulation is idempotent: if a non-empty fragment file already exists
//! for a key, it is reused and the pair count is derived by reading it
//! back, which also covers prior runs that stopped early and wrote fewer
//! pairs than requested. A bincode manifest next to the fragment file
//! records the key it was generated under, so a stale artifact generated
//! with different parameters is rejected instead of silently reused.
//!
//! The store is the sole writer of its artifacts. Check-then-write is not
//! safe against a second process sharing the directory; callers must
//! serialize such runs themselves.

use crate::sampler::FragmentPair;
use crate::sequence_index::SequenceFetch;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreKey {
    pub seed: u64,
    pub separation: u64,
    pub read_count: u64,
}

#[derive(Serialize, Deserialize)]
struct Manifest {
    key: StoreKey,
    pair_count: u64,
}

pub struct FragmentStore {
    dir: PathBuf,
    tag: String,
}

impl FragmentStore {
    /// `tag` is a human-readable label woven into file names only; the
    /// functional key is (seed, separation, read_count).
    pub fn new<P: AsRef<Path>>(dir: P, tag: &str) -> io::Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(FragmentStore {
            dir: dir.as_ref().to_path_buf(),
            tag: tag.to_string(),
        })
    }

    pub fn fragment_path(&self, key: &StoreKey) -> PathBuf {
        self.dir.join(format!(
            "{}.s{}.d{}.n{}.frags.fa",
            self.tag, key.seed, key.separation, key.read_count
        ))
    }

    fn manifest_path(&self, key: &StoreKey) -> PathBuf {
        self.dir.join(format!(
            "{}.s{}.d{}.n{}.frags.meta",
            self.tag, key.seed, key.separation, key.read_count
        ))
    }

    /// Reuse the persisted fragments for `key`, or run `generate` and
    /// persist them. Returns the pair count and the fragment file path.
    /// `generate` is only invoked when no usable artifact exists.
    pub fn get_or_create<G>(
        &self,
        key: &StoreKey,
        fetcher: &dyn SequenceFetch,
        generate: G,
    ) -> io::Result<(u64, PathBuf)>
    where
        G: FnOnce() -> Vec<FragmentPair>,
    {
        let path = self.fragment_path(key);

        let reusable = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() > 0,
            Err(_) => false,
        };

        if reusable {
            let recorded = self.check_manifest(key)?;
            let pair_count = count_pairs(&path)?;
            if let Some(recorded) = recorded {
                if recorded != pair_count {
                    debug!(
                        "Manifest for separation {} records {} pairs, file holds {}; trusting the file",
                        key.separation, recorded, pair_count
                    );
                }
            }
            info!(
                "Reusing {} pairs from {} for separation {}",
                pair_count,
                path.display(),
                key.separation
            );
            return Ok((pair_count, path));
        }

        let pairs = generate();
        let pair_count = pairs.len() as u64;
        debug!(
            "Writing {} pairs to {} for separation {}",
            pair_count,
            path.display(),
            key.separation
        );

        let mut writer = BufWriter::new(File::create(&path)?);
        for pair in &pairs {
            let left = fetcher.fetch_sequence(&pair.left.seq, pair.left.start, pair.left.end)?;
            let right =
                fetcher.fetch_sequence(&pair.right.seq, pair.right.start, pair.right.end)?;
            writeln!(writer, ">L-{}", pair.pair_id)?;
            writer.write_all(&left)?;
            writeln!(writer)?;
            writeln!(writer, ">R-{}", pair.pair_id)?;
            writer.write_all(&right)?;
            writeln!(writer)?;
        }
        writer.flush()?;

        self.write_manifest(key, pair_count)?;
        Ok((pair_count, path))
    }

    /// Validate the manifest against `key` and return its recorded pair
    /// count, if a manifest exists at all.
    fn check_manifest(&self, key: &StoreKey) -> io::Result<Option<u64>> {
        let manifest_path = self.manifest_path(key);
        if !manifest_path.exists() {
            return Ok(None);
        }

        let mut reader = BufReader::new(File::open(&manifest_path)?);
        let manifest: Manifest =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
                .map_err(|e| {
                    io::Error::other(format!(
                        "Failed to decode manifest {}: {e:?}",
                        manifest_path.display()
                    ))
                })?;

        if manifest.key != *key {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Fragment file {} was generated under a different key",
                    self.fragment_path(key).display()
                ),
            ));
        }
        Ok(Some(manifest.pair_count))
    }

    fn write_manifest(&self, key: &StoreKey, pair_count: u64) -> io::Result<()> {
        let manifest = Manifest {
            key: *key,
            pair_count,
        };
        let data = bincode::serde::encode_to_vec(&manifest, bincode::config::standard())
            .map_err(|e| io::Error::other(format!("Failed to encode manifest: {e:?}")))?;
        std::fs::write(self.manifest_path(key), data)
    }
}

/// Pair count of an existing fragment file: one `>L-` header per pair.
fn count_pairs(path: &Path) -> io::Result<u64> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0u64;
    for line in reader.lines() {
        if line?.starts_with(">L-") {
            count += 1;
        }
    }
    Ok(count)
}

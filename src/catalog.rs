//! Reference sequence catalog
//!
//! Holds the per-sequence lengths of the reference genome in load order,
//! plus the total length used for proportional sampling. Immutable after
//! construction.

use crate::faidx::FastaIndex;
use rustc_hash::FxHashMap;

#[derive(Debug)]
pub enum CatalogError {
    NoSequences,
    InvalidLength(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::NoSequences => write!(f, "Reference contains no sequences"),
            CatalogError::InvalidLength(name) => {
                write!(f, "Sequence '{name}' has zero length")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceLength {
    pub name: String,
    pub length: u64,
}

pub struct SequenceCatalog {
    sequences: Vec<SequenceLength>,
    name_to_slot: FxHashMap<String, usize>,
    total_length: u64,
}

impl SequenceCatalog {
    /// Build a catalog from (name, length) entries, preserving their order.
    /// The order matters: the sampler iterates sequences in catalog order,
    /// so it is part of the determinism contract.
    pub fn from_lengths<I>(lengths: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut sequences = Vec::new();
        let mut name_to_slot = FxHashMap::default();
        let mut total_length = 0u64;

        for (name, length) in lengths {
            if length == 0 {
                return Err(CatalogError::InvalidLength(name));
            }
            if name_to_slot.contains_key(&name) {
                continue;
            }
            name_to_slot.insert(name.clone(), sequences.len());
            total_length += length;
            sequences.push(SequenceLength { name, length });
        }

        if sequences.is_empty() {
            return Err(CatalogError::NoSequences);
        }

        Ok(SequenceCatalog {
            sequences,
            name_to_slot,
            total_length,
        })
    }

    /// Build from an indexed FASTA, in `.fai` file order.
    pub fn from_fasta_index(index: &FastaIndex) -> Result<Self, CatalogError> {
        Self::from_lengths(
            index
                .sequences()
                .iter()
                .map(|(name, length)| (name.clone(), *length)),
        )
    }

    pub fn length(&self, name: &str) -> Option<u64> {
        self.name_to_slot
            .get(name)
            .map(|&slot| self.sequences[slot].length)
    }

    /// Sampling weight of a sequence: its share of the total length.
    pub fn weight(&self, name: &str) -> Option<f64> {
        self.length(name)
            .map(|length| length as f64 / self.total_length as f64)
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceLength> {
        self.sequences.iter()
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

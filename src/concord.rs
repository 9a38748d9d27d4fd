//! Concordance decision and per-level aggregation.
//!
//! Hits are grouped by pair id and side while the aligner output streams
//! in; once the stream is exhausted the evaluator is consumed and every
//! pair with hits on both sides is cross-matched. A pair is concordant
//! when some left/right hit combination lands on the same assembly
//! sequence, in the same orientation, at a distance within ±5% of the
//! expected separation. The first matching combination wins, so a pair
//! contributes at most one count.

use crate::hits::{parse_hit_line, Hit, ParseErr, Side};
use log::debug;
use rustc_hash::FxHashMap;
use std::io::BufRead;

const TOLERANCE: f64 = 0.05;

/// Outcome for one separation level, emitted once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcordanceResult {
    pub separation: u64,
    pub concordant: u64,
    /// Pairs actually generated for the level; may be below the requested
    /// read count if sequences were too short.
    pub total_pairs: u64,
}

impl ConcordanceResult {
    pub fn ratio(&self) -> f64 {
        if self.total_pairs == 0 {
            0.0
        } else {
            self.concordant as f64 / self.total_pairs as f64
        }
    }
}

#[derive(Default)]
struct PairHits {
    left: Vec<Hit>,
    right: Vec<Hit>,
}

pub struct ConcordanceEvaluator {
    separation: u64,
    total_pairs: u64,
    pairs: FxHashMap<u32, PairHits>,
}

impl ConcordanceEvaluator {
    pub fn new(separation: u64, total_pairs: u64) -> Self {
        ConcordanceEvaluator {
            separation,
            total_pairs,
            pairs: FxHashMap::default(),
        }
    }

    pub fn collect(&mut self, hit: Hit) {
        let group = self.pairs.entry(hit.pair_id).or_default();
        match hit.side {
            Side::Left => group.left.push(hit),
            Side::Right => group.right.push(hit),
        }
    }

    /// Consume a stream of tabular hit records. A malformed record aborts
    /// the whole stream; a partial evaluation would silently understate
    /// the error, so the caller must discard this level.
    pub fn collect_stream<R: BufRead>(&mut self, reader: R) -> Result<(), ParseErr> {
        for line_result in reader.lines() {
            let line = line_result.map_err(ParseErr::IoError)?;
            if line.is_empty() {
                continue;
            }
            if let Some(hit) = parse_hit_line(&line)? {
                self.collect(hit);
            }
        }
        Ok(())
    }

    /// Cross-match the collected hits and emit the level result. Consuming
    /// `self` guarantees nothing is added after evaluation.
    pub fn finish(self) -> ConcordanceResult {
        let mut concordant = 0u64;

        for (pair_id, group) in &self.pairs {
            // a pair with only one side aligned is skipped, not discordant
            if group.left.is_empty() || group.right.is_empty() {
                continue;
            }

            'pair: for left in &group.left {
                for right in &group.right {
                    if is_concordant(self.separation, left, right) {
                        debug!("pair {pair_id} concordant on {}", left.parent);
                        concordant += 1;
                        break 'pair;
                    }
                }
            }
        }

        ConcordanceResult {
            separation: self.separation,
            concordant,
            total_pairs: self.total_pairs,
        }
    }
}

fn is_concordant(separation: u64, left: &Hit, right: &Hit) -> bool {
    if left.parent != right.parent || left.strand != right.strand {
        return false;
    }

    // Coordinate order, not strand, decides which end-vs-start pairing is
    // measured. This mirrors reverse-strand alignments where the right
    // mate lands upstream of the left one.
    let distance = if left.start <= right.start {
        (right.start - (left.end + 1)).abs()
    } else {
        (left.start - (right.end + 1)).abs()
    };

    let low = separation as f64 * (1.0 - TOLERANCE);
    let high = separation as f64 * (1.0 + TOLERANCE);
    let distance = distance as f64;
    low <= distance && distance <= high
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(pair_id: u32, side: Side, parent: &str, strand: &str, start: i64, end: i64) -> Hit {
        Hit {
            pair_id,
            side,
            parent: parent.to_string(),
            strand: strand.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_concordant_within_tolerance() {
        // distance = |310 - 200| = 110, band is [104.5, 115.5]
        let mut evaluator = ConcordanceEvaluator::new(110, 1);
        evaluator.collect(hit(1, Side::Left, "ctg", "+1", 100, 199));
        evaluator.collect(hit(1, Side::Right, "ctg", "+1", 310, 409));

        let result = evaluator.finish();
        assert_eq!(result.concordant, 1);
        assert_eq!(result.ratio(), 1.0);
    }

    #[test]
    fn test_distance_outside_tolerance() {
        // distance = 120, band for separation 110 is [104.5, 115.5]
        let mut evaluator = ConcordanceEvaluator::new(110, 1);
        evaluator.collect(hit(1, Side::Left, "ctg", "+1", 100, 199));
        evaluator.collect(hit(1, Side::Right, "ctg", "+1", 320, 419));

        assert_eq!(evaluator.finish().concordant, 0);
    }

    #[test]
    fn test_different_parent_never_concordant() {
        let mut evaluator = ConcordanceEvaluator::new(110, 1);
        evaluator.collect(hit(1, Side::Left, "ctg_a", "+1", 100, 199));
        evaluator.collect(hit(1, Side::Right, "ctg_b", "+1", 310, 409));

        assert_eq!(evaluator.finish().concordant, 0);
    }

    #[test]
    fn test_different_strand_never_concordant() {
        let mut evaluator = ConcordanceEvaluator::new(110, 1);
        evaluator.collect(hit(1, Side::Left, "ctg", "+1", 100, 199));
        evaluator.collect(hit(1, Side::Right, "ctg", "-1", 310, 409));

        assert_eq!(evaluator.finish().concordant, 0);
    }

    #[test]
    fn test_reversed_coordinate_order() {
        // right mate upstream of the left one: distance = |310 - 200| = 110
        let mut evaluator = ConcordanceEvaluator::new(110, 1);
        evaluator.collect(hit(1, Side::Left, "ctg", "-1", 310, 409));
        evaluator.collect(hit(1, Side::Right, "ctg", "-1", 100, 199));

        assert_eq!(evaluator.finish().concordant, 1);
    }

    #[test]
    fn test_first_match_short_circuit() {
        // one discordant and one concordant right hit: the pair counts once
        let mut evaluator = ConcordanceEvaluator::new(110, 1);
        evaluator.collect(hit(1, Side::Left, "ctg", "+1", 100, 199));
        evaluator.collect(hit(1, Side::Right, "other", "+1", 310, 409));
        evaluator.collect(hit(1, Side::Right, "ctg", "+1", 310, 409));
        evaluator.collect(hit(1, Side::Right, "ctg", "+1", 312, 411));

        assert_eq!(evaluator.finish().concordant, 1);
    }

    #[test]
    fn test_missing_side_skipped() {
        let mut evaluator = ConcordanceEvaluator::new(110, 2);
        evaluator.collect(hit(1, Side::Left, "ctg", "+1", 100, 199));
        evaluator.collect(hit(1, Side::Right, "ctg", "+1", 310, 409));
        // pair 2 only has a left hit
        evaluator.collect(hit(2, Side::Left, "ctg", "+1", 700, 799));

        let result = evaluator.finish();
        assert_eq!(result.concordant, 1);
        assert_eq!(result.total_pairs, 2);
        assert_eq!(result.ratio(), 0.5);
    }

    #[test]
    fn test_collect_stream_groups_and_filters() {
        use crate::hits::tests::hit_line;

        let rows = [
            hit_line("L-1", "ctg", 100, "+1", 100, 199),
            hit_line("R-1", "ctg", 100, "+1", 310, 409),
            // below the length gate, must not disturb the pair
            hit_line("R-1", "junk", 50, "+1", 0, 49),
        ]
        .join("\n");

        let mut evaluator = ConcordanceEvaluator::new(110, 1);
        evaluator.collect_stream(rows.as_bytes()).unwrap();
        assert_eq!(evaluator.finish().concordant, 1);
    }

    #[test]
    fn test_collect_stream_malformed_aborts() {
        use crate::hits::tests::hit_line;

        let rows = [
            hit_line("L-1", "ctg", 100, "+1", 100, 199),
            hit_line("X-5", "ctg", 100, "+1", 310, 409),
        ]
        .join("\n");

        let mut evaluator = ConcordanceEvaluator::new(110, 1);
        assert!(evaluator.collect_stream(rows.as_bytes()).is_err());
    }
}

//! Parsing of tabular aligner hit records.
//!
//! Each record is one whitespace-separated row of the external aligner's
//! tabular output. Only six fields matter here; their offsets are fixed
//! by the aligner's output contract and any deviation is a malformed
//! record. Hits shorter than the minimum alignment length are a quality
//! gate and are discarded silently rather than rejected.

use std::io::Error as IoError;
use std::num::ParseIntError;

/// Minimum number of whitespace-separated fields in a hit record.
pub const MIN_FIELDS: usize = 22;

/// 0-indexed field offsets into a hit record.
pub const QUERY_ID_FIELD: usize = 1;
pub const TARGET_ID_FIELD: usize = 2;
pub const ALIGN_LEN_FIELD: usize = 7;
pub const QUERY_STRAND_FIELD: usize = 17;
pub const TARGET_START_FIELD: usize = 20;
pub const TARGET_END_FIELD: usize = 21;

/// Hits with an aligned length below this are dropped before grouping.
pub const MIN_ALIGN_LEN: i64 = 95;

#[derive(Debug)]
pub enum ParseErr {
    NotEnoughFields,
    InvalidField(ParseIntError),
    InvalidQueryId(String),
    IoError(IoError),
}

impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErr::NotEnoughFields => write!(f, "Not enough fields in hit record"),
            ParseErr::InvalidField(e) => write!(f, "Invalid field: {e}"),
            ParseErr::InvalidQueryId(id) => {
                write!(f, "Query id '{id}' does not match <L|R>-<number>")
            }
            ParseErr::IoError(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for ParseErr {}

/// Which mate of a simulated pair a hit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One alignment of a simulated mate against the assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub pair_id: u32,
    pub side: Side,
    /// Assembly sequence the mate landed on.
    pub parent: String,
    /// Orientation token, compared for equality only.
    pub strand: String,
    pub start: i64,
    pub end: i64,
}

/// Split a query id of the form `L-<n>` or `R-<n>` into side and pair id.
fn parse_query_id(id: &str) -> Result<(Side, u32), ParseErr> {
    let (tag, number) = id
        .split_once('-')
        .ok_or_else(|| ParseErr::InvalidQueryId(id.to_string()))?;
    let side = match tag {
        "L" => Side::Left,
        "R" => Side::Right,
        _ => return Err(ParseErr::InvalidQueryId(id.to_string())),
    };
    let pair_id = number
        .parse::<u32>()
        .map_err(|_| ParseErr::InvalidQueryId(id.to_string()))?;
    Ok((side, pair_id))
}

/// Parse one tabular hit record. Returns `Ok(None)` for hits below the
/// minimum alignment length.
pub fn parse_hit_line(line: &str) -> Result<Option<Hit>, ParseErr> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(ParseErr::NotEnoughFields);
    }

    let align_len = fields[ALIGN_LEN_FIELD]
        .parse::<i64>()
        .map_err(ParseErr::InvalidField)?;
    if align_len < MIN_ALIGN_LEN {
        return Ok(None);
    }

    let (side, pair_id) = parse_query_id(fields[QUERY_ID_FIELD])?;
    let start = fields[TARGET_START_FIELD]
        .parse::<i64>()
        .map_err(ParseErr::InvalidField)?;
    let end = fields[TARGET_END_FIELD]
        .parse::<i64>()
        .map_err(ParseErr::InvalidField)?;

    Ok(Some(Hit {
        pair_id,
        side,
        parent: fields[TARGET_ID_FIELD].to_string(),
        strand: fields[QUERY_STRAND_FIELD].to_string(),
        start,
        end,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a 22-field record with the fields of interest filled in.
    pub(crate) fn hit_line(
        query_id: &str,
        target_id: &str,
        align_len: i64,
        strand: &str,
        start: i64,
        end: i64,
    ) -> String {
        let mut fields = vec!["0".to_string(); MIN_FIELDS];
        fields[QUERY_ID_FIELD] = query_id.to_string();
        fields[TARGET_ID_FIELD] = target_id.to_string();
        fields[ALIGN_LEN_FIELD] = align_len.to_string();
        fields[QUERY_STRAND_FIELD] = strand.to_string();
        fields[TARGET_START_FIELD] = start.to_string();
        fields[TARGET_END_FIELD] = end.to_string();
        fields.join("\t")
    }

    #[test]
    fn test_parse_valid_hit() {
        let line = hit_line("L-7", "contig_3", 100, "+1", 500, 599);
        let hit = parse_hit_line(&line).unwrap().unwrap();

        assert_eq!(
            hit,
            Hit {
                pair_id: 7,
                side: Side::Left,
                parent: "contig_3".to_string(),
                strand: "+1".to_string(),
                start: 500,
                end: 599,
            }
        );
    }

    #[test]
    fn test_parse_right_side() {
        let line = hit_line("R-12", "contig_1", 98, "-1", 40, 137);
        let hit = parse_hit_line(&line).unwrap().unwrap();
        assert_eq!(hit.side, Side::Right);
        assert_eq!(hit.pair_id, 12);
    }

    #[test]
    fn test_invalid_side_tag_is_malformed() {
        let line = hit_line("X-5", "contig_1", 100, "+1", 10, 109);
        assert!(matches!(
            parse_hit_line(&line),
            Err(ParseErr::InvalidQueryId(_))
        ));
    }

    #[test]
    fn test_missing_dash_is_malformed() {
        let line = hit_line("L5", "contig_1", 100, "+1", 10, 109);
        assert!(matches!(
            parse_hit_line(&line),
            Err(ParseErr::InvalidQueryId(_))
        ));
    }

    #[test]
    fn test_too_few_fields() {
        assert!(matches!(
            parse_hit_line("L-1\tcontig_1\t100"),
            Err(ParseErr::NotEnoughFields)
        ));
    }

    #[test]
    fn test_short_alignment_filtered_not_error() {
        let line = hit_line("L-1", "contig_1", 94, "+1", 10, 103);
        assert!(parse_hit_line(&line).unwrap().is_none());

        let line = hit_line("L-1", "contig_1", 95, "+1", 10, 104);
        assert!(parse_hit_line(&line).unwrap().is_some());
    }

    #[test]
    fn test_filter_applies_before_query_id_check() {
        // a short hit is dropped even if its query id is junk
        let line = hit_line("garbage", "contig_1", 10, "+1", 10, 19);
        assert!(parse_hit_line(&line).unwrap().is_none());
    }
}

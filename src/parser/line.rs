use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

use super::ParseError;

/// The gap character used in `.hhr` alignment rows.
pub const GAP: u8 = b'-';

// these static regexes pull numeric substrings out of decorated
// fields like "100%" or "(171)"
lazy_static! {
    static ref FLOAT_RE: Regex = Regex::new(r"-?\d+\.?\d*(?:[eE][+-]?\d+)?").unwrap();
    static ref INT_RE: Regex = Regex::new(r"\d+").unwrap();
}

/// The closed set of line shapes that appear in the hit section of an
/// `.hhr` file, recognized from the line's leading tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    Blank,
    /// `No <rank>` — the start of a hit's detail section
    HitHeader,
    /// `><id> <description>` — the line following a hit header
    HitId,
    QuerySsPred,
    QuerySsConf,
    QueryConsensus,
    QuerySeq,
    TemplateSsPred,
    TemplateSsDssp,
    TemplateConsensus,
    TemplateSeq,
    Confidence,
    /// Anything else, e.g. the untagged pairwise match line
    Other,
}

/// Classify one line of the hit section.
pub fn classify(line: &str) -> LineTag {
    if line.trim().is_empty() {
        return LineTag::Blank;
    }
    if let Some(rest) = line.strip_prefix("No ") {
        if rest.trim().parse::<usize>().is_ok() {
            return LineTag::HitHeader;
        }
    }
    if line.starts_with('>') {
        return LineTag::HitId;
    }
    if line.starts_with("Q ss_pred") {
        return LineTag::QuerySsPred;
    }
    if line.starts_with("Q ss_conf") {
        return LineTag::QuerySsConf;
    }
    if line.starts_with("Q Consensus") {
        return LineTag::QueryConsensus;
    }
    if line.starts_with("Q ") {
        return LineTag::QuerySeq;
    }
    if line.starts_with("T ss_pred") {
        return LineTag::TemplateSsPred;
    }
    if line.starts_with("T ss_dssp") {
        return LineTag::TemplateSsDssp;
    }
    if line.starts_with("T Consensus") {
        return LineTag::TemplateConsensus;
    }
    if line.starts_with("T ") {
        return LineTag::TemplateSeq;
    }
    if line.starts_with("Confidence") {
        return LineTag::Confidence;
    }
    LineTag::Other
}

/// The character columns holding the alignment region of one display block.
/// Computed once per block from the query sequence line and reused for
/// every other tagged line of that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    pub fn width(&self) -> usize {
        self.end - self.start
    }

    /// Slice `line` to this column range, padding with spaces where the
    /// line is shorter than the range.
    pub fn slice(&self, line: &str) -> String {
        let bytes = line.as_bytes();
        let sliced: Vec<u8> = (self.start..self.end)
            .map(|idx| bytes.get(idx).copied().unwrap_or(b' '))
            .collect();
        String::from_utf8_lossy(&sliced).into_owned()
    }
}

/// Split a line into whitespace-separated tokens paired with the byte
/// offset at which each token starts.
pub fn tokens_with_positions(line: &str) -> Vec<(usize, &str)> {
    let mut tokens = vec![];
    let mut start: Option<usize> = None;

    for (idx, byte) in line.bytes().enumerate() {
        if byte.is_ascii_whitespace() {
            if let Some(s) = start.take() {
                tokens.push((s, &line[s..idx]));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(s) = start {
        tokens.push((s, &line[s..]));
    }
    tokens
}

pub fn token<'a>(tokens: &[&'a str], idx: usize) -> Result<&'a str> {
    tokens
        .get(idx)
        .copied()
        .ok_or_else(|| ParseError::TokenIndex(idx).into())
}

/// Parse a bare non-negative integer field.
pub fn parse_usize(field: &str) -> Result<usize> {
    field
        .parse::<usize>()
        .map_err(|_| ParseError::MalformedNumber(field.to_string()).into())
}

/// Extract and parse the integer inside a decorated field like `(171)`.
pub fn extract_usize(field: &str) -> Result<usize> {
    let matched = INT_RE
        .find(field)
        .ok_or_else(|| ParseError::MalformedNumber(field.to_string()))?;
    parse_usize(matched.as_str())
}

/// Extract and parse the float inside a field, tolerating wrappers like
/// `100%` and scientific notation with an unsigned exponent (`3.4e04`).
pub fn parse_float(field: &str) -> Result<f64> {
    let matched = FLOAT_RE
        .find(field)
        .ok_or_else(|| ParseError::MalformedNumber(field.to_string()))?;
    matched
        .as_str()
        .parse::<f64>()
        .map_err(|_| ParseError::MalformedNumber(field.to_string()).into())
}

/// Parse a `<start>-<end>` range field.
pub fn parse_range(field: &str) -> Result<(usize, usize)> {
    let (start, end) = field
        .split_once('-')
        .ok_or_else(|| ParseError::MalformedNumber(field.to_string()))?;
    Ok((parse_usize(start)?, parse_usize(end)?))
}

/// The number of non-gap characters in an alignment fragment.
pub fn residue_count(fragment: &str) -> usize {
    fragment.bytes().filter(|&b| b != GAP).count()
}

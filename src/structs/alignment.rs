use serde::{Deserialize, Serialize};

use crate::structs::SequenceRecord;

/// The scalar statistics reported on a hit's detail line. These are the
/// authoritative values; the summary table near the top of the file rounds
/// them for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitStats {
    /// The probability that the hit is homologous to the query (percent)
    pub probab: f64,
    /// The expected number of false positives scoring at least this well
    pub e_value: f64,
    /// The raw alignment score
    pub score: f64,
    /// The number of aligned match columns
    pub aligned_cols: usize,
    /// The percentage of identical aligned residue pairs
    pub identities: f64,
    /// The arithmetic mean substitution score per aligned pair
    pub similarity: f64,
    /// The sum of per-column alignment probabilities
    pub sum_probs: f64,
    /// The effective number of sequences in the template profile. Absent
    /// when the search ran against a plain sequence database.
    pub template_neff: Option<f64>,
}

/// How the alignment advances over one run of columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunKind {
    /// Query and template residues advance together
    Aligned,
    /// Only the query advances (an insertion relative to the template)
    QueryOnly,
    /// Only the template advances (a deletion relative to the template)
    TargetOnly,
    /// Both sides jump over residues hidden between display blocks
    Discontinuity,
}

/// One maximal run of same-state alignment columns, with half-open
/// coordinate intervals on both sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub kind: RunKind,
    pub target_start: usize,
    pub target_end: usize,
    pub query_start: usize,
    pub query_end: usize,
}

/// A run-length encoding of a gapped pairwise alignment as monotonically
/// non-decreasing breakpoint pairs. Row 0 holds template coordinates,
/// row 1 holds query coordinates; consecutive breakpoints
/// `(target[i], query[i]) -> (target[i+1], query[i+1])` describe one run
/// of aligned columns or a one-sided gap run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Template (row 0) breakpoints
    pub target: Vec<usize>,
    /// Query (row 1) breakpoints
    pub query: Vec<usize>,
}

impl Coordinates {
    /// The number of breakpoints (columns of the 2xN matrix).
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Both rows of the matrix, template first.
    pub fn rows(&self) -> [&[usize]; 2] {
        [&self.target, &self.query]
    }

    pub(crate) fn push(&mut self, target: usize, query: usize) {
        self.target.push(target);
        self.query.push(query);
    }

    /// The runs described by consecutive breakpoint pairs.
    ///
    /// A run where both rows advance by the same amount is [`RunKind::Aligned`];
    /// a run where only one row advances is a gap on the other side; a run
    /// where both rows advance by different amounts can only have been
    /// produced by a display-block discontinuity.
    pub fn runs(&self) -> impl Iterator<Item = Run> + '_ {
        self.target.windows(2).zip(self.query.windows(2)).map(|(t, q)| {
            let kind = match (t[1] - t[0], q[1] - q[0]) {
                (dt, dq) if dt == dq && dt > 0 => RunKind::Aligned,
                (0, _) => RunKind::QueryOnly,
                (_, 0) => RunKind::TargetOnly,
                _ => RunKind::Discontinuity,
            };
            Run {
                kind,
                target_start: t[0],
                target_end: t[1],
                query_start: q[0],
                query_end: q[1],
            }
        })
    }
}

/// One parsed hit: the query and template records with their annotation
/// tracks, the detail-line statistics, and the breakpoint matrix relating
/// the two ungapped sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    /// The rank of the hit within the search results (1-based)
    pub rank: usize,
    pub query: SequenceRecord,
    pub target: SequenceRecord,
    /// The full length of the template, which the alignment may only cover
    /// a part of
    pub target_length: usize,
    pub stats: HitStats,
    pub coordinates: Coordinates,
}

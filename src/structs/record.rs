use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The per-residue annotation tracks that an `.hhr` alignment can attach to
/// one side of a hit. Every track is indexed 1:1 with the ungapped sequence
/// of the record it belongs to.
///
/// Query records may carry `consensus`, `ss_pred` and `ss_conf`; template
/// records may carry `consensus`, `ss_pred`, `ss_dssp` and `confidence`.
/// Which tracks are present depends on the search mode and on whether the
/// template has known secondary structure.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterAnnotations {
    /// Profile consensus residues, lowercase/uppercase encoding conservation.
    pub consensus: Option<String>,
    /// Predicted secondary structure states.
    pub ss_pred: Option<String>,
    /// Per-residue confidence of the secondary structure prediction (digits).
    pub ss_conf: Option<String>,
    /// DSSP-derived secondary structure states.
    pub ss_dssp: Option<String>,
    /// Per-column alignment confidence digits (0-9, space for no data).
    pub confidence: Option<String>,
}

impl LetterAnnotations {
    pub fn is_empty(&self) -> bool {
        self.consensus.is_none()
            && self.ss_pred.is_none()
            && self.ss_conf.is_none()
            && self.ss_dssp.is_none()
            && self.confidence.is_none()
    }
}

/// One side of a pairwise hit: the ungapped subsequence that took part in
/// the alignment, plus its identity and annotation tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    /// The name of the sequence
    pub id: String,
    /// The free-text description following the id, if any
    pub description: Option<String>,
    /// The ungapped residues covered by the alignment
    pub seq: String,
    pub letter_annotations: LetterAnnotations,
}

impl SequenceRecord {
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

impl Display for SequenceRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, ">{}", self.id)?;

        if let Some(ref description) = self.description {
            write!(f, " {description}")?
        };

        writeln!(f)?;

        let mut iter = self.seq.as_bytes().chunks(80).peekable();

        while let Some(chunk) = iter.next() {
            match std::str::from_utf8(chunk) {
                Ok(seq_line) => {
                    write!(f, "{}", seq_line)?;
                    if iter.peek().is_some() {
                        // if we're not on the last
                        // line, add a linebreak
                        writeln!(f)?;
                    }
                }
                Err(_) => return Err(std::fmt::Error),
            }
        }
        Ok(())
    }
}

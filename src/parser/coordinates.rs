use anyhow::Result;

use super::line::GAP;
use super::ParseError;
use crate::structs::Coordinates;

/// One maximal run of display columns whose offsets continue each other.
/// A hit usually has a single segment; a forward jump in the block offsets
/// (residues hidden from the display) starts a new one.
#[derive(Debug, Clone)]
pub(crate) struct Segment {
    /// 0-based query offset of the first fragment residue
    pub q_start: usize,
    /// 0-based template offset of the first fragment residue
    pub t_start: usize,
    pub q_aligned: String,
    pub t_aligned: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnState {
    Both,
    QueryOnly,
    TargetOnly,
}

/// Run-length encode the gapped alignment into breakpoint pairs: one pair
/// at each segment start, one at each change between "advance both",
/// "advance query" and "advance template", and one at each segment end.
pub(crate) fn build_coordinates(segments: &[Segment]) -> Result<Coordinates> {
    let mut coords = Coordinates::default();

    for segment in segments {
        let mut t_pos = segment.t_start;
        let mut q_pos = segment.q_start;

        match (coords.target.last(), coords.query.last()) {
            (Some(&t), Some(&q)) => {
                if t > t_pos || q > q_pos {
                    return Err(ParseError::NonMonotonicBlocks.into());
                }
                // the jump over hidden residues becomes its own run
                if t != t_pos || q != q_pos {
                    coords.push(t_pos, q_pos);
                }
            }
            _ => coords.push(t_pos, q_pos),
        }

        let mut state: Option<ColumnState> = None;
        for (idx, (q_byte, t_byte)) in segment
            .q_aligned
            .bytes()
            .zip(segment.t_aligned.bytes())
            .enumerate()
        {
            let next = match (q_byte != GAP, t_byte != GAP) {
                (true, true) => ColumnState::Both,
                (true, false) => ColumnState::QueryOnly,
                (false, true) => ColumnState::TargetOnly,
                (false, false) => return Err(ParseError::DoubleGap(idx).into()),
            };

            if state.is_some() && state != Some(next) {
                coords.push(t_pos, q_pos);
            }
            state = Some(next);

            match next {
                ColumnState::Both => {
                    q_pos += 1;
                    t_pos += 1;
                }
                ColumnState::QueryOnly => q_pos += 1,
                ColumnState::TargetOnly => t_pos += 1,
            }
        }

        if state.is_some() {
            coords.push(t_pos, q_pos);
        }
    }

    verify(&coords)?;
    Ok(coords)
}

// every breakpoint row must be non-decreasing and no run may be empty
fn verify(coords: &Coordinates) -> Result<()> {
    for (t, q) in coords.target.windows(2).zip(coords.query.windows(2)) {
        if t[1] < t[0] || q[1] < q[0] {
            return Err(ParseError::CoordinateInvariant("rows must be non-decreasing").into());
        }
        if t[1] == t[0] && q[1] == q[0] {
            return Err(ParseError::CoordinateInvariant("zero-length run").into());
        }
    }
    Ok(())
}

/// The aligned string with its gap characters removed.
pub(crate) fn strip_gaps(aligned: &str) -> String {
    aligned.bytes().filter(|&b| b != GAP).map(char::from).collect()
}

/// The characters of a per-column annotation track at the positions where
/// `aligned` holds a residue, giving one annotation character per ungapped
/// residue.
pub(crate) fn select_at_non_gap(track: &str, aligned: &str) -> String {
    track
        .bytes()
        .zip(aligned.bytes())
        .filter(|&(_, aligned_byte)| aligned_byte != GAP)
        .map(|(track_byte, _)| char::from(track_byte))
        .collect()
}

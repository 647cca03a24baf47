use std::io::BufRead;

use anyhow::{Context, Result};

use super::block::{read_block, Block};
use super::coordinates::{build_coordinates, select_at_non_gap, strip_gaps, Segment};
use super::header::Metadata;
use super::line::{classify, parse_float, parse_usize, residue_count, LineTag};
use super::{Cursor, ParseError};
use crate::structs::{Alignment, HitStats, LetterAnnotations, SequenceRecord};

fn parse_stats_line(line: &str) -> Result<HitStats> {
    let mut probab = None;
    let mut e_value = None;
    let mut score = None;
    let mut aligned_cols = None;
    let mut identities = None;
    let mut similarity = None;
    let mut sum_probs = None;
    let mut template_neff = None;

    for field in line.split_whitespace() {
        let Some((key, value)) = field.split_once('=') else {
            return Err(ParseError::UnexpectedLine {
                expected: "a key=value statistics field",
                found: field.to_string(),
            }
            .into());
        };
        match key {
            "Probab" => probab = Some(parse_float(value)?),
            "E-value" => e_value = Some(parse_float(value)?),
            "Score" => score = Some(parse_float(value)?),
            "Aligned_cols" => aligned_cols = Some(parse_usize(value)?),
            "Identities" => identities = Some(parse_float(value)?),
            "Similarity" => similarity = Some(parse_float(value)?),
            "Sum_probs" => sum_probs = Some(parse_float(value)?),
            "Template_Neff" => template_neff = Some(parse_float(value)?),
            _ => {}
        }
    }

    let require = |value: Option<f64>, name: &'static str| -> Result<f64> {
        value.ok_or_else(|| ParseError::MissingStatistic(name).into())
    };

    Ok(HitStats {
        probab: require(probab, "Probab")?,
        e_value: require(e_value, "E-value")?,
        score: require(score, "Score")?,
        aligned_cols: aligned_cols
            .ok_or(ParseError::MissingStatistic("Aligned_cols"))?,
        identities: require(identities, "Identities")?,
        similarity: require(similarity, "Similarity")?,
        sum_probs: require(sum_probs, "Sum_probs")?,
        template_neff,
    })
}

/// Read one complete hit: the `No <rank>` header, the `>` id line, the
/// statistics line, and every alignment block up to the next hit header
/// or end of file.
pub(crate) fn read_hit<R: BufRead>(cursor: &mut Cursor<R>, metadata: &Metadata) -> Result<Alignment> {
    let Some(header_line) = cursor.next_line()? else {
        return Err(ParseError::TruncatedFile.into());
    };
    let rank = match header_line.strip_prefix("No ") {
        Some(rest) => parse_usize(rest.trim())?,
        None => {
            return Err(ParseError::UnexpectedLine {
                expected: "a hit detail header",
                found: header_line,
            }
            .into())
        }
    };

    let Some(id_line) = cursor.next_line()? else {
        return Err(ParseError::TruncatedFile.into());
    };
    if classify(&id_line) != LineTag::HitId {
        return Err(ParseError::UnexpectedLine {
            expected: "a hit id line",
            found: id_line,
        }
        .into());
    }
    let rest = id_line.strip_prefix('>').unwrap_or(&id_line);
    let (id, description) = match rest.split_once(char::is_whitespace) {
        Some((id, description)) => {
            let description = description.trim();
            (
                id.to_string(),
                (!description.is_empty()).then(|| description.to_string()),
            )
        }
        None => (rest.to_string(), None),
    };

    let Some(stats_line) = cursor.next_line()? else {
        return Err(ParseError::TruncatedFile.into());
    };
    let stats = parse_stats_line(&stats_line)
        .with_context(|| format!("in the statistics of hit {rank} on line {}", cursor.line_number()))?;

    let mut blocks: Vec<Block> = vec![];
    loop {
        let tag = match cursor.peek_line()? {
            None => break,
            Some(line) => classify(line),
        };
        match tag {
            LineTag::Blank => {
                cursor.next_line()?;
            }
            LineTag::HitHeader => break,
            LineTag::QuerySsPred
            | LineTag::QuerySsConf
            | LineTag::QueryConsensus
            | LineTag::QuerySeq => {
                let block = read_block(cursor).with_context(|| {
                    format!("in an alignment block of hit {rank} near line {}", cursor.line_number())
                })?;
                blocks.push(block);
            }
            _ => {
                let found = cursor.peek_line()?.unwrap_or_default().to_string();
                return Err(ParseError::UnexpectedLine {
                    expected: "an alignment block",
                    found,
                }
                .into());
            }
        }
    }

    if blocks.is_empty() {
        return Err(ParseError::TruncatedFile.into());
    }

    finalize(rank, id, description, stats, &blocks, metadata)
}

// stitch a hit's blocks into one Alignment: concatenate the display rows,
// run-length encode the coordinates, strip the gaps
fn finalize(
    rank: usize,
    id: String,
    description: Option<String>,
    stats: HitStats,
    blocks: &[Block],
    metadata: &Metadata,
) -> Result<Alignment> {
    let q_total = blocks[0].query.total;
    let t_total = blocks[0].template.total;
    for block in blocks {
        if block.query.total != q_total || block.template.total != t_total {
            return Err(ParseError::TotalLengthMismatch.into());
        }
    }

    let mut segments: Vec<Segment> = vec![];
    let mut q_all = String::new();
    let mut t_all = String::new();

    for block in blocks {
        let q_start = block.query.start - 1;
        let t_start = block.template.start - 1;

        let new_segment = match segments.last_mut() {
            Some(segment) => {
                let q_end = segment.q_start + residue_count(&segment.q_aligned);
                let t_end = segment.t_start + residue_count(&segment.t_aligned);
                if q_start == q_end && t_start == t_end {
                    segment.q_aligned.push_str(&block.query.fragment);
                    segment.t_aligned.push_str(&block.template.fragment);
                    false
                } else if q_start < q_end || t_start < t_end {
                    return Err(ParseError::NonMonotonicBlocks.into());
                } else {
                    true
                }
            }
            None => true,
        };
        if new_segment {
            segments.push(Segment {
                q_start,
                t_start,
                q_aligned: block.query.fragment.clone(),
                t_aligned: block.template.fragment.clone(),
            });
        }

        q_all.push_str(&block.query.fragment);
        t_all.push_str(&block.template.fragment);
    }

    let coordinates = build_coordinates(&segments)?;

    let q_consensus = concat_track(blocks, |b| b.q_consensus.as_deref());
    let q_ss_pred = concat_track(blocks, |b| b.q_ss_pred.as_deref());
    let q_ss_conf = concat_track(blocks, |b| b.q_ss_conf.as_deref());
    let t_consensus = concat_track(blocks, |b| b.t_consensus.as_deref());
    let t_ss_pred = concat_track(blocks, |b| b.t_ss_pred.as_deref());
    let t_ss_dssp = concat_track(blocks, |b| b.t_ss_dssp.as_deref());
    let confidence = concat_track(blocks, |b| b.confidence.as_deref());

    let query = SequenceRecord {
        id: metadata.query_id.clone(),
        description: metadata.query_description.clone(),
        seq: strip_gaps(&q_all),
        letter_annotations: LetterAnnotations {
            consensus: q_consensus.map(|track| select_at_non_gap(&track, &q_all)),
            ss_pred: q_ss_pred.map(|track| select_at_non_gap(&track, &q_all)),
            ss_conf: q_ss_conf.map(|track| select_at_non_gap(&track, &q_all)),
            ss_dssp: None,
            confidence: None,
        },
    };

    let target = SequenceRecord {
        id,
        description,
        seq: strip_gaps(&t_all),
        letter_annotations: LetterAnnotations {
            consensus: t_consensus.map(|track| select_at_non_gap(&track, &t_all)),
            ss_pred: t_ss_pred.map(|track| select_at_non_gap(&track, &t_all)),
            ss_dssp: t_ss_dssp.map(|track| select_at_non_gap(&track, &t_all)),
            confidence: confidence.map(|track| select_at_non_gap(&track, &t_all)),
            ss_conf: None,
        },
    };

    Ok(Alignment {
        rank,
        query,
        target,
        target_length: t_total,
        stats,
        coordinates,
    })
}

// a track present in any block of a hit spans the whole hit: blocks that
// omit it contribute spaces over their column range
fn concat_track<'b>(
    blocks: &'b [Block],
    get: impl Fn(&'b Block) -> Option<&'b str>,
) -> Option<String> {
    if !blocks.iter().any(|block| get(block).is_some()) {
        return None;
    }

    let mut track = String::new();
    for block in blocks {
        match get(block) {
            Some(value) => track.push_str(value),
            None => track.extend(std::iter::repeat(' ').take(block.query.columns.width())),
        }
    }
    Some(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq_line(tag: &str, id: &str, start: usize, frag: &str, end: usize, total: usize) -> String {
        format!("{:<20}{start:>4} {frag} {end:>4} ({total})", format!("{tag} {id}"))
    }

    fn bare_line(label: &str, frag: &str) -> String {
        format!("{label:<25}{frag}")
    }

    fn metadata() -> Metadata {
        Metadata {
            query_id: "2UVO:A|PDBID|CHAIN|SEQUENCE".to_string(),
            query_description: Some("CHITIN-BINDING LECTIN".to_string()),
            match_columns: 171,
            ..Metadata::default()
        }
    }

    const STATS: &str = "Probab=99.95  E-value=3.7e-34  Score=210.31  Aligned_cols=8  \
Identities=100%  Similarity=2.050  Sum_probs=7.2  Template_Neff=11.472";

    #[test]
    fn test_parse_stats_line() -> Result<()> {
        let stats = parse_stats_line(STATS)?;
        assert_eq!(stats.probab, 99.95);
        assert_eq!(stats.e_value, 3.7e-34);
        assert_eq!(stats.score, 210.31);
        assert_eq!(stats.aligned_cols, 8);
        assert_eq!(stats.identities, 100.0);
        assert_eq!(stats.similarity, 2.05);
        assert_eq!(stats.sum_probs, 7.2);
        assert_eq!(stats.template_neff, Some(11.472));
        Ok(())
    }

    #[test]
    fn test_stats_line_without_template_neff() -> Result<()> {
        let stats = parse_stats_line(
            "Probab=1.23  E-value=3.4e04  Score=-0.01  Aligned_cols=1  \
Identities=0%  Similarity=-0.077  Sum_probs=0.0",
        )?;
        assert_eq!(stats.e_value, 34000.0);
        assert_eq!(stats.score, -0.01);
        assert_eq!(stats.template_neff, None);
        Ok(())
    }

    #[test]
    fn test_stats_line_missing_score() {
        let err = parse_stats_line(
            "Probab=1.23  E-value=3.4e04  Aligned_cols=1  Identities=0%  \
Similarity=-0.077  Sum_probs=0.0",
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::MissingStatistic("Score"))
        );
    }

    #[test]
    fn test_read_hit_merges_wrapped_blocks() -> Result<()> {
        let text = [
            "No 1".to_string(),
            ">2uvo_A Agglutinin isolectin 1".to_string(),
            STATS.to_string(),
            String::new(),
            seq_line("Q", "2UVO:A|PDBID|CHAIN", 1, "ACDE", 4, 171),
            seq_line("Q", "Consensus", 1, "acde", 4, 171),
            bare_line("", "||||"),
            seq_line("T", "Consensus", 11, "acde", 14, 98),
            seq_line("T", "2uvo_A", 11, "ACDE", 14, 98),
            bare_line("T ss_dssp", "CSSC"),
            bare_line("Confidence", "9887"),
            String::new(),
            seq_line("Q", "2UVO:A|PDBID|CHAIN", 5, "FGHI", 8, 171),
            seq_line("Q", "Consensus", 5, "fghi", 8, 171),
            bare_line("", "||||"),
            seq_line("T", "Consensus", 15, "fghi", 18, 98),
            seq_line("T", "2uvo_A", 15, "FGHI", 18, 98),
            bare_line("T ss_dssp", "CTTC"),
            bare_line("Confidence", "8998"),
            String::new(),
        ]
        .join("\n");
        let mut cursor = Cursor::new(text.as_bytes());
        let alignment = read_hit(&mut cursor, &metadata())?;

        assert_eq!(alignment.rank, 1);
        assert_eq!(alignment.query.id, "2UVO:A|PDBID|CHAIN|SEQUENCE");
        assert_eq!(alignment.query.seq, "ACDEFGHI");
        assert_eq!(alignment.target.id, "2uvo_A");
        assert_eq!(
            alignment.target.description.as_deref(),
            Some("Agglutinin isolectin 1")
        );
        assert_eq!(alignment.target.seq, "ACDEFGHI");
        assert_eq!(alignment.target_length, 98);

        // two contiguous blocks collapse into one segment
        assert_eq!(alignment.coordinates.target, vec![10, 18]);
        assert_eq!(alignment.coordinates.query, vec![0, 8]);

        assert_eq!(
            alignment.target.letter_annotations.ss_dssp.as_deref(),
            Some("CSSCCTTC")
        );
        assert_eq!(
            alignment.target.letter_annotations.confidence.as_deref(),
            Some("98878998")
        );
        assert_eq!(
            alignment.query.letter_annotations.consensus.as_deref(),
            Some("acdefghi")
        );
        assert!(alignment.query.letter_annotations.ss_pred.is_none());
        Ok(())
    }

    #[test]
    fn test_track_missing_from_one_block_is_padded() -> Result<()> {
        let text = [
            "No 1".to_string(),
            ">2uvo_A".to_string(),
            STATS.to_string(),
            String::new(),
            seq_line("Q", "2UVO:A|PDBID|CHAIN", 1, "ACDE", 4, 171),
            seq_line("T", "2uvo_A", 11, "ACDE", 14, 98),
            String::new(),
            seq_line("Q", "2UVO:A|PDBID|CHAIN", 5, "FGHI", 8, 171),
            seq_line("T", "2uvo_A", 15, "FGHI", 18, 98),
            bare_line("T ss_dssp", "CTTC"),
            String::new(),
        ]
        .join("\n");
        let mut cursor = Cursor::new(text.as_bytes());
        let alignment = read_hit(&mut cursor, &metadata())?;

        assert_eq!(
            alignment.target.letter_annotations.ss_dssp.as_deref(),
            Some("    CTTC")
        );
        assert_eq!(alignment.target.description, None);
        Ok(())
    }

    #[test]
    fn test_block_offset_jump_becomes_discontinuity() -> Result<()> {
        // the second block skips 10 residues on both sides
        let text = [
            "No 1".to_string(),
            ">2uvo_A".to_string(),
            STATS.to_string(),
            String::new(),
            seq_line("Q", "2UVO:A|PDBID|CHAIN", 1, "ACDE", 4, 171),
            seq_line("T", "2uvo_A", 11, "ACDE", 14, 98),
            String::new(),
            seq_line("Q", "2UVO:A|PDBID|CHAIN", 15, "FGHI", 18, 171),
            seq_line("T", "2uvo_A", 25, "FGHI", 28, 98),
            String::new(),
        ]
        .join("\n");
        let mut cursor = Cursor::new(text.as_bytes());
        let alignment = read_hit(&mut cursor, &metadata())?;

        // hidden residues are dropped from the sequences but show up as a
        // jump in the coordinates
        assert_eq!(alignment.query.seq, "ACDEFGHI");
        assert_eq!(alignment.coordinates.target, vec![10, 14, 24, 28]);
        assert_eq!(alignment.coordinates.query, vec![0, 4, 14, 18]);
        Ok(())
    }

    #[test]
    fn test_hit_with_no_blocks_is_truncated() {
        let text = ["No 1", ">2uvo_A", STATS, ""].join("\n");
        let mut cursor = Cursor::new(text.as_bytes());

        let err = read_hit(&mut cursor, &metadata()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::TruncatedFile)
        );
    }

    #[test]
    fn test_hit_cut_off_after_id_line() {
        let text = ["No 1", ">2uvo_A"].join("\n");
        let mut cursor = Cursor::new(text.as_bytes());

        let err = read_hit(&mut cursor, &metadata()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::TruncatedFile)
        );
    }

    #[test]
    fn test_template_length_change_is_rejected() {
        let text = [
            "No 1".to_string(),
            ">2uvo_A".to_string(),
            STATS.to_string(),
            String::new(),
            seq_line("Q", "2UVO:A|PDBID|CHAIN", 1, "ACDE", 4, 171),
            seq_line("T", "2uvo_A", 11, "ACDE", 14, 98),
            String::new(),
            seq_line("Q", "2UVO:A|PDBID|CHAIN", 5, "FGHI", 8, 171),
            seq_line("T", "2uvo_A", 15, "FGHI", 18, 99),
            String::new(),
        ]
        .join("\n");
        let mut cursor = Cursor::new(text.as_bytes());

        let err = read_hit(&mut cursor, &metadata()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::TotalLengthMismatch)
        );
    }
}

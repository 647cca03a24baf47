use std::io::BufRead;

use anyhow::Result;

use super::line::{
    classify, extract_usize, parse_usize, residue_count, tokens_with_positions, ColumnRange,
    LineTag,
};
use super::{Cursor, ParseError};

/// A parsed `Q <id>` or `T <id>` sequence line: the 1-based offsets of the
/// fragment's first and last residue, the full sequence length from the
/// trailing `(N)` field, and the character columns the fragment occupies.
#[derive(Debug, Clone)]
pub(crate) struct SeqLine {
    pub start: usize,
    pub end: usize,
    pub total: usize,
    pub fragment: String,
    pub columns: ColumnRange,
}

fn parse_seq_line(line: &str) -> Result<SeqLine> {
    let tokens = tokens_with_positions(line);
    if tokens.len() != 6 {
        return Err(ParseError::UnexpectedLine {
            expected: "a tagged sequence line",
            found: line.to_string(),
        }
        .into());
    }

    let start = parse_usize(tokens[2].1)?;
    let (fragment_col, fragment) = tokens[3];
    let end = parse_usize(tokens[4].1)?;
    let total = extract_usize(tokens[5].1)?;

    if start == 0 {
        return Err(ParseError::MalformedNumber(tokens[2].1.to_string()).into());
    }

    let residues = residue_count(fragment);
    if residues > 0 && start + residues - 1 != end {
        return Err(ParseError::OffsetMismatch {
            start,
            end,
            residues,
        }
        .into());
    }

    Ok(SeqLine {
        start,
        end,
        total,
        fragment: fragment.to_string(),
        columns: ColumnRange {
            start: fragment_col,
            end: fragment_col + fragment.len(),
        },
    })
}

/// One wrapped alignment block: the query and template sequence lines plus
/// whichever annotation tracks the block carries, all sliced to the block's
/// shared column range.
#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub query: SeqLine,
    pub template: SeqLine,
    pub q_ss_pred: Option<String>,
    pub q_ss_conf: Option<String>,
    pub q_consensus: Option<String>,
    pub t_ss_pred: Option<String>,
    pub t_ss_dssp: Option<String>,
    pub t_consensus: Option<String>,
    pub confidence: Option<String>,
}

/// Read one alignment block. The cursor must be positioned at the block's
/// first tagged line; the block ends at a blank line (consumed), at the
/// next hit header (left in place), or at end of file.
pub(crate) fn read_block<R: BufRead>(cursor: &mut Cursor<R>) -> Result<Block> {
    let mut lines: Vec<(LineTag, String)> = vec![];
    let mut at_eof = false;

    loop {
        let tag = match cursor.peek_line()? {
            None => {
                at_eof = true;
                break;
            }
            Some(line) => classify(line),
        };
        match tag {
            LineTag::Blank => {
                cursor.next_line()?;
                break;
            }
            LineTag::HitHeader | LineTag::HitId => break,
            tag => {
                if let Some(line) = cursor.next_line()? {
                    lines.push((tag, line));
                }
            }
        }
    }

    let mut q_line = None;
    let mut t_line = None;
    let mut q_ss_pred = None;
    let mut q_ss_conf = None;
    let mut q_consensus = None;
    let mut t_ss_pred = None;
    let mut t_ss_dssp = None;
    let mut t_consensus = None;
    let mut confidence = None;

    for (tag, line) in &lines {
        match tag {
            LineTag::QuerySeq => q_line = Some(parse_seq_line(line)?),
            LineTag::TemplateSeq => t_line = Some(parse_seq_line(line)?),
            LineTag::QuerySsPred => q_ss_pred = Some(line.clone()),
            LineTag::QuerySsConf => q_ss_conf = Some(line.clone()),
            LineTag::QueryConsensus => q_consensus = Some(line.clone()),
            LineTag::TemplateSsPred => t_ss_pred = Some(line.clone()),
            LineTag::TemplateSsDssp => t_ss_dssp = Some(line.clone()),
            LineTag::TemplateConsensus => t_consensus = Some(line.clone()),
            LineTag::Confidence => confidence = Some(line.clone()),
            // the untagged pairwise match line carries no data we keep
            _ => {}
        }
    }

    let missing = |side: &'static str| -> anyhow::Error {
        if at_eof {
            ParseError::TruncatedFile.into()
        } else {
            ParseError::IncompleteBlock(side).into()
        }
    };

    let query = match q_line {
        Some(q) => q,
        None => return Err(missing("query")),
    };
    let template = match t_line {
        Some(t) => t,
        None => return Err(missing("template")),
    };

    if query.columns != template.columns {
        return Err(ParseError::ColumnRangeMismatch.into());
    }

    // every other tagged line is sliced with the sequence lines' column
    // range; those lines carry no offset fields of their own
    let columns = query.columns;
    let slice = |line: Option<String>| line.map(|l| columns.slice(&l));

    Ok(Block {
        query,
        template,
        q_ss_pred: slice(q_ss_pred),
        q_ss_conf: slice(q_ss_conf),
        q_consensus: slice(q_consensus),
        t_ss_pred: slice(t_ss_pred),
        t_ss_dssp: slice(t_ss_dssp),
        t_consensus: slice(t_consensus),
        confidence: slice(confidence),
    })
}

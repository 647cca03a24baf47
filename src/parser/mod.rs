use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, trace};
use thiserror::Error;

use crate::structs::Alignment;

mod block;
mod coordinates;
mod header;
mod hit;
pub mod line;
mod summary;

pub use header::Metadata;

/// The ways an `.hhr` file can fail to parse. Truncation always renders as
/// the canonical `Truncated file.` message; every other variant names the
/// field or structure that was malformed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Truncated file.")]
    TruncatedFile,
    #[error("expected a numeric field, found \"{0}\"")]
    MalformedNumber(String),
    #[error("token index {0} out of bounds")]
    TokenIndex(usize),
    #[error("expected {expected}, found \"{found}\"")]
    UnexpectedLine {
        expected: &'static str,
        found: String,
    },
    #[error("alignment block is missing its {0} sequence line")]
    IncompleteBlock(&'static str),
    #[error("residue offsets {start}-{end} disagree with {residues} residues")]
    OffsetMismatch {
        start: usize,
        end: usize,
        residues: usize,
    },
    #[error("query and template rows cover different column ranges")]
    ColumnRangeMismatch,
    #[error("statistics line is missing {0}")]
    MissingStatistic(&'static str),
    #[error("alignment blocks do not advance monotonically")]
    NonMonotonicBlocks,
    #[error("sequence length changed between alignment blocks")]
    TotalLengthMismatch,
    #[error("alignment column {0} is gapped on both rows")]
    DoubleGap(usize),
    #[error("coordinate matrix violates an invariant: {0}")]
    CoordinateInvariant(&'static str),
}

/// A forward-only line cursor over the underlying text source, with one
/// line of lookahead so the hit and block readers can decide whether a
/// section continues without consuming its first line.
#[derive(Debug)]
pub(crate) struct Cursor<R> {
    rdr: R,
    lookahead: Option<String>,
    line_number: u64,
}

impl<R: BufRead> Cursor<R> {
    pub(crate) fn new(rdr: R) -> Cursor<R> {
        Cursor {
            rdr,
            lookahead: None,
            line_number: 0,
        }
    }

    /// The 1-based number of the most recently read line.
    pub(crate) fn line_number(&self) -> u64 {
        self.line_number
    }

    fn fill(&mut self) -> Result<()> {
        if self.lookahead.is_none() {
            let mut buf = String::new();
            let bytes_read = self.rdr.read_line(&mut buf)?;
            if bytes_read > 0 {
                self.line_number += 1;
                while buf.ends_with('\n') || buf.ends_with('\r') {
                    buf.pop();
                }
                self.lookahead = Some(buf);
            }
        }
        Ok(())
    }

    /// Consume and return the next line, or `None` at end of file.
    pub(crate) fn next_line(&mut self) -> Result<Option<String>> {
        self.fill()?;
        Ok(self.lookahead.take())
    }

    /// Return the next line without consuming it.
    pub(crate) fn peek_line(&mut self) -> Result<Option<&str>> {
        self.fill()?;
        Ok(self.lookahead.as_deref())
    }
}

#[derive(Debug)]
enum Phase {
    Header,
    Table,
    Hits,
    Done,
}

/// A pull-based reader over the hits of one `.hhr` file.
///
/// The file header and the ranked-hit summary table are consumed when the
/// reader is constructed, so a file truncated before its first hit fails
/// here rather than on the first [`Alignment`] request. Summary rows are
/// validated and counted but not retained; the per-hit detail sections are
/// authoritative for every statistic.
#[derive(Debug)]
pub struct Reader<R> {
    cursor: Cursor<io::BufReader<R>>,
    metadata: Metadata,
    summary_rows: usize,
    phase: Phase,
}

impl Reader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        let file = File::open(&path)
            .with_context(|| format!("failed to open {}", path.as_ref().to_string_lossy()))?;
        Reader::new(file)
    }
}

impl<R: io::Read> Reader<R> {
    pub fn new(rdr: R) -> Result<Reader<R>> {
        let mut reader = Reader {
            cursor: Cursor::new(io::BufReader::new(rdr)),
            metadata: Metadata::default(),
            summary_rows: 0,
            phase: Phase::Header,
        };

        reader.metadata = header::read_header(&mut reader.cursor)?;
        debug!(
            "parsed .hhr header for query {} ({} match columns)",
            reader.metadata.query_id, reader.metadata.match_columns
        );
        reader.phase = Phase::Table;

        reader.summary_rows = summary::read_summary(&mut reader.cursor)?;
        debug!("summary table lists {} hits", reader.summary_rows);
        reader.phase = Phase::Hits;

        Ok(reader)
    }

    /// The file-level metadata parsed from the header block.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The number of rows the summary table listed. In a well-formed file
    /// this equals the number of alignments the reader yields.
    pub fn summary_rows(&self) -> usize {
        self.summary_rows
    }

    /// A borrowed iterator over the alignments of the file.
    pub fn alignments(&mut self) -> AlignmentsIter<R> {
        AlignmentsIter::new(self)
    }

    /// An owned iterator over the alignments of the file.
    pub fn into_alignments(self) -> AlignmentsIntoIter<R> {
        AlignmentsIntoIter::new(self)
    }

    /// Read a single alignment, or `None` once the hits are exhausted.
    fn read_alignment(&mut self) -> Result<Option<Alignment>> {
        if let Phase::Done = self.phase {
            return Ok(None);
        }

        loop {
            let tag = match self.cursor.peek_line()? {
                None => {
                    self.phase = Phase::Done;
                    return Ok(None);
                }
                Some(l) => line::classify(l),
            };
            match tag {
                line::LineTag::Blank => {
                    self.cursor.next_line()?;
                }
                line::LineTag::HitHeader => {
                    let alignment = hit::read_hit(&mut self.cursor, &self.metadata)?;
                    trace!("parsed hit {} ({})", alignment.rank, alignment.target.id);
                    return Ok(Some(alignment));
                }
                _ => {
                    let found = self.cursor.peek_line()?.unwrap_or_default().to_string();
                    return Err(ParseError::UnexpectedLine {
                        expected: "a hit detail header",
                        found,
                    }
                    .into());
                }
            }
        }
    }
}

/// A borrowed iterator over the alignments of an `.hhr` file.
pub struct AlignmentsIter<'r, R> {
    rdr: &'r mut Reader<R>,
}

impl<'r, R: io::Read> AlignmentsIter<'r, R> {
    fn new(rdr: &'r mut Reader<R>) -> AlignmentsIter<'r, R> {
        AlignmentsIter { rdr }
    }

    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<R> {
        self.rdr
    }

    /// Return a mutable reference to the underlying reader.
    pub fn reader_mut(&mut self) -> &mut Reader<R> {
        self.rdr
    }
}

impl<'r, R: io::Read> Iterator for AlignmentsIter<'r, R> {
    type Item = Result<Alignment>;

    fn next(&mut self) -> Option<Result<Alignment>> {
        self.rdr.read_alignment().transpose()
    }
}

/// An owned iterator over the alignments of an `.hhr` file.
pub struct AlignmentsIntoIter<R> {
    rdr: Reader<R>,
}

impl<R: io::Read> AlignmentsIntoIter<R> {
    fn new(rdr: Reader<R>) -> AlignmentsIntoIter<R> {
        AlignmentsIntoIter { rdr }
    }

    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }

    /// Return a mutable reference to the underlying reader.
    pub fn reader_mut(&mut self) -> &mut Reader<R> {
        &mut self.rdr
    }

    /// Drop this iterator and return the underlying reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

impl<R: io::Read> Iterator for AlignmentsIntoIter<R> {
    type Item = Result<Alignment>;

    fn next(&mut self) -> Option<Result<Alignment>> {
        self.rdr.read_alignment().transpose()
    }
}

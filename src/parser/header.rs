use std::io::BufRead;

use anyhow::{Context, Result};
use phf::phf_map;
use serde::{Deserialize, Serialize};

use super::line::{parse_float, parse_usize, token};
use super::{Cursor, ParseError};

// the header flags recognized by the metadata reader; anything else
// (banner lines, blank lines) is skipped
#[derive(Debug, Clone, Copy)]
enum HeaderFlag {
    Query,
    MatchColumns,
    NoOfSeqs,
    Neff,
    SearchedHmms,
    Date,
    Command,
}

static HEADER_FLAGS: phf::Map<&'static str, HeaderFlag> = phf_map! {
    "Query" => HeaderFlag::Query,
    "Match_columns" => HeaderFlag::MatchColumns,
    "No_of_seqs" => HeaderFlag::NoOfSeqs,
    "Neff" => HeaderFlag::Neff,
    "Searched_HMMs" => HeaderFlag::SearchedHmms,
    "Date" => HeaderFlag::Date,
    "Command" => HeaderFlag::Command,
};

/// The file-level metadata block at the top of an `.hhr` file, read once
/// before any hit and immutable afterwards.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// The full query id from the `Query` line
    pub query_id: String,
    /// The free text following the query id, if any
    pub query_description: Option<String>,
    /// The number of match columns in the query profile
    pub match_columns: usize,
    /// The number of sequences retained in the query profile
    pub num_seqs: usize,
    /// The total number of sequences found for the query profile
    pub total_seqs: usize,
    /// The effective number of sequences in the query profile
    pub neff: Option<f64>,
    /// The number of database profiles searched
    pub searched_hmms: usize,
    /// The date line of the run
    pub rundate: String,
    /// The command line that produced the file
    pub command_line: String,
}

/// True for the column-header line that introduces the summary table.
pub(crate) fn is_summary_header(line: &str) -> bool {
    line.contains(" Hit ") && line.contains("Prob")
}

/// Read the header block up to and including the summary-table column
/// header, leaving the cursor at the first summary row (or at the blank
/// line that ends an empty table).
pub(crate) fn read_header<R: BufRead>(cursor: &mut Cursor<R>) -> Result<Metadata> {
    let mut metadata = Metadata::default();

    loop {
        let Some(line) = cursor.next_line()? else {
            return Err(ParseError::TruncatedFile.into());
        };
        if is_summary_header(&line) {
            break;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&flag_token) = tokens.first() else {
            continue;
        };
        let Some(flag) = HEADER_FLAGS.get(flag_token) else {
            continue;
        };

        let error_context = || {
            format!(
                "failed to parse .hhr header flag {} on line {}",
                flag_token,
                cursor.line_number()
            )
        };

        match flag {
            HeaderFlag::Query => {
                metadata.query_id = token(&tokens, 1).with_context(error_context)?.to_string();
                metadata.query_description = (tokens.len() > 2).then(|| tokens[2..].join(" "));
            }
            HeaderFlag::MatchColumns => {
                metadata.match_columns =
                    parse_usize(token(&tokens, 1)?).with_context(error_context)?;
            }
            HeaderFlag::NoOfSeqs => {
                // "No_of_seqs    118 out of 2230"
                metadata.num_seqs = parse_usize(token(&tokens, 1)?).with_context(error_context)?;
                metadata.total_seqs =
                    parse_usize(token(&tokens, tokens.len() - 1)?).with_context(error_context)?;
            }
            HeaderFlag::Neff => {
                metadata.neff =
                    Some(parse_float(token(&tokens, 1)?).with_context(error_context)?);
            }
            HeaderFlag::SearchedHmms => {
                metadata.searched_hmms =
                    parse_usize(token(&tokens, 1)?).with_context(error_context)?;
            }
            HeaderFlag::Date => {
                metadata.rundate = tokens[1..].join(" ");
            }
            HeaderFlag::Command => {
                metadata.command_line = tokens[1..].join(" ");
            }
        }
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "\
Query         2UVO:A|PDBID|CHAIN|SEQUENCE CHITIN-BINDING LECTIN
Match_columns 171
No_of_seqs    118 out of 2230
Neff          7.9
Searched_HMMs 34
Date          Fri Feb 15 16:34:13 2019
Command       hhblits -i 2uvo.fasta -d ./databases/pdb70

 No Hit                             Prob E-value P-value  Score    SS Cols Query HMM  Template HMM
";

    #[test]
    fn test_read_header() -> Result<()> {
        let mut cursor = Cursor::new(HEADER.as_bytes());
        let metadata = read_header(&mut cursor)?;

        assert_eq!(metadata.query_id, "2UVO:A|PDBID|CHAIN|SEQUENCE");
        assert_eq!(
            metadata.query_description.as_deref(),
            Some("CHITIN-BINDING LECTIN")
        );
        assert_eq!(metadata.match_columns, 171);
        assert_eq!(metadata.num_seqs, 118);
        assert_eq!(metadata.total_seqs, 2230);
        assert_eq!(metadata.neff, Some(7.9));
        assert_eq!(metadata.searched_hmms, 34);
        assert_eq!(metadata.rundate, "Fri Feb 15 16:34:13 2019");
        assert_eq!(
            metadata.command_line,
            "hhblits -i 2uvo.fasta -d ./databases/pdb70"
        );

        // the cursor is left just past the column-header line
        assert_eq!(cursor.next_line()?, None);
        Ok(())
    }

    #[test]
    fn test_truncated_header() {
        // cut off before the summary column-header line
        let truncated = &HEADER[..HEADER.find("Date").unwrap()];
        let mut cursor = Cursor::new(truncated.as_bytes());

        let err = read_header(&mut cursor).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::TruncatedFile)
        );
        assert_eq!(err.to_string(), "Truncated file.");
    }

    #[test]
    fn test_malformed_match_columns() {
        let broken = HEADER.replace("Match_columns 171", "Match_columns many");
        let mut cursor = Cursor::new(broken.as_bytes());

        let err = read_header(&mut cursor).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::MalformedNumber("many".to_string()))
        );
    }
}

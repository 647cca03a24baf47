use std::io::BufRead;

use anyhow::{Context, Result};
use log::trace;

use super::line::{extract_usize, parse_float, parse_range, parse_usize};
use super::{Cursor, ParseError};

// summary rows are validated and counted, never retained: the per-hit
// detail sections parsed later are authoritative for every field
#[allow(dead_code)]
struct SummaryRow {
    rank: usize,
    id: String,
    prob: f64,
    e_value: f64,
    p_value: f64,
    score: f64,
    ss: f64,
    cols: usize,
    query_range: (usize, usize),
    template_range: (usize, usize),
    template_length: usize,
}

// the hit id/description field is space padded to this width; a full-width
// id abuts the probability field with no separator, so the row is sliced
// at fixed columns before any whitespace splitting
const RANK_WIDTH: usize = 3;
const ID_START: usize = 4;
const ID_END: usize = 34;

fn parse_summary_row(line: &str) -> Result<SummaryRow> {
    let malformed = || ParseError::UnexpectedLine {
        expected: "a summary table row",
        found: line.to_string(),
    };

    let rank_field = line.get(..RANK_WIDTH).ok_or_else(malformed)?;
    let id_field = line.get(ID_START..ID_END).ok_or_else(malformed)?;
    let rest = line.get(ID_END..).ok_or_else(malformed)?;

    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 9 {
        return Err(malformed().into());
    }

    Ok(SummaryRow {
        rank: parse_usize(rank_field.trim())?,
        id: id_field.trim_end().to_string(),
        prob: parse_float(fields[0])?,
        e_value: parse_float(fields[1])?,
        p_value: parse_float(fields[2])?,
        score: parse_float(fields[3])?,
        ss: parse_float(fields[4])?,
        cols: parse_usize(fields[5])?,
        query_range: parse_range(fields[6])?,
        template_range: parse_range(fields[7])?,
        template_length: extract_usize(fields[8])?,
    })
}

/// Consume the ranked-hit summary table, stopping at the blank line that
/// ends it (or at end of file). Returns the number of rows seen.
pub(crate) fn read_summary<R: BufRead>(cursor: &mut Cursor<R>) -> Result<usize> {
    let mut rows = 0;

    loop {
        let Some(line) = cursor.next_line()? else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }

        let row = parse_summary_row(&line)
            .with_context(|| format!("malformed summary row on line {}", cursor.line_number()))?;
        trace!("summary row {}: {} Prob={}", row.rank, row.id, row.prob);
        rows += 1;
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summary_row() -> Result<()> {
        let row = parse_summary_row(
            "  2 1ulk_A Lectin-C; chitin-bindin 96.4 1.2E-16 2.4E-21   50.0   0.0   40      5-44      1-41 (98)",
        )?;

        assert_eq!(row.rank, 2);
        assert_eq!(row.id, "1ulk_A Lectin-C; chitin-bindin");
        assert_eq!(row.prob, 96.4);
        assert_eq!(row.e_value, 1.2e-16);
        assert_eq!(row.score, 50.0);
        assert_eq!(row.cols, 40);
        assert_eq!(row.query_range, (5, 44));
        assert_eq!(row.template_range, (1, 41));
        assert_eq!(row.template_length, 98);
        Ok(())
    }

    #[test]
    fn test_id_abuts_probability_field() -> Result<()> {
        // a full-width hit id leaves no space before the probability
        let row = parse_summary_row(
            "  1 2uvo_A Agglutinin isolectin 1;100.0 3.7E-34 4.8E-39  210.3   0.0  171     1-171     1-171 (171)",
        )?;

        assert_eq!(row.id, "2uvo_A Agglutinin isolectin 1;");
        assert_eq!(row.prob, 100.0);
        Ok(())
    }

    #[test]
    fn test_unsigned_exponent_e_value() -> Result<()> {
        let row = parse_summary_row(
            "  1 1xyz_A Hypothetical protein; X  1.2  3.4e04 8.8E+00   -0.0   0.0    1       3-3       7-7 (25)",
        )?;

        assert_eq!(row.e_value, 34000.0);
        assert_eq!(row.score, 0.0);
        Ok(())
    }

    #[test]
    fn test_read_summary_counts_rows() -> Result<()> {
        let table = "\
  1 2uvo_A Agglutinin isolectin 1; 99.9 3.7E-34 4.8E-39  210.3   0.0  171     1-171     1-171 (171)
  2 1ulk_A Lectin-C; chitin-bindin 96.4 1.2E-16 2.4E-21   50.0   0.0   40      5-44      1-41 (98)

No 1
";
        let mut cursor = Cursor::new(table.as_bytes());
        assert_eq!(read_summary(&mut cursor)?, 2);

        // the blank terminator is consumed, the first hit line is not
        assert_eq!(cursor.next_line()?.as_deref(), Some("No 1"));
        Ok(())
    }

    #[test]
    fn test_empty_table_at_eof() -> Result<()> {
        let mut cursor = Cursor::new(&b""[..]);
        assert_eq!(read_summary(&mut cursor)?, 0);
        Ok(())
    }

    #[test]
    fn test_malformed_row() {
        let mut cursor = Cursor::new(&b"  1 too short\n"[..]);
        assert!(read_summary(&mut cursor).is_err());
    }
}

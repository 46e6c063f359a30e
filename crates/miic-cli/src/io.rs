//! File formats at the CLI boundary.
//!
//! - Data: comma-separated, header row of variable names, one row per
//!   sample. Fields may be wrapped in double quotes.
//! - Adjacency: labelled square matrix. The header row starts with an empty
//!   cell followed by the variable names; every following row starts with
//!   its variable name followed by one five-code cell per column.
//! - Seed values: JSON array of `{"x", "y", "conditioning", "value"}`.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use miic_core::{AdjacencyMatrix, SearchError, SeedValue};

/// Split one CSV line into trimmed, unquoted fields.
///
/// Commas inside double quotes do not split; `""` inside quotes is a literal
/// quote.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(ch),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Parse CSV text into a header and records. Blank lines are skipped.
///
/// # Errors
///
/// Fails when the text has no header line.
pub fn parse_csv(text: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut lines = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());

    let Some(header) = lines.next() else {
        bail!("file is empty");
    };
    let header = split_fields(header);
    let records = lines.map(split_fields).collect();
    Ok((header, records))
}

/// Read a data CSV.
///
/// # Errors
///
/// Fails if the file cannot be read or has no header.
pub fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_csv(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse a labelled adjacency CSV into a validated matrix.
///
/// # Errors
///
/// Fails on unparsable codes, row labels that disagree with the header,
/// and every [`MalformedInput`](miic_core::MalformedInput) check.
pub fn parse_adjacency(text: &str) -> Result<AdjacencyMatrix> {
    let (header, records) = parse_csv(text)?;
    let labels: Vec<String> = header.into_iter().skip(1).collect();

    let mut rows = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let Some((label, cells)) = record.split_first() else {
            continue;
        };
        if let Some(expected) = labels.get(i) {
            if label != expected {
                bail!(
                    "row {} is labelled '{label}' but column {} is '{expected}'",
                    i + 1,
                    i + 1
                );
            }
        }
        let codes = cells
            .iter()
            .enumerate()
            .map(|(j, cell)| {
                cell.parse::<i64>().with_context(|| {
                    format!("cell ({label}, {}) is not an integer: '{cell}'", j + 1)
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(codes);
    }

    AdjacencyMatrix::from_codes(labels, &rows).map_err(|err| describe(&SearchError::from(err)))
}

/// Read a labelled adjacency CSV.
///
/// # Errors
///
/// Same as [`parse_adjacency`], plus read failures.
pub fn read_adjacency(path: &Path) -> Result<AdjacencyMatrix> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_adjacency(&text).with_context(|| format!("Invalid adjacency matrix {}", path.display()))
}

/// Write `adj` as a labelled adjacency CSV.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_adjacency(adj: &AdjacencyMatrix, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, ",{}", adj.labels().join(","))?;
    for (label, row) in adj.labels().iter().zip(adj.to_codes()) {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        writeln!(out, "{label},{}", cells.join(","))?;
    }
    Ok(())
}

/// Read precomputed information values.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a JSON array of seed values.
pub fn read_seed_values(path: &Path) -> Result<Vec<SeedValue>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Attach the stable error code to a library error.
pub fn describe(err: &SearchError) -> anyhow::Error {
    anyhow::anyhow!("[{}] {err}", err.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use miic_core::EdgeKind;

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        assert_eq!(
            split_fields(r#""a,b", c ,"say ""hi""""#),
            vec!["a,b", "c", r#"say "hi""#]
        );
    }

    #[test]
    fn csv_skips_blank_lines_and_carriage_returns() {
        let (header, rows) = parse_csv("A,B\r\n\r\n1,2\r\n3,4\n").expect("csv");
        assert_eq!(header, vec!["A", "B"]);
        assert_eq!(rows, vec![vec!["1", "2"], vec!["3", "4"]]);
        assert!(parse_csv("\n\n").is_err());
    }

    #[test]
    fn adjacency_round_trips_through_csv() {
        let text = ",A,B,C\nA,0,2,0\nB,-2,0,6\nC,0,6,0\n";
        let adj = parse_adjacency(text).expect("valid");
        assert_eq!(adj.get(0, 1), EdgeKind::ParentOf);
        assert_eq!(adj.get(1, 2), EdgeKind::Bidirected);

        let mut out = Vec::new();
        write_adjacency(&adj, &mut out).expect("write");
        assert_eq!(String::from_utf8(out).expect("utf8"), text);
    }

    #[test]
    fn adjacency_errors_carry_codes() {
        let err = parse_adjacency(",A,B\nA,0,3\nB,3,0\n").expect_err("bad code");
        assert!(err.to_string().starts_with("[E1005]"));

        let err = parse_adjacency(",A,B\nB,0,1\nA,1,0\n").expect_err("row order");
        assert!(err.to_string().contains("labelled 'B'"));

        let err = parse_adjacency(",A,B\nA,0,x\nB,1,0\n").expect_err("not a number");
        assert!(err.to_string().contains("not an integer"));
    }
}

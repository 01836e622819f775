// src/process/mod.rs
use anyhow::{anyhow, bail, Context, Result};
use csv::ReaderBuilder;
use tracing::{debug, trace};

pub mod convert;
pub mod schema;
pub mod utils;
pub mod write;

use utils::{normalise_headers, to_cell};

/// One input file held in memory, every cell still a string.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names in file order, after header normalisation.
    pub headers: Vec<String>,
    /// Each data row, exactly `headers.len()` cells; `None` is a missing value.
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Iterate one column top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows.iter().map(move |row| row[idx].as_deref())
    }

    /// Drop columns by name. Every name must exist, otherwise nothing is
    /// dropped and an error lists the missing ones.
    pub fn drop_columns(&mut self, names: &[&str]) -> Result<()> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| self.column_index(n).is_none())
            .collect();
        if !missing.is_empty() {
            bail!("columns not found: {:?}", missing);
        }

        let mut indices: Vec<usize> = names.iter().filter_map(|n| self.column_index(n)).collect();
        indices.sort_unstable();
        indices.dedup();
        for &idx in indices.iter().rev() {
            self.headers.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        Ok(())
    }

    /// Keep only the first `width` columns.
    pub fn truncate_columns(&mut self, width: usize) {
        self.headers.truncate(width);
        for row in &mut self.rows {
            row.truncate(width);
        }
    }
}

/// Parse a whole delimited file: header row first, then data rows.
/// - short rows are padded with missing values
/// - a row wider than the header is an error
/// - blank lines are skipped
#[tracing::instrument(level = "debug", skip(data), fields(bytes = data.len()))]
pub fn load_csv(data: &[u8], delimiter: u8) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // ragged rows are checked below
        .delimiter(delimiter)
        .from_reader(data);

    let mut records = rdr.records();
    let header = records
        .next()
        .ok_or_else(|| anyhow!("no columns to parse: file is empty"))?
        .context("CSV parse error in header row")?;
    let headers = normalise_headers(header.iter());
    let width = headers.len();
    trace!(?headers, "parsed header");

    let mut rows = Vec::new();
    for (idx, result) in records.enumerate() {
        // record numbers count the header as record 1
        let record_no = idx + 2;
        let record =
            result.with_context(|| format!("CSV parse error at record {}", record_no))?;
        if record.len() > width {
            bail!(
                "record {} has {} fields, header has {}",
                record_no,
                record.len(),
                width
            );
        }
        let mut row: Vec<Option<String>> = record.iter().map(to_cell).collect();
        row.resize(width, None);
        rows.push(row);
    }

    debug!(rows = rows.len(), columns = width, "loaded CSV");
    Ok(RawTable { headers, rows })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a table from string literals; `""` means missing.
    pub(crate) fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| to_cell(c)).collect())
                .collect(),
        }
    }

    #[test]
    fn test_load_sellers_sample() -> Result<()> {
        let content = "seller_id,seller_zip_code_prefix,seller_city,seller_state
3442f8959a84dea7ee197c632cb2df15,13023,campinas,SP
d1b65fc7debc3361ea86b5f14c68d2e2,13844,mogi guacu,SP
";
        let t = load_csv(content.as_bytes(), b',')?;
        assert_eq!(
            t.headers,
            vec![
                "seller_id",
                "seller_zip_code_prefix",
                "seller_city",
                "seller_state"
            ]
        );
        assert_eq!(t.num_rows(), 2);
        assert_eq!(t.rows[1][2].as_deref(), Some("mogi guacu"));
        Ok(())
    }

    #[test]
    fn test_quoted_fields_and_padding() -> Result<()> {
        let content = "a,b,c\n\"x, with comma\",1\n\n\"multi\nline\",,3\n";
        let t = load_csv(content.as_bytes(), b',')?;
        assert_eq!(t.num_rows(), 2);
        assert_eq!(
            t.rows[0],
            vec![Some("x, with comma".to_string()), Some("1".to_string()), None]
        );
        assert_eq!(
            t.rows[1],
            vec![Some("multi\nline".to_string()), None, Some("3".to_string())]
        );
        Ok(())
    }

    #[test]
    fn test_trailing_blank_headers_become_unnamed() -> Result<()> {
        let content = "review_id,order_id,review_score,,\nr1,o1,5,,\nr2,o2,4,x,y\n";
        let t = load_csv(content.as_bytes(), b',')?;
        assert_eq!(t.headers[3], "Unnamed: 3");
        assert_eq!(t.headers[4], "Unnamed: 4");
        assert_eq!(t.rows[0][3], None);
        assert_eq!(t.rows[1][4].as_deref(), Some("y"));
        Ok(())
    }

    #[test]
    fn test_wide_row_is_fatal() {
        let content = "a,b\n1,2\n1,2,3\n";
        let err = load_csv(content.as_bytes(), b',').unwrap_err();
        assert!(err.to_string().contains("record 3"), "{err}");
    }

    #[test]
    fn test_empty_file_is_fatal() {
        assert!(load_csv(b"", b',').is_err());
    }

    #[test]
    fn test_custom_delimiter() -> Result<()> {
        let t = load_csv(b"a;b\n1;2\n", b';')?;
        assert_eq!(t.headers, vec!["a", "b"]);
        assert_eq!(t.rows[0][1].as_deref(), Some("2"));
        Ok(())
    }

    #[test]
    fn test_drop_and_truncate() -> Result<()> {
        let mut t = table(&["a", "b", "c", "d"], &[&["1", "2", "3", "4"]]);
        assert!(t.drop_columns(&["b", "zz"]).is_err());
        assert_eq!(t.num_columns(), 4, "failed drop must not touch the table");

        t.drop_columns(&["d", "b"])?;
        assert_eq!(t.headers, vec!["a", "c"]);
        assert_eq!(t.rows[0], vec![Some("1".to_string()), Some("3".to_string())]);

        t.truncate_columns(1);
        assert_eq!(t.headers, vec!["a"]);
        assert_eq!(t.rows[0].len(), 1);
        Ok(())
    }
}

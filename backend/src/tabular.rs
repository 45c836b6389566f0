//! String tables read from and written to delimited files, and the joins the
//! enrichment stages run on them.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::types::ExtractedRecord;

pub const RECORD_COLUMNS: [&str; 7] = [
    "id",
    "headword",
    "subcategorisation",
    "cross_reference_style",
    "see_also_target",
    "translation_groups",
    "sense_groups",
];

/// Column of a plain word list.
pub const WORD_COLUMN: &str = "word";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("no such column: {0}")]
    MissingColumn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Tab for `.tsv` and `.txt`, comma for anything else.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
        Some(ext) if ext == "tsv" || ext == "txt" => b'\t',
        _ => b',',
    }
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table { headers, rows: Vec::new() }
    }

    /// One row per record, absent values as empty cells and groups flattened.
    pub fn from_records(records: &[ExtractedRecord]) -> Self {
        let mut table = Table::new(RECORD_COLUMNS.iter().map(|s| s.to_string()).collect());
        for r in records {
            table.rows.push(vec![
                r.id.clone(),
                r.headword.clone().unwrap_or_default(),
                r.subcategorisation.clone().unwrap_or_default(),
                r.cross_reference_style.clone().unwrap_or_default(),
                r.see_also_target.clone().unwrap_or_default(),
                r.flattened_translations(),
                r.flattened_senses(),
            ]);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
    }

    /// Adds an empty column unless it exists. Returns its index.
    pub fn add_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in self.rows.iter_mut() {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Appends a row, padded or cut to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// A table with only the named columns, in the given order.
    pub fn select_columns(&self, columns: &[&str]) -> Result<Table, TableError> {
        let indexes = columns.iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<usize>, TableError>>()?;

        Ok(Table {
            headers: columns.iter().map(|c| c.to_string()).collect(),
            rows: self.rows.iter()
                .map(|row| indexes.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    pub fn left_join(&self, left_key: &str, right: &Table, right_key: &str) -> Result<Table, TableError> {
        self.join(left_key, right, right_key, JoinKind::Left)
    }

    pub fn inner_join(&self, left_key: &str, right: &Table, right_key: &str) -> Result<Table, TableError> {
        self.join(left_key, right, right_key, JoinKind::Inner)
    }

    /// Key join in the manner of a pandas merge.
    ///
    /// Left rows keep their order, each followed by its matches in right
    /// order. When both keys have the same name the right key column is
    /// dropped. Other column names present on both sides get `_x` and `_y`
    /// suffixes. Empty keys never match.
    pub fn join(&self, left_key: &str, right: &Table, right_key: &str, kind: JoinKind) -> Result<Table, TableError> {
        let left_col = self.require_column(left_key)?;
        let right_col = right.require_column(right_key)?;
        let shared_key = left_key == right_key;

        let right_cols: Vec<usize> = (0..right.headers.len())
            .filter(|&i| !(shared_key && i == right_col))
            .collect();

        let left_names: HashSet<&str> = self.headers.iter().map(|s| s.as_str()).collect();
        let right_names: HashSet<&str> = right_cols.iter().map(|&i| right.headers[i].as_str()).collect();

        let mut headers: Vec<String> = self.headers.iter()
            .map(|h| {
                if right_names.contains(h.as_str()) {
                    format!("{}_x", h)
                } else {
                    h.clone()
                }
            })
            .collect();
        headers.extend(right_cols.iter().map(|&i| {
            let h = &right.headers[i];
            if left_names.contains(h.as_str()) {
                format!("{}_y", h)
            } else {
                h.clone()
            }
        }));

        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            let key = row[right_col].as_str();
            if !key.is_empty() {
                index.entry(key).or_default().push(i);
            }
        }

        let mut joined = Table::new(headers);
        for left_row in &self.rows {
            let matches = index.get(left_row[left_col].as_str());
            match matches {
                Some(right_rows) => {
                    for &ri in right_rows {
                        let mut row = left_row.clone();
                        row.extend(right_cols.iter().map(|&i| right.rows[ri][i].clone()));
                        joined.rows.push(row);
                    }
                }
                None if kind == JoinKind::Left => {
                    let mut row = left_row.clone();
                    row.resize(joined.headers.len(), String::new());
                    joined.rows.push(row);
                }
                None => {}
            }
        }

        Ok(joined)
    }

    /// Reads a delimited file with a header row.
    pub fn read_delimited(path: &Path) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter_for(path))
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {:?}", path))?;

        let headers: Vec<String> = reader.headers()
            .with_context(|| format!("Failed to read headers of {:?}", path))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut table = Table::new(headers);
        for (i, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Failed to read row {} of {:?}", i + 1, path))?;
            table.push_row(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(table)
    }

    /// Reads a headerless list with one word per line into a `word` column.
    pub fn read_word_list(path: &Path) -> Result<Table> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read word list {:?}", path))?;

        let mut table = Table::new(vec![WORD_COLUMN.to_string()]);
        for line in content.lines() {
            let word = line.trim();
            if !word.is_empty() {
                table.rows.push(vec![word.to_string()]);
            }
        }
        Ok(table)
    }

    pub fn write_delimited(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter_for(path))
            .from_path(path)
            .with_context(|| format!("Failed to create {:?}", path))?;

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()
            .with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }
}

/// Writes the records as JSON, keeping absent fields and group boundaries.
pub fn write_records_json(records: &[ExtractedRecord], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records)
        .context("Failed to serialize records")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_from_records_flattens_and_blanks_absent_values() {
        let mut r = ExtractedRecord::new("SURU_1");
        r.headword = Some("koira".to_string());
        r.translation_groups = vec![vec!["a".to_string()], vec!["b".to_string()]];

        let t = Table::from_records(&[r]);
        assert_eq!(t.headers, RECORD_COLUMNS.to_vec());
        assert_eq!(t.rows[0], vec!["SURU_1", "koira", "", "", "", "a; b", ""]);
    }

    #[test]
    fn test_left_join_keeps_unmatched_rows_in_order() {
        let suru = table(&["id", "headword"], &[&["1", "kissa"], &["2", "xyz"], &["3", "koira"]]);
        let words = table(&["Hakusana", "Sanaluokka"], &[&["koira", "substantiivi"], &["kissa", "substantiivi"]]);

        let joined = suru.left_join("headword", &words, "Hakusana").unwrap();
        assert_eq!(joined.headers, vec!["id", "headword", "Hakusana", "Sanaluokka"]);
        assert_eq!(joined.rows, vec![
            vec!["1", "kissa", "kissa", "substantiivi"],
            vec!["2", "xyz", "", ""],
            vec!["3", "koira", "koira", "substantiivi"],
        ]);
    }

    #[test]
    fn test_inner_join_drops_unmatched_and_repeats_multiple_matches() {
        let left = table(&["headword"], &[&["a"], &["b"]]);
        let right = table(&["word"], &[&["b"], &["b"], &["c"]]);

        let joined = left.inner_join("headword", &right, "word").unwrap();
        assert_eq!(joined.rows, vec![vec!["b", "b"], vec!["b", "b"]]);
    }

    #[test]
    fn test_same_key_name_is_kept_once_and_collisions_are_suffixed() {
        let left = table(&["k", "v"], &[&["1", "l"]]);
        let right = table(&["k", "v"], &[&["1", "r"]]);

        let joined = left.inner_join("k", &right, "k").unwrap();
        assert_eq!(joined.headers, vec!["k", "v_x", "v_y"]);
        assert_eq!(joined.rows, vec![vec!["1", "l", "r"]]);
    }

    #[test]
    fn test_empty_keys_do_not_match() {
        let left = table(&["headword"], &[&[""]]);
        let right = table(&["word"], &[&[""]]);
        assert!(left.inner_join("headword", &right, "word").unwrap().is_empty());
    }

    #[test]
    fn test_missing_join_column() {
        let left = table(&["headword"], &[]);
        let right = table(&["word"], &[]);
        assert_eq!(
            left.inner_join("nope", &right, "word"),
            Err(TableError::MissingColumn("nope".to_string()))
        );
    }

    #[test]
    fn test_add_column() {
        let mut t = table(&["a"], &[&["1"], &["2"]]);
        assert_eq!(t.add_column("b"), 1);
        assert_eq!(t.add_column("b"), 1);
        assert_eq!(t.headers, vec!["a", "b"]);
        assert_eq!(t.get(1, "b"), Some(""));
        assert_eq!(t.get(1, "a"), Some("2"));
    }

    #[test]
    fn test_select_columns() {
        let t = table(&["Label", "Searches", "Other"], &[&["koira", "10", "z"]]);
        let s = t.select_columns(&["Label", "Searches"]).unwrap();
        assert_eq!(s.headers, vec!["Label", "Searches"]);
        assert_eq!(s.rows, vec![vec!["koira", "10"]]);
    }

    #[test]
    fn test_delimited_round_trip_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let t = table(&["id", "translation_groups"], &[&["1", "a; b, c"], &["2", ""]]);

        for name in ["out.tsv", "out.csv"] {
            let path = dir.path().join(name);
            t.write_delimited(&path).unwrap();
            assert_eq!(Table::read_delimited(&path).unwrap(), t);
        }

        let tsv = std::fs::read_to_string(dir.path().join("out.tsv")).unwrap();
        assert!(tsv.starts_with("id\ttranslation_groups\n"));
    }

    #[test]
    fn test_read_word_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "kissa\n\n koira \n").unwrap();

        let t = Table::read_word_list(&path).unwrap();
        assert_eq!(t.headers, vec![WORD_COLUMN]);
        assert_eq!(t.rows, vec![vec!["kissa"], vec!["koira"]]);
    }

    #[test]
    fn test_records_json_keeps_nulls_and_groups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let mut r = ExtractedRecord::new("SURU_1");
        r.sense_groups = vec![vec!["x".to_string()]];

        write_records_json(&[r.clone()], &path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"headword\": null"));
        let back: Vec<ExtractedRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![r]);
    }
}

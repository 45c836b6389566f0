use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::helpers::join_groups;

/// The flat projection of one `DictionaryEntry`.
///
/// Absent optional values stay `None` until the export boundary, and the
/// group fields keep their block/group structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub id: String,
    pub headword: Option<String>,
    pub subcategorisation: Option<String>,
    /// The `style` of a `SeeAlso` inside `HeadwordCtn`, the "ks" marker.
    pub cross_reference_style: Option<String>,
    pub see_also_target: Option<String>,
    pub translation_groups: Vec<Vec<String>>,
    pub sense_groups: Vec<Vec<String>>,
}

impl ExtractedRecord {
    pub fn new(id: impl Into<String>) -> Self {
        ExtractedRecord {
            id: id.into(),
            headword: None,
            subcategorisation: None,
            cross_reference_style: None,
            see_also_target: None,
            translation_groups: Vec::new(),
            sense_groups: Vec::new(),
        }
    }

    pub fn flattened_translations(&self) -> String {
        join_groups(&self.translation_groups)
    }

    pub fn flattened_senses(&self) -> String {
        join_groups(&self.sense_groups)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// Malformed XML.
    Parse,
    /// Reading or decoding the file.
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailureKind::Parse => write!(f, "parse error"),
            FailureKind::Unexpected => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file_name: String,
    pub kind: FailureKind,
    pub message: String,
}

/// An entry that was left out of the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub file_name: String,
    /// 1-based position among the file's `DictionaryEntry` elements.
    pub position: usize,
    pub message: String,
}

/// Totals reported at the end of a corpus run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusSummary {
    pub files_total: usize,
    pub files_processed: usize,
    pub failures: Vec<FileFailure>,
    pub skipped_entries: Vec<SkippedEntry>,
    /// Entry counts of the successfully parsed files, in processing order.
    pub file_entry_counts: Vec<(String, usize)>,
    pub entries_extracted: usize,
    pub duplicate_ids: usize,
    pub with_cross_reference_style: usize,
    pub with_see_also_target: usize,
    pub with_translation_groups: usize,
    pub with_sense_groups: usize,
}

impl CorpusSummary {
    /// Files that contributed nothing because of a parse or read failure.
    pub fn files_failed(&self) -> usize {
        self.failures.len()
    }

    pub fn entries_skipped(&self) -> usize {
        self.skipped_entries.len()
    }

    pub fn count_record(&mut self, record: &ExtractedRecord) {
        self.entries_extracted += 1;
        if record.cross_reference_style.is_some() {
            self.with_cross_reference_style += 1;
        }
        if record.see_also_target.is_some() {
            self.with_see_also_target += 1;
        }
        if !record.translation_groups.is_empty() {
            self.with_translation_groups += 1;
        }
        if !record.sense_groups.is_empty() {
            self.with_sense_groups += 1;
        }
    }
}

impl fmt::Display for CorpusSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Files found: {}", self.files_total)?;
        writeln!(f, "Files processed: {}", self.files_processed)?;
        writeln!(f, "Files failed: {}", self.files_failed())?;
        writeln!(f, "Entries extracted: {}", self.entries_extracted)?;
        if !self.skipped_entries.is_empty() {
            writeln!(f, "Entries skipped: {}", self.skipped_entries.len())?;
        }
        if self.duplicate_ids > 0 {
            writeln!(f, "Duplicate ids: {}", self.duplicate_ids)?;
        }
        writeln!(f, "Entries with cross-reference style: {}", self.with_cross_reference_style)?;
        writeln!(f, "Entries with see-also target: {}", self.with_see_also_target)?;
        writeln!(f, "Entries with translations: {}", self.with_translation_groups)?;
        write!(f, "Entries with sense groups: {}", self.with_sense_groups)?;
        for failure in &self.failures {
            write!(f, "\n  {} ({}): {}", failure.file_name, failure.kind, failure.message)?;
        }
        for skipped in &self.skipped_entries {
            write!(f, "\n  {} entry #{}: {}", skipped.file_name, skipped.position, skipped.message)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Source directory not found: {0:?}")]
    SourceDirNotFound(PathBuf),
    #[error("Can't list source directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

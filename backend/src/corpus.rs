//! Corpus-wide extraction over a directory of dictionary XML files.
//!
//! Files are processed one at a time in sorted order. A file that can't be
//! read or parsed is recorded in the summary and skipped; only a missing
//! source directory stops the run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::encoding::read_xml_file;
use crate::entry_extractor::{extract_entry, find_entries};
use crate::logger;
use crate::pretty_xml::save_xml_pretty;
use crate::tag_structure::TagStructure;
use crate::types::{CorpusError, CorpusSummary, ExtractedRecord, FailureKind, FileFailure, SkippedEntry};
use crate::xml_tree::parse_xml;

/// Everything a run produces.
#[derive(Debug, Clone, Default)]
pub struct CorpusRun {
    pub summary: CorpusSummary,
    pub records: Vec<ExtractedRecord>,
    pub template: TagStructure,
    seen_ids: HashSet<String>,
}

impl CorpusRun {
    pub fn new() -> Self {
        CorpusRun::default()
    }

    fn add_record(&mut self, record: ExtractedRecord) {
        if !self.seen_ids.insert(record.id.clone()) {
            logger::warn(&format!("Duplicate entry id: {}", record.id));
            self.summary.duplicate_ids += 1;
        }
        self.summary.count_record(&record);
        self.records.push(record);
    }

    fn add_failure(&mut self, file_name: &str, kind: FailureKind, message: String) {
        logger::error(&format!("Error processing {}: {}", file_name, message));
        self.summary.failures.push(FileFailure {
            file_name: file_name.to_string(),
            kind,
            message,
        });
    }
}

pub struct CorpusAggregator {
    pretty_output_dir: Option<PathBuf>,
}

impl Default for CorpusAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusAggregator {
    pub fn new() -> Self {
        Self { pretty_output_dir: None }
    }

    /// Also write a pretty-printed copy of every parsed file into `dir`.
    pub fn with_pretty_output(mut self, dir: PathBuf) -> Self {
        self.pretty_output_dir = Some(dir);
        self
    }

    pub fn run(&self, source_dir: &Path) -> Result<CorpusRun, CorpusError> {
        let files = list_xml_files(source_dir)?;

        if files.is_empty() {
            logger::warn(&format!("No XML files found in {:?}", source_dir));
        }
        if let Some(dir) = &self.pretty_output_dir {
            logger::info(&format!("Prettified xml files will be saved in: {:?}", dir));
        }

        let mut run = CorpusRun::new();
        run.summary.files_total = files.len();

        for path in &files {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            match read_xml_file(path) {
                Ok(content) => self.process_content(&file_name, &content, &mut run),
                Err(e) => run.add_failure(&file_name, FailureKind::Unexpected, format!("{:#}", e)),
            }
        }

        logger::info(&format!(
            "Total DictionaryEntry items: {} in {} files",
            run.summary.entries_extracted, run.summary.files_total
        ));

        Ok(run)
    }

    /// Parses one file's content and folds its entries into `run`.
    pub fn process_content(&self, file_name: &str, content: &str, run: &mut CorpusRun) {
        let root = match parse_xml(content) {
            Ok(root) => root,
            Err(e) => {
                run.add_failure(file_name, FailureKind::Parse, e.to_string());
                return;
            }
        };

        let mut entry_count = 0;
        for (idx, entry) in find_entries(&root).enumerate() {
            entry_count += 1;
            match extract_entry(entry) {
                Ok(record) => {
                    run.template.merge_from(TagStructure::collect(entry));
                    run.add_record(record);
                }
                Err(e) => {
                    logger::error(&format!("Skipping entry #{} in {}: {}", idx + 1, file_name, e));
                    run.summary.skipped_entries.push(SkippedEntry {
                        file_name: file_name.to_string(),
                        position: idx + 1,
                        message: e.to_string(),
                    });
                }
            }
        }

        logger::info(&format!("{}, DictionaryEntry tags: {}", file_name, entry_count));
        run.summary.files_processed += 1;
        run.summary.file_entry_counts.push((file_name.to_string(), entry_count));

        if let Some(dir) = &self.pretty_output_dir {
            if let Err(e) = save_xml_pretty(&root, file_name, dir) {
                logger::error(&format!("Failed to write pretty XML for {}: {:#}", file_name, e));
            }
        }
    }
}

/// The `*.xml` files directly in `dir`, sorted by file name.
pub fn list_xml_files(dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    if !dir.is_dir() {
        return Err(CorpusError::SourceDirNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| CorpusError::ReadDir { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "xml") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();

    Ok(files)
}

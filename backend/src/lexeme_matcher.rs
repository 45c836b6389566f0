//! Enriches a filtered dictionary table with the Wikidata lexemes and items
//! its words correspond to.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use crate::helpers::split_items;
use crate::logger;
use crate::tabular::Table;
use crate::wikidata::{ItemMatch, LexemeLookup, LexemeMatch, WikidataError, FINNISH, SWEDISH};

pub const COL_HEADWORD: &str = "headword";
/// Word class from the modern Finnish word list.
pub const COL_CATEGORY: &str = "Sanaluokka";
pub const COL_TRANSLATIONS: &str = "translation_groups";

pub const COL_LFI_VALUE: &str = "Lfi_value";
pub const COL_LFI_URL: &str = "Lfi_url";
pub const COL_P5137: &str = "p5137";
pub const COL_OBJECT: &str = "object";
pub const COL_LSV: &str = "Lsv";
pub const COL_SV_OBJECTS: &str = "sv_objects";

pub const ADDED_COLUMNS: [&str; 6] = [COL_LFI_VALUE, COL_LFI_URL, COL_P5137, COL_OBJECT, COL_LSV, COL_SV_OBJECTS];

/// What Wikidata has for one table row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowEnrichment {
    pub lexeme: Option<LexemeMatch>,
    pub item: Option<ItemMatch>,
    pub sv_lexemes: Vec<LexemeMatch>,
    pub sv_items: Vec<ItemMatch>,
}

impl RowEnrichment {
    /// Cell values in `ADDED_COLUMNS` order.
    pub fn cells(&self) -> [String; 6] {
        let (lfi_value, lfi_url, p5137) = match &self.lexeme {
            Some(m) => (m.word.clone(), m.url.clone(), m.p5137.clone().unwrap_or_default()),
            None => (String::new(), String::new(), String::new()),
        };

        let object = self.item.as_ref()
            .map(|i| format!("{};{}", i.id, i.label))
            .unwrap_or_default();

        let lsv: Vec<[String; 3]> = self.sv_lexemes.iter()
            .map(|m| [m.word.clone(), m.url.clone(), m.p5137.clone().unwrap_or_default()])
            .collect();
        let sv_objects: Vec<[String; 2]> = self.sv_items.iter()
            .map(|i| [i.id.clone(), i.label.clone()])
            .collect();

        [
            lfi_value,
            lfi_url,
            p5137,
            object,
            json!(lsv).to_string(),
            json!(sv_objects).to_string(),
        ]
    }
}

/// Looks up one word and its Swedish translations.
pub fn enrich_word<L: LexemeLookup + ?Sized>(
    lookup: &L,
    headword: &str,
    category: &str,
    translations: &[String],
) -> Result<RowEnrichment, WikidataError> {
    let mut enrichment = RowEnrichment {
        lexeme: lookup.search_lexeme(headword, category, FINNISH.code, FINNISH.code)?,
        item: lookup.search_item(headword, FINNISH.code, FINNISH.code)?,
        ..Default::default()
    };

    for translation in translations {
        if let Some(m) = lookup.search_lexeme(translation, category, SWEDISH.code, FINNISH.code)? {
            enrichment.sv_lexemes.push(m);
        }
        if let Some(i) = lookup.search_item(translation, SWEDISH.code, FINNISH.code)? {
            enrichment.sv_items.push(i);
        }
    }

    Ok(enrichment)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub rows: usize,
    pub lexemes_found: usize,
    pub items_found: usize,
    pub failed_rows: usize,
    pub checkpoints_written: usize,
}

pub struct LexemeMatcher<'a, L: LexemeLookup + ?Sized> {
    lookup: &'a L,
    checkpoint_interval: usize,
    checkpoint_path: Option<PathBuf>,
}

impl<'a, L: LexemeLookup + ?Sized> LexemeMatcher<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        LexemeMatcher {
            lookup,
            checkpoint_interval: 50,
            checkpoint_path: None,
        }
    }

    /// Write the partially enriched table to `path` every `interval` rows.
    pub fn with_checkpoint(mut self, path: PathBuf, interval: usize) -> Self {
        self.checkpoint_path = Some(path);
        self.checkpoint_interval = interval.max(1);
        self
    }

    /// Adds the Wikidata columns to `table` and fills them row by row.
    ///
    /// A row whose lookups fail is logged and left with empty cells.
    pub fn match_table<F>(&self, table: &mut Table, mut on_row: F) -> Result<MatchStats>
    where
        F: FnMut(usize, usize),
    {
        let headword_col = table.column_index(COL_HEADWORD)
            .with_context(|| format!("Column '{}' not found", COL_HEADWORD))?;
        let category_col = table.column_index(COL_CATEGORY)
            .with_context(|| format!("Column '{}' not found, run the categorize stage first", COL_CATEGORY))?;
        let translations_col = table.column_index(COL_TRANSLATIONS);

        let added: Vec<usize> = ADDED_COLUMNS.iter().map(|c| table.add_column(c)).collect();

        let total = table.len();
        let mut stats = MatchStats { rows: total, ..Default::default() };

        for idx in 0..total {
            let row = &table.rows[idx];
            let headword = row[headword_col].trim().to_string();
            let category = row[category_col].trim().to_string();
            let translations = translations_col
                .map(|c| split_items(&row[c]))
                .unwrap_or_default();

            logger::info(&format!("{} / {} Fetching L code for headword: {}", idx + 1, total, headword));

            if !headword.is_empty() {
                match enrich_word(self.lookup, &headword, &category, &translations) {
                    Ok(enrichment) => {
                        if enrichment.lexeme.is_some() {
                            stats.lexemes_found += 1;
                        }
                        if enrichment.item.is_some() {
                            stats.items_found += 1;
                        }
                        for (col, value) in added.iter().zip(enrichment.cells()) {
                            table.rows[idx][*col] = value;
                        }
                    }
                    Err(e) => {
                        logger::error(&format!("Lookup failed for {}: {}", headword, e));
                        stats.failed_rows += 1;
                    }
                }
            }

            on_row(idx + 1, total);

            if let Some(path) = &self.checkpoint_path {
                if (idx + 1) % self.checkpoint_interval == 0 {
                    table.write_delimited(path)
                        .with_context(|| format!("Failed to write checkpoint {:?}", path))?;
                    stats.checkpoints_written += 1;
                }
            }
        }

        Ok(stats)
    }
}

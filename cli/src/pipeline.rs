//! The pipeline stages behind the CLI subcommands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use suru_backend::app_settings::AppSettings;
use suru_backend::corpus::{CorpusAggregator, CorpusRun};
use suru_backend::entry_extractor::ENTRY_TAG;
use suru_backend::lexeme_creator::{add_lexeme, AddLexemeRequest};
use suru_backend::lexeme_matcher::{LexemeMatcher, COL_HEADWORD};
use suru_backend::logger;
use suru_backend::tabular::{write_records_json, Table, WORD_COLUMN};
use suru_backend::wikidata::WikidataClient;

/// Key column of the modern Finnish word list.
pub const WORD_LIST_KEY: &str = "Hakusana";
/// Key column of the search-frequency table.
pub const SEARCHES_KEY: &str = "Label";
pub const SEARCHES_COLUMNS: [&str; 2] = ["Label", "Searches"];

fn run_corpus(aggregator: CorpusAggregator, source_dir: &Path) -> Result<CorpusRun> {
    let run = aggregator.run(source_dir)
        .with_context(|| format!("Failed to process {:?}", source_dir))?;
    println!("{}", run.summary);
    Ok(run)
}

/// Pretty-printed mirror of every file plus the merged entry template.
pub fn overview(source_dir: &Path, pretty_dir: &Path, template_path: &Path) -> Result<()> {
    let aggregator = CorpusAggregator::new().with_pretty_output(pretty_dir.to_path_buf());
    let run = run_corpus(aggregator, source_dir)?;

    if let Some(parent) = template_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    fs::write(template_path, run.template.to_template_document(ENTRY_TAG))
        .with_context(|| format!("Failed to write template {:?}", template_path))?;

    logger::info(&format!("Template saved to {:?}", template_path));
    Ok(())
}

/// One row per dictionary entry, plus an optional JSON dump of the records.
pub fn extract(source_dir: &Path, output: &Path, json_output: Option<&Path>) -> Result<()> {
    let run = run_corpus(CorpusAggregator::new(), source_dir)?;

    Table::from_records(&run.records).write_delimited(output)?;
    logger::info(&format!("{} rows saved to {:?}", run.records.len(), output));

    if let Some(json_path) = json_output {
        write_records_json(&run.records, json_path)?;
        logger::info(&format!("Records saved to {:?}", json_path));
    }
    Ok(())
}

/// Left join of the dictionary table with the modern Finnish word list.
pub fn categorize(input: &Path, word_list: &Path, output: &Path) -> Result<()> {
    let suru = Table::read_delimited(input)?;
    let words = Table::read_delimited(word_list)?;

    let merged = suru.left_join(COL_HEADWORD, &words, WORD_LIST_KEY)?;
    merged.write_delimited(output)?;

    logger::info(&format!("Merged table saved to {:?}, total rows: {}", output, merged.len()));
    Ok(())
}

/// Inner joins of the categorized table with a plain word list and with a
/// search-frequency table, each written to its own file.
pub fn filter(
    input: &Path,
    word_list: &Path,
    searches: &Path,
    word_list_output: &Path,
    searches_output: &Path,
) -> Result<()> {
    let categorized = Table::read_delimited(input)?;
    let words = Table::read_word_list(word_list)?;
    let searches = Table::read_delimited(searches)?
        .select_columns(&SEARCHES_COLUMNS)?;

    let by_words = categorized.inner_join(COL_HEADWORD, &words, WORD_COLUMN)?;
    by_words.write_delimited(word_list_output)?;
    logger::info(&format!("Word list join: {} rows saved to {:?}", by_words.len(), word_list_output));

    let by_searches = categorized.inner_join(COL_HEADWORD, &searches, SEARCHES_KEY)?;
    by_searches.write_delimited(searches_output)?;
    logger::info(&format!("Searches join: {} rows saved to {:?}", by_searches.len(), searches_output));

    Ok(())
}

/// `05_x.tsv` becomes `06_x.tsv`; other names get a `_wikidata` suffix.
pub fn default_match_output(input: &Path) -> PathBuf {
    let file_name = input.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("suru.tsv");

    let new_name = match file_name.strip_prefix("05") {
        Some(rest) => format!("06{}", rest),
        None => {
            let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("suru");
            match input.extension().and_then(|e| e.to_str()) {
                Some(ext) => format!("{}_wikidata.{}", stem, ext),
                None => format!("{}_wikidata", stem),
            }
        }
    };
    input.with_file_name(new_name)
}

pub fn checkpoint_path(output: &Path) -> PathBuf {
    let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("suru");
    let ext = output.extension().and_then(|e| e.to_str()).unwrap_or("tsv");
    output.with_file_name(format!("{}_checkpoint.{}", stem, ext))
}

pub fn match_lexemes(input: &Path, output: &Path, settings: &AppSettings) -> Result<()> {
    let mut table = Table::read_delimited(input)?;
    let client = WikidataClient::new(settings.wikidata.clone())
        .context("Failed to create the Wikidata client")?;

    let checkpoint = checkpoint_path(output);
    logger::info(&format!("Checkpoint every {} rows to {:?}", settings.checkpoint_interval, checkpoint));

    let pb = ProgressBar::new(table.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let stats = LexemeMatcher::new(&client)
        .with_checkpoint(checkpoint, settings.checkpoint_interval)
        .match_table(&mut table, |done, _| pb.set_position(done as u64))?;
    pb.finish_with_message("done");

    table.write_delimited(output)?;

    println!("Rows: {}", stats.rows);
    println!("Finnish lexemes found: {}", stats.lexemes_found);
    println!("Finnish items found: {}", stats.items_found);
    println!("Rows with failed lookups: {}", stats.failed_rows);
    println!("Output saved to {:?}", output);
    Ok(())
}

pub fn create_lexeme(req: &AddLexemeRequest, settings: &AppSettings) -> Result<()> {
    let client = WikidataClient::new(settings.wikidata.clone())
        .context("Failed to create the Wikidata client")?;

    let result = add_lexeme(&client, req)
        .with_context(|| format!("Failed to add {}:{}", req.lang, req.lemma))?;

    println!("Lexeme: {} {}", result.lexeme_id, result.lexeme_url);
    println!("Created: {}, claim added: {}, sense added: {}", result.lexeme_created, result.claim_added, result.sense_added);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_match_output() {
        assert_eq!(default_match_output(Path::new("out/05_vanligaste.tsv")), PathBuf::from("out/06_vanligaste.tsv"));
        assert_eq!(default_match_output(Path::new("cat.csv")), PathBuf::from("cat_wikidata.csv"));
    }

    #[test]
    fn test_checkpoint_path() {
        assert_eq!(checkpoint_path(Path::new("out/06_x.tsv")), PathBuf::from("out/06_x_checkpoint.tsv"));
    }

    #[test]
    fn test_stages_from_xml_to_filtered_tables() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        let xml_dir = d.join("xml");
        fs::create_dir_all(&xml_dir).unwrap();
        fs::write(xml_dir.join("a.xml"), r#"<D>
            <DictionaryEntry id="SURU_1"><HeadwordCtn><Headword>haaste</Headword></HeadwordCtn>
                <TranslationBlock><TranslationCtn><Translation>utmaning</Translation></TranslationCtn></TranslationBlock>
            </DictionaryEntry>
            <DictionaryEntry id="SURU_2"><HeadwordCtn><Headword>koira</Headword></HeadwordCtn></DictionaryEntry>
        </D>"#).unwrap();

        overview(&xml_dir, &d.join("pretty"), &d.join("template.xml")).unwrap();
        assert!(d.join("pretty/a.xml").exists());
        let template = fs::read_to_string(d.join("template.xml")).unwrap();
        assert!(template.starts_with("<DictionaryEntry>\n  <HeadwordCtn>\n"));

        extract(&xml_dir, &d.join("03_suru.tsv"), Some(&d.join("03_suru.json"))).unwrap();
        assert!(d.join("03_suru.json").exists());

        fs::write(d.join("words.txt"), "Hakusana\tSanaluokka\nhaaste\tsubstantiivi\n").unwrap();
        categorize(&d.join("03_suru.tsv"), &d.join("words.txt"), &d.join("04_cat.tsv")).unwrap();
        let cat = Table::read_delimited(&d.join("04_cat.tsv")).unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.get(0, "Sanaluokka"), Some("substantiivi"));
        assert_eq!(cat.get(1, "Sanaluokka"), Some(""));

        fs::write(d.join("list.txt"), "koira\n").unwrap();
        fs::write(d.join("searches.csv"), "Label,Searches,Extra\nhaaste,12,x\n").unwrap();
        filter(
            &d.join("04_cat.tsv"),
            &d.join("list.txt"),
            &d.join("searches.csv"),
            &d.join("05_suom_lista.tsv"),
            &d.join("05_vanligaste.tsv"),
        ).unwrap();

        let by_words = Table::read_delimited(&d.join("05_suom_lista.tsv")).unwrap();
        assert_eq!(by_words.len(), 1);
        assert_eq!(by_words.get(0, "headword"), Some("koira"));

        let by_searches = Table::read_delimited(&d.join("05_vanligaste.tsv")).unwrap();
        assert_eq!(by_searches.len(), 1);
        assert_eq!(by_searches.get(0, "Searches"), Some("12"));
        assert_eq!(by_searches.column_index("Extra"), None);
    }
}

use std::fs;
use std::path::Path;

use suru_backend::corpus::CorpusAggregator;
use suru_backend::tabular::Table;
use suru_backend::types::{CorpusError, FailureKind};

const GOOD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Dictionary>
    <DictionaryEntry id="SURU_1">
        <HeadwordCtn>
            <Headword>haaste</Headword>
            <Subcategorisation>s</Subcategorisation>
        </HeadwordCtn>
        <TranslationBlock>
            <TranslationCtn><Translation>utmaning</Translation></TranslationCtn>
        </TranslationBlock>
    </DictionaryEntry>
    <DictionaryEntry id="SURU_2">
        <HeadwordCtn>
            <Headword>haastaa</Headword>
            <SeeAlso style="ks"><Ptr style="viittaus">haaste</Ptr></SeeAlso>
        </HeadwordCtn>
        <SenseGrp><TranslationCtn>utmana</TranslationCtn></SenseGrp>
    </DictionaryEntry>
    <DictionaryEntry id="SURU_3">
        <HeadwordCtn><Headword>koira</Headword></HeadwordCtn>
    </DictionaryEntry>
</Dictionary>
"#;

const BAD_XML: &str = r#"<Dictionary><DictionaryEntry id="SURU_9"><HeadwordCtn></Dictionary>"#;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_one_good_and_one_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a_good.xml", GOOD_XML);
    write(dir.path(), "b_bad.xml", BAD_XML);
    write(dir.path(), "notes.txt", "not xml");

    let run = CorpusAggregator::new().run(dir.path()).unwrap();

    assert_eq!(run.summary.files_total, 2);
    assert_eq!(run.summary.files_processed, 1);
    assert_eq!(run.summary.files_failed(), 1);
    assert_eq!(run.summary.failures[0].file_name, "b_bad.xml");
    assert_eq!(run.summary.failures[0].kind, FailureKind::Parse);

    assert_eq!(run.records.len(), 3);
    let ids: Vec<&str> = run.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["SURU_1", "SURU_2", "SURU_3"]);

    assert_eq!(run.summary.entries_extracted, 3);
    assert_eq!(run.summary.with_cross_reference_style, 1);
    assert_eq!(run.summary.with_see_also_target, 1);
    assert_eq!(run.summary.with_translation_groups, 1);
    assert_eq!(run.summary.with_sense_groups, 1);

    let summary = run.summary.to_string();
    assert!(summary.contains("b_bad.xml"));
}

#[test]
fn test_template_is_the_union_of_all_entries() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.xml", GOOD_XML);

    let run = CorpusAggregator::new().run(dir.path()).unwrap();
    let template = run.template.to_template_document("DictionaryEntry");

    let expected = "\
<DictionaryEntry>
  <HeadwordCtn>
    <Headword>
    </Headword>
    <SeeAlso>
      <Ptr>
      </Ptr>
    </SeeAlso>
    <Subcategorisation>
    </Subcategorisation>
  </HeadwordCtn>
  <SenseGrp>
    <TranslationCtn>
    </TranslationCtn>
  </SenseGrp>
  <TranslationBlock>
    <TranslationCtn>
      <Translation>
      </Translation>
    </TranslationCtn>
  </TranslationBlock>
</DictionaryEntry>
";
    assert_eq!(template, expected);
}

#[test]
fn test_template_does_not_depend_on_file_order() {
    let first = r#"<D><DictionaryEntry id="1"><A><B/></A></DictionaryEntry></D>"#;
    let second = r#"<D><DictionaryEntry id="2"><A><C/></A><E/></DictionaryEntry></D>"#;

    let dir_ab = tempfile::tempdir().unwrap();
    write(dir_ab.path(), "a.xml", first);
    write(dir_ab.path(), "b.xml", second);

    let dir_ba = tempfile::tempdir().unwrap();
    write(dir_ba.path(), "a.xml", second);
    write(dir_ba.path(), "b.xml", first);

    let run_ab = CorpusAggregator::new().run(dir_ab.path()).unwrap();
    let run_ba = CorpusAggregator::new().run(dir_ba.path()).unwrap();

    assert_eq!(run_ab.template, run_ba.template);
}

#[test]
fn test_pretty_mirror_is_written_for_parsed_files_only() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("xml");
    let pretty = dir.path().join("pretty");
    fs::create_dir_all(&source).unwrap();
    write(&source, "a_good.xml", GOOD_XML);
    write(&source, "b_bad.xml", BAD_XML);

    CorpusAggregator::new()
        .with_pretty_output(pretty.clone())
        .run(&source)
        .unwrap();

    let written = fs::read_to_string(pretty.join("a_good.xml")).unwrap();
    assert!(written.starts_with("<?xml"));
    assert!(written.contains("\n        <HeadwordCtn>\n"));
    assert!(!pretty.join("b_bad.xml").exists());
}

#[test]
fn test_utf16_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = vec![0xFF, 0xFE];
    for unit in r#"<D><DictionaryEntry id="SURU_ä"><HeadwordCtn><Headword>äiti</Headword></HeadwordCtn></DictionaryEntry></D>"#.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    fs::write(dir.path().join("u16.xml"), bytes).unwrap();

    let run = CorpusAggregator::new().run(dir.path()).unwrap();
    assert_eq!(run.records.len(), 1);
    assert_eq!(run.records[0].headword.as_deref(), Some("äiti"));
}

#[test]
fn test_missing_source_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = CorpusAggregator::new().run(&dir.path().join("missing"));
    assert!(matches!(result, Err(CorpusError::SourceDirNotFound(_))));
}

#[test]
fn test_tabular_export_of_a_run() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.xml", GOOD_XML);

    let run = CorpusAggregator::new().run(dir.path()).unwrap();
    let out = dir.path().join("suru.tsv");
    Table::from_records(&run.records).write_delimited(&out).unwrap();

    let table = Table::read_delimited(&out).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(0, "translation_groups"), Some("utmaning"));
    assert_eq!(table.get(1, "see_also_target"), Some("haaste"));
    assert_eq!(table.get(2, "subcategorisation"), Some(""));
}

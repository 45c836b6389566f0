//! Flattens one `DictionaryEntry` element into an `ExtractedRecord`.
//!
//! Missing optional structure never fails extraction, it only leaves a field
//! absent or a group list empty. The one hard requirement is the `id`
//! attribute.

use thiserror::Error;

use crate::types::ExtractedRecord;
use crate::xml_tree::XmlElement;

pub const ENTRY_TAG: &str = "DictionaryEntry";

/// Pointer style marking a real "see also" reference.
pub const SEE_ALSO_SENTINEL: &str = "viittaus";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("<{0}> has no id attribute")]
    MissingId(String),
}

pub fn extract_entry(entry: &XmlElement) -> Result<ExtractedRecord, ExtractError> {
    let id = entry.attribute("id")
        .ok_or_else(|| ExtractError::MissingId(entry.name.clone()))?;

    let mut record = ExtractedRecord::new(id);

    if let Some(headword_ctn) = entry.find_descendant("HeadwordCtn") {
        record.headword = headword_ctn.find_descendant("Headword")
            .and_then(|el| el.text());

        record.subcategorisation = headword_ctn.find_descendant("Subcategorisation")
            .and_then(|el| el.text());

        record.cross_reference_style = headword_ctn.find_child("SeeAlso")
            .map(|see_also| see_also.attribute("style").unwrap_or_default().to_string());
    }

    // Only the first pointer in the entry counts.
    if let Some(ptr) = entry.find_all_paths("SeeAlso", "Ptr").next() {
        if ptr.attribute("style") == Some(SEE_ALSO_SENTINEL) {
            record.see_also_target = ptr.text();
        }
    }

    record.translation_groups = entry.find_all_descendants("TranslationBlock")
        .map(|block| {
            block.find_all_paths("TranslationCtn", "Translation")
                .filter_map(|el| el.text())
                .collect::<Vec<String>>()
        })
        .filter(|group| !group.is_empty())
        .collect();

    // Sense groups read the text of the TranslationCtn itself.
    record.sense_groups = entry.find_all_descendants("SenseGrp")
        .map(|group| {
            group.find_all_descendants("TranslationCtn")
                .filter_map(|el| el.text())
                .collect::<Vec<String>>()
        })
        .filter(|group| !group.is_empty())
        .collect();

    Ok(record)
}

/// The `DictionaryEntry` elements below the document root, in document order.
pub fn find_entries(root: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    root.find_all_descendants(ENTRY_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml_tree::parse_xml;

    fn extract(xml: &str) -> ExtractedRecord {
        extract_entry(&parse_xml(xml).unwrap()).unwrap()
    }

    #[test]
    fn test_full_entry() {
        let record = extract(r#"
            <DictionaryEntry id="SURU_7107788c441b76dfdb12e2eb7ab5a1a2">
                <HeadwordCtn>
                    <Headword>haaste</Headword>
                    <Subcategorisation>s</Subcategorisation>
                    <SeeAlso style="ks"><Ptr style="viittaus">haastaa</Ptr></SeeAlso>
                </HeadwordCtn>
                <TranslationBlock>
                    <TranslationCtn><Translation>utmaning</Translation></TranslationCtn>
                    <TranslationCtn><Translation>kallelse</Translation></TranslationCtn>
                </TranslationBlock>
                <SenseGrp>
                    <TranslationCtn>stämning</TranslationCtn>
                </SenseGrp>
            </DictionaryEntry>"#);

        assert_eq!(record.id, "SURU_7107788c441b76dfdb12e2eb7ab5a1a2");
        assert_eq!(record.headword.as_deref(), Some("haaste"));
        assert_eq!(record.subcategorisation.as_deref(), Some("s"));
        assert_eq!(record.cross_reference_style.as_deref(), Some("ks"));
        assert_eq!(record.see_also_target.as_deref(), Some("haastaa"));
        assert_eq!(record.translation_groups, vec![vec!["utmaning", "kallelse"]]);
        assert_eq!(record.sense_groups, vec![vec!["stämning"]]);
    }

    #[test]
    fn test_id_is_verbatim() {
        let record = extract(r#"<DictionaryEntry id=" SURU_x "/>"#);
        assert_eq!(record.id, " SURU_x ");
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let el = parse_xml("<DictionaryEntry><HeadwordCtn/></DictionaryEntry>").unwrap();
        assert_eq!(extract_entry(&el), Err(ExtractError::MissingId("DictionaryEntry".to_string())));
    }

    #[test]
    fn test_no_headword_container_leaves_fields_absent() {
        let record = extract(r#"<DictionaryEntry id="a"><Headword>orpo</Headword></DictionaryEntry>"#);
        assert_eq!(record.headword, None);
        assert_eq!(record.subcategorisation, None);
        assert_eq!(record.cross_reference_style, None);
    }

    #[test]
    fn test_headword_nested_in_container() {
        let record = extract(r#"<DictionaryEntry id="a"><HeadwordCtn><Wrap><Headword>kissa</Headword></Wrap></HeadwordCtn></DictionaryEntry>"#);
        assert_eq!(record.headword.as_deref(), Some("kissa"));
    }

    #[test]
    fn test_see_also_without_style_gives_empty_style() {
        let record = extract(r#"<DictionaryEntry id="a"><HeadwordCtn><SeeAlso><Ptr>x</Ptr></SeeAlso></HeadwordCtn></DictionaryEntry>"#);
        assert_eq!(record.cross_reference_style.as_deref(), Some(""));
        assert_eq!(record.see_also_target, None);
    }

    #[test]
    fn test_pointer_with_other_style_is_not_a_target() {
        let record = extract(r#"<DictionaryEntry id="a"><SenseGrp><SeeAlso><Ptr style="vrt">koira</Ptr></SeeAlso></SenseGrp></DictionaryEntry>"#);
        assert_eq!(record.see_also_target, None);
        // SeeAlso outside HeadwordCtn is not a cross-reference style
        assert_eq!(record.cross_reference_style, None);
    }

    #[test]
    fn test_see_also_target_anywhere_in_entry() {
        let record = extract(r#"<DictionaryEntry id="a"><SenseGrp><SeeAlso><Ptr style="viittaus">koira</Ptr></SeeAlso></SenseGrp></DictionaryEntry>"#);
        assert_eq!(record.see_also_target.as_deref(), Some("koira"));
    }

    #[test]
    fn test_two_translation_blocks() {
        let record = extract(r#"
            <DictionaryEntry id="a">
                <TranslationBlock><TranslationCtn><Translation>a</Translation></TranslationCtn></TranslationBlock>
                <TranslationBlock><TranslationCtn><Translation>b</Translation></TranslationCtn></TranslationBlock>
            </DictionaryEntry>"#);
        assert_eq!(record.translation_groups, vec![vec!["a"], vec!["b"]]);
        assert_eq!(record.flattened_translations(), "a; b");
    }

    #[test]
    fn test_empty_translations_are_skipped_and_empty_blocks_dropped() {
        let record = extract(r#"
            <DictionaryEntry id="a">
                <TranslationBlock><TranslationCtn><Translation/></TranslationCtn></TranslationBlock>
                <TranslationBlock><TranslationCtn><Translation>  </Translation><Translation>b</Translation></TranslationCtn></TranslationBlock>
            </DictionaryEntry>"#);
        assert_eq!(record.translation_groups, vec![vec!["  ", "b"]]);
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let record = extract(
            "<DictionaryEntry id=\"a\"><HeadwordCtn><Headword> koira </Headword></HeadwordCtn>\
             <SenseGrp><TranslationCtn>\n  <Translation>x</Translation>\n</TranslationCtn></SenseGrp></DictionaryEntry>"
        );
        assert_eq!(record.headword.as_deref(), Some(" koira "));
        assert_eq!(record.sense_groups, vec![vec!["\n  "]]);
    }

    #[test]
    fn test_only_first_pointer_is_considered() {
        let record = extract(r#"
            <DictionaryEntry id="a">
                <HeadwordCtn><SeeAlso><Ptr style="vrt">a</Ptr></SeeAlso></HeadwordCtn>
                <SenseGrp><SeeAlso><Ptr style="viittaus">b</Ptr></SeeAlso></SenseGrp>
            </DictionaryEntry>"#);
        assert_eq!(record.see_also_target, None);

        let record = extract(r#"
            <DictionaryEntry id="a">
                <HeadwordCtn><SeeAlso><Ptr style="viittaus">a</Ptr></SeeAlso></HeadwordCtn>
                <SenseGrp><SeeAlso><Ptr style="viittaus">b</Ptr></SeeAlso></SenseGrp>
            </DictionaryEntry>"#);
        assert_eq!(record.see_also_target.as_deref(), Some("a"));
    }

    #[test]
    fn test_no_sense_groups() {
        let record = extract(r#"<DictionaryEntry id="a"><HeadwordCtn><Headword>x</Headword></HeadwordCtn></DictionaryEntry>"#);
        assert!(record.sense_groups.is_empty());
        assert_eq!(record.flattened_senses(), "");
    }

    #[test]
    fn test_sense_groups_read_container_text_not_translation() {
        let record = extract(r#"
            <DictionaryEntry id="a">
                <SenseGrp><TranslationCtn><Translation>inner</Translation></TranslationCtn></SenseGrp>
                <SenseGrp><TranslationCtn>direct</TranslationCtn></SenseGrp>
            </DictionaryEntry>"#);
        assert_eq!(record.sense_groups, vec![vec!["direct"]]);
    }

    #[test]
    fn test_find_entries() {
        let root = parse_xml(r#"<Dictionary><Part><DictionaryEntry id="1"/></Part><DictionaryEntry id="2"/></Dictionary>"#).unwrap();
        let ids: Vec<&str> = find_entries(&root).filter_map(|e| e.attribute("id")).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}

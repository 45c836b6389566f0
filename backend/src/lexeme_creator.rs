//! Publishes one dictionary word as a Wikidata lexeme.
//!
//! Re-running a request is safe: an existing lexeme is reused, the SURU id
//! claim is only added when the lexeme doesn't already carry that value, and
//! a sense is only added to a lexeme without senses.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::helpers::{non_blank, suru_id_value};
use crate::logger;
use crate::wikidata::{lexeme_url, Language, LexemeStore, LexicalCategory, Term, WikidataError, PROP_SURU_ID, SWEDISH};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLexemeRequest {
    pub lang: String,
    pub lemma: String,
    pub category: String,
    pub suru_id: Option<String>,
    pub sv_gloss: Option<String>,
    /// Item the Swedish sense refers to, `betydelse_objekt` in the query.
    pub sense_item: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddLexemeResult {
    pub lexeme_id: String,
    pub lexeme_url: String,
    pub lexeme_created: bool,
    pub claim_added: bool,
    pub sense_added: bool,
}

#[derive(Debug, Error)]
pub enum AddLexemeError {
    #[error("Unknown category for {lang} {lemma}: {category}")]
    UnknownCategory { lang: String, lemma: String, category: String },
    #[error("Empty lemma")]
    EmptyLemma,
    #[error(transparent)]
    Wikidata(#[from] WikidataError),
}

pub fn add_lexeme<S: LexemeStore + ?Sized>(store: &S, req: &AddLexemeRequest) -> Result<AddLexemeResult, AddLexemeError> {
    let lemma = non_blank(&req.lemma).ok_or(AddLexemeError::EmptyLemma)?;

    let category = LexicalCategory::from_name(&req.category)
        .ok_or_else(|| AddLexemeError::UnknownCategory {
            lang: req.lang.clone(),
            lemma: lemma.clone(),
            category: req.category.clone(),
        })?;
    let language = Language::from_code(&req.lang)?;

    let (lexeme, lexeme_created) = match store.find_lexeme(&lemma, language, category)? {
        Some(existing) => {
            logger::info(&format!("Found lexeme {} for {}:{}", existing.id, language.code, lemma));
            (existing, false)
        }
        None => {
            let created = store.create_lexeme(&lemma, language, category)?;
            logger::info(&format!("Created lexeme for {}:{}, {}, URL: {}", language.code, lemma, category.name(), lexeme_url(&created.id)));
            (created, true)
        }
    };

    let mut claim_added = false;
    if let Some(suru_id) = req.suru_id.as_deref().and_then(non_blank) {
        let value = suru_id_value(&suru_id);
        if lexeme.has_string_claim(PROP_SURU_ID, &value) {
            logger::info(&format!("{} already has {} = {}", lexeme.id, PROP_SURU_ID, value));
        } else {
            store.add_string_claim(&lexeme.id, PROP_SURU_ID, &value)?;
            logger::info(&format!("Added {} claim with value '{}' to lexeme {}", PROP_SURU_ID, value, lexeme.id));
            claim_added = true;
        }
    }

    let sv_gloss = req.sv_gloss.as_deref().and_then(non_blank);
    let sense_item = req.sense_item.as_deref().and_then(non_blank);

    let mut sense_added = false;
    match (sv_gloss, sense_item) {
        (Some(gloss), Some(item)) if lexeme.senses.is_empty() => {
            let gloss = Term { language: SWEDISH.code.to_string(), value: gloss };
            let sense_id = store.add_sense(&lexeme.id, &gloss, &item)?;
            logger::info(&format!("Added sense {} for {}:{}", sense_id, language.code, lemma));
            sense_added = true;
        }
        _ => {
            logger::info(&format!("Did not add sense for {}:{}, {}", language.code, lemma, lexeme.id));
        }
    }

    Ok(AddLexemeResult {
        lexeme_url: lexeme_url(&lexeme.id),
        lexeme_id: lexeme.id,
        lexeme_created,
        claim_added,
        sense_added,
    })
}

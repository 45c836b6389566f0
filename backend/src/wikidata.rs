//! The Wikidata API calls the pipeline makes.
//!
//! Read calls (`wbsearchentities`, `wbgetentities`) are retried with backoff
//! on transport errors. Write calls (`wbeditentity`, `wbcreateclaim`,
//! `wbladdsense`) need a bot-password login and a CSRF token, and are sent
//! once. There is no transaction across calls: a lexeme created by a
//! request that later fails stays created.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread::sleep;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::app_settings::WikidataSettings;
use crate::logger;

pub const LEXEME_URL_PREFIX: &str = "https://www.wikidata.org/wiki/Lexeme:";

/// item for this sense
pub const PROP_ITEM_FOR_SENSE: &str = "P5137";
/// SURU ID
pub const PROP_SURU_ID: &str = "P12682";

const RETRY_BASE_DELAY_MS: u64 = 500;
const RETRY_MAX_DELAY_MS: u64 = 60_000;

/// Exponential backoff for the given retry attempt, capped at one minute.
fn retry_delay_ms(attempt: u32) -> u64 {
    2u64.checked_pow(attempt)
        .and_then(|factor| RETRY_BASE_DELAY_MS.checked_mul(factor))
        .map_or(RETRY_MAX_DELAY_MS, |delay| delay.min(RETRY_MAX_DELAY_MS))
}

#[derive(Debug, Error)]
pub enum WikidataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Wikidata API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Wikidata API error {code}: {info}")]
    Api { code: String, info: String },
    #[error("Unexpected Wikidata response: {0}")]
    UnexpectedResponse(String),
    #[error("Login failed: {0}")]
    Login(String),
    #[error("WIKIDATA_USERNAME and WIKIDATA_PASSWORD must be set for edits")]
    MissingCredentials,
    #[error("Invalid item id: {0}")]
    InvalidItemId(String),
    #[error("Unknown language code: {0}")]
    UnknownLanguage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub item: &'static str,
}

pub const FINNISH: Language = Language { code: "fi", item: "Q1412" };
pub const SWEDISH: Language = Language { code: "sv", item: "Q9027" };

impl Language {
    pub fn from_code(code: &str) -> Result<Language, WikidataError> {
        match code.trim() {
            "fi" => Ok(FINNISH),
            "sv" => Ok(SWEDISH),
            other => Err(WikidataError::UnknownLanguage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LexicalCategory {
    Noun,
    Adjective,
}

impl LexicalCategory {
    pub fn from_name(name: &str) -> Option<LexicalCategory> {
        match name.trim() {
            "noun" => Some(LexicalCategory::Noun),
            "adjective" => Some(LexicalCategory::Adjective),
            _ => None,
        }
    }

    pub fn item(&self) -> &'static str {
        match self {
            LexicalCategory::Noun => "Q1084",
            LexicalCategory::Adjective => "Q34698",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LexicalCategory::Noun => "noun",
            LexicalCategory::Adjective => "adjective",
        }
    }
}

pub fn lexeme_url(lexeme_id: &str) -> String {
    format!("{}{}", LEXEME_URL_PREFIX, lexeme_id)
}

// === Response types ===

/// Wikibase serializes empty maps as `[]`.
fn map_or_empty_list<'de, D, T>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList<T> {
        Map(HashMap<String, T>),
        List(Vec<Value>),
    }

    Ok(match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(m) => m,
        MapOrList::List(_) => HashMap::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Term {
    pub language: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchDisplay {
    pub label: Option<Term>,
    pub description: Option<Term>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub concepturi: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub display: SearchDisplay,
}

impl SearchHit {
    pub fn display_label(&self) -> Option<&str> {
        self.display.label.as_ref()
            .map(|t| t.value.as_str())
            .or(self.label.as_deref())
    }

    pub fn label_language(&self) -> Option<&str> {
        self.display.label.as_ref().map(|t| t.language.as_str())
    }

    /// The lexical category part of a lexeme description such as
    /// `"suomi, substantiivi"`.
    pub fn description_category(&self) -> Option<&str> {
        self.display.description.as_ref()
            .and_then(|d| d.value.split(", ").nth(1))
    }

    /// A lexeme hit matches when label, label language and the category part
    /// of its description are all equal to the searched ones.
    pub fn matches_lexeme(&self, word: &str, category: &str, language: &str) -> bool {
        self.display_label() == Some(word)
            && self.label_language() == Some(language)
            && self.description_category() == Some(category)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataValue {
    pub value: Value,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snak {
    pub snaktype: String,
    pub property: String,
    #[serde(default)]
    pub datavalue: Option<DataValue>,
}

impl Snak {
    /// The item id of a `wikibase-entityid` value.
    pub fn entity_id(&self) -> Option<String> {
        let value = &self.datavalue.as_ref()?.value;
        if let Some(id) = value.get("id").and_then(|v| v.as_str()) {
            return Some(id.to_string());
        }
        value.get("numeric-id")
            .and_then(|v| v.as_u64())
            .map(|n| format!("Q{}", n))
    }

    pub fn string_value(&self) -> Option<&str> {
        self.datavalue.as_ref()?.value.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Statement {
    #[serde(default)]
    pub id: Option<String>,
    pub mainsnak: Snak,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sense {
    pub id: String,
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub glosses: HashMap<String, Term>,
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub claims: HashMap<String, Vec<Statement>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub lemmas: HashMap<String, Term>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, rename = "lexicalCategory")]
    pub lexical_category: Option<String>,
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub claims: HashMap<String, Vec<Statement>>,
    #[serde(default)]
    pub senses: Vec<Sense>,
    #[serde(default)]
    pub missing: Option<String>,
}

impl Entity {
    /// First `P5137` value on the first sense.
    pub fn first_sense_item(&self) -> Option<String> {
        self.senses.first()?
            .claims.get(PROP_ITEM_FOR_SENSE)?
            .first()?
            .mainsnak.entity_id()
    }

    pub fn has_string_claim(&self, property: &str, value: &str) -> bool {
        self.claims.get(property)
            .map(|statements| statements.iter().any(|s| s.mainsnak.string_value() == Some(value)))
            .unwrap_or(false)
    }

    pub fn matches_lexeme(&self, lemma: &str, language: Language, category: LexicalCategory) -> bool {
        self.lemmas.get(language.code).map(|t| t.value.as_str()) == Some(lemma)
            && self.language.as_deref() == Some(language.item)
            && self.lexical_category.as_deref() == Some(category.item())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: HashMap<String, Entity>,
}

/// A Wikidata lexeme matching a dictionary word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexemeMatch {
    pub id: String,
    pub word: String,
    pub language: String,
    pub category: String,
    pub url: String,
    /// The item of the lexeme's first sense, if any.
    pub p5137: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemMatch {
    pub id: String,
    pub label: String,
}

impl ItemMatch {
    pub fn from_hit(hit: &SearchHit) -> ItemMatch {
        ItemMatch {
            id: hit.id.clone(),
            label: hit.display_label().unwrap_or_default().to_string(),
        }
    }
}

// === Request payloads ===

pub fn new_lexeme_data(lemma: &str, language: Language, category: LexicalCategory) -> Value {
    json!({
        "lemmas": {
            language.code: { "language": language.code, "value": lemma }
        },
        "language": language.item,
        "lexicalCategory": category.item(),
        "forms": [],
        "senses": [],
    })
}

pub fn new_sense_data(gloss: &Term) -> Value {
    json!({
        "glosses": {
            gloss.language.clone(): { "language": gloss.language, "value": gloss.value }
        }
    })
}

/// The `value` of a `wbcreateclaim` pointing at an item.
pub fn item_claim_value(item_id: &str) -> Result<Value, WikidataError> {
    let numeric_id: u64 = item_id.trim()
        .strip_prefix('Q')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| WikidataError::InvalidItemId(item_id.to_string()))?;
    Ok(json!({ "entity-type": "item", "numeric-id": numeric_id }))
}

/// Maps an `{"error": {...}}` body to `WikidataError::Api`.
fn check_api_error(body: &Value) -> Result<(), WikidataError> {
    if let Some(err) = body.get("error") {
        let code = err.get("code").and_then(|v| v.as_str()).unwrap_or("unknown");
        let info = err.get("info").and_then(|v| v.as_str()).unwrap_or("");
        return Err(WikidataError::Api { code: code.to_string(), info: info.to_string() });
    }
    Ok(())
}

fn str_at<'a>(body: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut v = body;
    for key in path {
        v = v.get(key)?;
    }
    v.as_str()
}

// === Seams ===

/// Read-only lookups used when enriching the dictionary table.
pub trait LexemeLookup {
    fn search_lexeme(&self, word: &str, category: &str, language: &str, uselang: &str) -> Result<Option<LexemeMatch>, WikidataError>;
    fn search_item(&self, query: &str, language: &str, uselang: &str) -> Result<Option<ItemMatch>, WikidataError>;
}

/// The calls needed to get-or-create a lexeme and attach claims and senses.
pub trait LexemeStore {
    fn find_lexeme(&self, lemma: &str, language: Language, category: LexicalCategory) -> Result<Option<Entity>, WikidataError>;
    fn create_lexeme(&self, lemma: &str, language: Language, category: LexicalCategory) -> Result<Entity, WikidataError>;
    /// Returns the new statement id.
    fn add_string_claim(&self, entity_id: &str, property: &str, value: &str) -> Result<String, WikidataError>;
    /// Adds a sense with one gloss and a `P5137` claim. Returns the sense id.
    fn add_sense(&self, lexeme_id: &str, gloss: &Term, item_id: &str) -> Result<String, WikidataError>;
}

// === Client ===

pub struct WikidataClient {
    http: HttpClient,
    settings: WikidataSettings,
    csrf_token: Mutex<Option<String>>,
}

impl WikidataClient {
    pub fn new(settings: WikidataSettings) -> Result<Self, WikidataError> {
        let http = HttpClient::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .cookie_store(true)
            .build()?;

        Ok(WikidataClient {
            http,
            settings,
            csrf_token: Mutex::new(None),
        })
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<Value, WikidataError> {
        let mut attempt = 0;
        loop {
            let result = self.http.get(&self.settings.api_url)
                .query(params)
                .query(&[("format", "json")])
                .send();

            match result {
                Ok(response) => return read_body(response),
                Err(e) if attempt < self.settings.max_retries => {
                    let delay = retry_delay_ms(attempt);
                    logger::warn(&format!("Wikidata request failed, retrying in {} ms: {}", delay, e));
                    sleep(Duration::from_millis(delay));
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn post(&self, params: &[(&str, &str)]) -> Result<Value, WikidataError> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("format", "json"));
        let response = self.http.post(&self.settings.api_url)
            .form(&form)
            .send()?;
        read_body(response)
    }

    /// Logs in with the bot password and fetches a CSRF token.
    pub fn login(&self) -> Result<String, WikidataError> {
        let (username, password) = match (&self.settings.username, &self.settings.password) {
            (Some(u), Some(p)) => (u.as_str(), p.as_str()),
            _ => return Err(WikidataError::MissingCredentials),
        };

        let body = self.get(&[("action", "query"), ("meta", "tokens"), ("type", "login")])?;
        let login_token = str_at(&body, &["query", "tokens", "logintoken"])
            .ok_or_else(|| WikidataError::UnexpectedResponse("no login token".to_string()))?
            .to_string();

        let body = self.post(&[
            ("action", "login"),
            ("lgname", username),
            ("lgpassword", password),
            ("lgtoken", login_token.as_str()),
        ])?;
        match str_at(&body, &["login", "result"]) {
            Some("Success") => {}
            other => {
                let reason = str_at(&body, &["login", "reason"]).unwrap_or("");
                return Err(WikidataError::Login(format!("{} {}", other.unwrap_or("no result"), reason).trim().to_string()));
            }
        }
        logger::info(&format!("Logged in to Wikidata as {}", username));

        let body = self.get(&[("action", "query"), ("meta", "tokens"), ("type", "csrf")])?;
        match str_at(&body, &["query", "tokens", "csrftoken"]) {
            // The anonymous token means the session cookie was not kept
            Some("+\\") | None => Err(WikidataError::Login("no CSRF token for the session".to_string())),
            Some(token) => Ok(token.to_string()),
        }
    }

    fn token(&self) -> Result<String, WikidataError> {
        let mut guard = self.csrf_token.lock()
            .map_err(|_| WikidataError::Login("token lock poisoned".to_string()))?;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login()?;
        *guard = Some(token.clone());
        Ok(token)
    }

    fn clear_token(&self) {
        if let Ok(mut guard) = self.csrf_token.lock() {
            *guard = None;
        }
    }

    /// A write call with the session token, logging in again once if the
    /// token has expired.
    fn post_with_token(&self, params: &[(&str, &str)]) -> Result<Value, WikidataError> {
        let token = self.token()?;
        let mut with_token = params.to_vec();
        with_token.push(("token", token.as_str()));

        match self.post(&with_token) {
            Err(WikidataError::Api { code, .. }) if code == "badtoken" || code == "assertuserfailed" => {
                logger::warn("Wikidata session expired, logging in again");
                self.clear_token();
                let token = self.token()?;
                let mut with_token = params.to_vec();
                with_token.push(("token", token.as_str()));
                self.post(&with_token)
            }
            other => other,
        }
    }

    pub fn search_entities(&self, search: &str, language: &str, uselang: &str, kind: &str) -> Result<Vec<SearchHit>, WikidataError> {
        let body = self.get(&[
            ("action", "wbsearchentities"),
            ("search", search),
            ("language", language),
            ("uselang", uselang),
            ("type", kind),
        ])?;
        let response: SearchResponse = serde_json::from_value(body)
            .map_err(|e| WikidataError::UnexpectedResponse(e.to_string()))?;
        Ok(response.search)
    }

    pub fn get_entity(&self, id: &str) -> Result<Option<Entity>, WikidataError> {
        let body = self.get(&[("action", "wbgetentities"), ("ids", id)])?;
        let mut response: EntitiesResponse = serde_json::from_value(body)
            .map_err(|e| WikidataError::UnexpectedResponse(e.to_string()))?;
        Ok(response.entities.remove(id).filter(|e| e.missing.is_none()))
    }
}

fn read_body(response: reqwest::blocking::Response) -> Result<Value, WikidataError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(WikidataError::Status { status: status.as_u16(), body });
    }
    let body: Value = response.json()?;
    check_api_error(&body)?;
    Ok(body)
}

impl LexemeLookup for WikidataClient {
    fn search_lexeme(&self, word: &str, category: &str, language: &str, uselang: &str) -> Result<Option<LexemeMatch>, WikidataError> {
        let hits = self.search_entities(word, language, uselang, "lexeme")?;

        let Some(hit) = hits.iter().find(|h| h.matches_lexeme(word, category, language)) else {
            return Ok(None);
        };

        let p5137 = self.get_entity(&hit.id)?
            .and_then(|entity| entity.first_sense_item());

        Ok(Some(LexemeMatch {
            id: hit.id.clone(),
            word: word.to_string(),
            language: language.to_string(),
            category: category.to_string(),
            url: hit.concepturi.clone().unwrap_or_else(|| lexeme_url(&hit.id)),
            p5137,
        }))
    }

    fn search_item(&self, query: &str, language: &str, uselang: &str) -> Result<Option<ItemMatch>, WikidataError> {
        let hits = self.search_entities(query, language, uselang, "item")?;
        Ok(hits.first().map(ItemMatch::from_hit))
    }
}

impl LexemeStore for WikidataClient {
    fn find_lexeme(&self, lemma: &str, language: Language, category: LexicalCategory) -> Result<Option<Entity>, WikidataError> {
        let hits = self.search_entities(lemma, language.code, language.code, "lexeme")?;
        for hit in hits {
            if let Some(entity) = self.get_entity(&hit.id)? {
                if entity.matches_lexeme(lemma, language, category) {
                    return Ok(Some(entity));
                }
            }
        }
        Ok(None)
    }

    fn create_lexeme(&self, lemma: &str, language: Language, category: LexicalCategory) -> Result<Entity, WikidataError> {
        let data = new_lexeme_data(lemma, language, category).to_string();
        let summary = format!("Creating lexeme {} ({})", lemma, category.name());
        let body = self.post_with_token(&[
            ("action", "wbeditentity"),
            ("new", "lexeme"),
            ("data", data.as_str()),
            ("summary", summary.as_str()),
        ])?;

        let entity = body.get("entity").cloned()
            .ok_or_else(|| WikidataError::UnexpectedResponse("no entity in wbeditentity response".to_string()))?;
        serde_json::from_value(entity)
            .map_err(|e| WikidataError::UnexpectedResponse(e.to_string()))
    }

    fn add_string_claim(&self, entity_id: &str, property: &str, value: &str) -> Result<String, WikidataError> {
        let value = Value::String(value.to_string()).to_string();
        let body = self.post_with_token(&[
            ("action", "wbcreateclaim"),
            ("entity", entity_id),
            ("snaktype", "value"),
            ("property", property),
            ("value", value.as_str()),
        ])?;
        str_at(&body, &["claim", "id"])
            .map(|s| s.to_string())
            .ok_or_else(|| WikidataError::UnexpectedResponse("no claim in wbcreateclaim response".to_string()))
    }

    fn add_sense(&self, lexeme_id: &str, gloss: &Term, item_id: &str) -> Result<String, WikidataError> {
        let claim_value = item_claim_value(item_id)?.to_string();
        let data = new_sense_data(gloss).to_string();

        let body = self.post_with_token(&[
            ("action", "wbladdsense"),
            ("lexemeId", lexeme_id),
            ("data", data.as_str()),
        ])?;
        let sense_id = str_at(&body, &["sense", "id"])
            .ok_or_else(|| WikidataError::UnexpectedResponse("no sense in wbladdsense response".to_string()))?
            .to_string();

        self.post_with_token(&[
            ("action", "wbcreateclaim"),
            ("entity", sense_id.as_str()),
            ("snaktype", "value"),
            ("property", PROP_ITEM_FOR_SENSE),
            ("value", claim_value.as_str()),
        ])?;

        Ok(sense_id)
    }
}

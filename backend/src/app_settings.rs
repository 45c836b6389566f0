use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use serde::{Serialize, Deserialize};

pub const DEFAULT_WIKIDATA_API_URL: &str = "https://www.wikidata.org/w/api.php";
pub const DEFAULT_USER_AGENT: &str = "suru-wikidata/0.1 (https://www.wikidata.org/wiki/Wikidata:WikiProject_Lexicographical_data)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikidataSettings {
    pub api_url: String,
    pub user_agent: String,
    /// Bot-password user name, e.g. `User@botname`.
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub timeout_secs: u64,
    /// Retries for read requests on transport errors.
    pub max_retries: u32,
}

impl Default for WikidataSettings {
    fn default() -> Self {
        WikidataSettings {
            api_url: DEFAULT_WIKIDATA_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            username: None,
            password: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl WikidataSettings {
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    pub wikidata: WikidataSettings,
    pub api_address: String,
    pub api_port: u16,
    /// Rows between checkpoint writes when matching lexemes.
    pub checkpoint_interval: usize,
    pub suru_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            wikidata: WikidataSettings::default(),
            api_address: "127.0.0.1".to_string(),
            api_port: 5001,
            checkpoint_interval: 50,
            suru_dir: None,
        }
    }
}

impl AppSettings {
    /// Settings from the process environment and `.env`.
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Settings from any key lookup. Unset, empty or unparsable values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = AppSettings::default();

        if let Some(v) = get("WIKIDATA_API_URL") {
            settings.wikidata.api_url = v;
        }
        if let Some(v) = get("WIKIDATA_USER_AGENT") {
            settings.wikidata.user_agent = v;
        }
        settings.wikidata.username = get("WIKIDATA_USERNAME");
        settings.wikidata.password = get("WIKIDATA_PASSWORD");
        if let Some(v) = get("WIKIDATA_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            settings.wikidata.timeout_secs = v;
        }
        if let Some(v) = get("WIKIDATA_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            settings.wikidata.max_retries = v;
        }
        if let Some(v) = get("API_ADDRESS") {
            settings.api_address = v;
        }
        if let Some(v) = get("API_PORT").and_then(|v| v.parse().ok()) {
            settings.api_port = v;
        }
        if let Some(v) = get("CHECKPOINT_INTERVAL").and_then(|v| v.parse::<usize>().ok()) {
            settings.checkpoint_interval = v.max(1);
        }
        settings.suru_dir = get("SURU_DIR").map(PathBuf::from);

        settings
    }
}

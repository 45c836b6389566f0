pub mod types;
pub mod helpers;
pub mod logger;
pub mod app_settings;
pub mod encoding;
pub mod xml_tree;
pub mod pretty_xml;
pub mod tag_structure;
pub mod entry_extractor;
pub mod corpus;
pub mod tabular;
pub mod wikidata;
pub mod lexeme_matcher;
pub mod lexeme_creator;

use std::env;
use std::error::Error;
use std::fs::create_dir_all;
use std::path::PathBuf;

use app_dirs::{get_app_root, AppDataType, AppInfo};

pub const APP_INFO: AppInfo = AppInfo{name: "suru-wikidata", author: "suru"};

/// The directory for logs and run artifacts.
///
/// Precedence: `SURU_DIR` from the environment, then the platform user data dir.
pub fn get_create_suru_dir() -> Result<PathBuf, Box<dyn Error>> {
    let p = match env::var("SURU_DIR") {
        Ok(s) if !s.is_empty() => PathBuf::from(s),
        _ => get_app_root(AppDataType::UserData, &APP_INFO)?,
    };
    if !p.exists() {
        create_dir_all(&p)?;
    }
    Ok(p)
}

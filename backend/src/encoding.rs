// Encoding detection for the dictionary XML files.
// Decodes UTF-16 (with BOM) and UTF-8 (with or without BOM) to a UTF-8 String with LF line endings.

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_16LE, UTF_16BE, UTF_8};
use std::fs;
use std::path::Path;

use crate::logger;

/// Reads an XML file, detects encoding, and converts to UTF-8 with Unix line endings
pub fn read_xml_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read file: {:?}", path))?;

    decode_xml_bytes(&bytes, path)
}

/// Decodes raw file bytes. `path` is only used in log messages.
pub fn decode_xml_bytes(bytes: &[u8], path: &Path) -> Result<String> {
    let (encoding, bom_len) = detect_encoding(bytes);

    logger::debug(&format!(
        "File: {:?}, Encoding: {}, BOM: {}",
        path.file_name().unwrap_or_default(),
        encoding.name(),
        bom_len > 0
    ));

    let (decoded, _encoding_used, had_errors) = encoding.decode(&bytes[bom_len..]);

    if had_errors {
        anyhow::bail!("Invalid {} byte sequence in {:?}", encoding.name(), path);
    }

    Ok(decoded.replace("\r\n", "\n"))
}

/// Detects file encoding by examining the BOM (Byte Order Mark).
///
/// Returns the encoding and the length of the BOM to skip.
fn detect_encoding(bytes: &[u8]) -> (&'static Encoding, usize) {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return (UTF_16LE, 2);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return (UTF_16BE, 2);
    }
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return (UTF_8, 3);
    }
    // No BOM detected, assume UTF-8
    (UTF_8, 0)
}

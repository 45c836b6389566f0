use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    // "kissa; katt ;hund" -> kissa, katt, hund
    pub static ref RE_ITEM_SEPARATOR: Regex = Regex::new(r"\s*;\s*").unwrap();

    // SURU_7107788c441b76dfdb12e2eb7ab5a1a2
    pub static ref RE_SURU_ID_PREFIX: Regex = Regex::new(r"^SURU_").unwrap();
}

/// Separator of flattened group items in tabular exports.
pub const ITEM_SEPARATOR: &str = "; ";

/// Joins every item of every group with `"; "`. Group boundaries are lost.
pub fn join_groups(groups: &[Vec<String>]) -> String {
    groups.iter()
        .flatten()
        .map(|s| s.as_str())
        .collect::<Vec<&str>>()
        .join(ITEM_SEPARATOR)
}

/// Splits a flattened cell back into items, dropping empty ones.
pub fn split_items(cell: &str) -> Vec<String> {
    RE_ITEM_SEPARATOR.split(cell.trim())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// The external id value of a SURU entry id, without the `SURU_` prefix.
pub fn suru_id_value(suru_id: &str) -> String {
    RE_SURU_ID_PREFIX.replace(suru_id.trim(), "").to_string()
}

/// Returns `None` for whitespace-only text, the trimmed text otherwise.
pub fn non_blank(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_groups_flattens_across_groups() {
        let groups = vec![
            vec!["a".to_string()],
            vec!["b".to_string(), "c".to_string()],
        ];
        assert_eq!(join_groups(&groups), "a; b; c");
        assert_eq!(join_groups(&[]), "");
    }

    #[test]
    fn test_split_items() {
        assert_eq!(split_items("katt; hund ;räv"), vec!["katt", "hund", "räv"]);
        assert!(split_items("  ").is_empty());
        assert_eq!(split_items("katt;;hund"), vec!["katt", "hund"]);
    }

    #[test]
    fn test_suru_id_value() {
        assert_eq!(suru_id_value("SURU_7107788c441b76dfdb12e2eb7ab5a1a2"), "7107788c441b76dfdb12e2eb7ab5a1a2");
        assert_eq!(suru_id_value("abc_SURU_"), "abc_SURU_");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("\n    "), None);
        assert_eq!(non_blank(" koira "), Some("koira".to_string()));
    }
}

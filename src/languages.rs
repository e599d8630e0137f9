//! Full-text language configurations.
//!
//! A corpus language names an FTS5 tokenizer configuration. SQLite has no
//! catalog of installed tokenizers, so availability is probed by asking the
//! engine to build a throwaway index with each candidate configuration;
//! whatever the linked build accepts is what the store supports. Builds that
//! register the snowball extension gain the non-English stemmers, plain
//! bundled builds report the unicode61/porter family only.

use rusqlite::Connection;

use crate::errors::StoreError;

/// Candidate configurations, in the order they are reported.
const CANDIDATES: &[(&str, &str)] = &[
    ("english", "porter unicode61"),
    ("simple", "unicode61"),
    ("ascii", "ascii"),
    ("trigram", "trigram"),
    ("danish", "snowball danish unicode61"),
    ("dutch", "snowball dutch unicode61"),
    ("finnish", "snowball finnish unicode61"),
    ("french", "snowball french unicode61"),
    ("german", "snowball german unicode61"),
    ("italian", "snowball italian unicode61"),
    ("norwegian", "snowball norwegian unicode61"),
    ("portuguese", "snowball portuguese unicode61"),
    ("russian", "snowball russian unicode61"),
    ("spanish", "snowball spanish unicode61"),
    ("swedish", "snowball swedish unicode61"),
];

/// Lists every language configuration the engine accepts.
pub fn available_languages(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut available = Vec::new();
    for (language, tokenize) in CANDIDATES {
        if probe(conn, tokenize)? {
            available.push((*language).to_string());
        }
    }
    Ok(available)
}

/// Resolves `language` to its tokenizer configuration, verifying that the
/// engine accepts it. Unknown or unsupported languages are invalid arguments.
pub(crate) fn resolve_tokenizer(
    conn: &Connection,
    language: &str,
) -> Result<&'static str, StoreError> {
    let tokenize = CANDIDATES
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, tokenize)| *tokenize)
        .ok_or_else(|| StoreError::invalid_argument(format!("unknown language {language}")))?;
    if !probe(conn, tokenize)? {
        return Err(StoreError::invalid_argument(format!(
            "language {language} is not supported by this build"
        )));
    }
    Ok(tokenize)
}

/// Asks the engine whether it can build an index with this tokenizer.
/// The probe table lives in a savepoint so nothing persists either way.
fn probe(conn: &Connection, tokenize: &str) -> Result<bool, StoreError> {
    conn.execute_batch("SAVEPOINT language_probe")
        .map_err(|e| StoreError::query(e.to_string()))?;
    let accepted = conn
        .execute_batch(&format!(
            "CREATE VIRTUAL TABLE temp.language_probe USING fts5(t, tokenize='{tokenize}')",
        ))
        .is_ok();
    conn.execute_batch("ROLLBACK TO language_probe; RELEASE language_probe")
        .map_err(|e| StoreError::query(e.to_string()))?;
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_build_reports_builtin_tokenizers() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let langs = available_languages(&conn).expect("probe");
        assert!(langs.contains(&"english".to_string()));
        assert!(langs.contains(&"simple".to_string()));
    }

    #[test]
    fn test_unknown_language_is_invalid() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let err = resolve_tokenizer(&conn, "klingon").expect_err("unknown");
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn test_probe_leaves_no_table_behind() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        assert!(probe(&conn, "unicode61").expect("probe"));
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_temp_master WHERE name LIKE 'language_probe%'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(count, 0);
    }
}

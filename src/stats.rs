//! Planner-level cardinality estimates for corpus and dataset listings.
//!
//! Document and query counts reported here come from the statistics SQLite
//! keeps for its query planner (`sqlite_stat1`, populated by `ANALYZE`): the
//! per-corpus and per-dataset unique indexes record the average number of
//! rows per distinct leading key, which is exactly the cardinality a listing
//! wants. Callers must treat the numbers as estimates. When no statistics
//! row exists yet the estimator falls back to an exact count; that trades
//! the low-latency contract for correctness on fresh databases, where the
//! tables are small and the count is cheap anyway.

use rusqlite::{Connection, OptionalExtension, params};

use crate::{
    errors::StoreError,
    models::{Corpus, Dataset},
};

/// Lists all corpora with their dataset counts and document estimates.
pub fn list_corpora(conn: &Connection) -> Result<Vec<Corpus>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT c.id, c.name, c.language, \
             (SELECT COUNT(*) FROM datasets ds WHERE ds.corpus_id = c.id) \
             FROM corpora c ORDER BY c.name",
        )
        .map_err(|e| StoreError::query(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(|e| StoreError::query(e.to_string()))?;

    let mut corpora = Vec::new();
    for row in rows {
        let (id, name, language, num_datasets) =
            row.map_err(|e| StoreError::query(e.to_string()))?;
        let num_documents_estimate =
            match estimate_rows_per_key(conn, "documents", "idx_documents_corpus_doc")? {
                Some(estimate) => estimate,
                None => {
                    exact_count(conn, "SELECT COUNT(*) FROM documents WHERE corpus_id=?1", id)?
                }
            };
        corpora.push(Corpus {
            name,
            language,
            num_datasets,
            num_documents_estimate,
        });
    }
    Ok(corpora)
}

/// Lists a corpus's datasets with their query estimates.
pub fn list_datasets(conn: &Connection, corpus_name: &str) -> Result<Vec<Dataset>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT ds.id, ds.name, ds.min_relevance FROM datasets ds \
             JOIN corpora c ON c.id = ds.corpus_id \
             WHERE c.name = ?1 ORDER BY ds.name",
        )
        .map_err(|e| StoreError::query(e.to_string()))?;
    let rows = stmt
        .query_map(params![corpus_name], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })
        .map_err(|e| StoreError::query(e.to_string()))?;

    let mut datasets = Vec::new();
    for row in rows {
        let (id, name, min_relevance) = row.map_err(|e| StoreError::query(e.to_string()))?;
        let num_queries_estimate =
            match estimate_rows_per_key(conn, "queries", "idx_queries_dataset_query")? {
                Some(estimate) => estimate,
                None => {
                    exact_count(conn, "SELECT COUNT(*) FROM queries WHERE dataset_id=?1", id)?
                }
            };
        datasets.push(Dataset {
            name,
            corpus_name: corpus_name.to_string(),
            min_relevance,
            num_queries_estimate,
        });
    }
    Ok(datasets)
}

/// Recomputes the planner statistics the estimates are read from.
pub fn refresh_statistics(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("ANALYZE")
        .map_err(|e| StoreError::query(e.to_string()))
}

/// Average rows per distinct leading key of `index`, as recorded by the
/// planner. `None` when ANALYZE has not run yet.
fn estimate_rows_per_key(
    conn: &Connection,
    table: &str,
    index: &str,
) -> Result<Option<i64>, StoreError> {
    let stat_table_exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='sqlite_stat1'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::query(e.to_string()))?;
    if stat_table_exists == 0 {
        return Ok(None);
    }
    let stat: Option<String> = conn
        .query_row(
            "SELECT stat FROM sqlite_stat1 WHERE tbl=?1 AND idx=?2",
            params![table, index],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::query(e.to_string()))?;
    Ok(stat.as_deref().and_then(parse_rows_per_key))
}

/// The stat column reads "<rows> <rows-per-key> ..."; the second figure is
/// the average row count for one distinct value of the first indexed column.
fn parse_rows_per_key(stat: &str) -> Option<i64> {
    stat.split_whitespace().nth(1)?.parse().ok()
}

fn exact_count(conn: &Connection, sql: &str, id: i64) -> Result<i64, StoreError> {
    conn.query_row(sql, params![id], |row| row.get(0))
        .map_err(|e| StoreError::query(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::parse_rows_per_key;

    #[test]
    fn test_parses_rows_per_key_from_stat() {
        assert_eq!(parse_rows_per_key("10000 250 1"), Some(250));
        assert_eq!(parse_rows_per_key("42 7"), Some(7));
    }

    #[test]
    fn test_malformed_stat_yields_none() {
        assert_eq!(parse_rows_per_key(""), None);
        assert_eq!(parse_rows_per_key("10000"), None);
        assert_eq!(parse_rows_per_key("10000 unordered"), None);
    }
}

//! Ranked, paginated, relevance-aware lookups.
//!
//! Search runs against the per-corpus full-text shards: the total match
//! count is computed independently of the requested page, candidates are
//! merged across shards under a deterministic order (score descending,
//! document id ascending, corpus name ascending), and snippets are
//! extracted only for the rows actually returned. Listing operations report
//! a page-independent `total` the same way and evaluate each dataset's
//! `min_relevance` threshold at query time.

use std::cmp::Ordering;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter, types::Value};
use tracing::debug;

use crate::{
    errors::StoreError,
    languages,
    models::{Document, Paginated, QRel, Query, RelevantDocument, SearchHit},
    schema, snippet,
};

/// Translates a free-form web-search query into full-text match syntax.
///
/// Bare terms are all required, `"quoted phrases"` match adjacent terms,
/// `OR` separates alternatives, and a leading `-` excludes a term. Returns
/// `None` when no positive term remains (the engine cannot evaluate a
/// purely negative query, and an empty one matches nothing by contract).
pub(crate) fn to_match_query(input: &str) -> Option<String> {
    let mut positives: Vec<(String, bool)> = Vec::new();
    let mut negatives: Vec<String> = Vec::new();
    let mut or_pending = false;

    let mut rest = input.trim();
    while !rest.is_empty() {
        let negated = rest.starts_with('-');
        if negated {
            rest = &rest[1..];
        }
        let (raw, remainder) = if let Some(body) = rest.strip_prefix('"') {
            match body.find('"') {
                Some(end) => (&body[..end], &body[end + 1..]),
                None => (body, ""),
            }
        } else {
            match rest.find(char::is_whitespace) {
                Some(end) => (&rest[..end], &rest[end..]),
                None => (rest, ""),
            }
        };
        rest = remainder.trim_start();

        let term = raw.trim();
        if term.is_empty() {
            continue;
        }
        if !negated && term.eq_ignore_ascii_case("or") {
            or_pending = !positives.is_empty();
            continue;
        }
        let quoted = format!("\"{}\"", term.replace('"', "\"\""));
        if negated {
            negatives.push(quoted);
        } else {
            positives.push((quoted, or_pending));
            or_pending = false;
        }
    }

    if positives.is_empty() {
        return None;
    }
    let mut expr = String::new();
    for (i, (term, or_before)) in positives.iter().enumerate() {
        if i > 0 {
            expr.push_str(if *or_before { " OR " } else { " AND " });
        }
        expr.push_str(term);
    }
    for negative in &negatives {
        expr = format!("({expr}) NOT {negative}");
    }
    Some(expr)
}

struct Candidate {
    rowid: i64,
    doc_id: String,
    title: Option<String>,
    score: f64,
    corpus_id: i64,
    corpus_name: String,
}

/// Full-text search over documents.
///
/// `language` selects the query's tokenization rules and therefore which
/// corpora are searched: a shard indexes with its corpus language, so only
/// corpora of the requested language can evaluate the query correctly.
/// `corpus_filter` further restricts the searched corpora by name.
pub fn search_documents(
    conn: &Connection,
    query_text: &str,
    language: &str,
    corpus_filter: Option<&[&str]>,
    limit: u64,
    offset: u64,
) -> Result<Paginated<SearchHit>, StoreError> {
    languages::resolve_tokenizer(conn, language)?;
    let Some(match_query) = to_match_query(query_text) else {
        return Ok(Paginated::empty(offset));
    };
    let shards = search_shards(conn, language, corpus_filter)?;

    let mut total: u64 = 0;
    for (corpus_id, _) in &shards {
        let table = schema::document_index_table(*corpus_id);
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE {table} MATCH ?1"),
                params![match_query],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::query(e.to_string()))?;
        total += count as u64;
    }
    if limit == 0 || offset >= total {
        return Ok(Paginated {
            total,
            offset,
            items: Vec::new(),
        });
    }

    // Each shard contributes its own top slice; the global page is a
    // subset of the union of per-shard prefixes of length offset+limit.
    let fetch = offset.saturating_add(limit).min(i64::MAX as u64) as i64;
    let mut candidates: Vec<Candidate> = Vec::new();
    for (corpus_id, corpus_name) in &shards {
        let table = schema::document_index_table(*corpus_id);
        let sql = format!(
            "SELECT d.id, d.doc_id, d.title, -bm25({table}) AS score \
             FROM {table} JOIN documents d ON d.id = {table}.rowid \
             WHERE {table} MATCH ?1 \
             ORDER BY score DESC, d.doc_id ASC \
             LIMIT ?2"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![match_query, fetch], |row| {
                Ok(Candidate {
                    rowid: row.get(0)?,
                    doc_id: row.get(1)?,
                    title: row.get(2)?,
                    score: row.get(3)?,
                    corpus_id: *corpus_id,
                    corpus_name: corpus_name.clone(),
                })
            })
            .map_err(|e| StoreError::query(e.to_string()))?;
        for row in rows {
            candidates.push(row.map_err(|e| StoreError::query(e.to_string()))?);
        }
    }
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
            .then_with(|| a.corpus_name.cmp(&b.corpus_name))
    });

    let mut hits = Vec::new();
    for candidate in candidates
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
    {
        let table = schema::document_index_table(candidate.corpus_id);
        let highlighted: String = conn
            .query_row(
                &format!(
                    "SELECT highlight({table}, 0, ?2, ?3) FROM {table} \
                     WHERE {table} MATCH ?1 AND rowid = ?4"
                ),
                params![
                    match_query,
                    snippet::HIGHLIGHT_START,
                    snippet::HIGHLIGHT_END,
                    candidate.rowid,
                ],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::query(e.to_string()))?;
        hits.push(SearchHit {
            id: candidate.doc_id,
            corpus_name: candidate.corpus_name,
            title: candidate.title,
            snippet: snippet::extract_fragments(&highlighted, snippet::MAX_FRAGMENTS),
            score: candidate.score,
        });
    }
    debug!(total, returned = hits.len(), "search complete");
    Ok(Paginated {
        total,
        offset,
        items: hits,
    })
}

fn search_shards(
    conn: &Connection,
    language: &str,
    corpus_filter: Option<&[&str]>,
) -> Result<Vec<(i64, String)>, StoreError> {
    let mut sql = String::from("SELECT id, name FROM corpora WHERE language = ?1");
    let mut values: Vec<Value> = vec![Value::from(language.to_string())];
    if let Some(names) = corpus_filter {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = names
            .iter()
            .map(|name| {
                values.push(Value::from((*name).to_string()));
                format!("?{}", values.len())
            })
            .collect();
        sql.push_str(&format!(" AND name IN ({})", placeholders.join(", ")));
    }
    sql.push_str(" ORDER BY name");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::query(e.to_string()))?;
    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| StoreError::query(e.to_string()))?;
    let mut shards = Vec::new();
    for row in rows {
        shards.push(row.map_err(|e| StoreError::query(e.to_string()))?);
    }
    Ok(shards)
}

const QUERY_LISTING_FROM: &str = "FROM queries q \
    JOIN datasets ds ON ds.id = q.dataset_id \
    JOIN corpora c ON c.id = ds.corpus_id";

const QUERY_RELEVANT_COUNT: &str = "(SELECT COUNT(*) FROM qrels r \
    WHERE r.dataset_id = q.dataset_id AND r.query_id = q.query_id \
    AND r.relevance >= ds.min_relevance)";

/// Lists queries in a corpus, optionally restricted to one dataset and/or
/// full-text matched against `match_text`.
pub fn list_queries(
    conn: &Connection,
    corpus_name: &str,
    dataset_name: Option<&str>,
    match_text: Option<&str>,
    limit: Option<u64>,
    offset: u64,
) -> Result<Paginated<Query>, StoreError> {
    let mut conditions = String::from("c.name = ?1");
    let mut values: Vec<Value> = vec![Value::from(corpus_name.to_string())];
    if let Some(name) = dataset_name {
        values.push(Value::from(name.to_string()));
        conditions.push_str(&format!(" AND ds.name = ?{}", values.len()));
    }
    if let Some(text) = match_text {
        let Some(match_query) = to_match_query(text) else {
            return Ok(Paginated::empty(offset));
        };
        values.push(Value::from(match_query));
        conditions.push_str(&format!(
            " AND q.id IN (SELECT rowid FROM query_index WHERE query_index MATCH ?{})",
            values.len()
        ));
    }

    let total: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) {QUERY_LISTING_FROM} WHERE {conditions}"),
            params_from_iter(values.clone()),
            |row| row.get(0),
        )
        .map_err(|e| StoreError::query(e.to_string()))?;

    values.push(Value::from(limit.map(|l| l as i64).unwrap_or(-1)));
    let limit_param = values.len();
    values.push(Value::from(offset as i64));
    let offset_param = values.len();
    let sql = format!(
        "SELECT q.query_id, ds.name, q.text, q.description, {QUERY_RELEVANT_COUNT} \
         {QUERY_LISTING_FROM} WHERE {conditions} \
         ORDER BY ds.name, q.query_id \
         LIMIT ?{limit_param} OFFSET ?{offset_param}"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::query(e.to_string()))?;
    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok(Query {
                id: row.get(0)?,
                corpus_name: corpus_name.to_string(),
                dataset_name: row.get(1)?,
                text: row.get(2)?,
                description: row.get(3)?,
                num_relevant_documents: row.get(4)?,
            })
        })
        .map_err(|e| StoreError::query(e.to_string()))?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(|e| StoreError::query(e.to_string()))?);
    }
    Ok(Paginated {
        total: total as u64,
        offset,
        items,
    })
}

/// Point lookup of a single query with its relevant-document count.
pub fn get_query(
    conn: &Connection,
    corpus_name: &str,
    dataset_name: &str,
    query_id: &str,
) -> Result<Query, StoreError> {
    let sql = format!(
        "SELECT q.query_id, ds.name, q.text, q.description, {QUERY_RELEVANT_COUNT} \
         {QUERY_LISTING_FROM} \
         WHERE c.name = ?1 AND ds.name = ?2 AND q.query_id = ?3"
    );
    conn.query_row(&sql, params![corpus_name, dataset_name, query_id], |row| {
        Ok(Query {
            id: row.get(0)?,
            corpus_name: corpus_name.to_string(),
            dataset_name: row.get(1)?,
            text: row.get(2)?,
            description: row.get(3)?,
            num_relevant_documents: row.get(4)?,
        })
    })
    .optional()
    .map_err(|e| StoreError::query(e.to_string()))?
    .ok_or_else(|| {
        StoreError::not_found(format!(
            "query {query_id} in dataset {dataset_name} of corpus {corpus_name}"
        ))
    })
}

const DOCUMENT_RELEVANT_COUNT: &str = "(SELECT COUNT(*) FROM qrels r \
    JOIN datasets ds ON ds.id = r.dataset_id \
    WHERE r.corpus_id = d.corpus_id AND r.document_id = d.doc_id \
    AND r.relevance >= ds.min_relevance)";

/// Lists a corpus's documents with their relevant-qrel counts.
pub fn list_documents(
    conn: &Connection,
    corpus_name: &str,
    limit: Option<u64>,
    offset: u64,
) -> Result<Paginated<Document>, StoreError> {
    let total: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM documents d \
             JOIN corpora c ON c.id = d.corpus_id WHERE c.name = ?1",
            params![corpus_name],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::query(e.to_string()))?;

    let sql = format!(
        "SELECT d.doc_id, d.title, d.text, d.language, {DOCUMENT_RELEVANT_COUNT} \
         FROM documents d JOIN corpora c ON c.id = d.corpus_id \
         WHERE c.name = ?1 \
         ORDER BY d.doc_id \
         LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::query(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![corpus_name, limit.map(|l| l as i64).unwrap_or(-1), offset as i64],
            |row| {
                Ok(Document {
                    id: row.get(0)?,
                    corpus_name: corpus_name.to_string(),
                    title: row.get(1)?,
                    text: row.get(2)?,
                    language: row.get(3)?,
                    num_relevant_qrels: row.get(4)?,
                })
            },
        )
        .map_err(|e| StoreError::query(e.to_string()))?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(|e| StoreError::query(e.to_string()))?);
    }
    Ok(Paginated {
        total: total as u64,
        offset,
        items,
    })
}

/// Point lookup of a single document with its relevant-qrel count.
pub fn get_document(
    conn: &Connection,
    corpus_name: &str,
    document_id: &str,
) -> Result<Document, StoreError> {
    let sql = format!(
        "SELECT d.doc_id, d.title, d.text, d.language, {DOCUMENT_RELEVANT_COUNT} \
         FROM documents d JOIN corpora c ON c.id = d.corpus_id \
         WHERE c.name = ?1 AND d.doc_id = ?2"
    );
    conn.query_row(&sql, params![corpus_name, document_id], |row| {
        Ok(Document {
            id: row.get(0)?,
            corpus_name: corpus_name.to_string(),
            title: row.get(1)?,
            text: row.get(2)?,
            language: row.get(3)?,
            num_relevant_qrels: row.get(4)?,
        })
    })
    .optional()
    .map_err(|e| StoreError::query(e.to_string()))?
    .ok_or_else(|| {
        StoreError::not_found(format!("document {document_id} in corpus {corpus_name}"))
    })
}

/// Lists relevance judgments at or above their dataset's threshold, most
/// relevant first, hydrated with query text and document title.
pub fn list_qrels(
    conn: &Connection,
    corpus_name: &str,
    dataset_name: Option<&str>,
    query_id: Option<&str>,
    document_id: Option<&str>,
    limit: Option<u64>,
    offset: u64,
) -> Result<Paginated<QRel>, StoreError> {
    let mut conditions = String::from("c.name = ?1 AND r.relevance >= ds.min_relevance");
    let mut values: Vec<Value> = vec![Value::from(corpus_name.to_string())];
    if let Some(name) = dataset_name {
        values.push(Value::from(name.to_string()));
        conditions.push_str(&format!(" AND ds.name = ?{}", values.len()));
    }
    if let Some(id) = query_id {
        values.push(Value::from(id.to_string()));
        conditions.push_str(&format!(" AND r.query_id = ?{}", values.len()));
    }
    if let Some(id) = document_id {
        values.push(Value::from(id.to_string()));
        conditions.push_str(&format!(" AND r.document_id = ?{}", values.len()));
    }

    let from = "FROM qrels r \
        JOIN datasets ds ON ds.id = r.dataset_id \
        JOIN corpora c ON c.id = r.corpus_id \
        JOIN queries q ON q.dataset_id = r.dataset_id AND q.query_id = r.query_id \
        JOIN documents d ON d.corpus_id = r.corpus_id AND d.doc_id = r.document_id";

    let total: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) {from} WHERE {conditions}"),
            params_from_iter(values.clone()),
            |row| row.get(0),
        )
        .map_err(|e| StoreError::query(e.to_string()))?;

    values.push(Value::from(limit.map(|l| l as i64).unwrap_or(-1)));
    let limit_param = values.len();
    values.push(Value::from(offset as i64));
    let offset_param = values.len();
    let sql = format!(
        "SELECT ds.name, r.query_id, r.document_id, r.relevance, q.text, d.title \
         {from} WHERE {conditions} \
         ORDER BY r.relevance DESC, ds.name, r.query_id, r.document_id \
         LIMIT ?{limit_param} OFFSET ?{offset_param}"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::query(e.to_string()))?;
    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok(QRel {
                corpus_name: corpus_name.to_string(),
                dataset_name: row.get(0)?,
                query_id: row.get(1)?,
                document_id: row.get(2)?,
                relevance: row.get(3)?,
                query_text: row.get(4)?,
                document_title: row.get(5)?,
            })
        })
        .map_err(|e| StoreError::query(e.to_string()))?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(|e| StoreError::query(e.to_string()))?);
    }
    Ok(Paginated {
        total: total as u64,
        offset,
        items,
    })
}

/// All documents judged relevant for one query, threshold-filtered, most
/// relevant first.
pub fn relevant_documents(
    conn: &Connection,
    corpus_name: &str,
    dataset_name: &str,
    query_id: &str,
) -> Result<Vec<RelevantDocument>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT d.doc_id, d.title, d.text, r.relevance \
             FROM qrels r \
             JOIN datasets ds ON ds.id = r.dataset_id \
             JOIN corpora c ON c.id = ds.corpus_id \
             JOIN documents d ON d.corpus_id = r.corpus_id AND d.doc_id = r.document_id \
             WHERE c.name = ?1 AND ds.name = ?2 AND r.query_id = ?3 \
             AND r.relevance >= ds.min_relevance \
             ORDER BY r.relevance DESC, d.doc_id",
        )
        .map_err(|e| StoreError::query(e.to_string()))?;
    let rows = stmt
        .query_map(params![corpus_name, dataset_name, query_id], |row| {
            Ok(RelevantDocument {
                id: row.get(0)?,
                corpus_name: corpus_name.to_string(),
                title: row.get(1)?,
                text: row.get(2)?,
                query_id: query_id.to_string(),
                relevance: row.get(3)?,
            })
        })
        .map_err(|e| StoreError::query(e.to_string()))?;
    let mut documents = Vec::new();
    for row in rows {
        documents.push(row.map_err(|e| StoreError::query(e.to_string()))?);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::to_match_query;

    #[test]
    fn test_bare_terms_are_all_required() {
        assert_eq!(
            to_match_query("quick brown fox").as_deref(),
            Some(r#""quick" AND "brown" AND "fox""#)
        );
    }

    #[test]
    fn test_phrases_stay_together() {
        assert_eq!(
            to_match_query(r#""brown fox" jumps"#).as_deref(),
            Some(r#""brown fox" AND "jumps""#)
        );
    }

    #[test]
    fn test_or_separates_alternatives() {
        assert_eq!(
            to_match_query("fox OR dog").as_deref(),
            Some(r#""fox" OR "dog""#)
        );
    }

    #[test]
    fn test_negated_terms_are_excluded() {
        assert_eq!(
            to_match_query("fox -lazy").as_deref(),
            Some(r#"("fox") NOT "lazy""#)
        );
    }

    #[test]
    fn test_empty_and_purely_negative_queries_match_nothing() {
        assert_eq!(to_match_query(""), None);
        assert_eq!(to_match_query("   "), None);
        assert_eq!(to_match_query("-fox"), None);
    }

    #[test]
    fn test_dangling_or_is_dropped() {
        assert_eq!(to_match_query("or fox").as_deref(), Some(r#""fox""#));
        assert_eq!(to_match_query("fox or").as_deref(), Some(r#""fox""#));
    }

    #[test]
    fn test_unterminated_phrase_runs_to_the_end() {
        assert_eq!(
            to_match_query(r#"say "its a test"#).as_deref(),
            Some(r#""say" AND "its a test""#)
        );
    }
}

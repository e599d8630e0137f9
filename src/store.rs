//! Entity store: corpora, datasets, documents, queries, and qrels.
//!
//! Every operation here runs against the caller's transaction and never
//! commits or rolls back on its own; compose them through
//! [`Store::with_transaction`]. Bulk insertions resolve their parent entity
//! once, reuse that snapshot for every record in the batch, and reject the
//! whole batch on the first bad record, so a rolled-back unit leaves no
//! partial state.

use std::path::Path;

use ahash::AHashSet;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::{
    errors::{ConflictCode, StoreError},
    languages,
    models::{DocumentRecord, QRelRecord, QueryRecord},
    schema::{self, ensure_schema},
};

/// Handle owning the SQLite connection behind a collection store.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

pub(crate) struct CorpusRef {
    pub id: i64,
    pub language: String,
}

pub(crate) struct DatasetRef {
    pub id: i64,
    pub corpus_id: i64,
}

pub(crate) fn find_corpus(conn: &Connection, name: &str) -> Result<Option<CorpusRef>, StoreError> {
    conn.query_row(
        "SELECT id, language FROM corpora WHERE name=?1",
        params![name],
        |row| {
            Ok(CorpusRef {
                id: row.get(0)?,
                language: row.get(1)?,
            })
        },
    )
    .optional()
    .map_err(|e| StoreError::query(e.to_string()))
}

pub(crate) fn find_dataset(
    conn: &Connection,
    corpus_name: &str,
    dataset_name: &str,
) -> Result<Option<DatasetRef>, StoreError> {
    conn.query_row(
        "SELECT ds.id, ds.corpus_id FROM datasets ds \
         JOIN corpora c ON c.id = ds.corpus_id \
         WHERE c.name=?1 AND ds.name=?2",
        params![corpus_name, dataset_name],
        |row| {
            Ok(DatasetRef {
                id: row.get(0)?,
                corpus_id: row.get(1)?,
            })
        },
    )
    .optional()
    .map_err(|e| StoreError::query(e.to_string()))
}

/// Creates a corpus and its full-text shard.
///
/// The shard is built with the tokenizer for `language`, which fixes the
/// indexing rules for every document this corpus will ever hold.
pub fn create_corpus(conn: &Connection, name: &str, language: &str) -> Result<(), StoreError> {
    let tokenize = languages::resolve_tokenizer(conn, language)?;
    conn.execute(
        "INSERT INTO corpora(name, language) VALUES(?1, ?2)",
        params![name, language],
    )
    .map_err(|e| StoreError::on_write(&format!("corpus {name}"), e))?;
    let corpus_id = conn.last_insert_rowid();
    schema::create_document_index(conn, corpus_id, tokenize)?;
    info!(corpus = name, language, "created corpus");
    Ok(())
}

pub fn create_dataset(
    conn: &Connection,
    corpus_name: &str,
    name: &str,
    min_relevance: i64,
) -> Result<(), StoreError> {
    let corpus = find_corpus(conn, corpus_name)?.ok_or_else(|| {
        StoreError::conflict(format!("corpus {corpus_name}"), ConflictCode::MissingReference)
    })?;
    conn.execute(
        "INSERT INTO datasets(corpus_id, name, min_relevance) VALUES(?1, ?2, ?3)",
        params![corpus.id, name, min_relevance],
    )
    .map_err(|e| {
        StoreError::on_write(&format!("dataset {name} in corpus {corpus_name}"), e)
    })?;
    info!(corpus = corpus_name, dataset = name, min_relevance, "created dataset");
    Ok(())
}

/// Inserts a batch of documents into a corpus.
///
/// The corpus is resolved once and its language is captured into every
/// record; the snapshot stays with the document even though the corpus
/// itself is immutable apart from deletion. A duplicate id anywhere in the
/// batch, or against stored rows, rejects the whole batch.
pub fn insert_documents(
    conn: &Connection,
    corpus_name: &str,
    records: &[DocumentRecord],
) -> Result<(), StoreError> {
    let corpus = find_corpus(conn, corpus_name)?.ok_or_else(|| {
        StoreError::conflict(format!("corpus {corpus_name}"), ConflictCode::MissingReference)
    })?;

    let mut seen = AHashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(StoreError::conflict(
                format!("document {} in corpus {corpus_name}", record.id),
                ConflictCode::DuplicateKey,
            ));
        }
    }

    let mut insert = conn
        .prepare_cached(
            "INSERT INTO documents(corpus_id, doc_id, title, text, language) \
             VALUES(?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(|e| StoreError::query(e.to_string()))?;
    let mut index = conn
        .prepare(&format!(
            "INSERT INTO {}(rowid, text) VALUES(?1, ?2)",
            schema::document_index_table(corpus.id),
        ))
        .map_err(|e| StoreError::query(e.to_string()))?;
    for record in records {
        insert
            .execute(params![
                corpus.id,
                record.id,
                record.title.as_deref(),
                record.text,
                corpus.language,
            ])
            .map_err(|e| {
                StoreError::on_write(&format!("document {} in corpus {corpus_name}", record.id), e)
            })?;
        index
            .execute(params![conn.last_insert_rowid(), record.text])
            .map_err(|e| StoreError::query(e.to_string()))?;
    }
    debug!(corpus = corpus_name, count = records.len(), "inserted documents");
    Ok(())
}

/// Inserts a batch of queries into a dataset, resolved once by
/// `(corpus, dataset)` name.
pub fn insert_queries(
    conn: &Connection,
    corpus_name: &str,
    dataset_name: &str,
    records: &[QueryRecord],
) -> Result<(), StoreError> {
    let dataset = find_dataset(conn, corpus_name, dataset_name)?.ok_or_else(|| {
        StoreError::conflict(
            format!("dataset {dataset_name} in corpus {corpus_name}"),
            ConflictCode::MissingReference,
        )
    })?;

    let mut seen = AHashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(StoreError::conflict(
                format!("query {} in dataset {dataset_name}", record.id),
                ConflictCode::DuplicateKey,
            ));
        }
    }

    let mut insert = conn
        .prepare_cached(
            "INSERT INTO queries(dataset_id, query_id, text, description) \
             VALUES(?1, ?2, ?3, ?4)",
        )
        .map_err(|e| StoreError::query(e.to_string()))?;
    let mut index = conn
        .prepare_cached("INSERT INTO query_index(rowid, text) VALUES(?1, ?2)")
        .map_err(|e| StoreError::query(e.to_string()))?;
    for record in records {
        insert
            .execute(params![
                dataset.id,
                record.id,
                record.text,
                record.description.as_deref(),
            ])
            .map_err(|e| {
                StoreError::on_write(&format!("query {} in dataset {dataset_name}", record.id), e)
            })?;
        index
            .execute(params![conn.last_insert_rowid(), record.text])
            .map_err(|e| StoreError::query(e.to_string()))?;
    }
    debug!(corpus = corpus_name, dataset = dataset_name, count = records.len(), "inserted queries");
    Ok(())
}

/// Inserts a batch of relevance judgments.
///
/// Each record must reference a query in the dataset and a document in the
/// dataset's corpus; the composite foreign keys raise the violation and it
/// surfaces as a conflict naming the offending pair.
pub fn insert_qrels(
    conn: &Connection,
    corpus_name: &str,
    dataset_name: &str,
    records: &[QRelRecord],
) -> Result<(), StoreError> {
    let dataset = find_dataset(conn, corpus_name, dataset_name)?.ok_or_else(|| {
        StoreError::conflict(
            format!("dataset {dataset_name} in corpus {corpus_name}"),
            ConflictCode::MissingReference,
        )
    })?;

    let mut seen = AHashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert((record.query_id.as_str(), record.document_id.as_str())) {
            return Err(StoreError::conflict(
                format!(
                    "qrel ({}, {}) in dataset {dataset_name}",
                    record.query_id, record.document_id
                ),
                ConflictCode::DuplicateKey,
            ));
        }
    }

    let mut insert = conn
        .prepare_cached(
            "INSERT INTO qrels(dataset_id, corpus_id, query_id, document_id, relevance) \
             VALUES(?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(|e| StoreError::query(e.to_string()))?;
    for record in records {
        insert
            .execute(params![
                dataset.id,
                dataset.corpus_id,
                record.query_id,
                record.document_id,
                record.relevance,
            ])
            .map_err(|e| {
                StoreError::on_write(
                    &format!(
                        "qrel ({}, {}) in dataset {dataset_name}",
                        record.query_id, record.document_id
                    ),
                    e,
                )
            })?;
    }
    debug!(corpus = corpus_name, dataset = dataset_name, count = records.len(), "inserted qrels");
    Ok(())
}

/// Removes a dataset and everything it owns.
///
/// Qrels go first, then queries, then the dataset row; both child tables
/// reference the dataset, and the engine checks foreign keys statement by
/// statement.
pub fn remove_dataset(
    conn: &Connection,
    corpus_name: &str,
    dataset_name: &str,
) -> Result<(), StoreError> {
    let dataset = find_dataset(conn, corpus_name, dataset_name)?.ok_or_else(|| {
        StoreError::not_found(format!("dataset {dataset_name} in corpus {corpus_name}"))
    })?;

    conn.execute("DELETE FROM qrels WHERE dataset_id=?1", params![dataset.id])
        .map_err(|e| StoreError::query(e.to_string()))?;
    conn.execute(
        "DELETE FROM query_index WHERE rowid IN (SELECT id FROM queries WHERE dataset_id=?1)",
        params![dataset.id],
    )
    .map_err(|e| StoreError::query(e.to_string()))?;
    conn.execute("DELETE FROM queries WHERE dataset_id=?1", params![dataset.id])
        .map_err(|e| StoreError::query(e.to_string()))?;
    conn.execute("DELETE FROM datasets WHERE id=?1", params![dataset.id])
        .map_err(|e| StoreError::query(e.to_string()))?;
    info!(corpus = corpus_name, dataset = dataset_name, "removed dataset");
    Ok(())
}

/// Removes a corpus and its documents. Fails while the corpus still owns
/// datasets; those must be removed first.
pub fn remove_corpus(conn: &Connection, corpus_name: &str) -> Result<(), StoreError> {
    let corpus = find_corpus(conn, corpus_name)?
        .ok_or_else(|| StoreError::not_found(format!("corpus {corpus_name}")))?;

    let datasets: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM datasets WHERE corpus_id=?1",
            params![corpus.id],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::query(e.to_string()))?;
    if datasets > 0 {
        return Err(StoreError::conflict(
            format!("corpus {corpus_name}"),
            ConflictCode::DatasetsAttached,
        ));
    }

    conn.execute("DELETE FROM documents WHERE corpus_id=?1", params![corpus.id])
        .map_err(|e| StoreError::on_write(&format!("corpus {corpus_name}"), e))?;
    schema::drop_document_index(conn, corpus.id)?;
    conn.execute("DELETE FROM corpora WHERE id=?1", params![corpus.id])
        .map_err(|e| StoreError::on_write(&format!("corpus {corpus_name}"), e))?;
    info!(corpus = corpus_name, "removed corpus");
    Ok(())
}

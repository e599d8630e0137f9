use rusqlite::{Connection, OptionalExtension};

use crate::errors::StoreError;

pub const SCHEMA_VERSION: i64 = 1;

/// Creates all tables and indexes if missing and verifies the schema version.
///
/// Runs once per connection; also switches on foreign-key enforcement, which
/// SQLite scopes to the connection.
pub fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS corpora (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            name     TEXT NOT NULL UNIQUE,
            language TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS documents (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            corpus_id INTEGER NOT NULL REFERENCES corpora(id),
            doc_id    TEXT NOT NULL,
            title     TEXT,
            text      TEXT NOT NULL,
            language  TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_corpus_doc
            ON documents(corpus_id, doc_id);
        CREATE TABLE IF NOT EXISTS datasets (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            corpus_id     INTEGER NOT NULL REFERENCES corpora(id),
            name          TEXT NOT NULL,
            min_relevance INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_datasets_corpus_name
            ON datasets(corpus_id, name);
        CREATE TABLE IF NOT EXISTS queries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset_id  INTEGER NOT NULL REFERENCES datasets(id),
            query_id    TEXT NOT NULL,
            text        TEXT NOT NULL,
            description TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_queries_dataset_query
            ON queries(dataset_id, query_id);
        CREATE TABLE IF NOT EXISTS qrels (
            dataset_id  INTEGER NOT NULL,
            corpus_id   INTEGER NOT NULL,
            query_id    TEXT NOT NULL,
            document_id TEXT NOT NULL,
            relevance   INTEGER NOT NULL,
            PRIMARY KEY (dataset_id, query_id, document_id),
            FOREIGN KEY (dataset_id, query_id)
                REFERENCES queries(dataset_id, query_id),
            FOREIGN KEY (corpus_id, document_id)
                REFERENCES documents(corpus_id, doc_id)
        );
        CREATE INDEX IF NOT EXISTS idx_qrels_document
            ON qrels(corpus_id, document_id, relevance);
        CREATE VIRTUAL TABLE IF NOT EXISTS query_index
            USING fts5(text, tokenize='porter unicode61');
        CREATE TABLE IF NOT EXISTS collection_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| StoreError::schema(e.to_string()))?;
    ensure_meta(conn)
}

/// Name of the per-corpus full-text shard. Shards are created with the
/// corpus language's tokenizer and keyed by the document surrogate rowid.
pub(crate) fn document_index_table(corpus_id: i64) -> String {
    format!("document_index_{corpus_id}")
}

pub(crate) fn create_document_index(
    conn: &Connection,
    corpus_id: i64,
    tokenize: &str,
) -> Result<(), StoreError> {
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE {} USING fts5(text, tokenize='{tokenize}')",
        document_index_table(corpus_id),
    ))
    .map_err(|e| StoreError::schema(e.to_string()))
}

pub(crate) fn drop_document_index(conn: &Connection, corpus_id: i64) -> Result<(), StoreError> {
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {}",
        document_index_table(corpus_id),
    ))
    .map_err(|e| StoreError::schema(e.to_string()))
}

fn ensure_meta(conn: &Connection) -> Result<(), StoreError> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT schema_version FROM collection_meta WHERE id=1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::schema(e.to_string()))?;
    match version {
        Some(existing) if existing > SCHEMA_VERSION => Err(StoreError::schema(format!(
            "database schema version {existing} is newer than supported {SCHEMA_VERSION}"
        ))),
        Some(_) => Ok(()),
        None => conn
            .execute(
                "INSERT INTO collection_meta(id, schema_version) VALUES(1, ?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|e| StoreError::schema(e.to_string())),
    }
}

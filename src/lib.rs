//! Embedded store and full-text search engine for IR test collections,
//! built on SQLite.
//!
//! irstore manages named **corpora** of documents, **datasets** that define a
//! relevance-judgment scope over a corpus, **queries**, and graded relevance
//! judgments (**qrels**), and serves ranked, paginated full-text search with
//! per-query relevance counts and query-dependent snippets. Ranking and
//! highlighting delegate to SQLite's FTS5 subsystem; one full-text shard per
//! corpus carries the tokenizer for that corpus's language.
//!
//! Every operation runs inside a caller-owned transaction, so one request's
//! worth of store and search calls commits or rolls back as a unit:
//!
//! ```rust,no_run
//! use irstore::{DocumentRecord, Store};
//!
//! # fn main() -> Result<(), irstore::StoreError> {
//! let mut store = Store::open("collections.db")?;
//! store.with_transaction(|tx| {
//!     irstore::create_corpus(tx, "wiki", "english")?;
//!     irstore::insert_documents(
//!         tx,
//!         "wiki",
//!         &[DocumentRecord {
//!             id: "d1".into(),
//!             title: None,
//!             text: "the quick brown fox".into(),
//!         }],
//!     )
//! })?;
//! let hits = store.with_transaction(|tx| {
//!     irstore::search_documents(tx, "fox", "english", None, 10, 0)
//! })?;
//! assert_eq!(hits.total, 1);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod languages;
pub mod models;
pub mod schema;
pub mod search;
pub mod stats;
pub mod store;

mod snippet;
mod txn;

pub use errors::{ConflictCode, StoreError};
pub use languages::available_languages;
pub use models::{
    Corpus, Dataset, Document, DocumentRecord, Paginated, QRel, QRelRecord, Query, QueryRecord,
    RelevantDocument, SearchHit,
};
pub use search::{
    get_document, get_query, list_documents, list_qrels, list_queries, relevant_documents,
    search_documents,
};
pub use stats::{list_corpora, list_datasets, refresh_statistics};
pub use store::{
    Store, create_corpus, create_dataset, insert_documents, insert_qrels, insert_queries,
    remove_corpus, remove_dataset,
};

use serde::{Deserialize, Serialize};

/// One page of results plus the total match count, which is computed
/// independently of the page. `offset` past `total` yields an empty page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    pub total: u64,
    pub offset: u64,
    pub items: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn empty(offset: u64) -> Self {
        Self {
            total: 0,
            offset,
            items: Vec::new(),
        }
    }
}

/// A corpus with dataset and document statistics.
///
/// `num_documents_estimate` is a planner-level estimate, not an exact count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Corpus {
    pub name: String,
    pub language: String,
    pub num_datasets: i64,
    pub num_documents_estimate: i64,
}

/// A dataset with a query-count estimate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub corpus_name: String,
    pub min_relevance: i64,
    pub num_queries_estimate: i64,
}

/// A single document for bulk insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    pub title: Option<String>,
    pub text: String,
}

/// A stored document, annotated with the number of qrels at or above their
/// dataset's relevance threshold that reference it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub corpus_name: String,
    pub title: Option<String>,
    pub text: String,
    pub language: String,
    pub num_relevant_qrels: i64,
}

/// A single query for bulk insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRecord {
    pub id: String,
    pub text: String,
    pub description: Option<String>,
}

/// A stored query, annotated with the number of documents judged relevant
/// for it under the dataset's threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub id: String,
    pub corpus_name: String,
    pub dataset_name: String,
    pub text: String,
    pub description: Option<String>,
    pub num_relevant_documents: i64,
}

/// A single query-document relevance score for bulk insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QRelRecord {
    pub query_id: String,
    pub document_id: String,
    pub relevance: i64,
}

/// A stored relevance judgment, hydrated with its query's text and its
/// document's title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QRel {
    pub corpus_name: String,
    pub dataset_name: String,
    pub query_id: String,
    pub document_id: String,
    pub relevance: i64,
    pub query_text: String,
    pub document_title: Option<String>,
}

/// A document judged relevant with respect to a specific query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelevantDocument {
    pub id: String,
    pub corpus_name: String,
    pub title: Option<String>,
    pub text: String,
    pub query_id: String,
    pub relevance: i64,
}

/// A document retrieved by full-text search. Higher scores are better
/// matches; the snippet holds up to five highlighted fragments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub corpus_name: String,
    pub title: Option<String>,
    pub snippet: String,
    pub score: f64,
}

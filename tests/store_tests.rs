use irstore::{
    ConflictCode, DocumentRecord, QRelRecord, QueryRecord, Store, StoreError, available_languages,
    create_corpus, create_dataset, get_document, insert_documents, insert_qrels, insert_queries,
    list_documents, list_queries,
};

fn doc(id: &str, text: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        title: None,
        text: text.to_string(),
    }
}

fn query(id: &str, text: &str) -> QueryRecord {
    QueryRecord {
        id: id.to_string(),
        text: text.to_string(),
        description: None,
    }
}

fn qrel(query_id: &str, document_id: &str, relevance: i64) -> QRelRecord {
    QRelRecord {
        query_id: query_id.to_string(),
        document_id: document_id.to_string(),
        relevance,
    }
}

fn seeded_store() -> Store {
    let mut store = Store::open_in_memory().expect("store");
    store
        .with_transaction(|tx| {
            create_corpus(tx, "wiki", "english")?;
            create_dataset(tx, "wiki", "ds1", 1)?;
            insert_documents(
                tx,
                "wiki",
                &[doc("d1", "the quick brown fox"), doc("d2", "the lazy dog")],
            )?;
            insert_queries(tx, "wiki", "ds1", &[query("q1", "fox hunting")])
        })
        .expect("seed");
    store
}

#[test]
fn test_available_languages_include_builtin_configurations() {
    let mut store = Store::open_in_memory().expect("store");
    let languages = store
        .with_transaction(|tx| available_languages(tx))
        .expect("languages");
    assert!(languages.contains(&"english".to_string()));
    assert!(languages.contains(&"simple".to_string()));
}

#[test]
fn test_create_corpus_rejects_unknown_language() {
    let mut store = Store::open_in_memory().expect("store");
    let err = store
        .with_transaction(|tx| create_corpus(tx, "wiki", "klingon"))
        .expect_err("unknown language");
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[test]
fn test_create_corpus_rejects_duplicate_name() {
    let mut store = Store::open_in_memory().expect("store");
    store
        .with_transaction(|tx| create_corpus(tx, "wiki", "english"))
        .expect("first");
    let err = store
        .with_transaction(|tx| create_corpus(tx, "wiki", "simple"))
        .expect_err("duplicate");
    match err {
        StoreError::Conflict { entity, code } => {
            assert!(entity.contains("wiki"));
            assert_eq!(code, ConflictCode::DuplicateKey);
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[test]
fn test_create_dataset_requires_existing_corpus() {
    let mut store = Store::open_in_memory().expect("store");
    let err = store
        .with_transaction(|tx| create_dataset(tx, "missing", "ds1", 1))
        .expect_err("missing corpus");
    match err {
        StoreError::Conflict { entity, code } => {
            assert!(entity.contains("missing"));
            assert_eq!(code, ConflictCode::MissingReference);
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[test]
fn test_create_dataset_rejects_duplicate_name_within_corpus() {
    let mut store = Store::open_in_memory().expect("store");
    store
        .with_transaction(|tx| {
            create_corpus(tx, "wiki", "english")?;
            create_dataset(tx, "wiki", "ds1", 1)
        })
        .expect("seed");
    let err = store
        .with_transaction(|tx| create_dataset(tx, "wiki", "ds1", 2))
        .expect_err("duplicate dataset");
    assert!(matches!(
        err,
        StoreError::Conflict {
            code: ConflictCode::DuplicateKey,
            ..
        }
    ));
}

#[test]
fn test_same_dataset_name_is_allowed_in_another_corpus() {
    let mut store = Store::open_in_memory().expect("store");
    store
        .with_transaction(|tx| {
            create_corpus(tx, "wiki", "english")?;
            create_corpus(tx, "news", "english")?;
            create_dataset(tx, "wiki", "ds1", 1)?;
            create_dataset(tx, "news", "ds1", 1)
        })
        .expect("both datasets");
}

#[test]
fn test_insert_documents_captures_corpus_language() {
    let mut store = seeded_store();
    let document = store
        .with_transaction(|tx| get_document(tx, "wiki", "d1"))
        .expect("document");
    assert_eq!(document.language, "english");
    assert_eq!(document.text, "the quick brown fox");
}

#[test]
fn test_insert_documents_rejects_whole_batch_on_duplicate() {
    let mut store = seeded_store();
    let err = store
        .with_transaction(|tx| {
            insert_documents(tx, "wiki", &[doc("d3", "new text"), doc("d1", "already there")])
        })
        .expect_err("duplicate id");
    assert!(matches!(
        err,
        StoreError::Conflict {
            code: ConflictCode::DuplicateKey,
            ..
        }
    ));
    // the valid record must not have been kept
    let listing = store
        .with_transaction(|tx| list_documents(tx, "wiki", None, 0))
        .expect("list");
    assert_eq!(listing.total, 2);
}

#[test]
fn test_insert_documents_rejects_in_batch_duplicates() {
    let mut store = seeded_store();
    let err = store
        .with_transaction(|tx| {
            insert_documents(tx, "wiki", &[doc("d9", "one"), doc("d9", "two")])
        })
        .expect_err("in-batch duplicate");
    match err {
        StoreError::Conflict { entity, code } => {
            assert!(entity.contains("d9"));
            assert_eq!(code, ConflictCode::DuplicateKey);
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[test]
fn test_insert_documents_into_missing_corpus_is_a_conflict() {
    let mut store = Store::open_in_memory().expect("store");
    let err = store
        .with_transaction(|tx| insert_documents(tx, "missing", &[doc("d1", "text")]))
        .expect_err("missing corpus");
    assert!(matches!(
        err,
        StoreError::Conflict {
            code: ConflictCode::MissingReference,
            ..
        }
    ));
}

#[test]
fn test_insert_queries_rejects_duplicate_within_dataset() {
    let mut store = seeded_store();
    let err = store
        .with_transaction(|tx| insert_queries(tx, "wiki", "ds1", &[query("q1", "again")]))
        .expect_err("duplicate query");
    assert!(matches!(
        err,
        StoreError::Conflict {
            code: ConflictCode::DuplicateKey,
            ..
        }
    ));
    let listing = store
        .with_transaction(|tx| list_queries(tx, "wiki", Some("ds1"), None, None, 0))
        .expect("list");
    assert_eq!(listing.total, 1);
}

#[test]
fn test_insert_qrels_requires_known_document() {
    let mut store = seeded_store();
    let err = store
        .with_transaction(|tx| {
            insert_qrels(
                tx,
                "wiki",
                "ds1",
                &[qrel("q1", "d1", 2), qrel("q1", "no-such-doc", 1)],
            )
        })
        .expect_err("bad document reference");
    match err {
        StoreError::Conflict { entity, code } => {
            assert!(entity.contains("no-such-doc"));
            assert_eq!(code, ConflictCode::MissingReference);
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[test]
fn test_insert_qrels_requires_known_query() {
    let mut store = seeded_store();
    let err = store
        .with_transaction(|tx| insert_qrels(tx, "wiki", "ds1", &[qrel("ghost", "d1", 2)]))
        .expect_err("bad query reference");
    assert!(matches!(
        err,
        StoreError::Conflict {
            code: ConflictCode::MissingReference,
            ..
        }
    ));
}

#[test]
fn test_insert_qrels_rejects_duplicate_pair() {
    let mut store = seeded_store();
    store
        .with_transaction(|tx| insert_qrels(tx, "wiki", "ds1", &[qrel("q1", "d1", 2)]))
        .expect("first");
    let err = store
        .with_transaction(|tx| insert_qrels(tx, "wiki", "ds1", &[qrel("q1", "d1", 3)]))
        .expect_err("duplicate pair");
    assert!(matches!(
        err,
        StoreError::Conflict {
            code: ConflictCode::DuplicateKey,
            ..
        }
    ));
}

#[test]
fn test_failed_batch_rolls_back_earlier_operations_in_the_unit() {
    let mut store = seeded_store();
    let err = store
        .with_transaction(|tx| {
            insert_documents(tx, "wiki", &[doc("d3", "three")])?;
            insert_documents(tx, "wiki", &[doc("d1", "duplicate")])
        })
        .expect_err("second batch fails");
    assert!(matches!(err, StoreError::Conflict { .. }));
    let listing = store
        .with_transaction(|tx| list_documents(tx, "wiki", None, 0))
        .expect("list");
    assert_eq!(listing.total, 2, "d3 must have been rolled back");
}

#[test]
fn test_store_persists_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("collections.db");
    {
        let mut store = Store::open(&path).expect("open");
        store
            .with_transaction(|tx| {
                create_corpus(tx, "wiki", "english")?;
                insert_documents(tx, "wiki", &[doc("d1", "persistent text")])
            })
            .expect("seed");
    }
    let mut store = Store::open(&path).expect("reopen");
    let document = store
        .with_transaction(|tx| get_document(tx, "wiki", "d1"))
        .expect("document");
    assert_eq!(document.text, "persistent text");
}

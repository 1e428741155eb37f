//! Integration tests for the search index through its public API

use curio::index::{DocumentInput, IndexPaths, Indexer, SearchOptions};
use tempfile::TempDir;

fn create_test_indexer(dir: &TempDir) -> Indexer {
    Indexer::open(IndexPaths::new(
        dir.path().join("index.json"),
        dir.path().join("documents.json"),
    ))
}

fn populate(indexer: &mut Indexer) {
    let result = indexer.add_documents(vec![
        DocumentInput::new(
            "https://rust-lang.org/async",
            "Asynchronous Programming",
            "Futures are polled by an executor such as tokio.",
        ),
        DocumentInput::new(
            "https://blog.example.com/runtimes",
            "Choosing a runtime",
            "Most asynchronous services pick tokio. Asynchronous code needs a runtime.",
        ),
        DocumentInput::new(
            "https://blog.example.com/gardening",
            "Winter gardening",
            "Mulch the beds before the first frost.",
        ),
        DocumentInput::new("https://blog.example.com/empty", "   ", "No title here."),
    ]);

    assert_eq!(result.added, 3);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].0, "https://blog.example.com/empty");
}

#[test]
fn test_title_match_outranks_content_match() {
    let dir = TempDir::new().unwrap();
    let mut indexer = create_test_indexer(&dir);
    populate(&mut indexer);

    let response = indexer.search("asynchronous", &SearchOptions::default());
    assert_eq!(response.total, 2);
    assert_eq!(response.results[0].url, "https://rust-lang.org/async");
    assert!(response.results[0].score > response.results[1].score);
}

#[test]
fn test_prefix_and_fuzzy_queries() {
    let dir = TempDir::new().unwrap();
    let mut indexer = create_test_indexer(&dir);
    populate(&mut indexer);

    let prefix = indexer.search("asyn", &SearchOptions::default());
    assert_eq!(prefix.total, 2);

    let fuzzy = indexer.search("tokip", &SearchOptions::default());
    assert_eq!(fuzzy.total, 2);

    let exact = indexer.search("tokio", &SearchOptions::default());
    assert!(exact.results[0].score > fuzzy.results[0].score);

    assert_eq!(indexer.search("volcano", &SearchOptions::default()).total, 0);
    assert_eq!(indexer.search("  ", &SearchOptions::default()).total, 0);
}

#[test]
fn test_domain_filter_and_pagination() {
    let dir = TempDir::new().unwrap();
    let mut indexer = create_test_indexer(&dir);
    populate(&mut indexer);

    let options = SearchOptions::default().with_domain("BLOG.example.com");
    let response = indexer.search("tokio", &options);
    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].domain, "blog.example.com");

    let first = indexer.search("tokio", &SearchOptions::default().with_limit(1));
    let second = indexer.search("tokio", &SearchOptions::default().with_limit(1).with_offset(1));
    assert_eq!(first.total, 2);
    assert_eq!(second.total, 2);
    assert_eq!(first.results.len(), 1);
    assert_eq!(second.results.len(), 1);
    assert_ne!(first.results[0].url, second.results[0].url);

    let past_end = indexer.search("tokio", &SearchOptions::default().with_offset(5));
    assert_eq!(past_end.total, 2);
    assert!(past_end.results.is_empty());
}

#[test]
fn test_save_and_reopen() {
    let dir = TempDir::new().unwrap();
    let mut indexer = create_test_indexer(&dir);
    populate(&mut indexer);
    indexer.save().unwrap();

    let reopened = create_test_indexer(&dir);
    assert_eq!(reopened.len(), 3);
    assert_eq!(
        reopened.search("frost", &SearchOptions::default()).results[0].url,
        "https://blog.example.com/gardening"
    );

    let stats = reopened.get_stats();
    assert_eq!(stats.documents, 3);
    assert_eq!(stats.domains, 2);
    assert_eq!(stats.per_domain[0].domain, "blog.example.com");
    assert_eq!(stats.per_domain[0].documents, 2);
}

#[test]
fn test_replace_and_remove() {
    let dir = TempDir::new().unwrap();
    let mut indexer = create_test_indexer(&dir);
    populate(&mut indexer);

    indexer
        .add_document(DocumentInput::new(
            "https://blog.example.com/gardening/",
            "Spring gardening",
            "Sow peas once the soil warms.",
        ))
        .unwrap();
    assert_eq!(indexer.len(), 3);
    assert_eq!(indexer.search("frost", &SearchOptions::default()).total, 0);
    assert_eq!(indexer.search("peas", &SearchOptions::default()).total, 1);

    assert!(indexer.remove_by_url("https://blog.example.com/gardening"));
    assert!(!indexer.has_document("https://blog.example.com/gardening"));
    assert_eq!(indexer.search("peas", &SearchOptions::default()).total, 0);
}

#[test]
fn test_corrupt_documents_are_quarantined() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.json"), b"{}").unwrap();
    std::fs::write(dir.path().join("documents.json"), b"not json").unwrap();

    let indexer = create_test_indexer(&dir);
    assert!(indexer.is_empty());
    assert!(dir.path().join("documents.json.corrupt").exists());
    assert!(dir.path().join("index.json.corrupt").exists());
}

#[test]
fn test_stale_index_is_rebuilt_from_documents() {
    let dir = TempDir::new().unwrap();
    let mut indexer = create_test_indexer(&dir);
    populate(&mut indexer);
    indexer.save().unwrap();
    std::fs::write(dir.path().join("index.json"), b"truncated").unwrap();

    let reopened = create_test_indexer(&dir);
    assert_eq!(reopened.len(), 3);
    let response = reopened.search("frost", &SearchOptions::default());
    assert_eq!(response.results[0].url, "https://blog.example.com/gardening");
}

//! Full-text document index
//!
//! The [`Indexer`] pairs a ranked [`InvertedIndex`] with a map from canonical
//! URL to the full [`Document`]. Both are mutated together inside one
//! `&mut self` call, so a search never sees a half-replaced document.

mod document;
mod inverted;
mod persist;
mod search;

pub use document::{Document, DocumentInput};
pub use inverted::{levenshtein, tokenize, InvertedIndex};
pub use persist::{write_atomic, IndexPaths};
pub use search::{DomainCount, IndexStats, SearchHit, SearchOptions, SearchResponse};

use crate::url::normalize_url;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info, warn};

pub(crate) use persist::corrupt_path;

/// Index-specific errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid document URL: {0}")]
    InvalidUrl(String),

    #[error("Document has an empty title: {0}")]
    EmptyTitle(String),

    #[error("Index files are inconsistent: {0}")]
    Inconsistent(String),
}

/// Outcome of [`Indexer::add_documents`]
#[derive(Debug, Default)]
pub struct BatchResult {
    pub added: usize,
    /// `(url, error message)` for every rejected input
    pub errors: Vec<(String, String)>,
}

/// Default excerpt length when the caller supplies none
pub const DEFAULT_EXCERPT_LENGTH: usize = 200;

pub struct Indexer {
    paths: IndexPaths,
    index: InvertedIndex,
    documents: HashMap<String, Document>,
    excerpt_length: usize,
}

impl Indexer {
    /// Opens the index stored at `paths`
    ///
    /// Missing files give an empty index. A ranked index that disagrees with
    /// the document file is rebuilt from the documents. An unreadable
    /// document file is logged, moved aside as `.corrupt` along with its
    /// index and replaced by an empty index.
    pub fn open(paths: IndexPaths) -> Self {
        let (index, documents) = match persist::load(&paths) {
            Ok(Some((index, documents))) => {
                info!(
                    "Loaded index with {} documents from {}",
                    documents.len(),
                    paths.documents_path.display()
                );
                let documents = documents
                    .into_iter()
                    .map(|doc| (doc.url.clone(), doc))
                    .collect();
                (index, documents)
            }
            Ok(None) => {
                debug!("No index at {}, starting empty", paths.index_path.display());
                (InvertedIndex::new(), HashMap::new())
            }
            Err(e) => {
                warn!("Failed to load index: {}, starting empty", e);
                persist::quarantine(&paths);
                (InvertedIndex::new(), HashMap::new())
            }
        };

        Self {
            paths,
            index,
            documents,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
        }
    }

    pub fn with_excerpt_length(mut self, excerpt_length: usize) -> Self {
        self.excerpt_length = excerpt_length;
        self
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Adds or replaces a document
    ///
    /// An existing document with the same canonical URL is removed from the
    /// ranked index before the new one is added.
    pub fn add_document(&mut self, input: DocumentInput) -> Result<(), IndexError> {
        let document = input.into_document(self.excerpt_length)?;

        if self.documents.contains_key(&document.url) {
            debug!("Replacing {}", document.url);
            self.index.remove(&document.url);
        }
        self.index
            .add(&document.url, &document.title, &document.content);
        self.documents.insert(document.url.clone(), document);
        Ok(())
    }

    /// Adds every input, collecting failures instead of stopping
    pub fn add_documents(&mut self, inputs: impl IntoIterator<Item = DocumentInput>) -> BatchResult {
        let mut result = BatchResult::default();

        for input in inputs {
            let url = input.url.clone();
            match self.add_document(input) {
                Ok(()) => result.added += 1,
                Err(e) => {
                    warn!("Failed to index {}: {}", url, e);
                    result.errors.push((url, e.to_string()));
                }
            }
        }

        result
    }

    /// Removes the document for `url`; returns whether one existed
    pub fn remove_by_url(&mut self, url: &str) -> bool {
        let key = lookup_key(url);
        self.index.remove(&key);
        self.documents.remove(&key).is_some()
    }

    pub fn has_document(&self, url: &str) -> bool {
        self.documents.contains_key(&lookup_key(url))
    }

    pub fn get_document(&self, url: &str) -> Option<&Document> {
        self.documents.get(&lookup_key(url))
    }

    /// Ranked, filtered, paginated search
    ///
    /// `total` counts every hit that survives the score and domain filters,
    /// independent of `limit` and `offset`.
    pub fn search(&self, query: &str, options: &SearchOptions) -> SearchResponse {
        let hits: Vec<(&Document, f64)> = self
            .index
            .search(query)
            .into_iter()
            .filter(|(_, score)| options.min_score.map_or(true, |min| *score >= min))
            .filter_map(|(url, score)| self.documents.get(&url).map(|doc| (doc, score)))
            .filter(|(doc, _)| {
                options
                    .domain
                    .as_deref()
                    .map_or(true, |domain| doc.domain.eq_ignore_ascii_case(domain))
            })
            .collect();

        let total = hits.len();
        let results = hits
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .map(|(doc, score)| SearchHit {
                title: doc.title.clone(),
                url: doc.url.clone(),
                domain: doc.domain.clone(),
                snippet: doc.excerpt.clone(),
                score: search::round_score(score),
                crawled_at: doc.crawled_at,
            })
            .collect();

        SearchResponse { total, results }
    }

    /// Document counts and crawl time range; zeroed when empty
    pub fn get_stats(&self) -> IndexStats {
        let per_domain = self.get_domains();

        IndexStats {
            documents: self.documents.len(),
            domains: per_domain.len(),
            oldest_crawl: self.documents.values().map(|d| d.crawled_at).min(),
            newest_crawl: self.documents.values().map(|d| d.crawled_at).max(),
            per_domain,
        }
    }

    /// Documents per domain, largest first
    pub fn get_domains(&self) -> Vec<DomainCount> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in self.documents.values() {
            *counts.entry(doc.domain.as_str()).or_default() += 1;
        }

        let mut domains: Vec<DomainCount> = counts
            .into_iter()
            .map(|(domain, documents)| DomainCount {
                domain: domain.to_string(),
                documents,
            })
            .collect();
        domains.sort_by(|a, b| b.documents.cmp(&a.documents).then_with(|| a.domain.cmp(&b.domain)));
        domains
    }

    /// Writes both index files atomically
    pub fn save(&self) -> Result<(), IndexError> {
        let mut documents: Vec<&Document> = self.documents.values().collect();
        documents.sort_by(|a, b| a.url.cmp(&b.url));

        persist::save(&self.paths, &self.index, &documents)?;
        debug!(
            "Saved index with {} documents to {}",
            documents.len(),
            self.paths.documents_path.display()
        );
        Ok(())
    }

    /// Empties the index, optionally deleting the backing files
    pub fn clear(&mut self, delete_files: bool) -> Result<(), IndexError> {
        self.index = InvertedIndex::new();
        self.documents.clear();

        if delete_files {
            persist::delete(&self.paths)?;
        }
        Ok(())
    }
}

fn lookup_key(url: &str) -> String {
    normalize_url(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

//! Query options and result shapes served to the API layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pagination and filtering for [`crate::index::Indexer::search`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub limit: usize,
    pub offset: usize,
    /// Exact, case-insensitive host filter
    pub domain: Option<String>,
    /// Hits scoring below this are dropped before counting
    pub min_score: Option<f64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            domain: None,
            min_score: None,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub snippet: String,
    /// Rounded to three decimal places
    pub score: f64,
    pub crawled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matches after filtering, before pagination
    pub total: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub documents: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub documents: usize,
    pub domains: usize,
    pub oldest_crawl: Option<DateTime<Utc>>,
    pub newest_crawl: Option<DateTime<Utc>>,
    pub per_domain: Vec<DomainCount>,
}

pub(crate) fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(1.23456), 1.235);
        assert_eq!(round_score(0.0004), 0.0);
    }

    #[test]
    fn test_options_builder() {
        let options = SearchOptions::default()
            .with_limit(5)
            .with_offset(10)
            .with_domain("docs.rs")
            .with_min_score(0.5);
        assert_eq!(options.limit, 5);
        assert_eq!(options.offset, 10);
        assert_eq!(options.domain.as_deref(), Some("docs.rs"));
        assert_eq!(options.min_score, Some(0.5));
    }
}

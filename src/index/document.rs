use crate::extract::{make_excerpt, ExtractedContent, Quality, SiteType};
use crate::url::{extract_domain, normalize_url};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::IndexError;

/// One indexed page, keyed by its canonical URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub domain: String,
    pub crawled_at: DateTime<Utc>,
    pub depth: u32,
    pub quality: Quality,
    #[serde(rename = "type")]
    pub site_type: SiteType,
}

/// A document as submitted to the indexer, before validation
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub url: String,
    pub title: String,
    pub content: String,
    /// Built from `content` when absent or blank
    pub excerpt: Option<String>,
    /// Defaults to now
    pub crawled_at: Option<DateTime<Utc>>,
    pub depth: u32,
    pub quality: Quality,
    pub site_type: SiteType,
}

impl DocumentInput {
    /// A minimal input, mostly useful for callers outside the crawler
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            excerpt: None,
            crawled_at: None,
            depth: 0,
            quality: Quality::default(),
            site_type: SiteType::default(),
        }
    }

    /// Wraps the extractor's output for a page fetched at `depth`
    pub fn from_extracted(url: &str, depth: u32, page: ExtractedContent) -> Self {
        Self {
            url: url.to_string(),
            title: page.title,
            content: page.content,
            excerpt: Some(page.excerpt),
            crawled_at: None,
            depth,
            quality: page.quality,
            site_type: page.site_type,
        }
    }

    /// Validates the input and turns it into a [`Document`]
    ///
    /// The URL is normalized and the title trimmed; an empty title is an
    /// error.
    pub fn into_document(self, excerpt_length: usize) -> Result<Document, IndexError> {
        let url =
            normalize_url(&self.url).map_err(|e| IndexError::InvalidUrl(format!("{}: {}", self.url, e)))?;
        let domain = extract_domain(&url).ok_or_else(|| IndexError::InvalidUrl(self.url.clone()))?;

        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(IndexError::EmptyTitle(url.to_string()));
        }

        let excerpt = match self.excerpt {
            Some(excerpt) if !excerpt.trim().is_empty() => excerpt,
            _ => make_excerpt(&self.content, excerpt_length),
        };

        Ok(Document {
            url: url.to_string(),
            title,
            content: self.content,
            excerpt,
            domain,
            crawled_at: self.crawled_at.unwrap_or_else(Utc::now),
            depth: self.depth,
            quality: self.quality,
            site_type: self.site_type,
        })
    }
}

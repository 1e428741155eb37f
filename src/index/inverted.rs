//! Ranked inverted index
//!
//! Postings live in a `BTreeMap` keyed by term so prefix expansion is a range
//! scan. Scoring is BM25 over two fields, title (boosted) and content. Each
//! query term contributes its best match among the exact term, prefix
//! expansions and fuzzy expansions; the contributions of all query terms are
//! summed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type DocId = u32;

const K1: f64 = 1.2;
const B: f64 = 0.75;

pub const TITLE_BOOST: f64 = 2.0;
pub const PREFIX_WEIGHT: f64 = 0.5;
pub const FUZZY_WEIGHT: f64 = 0.3;
pub const MIN_PREFIX_TERM_LEN: usize = 2;
pub const MIN_FUZZY_TERM_LEN: usize = 4;
/// Allowed edit distance as a fraction of the query term length
pub const FUZZY_RATIO: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocId,
    pub title_tf: u32,
    pub content_tf: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocEntry {
    pub url: String,
    pub title_len: u32,
    pub content_len: u32,
    /// Distinct terms, kept so removal touches only this document's postings
    pub terms: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: BTreeMap<String, Vec<Posting>>,
    docs: HashMap<DocId, DocEntry>,
    next_id: DocId,
    total_title_len: u64,
    total_content_len: u64,
    #[serde(skip)]
    by_url: HashMap<String, DocId>,
}

/// Splits text into lowercase alphanumeric terms of two or more characters
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the URL lookup after deserialization
    pub fn rebuild_lookup(&mut self) {
        self.by_url = self
            .docs
            .iter()
            .map(|(id, entry)| (entry.url.clone(), *id))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.by_url.contains_key(url)
    }

    /// URLs of all indexed documents
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.docs.values().map(|entry| entry.url.as_str())
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Indexes a document, replacing any previous version of the same URL
    pub fn add(&mut self, url: &str, title: &str, content: &str) {
        self.remove(url);

        let title_terms = tokenize(title);
        let content_terms = tokenize(content);

        let mut frequencies: HashMap<String, (u32, u32)> = HashMap::new();
        for term in &title_terms {
            frequencies.entry(term.clone()).or_default().0 += 1;
        }
        for term in &content_terms {
            frequencies.entry(term.clone()).or_default().1 += 1;
        }

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let mut terms = Vec::with_capacity(frequencies.len());
        for (term, (title_tf, content_tf)) in frequencies {
            self.postings.entry(term.clone()).or_default().push(Posting {
                doc: id,
                title_tf,
                content_tf,
            });
            terms.push(term);
        }

        let entry = DocEntry {
            url: url.to_string(),
            title_len: title_terms.len() as u32,
            content_len: content_terms.len() as u32,
            terms,
        };
        self.total_title_len += u64::from(entry.title_len);
        self.total_content_len += u64::from(entry.content_len);
        self.docs.insert(id, entry);
        self.by_url.insert(url.to_string(), id);
    }

    /// Removes a document; returns whether it was present
    pub fn remove(&mut self, url: &str) -> bool {
        let Some(id) = self.by_url.remove(url) else {
            return false;
        };
        let Some(entry) = self.docs.remove(&id) else {
            return false;
        };

        for term in &entry.terms {
            if let Some(list) = self.postings.get_mut(term) {
                list.retain(|posting| posting.doc != id);
                if list.is_empty() {
                    self.postings.remove(term);
                }
            }
        }

        self.total_title_len = self.total_title_len.saturating_sub(u64::from(entry.title_len));
        self.total_content_len = self
            .total_content_len
            .saturating_sub(u64::from(entry.content_len));
        true
    }

    /// Ranks documents against `query`
    ///
    /// Returns `(url, score)` pairs with a positive score, ordered by score
    /// descending, then URL ascending.
    pub fn search(&self, query: &str) -> Vec<(String, f64)> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || self.docs.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<DocId, f64> = HashMap::new();

        for query_term in &query_terms {
            let mut best: HashMap<DocId, f64> = HashMap::new();

            for (term, weight) in self.expand(query_term) {
                let Some(postings) = self.postings.get(term) else {
                    continue;
                };
                let idf = self.idf(postings.len());
                for posting in postings {
                    let score = weight * idf * self.field_score(posting);
                    let slot = best.entry(posting.doc).or_insert(0.0);
                    if score > *slot {
                        *slot = score;
                    }
                }
            }

            for (doc, score) in best {
                *scores.entry(doc).or_insert(0.0) += score;
            }
        }

        let mut ranked: Vec<(String, f64)> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .filter_map(|(doc, score)| self.docs.get(&doc).map(|e| (e.url.clone(), score)))
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// Index terms matching one query term, with their weights
    fn expand<'a>(&'a self, query_term: &'a str) -> Vec<(&'a str, f64)> {
        let mut matches: Vec<(&str, f64)> = Vec::new();

        if self.postings.contains_key(query_term) {
            matches.push((query_term, 1.0));
        }

        let query_len = query_term.chars().count();

        if query_len >= MIN_PREFIX_TERM_LEN {
            for term in self
                .postings
                .range::<str, _>((std::ops::Bound::Included(query_term), std::ops::Bound::Unbounded))
                .map(|(term, _)| term.as_str())
                .take_while(|term| term.starts_with(query_term))
                .filter(|term| *term != query_term)
            {
                matches.push((term, PREFIX_WEIGHT));
            }
        }

        if query_len >= MIN_FUZZY_TERM_LEN {
            let max_distance = (query_len as f64 * FUZZY_RATIO).floor() as usize;
            if max_distance > 0 {
                for term in self.postings.keys() {
                    if term == query_term || term.starts_with(query_term) {
                        continue;
                    }
                    let term_len = term.chars().count();
                    if term_len.abs_diff(query_len) > max_distance {
                        continue;
                    }
                    if levenshtein(query_term, term, max_distance).is_some() {
                        matches.push((term.as_str(), FUZZY_WEIGHT));
                    }
                }
            }
        }

        matches
    }

    fn idf(&self, doc_freq: usize) -> f64 {
        let n = self.docs.len() as f64;
        let df = doc_freq as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn field_score(&self, posting: &Posting) -> f64 {
        let Some(entry) = self.docs.get(&posting.doc) else {
            return 0.0;
        };
        let n = self.docs.len() as f64;
        let avg_title = (self.total_title_len as f64 / n).max(1.0);
        let avg_content = (self.total_content_len as f64 / n).max(1.0);

        TITLE_BOOST * bm25_tf(posting.title_tf, entry.title_len, avg_title)
            + bm25_tf(posting.content_tf, entry.content_len, avg_content)
    }
}

fn bm25_tf(tf: u32, field_len: u32, avg_len: f64) -> f64 {
    if tf == 0 {
        return 0.0;
    }
    let tf = f64::from(tf);
    let norm = 1.0 - B + B * f64::from(field_len) / avg_len;
    tf * (K1 + 1.0) / (tf + K1 * norm)
}

/// Edit distance between `a` and `b` if it is at most `max`
pub fn levenshtein(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > max {
        return None;
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        let mut row_min = current[0];

        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j] + cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
            row_min = row_min.min(current[j + 1]);
        }

        if row_min > max {
            return None;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    let distance = previous[b.len()];
    (distance <= max).then_some(distance)
}

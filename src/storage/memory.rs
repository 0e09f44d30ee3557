//! In-memory collaborator backends.
//!
//! Thread-safe implementations of the collaborator traits. They are intended
//! for embedded usage, tests, and as a reference implementation.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::document::{Document, ExternalResult, SearchKind, Verbosity};
use crate::error::CollaboratorError;
use crate::pattern::Pattern;
use crate::storage::traits::{DocumentStore, ExternalSource, PatternStore};
use crate::text;

fn lock_err(context: &'static str) -> CollaboratorError {
    CollaboratorError::Backend(format!("poisoned lock: {context}"))
}

fn normalize_key(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

fn searchable_text(doc: &Document) -> String {
    let mut out = format!("{} {}", doc.title, doc.content);
    for tag in &doc.tags {
        out.push(' ');
        out.push_str(tag);
    }
    out
}

/// Thread-safe in-memory document store ranked by query-term overlap.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<String, Document>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `documents`.
    #[must_use]
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let map = documents.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self {
            documents: RwLock::new(map),
        }
    }

    /// Insert or replace a document by id.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError::Backend` if the lock is poisoned.
    pub fn upsert(&self, document: Document) -> Result<(), CollaboratorError> {
        let mut docs = self.documents.write().map_err(|_| lock_err("document.upsert"))?;
        docs.insert(document.id.clone(), document);
        Ok(())
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().map_or(0, |d| d.len())
    }

    /// Returns true if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn name(&self) -> &str {
        "memory-documents"
    }

    async fn search(&self, query: &str) -> Result<Vec<Document>, CollaboratorError> {
        let terms = text::query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let docs = self.documents.read().map_err(|_| lock_err("document.search"))?;
        let mut ranked: Vec<(f32, &Document)> = docs
            .values()
            .map(|doc| (text::overlap_ratio(&terms, &searchable_text(doc)), doc))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        // Stable sort keeps id order among equal scores.
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(ranked.into_iter().map(|(_, doc)| doc.clone()).collect())
    }

    async fn by_category(&self, category: &str) -> Result<Vec<Document>, CollaboratorError> {
        let key = normalize_key(category);
        let docs = self.documents.read().map_err(|_| lock_err("document.by_category"))?;
        Ok(docs
            .values()
            .filter(|doc| normalize_key(&doc.category) == key)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, CollaboratorError> {
        let docs = self.documents.read().map_err(|_| lock_err("document.get"))?;
        Ok(docs.get(id.trim()).cloned())
    }
}

/// Canned external source answering from a topic table.
///
/// Every entry whose topic occurs in the query contributes its answer;
/// `Verbosity::Brief` keeps only the first paragraph of each.
#[derive(Debug, Default)]
pub struct StaticExternalSource {
    entries: Vec<(String, ExternalResult)>,
    fallback: Option<ExternalResult>,
}

impl StaticExternalSource {
    /// Create a source with no answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an answer for a topic term or phrase.
    #[must_use]
    pub fn with_answer(mut self, topic: impl Into<String>, answer: ExternalResult) -> Self {
        self.entries.push((topic.into(), answer));
        self
    }

    /// Answer returned when no topic matches.
    #[must_use]
    pub fn with_fallback(mut self, answer: ExternalResult) -> Self {
        self.fallback = Some(answer);
        self
    }
}

fn first_paragraph(content: &str) -> &str {
    content
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or("")
}

#[async_trait]
impl ExternalSource for StaticExternalSource {
    fn name(&self) -> &str {
        "static-external"
    }

    async fn search(
        &self,
        query: &str,
        _kind: SearchKind,
        verbosity: Verbosity,
    ) -> Result<ExternalResult, CollaboratorError> {
        let normalized = text::normalize(query);
        let mut matched = self
            .entries
            .iter()
            .filter(|(topic, _)| text::contains_term(&normalized, topic))
            .map(|(_, answer)| answer)
            .peekable();

        if matched.peek().is_none() {
            return Ok(self.fallback.clone().unwrap_or_default());
        }

        let mut result = ExternalResult::default();
        for answer in matched {
            let body = match verbosity {
                Verbosity::Brief => first_paragraph(&answer.content),
                Verbosity::Standard | Verbosity::Detailed => answer.content.trim(),
            };
            if !result.content.is_empty() {
                result.content.push_str("\n\n");
            }
            result.content.push_str(body);
            for citation in &answer.citations {
                if !result.citations.contains(citation) {
                    result.citations.push(citation.clone());
                }
            }
        }
        Ok(result)
    }
}

/// Thread-safe in-memory pattern table.
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    patterns: RwLock<Vec<Pattern>>,
}

impl InMemoryPatternStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `patterns`.
    #[must_use]
    pub fn with_patterns(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Self {
            patterns: RwLock::new(patterns.into_iter().collect()),
        }
    }

    /// Number of stored patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.read().map_or(0, |p| p.len())
    }

    /// Returns true if the store holds no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PatternStore for InMemoryPatternStore {
    async fn patterns_by_domain(&self, domain: &str) -> Result<Vec<Pattern>, CollaboratorError> {
        let key = normalize_key(domain);
        let patterns = self.patterns.read().map_err(|_| lock_err("pattern.by_domain"))?;
        Ok(patterns
            .iter()
            .filter(|p| normalize_key(&p.domain) == key)
            .cloned()
            .collect())
    }

    async fn insert_pattern(&self, pattern: Pattern) -> Result<(), CollaboratorError> {
        let mut patterns = self.patterns.write().map_err(|_| lock_err("pattern.insert"))?;
        let duplicate = patterns
            .iter()
            .any(|p| p.shares_domain(&pattern) && p.name.eq_ignore_ascii_case(&pattern.name));
        if duplicate {
            return Err(CollaboratorError::Backend(format!(
                "duplicate pattern '{}' in domain '{}'",
                pattern.name, pattern.domain
            )));
        }
        patterns.push(pattern);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::document::{Citation, EnforcementLevel};
    use crate::pattern::PatternSource;

    fn store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::with_documents([
            Document::new("tca-001", "Reducers", "A reducer mutates state and returns an effect.", "tca"),
            Document::new("tca-002", "Effects", "Effects run asynchronous work.", "tca")
                .with_enforcement(EnforcementLevel::Required),
            Document::new("vos-001", "SharePlay", "Start a GroupSession.", "shareplay"),
        ])
    }

    #[tokio::test]
    async fn test_search_ranks_by_overlap() {
        let results = store().search("reducer effect").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "tca-001");
        assert_eq!(results[1].id, "tca-002");
    }

    #[tokio::test]
    async fn test_search_without_terms_is_empty() {
        assert!(store().search("the a an").await.unwrap().is_empty());
        assert!(store().search("navigation").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_by_category_normalized() {
        let store = store();
        assert_eq!(store.by_category(" TCA ").await.unwrap().len(), 2);
        assert!(store.by_category("missing").await.unwrap().is_empty());

        store
            .upsert(Document::new("tca-003", "Scope", "Scope child features.", "tca"))
            .unwrap();
        assert_eq!(store.by_category("tca").await.unwrap().len(), 3);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let store = store();
        assert_eq!(store.get(" vos-001 ").await.unwrap().unwrap().title, "SharePlay");
        assert!(store.get("vos-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_static_source_matches_topics() {
        let source = StaticExternalSource::new()
            .with_answer(
                "groupsession",
                ExternalResult::new("GroupSession coordinates participants.\n\nCall join() to start.")
                    .with_citation(Citation::new("GroupSession", "https://developer.apple.com/documentation/groupactivities/groupsession").authoritative()),
            )
            .with_answer("immersive space", ExternalResult::new("Open an ImmersiveSpace."));

        let brief = source
            .search("How does a GroupSession work?", SearchKind::Reference, Verbosity::Brief)
            .await
            .unwrap();
        assert_eq!(brief.content, "GroupSession coordinates participants.");
        assert_eq!(brief.citations.len(), 1);

        let full = source
            .search("groupsession in an immersive space", SearchKind::Example, Verbosity::Detailed)
            .await
            .unwrap();
        assert!(full.content.contains("join()"));
        assert!(full.content.contains("ImmersiveSpace"));

        let none = source
            .search("reducer", SearchKind::Concept, Verbosity::Standard)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_pattern_store_domain_filter_and_duplicates() {
        let store = InMemoryPatternStore::new();
        let p = Pattern::new("single-writer", "shared-state", "Use a single writer", PatternSource::official("Docs"), 5).unwrap();
        store.insert_pattern(p.clone()).await.unwrap();
        assert!(store.insert_pattern(p).await.is_err());

        let other = Pattern::new("nav", "navigation", "Use stack navigation", PatternSource::community("Forum"), 2).unwrap();
        store.insert_pattern(other).await.unwrap();

        assert_eq!(store.patterns_by_domain("Shared-State").await.unwrap().len(), 1);
        assert_eq!(store.len(), 2);
    }
}

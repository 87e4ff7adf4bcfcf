//! The retrieval engine: corpus, fitted index and search backend, built
//! once and then read-only.
//!
//! [`NewsletterIndex`] holds no interior mutability. The application wraps
//! it in an `Arc` and shares it across request handlers without locks.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::corpus::{build_chunks, parse_records};
use crate::error::Result;
use crate::models::{Chunk, ChunkKind, MonthRecord, Sourced};
use crate::search::{provenance, select_backend, Backend, NearestNeighborSearch};
use crate::tfidf::TfIdfIndex;

/// One search result, borrowing the chunk it came from.
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    /// Cosine similarity in `[0, 1]`.
    pub score: f32,
    pub chunk: &'a Chunk,
    pub provenance: String,
}

impl SearchHit<'_> {
    pub fn text(&self) -> &str {
        self.chunk.text()
    }

    pub fn kind(&self) -> ChunkKind {
        self.chunk.kind()
    }
}

impl Serialize for SearchHit<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SearchHit", 6)?;
        state.serialize_field("score", &self.score)?;
        state.serialize_field("text", self.chunk.text())?;
        state.serialize_field("kind", &self.chunk.kind())?;
        match self.chunk.category() {
            Some(category) => state.serialize_field("category", category)?,
            None => state.skip_field("category")?,
        }
        state.serialize_field("structured_payload", self.chunk.payload())?;
        state.serialize_field("provenance", &self.provenance)?;
        state.end()
    }
}

/// Frozen corpus plus its TF-IDF index and search backend.
pub struct NewsletterIndex {
    months: Vec<Sourced<MonthRecord>>,
    chunks: Vec<Chunk>,
    tfidf: TfIdfIndex,
    backend: Box<dyn NearestNeighborSearch>,
}

impl NewsletterIndex {
    /// Build the corpus and fit the index.
    ///
    /// Fails only when `data` is not a valid newsletter mapping. An input
    /// with no usable sections yields an index that is not ready and answers
    /// every query with no results.
    pub fn initialize(data: &Value, freetext: Option<&str>, backend: Backend) -> Result<Self> {
        let records = parse_records(data)?;
        let chunks = build_chunks(&records, freetext);
        let texts: Vec<&str> = chunks.iter().map(Chunk::text).collect();
        let tfidf = TfIdfIndex::fit(&texts);
        let backend = select_backend(backend, &tfidf);

        if chunks.is_empty() {
            tracing::warn!("corpus is empty; every query will return no results");
        }
        tracing::info!(
            chunks = chunks.len(),
            vocabulary = tfidf.dims(),
            backend = backend.name(),
            "newsletter index ready"
        );

        Ok(Self {
            months: records.months,
            chunks,
            tfidf,
            backend,
        })
    }

    /// Up to `top_k` hits for `query`, best first.
    ///
    /// Empty or whitespace-only queries and an empty corpus return nothing.
    /// Queries sharing no terms with the corpus return score-0 hits; callers
    /// decide whether those count as relevant.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit<'_>> {
        if query.trim().is_empty() || self.chunks.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let qv = self.tfidf.project(query);
        self.backend
            .top_k(&qv, top_k)
            .into_iter()
            .filter_map(|(row, score)| {
                self.chunks.get(row).map(|chunk| SearchHit {
                    score,
                    chunk,
                    provenance: provenance(chunk),
                })
            })
            .collect()
    }

    /// False when the corpus is empty.
    pub fn is_ready(&self) -> bool {
        !self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.tfidf.dims()
    }

    pub fn months(&self) -> &[Sourced<MonthRecord>] {
        &self.months
    }

    pub fn month_count(&self) -> usize {
        self.months.len()
    }

    /// Month names in file order.
    pub fn list_months(&self) -> Vec<&str> {
        self.months.iter().map(|m| m.month.as_str()).collect()
    }

    /// Case-insensitive lookup by month name, ignoring surrounding whitespace.
    pub fn get_month(&self, name: &str) -> Option<&Sourced<MonthRecord>> {
        let target = name.trim().to_lowercase();
        self.months.iter().find(|m| m.month.to_lowercase() == target)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn using_flat_index(&self) -> bool {
        self.backend.name() == "flat_index"
    }
}

impl std::fmt::Debug for NewsletterIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsletterIndex")
            .field("chunks", &self.chunks.len())
            .field("months", &self.months.len())
            .field("vocabulary", &self.tfidf.dims())
            .field("backend", &self.backend.name())
            .finish()
    }
}

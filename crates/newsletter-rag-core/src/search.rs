//! Nearest-neighbor search over the fitted TF-IDF matrix.
//!
//! Two interchangeable backends implement [`NearestNeighborSearch`]:
//!
//! | Backend | Algorithm |
//! |---------|-----------|
//! | [`BruteForceSearch`] | cosine similarity against every row |
//! | [`FlatInnerProductIndex`] | exact inner product over L2-normalized rows (`flat-index` feature) |
//!
//! Both return the same ranking. Results are sorted by score descending
//! with a stable sort, so equal scores keep corpus order. Scores are
//! clamped to `[0, 1]`.
//!
//! Whether the flat index is available is a build-time capability exposed
//! at runtime through [`flat_index_available`]; requesting it when it is
//! missing falls back to brute force.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Chunk, ChunkPayload};
use crate::tfidf::TfIdfIndex;

/// A top-k search over the rows of a fitted matrix.
pub trait NearestNeighborSearch: Send + Sync {
    /// Short backend identifier (e.g. `"brute_force"`).
    fn name(&self) -> &'static str;

    /// Return up to `k` `(row, score)` pairs, best first.
    fn top_k(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;
}

/// Which backend to serve queries with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Flat index when compiled in, brute force otherwise.
    #[default]
    Auto,
    BruteForce,
    FlatIndex,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Backend::Auto),
            "brute_force" => Ok(Backend::BruteForce),
            "flat_index" => Ok(Backend::FlatIndex),
            other => Err(format!(
                "Unknown search backend: '{}'. Use auto, brute_force, or flat_index.",
                other
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Auto => "auto",
            Backend::BruteForce => "brute_force",
            Backend::FlatIndex => "flat_index",
        })
    }
}

/// True when the exact inner-product index was compiled in.
pub fn flat_index_available() -> bool {
    cfg!(feature = "flat-index")
}

/// Build the backend for `preference` over a fitted index.
pub fn select_backend(preference: Backend, index: &TfIdfIndex) -> Box<dyn NearestNeighborSearch> {
    match preference {
        Backend::BruteForce => Box::new(BruteForceSearch::new(index)),
        Backend::Auto | Backend::FlatIndex => {
            #[cfg(feature = "flat-index")]
            {
                Box::new(FlatInnerProductIndex::new(index))
            }
            #[cfg(not(feature = "flat-index"))]
            {
                if preference == Backend::FlatIndex {
                    tracing::warn!("flat index not compiled in; using brute-force search");
                }
                Box::new(BruteForceSearch::new(index))
            }
        }
    }
}

/// Linear scan computing cosine similarity against every row.
pub struct BruteForceSearch {
    weights: Vec<f32>,
    dims: usize,
    rows: usize,
}

impl BruteForceSearch {
    pub fn new(index: &TfIdfIndex) -> Self {
        Self {
            weights: index.weights().to_vec(),
            dims: index.dims(),
            rows: index.rows(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn name(&self) -> &'static str {
        "brute_force"
    }

    fn top_k(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.rows == 0 || query.len() != self.dims {
            return Vec::new();
        }
        let scores: Vec<f32> = (0..self.rows)
            .map(|i| cosine_similarity(&self.weights[i * self.dims..(i + 1) * self.dims], query))
            .collect();
        rank(scores, k)
    }
}

/// Exact inner-product index over L2-normalized rows.
#[cfg(feature = "flat-index")]
pub struct FlatInnerProductIndex {
    matrix: ndarray::Array2<f32>,
}

#[cfg(feature = "flat-index")]
impl FlatInnerProductIndex {
    pub fn new(index: &TfIdfIndex) -> Self {
        let mut matrix =
            ndarray::Array2::from_shape_vec((index.rows(), index.dims()), index.weights().to_vec())
                .unwrap_or_else(|_| ndarray::Array2::zeros((0, 0)));
        for mut row in matrix.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|x| x / norm);
            }
        }
        Self { matrix }
    }
}

#[cfg(feature = "flat-index")]
impl NearestNeighborSearch for FlatInnerProductIndex {
    fn name(&self) -> &'static str {
        "flat_index"
    }

    fn top_k(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.matrix.nrows() == 0 || query.len() != self.matrix.ncols() {
            return Vec::new();
        }
        let mut q = ndarray::Array1::from(query.to_vec());
        let norm = q.dot(&q).sqrt();
        if norm > 0.0 {
            q.mapv_inplace(|x| x / norm);
        }
        rank(self.matrix.dot(&q).to_vec(), k)
    }
}

/// Cosine similarity; `0.0` when either vector has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Stable descending sort of row scores, truncated to `k`.
fn rank(scores: Vec<f32>, k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores
        .into_iter()
        .map(|s| if s.is_nan() { 0.0 } else { s.clamp(0.0, 1.0) })
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(k);
    ranked
}

/// Short identifier of the record a chunk came from.
pub fn provenance(chunk: &Chunk) -> String {
    match chunk.payload() {
        ChunkPayload::Month(m) => format!("official_newsletter::{}", m.month),
        ChunkPayload::DirectorMessage(_) => "official_newsletter::director_message".to_string(),
        ChunkPayload::Technical(_) => "official_newsletter::technical_developments".to_string(),
        ChunkPayload::Kpi { category, .. } => format!("official_newsletter::kpi_{}", category),
        ChunkPayload::StateEngagement(_) => "official_newsletter::state_engagement".to_string(),
        ChunkPayload::Rvsk(_) | ChunkPayload::DetailedContext => {
            "official_newsletter::general".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::build_corpus;
    use serde_json::json;

    fn docs() -> Vec<&'static str> {
        vec![
            "apple mango orchard",
            "zebra savanna",
            "apple zebra",
            "apple mango orchard",
        ]
    }

    #[test]
    fn test_brute_force_ranks_best_match_first() {
        let index = TfIdfIndex::fit(&docs());
        let search = BruteForceSearch::new(&index);
        let hits = search.top_k(&index.project("zebra savanna"), 2);
        assert_eq!(hits[0].0, 1);
        assert!((hits[0].1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let index = TfIdfIndex::fit(&docs());
        let search = BruteForceSearch::new(&index);
        let hits = search.top_k(&index.project("orchard"), 4);
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 3);
        assert!((hits[0].1 - hits[1].1).abs() < 1e-6);
    }

    #[test]
    fn test_zero_query_scores_zero_in_corpus_order() {
        let index = TfIdfIndex::fit(&docs());
        let search = BruteForceSearch::new(&index);
        let hits = search.top_k(&index.project("lunar colonization"), 3);
        let rows: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(rows, vec![0, 1, 2]);
        assert!(hits.iter().all(|h| h.1 == 0.0));
    }

    #[test]
    fn test_k_larger_than_corpus() {
        let index = TfIdfIndex::fit(&docs());
        let search = BruteForceSearch::new(&index);
        assert_eq!(search.top_k(&index.project("apple"), 50).len(), 4);
    }

    #[cfg(feature = "flat-index")]
    #[test]
    fn test_backends_agree() {
        let index = TfIdfIndex::fit(&docs());
        let brute = BruteForceSearch::new(&index);
        let flat = FlatInnerProductIndex::new(&index);
        for q in ["apple", "zebra savanna", "orchard mango apple", "nothing here", ""] {
            let qv = index.project(q);
            let a = brute.top_k(&qv, 4);
            let b = flat.top_k(&qv, 4);
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(&b) {
                assert_eq!(x.0, y.0, "rank mismatch for {:?}", q);
                assert!((x.1 - y.1).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_select_backend() {
        let index = TfIdfIndex::fit(&docs());
        assert_eq!(select_backend(Backend::BruteForce, &index).name(), "brute_force");
        let auto = select_backend(Backend::Auto, &index).name();
        if flat_index_available() {
            assert_eq!(auto, "flat_index");
        } else {
            assert_eq!(auto, "brute_force");
        }
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("flat_index".parse::<Backend>().unwrap(), Backend::FlatIndex);
        assert_eq!("brute_force".parse::<Backend>().unwrap(), Backend::BruteForce);
        assert!("faiss".parse::<Backend>().is_err());
    }

    #[test]
    fn test_provenance() {
        let data = json!({
            "director_message": {"message": "hello"},
            "months": [{"month": "April 2025"}],
            "technical_developments": {"dashboard_features": ["x"]},
            "key_performance_indicators": {"learning_outcomes": {"fln": "78%"}},
            "state_engagement": {"correspondence_summary": {"mou_signed": 30}},
            "rvsk_data": {"launch_date": "2023"}
        });
        let chunks = build_corpus(&data, None).unwrap();
        let sources: Vec<String> = chunks.iter().map(provenance).collect();
        assert_eq!(
            sources,
            vec![
                "official_newsletter::director_message",
                "official_newsletter::April 2025",
                "official_newsletter::technical_developments",
                "official_newsletter::kpi_learning_outcomes",
                "official_newsletter::state_engagement",
                "official_newsletter::general",
                "official_newsletter::general",
                "official_newsletter::general",
            ]
        );
    }
}

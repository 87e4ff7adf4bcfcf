//! # Newsletter RAG Core
//!
//! Retrieval engine for the newsletter question-answering service: typed
//! newsletter records, the corpus builder, a TF-IDF term-weighting index,
//! and cosine-similarity search over it.
//!
//! This crate does no filesystem or network I/O. The application crate
//! reads the source files and hands their contents to
//! [`engine::NewsletterIndex::initialize`].

pub mod corpus;
pub mod engine;
pub mod error;
pub mod models;
pub mod search;
pub mod tfidf;

pub use engine::{NewsletterIndex, SearchHit};
pub use error::CorpusError;
pub use models::{Chunk, ChunkKind, ChunkPayload};
pub use search::Backend;

//! # Newsletter RAG
//!
//! Question answering over monthly education newsletter records.
//!
//! The retrieval engine lives in the `newsletter-rag-core` crate. This crate
//! adds everything around it: configuration, loading the source files,
//! answer formatting, optional narrative generation through Ollama, the
//! `nrag` CLI and the HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ JSON records │──▶│ Corpus chunks│──▶│ TF-IDF index │
//! │ + free text  │   │              │   │ (frozen)     │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │
//!                          ┌───────────────────┤
//!                          ▼                   ▼
//!                     ┌──────────┐       ┌──────────┐
//!                     │   CLI    │       │   HTTP   │
//!                     │  (nrag)  │       │  (axum)  │
//!                     └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and validation |
//! | [`loader`] | Read source files and build the index |
//! | [`answer`] | Format search hits into a templated answer |
//! | [`llm`] | Optional Ollama narrative client |
//! | [`server`] | HTTP API |
//! | [`search`] | `nrag search` output |

pub mod answer;
pub mod config;
pub mod llm;
pub mod loader;
pub mod search;
pub mod server;

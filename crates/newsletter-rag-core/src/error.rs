use thiserror::Error;

/// Failures while turning the structured source into a corpus.
///
/// Any of these aborts initialization; no partial corpus is built.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Invalid corpus input: {0}")]
    InvalidCorpusInput(String),
}

pub type Result<T> = std::result::Result<T, CorpusError>;

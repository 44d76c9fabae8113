//! Explicitly owned wrapper around an embedding backend.
//!
//! A `VectorSpace` is constructed once by the caller and passed by reference
//! into query building, ontology construction and ingestion. There is no
//! process-wide model instance.
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::traits::Embedder;

#[derive(Clone)]
pub struct VectorSpace {
    backend: Arc<dyn Embedder>,
}

impl VectorSpace {
    pub fn new(backend: Arc<dyn Embedder>) -> Self { Self { backend } }

    pub fn dim(&self) -> usize { self.backend.dim() }

    /// Embed one piece of text. Empty input, backend failures, vectors of the
    /// wrong width and NaN or infinite components surface as
    /// `EmbeddingUnavailable`.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::EmbeddingUnavailable { text: text.to_string(), reason: "empty text".to_string() });
        }
        let vector = self.backend.embed_text(text).map_err(|e| Error::EmbeddingUnavailable {
            text: text.to_string(),
            reason: e.to_string(),
        })?;
        self.check_width(text, vector)
    }

    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(empty) = texts.iter().find(|t| t.trim().is_empty()) {
            return Err(Error::EmbeddingUnavailable { text: empty.clone(), reason: "empty text".to_string() });
        }
        let vectors = self.backend.embed_batch(texts).map_err(|e| Error::EmbeddingUnavailable {
            text: texts.join(" | "),
            reason: e.to_string(),
        })?;
        if vectors.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable {
                text: texts.join(" | "),
                reason: format!("backend returned {} vectors for {} texts", vectors.len(), texts.len()),
            });
        }
        texts.iter().zip(vectors).map(|(t, v)| self.check_width(t, v)).collect()
    }

    fn check_width(&self, text: &str, vector: Vec<f32>) -> Result<Vec<f32>> {
        if vector.len() != self.dim() {
            return Err(Error::EmbeddingUnavailable {
                text: text.to_string(),
                reason: format!("expected dimension {}, got {}", self.dim(), vector.len()),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::EmbeddingUnavailable { text: text.to_string(), reason: "non-finite vector component".to_string() });
        }
        Ok(vector)
    }
}

impl std::fmt::Debug for VectorSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorSpace").field("dim", &self.dim()).finish()
    }
}

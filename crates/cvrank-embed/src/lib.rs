//! Embedding backends behind `cvrank_core::traits::Embedder`.
//!
//! `HashEmbedder` is always available. The XLM-RoBERTa model backend needs the
//! `model` feature (plus `metal` for Apple GPUs).
use std::sync::Arc;

use cvrank_core::config::{EmbeddingBackend, Settings};
use cvrank_core::{Error, Result, VectorSpace};

mod hash;
pub use hash::HashEmbedder;

#[cfg(feature = "model")]
mod model;
#[cfg(feature = "model")]
pub mod pool;
#[cfg(feature = "model")]
mod tokenize;
#[cfg(feature = "model")]
pub use model::BgeEmbedder;

/// Build the `VectorSpace` the settings ask for.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hash backend regardless of settings.
pub fn vector_space_from_settings(settings: &Settings) -> Result<VectorSpace> {
    let force_hash = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let backend = if force_hash { EmbeddingBackend::Hash } else { settings.embedding.backend };
    match backend {
        EmbeddingBackend::Hash => {
            tracing::info!(dim = settings.embedding.dim, "using hash embedder");
            Ok(VectorSpace::new(Arc::new(HashEmbedder::new(settings.embedding.dim))))
        }
        EmbeddingBackend::Model => model_space(settings),
    }
}

#[cfg(feature = "model")]
fn model_space(settings: &Settings) -> Result<VectorSpace> {
    let dir = settings
        .model_dir()
        .ok_or_else(|| Error::InvalidConfig("embedding.model_dir is required for the model backend".to_string()))?;
    let model = BgeEmbedder::load(&dir, settings.embedding.max_len)
        .map_err(|e| Error::EmbeddingUnavailable { text: dir.display().to_string(), reason: e.to_string() })?;
    Ok(VectorSpace::new(Arc::new(model)))
}

#[cfg(not(feature = "model"))]
fn model_space(_settings: &Settings) -> Result<VectorSpace> {
    Err(Error::InvalidConfig("the model backend requires building cvrank-embed with the `model` feature".to_string()))
}

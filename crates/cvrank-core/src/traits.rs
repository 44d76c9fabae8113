/// A text embedding backend.
///
/// Backends report failures as `anyhow` errors; `VectorSpace` turns them into
/// `Error::EmbeddingUnavailable` so the engine never sees an untyped failure.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use cvrank_core::traits::Embedder;

/// Deterministic bag-of-tokens embedder.
///
/// Every lowercased whitespace token is hashed into one of `dim` buckets; the
/// result is L2-normalised. Texts sharing tokens have positive cosine, the
/// same text always maps to the same vector. Used for tests, demos and
/// offline runs where no model weights are present.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if token.is_empty() { continue; }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            anyhow::bail!("no tokens to embed");
        }
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

    #[test]
    fn unit_length_and_deterministic() {
        let e = HashEmbedder::new(64);
        let a = e.embed_text("Python developer").unwrap();
        let b = e.embed_text("Python developer").unwrap();
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let e = HashEmbedder::new(64);
        assert_eq!(e.embed_text("SQL,").unwrap(), e.embed_text("sql").unwrap());
    }

    #[test]
    fn punctuation_only_fails() {
        assert!(HashEmbedder::new(8).embed_text("-- !!").is_err());
    }
}

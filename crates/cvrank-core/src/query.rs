//! Weighted query terms.
//!
//! Each term embeds at most once per `QuerySpec`: the vector is cached on the
//! term the first time a strategy asks for it and dropped again only when the
//! term itself changes.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::space::VectorSpace;

#[derive(Debug, Clone, Serialize)]
pub struct QueryTerm {
    pub term: String,
    pub weight: f32,
    #[serde(skip)]
    embedding: Option<Vec<f32>>,
}

impl QueryTerm {
    pub fn is_embedded(&self) -> bool { self.embedding.is_some() }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QuerySpec {
    terms: Vec<QueryTerm>,
}

fn check_weight(term: &str, weight: f32) -> Result<()> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(Error::InvalidQuery(format!("weight for '{term}' must be positive, got {weight}")));
    }
    Ok(())
}

impl QuerySpec {
    /// Build from `(term, weight)` pairs. Terms must be non-empty and unique,
    /// weights positive.
    pub fn new<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let mut query = Self::default();
        for (term, weight) in pairs {
            query.push(term.into(), weight)?;
        }
        if query.terms.is_empty() {
            return Err(Error::InvalidQuery("query has no terms".to_string()));
        }
        Ok(query)
    }

    /// Every term weighted 1.0.
    pub fn literal<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(terms.into_iter().map(|t| (t, 1.0)))
    }

    /// One weight-1 term per ontology label, in label order.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        Self::literal(labels.iter().map(|l| l.as_ref().to_string()))
    }

    fn push(&mut self, term: String, weight: f32) -> Result<()> {
        let term = term.trim().to_string();
        if term.is_empty() {
            return Err(Error::InvalidQuery("empty query term".to_string()));
        }
        check_weight(&term, weight)?;
        if self.position(&term).is_some() {
            return Err(Error::InvalidQuery(format!("duplicate query term '{term}'")));
        }
        self.terms.push(QueryTerm { term, weight, embedding: None });
        Ok(())
    }

    fn position(&self, term: &str) -> Option<usize> { self.terms.iter().position(|t| t.term == term) }

    pub fn len(&self) -> usize { self.terms.len() }
    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
    pub fn terms(&self) -> &[QueryTerm] { &self.terms }
    pub fn words(&self) -> Vec<&str> { self.terms.iter().map(|t| t.term.as_str()).collect() }
    pub fn weights(&self) -> Vec<f32> { self.terms.iter().map(|t| t.weight).collect() }
    pub fn weight_sum(&self) -> f32 { self.terms.iter().map(|t| t.weight).sum() }

    pub fn set_weight(&mut self, term: &str, weight: f32) -> Result<()> {
        check_weight(term, weight)?;
        let idx = self.position(term).ok_or_else(|| Error::NotFound(format!("query term '{term}'")))?;
        tracing::debug!(term, from = self.terms[idx].weight, to = weight, "query weight updated");
        self.terms[idx].weight = weight;
        Ok(())
    }

    /// Replace a term's text, keeping its weight. The cached vector is dropped.
    pub fn rename_term(&mut self, old: &str, new: &str) -> Result<()> {
        let new = new.trim();
        if new.is_empty() {
            return Err(Error::InvalidQuery("empty query term".to_string()));
        }
        let idx = self.position(old).ok_or_else(|| Error::NotFound(format!("query term '{old}'")))?;
        if old != new && self.position(new).is_some() {
            return Err(Error::InvalidQuery(format!("duplicate query term '{new}'")));
        }
        let t = &mut self.terms[idx];
        t.term = new.to_string();
        t.embedding = None;
        Ok(())
    }

    /// Embed every term that has no cached vector yet. The first embedding
    /// failure aborts the call; vectors cached before it are kept.
    pub fn embed(&mut self, space: &VectorSpace) -> Result<()> {
        for t in self.terms.iter_mut().filter(|t| t.embedding.is_none()) {
            let v = space.embed(&t.term)?;
            tracing::debug!(term = %t.term, "query term embedded");
            t.embedding = Some(v);
        }
        Ok(())
    }

    /// Cached vectors in term order.
    pub fn vectors(&self) -> Result<Vec<&[f32]>> {
        self.terms
            .iter()
            .map(|t| {
                t.embedding
                    .as_deref()
                    .ok_or_else(|| Error::InvalidQuery(format!("term '{}' has not been embedded", t.term)))
            })
            .collect()
    }

    /// Weighted average of per-term values: `Σ(vᵢ·wᵢ) / Σwᵢ`.
    pub fn weighted_average(&self, values: &[f32]) -> Result<f32> {
        if values.len() != self.terms.len() {
            return Err(Error::InvalidQuery(format!("{} values for {} terms", values.len(), self.terms.len())));
        }
        let total = self.weight_sum();
        if total <= 0.0 {
            return Err(Error::InvalidQuery("weights sum to zero".to_string()));
        }
        Ok(values.iter().zip(&self.terms).map(|(v, t)| v * t.weight).sum::<f32>() / total)
    }
}

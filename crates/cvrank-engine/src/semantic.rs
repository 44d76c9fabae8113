//! Dense-embedding strategy: weighted average of best-chunk similarities.
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use cvrank_core::{CandidateRecord, QuerySpec, Result};

use crate::rank::Scores;
use crate::Exclusion;

#[derive(Debug, Clone, Default)]
pub struct SemanticScores {
    /// Raw weighted averages in `[-1, 1]`, in candidate order.
    pub scores: Scores,
    pub excluded: Vec<Exclusion>,
}

fn score_one(record: &CandidateRecord, query: &QuerySpec, vectors: &[&[f32]]) -> Result<f32> {
    let sims = record.match_fragments(vectors)?;
    query.weighted_average(&sims)
}

#[cfg_attr(feature = "parallel", allow(dead_code))]
fn outcomes_serial(candidates: &[&CandidateRecord], query: &QuerySpec, vectors: &[&[f32]]) -> Vec<Result<f32>> {
    candidates.iter().map(|r| score_one(r, query, vectors)).collect()
}

/// Same outcomes as the serial loop, in the same candidate order.
#[cfg(feature = "parallel")]
fn outcomes_parallel(candidates: &[&CandidateRecord], query: &QuerySpec, vectors: &[&[f32]]) -> Vec<Result<f32>> {
    candidates.par_iter().map(|r| score_one(r, query, vectors)).collect()
}

/// Score every candidate. Unscorable candidates are reported in `excluded`;
/// any other failure aborts the query.
pub fn score(candidates: &[&CandidateRecord], query: &QuerySpec, vectors: &[&[f32]]) -> Result<SemanticScores> {
    #[cfg(feature = "parallel")]
    let outcomes = outcomes_parallel(candidates, query, vectors);
    #[cfg(not(feature = "parallel"))]
    let outcomes = outcomes_serial(candidates, query, vectors);

    let mut out = SemanticScores::default();
    for (record, outcome) in candidates.iter().zip(outcomes) {
        match outcome {
            Ok(s) => out.scores.push((record.id().to_string(), s)),
            Err(e) if !e.is_fatal() => {
                tracing::warn!(id = record.id(), error = %e, "candidate excluded from semantic scoring");
                out.excluded.push(Exclusion { id: record.id().to_string(), reason: e.to_string() });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

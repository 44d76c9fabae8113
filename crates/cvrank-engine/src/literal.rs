//! Keyword strategy: binary, case-insensitive presence of each term.
use serde::Serialize;

use cvrank_core::types::CandidateId;
use cvrank_core::CandidateRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermHit {
    pub term: String,
    pub hit: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralScore {
    pub hits: Vec<TermHit>,
    /// Number of matched terms. Never weighted or averaged.
    pub total: u32,
}

pub fn score_one<S: AsRef<str>>(record: &CandidateRecord, terms: &[S]) -> LiteralScore {
    let hits: Vec<TermHit> = record.match_literal(terms).into_iter().map(|(term, hit)| TermHit { term, hit }).collect();
    let total = hits.iter().map(|h| u32::from(h.hit)).sum();
    LiteralScore { hits, total }
}

pub fn score<S: AsRef<str>>(candidates: &[&CandidateRecord], terms: &[S]) -> Vec<(CandidateId, LiteralScore)> {
    candidates.iter().map(|r| (r.id().to_string(), score_one(r, terms))).collect()
}

//! Ranking of candidate resumes under three strategies: semantic (best-chunk
//! cosine, weighted by term), literal (case-insensitive term presence) and
//! ontology (nearest-label lookup in a proficiency matrix).
use serde::Serialize;

pub mod engine;
pub mod literal;
pub mod ontology;
pub mod rank;
pub mod semantic;
pub mod strategy;

pub use engine::{LabelScore, MatchDetail, RankRequest, RankedCandidate, Ranking, ScoringEngine};
pub use ontology::{CellScale, OntologyMatrix, RawTable};
pub use strategy::{Strategy, StrategyKind};

/// A candidate left out of a ranking, with the reason it could not be scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub id: String,
    pub reason: String,
}

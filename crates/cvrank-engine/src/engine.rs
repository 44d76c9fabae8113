use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use cvrank_core::types::CandidateId;
use cvrank_core::{CandidateMetadata, CandidateRecord, CandidateSet, Error, QuerySpec, Result, TopN, VectorSpace};

use crate::literal::{self, LiteralScore, TermHit};
use crate::ontology::{OntologyMatrix, ResolvedTerm};
use crate::rank::{normalize, sort_by_score_desc, top_n};
use crate::semantic::{self, SemanticScores};
use crate::strategy::{Strategy, StrategyKind};
use crate::Exclusion;

/// Which candidates a ranking covers and how many it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankRequest {
    pub category: Option<String>,
    pub top: TopN,
}

impl RankRequest {
    pub fn new(top: TopN) -> Self { Self { category: None, top } }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl Default for RankRequest {
    fn default() -> Self { Self::new(TopN::All) }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelScore {
    pub term: String,
    pub label: String,
    pub similarity: f32,
    pub proficiency: u8,
}

/// Strategy-specific breakdown kept alongside the scalar score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum MatchDetail {
    Semantic { raw_score: f32 },
    Literal { hits: Vec<TermHit> },
    Ontology { labels: Vec<LabelScore> },
}

/// A score not yet attached to its candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub id: CandidateId,
    pub score: f32,
    pub detail: MatchDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub id: CandidateId,
    pub score: f32,
    pub name: String,
    pub category: Option<String>,
    pub body: String,
    pub metadata: CandidateMetadata,
    pub detail: MatchDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub strategy: StrategyKind,
    pub entries: Vec<RankedCandidate>,
    pub excluded: Vec<Exclusion>,
}

impl Ranking {
    pub fn ids(&self) -> Vec<&str> { self.entries.iter().map(|e| e.id.as_str()).collect() }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[derive(Debug, Clone, Default)]
pub struct OntologyScores {
    pub resolved: Vec<ResolvedTerm>,
    /// Rows in multi-key order; `score` is the proficiency under the first label.
    pub entries: Vec<Scored>,
    pub excluded: Vec<Exclusion>,
}

/// Scores a candidate set against queries. Holds only borrows; every call
/// builds its own results and leaves the candidates untouched.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine<'a> {
    candidates: &'a CandidateSet,
    space: &'a VectorSpace,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(candidates: &'a CandidateSet, space: &'a VectorSpace) -> Self { Self { candidates, space } }

    pub fn candidates(&self) -> &'a CandidateSet { self.candidates }

    fn index(&self) -> HashMap<&'a str, &'a CandidateRecord> {
        self.candidates.iter().map(|r| (r.id(), r)).collect()
    }

    /// Raw semantic scores in candidate order. Terms are embedded on first use.
    /// Fails before any scoring when the vector space and the stored
    /// fragments disagree on width.
    pub fn score_semantic(&self, query: &mut QuerySpec, category: Option<&str>) -> Result<SemanticScores> {
        if let Some(dim) = self.candidates.fragment_dim().filter(|d| *d != self.space.dim()) {
            return Err(Error::InvalidQuery(format!(
                "vector space has dimension {}, candidate fragments have {dim}",
                self.space.dim()
            )));
        }
        query.embed(self.space)?;
        let vectors = query.vectors()?;
        let scope = self.candidates.scope(category);
        semantic::score(&scope, query, &vectors)
    }

    pub fn score_literal(&self, query: &QuerySpec, category: Option<&str>) -> Vec<(CandidateId, LiteralScore)> {
        let scope = self.candidates.scope(category);
        literal::score(&scope, &query.words())
    }

    /// Resolve terms to matrix labels and order the matrix rows by them.
    /// A row naming a candidate the set does not hold is a hard error.
    pub fn score_ontology(&self, matrix: &OntologyMatrix, query: &mut QuerySpec, category: Option<&str>) -> Result<OntologyScores> {
        query.embed(self.space)?;
        let vectors = query.vectors()?;
        let resolved = matrix.resolve_terms(&query.words(), &vectors)?;
        let columns: Vec<usize> = resolved.iter().map(|r| r.column).collect();
        let primary = columns
            .first()
            .copied()
            .ok_or_else(|| Error::InvalidQuery("no query term resolved to a matrix label".to_string()))?;

        let index = self.index();
        let mut entries = Vec::new();
        for row in matrix.sort_rows(&columns) {
            let record = index.get(row.id.as_str()).ok_or_else(|| {
                Error::InconsistentState(format!("matrix '{}' has a row for unknown candidate '{}'", matrix.name(), row.id))
            })?;
            if category.is_some_and(|c| !record.in_category(c)) {
                continue;
            }
            let labels = resolved
                .iter()
                .map(|r| LabelScore {
                    term: r.term.clone(),
                    label: r.label.clone(),
                    similarity: r.similarity,
                    proficiency: row.values[r.column],
                })
                .collect();
            entries.push(Scored { id: row.id.clone(), score: f32::from(row.values[primary]), detail: MatchDetail::Ontology { labels } });
        }

        let row_ids: HashSet<&str> = matrix.rows().iter().map(|r| r.id.as_str()).collect();
        let excluded = self
            .candidates
            .scope(category)
            .into_iter()
            .filter(|r| !row_ids.contains(r.id()))
            .map(|r| {
                let e = Error::UnscorableCandidate { id: r.id().to_string(), reason: format!("no row in matrix '{}'", matrix.name()) };
                tracing::warn!(id = r.id(), error = %e, "candidate excluded from ontology scoring");
                Exclusion { id: r.id().to_string(), reason: e.to_string() }
            })
            .collect();

        Ok(OntologyScores { resolved, entries, excluded })
    }

    /// Attach candidate data to each score. A score for an id the set does not
    /// hold means the two have diverged and fails the whole call.
    pub fn enrich(&self, scored: Vec<Scored>) -> Result<Vec<RankedCandidate>> {
        let index = self.index();
        scored
            .into_iter()
            .map(|s| {
                let record = index
                    .get(s.id.as_str())
                    .ok_or_else(|| Error::InconsistentState(format!("scored candidate '{}' is not in the candidate set", s.id)))?;
                Ok(RankedCandidate {
                    id: s.id,
                    score: s.score,
                    name: record.name().to_string(),
                    category: record.category().map(str::to_string),
                    body: record.raw_text().to_string(),
                    metadata: record.metadata().clone(),
                    detail: s.detail,
                })
            })
            .collect()
    }

    /// Semantic ranking with every label of `matrix` as a weight-1 term:
    /// who fits this whole skill area.
    pub fn rank_matrix_labels(&self, matrix: &OntologyMatrix, request: &RankRequest) -> Result<Ranking> {
        let mut query = QuerySpec::from_labels(matrix.labels())?;
        tracing::debug!(matrix = matrix.name(), terms = query.len(), "ranking by matrix labels");
        self.rank(Strategy::Semantic, &mut query, request)
    }

    /// Score, normalise (semantic only), sort, cut to `request.top` and enrich.
    pub fn rank(&self, strategy: Strategy<'_>, query: &mut QuerySpec, request: &RankRequest) -> Result<Ranking> {
        let started = Instant::now();
        let category = request.category.as_deref();
        let (mut scored, excluded) = match strategy {
            Strategy::Semantic => {
                let SemanticScores { scores, excluded } = self.score_semantic(query, category)?;
                let normalized = normalize(&scores);
                let scored: Vec<Scored> = scores
                    .into_iter()
                    .zip(normalized)
                    .map(|((id, raw), (_, score))| Scored { id, score, detail: MatchDetail::Semantic { raw_score: raw } })
                    .collect();
                (scored, excluded)
            }
            Strategy::Literal => {
                let scored = self
                    .score_literal(query, category)
                    .into_iter()
                    .map(|(id, s)| Scored { id, score: s.total as f32, detail: MatchDetail::Literal { hits: s.hits } })
                    .collect();
                (scored, Vec::new())
            }
            Strategy::Ontology(matrix) => {
                let o = self.score_ontology(matrix, query, category)?;
                (o.entries, o.excluded)
            }
        };
        // Ontology rows arrive in multi-key order; a stable sort on the
        // primary key leaves that order intact.
        sort_by_score_desc(&mut scored, |s| s.score);
        let scored = top_n(scored, request.top)?;
        let entries = self.enrich(scored)?;

        tracing::info!(
            strategy = %strategy.kind(),
            terms = query.len(),
            returned = entries.len(),
            excluded = excluded.len(),
            "query ranked"
        );
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "ranking timing");
        Ok(Ranking { strategy: strategy.kind(), entries, excluded })
    }
}

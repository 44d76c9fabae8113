use std::sync::Arc;
use tempfile::TempDir;

use cvrank_core::traits::Embedder;
use cvrank_core::{CandidateMetadata, CandidateRecord, CandidateSet, ErrorKind, QuerySpec, TopN, VectorSpace};
use cvrank_embed::HashEmbedder;
use cvrank_engine::ontology::MatrixRow;
use cvrank_engine::{MatchDetail, OntologyMatrix, RankRequest, ScoringEngine, Strategy, StrategyKind};

/// Every text maps to the same vector.
struct Constant(Vec<f32>);
impl Embedder for Constant {
    fn dim(&self) -> usize { self.0.len() }
    fn embed_text(&self, _text: &str) -> anyhow::Result<Vec<f32>> { Ok(self.0.clone()) }
}

fn hash_space() -> VectorSpace { VectorSpace::new(Arc::new(HashEmbedder::new(256))) }

fn record(id: &str, name: &str, line: &str, body: &str, fragments: Vec<Vec<f32>>) -> CandidateRecord {
    CandidateRecord::new(id, CandidateMetadata::named(name).with_business_line(line), body, fragments).unwrap()
}

fn literal_set() -> CandidateSet {
    CandidateSet::from_records(vec![
        record("A01", "Ana", "PV", "Built SQL reports for safety data", vec![]),
        record("B01", "Bo", "PV", "Python and pandas", vec![]),
        record("C01", "Cy", "RA", "Oracle sql, PL/SQL tuning", vec![]),
    ])
    .unwrap()
}

#[test]
fn literal_sql_hits_a_and_c() {
    let (set, space) = (literal_set(), hash_space());
    let engine = ScoringEngine::new(&set, &space);
    let q = QuerySpec::literal(["SQL"]).unwrap();

    let raw: Vec<(String, u32)> = engine.score_literal(&q, None).into_iter().map(|(id, s)| (id, s.total)).collect();
    assert_eq!(raw, vec![("A01".to_string(), 1), ("B01".to_string(), 0), ("C01".to_string(), 1)]);

    let mut q = q;
    let ranking = engine.rank(Strategy::Literal, &mut q, &RankRequest::default()).unwrap();
    assert_eq!(ranking.strategy, StrategyKind::Literal);
    assert_eq!(ranking.ids(), vec!["A01", "C01", "B01"]);
    assert_eq!(ranking.entries[0].score, 1.0);
}

#[test]
fn literal_scores_are_sums_not_averages() {
    let (set, space) = (literal_set(), hash_space());
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::literal(["sql", "python", "pl/sql", "safety"]).unwrap();
    let ranking = engine.rank(Strategy::Literal, &mut q, &RankRequest::new(TopN::Count(2))).unwrap();
    assert_eq!(ranking.ids(), vec!["A01", "C01"]);
    assert_eq!(ranking.entries[0].score, 2.0);
    match &ranking.entries[1].detail {
        MatchDetail::Literal { hits } => {
            let flags: Vec<u8> = hits.iter().map(|h| h.hit).collect();
            assert_eq!(flags, vec![1, 0, 1, 0]);
        }
        other => panic!("unexpected detail {other:?}"),
    }
}

#[test]
fn literal_respects_category_filter() {
    let (set, space) = (literal_set(), hash_space());
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::literal(["sql"]).unwrap();
    let ranking = engine.rank(Strategy::Literal, &mut q, &RankRequest::default().in_category("PV")).unwrap();
    assert_eq!(ranking.ids(), vec!["A01", "B01"]);
    assert!(ranking.entries.iter().all(|e| e.category.as_deref() == Some("PV")));
}

#[test]
fn identical_fragments_tie_at_zero_in_input_order() {
    let space = hash_space();
    let v = space.embed("pharmacovigilance").unwrap();
    let set = CandidateSet::from_records(vec![
        record("X01", "First", "PV", "", vec![v.clone()]),
        record("Y01", "Second", "PV", "", vec![v]),
    ])
    .unwrap();
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::new([("pharmacovigilance", 1.0)]).unwrap();

    let raw = engine.score_semantic(&mut q, None).unwrap();
    assert!(raw.scores.iter().all(|(_, s)| (s - 1.0).abs() < 1e-5));

    let ranking = engine.rank(Strategy::Semantic, &mut q, &RankRequest::default()).unwrap();
    assert_eq!(ranking.ids(), vec!["X01", "Y01"]);
    assert!(ranking.entries.iter().all(|e| e.score == 0.0));
}

#[test]
fn semantic_scores_stay_in_cosine_range() {
    let space = hash_space();
    let chunks = |texts: &[&str]| texts.iter().map(|t| space.embed(t).unwrap()).collect::<Vec<_>>();
    let set = CandidateSet::from_records(vec![
        record("S01", "Ana", "PV", "", chunks(&["signal detection in argus", "team lead"])),
        record("S02", "Bo", "PV", "", chunks(&["clinical trial monitoring"])),
        record("S03", "Cy", "RA", "", chunks(&["regulatory submissions eCTD", "argus safety"])),
    ])
    .unwrap();
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::new([("signal detection", 3.0), ("argus", 1.0), ("eCTD", 0.5)]).unwrap();

    let raw = engine.score_semantic(&mut q, None).unwrap();
    assert_eq!(raw.scores.len(), 3);
    assert!(raw.scores.iter().all(|(_, s)| (-1.0..=1.0).contains(s)));

    let ranking = engine.rank(Strategy::Semantic, &mut q, &RankRequest::default()).unwrap();
    assert_eq!(ranking.ids()[0], "S01");
    assert_eq!(ranking.entries[0].score, 1.0);
    assert_eq!(ranking.entries[2].score, 0.0);
}

#[test]
fn empty_fragments_are_excluded_not_zeroed() {
    let space = VectorSpace::new(Arc::new(Constant(vec![1.0, 0.0])));
    let set = CandidateSet::from_records(vec![
        record("E01", "Has", "PV", "", vec![vec![0.0, 1.0]]),
        record("E02", "None", "PV", "", vec![]),
    ])
    .unwrap();
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::new([("anything", 1.0)]).unwrap();
    let ranking = engine.rank(Strategy::Semantic, &mut q, &RankRequest::default()).unwrap();
    assert_eq!(ranking.ids(), vec!["E01"]);
    assert_eq!(ranking.excluded.len(), 1);
    assert_eq!(ranking.excluded[0].id, "E02");
}

#[test]
fn unavailable_embedding_aborts_the_query() {
    let space = hash_space();
    let set = CandidateSet::from_records(vec![record("U01", "Ana", "PV", "", vec![space.embed("sql").unwrap()])]).unwrap();
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::new([("sql", 1.0), ("!!!", 1.0)]).unwrap();
    let err = engine.rank(Strategy::Semantic, &mut q, &RankRequest::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmbeddingUnavailable);
    assert!(err.is_fatal());
}

#[test]
fn space_and_fragment_width_mismatch_fails_before_scoring() {
    let space = VectorSpace::new(Arc::new(Constant(vec![1.0, 0.0, 0.0])));
    let set = CandidateSet::from_records(vec![
        record("W01", "Ana", "PV", "", vec![vec![1.0, 0.0]]),
        record("W02", "Bo", "PV", "", vec![vec![0.0, 1.0]]),
    ])
    .unwrap();
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::new([("sql", 1.0)]).unwrap();
    let err = engine.rank(Strategy::Semantic, &mut q, &RankRequest::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidQuery);
    let err = engine.rank(Strategy::Semantic, &mut q, &RankRequest::new(TopN::Count(1))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidQuery);
}

#[test]
fn top_n_bounds_on_rankings() {
    let space = hash_space();
    let set = CandidateSet::from_records(
        (1..=5).map(|i| record(&format!("T0{i}"), "n", "PV", &"sql ".repeat(i), vec![])).collect(),
    )
    .unwrap();
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::literal(["sql"]).unwrap();

    let err = engine.rank(Strategy::Literal, &mut q, &RankRequest::new(TopN::Count(0))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);
    let err = engine.rank(Strategy::Literal, &mut q, &RankRequest::new(TopN::Count(6))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);
    assert_eq!(engine.rank(Strategy::Literal, &mut q, &RankRequest::new(TopN::All)).unwrap().len(), 5);
    assert_eq!(engine.rank(Strategy::Literal, &mut q, &RankRequest::new(TopN::Count(3))).unwrap().len(), 3);
}

fn pv_set() -> CandidateSet {
    CandidateSet::from_records(vec![
        record("M01", "Ana", "PV", "", vec![]),
        record("M02", "Bo", "PV", "", vec![]),
        record("M03", "Cy", "RA", "", vec![]),
    ])
    .unwrap()
}

#[test]
fn ontology_tie_picks_first_column() {
    let space = VectorSpace::new(Arc::new(Constant(vec![0.6, 0.8])));
    let matrix = OntologyMatrix::from_parts(
        "PV",
        vec!["Argus".into(), "Argus Safety".into()],
        vec![vec![1.0, 0.0], vec![1.0, 0.0]],
        vec![
            MatrixRow { id: "M01".into(), values: vec![2, 5] },
            MatrixRow { id: "M02".into(), values: vec![4, 1] },
        ],
    )
    .unwrap();
    let set = pv_set();
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::new([("argus db", 1.0)]).unwrap();
    let ranking = engine.rank(Strategy::Ontology(&matrix), &mut q, &RankRequest::default()).unwrap();

    assert_eq!(ranking.ids(), vec!["M02", "M01"]);
    assert_eq!(ranking.entries[0].score, 4.0);
    match &ranking.entries[0].detail {
        MatchDetail::Ontology { labels } => {
            assert_eq!(labels.len(), 1);
            assert_eq!(labels[0].label, "Argus");
        }
        other => panic!("unexpected detail {other:?}"),
    }
    assert_eq!(ranking.excluded.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["M03"]);
}

#[test]
fn ontology_built_from_table_resolves_and_sorts() {
    let space = hash_space();
    let table: cvrank_engine::RawTable = serde_json::from_str(
        r#"{
            "labels": ["Signal detection", "Case processing", "Audit"],
            "rows": [
                {"id": "M01", "cells": ["3", "SI", "NA"]},
                {"id": "M02", "cells": ["5", "NO", "2"]},
                {"id": "M03", "cells": ["3", "5", "4"]}
            ]
        }"#,
    )
    .unwrap();
    let matrix = OntologyMatrix::build("PV", table, &space).unwrap();
    assert_eq!(matrix.labels(), ["Signal detection", "Case processing", "Audit"]);

    let set = pv_set();
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::new([("signal detection", 1.0), ("audit", 1.0)]).unwrap();
    let ranking = engine.rank(Strategy::Ontology(&matrix), &mut q, &RankRequest::default()).unwrap();
    assert_eq!(ranking.ids(), vec!["M02", "M03", "M01"]);
    assert!(ranking.excluded.is_empty());

    let filtered = engine.rank(Strategy::Ontology(&matrix), &mut q, &RankRequest::default().in_category("PV")).unwrap();
    assert_eq!(filtered.ids(), vec!["M02", "M01"]);
}

#[test]
fn ontology_row_for_unknown_candidate_is_inconsistent() {
    let space = VectorSpace::new(Arc::new(Constant(vec![1.0, 0.0])));
    let matrix = OntologyMatrix::from_parts(
        "PV",
        vec!["Argus".into()],
        vec![vec![1.0, 0.0]],
        vec![MatrixRow { id: "GONE".into(), values: vec![3] }],
    )
    .unwrap();
    let set = pv_set();
    let engine = ScoringEngine::new(&set, &space);
    let mut q = QuerySpec::new([("argus", 1.0)]).unwrap();
    let err = engine.rank(Strategy::Ontology(&matrix), &mut q, &RankRequest::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentState);
}

#[test]
fn matrix_snapshot_round_trip() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("matrix").join("pv.json");
    let matrix = OntologyMatrix::from_parts(
        "PV",
        vec!["Argus".into(), "Audit".into()],
        vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        vec![MatrixRow { id: "M01".into(), values: vec![3, 0] }],
    )
    .unwrap();
    matrix.save(&path).unwrap();
    let loaded = OntologyMatrix::load(&path).unwrap();
    assert_eq!(loaded.name(), "PV");
    assert_eq!(loaded.labels(), matrix.labels());
    assert_eq!(loaded.value("M01", "Argus"), Some(3));
    assert_eq!(OntologyMatrix::load(&tmp.path().join("missing.json")).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn matrix_labels_rank_candidates_semantically() {
    let space = hash_space();
    let labels = vec!["sql reporting".to_string(), "python".to_string()];
    let label_embeddings = space.embed_batch(&labels).unwrap();
    let matrix = OntologyMatrix::from_parts("DATA", labels, label_embeddings, vec![]).unwrap();
    let set = CandidateSet::from_records(vec![
        record("K01", "Ana", "PV", "", vec![space.embed("audit").unwrap()]),
        record("K02", "Bo", "PV", "", vec![space.embed("sql reporting").unwrap(), space.embed("python").unwrap()]),
        record("K03", "Cy", "RA", "", vec![]),
    ])
    .unwrap();
    let engine = ScoringEngine::new(&set, &space);

    let ranking = engine.rank_matrix_labels(&matrix, &RankRequest::default()).unwrap();
    assert_eq!(ranking.strategy, StrategyKind::Semantic);
    assert_eq!(ranking.ids(), vec!["K02", "K01"]);
    assert_eq!(ranking.entries[0].score, 1.0);
    match ranking.entries[0].detail {
        MatchDetail::Semantic { raw_score } => assert!((raw_score - 1.0).abs() < 1e-5),
        ref other => panic!("unexpected detail {other:?}"),
    }
    assert_eq!(ranking.excluded.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["K03"]);

    let pv = engine.rank_matrix_labels(&matrix, &RankRequest::new(TopN::Count(1)).in_category("PV")).unwrap();
    assert_eq!(pv.ids(), vec!["K02"]);
}

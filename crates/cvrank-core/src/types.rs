//! Candidate domain types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::similarity::cosine;

pub type CandidateId = String;
pub type Vector = Vec<f32>;

/// Identifiers shorter than this are rejected everywhere.
pub const MIN_ID_LEN: usize = 3;

pub fn validate_id(id: &str) -> Result<()> {
    if id.trim().chars().count() < MIN_ID_LEN {
        return Err(Error::InvalidRecord(format!("candidate id '{id}' must be at least {MIN_ID_LEN} characters")));
    }
    Ok(())
}

/// Person-level attributes attached to a resume.
///
/// `business_line` is the category used by filtered queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateMetadata {
    pub name: String,
    pub db_id: Option<i64>,
    pub email: Option<String>,
    pub resume_date: Option<NaiveDate>,
    pub document_name: Option<String>,
    pub status: Option<String>,
    pub years_experience: Option<f32>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub business_line: Option<String>,
    pub employment_type: Option<String>,
}

impl CandidateMetadata {
    pub fn named(name: impl Into<String>) -> Self { Self { name: name.into(), ..Self::default() } }

    pub fn with_business_line(mut self, line: impl Into<String>) -> Self {
        self.business_line = Some(line.into());
        self
    }
}

/// One person's resume: identity, metadata, raw body and its fragment vectors.
///
/// `fragments` may be empty; such a record is still valid for literal and
/// ontology scoring but is excluded from semantic scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    id: CandidateId,
    metadata: CandidateMetadata,
    #[serde(default)]
    fragments: Vec<Vector>,
    raw_text: String,
}

impl CandidateRecord {
    pub fn new(id: impl Into<String>, metadata: CandidateMetadata, raw_text: impl Into<String>, fragments: Vec<Vector>) -> Result<Self> {
        let record = Self { id: id.into(), metadata, fragments, raw_text: raw_text.into() };
        record.validate()?;
        Ok(record)
    }

    /// Checks the invariants `new` enforces; used again after deserialization.
    pub fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        if let Some(first) = self.fragments.first() {
            let dim = first.len();
            if dim == 0 || self.fragments.iter().any(|f| f.len() != dim) {
                return Err(Error::InvalidRecord(format!("candidate '{}' has fragments of inconsistent width", self.id)));
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn metadata(&self) -> &CandidateMetadata { &self.metadata }
    pub fn name(&self) -> &str { &self.metadata.name }
    pub fn category(&self) -> Option<&str> { self.metadata.business_line.as_deref() }
    pub fn raw_text(&self) -> &str { &self.raw_text }
    pub fn fragments(&self) -> &[Vector] { &self.fragments }
    pub fn has_fragments(&self) -> bool { !self.fragments.is_empty() }
    pub fn fragment_dim(&self) -> Option<usize> { self.fragments.first().map(Vec::len) }

    pub fn in_category(&self, category: &str) -> bool { self.category() == Some(category) }

    /// For each query vector, the best cosine against any fragment of this resume.
    pub fn match_fragments(&self, query_vectors: &[&[f32]]) -> Result<Vec<f32>> {
        if self.fragments.is_empty() {
            return Err(Error::UnscorableCandidate { id: self.id.clone(), reason: "no fragment vectors".to_string() });
        }
        let dim = self.fragments[0].len();
        query_vectors
            .iter()
            .map(|q| {
                if q.len() != dim {
                    return Err(Error::UnscorableCandidate {
                        id: self.id.clone(),
                        reason: format!("fragment width {dim} does not match query width {}", q.len()),
                    });
                }
                Ok(self.fragments.iter().map(|f| cosine(q, f)).fold(f32::NEG_INFINITY, f32::max))
            })
            .collect()
    }

    /// Case-insensitive presence test per term against the resume body: 1 if
    /// the term occurs anywhere, 0 otherwise. Order follows `terms`.
    pub fn match_literal<S: AsRef<str>>(&self, terms: &[S]) -> Vec<(String, u8)> {
        let body = self.raw_text.to_lowercase();
        terms
            .iter()
            .map(|t| {
                let t = t.as_ref();
                (t.to_string(), u8::from(body.contains(&t.to_lowercase())))
            })
            .collect()
    }
}

/// Ordered collection of candidates with unique ids. Every fragment in the
/// set has the same width.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Vec<CandidateRecord>")]
pub struct CandidateSet {
    records: Vec<CandidateRecord>,
}

impl Serialize for CandidateSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl TryFrom<Vec<CandidateRecord>> for CandidateSet {
    type Error = Error;

    fn try_from(records: Vec<CandidateRecord>) -> Result<Self> {
        for r in &records {
            r.validate()?;
        }
        Self::from_records(records)
    }
}

fn merge_dim(current: Option<usize>, record: &CandidateRecord) -> Result<Option<usize>> {
    match (current, record.fragment_dim()) {
        (Some(set), Some(own)) if set != own => Err(Error::InvalidRecord(format!(
            "candidate '{}' has fragments of width {own}, the set uses {set}",
            record.id()
        ))),
        (set, own) => Ok(set.or(own)),
    }
}

impl CandidateSet {
    pub fn new() -> Self { Self::default() }

    pub fn from_records(records: Vec<CandidateRecord>) -> Result<Self> {
        let mut set = Self::new();
        set.extend(records)?;
        Ok(set)
    }

    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, CandidateRecord> { self.records.iter() }

    /// Fragment width shared by the set; `None` while no record has fragments.
    pub fn fragment_dim(&self) -> Option<usize> { self.records.iter().find_map(CandidateRecord::fragment_dim) }

    pub fn push(&mut self, record: CandidateRecord) -> Result<()> {
        if self.contains(record.id()) {
            return Err(Error::InvalidRecord(format!("duplicate candidate id '{}'", record.id())));
        }
        merge_dim(self.fragment_dim(), &record)?;
        tracing::debug!(id = record.id(), "candidate added");
        self.records.push(record);
        Ok(())
    }

    /// Adds every record or none of them.
    pub fn extend(&mut self, records: Vec<CandidateRecord>) -> Result<()> {
        let mut seen: HashSet<&str> = self.records.iter().map(CandidateRecord::id).collect();
        let mut dim = self.fragment_dim();
        for r in &records {
            if !seen.insert(r.id()) {
                return Err(Error::InvalidRecord(format!("duplicate candidate id '{}'", r.id())));
            }
            dim = merge_dim(dim, r)?;
        }
        self.records.extend(records);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<CandidateRecord> {
        let pos = self.records.iter().position(|r| r.id() == id)?;
        tracing::debug!(id, "candidate removed");
        Some(self.records.remove(pos))
    }

    pub fn contains(&self, id: &str) -> bool { self.records.iter().any(|r| r.id() == id) }

    /// Lookup by id. Ids shorter than the minimum length are a caller error.
    pub fn get(&self, id: &str) -> Result<Option<&CandidateRecord>> {
        validate_id(id)?;
        Ok(self.records.iter().find(|r| r.id() == id))
    }

    pub fn by_name(&self, name: &str) -> Option<&CandidateRecord> { self.records.iter().find(|r| r.name() == name) }

    /// Read-only view of the candidates in one business line.
    pub fn filter_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a CandidateRecord> + 'a {
        self.records.iter().filter(move |r| r.in_category(category))
    }

    /// Candidates in scope for a query: all of them, or one category.
    pub fn scope<'a>(&'a self, category: Option<&'a str>) -> Vec<&'a CandidateRecord> {
        match category {
            Some(c) => self.filter_category(c).collect(),
            None => self.records.iter().collect(),
        }
    }

    pub fn ids(&self) -> Vec<&str> { self.records.iter().map(CandidateRecord::id).collect() }
    pub fn names(&self) -> Vec<&str> { self.records.iter().map(CandidateRecord::name).collect() }

    /// The only mutation path for metadata after load.
    pub fn update_metadata(&mut self, id: &str, metadata: CandidateMetadata) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("candidate '{id}'")))?;
        record.metadata = metadata;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a CandidateRecord;
    type IntoIter = std::slice::Iter<'a, CandidateRecord>;
    fn into_iter(self) -> Self::IntoIter { self.records.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn record(id: &str, line: &str, body: &str, fragments: Vec<Vector>) -> CandidateRecord {
        CandidateRecord::new(id, CandidateMetadata::named(format!("Name {id}")).with_business_line(line), body, fragments).unwrap()
    }

    #[test]
    fn short_ids_are_rejected() {
        let err = CandidateRecord::new("ab", CandidateMetadata::default(), "", vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    }

    #[test]
    fn ragged_fragments_are_rejected() {
        let err = CandidateRecord::new("abc", CandidateMetadata::default(), "", vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    }

    #[test]
    fn match_fragments_takes_best_chunk() {
        let r = record("c01", "PV", "", vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let q1 = [0.0f32, 1.0];
        let q2 = [1.0f32, 1.0];
        let sims = r.match_fragments(&[&q1[..], &q2[..]]).unwrap();
        assert!((sims[0] - 1.0).abs() < 1e-6);
        assert!((sims[1] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn match_fragments_without_fragments_is_unscorable() {
        let r = record("c02", "PV", "text", vec![]);
        let q = [1.0f32];
        assert_eq!(r.match_fragments(&[&q[..]]).unwrap_err().kind(), ErrorKind::UnscorableCandidate);
    }

    #[test]
    fn match_literal_is_case_insensitive_and_binary() {
        let r = record("c03", "PV", "Senior python dev. Python, PYTHON everywhere.", vec![]);
        let hits = r.match_literal(&["Python", "Rust"]);
        assert_eq!(hits, vec![("Python".to_string(), 1), ("Rust".to_string(), 0)]);
    }

    #[test]
    fn set_rejects_duplicates() {
        let mut set = CandidateSet::new();
        set.push(record("c01", "PV", "", vec![])).unwrap();
        assert!(set.push(record("c01", "RA", "", vec![])).is_err());
        assert!(set.extend(vec![record("c02", "PV", "", vec![]), record("c02", "PV", "", vec![])]).is_err());
        assert_eq!(set.len(), 1, "failed extend adds nothing");
    }

    #[test]
    fn set_holds_one_fragment_width() {
        let mut set = CandidateSet::from_records(vec![record("c01", "PV", "", vec![]), record("c02", "PV", "", vec![vec![1.0, 0.0]])]).unwrap();
        assert_eq!(set.fragment_dim(), Some(2));
        let err = set.push(record("c03", "PV", "", vec![vec![1.0, 0.0, 0.0]])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
        assert!(CandidateSet::from_records(vec![record("c04", "PV", "", vec![vec![1.0]]), record("c05", "PV", "", vec![vec![1.0, 0.0]])]).is_err());
        assert_eq!(CandidateSet::new().fragment_dim(), None);
    }

    #[test]
    fn deserialize_enforces_set_invariants() {
        let dup = r#"[{"id":"c01","metadata":{},"raw_text":""},{"id":"c01","metadata":{},"raw_text":""}]"#;
        assert!(serde_json::from_str::<CandidateSet>(dup).is_err());
        let short = r#"[{"id":"x","metadata":{},"raw_text":""}]"#;
        assert!(serde_json::from_str::<CandidateSet>(short).is_err());
        let mixed = r#"[{"id":"c01","metadata":{},"raw_text":"","fragments":[[1.0]]},{"id":"c02","metadata":{},"raw_text":"","fragments":[[1.0,0.0]]}]"#;
        assert!(serde_json::from_str::<CandidateSet>(mixed).is_err());

        let ok = r#"[{"id":"c01","metadata":{"name":"Ada"},"raw_text":"sql"}]"#;
        let set: CandidateSet = serde_json::from_str(ok).unwrap();
        assert_eq!(set.ids(), vec!["c01"]);
        assert_eq!(serde_json::from_str::<CandidateSet>(&serde_json::to_string(&set).unwrap()).unwrap().ids(), vec!["c01"]);
    }

    #[test]
    fn filter_does_not_mutate_source() {
        let set = CandidateSet::from_records(vec![
            record("c01", "PV", "", vec![]),
            record("c02", "RA", "", vec![]),
            record("c03", "PV", "", vec![]),
        ])
        .unwrap();
        let pv: Vec<&str> = set.filter_category("PV").map(CandidateRecord::id).collect();
        assert_eq!(pv, vec!["c01", "c03"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.scope(None).len(), 3);
    }

    #[test]
    fn lookup_by_id_and_name() {
        let set = CandidateSet::from_records(vec![record("c01", "PV", "", vec![])]).unwrap();
        assert!(set.get("c01").unwrap().is_some());
        assert!(set.get("zzz").unwrap().is_none());
        assert!(set.get("c").is_err());
        assert_eq!(set.by_name("Name c01").map(CandidateRecord::id), Some("c01"));
    }

    #[test]
    fn update_metadata_and_remove() {
        let mut set = CandidateSet::from_records(vec![record("c01", "PV", "", vec![])]).unwrap();
        set.update_metadata("c01", CandidateMetadata::named("Ada").with_business_line("RA")).unwrap();
        assert_eq!(set.by_name("Ada").and_then(CandidateRecord::category), Some("RA"));
        assert!(set.update_metadata("nope", CandidateMetadata::default()).is_err());
        assert!(set.remove("c01").is_some());
        assert!(set.is_empty());
    }
}

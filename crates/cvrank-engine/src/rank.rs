//! Normalisation, ordering and slicing of score mappings.
//!
//! A score mapping is an ordered `Vec<(id, score)>`; its order is the
//! insertion order the strategies produce and serves as the tie-break.
use std::cmp::Ordering;

use cvrank_core::types::CandidateId;
use cvrank_core::{Error, Result, TopN};

pub type Scores = Vec<(CandidateId, f32)>;

/// Min-max normalise to `[0, 1]`. When every score is equal the range is
/// zero and every normalised score is 0.
pub fn normalize(scores: &[(CandidateId, f32)]) -> Scores {
    let (lo, hi) = scores
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (_, s)| (lo.min(*s), hi.max(*s)));
    let range = hi - lo;
    scores
        .iter()
        .map(|(id, s)| {
            let n = if range > 0.0 { (s - lo) / range } else { 0.0 };
            (id.clone(), n)
        })
        .collect()
}

/// Stable descending sort of arbitrary entries by a score key.
pub fn sort_by_score_desc<T, F>(entries: &mut [T], score: F)
where
    F: Fn(&T) -> f32,
{
    entries.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
}

/// Stable sort by score, descending. Equal scores keep their input order.
pub fn sort_descending(mut scores: Scores) -> Scores {
    sort_by_score_desc(&mut scores, |(_, s)| *s);
    scores
}

/// The first `n` entries of an already sorted list, or all of them.
pub fn top_n<T>(mut sorted: Vec<T>, n: TopN) -> Result<Vec<T>> {
    match n {
        TopN::All => Ok(sorted),
        TopN::Count(k) if (1..=sorted.len()).contains(&k) => {
            sorted.truncate(k);
            Ok(sorted)
        }
        TopN::Count(k) => Err(Error::InvalidRange { requested: k, available: sorted.len() }),
    }
}

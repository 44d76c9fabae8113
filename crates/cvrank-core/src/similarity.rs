/// Cosine similarity in `[-1, 1]`. A zero-length vector on either side has no
/// direction and scores 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "cosine over vectors of different width");
    let mut dot = 0f32;
    let mut na = 0f32;
    let mut nb = 0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 { return 0.0; }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

/// Best cosine of `query` against any of `candidates`, with the index of the
/// first candidate reaching it. Later candidates must be strictly better to win.
pub fn best_match<'a, I>(query: &[f32], candidates: I) -> Option<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut best: Option<(usize, f32)> = None;
    for (i, c) in candidates.into_iter().enumerate() {
        let sim = cosine(query, c);
        match best {
            Some((_, b)) if sim <= b => {}
            _ => best = Some((i, sim)),
        }
    }
    best
}

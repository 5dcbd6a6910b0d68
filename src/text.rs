//! Shared text utilities: cleaning, tokenization, and vector helpers used by
//! both inference branches as well as the similarity endpoint.

/// Collapses repeated whitespace, trims edges, and normalizes newlines to
/// single spaces.
pub fn clean_text(s: &str) -> String {
    let mut normalized = String::with_capacity(s.len());
    for segment in s.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(segment);
    }
    normalized
}

/// Splits `text` into lowercased alphanumeric runs. Non-alphanumeric
/// characters act as delimiters and are dropped.
pub fn tokenize_alnum(text: &str) -> Vec<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .map(|tok| tok.to_lowercase())
        .collect()
}

/// In-place L2 normalization helper to keep allocations down during hot paths.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Cosine similarity between two vectors, clamped to `[-1, 1]`.
///
/// Vectors of different lengths compare over the shorter prefix; a zero-norm
/// operand yields `0.0` rather than a division error.
pub fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Rounds to 3 decimal places (confidence, risk, difficulty).
pub(crate) fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Rounds to 4 decimal places (similarity).
pub(crate) fn round4(x: f32) -> f32 {
    (x * 10_000.0).round() / 10_000.0
}

//! Dimension reconciliation.
//!
//! Artifacts (gate weights, classifier) may have been trained against a
//! different embedding width than the currently configured encoder. All three
//! coercion sites — gate input, gate output, classifier input — go through
//! this one implementation so the pad/truncate/tile behavior stays uniform
//! and tested in a single place.

/// Reconciles `v` to exactly `target_len` elements.
///
/// - equal length: returned unchanged;
/// - shorter: tiled to fill when `allow_tile` and `target_len` is an exact
///   multiple of `v.len()`, otherwise right-padded with zeros;
/// - longer: truncated to the first `target_len` elements.
///
/// Total over any input; tiling of an empty vector degenerates to zero
/// padding.
pub fn reconcile(v: &[f32], target_len: usize, allow_tile: bool) -> Vec<f32> {
    if v.len() < target_len && allow_tile && !v.is_empty() && target_len % v.len() == 0 {
        let mut out = Vec::with_capacity(target_len);
        for _ in 0..target_len / v.len() {
            out.extend_from_slice(v);
        }
        return out;
    }
    reconcile_filled(v, target_len, 0.0)
}

/// Pad-or-truncate variant with an explicit fill value and no tiling.
///
/// The gate output path pads with ones so that features the gate layer never
/// saw pass through unattenuated instead of being zeroed.
pub fn reconcile_filled(v: &[f32], target_len: usize, fill: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(target_len);
    out.extend_from_slice(&v[..v.len().min(target_len)]);
    out.resize(target_len, fill);
    out
}

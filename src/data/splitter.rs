// ============================================================
// Layer 4 — Stratified Train/Test Splitter
// ============================================================
// Splits row indices into train and test sets so that each
// class keeps (approximately) the same share in both sets.
//
// Per class c with n_c rows:
//   1. shuffle that class's indices with the seeded RNG
//   2. the first round(n_c * test_fraction) go to test
//   3. the rest go to train
// Both index lists are shuffled once more so classes interleave.
//
// The RNG is ChaCha8 seeded from `seed`, so the split is
// reproducible across runs and platforms.

use std::collections::BTreeMap;

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Return (train_indices, test_indices) over `labels`.
pub fn stratified_split(labels: &[usize], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let test_fraction = test_fraction.clamp(0.0, 1.0);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    // BTreeMap keeps class iteration order stable → stable RNG consumption
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test  = Vec::new();

    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let n_test = ((indices.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.min(indices.len());
        let rest = indices.split_off(n_test);
        test.extend(indices);
        train.extend(rest);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    tracing::debug!(
        "Stratified split: {} train, {} test (test_fraction={:.2})",
        train.len(),
        test.len(),
        test_fraction
    );

    (train, test)
}

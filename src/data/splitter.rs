// ============================================================
// Layer 4 - Train/Test Splitter
// ============================================================
// Shuffles samples with a seeded RNG and holds out a fraction
// of them for evaluation:
//
//   split = floor(test_fraction * len)
//   test  = shuffled[..split]
//   train = shuffled[split..]
//
// The seed makes the split reproducible across runs, so the
// test images of a resumed run are the ones it started with.
//
// Reference: rand crate documentation (SliceRandom, StdRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` and split into (train, test).
pub fn split_train_test<T>(mut samples: Vec<T>, test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let split = ((total as f64) * test_fraction.clamp(0.0, 1.0)).floor() as usize;
    let split = split.min(total);

    // After this: samples = test [0..split], train = [split..total]
    let train = samples.split_off(split);
    let test  = samples;

    if test.is_empty() && total > 0 {
        tracing::warn!(
            "Test split is empty: test_fraction {} of {} samples rounds down to 0",
            test_fraction,
            total
        );
    }
    tracing::debug!(
        "Dataset split: {} training, {} test (seed {})",
        train.len(),
        test.len(),
        seed
    );

    (train, test)
}

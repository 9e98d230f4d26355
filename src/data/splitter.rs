// ============================================================
// Layer 4 — Stratified Train/Test Splitter
// ============================================================
// Splits labelled items into train and test sets so that each
// class keeps (almost exactly) its share in both sets.
//
// How the test set is sized:
//   n_test  = ceil(test_fraction * n)
//   n_train = n - n_test
//
// How n_test is spread over the classes:
//   class c gets floor(count_c * n_test / n) test items, then the
//   leftover slots go to the classes with the largest remainders.
//   Integer arithmetic keeps the quotas exact, so they always sum
//   to n_test and each is within one item of its exact share.
//
// Each class is shuffled before the split and both outputs are
// shuffled afterwards, all from one seeded RNG, so a given seed
// always produces the same split.
//
// Reference: rand crate documentation (SliceRandom, StdRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::BTreeMap;

/// Shuffle a Vec deterministically.
pub fn shuffle_seeded<T>(mut items: Vec<T>, seed: u64) -> Vec<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items
}

/// Stratified split of `items` into (train, test).
///
/// # Arguments
/// * `items`         - All labelled items (consumed)
/// * `test_fraction` - Share of items for the test set, e.g. 0.2
/// * `seed`          - RNG seed, fixed for reproducible splits
/// * `label_of`      - Extracts the class label of an item
pub fn stratified_split<T, F>(
    items:         Vec<T>,
    test_fraction: f64,
    seed:          u64,
    label_of:      F,
) -> (Vec<T>, Vec<T>)
where
    F: Fn(&T) -> usize,
{
    let total  = items.len();
    let n_test = ((total as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(total);

    let mut rng = StdRng::seed_from_u64(seed);

    // BTreeMap keeps class order stable between runs
    let mut by_class: BTreeMap<usize, Vec<T>> = BTreeMap::new();
    for item in items {
        by_class.entry(label_of(&item)).or_default().push(item);
    }

    let counts: Vec<usize> = by_class.values().map(Vec::len).collect();
    let quotas = allocate_quotas(&counts, n_test);

    let mut train = Vec::with_capacity(total - n_test);
    let mut test  = Vec::with_capacity(n_test);

    for (mut members, quota) in by_class.into_values().zip(quotas) {
        members.shuffle(&mut rng);
        let rest = members.split_off(quota);
        test.extend(members);
        train.extend(rest);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    tracing::debug!(
        "Stratified split: {} train, {} test ({} classes)",
        train.len(),
        test.len(),
        counts.len(),
    );

    (train, test)
}

/// Spread `n_draw` slots over classes proportionally to `counts`
/// using the largest-remainder method.
fn allocate_quotas(counts: &[usize], n_draw: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let mut quotas: Vec<usize> = counts.iter().map(|&c| c * n_draw / total).collect();
    let remainders: Vec<usize> = counts.iter().map(|&c| c * n_draw % total).collect();

    let mut remaining = n_draw.saturating_sub(quotas.iter().sum());

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]).then(a.cmp(&b)));

    for idx in order {
        if remaining == 0 {
            break;
        }
        if quotas[idx] < counts[idx] {
            quotas[idx] += 1;
            remaining   -= 1;
        }
    }

    quotas
}

/// Keep at most the first `limit` items.
pub fn take_subset<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items.iter().take(limit).cloned().collect()
}

/// Number of items per label.
pub fn class_counts<T, F>(items: &[T], label_of: F) -> BTreeMap<usize, usize>
where
    F: Fn(&T) -> usize,
{
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(label_of(item)).or_insert(0) += 1;
    }
    counts
}

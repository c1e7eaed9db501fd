//! Shared fixtures for vscreen tests.
//!
//! All random stores are seeded so test outcomes are reproducible.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use vscreen_common::{Compound, CompoundStore, Label};

pub use pretty_assertions::assert_eq as assert_eq_pretty;

/// Query names `Q1..=Qn`.
pub fn query_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("Q{i}")).collect()
}

/// Two actives and two decoys scored by one query `Q1` (lower is better):
/// A1=1.0, D1=2.0, A2=3.0, D2=4.0.
pub fn four_compound_store() -> CompoundStore {
    CompoundStore::new(
        query_names(1),
        vec![
            Compound::new("D2", Label::Decoy, [("Q1", 4.0)]),
            Compound::new("A2", Label::Active, [("Q1", 3.0)]),
            Compound::new("D1", Label::Decoy, [("Q1", 2.0)]),
            Compound::new("A1", Label::Active, [("Q1", 1.0)]),
        ],
    )
    .expect("fixture store is valid")
}

/// Store whose scores carry no information: every score is uniform in
/// `[-10, 0)` regardless of label, and labels are shuffled.
pub fn random_store(seed: u64, n_actives: usize, n_decoys: usize, n_queries: usize) -> CompoundStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let queries = query_names(n_queries);
    let mut labels: Vec<Label> = std::iter::repeat(Label::Active)
        .take(n_actives)
        .chain(std::iter::repeat(Label::Decoy).take(n_decoys))
        .collect();
    labels.shuffle(&mut rng);

    let compounds = labels
        .into_iter()
        .enumerate()
        .map(|(i, label)| {
            let scores: Vec<(String, f64)> = queries
                .iter()
                .map(|q| (q.clone(), rng.gen_range(-10.0..0.0)))
                .collect();
            Compound::new(format!("C{i}"), label, scores)
        })
        .collect();

    CompoundStore::new(queries, compounds).expect("random store is valid")
}

/// Store where query `Qi` separates actives from decoys with strength
/// `signal[i]`: active scores are shifted down by that amount, so with an
/// ascending sort a larger signal means a better query.
pub fn informative_store(seed: u64, n_actives: usize, n_decoys: usize, signal: &[f64]) -> CompoundStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let queries = query_names(signal.len());

    let mut compounds = Vec::with_capacity(n_actives + n_decoys);
    for i in 0..(n_actives + n_decoys) {
        let label = if i < n_actives { Label::Active } else { Label::Decoy };
        let scores: Vec<(String, f64)> = queries
            .iter()
            .zip(signal)
            .map(|(q, s)| {
                let noise: f64 = rng.gen_range(-6.0..-2.0);
                let shift = if label.is_active() { *s } else { 0.0 };
                (q.clone(), noise - shift)
            })
            .collect();
        compounds.push(Compound::new(format!("C{i}"), label, scores));
    }

    CompoundStore::new(queries, compounds).expect("informative store is valid")
}

/// Panics unless `actual` is within `tol` of `expected`.
#[track_caller]
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}

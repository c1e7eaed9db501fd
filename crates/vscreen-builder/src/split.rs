//! Random training/test partitioning of a compound store.

use rand::seq::index;
use rand::Rng;
use tracing::info;
use vscreen_common::{Compound, CompoundStore, Label, Result, VscreenError};

/// Split `store` into `(training, test)` stores.
///
/// `training_fraction` of the actives (rounded half to even) are sampled
/// into training, the rest go to test. Each set then receives
/// `decoy_to_active` decoys per active: training decoys are sampled, test
/// decoys are the first unused ones in store order. Without an explicit
/// ratio every active gets `n_decoys / n_actives` decoys.
pub fn split<R: Rng + ?Sized>(
    store: &CompoundStore,
    training_fraction: f64,
    decoy_to_active: Option<usize>,
    rng: &mut R,
) -> Result<(CompoundStore, CompoundStore)> {
    if !(training_fraction > 0.0 && training_fraction < 1.0) {
        return Err(VscreenError::InvalidFraction(training_fraction));
    }

    let (actives, decoys): (Vec<&Compound>, Vec<&Compound>) = store
        .compounds()
        .iter()
        .partition(|c| c.label() == Label::Active);
    if actives.is_empty() {
        return Err(VscreenError::InvalidStore("no actives to split".to_string()));
    }

    let max_ratio = decoys.len() / actives.len();
    let ratio = decoy_to_active.unwrap_or(max_ratio);
    if ratio == 0 || ratio > max_ratio {
        return Err(VscreenError::InvalidStore(format!(
            "decoy to active ratio {ratio} not supported, at most {max_ratio} decoys per active"
        )));
    }

    let n_train = (training_fraction * actives.len() as f64).round_ties_even() as usize;
    let (train_actives, test_actives) = pick(&actives, index::sample(rng, actives.len(), n_train).into_vec());

    let n_train_decoys = train_actives.len() * ratio;
    let (train_decoys, mut test_decoys) =
        pick(&decoys, index::sample(rng, decoys.len(), n_train_decoys).into_vec());
    test_decoys.truncate(test_actives.len() * ratio);

    info!(
        training_actives = train_actives.len(),
        training_decoys = train_decoys.len(),
        test_actives = test_actives.len(),
        test_decoys = test_decoys.len(),
        "Split compound store"
    );

    let training = store.with_compounds(train_actives.into_iter().chain(train_decoys).collect())?;
    let test = store.with_compounds(test_actives.into_iter().chain(test_decoys).collect())?;
    Ok((training, test))
}

/// Compounds at `chosen` (in sampled order) and the rest (in store order).
fn pick(compounds: &[&Compound], chosen: Vec<usize>) -> (Vec<Compound>, Vec<Compound>) {
    let mut taken = vec![false; compounds.len()];
    let picked = chosen
        .into_iter()
        .map(|i| {
            taken[i] = true;
            compounds[i].clone()
        })
        .collect();
    let rest = compounds
        .iter()
        .zip(taken)
        .filter(|(_, t)| !*t)
        .map(|(c, _)| (*c).clone())
        .collect();
    (picked, rest)
}

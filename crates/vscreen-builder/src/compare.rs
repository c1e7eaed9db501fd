//! Post-analysis of caller-chosen ensembles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vscreen_common::{CompoundStore, Ensemble, Result, ScreeningSettings};
use vscreen_ranker::curve::{auc_structure, decoys_at, is_resolvable};
use vscreen_ranker::metrics::{auc_diff, ef_diff};
use vscreen_ranker::record::score_curve;
use vscreen_ranker::{evaluate, EnsembleRecord, PairedDifference};

/// Paired comparison of two ensembles on the same store. Differences are
/// `a - b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub ensemble_a: Ensemble,
    pub ensemble_b: Ensemble,
    pub auc: Option<PairedDifference>,
    /// Decoy count → (fpf, difference). Unresolvable fractions are absent.
    pub ef: BTreeMap<usize, (f64, PairedDifference)>,
}

pub fn compare(
    store: &CompoundStore,
    ensemble_a: &Ensemble,
    ensemble_b: &Ensemble,
    settings: &ScreeningSettings,
    fpf_list: &[f64],
) -> Result<ComparisonReport> {
    let scores_a = score_curve(store, ensemble_a, settings)?;
    let scores_b = score_curve(store, ensemble_b, settings)?;

    let auc = auc_diff(&auc_structure(&scores_a), &auc_structure(&scores_b))?;

    let n_decoys = store.n_decoys();
    let mut ef = BTreeMap::new();
    for &fpf in fpf_list {
        // the full-fraction comparison is the AUC difference
        if fpf >= 1.0 || !is_resolvable(n_decoys, fpf) {
            continue;
        }
        let key = decoys_at(n_decoys, fpf);
        if let Some(diff) = ef_diff(&scores_a, &scores_b, fpf, settings.sort_order)? {
            ef.insert(key, (fpf, diff));
        }
    }

    debug!(a = %ensemble_a, b = %ensemble_b, fractions = ef.len(), "Compared ensembles");

    Ok(ComparisonReport {
        ensemble_a: ensemble_a.clone(),
        ensemble_b: ensemble_b.clone(),
        auc,
        ef,
    })
}

/// One record per ensemble, in input order.
pub fn evaluate_many(
    store: &CompoundStore,
    ensembles: &[Ensemble],
    settings: &ScreeningSettings,
    fpf_list: &[f64],
) -> Result<Vec<EnsembleRecord>> {
    ensembles
        .iter()
        .map(|e| evaluate(store, e, settings, fpf_list))
        .collect()
}

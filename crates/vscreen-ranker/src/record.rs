//! Evaluation of a single ensemble into an [`EnsembleRecord`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vscreen_common::{CompoundStore, Ensemble, Result, ScreeningSettings};

use crate::curve::{auc_structure, decoys_at, is_resolvable, score_structure, RocPoint, ScorePoint};
use crate::metrics::{self, Auc, EnrichmentFactor};
use crate::ranker::rank;

/// Evaluation result for one ensemble.
///
/// `ef` is keyed by the decoy count at which the fraction is reached. The
/// entry at the total decoy count is the AUC with its interval, so the
/// largest key always identifies the store's decoy total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleRecord {
    pub ensemble: Ensemble,
    pub auc: Option<Auc>,
    pub ef: BTreeMap<usize, EnrichmentFactor>,
}

impl EnsembleRecord {
    /// Total decoys of the evaluated store, if the record has any entry.
    pub fn total_decoys(&self) -> Option<usize> {
        self.ef.keys().next_back().copied()
    }

    pub fn ef_at(&self, decoys: usize) -> Option<f64> {
        self.ef.get(&decoys).map(|ef| ef.value)
    }

    pub fn auc_value(&self) -> Option<f64> {
        self.auc.map(|a| a.value)
    }
}

pub fn score_curve<'a>(
    store: &'a CompoundStore,
    ensemble: &'a Ensemble,
    settings: &ScreeningSettings,
) -> Result<Vec<ScorePoint<'a>>> {
    Ok(score_structure(&rank(store, ensemble, settings)?))
}

pub fn roc_curve<'a>(
    store: &'a CompoundStore,
    ensemble: &'a Ensemble,
    settings: &ScreeningSettings,
) -> Result<Vec<RocPoint<'a>>> {
    Ok(auc_structure(&score_curve(store, ensemble, settings)?))
}

/// Rank `store` by `ensemble` and compute AUC plus one enrichment factor per
/// resolvable fraction in `fpf_list`. Fractions the store cannot resolve
/// are left out. When two fractions land on the same decoy count the later
/// one wins.
pub fn evaluate(
    store: &CompoundStore,
    ensemble: &Ensemble,
    settings: &ScreeningSettings,
    fpf_list: &[f64],
) -> Result<EnsembleRecord> {
    let scores = score_curve(store, ensemble, settings)?;
    let roc = auc_structure(&scores);
    let auc = metrics::auc(&roc)?;

    let n_decoys = store.n_decoys();
    let mut ef = BTreeMap::new();

    for &fpf in fpf_list {
        if fpf >= 1.0 {
            continue;
        }
        if !is_resolvable(n_decoys, fpf) {
            debug!(%ensemble, fpf, n_decoys, "Skipping unresolvable fraction");
            continue;
        }
        let key = decoys_at(n_decoys, fpf);
        if key == 0 || key >= n_decoys {
            continue;
        }
        if let Some(value) = metrics::enrichment_factor(&scores, fpf, settings.sort_order)? {
            ef.insert(key, value);
        }
    }

    if let Some(a) = auc {
        ef.insert(
            n_decoys,
            EnrichmentFactor {
                fpf: 1.0,
                value: a.value,
                lower: a.lower,
                upper: a.upper,
            },
        );
    }

    Ok(EnsembleRecord {
        ensemble: ensemble.clone(),
        auc,
        ef,
    })
}

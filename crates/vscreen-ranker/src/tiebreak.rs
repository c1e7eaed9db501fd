//! Winner selection among evaluated ensembles.
//!
//! Records are ordered descending on a primary key: EF at the requested
//! decoy count, or AUC when that count is the whole decoy set. Exact ties at
//! the top pull in EF at the remaining decoy counts, smallest first. Ties
//! that survive every key are settled by [`TieBreakPolicy`].

use std::cmp::Ordering;

use tracing::{debug, warn};
use vscreen_common::{Result, TieBreakPolicy, VscreenError};

use crate::curve::decoys_at;
use crate::record::EnsembleRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKey {
    Auc,
    Ef(usize),
}

impl SortKey {
    fn value(self, record: &EnsembleRecord) -> Option<f64> {
        match self {
            SortKey::Auc => record.auc_value(),
            SortKey::Ef(decoys) => record.ef_at(decoys),
        }
    }
}

/// Descending, missing values last.
fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_on(keys: &[SortKey], a: &EnsembleRecord, b: &EnsembleRecord) -> Ordering {
    keys.iter()
        .map(|k| descending(k.value(a), k.value(b)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Pick the best record. `requested_fpf` selects the primary EF key; without
/// it the primary key is EF at the first decoy.
pub fn select_best(
    records: &[EnsembleRecord],
    requested_fpf: Option<f64>,
    policy: TieBreakPolicy,
) -> Result<&EnsembleRecord> {
    let first = records.first().ok_or(VscreenError::EmptyCandidates)?;
    let unresolvable = || VscreenError::UnresolvableFraction(requested_fpf.unwrap_or(0.0));
    let n_decoys = first.total_decoys().ok_or_else(unresolvable)?;

    let target = requested_fpf.map_or(1, |fpf| decoys_at(n_decoys, fpf));
    let primary = if target == n_decoys {
        SortKey::Auc
    } else {
        if records.iter().all(|r| r.ef_at(target).is_none()) {
            return Err(unresolvable());
        }
        SortKey::Ef(target)
    };

    let mut secondary = first
        .ef
        .keys()
        .copied()
        .filter(|&d| d != target)
        .map(SortKey::Ef);

    let mut keys = vec![primary];
    let mut order: Vec<usize> = (0..records.len()).collect();

    loop {
        order.sort_by(|&a, &b| compare_on(&keys, &records[a], &records[b]));
        let tied = order.len() > 1 && compare_on(&keys, &records[order[0]], &records[order[1]]).is_eq();
        if !tied {
            let winner = &records[order[0]];
            debug!(ensemble = %winner.ensemble, keys = keys.len(), "Selected best ensemble");
            return Ok(winner);
        }
        match secondary.next() {
            Some(key) => keys.push(key),
            None => break,
        }
    }

    let leader = &records[order[0]];
    let tied = order
        .iter()
        .map(|&i| &records[i])
        .take_while(|r| compare_on(&keys, leader, r).is_eq());

    match policy {
        TieBreakPolicy::Lexical => tied
            .min_by(|a, b| a.ensemble.cmp(&b.ensemble))
            .ok_or(VscreenError::EmptyCandidates),
        TieBreakPolicy::FirstSeen => {
            warn!(
                ensemble = %leader.ensemble,
                tied = tied.count(),
                "Tie unresolved by every metric, keeping first evaluated ensemble"
            );
            Ok(leader)
        }
    }
}

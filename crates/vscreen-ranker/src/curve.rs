//! Cumulative ROC coordinates for a ranked compound list.

use serde::Serialize;
use vscreen_common::Label;

use crate::ranker::RankedCompound;

/// Ranked compound with running class counts (the "score structure").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePoint<'a> {
    pub id: &'a str,
    pub score: f64,
    pub query: &'a str,
    pub label: Label,
    /// Decoys ranked at or above this compound.
    pub decoys: usize,
    /// Actives ranked at or above this compound.
    pub actives: usize,
}

/// Ranked compound with its ROC coordinates (the "AUC structure").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocPoint<'a> {
    pub id: &'a str,
    pub score: f64,
    pub query: &'a str,
    pub label: Label,
    pub fpf: f64,
    pub tpf: f64,
}

pub fn score_structure<'a>(ranked: &[RankedCompound<'a>]) -> Vec<ScorePoint<'a>> {
    let mut decoys = 0;
    let mut actives = 0;
    ranked
        .iter()
        .map(|r| {
            match r.label {
                Label::Active => actives += 1,
                Label::Decoy => decoys += 1,
            }
            ScorePoint {
                id: r.id,
                score: r.score,
                query: r.query,
                label: r.label,
                decoys,
                actives,
            }
        })
        .collect()
}

/// Class totals `(actives, decoys)` of a score structure.
pub fn class_counts(points: &[ScorePoint<'_>]) -> (usize, usize) {
    points
        .last()
        .map(|p| (p.actives, p.decoys))
        .unwrap_or((0, 0))
}

pub fn auc_structure<'a>(points: &[ScorePoint<'a>]) -> Vec<RocPoint<'a>> {
    let (n_actives, n_decoys) = class_counts(points);
    let fraction = |count: usize, total: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };

    points
        .iter()
        .map(|p| RocPoint {
            id: p.id,
            score: p.score,
            query: p.query,
            label: p.label,
            fpf: fraction(p.decoys, n_decoys),
            tpf: fraction(p.actives, n_actives),
        })
        .collect()
}

/// Number of decoys corresponding to `fpf`, rounding half to even.
pub fn decoys_at(n_decoys: usize, fpf: f64) -> usize {
    (n_decoys as f64 * fpf).round_ties_even() as usize
}

/// Whether `n_decoys` is enough to resolve `fpf`.
pub fn is_resolvable(n_decoys: usize, fpf: f64) -> bool {
    fpf > 0.0 && fpf <= 1.0 && n_decoys >= (1.0 / fpf).round_ties_even() as usize
}

/// Score of the compound at which `fpf` is reached: among compounds with the
/// matching cumulative decoy count, the one with the most actives above it.
pub fn threshold(points: &[ScorePoint<'_>], fpf: f64) -> Option<f64> {
    let (_, n_decoys) = class_counts(points);
    if !is_resolvable(n_decoys, fpf) {
        return None;
    }
    let target = decoys_at(n_decoys, fpf);

    let mut best: Option<&ScorePoint<'_>> = None;
    for point in points.iter().filter(|p| p.decoys == target) {
        if best.map_or(true, |b| point.actives > b.actives) {
            best = Some(point);
        }
    }
    best.map(|p| p.score)
}

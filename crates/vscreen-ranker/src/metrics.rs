//! Screening performance metrics: ROC AUC, enrichment factors, their 95%
//! confidence intervals, and paired differences between two ensembles
//! evaluated on the same compounds.
//!
//! Variances decompose into an active term and a decoy term. Paired
//! differences subtract the covariance of the per-compound indicators of the
//! two rankings, matched by compound id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vscreen_common::{Label, Result, SortOrder, VscreenError};

use crate::curve::{class_counts, threshold, RocPoint, ScorePoint};
use crate::stats::{mean, sample_covariance, sample_variance, t_critical, two_sided_p};

/// Fractions at which enrichment factors are always attempted. 1.0 makes
/// sure every record carries an entry keyed by the total decoy count.
pub const DEFAULT_FRACTIONS: [f64; 5] = [0.0001, 0.001, 0.01, 0.05, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Auc {
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentFactor {
    pub fpf: f64,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// `metric_a - metric_b` with its 95% interval and two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairedDifference {
    pub metric_a: f64,
    pub metric_b: f64,
    pub diff: f64,
    pub lower: f64,
    pub upper: f64,
    pub p_value: f64,
}

/// Per-compound indicator values split by class, keyed by compound id.
struct Indicators<'a> {
    actives: Vec<(&'a str, f64)>,
    decoys: Vec<(&'a str, f64)>,
}

impl<'a> Indicators<'a> {
    fn split(items: impl Iterator<Item = (&'a str, Label, f64)>) -> Self {
        let mut actives = Vec::new();
        let mut decoys = Vec::new();
        for (id, label, value) in items {
            match label {
                Label::Active => actives.push((id, value)),
                Label::Decoy => decoys.push((id, value)),
            }
        }
        Self { actives, decoys }
    }

    /// fpf over actives, tpf over decoys.
    fn roc(points: &[RocPoint<'a>]) -> Self {
        Self::split(points.iter().map(|p| {
            let value = match p.label {
                Label::Active => p.fpf,
                Label::Decoy => p.tpf,
            };
            (p.id, p.label, value)
        }))
    }
}

fn values(items: &[(&str, f64)]) -> Vec<f64> {
    items.iter().map(|(_, v)| *v).collect()
}

/// Align two indicator series by compound id, in the order of `a`.
fn paired(a: &[(&str, f64)], b: &[(&str, f64)]) -> Result<(Vec<f64>, Vec<f64>)> {
    if a.len() != b.len() {
        return Err(VscreenError::InvalidStore(
            "paired comparison over different compound sets".to_string(),
        ));
    }
    let lookup: HashMap<&str, f64> = b.iter().copied().collect();
    let mut left = Vec::with_capacity(a.len());
    let mut right = Vec::with_capacity(a.len());
    for (id, value) in a {
        let other = lookup.get(id).ok_or_else(|| {
            VscreenError::InvalidStore(format!("compound '{id}' missing from paired ranking"))
        })?;
        left.push(*value);
        right.push(*other);
    }
    Ok((left, right))
}

// ── AUC ───────────────────────────────────────────────────────────────────────

/// Mean tpf over decoy positions; 0 without decoys.
pub fn auc_value(points: &[RocPoint<'_>]) -> f64 {
    let decoys: Vec<f64> = points
        .iter()
        .filter(|p| !p.label.is_active())
        .map(|p| p.tpf)
        .collect();
    mean(&decoys)
}

/// AUC with a 95% interval clamped to [0, 1]. `None` unless both classes
/// are present.
pub fn auc(points: &[RocPoint<'_>]) -> Result<Option<Auc>> {
    let ind = Indicators::roc(points);
    let (p, n) = (ind.actives.len(), ind.decoys.len());
    if p == 0 || n == 0 {
        return Ok(None);
    }

    let fpf_actives = values(&ind.actives);
    let tpf_decoys = values(&ind.decoys);
    let value = mean(&tpf_decoys);

    let var_a = sample_variance(&fpf_actives);
    let var_d = sample_variance(&tpf_decoys);
    let se = (var_a / p as f64 + var_d / n as f64).sqrt();
    let half = se * t_critical(p + n - 1)?;

    Ok(Some(Auc {
        value,
        lower: (value - half).max(0.0),
        upper: (value + half).min(1.0),
    }))
}

/// Paired AUC difference between two rankings of the same compounds.
pub fn auc_diff(a: &[RocPoint<'_>], b: &[RocPoint<'_>]) -> Result<Option<PairedDifference>> {
    let (ia, ib) = (Indicators::roc(a), Indicators::roc(b));
    let (p, n) = (ia.actives.len(), ia.decoys.len());
    if p == 0 || n == 0 {
        return Ok(None);
    }

    let (act_a, act_b) = paired(&ia.actives, &ib.actives)?;
    let (dec_a, dec_b) = paired(&ia.decoys, &ib.decoys)?;

    let var_actives = (sample_variance(&act_a) + sample_variance(&act_b)
        - 2.0 * sample_covariance(&act_a, &act_b))
    .max(0.0);
    let var_decoys = (sample_variance(&dec_a) + sample_variance(&dec_b)
        - 2.0 * sample_covariance(&dec_a, &dec_b))
    .max(0.0);

    let se = (var_actives / p as f64 + var_decoys / n as f64).sqrt();
    paired_difference(mean(&dec_a), mean(&dec_b), se, p + n - 1).map(Some)
}

// ── Enrichment factor ────────────────────────────────────────────────────────

/// Threshold indicators and tpf for one fraction.
struct EfCore<'a> {
    tpf: f64,
    value: f64,
    gamma: Indicators<'a>,
}

fn ef_core<'a>(points: &[ScorePoint<'a>], fpf: f64, order: SortOrder) -> Option<EfCore<'a>> {
    let cutoff = threshold(points, fpf)?;
    let (n_actives, _) = class_counts(points);
    if n_actives == 0 {
        return None;
    }

    let gamma = Indicators::split(points.iter().map(|p| {
        let hit = if order.passes(p.score, cutoff) { 1.0 } else { 0.0 };
        (p.id, p.label, hit)
    }));
    let tpf = mean(&values(&gamma.actives));

    Some(EfCore {
        tpf,
        value: tpf / fpf,
        gamma,
    })
}

/// Active variance, decoy variance, and squared ROC slope at `fpf`.
/// All zero at fpf = 1; the slope term is zero when the EF is zero.
fn ef_variance(tpf: f64, fpf: f64) -> (f64, f64, f64) {
    if fpf >= 1.0 {
        return (0.0, 0.0, 0.0);
    }
    let ef = tpf / fpf;
    let var_a = tpf * (1.0 - tpf);
    let var_d = fpf * (1.0 - fpf);
    let s2 = if ef > 0.0 {
        let s = ef * (1.0 + ef.ln() / fpf.ln());
        s * s
    } else {
        0.0
    };
    (var_a, var_d, s2)
}

/// Enrichment factor at `fpf` with a 95% interval. `None` when the store
/// has too few decoys to resolve `fpf`.
pub fn enrichment_factor(
    points: &[ScorePoint<'_>],
    fpf: f64,
    order: SortOrder,
) -> Result<Option<EnrichmentFactor>> {
    let Some(core) = ef_core(points, fpf, order) else {
        return Ok(None);
    };

    if core.value == 0.0 {
        return Ok(Some(EnrichmentFactor {
            fpf,
            value: 0.0,
            lower: 0.0,
            upper: 0.0,
        }));
    }

    let (n_actives, n_decoys) = class_counts(points);
    let (var_a, var_d, s2) = ef_variance(core.tpf, fpf);
    let se = (1.0 / fpf) * (var_a / n_actives as f64 + s2 * var_d / n_decoys as f64).sqrt();
    let half = se * t_critical(n_actives + n_decoys - 1)?;

    Ok(Some(EnrichmentFactor {
        fpf,
        value: core.value,
        lower: (core.value - half).max(0.0),
        upper: (core.value + half).min(1.0 / fpf),
    }))
}

/// Paired enrichment-factor difference at `fpf`. `None` when either ranking
/// cannot resolve `fpf`.
pub fn ef_diff(
    a: &[ScorePoint<'_>],
    b: &[ScorePoint<'_>],
    fpf: f64,
    order: SortOrder,
) -> Result<Option<PairedDifference>> {
    let (Some(core_a), Some(core_b)) = (ef_core(a, fpf, order), ef_core(b, fpf, order)) else {
        return Ok(None);
    };
    let (p, n) = (core_a.gamma.actives.len(), core_a.gamma.decoys.len());

    let (var_a_act, var_a_dec, s2_a) = ef_variance(core_a.tpf, fpf);
    let (var_b_act, var_b_dec, s2_b) = ef_variance(core_b.tpf, fpf);

    let (act_a, act_b) = paired(&core_a.gamma.actives, &core_b.gamma.actives)?;
    let (dec_a, dec_b) = paired(&core_a.gamma.decoys, &core_b.gamma.decoys)?;
    let cov_act = sample_covariance(&act_a, &act_b);
    let cov_dec = sample_covariance(&dec_a, &dec_b);

    let var_actives = (var_a_act + var_b_act - 2.0 * cov_act).max(0.0);
    let var_decoys =
        (s2_a * var_a_dec + s2_b * var_b_dec - 2.0 * cov_dec * (s2_a * s2_b).sqrt()).max(0.0);

    let se = (1.0 / fpf) * (var_actives / p as f64 + var_decoys / n as f64).sqrt();
    paired_difference(core_a.value, core_b.value, se, p + n - 1).map(Some)
}

fn paired_difference(metric_a: f64, metric_b: f64, se: f64, df: usize) -> Result<PairedDifference> {
    let diff = metric_a - metric_b;
    let half = se * t_critical(df)?;
    let p_value = if se > 0.0 {
        two_sided_p(diff / se, df)?
    } else if diff == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(PairedDifference {
        metric_a,
        metric_b,
        diff,
        lower: diff - half,
        upper: diff + half,
        p_value,
    })
}

// ── Fractions ────────────────────────────────────────────────────────────────

/// Fractions to evaluate: the defaults plus `requested`, or 1/N_decoys when
/// nothing was requested. Sorted ascending without duplicates.
pub fn fpf_list(n_decoys: usize, requested: Option<f64>) -> Vec<f64> {
    let mut list = DEFAULT_FRACTIONS.to_vec();
    match requested {
        Some(fpf) => list.push(fpf),
        None if n_decoys > 0 => list.push(1.0 / n_decoys as f64),
        None => {}
    }
    list.sort_by(f64::total_cmp);
    list.dedup();
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{auc_structure, score_structure};
    use crate::ranker::rank;
    use vscreen_common::{Compound, CompoundStore, Ensemble, ScreeningSettings};
    use vscreen_test_utils::{assert_close, four_compound_store, informative_store, query_names, random_store};

    fn curves<'a>(
        store: &'a CompoundStore,
        ensemble: &'a Ensemble,
        order: SortOrder,
    ) -> (Vec<ScorePoint<'a>>, Vec<RocPoint<'a>>) {
        let ranked = rank(store, ensemble, &ScreeningSettings::new(order)).unwrap();
        let scores = score_structure(&ranked);
        let roc = auc_structure(&scores);
        (scores, roc)
    }

    #[test]
    fn test_four_compound_auc() {
        let store = four_compound_store();
        let ensemble = Ensemble::single("Q1");
        let (_, roc) = curves(&store, &ensemble, SortOrder::Ascending);
        let auc = auc(&roc).unwrap().unwrap();
        assert_close(auc.value, 0.75, 1e-12);
        // se = sqrt(0.125/2 + 0.125/2), t(3) = 3.18 → interval wider than [0, 1]
        assert_eq!(auc.lower, 0.0);
        assert_eq!(auc.upper, 1.0);
    }

    #[test]
    fn test_uninformative_auc_near_half() {
        let store = random_store(42, 500, 500, 1);
        let ensemble = Ensemble::single("Q1");
        let (_, roc) = curves(&store, &ensemble, SortOrder::Ascending);
        let auc = auc(&roc).unwrap().unwrap();
        assert_close(auc.value, 0.5, 0.06);
        assert!(auc.lower < auc.value && auc.value < auc.upper);
    }

    #[test]
    fn test_auc_needs_both_classes() {
        let store = CompoundStore::new(
            query_names(1),
            vec![Compound::new("A1", Label::Active, [("Q1", 1.0)])],
        )
        .unwrap();
        let ensemble = Ensemble::single("Q1");
        let (_, roc) = curves(&store, &ensemble, SortOrder::Ascending);
        assert!(auc(&roc).unwrap().is_none());
        assert_eq!(auc_value(&roc), 0.0);
    }

    #[test]
    fn test_four_compound_enrichment() {
        let store = four_compound_store();
        let ensemble = Ensemble::single("Q1");
        let (scores, _) = curves(&store, &ensemble, SortOrder::Ascending);
        // threshold 3.0 → both actives pass, tpf = 1, EF = 2, slope term 0
        let ef = enrichment_factor(&scores, 0.5, SortOrder::Ascending).unwrap().unwrap();
        assert_eq!(ef.fpf, 0.5);
        assert_close(ef.value, 2.0, 1e-12);
        assert_close(ef.lower, 2.0, 1e-12);
        assert_close(ef.upper, 2.0, 1e-12);

        let full = enrichment_factor(&scores, 1.0, SortOrder::Ascending).unwrap().unwrap();
        assert_eq!((full.value, full.lower, full.upper), (1.0, 1.0, 1.0));

        assert!(enrichment_factor(&scores, 0.01, SortOrder::Ascending).unwrap().is_none());
    }

    #[test]
    fn test_zero_enrichment_fallback() {
        let mut compounds = vec![
            Compound::new("A1", Label::Active, [("Q1", 9.0)]),
            Compound::new("A2", Label::Active, [("Q1", 8.0)]),
        ];
        for i in 0..4 {
            compounds.push(Compound::new(format!("D{i}"), Label::Decoy, [("Q1", i as f64)]));
        }
        let store = CompoundStore::new(query_names(1), compounds).unwrap();
        let ensemble = Ensemble::single("Q1");
        let (scores, _) = curves(&store, &ensemble, SortOrder::Ascending);
        let ef = enrichment_factor(&scores, 0.25, SortOrder::Ascending).unwrap().unwrap();
        assert_eq!(ef, EnrichmentFactor { fpf: 0.25, value: 0.0, lower: 0.0, upper: 0.0 });
    }

    #[test]
    fn test_enrichment_interval_brackets_value() {
        let store = informative_store(3, 40, 400, &[1.5]);
        let ensemble = Ensemble::single("Q1");
        let (scores, _) = curves(&store, &ensemble, SortOrder::Ascending);
        let ef = enrichment_factor(&scores, 0.05, SortOrder::Ascending).unwrap().unwrap();
        assert!(ef.value > 1.0, "signal should enrich actives, got {}", ef.value);
        assert!(ef.lower <= ef.value && ef.value <= ef.upper);
        assert!(ef.upper <= 1.0 / 0.05);
    }

    #[test]
    fn test_descending_gamma_direction() {
        let store = four_compound_store();
        let ensemble = Ensemble::single("Q1");
        let (scores, _) = curves(&store, &ensemble, SortOrder::Descending);
        // ranking D2, A2, D1, A1; one decoy → threshold 3.0 (A2)
        let ef = enrichment_factor(&scores, 0.5, SortOrder::Descending).unwrap().unwrap();
        assert_close(ef.value, 1.0, 1e-12);
    }

    #[test]
    fn test_auc_diff_identical_rankings() {
        let store = informative_store(5, 30, 90, &[1.0]);
        let ensemble = Ensemble::single("Q1");
        let (_, roc) = curves(&store, &ensemble, SortOrder::Ascending);
        let diff = auc_diff(&roc, &roc).unwrap().unwrap();
        assert_eq!(diff.diff, 0.0);
        assert_close(diff.lower, 0.0, 1e-9);
        assert_close(diff.upper, 0.0, 1e-9);
        assert_eq!(diff.p_value, 1.0);
    }

    #[test]
    fn test_auc_diff_detects_better_query() {
        let store = informative_store(11, 60, 240, &[3.0, 0.0]);
        let strong = Ensemble::single("Q1");
        let flat = Ensemble::single("Q2");
        let (_, roc_strong) = curves(&store, &strong, SortOrder::Ascending);
        let (_, roc_flat) = curves(&store, &flat, SortOrder::Ascending);

        let diff = auc_diff(&roc_strong, &roc_flat).unwrap().unwrap();
        assert_close(diff.metric_a, auc_value(&roc_strong), 1e-12);
        assert_close(diff.metric_b, auc_value(&roc_flat), 1e-12);
        assert!(diff.diff > 0.2);
        assert!(diff.lower > 0.0);
        assert!(diff.p_value < 0.05);

        let reverse = auc_diff(&roc_flat, &roc_strong).unwrap().unwrap();
        assert_close(reverse.diff, -diff.diff, 1e-12);
        assert_close(reverse.p_value, diff.p_value, 1e-9);
    }

    #[test]
    fn test_ef_diff_identical_rankings() {
        let store = informative_store(9, 30, 200, &[1.0]);
        let ensemble = Ensemble::single("Q1");
        let (scores, _) = curves(&store, &ensemble, SortOrder::Ascending);
        let diff = ef_diff(&scores, &scores, 0.05, SortOrder::Ascending).unwrap().unwrap();
        assert_eq!(diff.diff, 0.0);
        assert!(diff.lower <= 0.0 && diff.upper >= 0.0);
        assert_close(diff.p_value, 1.0, 1e-9);
    }

    #[test]
    fn test_ef_diff_unresolvable_fraction() {
        let store = four_compound_store();
        let ensemble = Ensemble::single("Q1");
        let (scores, _) = curves(&store, &ensemble, SortOrder::Ascending);
        assert!(ef_diff(&scores, &scores, 0.001, SortOrder::Ascending).unwrap().is_none());
    }

    /// Three actives and three decoys; `Qi` scores each compound by its
    /// position in `orders[i]`, so an ascending sort reproduces that order.
    fn ranked_store(orders: [[&str; 6]; 2]) -> CompoundStore {
        let position = |order: &[&str; 6], id: &str| {
            order.iter().position(|o| *o == id).unwrap() as f64 + 1.0
        };
        let compounds = orders[0]
            .iter()
            .map(|id| {
                let label = if id.starts_with('A') { Label::Active } else { Label::Decoy };
                let scores = [("Q1", position(&orders[0], *id)), ("Q2", position(&orders[1], *id))];
                Compound::new(*id, label, scores)
            })
            .collect();
        CompoundStore::new(query_names(2), compounds).unwrap()
    }

    #[test]
    fn test_auc_diff_subtracts_covariance() {
        let store = ranked_store([
            ["A1", "A2", "D1", "A3", "D2", "D3"],
            ["A1", "D1", "A2", "D2", "A3", "D3"],
        ]);
        let (q1, q2) = (Ensemble::single("Q1"), Ensemble::single("Q2"));
        let (_, roc_a) = curves(&store, &q1, SortOrder::Ascending);
        let (_, roc_b) = curves(&store, &q2, SortOrder::Ascending);
        let diff = auc_diff(&roc_a, &roc_b).unwrap().unwrap();

        // AUC 8/9 vs 2/3. Actives fpf [0, 0, 1/3] vs [0, 1/3, 2/3]: variances
        // 1/27 and 1/9, covariance 1/18. Decoys tpf [2/3, 1, 1] vs
        // [1/3, 2/3, 1] give the same terms. Each class contributes 1/27.
        let se = (2.0 * (1.0 / 27.0) / 3.0_f64).sqrt();
        assert_close(se, 2f64.sqrt() / 9.0, 1e-12);
        let t = t_critical(5).unwrap();
        assert_close(t, 2.570582, 1e-5);

        assert_close(diff.metric_a, 8.0 / 9.0, 1e-12);
        assert_close(diff.metric_b, 2.0 / 3.0, 1e-12);
        assert_close(diff.diff, 2.0 / 9.0, 1e-12);
        assert_close(diff.lower, 2.0 / 9.0 - se * t, 1e-9);
        assert_close(diff.upper, 2.0 / 9.0 + se * t, 1e-9);
        // t statistic (2/9) / (sqrt 2 / 9) = sqrt 2
        assert_close(diff.p_value, two_sided_p(2f64.sqrt(), 5).unwrap(), 1e-9);
        assert!(diff.p_value > 0.2 && diff.p_value < 0.25);
    }

    #[test]
    fn test_ef_diff_weights_decoy_covariance_by_slope() {
        let store = ranked_store([
            ["A1", "A2", "D1", "D2", "A3", "D3"],
            ["A3", "D2", "D1", "A1", "A2", "D3"],
        ]);
        let (q1, q2) = (Ensemble::single("Q1"), Ensemble::single("Q2"));
        let (scores_a, _) = curves(&store, &q1, SortOrder::Ascending);
        let (scores_b, _) = curves(&store, &q2, SortOrder::Ascending);
        let fpf = 1.0 / 3.0;
        let diff = ef_diff(&scores_a, &scores_b, fpf, SortOrder::Ascending).unwrap().unwrap();

        // one decoy: Q1 hits A1 A2 D1 (EF 2), Q2 hits A3 D2 (EF 1)
        assert_close(diff.metric_a, 2.0, 1e-12);
        assert_close(diff.metric_b, 1.0, 1e-12);

        // actives: tpf(1 - tpf) = 2/9 for both, hits [1, 1, 0] vs [0, 0, 1]
        // have covariance -1/3
        let var_actives = 2.0 / 9.0 + 2.0 / 9.0 + 2.0 / 3.0;
        // decoys: fpf(1 - fpf) = 2/9, hits [1, 0, 0] vs [0, 1, 0] have
        // covariance -1/6; squared slopes from s = EF (1 + ln EF / ln fpf)
        let s2_a = (2.0 * (1.0 + 2f64.ln() / fpf.ln())).powi(2);
        let s2_b = 1.0;
        let var_decoys = (s2_a + s2_b) * 2.0 / 9.0 + 2.0 * (1.0 / 6.0) * (s2_a * s2_b).sqrt();
        let se = 3.0 * (var_actives / 3.0 + var_decoys / 3.0).sqrt();
        assert_close(se, 2.2586223, 1e-6);

        let t = t_critical(5).unwrap();
        assert_close(diff.diff, 1.0, 1e-12);
        assert_close(diff.lower, 1.0 - se * t, 1e-9);
        assert_close(diff.upper, 1.0 + se * t, 1e-9);
        assert_close(diff.p_value, two_sided_p(1.0 / se, 5).unwrap(), 1e-9);
    }

    #[test]
    fn test_fpf_list_defaults() {
        assert_eq!(fpf_list(1000, None), vec![0.0001, 0.001, 0.01, 0.05, 1.0]);
        assert_eq!(fpf_list(40, None), vec![0.0001, 0.001, 0.01, 0.025, 0.05, 1.0]);
        assert_eq!(fpf_list(40, Some(0.02)), vec![0.0001, 0.001, 0.01, 0.02, 0.05, 1.0]);
        assert_eq!(fpf_list(40, Some(1.0)), vec![0.0001, 0.001, 0.01, 0.05, 1.0]);
    }
}

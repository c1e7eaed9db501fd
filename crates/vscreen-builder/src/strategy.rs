//! Ensemble selection strategies.
//!
//! - Exhaustive: every combination of each size, sizes independent.
//! - Greedy slow: grow one ensemble, re-evaluating every remaining query
//!   against it at each size.
//! - Greedy fast: rank single queries once and add them in rank order.
//!
//! Every strategy reports one [`SelectionStep`] per size from 1 to the
//! target, with winners picked by [`select_best`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vscreen_common::config::{ExecutionConfig, SelectionConfig};
use vscreen_common::{
    BuilderConfig, CompoundStore, Ensemble, Result, ScreeningSettings, StrategyKind,
    TieBreakPolicy, VscreenError,
};
use vscreen_ranker::curve::{decoys_at, is_resolvable};
use vscreen_ranker::metrics::fpf_list;
use vscreen_ranker::{select_best, EnsembleRecord};

use crate::parallel::ParallelEvaluator;

/// Fraction at which exhaustive search collects every candidate's EF.
pub const HISTOGRAM_FPF: f64 = 0.001;

/// Best ensemble found for one size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionStep {
    pub size: usize,
    pub ensemble: Ensemble,
    pub record: EnsembleRecord,
    /// Ensembles evaluated while producing this step.
    pub candidates_evaluated: usize,
    /// AUC of every candidate of this size (exhaustive search only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auc_distribution: Option<Vec<f64>>,
    /// EF at [`HISTOGRAM_FPF`] of every candidate of this size (exhaustive
    /// search on stores with enough decoys to resolve it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ef_distribution: Option<Vec<f64>>,
}

impl SelectionStep {
    fn new(size: usize, record: EnsembleRecord, candidates_evaluated: usize) -> Self {
        Self {
            size,
            ensemble: record.ensemble.clone(),
            record,
            candidates_evaluated,
            auc_distribution: None,
            ef_distribution: None,
        }
    }
}

/// Every `k`-combination of `queries` in lexicographic index order.
pub fn combinations(queries: &[String], k: usize) -> Result<Vec<Ensemble>> {
    let n = queries.len();
    if k == 0 || k > n {
        return Ok(Vec::new());
    }

    let mut indices: Vec<usize> = (0..k).collect();
    let mut out = Vec::new();
    loop {
        out.push(Ensemble::new(indices.iter().map(|&i| queries[i].as_str()))?);

        let Some(pos) = (0..k).rev().find(|&i| indices[i] < n - k + i) else {
            return Ok(out);
        };
        indices[pos] += 1;
        for j in pos + 1..k {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

pub struct EnsembleBuilder {
    evaluator: ParallelEvaluator,
    strategy: StrategyKind,
    target_size: usize,
    requested_fpf: Option<f64>,
    tie_break: TieBreakPolicy,
}

impl EnsembleBuilder {
    pub fn new(store: Arc<CompoundStore>, config: &BuilderConfig) -> Self {
        let fractions = fpf_list(store.n_decoys(), config.selection.fpf);
        Self {
            evaluator: ParallelEvaluator::new(store, config.screening, fractions, &config.execution),
            strategy: config.selection.strategy,
            target_size: config.selection.ensemble_size,
            requested_fpf: config.selection.fpf,
            tie_break: config.selection.tie_break,
        }
    }

    pub fn evaluator(&self) -> &ParallelEvaluator {
        &self.evaluator
    }

    /// Run the configured strategy up to the target size.
    pub fn select(&self) -> Result<Vec<SelectionStep>> {
        self.validate()?;
        info!(
            strategy = ?self.strategy,
            target = self.target_size,
            workers = self.evaluator.workers(),
            "Selecting ensembles"
        );
        match self.strategy {
            StrategyKind::Exhaustive => self.exhaustive(),
            StrategyKind::GreedySlow => self.greedy_slow(),
            StrategyKind::GreedyFast => self.greedy_fast(),
        }
    }

    fn validate(&self) -> Result<()> {
        let store = self.evaluator.store();
        let available = store.queries().len();
        if self.target_size == 0 || self.target_size > available {
            return Err(VscreenError::InvalidEnsembleSize {
                requested: self.target_size,
                available,
            });
        }
        if let Some(fpf) = self.requested_fpf {
            if !(fpf > 0.0 && fpf <= 1.0) {
                return Err(VscreenError::InvalidFraction(fpf));
            }
            if !is_resolvable(store.n_decoys(), fpf) {
                return Err(VscreenError::UnresolvableFraction(fpf));
            }
        }
        Ok(())
    }

    fn winner(&self, records: &[EnsembleRecord]) -> Result<EnsembleRecord> {
        select_best(records, self.requested_fpf, self.tie_break).cloned()
    }

    fn exhaustive(&self) -> Result<Vec<SelectionStep>> {
        let store = self.evaluator.store();
        let queries = store.queries();
        let histogram_key =
            is_resolvable(store.n_decoys(), HISTOGRAM_FPF).then(|| decoys_at(store.n_decoys(), HISTOGRAM_FPF));
        let mut steps = Vec::with_capacity(self.target_size);

        for size in 1..=self.target_size {
            let candidates = combinations(queries, size)?;
            info!(size, candidates = candidates.len(), "Exhaustive search");
            let records = self.evaluator.evaluate_all(&candidates)?;

            let mut step = SelectionStep::new(size, self.winner(&records)?, records.len());
            step.auc_distribution = Some(records.iter().filter_map(|r| r.auc_value()).collect());
            step.ef_distribution =
                histogram_key.map(|d| records.iter().filter_map(|r| r.ef_at(d)).collect());
            debug!(size, ensemble = %step.ensemble, "Best ensemble");
            steps.push(step);
        }
        Ok(steps)
    }

    fn greedy_slow(&self) -> Result<Vec<SelectionStep>> {
        let queries = self.evaluator.store().queries();
        let mut grown: Vec<String> = Vec::with_capacity(self.target_size);
        let mut steps = Vec::with_capacity(self.target_size);

        for size in 1..=self.target_size {
            info!(size, "Greedy search");
            let candidates = queries
                .iter()
                .filter(|q| !grown.contains(q))
                .map(|q| Ensemble::new(grown.iter().chain(std::iter::once(q)).map(String::as_str)))
                .collect::<Result<Vec<_>>>()?;

            let records = self.evaluator.evaluate_all(&candidates)?;
            let best = self.winner(&records)?;
            grown = best.ensemble.queries().to_vec();

            debug!(size, ensemble = %best.ensemble, "Best ensemble");
            steps.push(SelectionStep::new(size, best, records.len()));
        }
        Ok(steps)
    }

    /// Single queries are evaluated once (counted in the first step); every
    /// later step evaluates only the grown ensemble.
    fn greedy_fast(&self) -> Result<Vec<SelectionStep>> {
        let queries = self.evaluator.store().queries();
        let singles: Vec<Ensemble> = queries.iter().map(Ensemble::single).collect();
        info!(queries = singles.len(), "Ranking single queries");
        let mut remaining = self.evaluator.evaluate_all(&singles)?;

        let mut grown: Vec<String> = Vec::with_capacity(self.target_size);
        let mut steps = Vec::with_capacity(self.target_size);

        for size in 1..=self.target_size {
            let best = self.winner(&remaining)?;
            remaining.retain(|r| r.ensemble != best.ensemble);
            grown.extend(best.ensemble.queries().iter().cloned());

            let step = if size == 1 {
                SelectionStep::new(size, best, singles.len())
            } else {
                let ensemble = Ensemble::new(grown.iter().map(String::as_str))?;
                SelectionStep::new(size, self.evaluator.evaluate_one(&ensemble)?, 1)
            };
            debug!(size, ensemble = %step.ensemble, "Grown ensemble");
            steps.push(step);
        }
        Ok(steps)
    }
}

/// Select ensembles from 1 up to `target_size` queries. `worker_count` 0
/// uses every available CPU; ties left after every metric go to the
/// lexically smallest ensemble.
pub fn select(
    store: Arc<CompoundStore>,
    settings: ScreeningSettings,
    strategy: StrategyKind,
    target_size: usize,
    requested_fpf: Option<f64>,
    worker_count: usize,
) -> Result<Vec<SelectionStep>> {
    let config = BuilderConfig {
        screening: settings,
        selection: SelectionConfig {
            strategy,
            ensemble_size: target_size,
            fpf: requested_fpf,
            tie_break: TieBreakPolicy::default(),
        },
        execution: ExecutionConfig {
            workers: worker_count,
        },
    };
    EnsembleBuilder::new(store, &config).select()
}

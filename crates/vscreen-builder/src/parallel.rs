//! Batch evaluation of candidate ensembles.
//!
//! Candidates are cut into contiguous chunks, one per worker, and each chunk
//! is evaluated on a rayon pool sized to the chunk count. Chunk results are
//! concatenated in chunk order, so records always come back in candidate
//! order regardless of the worker count.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};
use vscreen_common::config::ExecutionConfig;
use vscreen_common::{CompoundStore, Ensemble, Result, ScreeningSettings};
use vscreen_ranker::{evaluate, EnsembleRecord};

/// Sizes of `chunks` contiguous chunks covering `len` items. Sizes differ by
/// at most one; never more chunks than items.
pub fn chunk_sizes(len: usize, chunks: usize) -> Vec<usize> {
    if len == 0 || chunks == 0 {
        return Vec::new();
    }
    let chunks = chunks.min(len);
    let (base, extra) = (len / chunks, len % chunks);
    (0..chunks).map(|i| base + usize::from(i < extra)).collect()
}

pub struct ParallelEvaluator {
    store: Arc<CompoundStore>,
    settings: ScreeningSettings,
    fpf_list: Vec<f64>,
    workers: usize,
}

impl ParallelEvaluator {
    /// The worker count is `execution.effective_workers()`, so it never
    /// exceeds the available CPUs.
    pub fn new(
        store: Arc<CompoundStore>,
        settings: ScreeningSettings,
        fpf_list: Vec<f64>,
        execution: &ExecutionConfig,
    ) -> Self {
        Self {
            store,
            settings,
            fpf_list,
            workers: execution.effective_workers(),
        }
    }

    pub fn store(&self) -> &CompoundStore {
        &self.store
    }

    pub fn settings(&self) -> &ScreeningSettings {
        &self.settings
    }

    pub fn fpf_list(&self) -> &[f64] {
        &self.fpf_list
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn evaluate_one(&self, ensemble: &Ensemble) -> Result<EnsembleRecord> {
        evaluate(&self.store, ensemble, &self.settings, &self.fpf_list)
    }

    /// Evaluate every candidate. Output order equals input order; the first
    /// failing candidate fails the batch.
    pub fn evaluate_all(&self, candidates: &[Ensemble]) -> Result<Vec<EnsembleRecord>> {
        let sizes = chunk_sizes(candidates.len(), self.workers);
        if sizes.len() <= 1 {
            debug!(candidates = candidates.len(), "Evaluating ensembles on the calling thread");
            return self.evaluate_chunk(candidates);
        }

        info!(
            "Evaluating {} ensembles on {} workers",
            candidates.len(),
            sizes.len()
        );

        let mut chunks = Vec::with_capacity(sizes.len());
        let mut rest = candidates;
        for size in &sizes {
            let (head, tail) = rest.split_at(*size);
            chunks.push(head);
            rest = tail;
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(chunks.len())
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Failed to build worker pool, evaluating sequentially: {}", e);
                return self.evaluate_chunk(candidates);
            }
        };

        let results: Vec<Result<Vec<EnsembleRecord>>> = pool.install(|| {
            chunks
                .par_iter()
                .enumerate()
                .map(|(index, chunk)| {
                    debug!(chunk = index, size = chunk.len(), "Evaluating chunk");
                    self.evaluate_chunk(chunk)
                })
                .collect()
        });

        let mut records = Vec::with_capacity(candidates.len());
        for chunk in results {
            records.extend(chunk?);
        }
        Ok(records)
    }

    fn evaluate_chunk(&self, chunk: &[Ensemble]) -> Result<Vec<EnsembleRecord>> {
        chunk.iter().map(|e| self.evaluate_one(e)).collect()
    }
}

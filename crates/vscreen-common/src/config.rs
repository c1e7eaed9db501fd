//! Run configuration for ensemble building.
//!
//! Every value an entry point needs (sort direction, sentinel score,
//! strategy, worker count) lives here and is passed explicitly; nothing is
//! read from process-wide state during a run.
//!
//! Loaded from TOML, YAML or JSON. Every field has a default so a partial
//! file is enough:
//!
//! ```toml
//! [screening]
//! sort_order = "descending"
//!
//! [selection]
//! strategy = "exhaustive"
//! ensemble_size = 3
//! fpf = 0.01
//! ```

use std::cmp::Ordering;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VscreenError};
use crate::store::CompoundStore;

/// Complete builder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub screening: ScreeningSettings,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,
}

// ── Screening ────────────────────────────────────────────────────────────────

/// Direction in which scores improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Lower is better (binding energy estimates).
    #[default]
    Ascending,
    /// Higher is better (similarities, probabilities).
    Descending,
}

impl SortOrder {
    /// Orders `a` before `b` when `a` is the better score.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        match self {
            SortOrder::Ascending => a.total_cmp(&b),
            SortOrder::Descending => b.total_cmp(&a),
        }
    }

    /// True when `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// True when `score` is at least as good as `threshold`.
    pub fn passes(self, score: f64, threshold: f64) -> bool {
        match self {
            SortOrder::Ascending => score <= threshold,
            SortOrder::Descending => score >= threshold,
        }
    }

    /// Legacy majority-sign heuristic: more positive than negative scores
    /// means higher is better. Never applied implicitly.
    pub fn infer(store: &CompoundStore) -> Self {
        let (mut positive, mut negative) = (0usize, 0usize);
        for compound in store.compounds() {
            for query in store.queries() {
                match compound.score(query) {
                    Some(s) if s > 0.0 => positive += 1,
                    Some(s) if s < 0.0 => negative += 1,
                    _ => {}
                }
            }
        }
        if positive > negative {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}

/// Per-run scoring conventions shared by every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreeningSettings {
    #[serde(default)]
    pub sort_order: SortOrder,

    /// Score meaning "no prediction available" (e.g. a failed docking run).
    #[serde(default = "default_sentinel")]
    pub sentinel_score: f64,
}

fn default_sentinel() -> f64 { 10000.0 }

impl Default for ScreeningSettings {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::default(),
            sentinel_score: default_sentinel(),
        }
    }
}

impl ScreeningSettings {
    pub fn new(sort_order: SortOrder) -> Self {
        Self {
            sort_order,
            ..Self::default()
        }
    }
}

// ── Selection ────────────────────────────────────────────────────────────────

/// Search strategy used to grow or enumerate ensembles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Every combination of every size.
    Exhaustive,
    /// Re-evaluate every remaining query against the growing ensemble.
    #[default]
    GreedySlow,
    /// Rank single queries once and take them in order.
    GreedyFast,
}

/// What to do when every tie-break threshold is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    /// Smallest ensemble in lexical query order wins.
    #[default]
    Lexical,
    /// First tied record in candidate order wins.
    FirstSeen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Largest ensemble to build.
    #[serde(default = "default_ensemble_size")]
    pub ensemble_size: usize,

    /// Fraction to train on; `None` trains on the first decoy (1 / N_decoys).
    #[serde(default)]
    pub fpf: Option<f64>,

    #[serde(default)]
    pub tie_break: TieBreakPolicy,
}

fn default_ensemble_size() -> usize { 1 }

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            ensemble_size: default_ensemble_size(),
            fpf: None,
            tie_break: TieBreakPolicy::default(),
        }
    }
}

// ── Execution ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of parallel workers; 0 uses every available CPU.
    #[serde(default)]
    pub workers: usize,
}

impl ExecutionConfig {
    /// Configured worker count capped at the available parallelism.
    pub fn effective_workers(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1);
        if self.workers == 0 {
            cpus
        } else {
            self.workers.min(cpus)
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

impl BuilderConfig {
    /// Load configuration from vscreen.toml.
    /// Checks VSCREEN_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("VSCREEN_CONFIG")
            .unwrap_or_else(|_| "vscreen.toml".to_string());

        if !Path::new(&path).exists() {
            anyhow::bail!("Config file not found: {}", path);
        }

        Self::from_toml(&path)
    }

    pub fn from_toml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.screening.sentinel_score.is_finite() {
            return Err(VscreenError::Config("sentinel_score must be finite".to_string()));
        }
        if self.selection.ensemble_size == 0 {
            return Err(VscreenError::Config("ensemble_size must be at least 1".to_string()));
        }
        if let Some(fpf) = self.selection.fpf {
            if !(fpf > 0.0 && fpf <= 1.0) {
                return Err(VscreenError::InvalidFraction(fpf));
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

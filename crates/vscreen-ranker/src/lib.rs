//! vscreen-ranker — Ensemble ranking and screening-performance statistics.
//!
//! Pipeline per ensemble: [`ranker::rank`] → [`curve::score_structure`] →
//! [`curve::auc_structure`] → [`metrics`] → [`record::EnsembleRecord`].
//! [`tiebreak::select_best`] picks a winner among evaluated records.

pub mod ranker;
pub mod curve;
pub mod stats;
pub mod metrics;
pub mod record;
pub mod tiebreak;

pub use metrics::{Auc, EnrichmentFactor, PairedDifference};
pub use record::{evaluate, roc_curve, EnsembleRecord};
pub use tiebreak::select_best;

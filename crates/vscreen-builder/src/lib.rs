//! vscreen-builder — Ensemble selection over a compound store.
//!
//! [`EnsembleBuilder`] runs one of the selection strategies and reports the
//! best ensemble per size. Candidate batches go through
//! [`ParallelEvaluator`], which spreads them over a rayon pool.

pub mod parallel;
pub mod strategy;
pub mod compare;
pub mod split;

pub use compare::{compare, evaluate_many, ComparisonReport};
pub use parallel::ParallelEvaluator;
pub use split::split;
pub use strategy::{select, EnsembleBuilder, SelectionStep};

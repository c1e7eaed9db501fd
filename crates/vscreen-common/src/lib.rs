//! vscreen-common — Shared types, errors, and configuration used across all vscreen crates.

pub mod error;
pub mod store;
pub mod config;

// Re-export commonly used types
pub use error::{Result, VscreenError};
pub use store::{Compound, CompoundStore, Ensemble, Label};
pub use config::{BuilderConfig, ScreeningSettings, SortOrder, StrategyKind, TieBreakPolicy};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VscreenError {
    #[error("Invalid compound store: {0}")]
    InvalidStore(String),

    #[error("Invalid ensemble: {0}")]
    InvalidEnsemble(String),

    #[error("Query '{0}' is not scored in the compound store")]
    UnknownQuery(String),

    #[error("Ensemble size {requested} is outside 1..={available}")]
    InvalidEnsembleSize { requested: usize, available: usize },

    #[error("False positive fraction {0} is outside (0, 1]")]
    InvalidFraction(f64),

    #[error("False positive fraction {0} cannot be resolved with the available decoys")]
    UnresolvableFraction(f64),

    #[error("No candidate ensembles to rank")]
    EmptyCandidates,

    #[error("Statistics error: {0}")]
    Statistics(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, VscreenError>;

//! Compound store and ensemble value types.
//!
//! A [`CompoundStore`] is built once per run by the ingestion layer and is
//! read-only afterwards. Workers share it behind an `Arc`.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VscreenError};

/// Activity class of a compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Active,
    Decoy,
}

impl Label {
    pub fn is_active(self) -> bool {
        matches!(self, Label::Active)
    }
}

/// A labeled compound with one score per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compound {
    id: String,
    label: Label,
    scores: HashMap<String, f64>,
}

impl Compound {
    pub fn new<I, Q>(id: impl Into<String>, label: Label, scores: I) -> Self
    where
        I: IntoIterator<Item = (Q, f64)>,
        Q: Into<String>,
    {
        Self {
            id: id.into(),
            label,
            scores: scores.into_iter().map(|(q, s)| (q.into(), s)).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn score(&self, query: &str) -> Option<f64> {
        self.scores.get(query).copied()
    }

    pub fn scores(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(q, s)| (q.as_str(), *s))
    }
}

/// Immutable collection of compounds scored by a fixed set of queries.
#[derive(Debug, Clone, Serialize)]
pub struct CompoundStore {
    queries: Vec<String>,
    compounds: Vec<Compound>,
    n_actives: usize,
    n_decoys: usize,
}

impl CompoundStore {
    /// Build a store, checking that query names and compound ids are unique
    /// and that every compound carries a finite score for every query.
    pub fn new(queries: Vec<String>, compounds: Vec<Compound>) -> Result<Self> {
        if queries.is_empty() {
            return Err(VscreenError::InvalidStore("no queries".to_string()));
        }
        if compounds.is_empty() {
            return Err(VscreenError::InvalidStore("no compounds".to_string()));
        }

        let mut seen = HashSet::new();
        for query in &queries {
            if !seen.insert(query.as_str()) {
                return Err(VscreenError::InvalidStore(format!("duplicate query '{query}'")));
            }
        }

        let mut ids = HashSet::new();
        for compound in &compounds {
            if !ids.insert(compound.id.as_str()) {
                return Err(VscreenError::InvalidStore(format!(
                    "duplicate compound id '{}'",
                    compound.id
                )));
            }
            for query in &queries {
                match compound.score(query) {
                    Some(score) if score.is_finite() => {}
                    Some(score) => {
                        return Err(VscreenError::InvalidStore(format!(
                            "compound '{}' has non-finite score {score} for query '{query}'",
                            compound.id
                        )))
                    }
                    None => {
                        return Err(VscreenError::InvalidStore(format!(
                            "compound '{}' has no score for query '{query}'",
                            compound.id
                        )))
                    }
                }
            }
        }

        let n_actives = compounds.iter().filter(|c| c.label.is_active()).count();
        let n_decoys = compounds.len() - n_actives;

        Ok(Self {
            queries,
            compounds,
            n_actives,
            n_decoys,
        })
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn n_actives(&self) -> usize {
        self.n_actives
    }

    pub fn n_decoys(&self) -> usize {
        self.n_decoys
    }

    pub fn has_query(&self, query: &str) -> bool {
        self.queries.iter().any(|q| q == query)
    }

    /// Fails with [`VscreenError::UnknownQuery`] on the first ensemble member
    /// the store does not score.
    pub fn check_ensemble(&self, ensemble: &Ensemble) -> Result<()> {
        match ensemble.iter().find(|q| !self.has_query(q)) {
            Some(missing) => Err(VscreenError::UnknownQuery(missing.to_string())),
            None => Ok(()),
        }
    }

    /// New store over the same queries holding only `compounds`.
    pub fn with_compounds(&self, compounds: Vec<Compound>) -> Result<Self> {
        Self::new(self.queries.clone(), compounds)
    }
}

/// An ordered, duplicate-free sequence of query names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Ensemble(Vec<String>);

impl Ensemble {
    pub fn new<I, Q>(queries: I) -> Result<Self>
    where
        I: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        let queries: Vec<String> = queries.into_iter().map(Into::into).collect();
        if queries.is_empty() {
            return Err(VscreenError::InvalidEnsemble("empty ensemble".to_string()));
        }
        let mut seen = HashSet::new();
        for query in &queries {
            if !seen.insert(query.as_str()) {
                return Err(VscreenError::InvalidEnsemble(format!(
                    "query '{query}' appears more than once"
                )));
            }
        }
        Ok(Self(queries))
    }

    pub fn single(query: impl Into<String>) -> Self {
        Self(vec![query.into()])
    }

    /// A copy of this ensemble with `query` appended.
    pub fn with(&self, query: impl Into<String>) -> Result<Self> {
        let mut queries = self.0.clone();
        queries.push(query.into());
        Self::new(queries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, query: &str) -> bool {
        self.0.iter().any(|q| q == query)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn queries(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for Ensemble {
    type Error = VscreenError;

    fn try_from(queries: Vec<String>) -> Result<Self> {
        Self::new(queries)
    }
}

impl From<Ensemble> for Vec<String> {
    fn from(ensemble: Ensemble) -> Self {
        ensemble.0
    }
}

impl fmt::Display for Ensemble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

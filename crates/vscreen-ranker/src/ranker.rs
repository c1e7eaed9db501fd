//! Best-score projection of an ensemble onto the compound store.
//!
//! Each compound is represented by the best score any ensemble member gives
//! it. Compounds whose best score is the sentinel value are moved to the end
//! of the ranking, alternating actives and decoys so that unscored compounds
//! do not bias the curve towards either class.

use serde::Serialize;
use vscreen_common::{Compound, CompoundStore, Ensemble, Label, Result, ScreeningSettings, SortOrder, VscreenError};

/// One compound as placed by the ranker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCompound<'a> {
    pub id: &'a str,
    /// Best score across the ensemble's queries.
    pub score: f64,
    /// Query that produced `score`.
    pub query: &'a str,
    pub label: Label,
}

/// Rank every compound in `store` by its best score across `ensemble`.
pub fn rank<'a>(
    store: &'a CompoundStore,
    ensemble: &'a Ensemble,
    settings: &ScreeningSettings,
) -> Result<Vec<RankedCompound<'a>>> {
    store.check_ensemble(ensemble)?;

    let order = settings.sort_order;
    let mut scored = Vec::with_capacity(store.len());
    let mut unscored_actives = Vec::new();
    let mut unscored_decoys = Vec::new();

    for compound in store.compounds() {
        let ranked = best_score(compound, ensemble, order)?;
        if ranked.score == settings.sentinel_score {
            match ranked.label {
                Label::Active => unscored_actives.push(ranked),
                Label::Decoy => unscored_decoys.push(ranked),
            }
        } else {
            scored.push(ranked);
        }
    }

    // Stable: equal scores keep store order.
    scored.sort_by(|a, b| order.compare(a.score, b.score));
    scored.extend(interleave(unscored_actives, unscored_decoys));

    Ok(scored)
}

/// First query in ensemble order wins on equal scores.
fn best_score<'a>(
    compound: &'a Compound,
    ensemble: &'a Ensemble,
    order: SortOrder,
) -> Result<RankedCompound<'a>> {
    let mut best: Option<(f64, &'a str)> = None;
    for query in ensemble.iter() {
        let score = compound
            .score(query)
            .ok_or_else(|| VscreenError::UnknownQuery(query.to_string()))?;
        match best {
            Some((current, _)) if !order.is_better(score, current) => {}
            _ => best = Some((score, query)),
        }
    }

    let (score, query) =
        best.ok_or_else(|| VscreenError::InvalidEnsemble("empty ensemble".to_string()))?;

    Ok(RankedCompound {
        id: compound.id(),
        score,
        query,
        label: compound.label(),
    })
}

/// a, d, a, d, ... followed by whatever is left of the longer list.
fn interleave<T>(actives: Vec<T>, decoys: Vec<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(actives.len() + decoys.len());
    let mut actives = actives.into_iter();
    let mut decoys = decoys.into_iter();
    loop {
        match (actives.next(), decoys.next()) {
            (None, None) => break,
            (a, d) => {
                out.extend(a);
                out.extend(d);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vscreen_test_utils::{four_compound_store, query_names};

    fn ids<'a>(ranked: &[RankedCompound<'a>]) -> Vec<&'a str> {
        ranked.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_rank_ascending_single_query() {
        let store = four_compound_store();
        let ensemble = Ensemble::single("Q1");
        let ranked = rank(&store, &ensemble, &ScreeningSettings::new(SortOrder::Ascending)).unwrap();
        assert_eq!(ids(&ranked), vec!["A1", "D1", "A2", "D2"]);
        assert!(ranked.iter().all(|r| r.query == "Q1"));
    }

    #[test]
    fn test_rank_descending_reverses() {
        let store = four_compound_store();
        let ensemble = Ensemble::single("Q1");
        let ranked = rank(&store, &ensemble, &ScreeningSettings::new(SortOrder::Descending)).unwrap();
        assert_eq!(ids(&ranked), vec!["D2", "A2", "D1", "A1"]);
    }

    #[test]
    fn test_best_score_picks_extremal_query() {
        let store = CompoundStore::new(
            query_names(2),
            vec![
                Compound::new("A1", Label::Active, [("Q1", -4.0), ("Q2", -9.0)]),
                Compound::new("D1", Label::Decoy, [("Q1", -6.0), ("Q2", -5.0)]),
            ],
        )
        .unwrap();
        let ensemble = Ensemble::new(["Q1", "Q2"]).unwrap();

        let asc = rank(&store, &ensemble, &ScreeningSettings::new(SortOrder::Ascending)).unwrap();
        assert_eq!((asc[0].id, asc[0].score, asc[0].query), ("A1", -9.0, "Q2"));
        assert_eq!((asc[1].id, asc[1].score, asc[1].query), ("D1", -6.0, "Q1"));

        let dsc = rank(&store, &ensemble, &ScreeningSettings::new(SortOrder::Descending)).unwrap();
        assert_eq!((dsc[0].id, dsc[0].score, dsc[0].query), ("A1", -4.0, "Q1"));
    }

    #[test]
    fn test_equal_scores_credit_first_query() {
        let store = CompoundStore::new(
            query_names(2),
            vec![Compound::new("A1", Label::Active, [("Q1", -7.0), ("Q2", -7.0)])],
        )
        .unwrap();
        let ensemble = Ensemble::new(["Q2", "Q1"]).unwrap();
        let ranked = rank(&store, &ensemble, &ScreeningSettings::default()).unwrap();
        assert_eq!(ranked[0].query, "Q2");
    }

    #[test]
    fn test_sentinel_compounds_interleave_at_end() {
        let sentinel = ScreeningSettings::default().sentinel_score;
        let store = CompoundStore::new(
            query_names(1),
            vec![
                Compound::new("D1", Label::Decoy, [("Q1", sentinel)]),
                Compound::new("D2", Label::Decoy, [("Q1", sentinel)]),
                Compound::new("A1", Label::Active, [("Q1", -8.0)]),
                Compound::new("D3", Label::Decoy, [("Q1", sentinel)]),
                Compound::new("A2", Label::Active, [("Q1", sentinel)]),
                Compound::new("D4", Label::Decoy, [("Q1", -3.0)]),
            ],
        )
        .unwrap();
        let ensemble = Ensemble::single("Q1");
        let ranked = rank(&store, &ensemble, &ScreeningSettings::default()).unwrap();
        assert_eq!(ids(&ranked), vec!["A1", "D4", "A2", "D1", "D2", "D3"]);
    }

    #[test]
    fn test_sentinel_is_configurable() {
        let store = CompoundStore::new(
            query_names(1),
            vec![
                Compound::new("A1", Label::Active, [("Q1", 0.0)]),
                Compound::new("D1", Label::Decoy, [("Q1", 5.0)]),
            ],
        )
        .unwrap();
        let settings = ScreeningSettings {
            sort_order: SortOrder::Ascending,
            sentinel_score: 0.0,
        };
        let ensemble = Ensemble::single("Q1");
        let ranked = rank(&store, &ensemble, &settings).unwrap();
        assert_eq!(ids(&ranked), vec!["D1", "A1"]);
    }

    #[test]
    fn test_unknown_query_is_rejected() {
        let store = four_compound_store();
        let ensemble = Ensemble::single("Q7");
        let err = rank(&store, &ensemble, &ScreeningSettings::default()).unwrap_err();
        assert!(matches!(err, VscreenError::UnknownQuery(q) if q == "Q7"));
    }

    #[test]
    fn test_interleave_surplus() {
        assert_eq!(interleave(vec![1, 3], vec![2, 4, 6, 8]), vec![1, 2, 3, 4, 6, 8]);
        assert_eq!(interleave(vec![1, 3, 5], vec![2]), vec![1, 2, 3, 5]);
        assert!(interleave::<u8>(vec![], vec![]).is_empty());
    }
}

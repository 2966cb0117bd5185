//! Bounded top-K store of scored brains.
//!
//! Entries are keyed by their exact score. A candidate whose score is
//! already present is dropped, so the first brain to reach a score keeps
//! it. Once full, a candidate is admitted only if it beats the current
//! minimum, which is evicted.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{BrainError, Result};
use crate::network::Brain;

/// Total order over finite scores.
#[derive(Clone, Copy, Debug)]
struct ScoreKey(f64);

impl PartialEq for ScoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoreKey {}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// A brain with its batch measures. The brain is shared, not copied, when
/// populations are merged.
#[derive(Clone, Debug)]
pub struct EvaluatedBrain {
    pub brain: Arc<Brain>,
    pub score: f64,
    pub rate: f64,
}

impl EvaluatedBrain {
    pub fn new(brain: impl Into<Arc<Brain>>, score: f64, rate: f64) -> Self {
        Self {
            brain: brain.into(),
            score,
            rate,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Population {
    capacity: usize,
    entries: BTreeMap<ScoreKey, EvaluatedBrain>,
}

impl Population {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(BrainError::InvalidConfig(
                "population capacity must be positive".into(),
            ));
        }
        Ok(Self {
            capacity,
            entries: BTreeMap::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns whether the candidate was admitted. NaN scores never are.
    pub fn insert(&mut self, candidate: EvaluatedBrain) -> bool {
        if candidate.score.is_nan() {
            return false;
        }
        let key = ScoreKey(candidate.score);
        if self.entries.contains_key(&key) {
            return false;
        }
        if self.entries.len() >= self.capacity {
            match self.entries.first_key_value() {
                Some((min, _)) if key > *min => {
                    self.entries.pop_first();
                }
                _ => return false,
            }
        }
        self.entries.insert(key, candidate);
        true
    }

    pub fn best(&self) -> Option<&EvaluatedBrain> {
        self.entries.last_key_value().map(|(_, e)| e)
    }

    /// Like [`best`](Self::best), but an empty population is an error.
    pub fn try_best(&self) -> Result<&EvaluatedBrain> {
        self.best().ok_or(BrainError::EmptyPopulation)
    }

    pub fn worst(&self) -> Option<&EvaluatedBrain> {
        self.entries.first_key_value().map(|(_, e)| e)
    }

    /// Entries from lowest to highest score.
    pub fn iter(&self) -> impl Iterator<Item = &EvaluatedBrain> {
        self.entries.values()
    }

    /// A fresh population of `self`'s capacity holding the top entries of
    /// both; ties between the two go to `self`.
    pub fn merge(&self, other: &Population) -> Population {
        let mut merged = Population {
            capacity: self.capacity,
            entries: BTreeMap::new(),
        };
        for e in self.iter().chain(other.iter()) {
            merged.insert(e.clone());
        }
        merged
    }
}

impl Extend<EvaluatedBrain> for Population {
    fn extend<T: IntoIterator<Item = EvaluatedBrain>>(&mut self, iter: T) {
        for e in iter {
            self.insert(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::QuantizedMatrix;
    use crate::layers::DenseLayer;
    use proptest::prelude::*;

    /// Distinct brains so first-wins ties are observable.
    fn brain(tag: i8) -> Arc<Brain> {
        let layer = DenseLayer::new(QuantizedMatrix::new(1, 1, vec![tag]).unwrap());
        Arc::new(Brain::new(vec![layer.into()]).unwrap())
    }

    fn eval(tag: i8, score: f64) -> EvaluatedBrain {
        EvaluatedBrain::new(brain(tag), score, score)
    }

    fn scores(p: &Population) -> Vec<f64> {
        p.iter().map(|e| e.score).collect()
    }

    #[test]
    fn test_keeps_top_k() {
        let mut p = Population::new(3).unwrap();
        for (i, s) in [0.5, 0.1, 0.9, 0.3, 0.7].into_iter().enumerate() {
            p.insert(eval(i as i8, s));
        }
        assert_eq!(scores(&p), vec![0.5, 0.7, 0.9]);
        assert_eq!(p.best().unwrap().score, 0.9);
        assert_eq!(p.worst().unwrap().score, 0.5);
    }

    #[test]
    fn test_full_rejects_equal_to_min() {
        let mut p = Population::new(2).unwrap();
        p.insert(eval(0, 0.4));
        p.insert(eval(1, 0.6));
        assert!(!p.insert(eval(2, 0.4)));
        assert!(!p.insert(eval(3, 0.2)));
        assert!(p.insert(eval(4, 0.5)));
        assert_eq!(scores(&p), vec![0.5, 0.6]);
    }

    #[test]
    fn test_first_insert_wins_on_tie() {
        let mut p = Population::new(4).unwrap();
        assert!(p.insert(eval(1, 0.5)));
        assert!(!p.insert(eval(2, 0.5)));
        assert_eq!(p.len(), 1);
        assert_eq!(p.best().unwrap().brain, brain(1));
    }

    #[test]
    fn test_nan_rejected() {
        let mut p = Population::new(2).unwrap();
        assert!(!p.insert(eval(0, f64::NAN)));
        assert!(p.is_empty());
        assert!(matches!(p.try_best(), Err(BrainError::EmptyPopulation)));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(Population::new(0).is_err());
    }

    #[test]
    fn test_merge_prefers_self_on_tie() {
        let mut a = Population::new(3).unwrap();
        let mut b = Population::new(3).unwrap();
        a.insert(eval(1, 0.5));
        b.insert(eval(2, 0.5));
        b.insert(eval(3, 0.8));
        let m = a.merge(&b);
        assert_eq!(scores(&m), vec![0.5, 0.8]);
        assert_eq!(m.worst().unwrap().brain, brain(1));
        assert_eq!(m.capacity(), 3);
    }

    proptest! {
        #[test]
        fn prop_insert_is_top_k_distinct(
            raw in proptest::collection::vec(0u8..40, 0..60),
            k in 1usize..8,
        ) {
            let mut p = Population::new(k).unwrap();
            for &s in &raw {
                p.insert(eval(0, s as f64));
                prop_assert!(p.len() <= k);
            }
            let mut distinct: Vec<f64> = raw.iter().map(|&s| s as f64).collect();
            distinct.sort_by(|a, b| a.total_cmp(b));
            distinct.dedup();
            let expected: Vec<f64> = distinct.iter().rev().take(k).rev().copied().collect();
            prop_assert_eq!(scores(&p), expected);
        }

        #[test]
        fn prop_merge_equals_bulk_insert(
            a in proptest::collection::vec(0u8..30, 0..20),
            b in proptest::collection::vec(0u8..30, 0..20),
            k in 1usize..6,
        ) {
            let mut pa = Population::new(k).unwrap();
            let mut pb = Population::new(k).unwrap();
            pa.extend(a.iter().map(|&s| eval(0, s as f64)));
            pb.extend(b.iter().map(|&s| eval(0, s as f64)));

            let mut bulk = Population::new(k).unwrap();
            bulk.extend(b.iter().chain(a.iter()).map(|&s| eval(0, s as f64)));

            prop_assert_eq!(scores(&pa.merge(&pb)), scores(&bulk));
            prop_assert_eq!(scores(&pb.merge(&pa)), scores(&bulk));
        }
    }
}

//! Weighted discrete sampling
//!
//! Every random choice the engine makes that is not a uniform stop position
//! goes through a [`WeightedTable`]: reel-set selection, trigger counts,
//! feature radii, jam/drop outcomes, multiplier values.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EngineResult, SpinError};

/// Immutable outcome → weight table with a prebuilt sampling index
///
/// Entry order is part of the table's identity: two tables with the same
/// entries in a different order draw different keys for the same RNG state.
/// Tables deserialized from a map are ordered by key.
#[derive(Clone)]
pub struct WeightedTable<K> {
    entries: Vec<(K, f64)>,
    index: WeightedIndex<f64>,
}

impl<K> WeightedTable<K> {
    /// Build a table, rejecting empty tables, negative or non-finite weights
    /// and tables whose weights sum to zero
    pub fn new(entries: impl IntoIterator<Item = (K, f64)>) -> EngineResult<Self> {
        let entries: Vec<(K, f64)> = entries.into_iter().collect();
        if entries.is_empty() {
            return Err(SpinError::config("weighted table is empty"));
        }
        if let Some(pos) = entries.iter().position(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(SpinError::config(format!(
                "weighted table entry {pos} has invalid weight {}",
                entries[pos].1
            )));
        }
        let index = WeightedIndex::new(entries.iter().map(|(_, w)| *w))
            .map_err(|e| SpinError::config(format!("weighted table rejected: {e}")))?;
        Ok(Self { entries, index })
    }

    /// Equal weight for every key
    pub fn uniform(keys: impl IntoIterator<Item = K>) -> EngineResult<Self> {
        Self::new(keys.into_iter().map(|k| (k, 1.0)))
    }

    /// Draw one key with probability weight / total
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &K {
        &self.entries[self.index.sample(rng)].0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.entries.iter().map(|(k, w)| (k, *w))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Probability of drawing `key` (0 if absent)
    pub fn probability(&self, key: &K) -> f64
    where
        K: PartialEq,
    {
        let total = self.total_weight();
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, w)| w / total)
            .sum()
    }

    /// Copy of this table with `key` removed
    pub fn without(&self, key: &K) -> EngineResult<Self>
    where
        K: PartialEq + Clone,
    {
        Self::new(
            self.entries
                .iter()
                .filter(|(k, _)| k != key)
                .map(|(k, w)| (k.clone(), *w)),
        )
    }

    /// Map keys through a fallible conversion, keeping weights and order
    pub fn try_map<U>(&self, mut f: impl FnMut(&K) -> EngineResult<U>) -> EngineResult<WeightedTable<U>> {
        let mut mapped = Vec::with_capacity(self.entries.len());
        for (k, w) in &self.entries {
            mapped.push((f(k)?, *w));
        }
        WeightedTable::new(mapped)
    }
}

impl<K: fmt::Debug> fmt::Debug for WeightedTable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, w)| (k, w)))
            .finish()
    }
}

impl<K: Serialize> Serialize for WeightedTable<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, w)| (k, w)))
    }
}

impl<'de, K> Deserialize<'de> for WeightedTable<K>
where
    K: Deserialize<'de> + Ord,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<K, f64>::deserialize(deserializer)?;
        Self::new(map).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_empty_table_rejected() {
        let err = WeightedTable::<u32>::new(Vec::new()).unwrap_err();
        assert!(matches!(err, SpinError::Configuration(_)));
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let err = WeightedTable::new(vec![(1u32, 0.0), (2, 0.0)]).unwrap_err();
        assert!(matches!(err, SpinError::Configuration(_)));
    }

    #[test]
    fn test_negative_weight_rejected() {
        assert!(WeightedTable::new(vec![(1u32, 1.0), (2, -0.5)]).is_err());
        assert!(WeightedTable::new(vec![(1u32, f64::NAN)]).is_err());
    }

    #[test]
    fn test_zero_weight_key_never_drawn() {
        let table = WeightedTable::new(vec![("a", 0.0), ("b", 3.0)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            assert_eq!(*table.sample(&mut rng), "b");
        }
    }

    #[test]
    fn test_sample_frequencies() {
        let table = WeightedTable::new(vec![(1u32, 1.0), (9, 9.0)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let n = 20_000;
        let nines = (0..n).filter(|_| *table.sample(&mut rng) == 9).count();
        let freq = nines as f64 / n as f64;
        assert!((freq - 0.9).abs() < 0.02, "freq {freq}");
    }

    #[test]
    fn test_same_seed_same_draws() {
        let table = WeightedTable::uniform(0u32..10).unwrap();
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        let xs: Vec<u32> = (0..50).map(|_| *table.sample(&mut a)).collect();
        let ys: Vec<u32> = (0..50).map(|_| *table.sample(&mut b)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_without_removes_key() {
        let table = WeightedTable::new(vec![("H1", 1.0), ("H2", 1.0)]).unwrap();
        let reduced = table.without(&"H1").unwrap();
        assert_eq!(reduced.len(), 1);
        assert!((reduced.probability(&"H2") - 1.0).abs() < 1e-12);
        assert!(table.without(&"H1").unwrap().without(&"H2").is_err());
    }

    #[test]
    fn test_deserialize_from_map() {
        let table: WeightedTable<u32> = serde_json::from_str(r#"{"4": 10, "5": 2}"#).unwrap();
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![4, 5]);
        assert!((table.probability(&4) - 10.0 / 12.0).abs() < 1e-12);

        let bad: Result<WeightedTable<u32>, _> = serde_json::from_str(r#"{"4": 0}"#);
        assert!(bad.is_err());
    }
}

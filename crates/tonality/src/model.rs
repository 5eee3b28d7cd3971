use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::chooser::Chooser;
use crate::keys::Key;
use crate::{Error, Result};

/// Probability of each melodic interval (in semitones) for one key.
///
/// Only intervals seen in training appear. Entries iterate in ascending
/// interval order, which is also the order categorical sampling walks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalDistribution {
    probabilities: BTreeMap<i8, f64>,
}

impl IntervalDistribution {
    /// Laplace-smoothed probabilities over the observed intervals:
    /// `(count + 1) / (total + distinct)`.
    pub fn from_counts(counts: &BTreeMap<i8, u64>) -> Self {
        let total: u64 = counts.values().sum();
        let denominator = (total + counts.len() as u64) as f64;
        let probabilities = counts
            .iter()
            .map(|(&interval, &count)| (interval, (count + 1) as f64 / denominator))
            .collect();
        Self { probabilities }
    }

    pub fn from_probabilities(probabilities: BTreeMap<i8, f64>) -> Self {
        Self { probabilities }
    }

    pub fn get(&self, interval: i8) -> Option<f64> {
        self.probabilities.get(&interval).copied()
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i8, f64)> + '_ {
        self.probabilities.iter().map(|(&i, &p)| (i, p))
    }

    pub fn total(&self) -> f64 {
        self.probabilities.values().sum()
    }

    /// Weighted categorical draw: walk the cumulative weights and return the
    /// first interval whose running total exceeds `unit * total`.
    pub fn sample<C: Chooser + ?Sized>(&self, chooser: &mut C) -> Option<i8> {
        if self.probabilities.is_empty() {
            return None;
        }
        let total = self.total();
        if total <= 0.0 {
            return None;
        }

        let target = chooser.unit() * total;
        let mut cumulative = 0.0;
        for (&interval, &weight) in &self.probabilities {
            cumulative += weight;
            if cumulative > target {
                return Some(interval);
            }
        }
        // Rounding can leave the walk just short of the target
        self.probabilities.keys().next_back().copied()
    }
}

/// Trained interval distributions, one per key with data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalModel {
    distributions: BTreeMap<Key, IntervalDistribution>,
}

impl IntervalModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: Key, distribution: IntervalDistribution) {
        self.distributions.insert(key, distribution);
    }

    pub fn get(&self, key: Key) -> Option<&IntervalDistribution> {
        self.distributions.get(&key)
    }

    /// The distribution for `key`, or the first trained key's when `key` has
    /// none. `None` only for an empty model.
    pub fn for_key_or_fallback(&self, key: Key) -> Option<(Key, &IntervalDistribution)> {
        if let Some(distribution) = self.distributions.get(&key) {
            return Some((key, distribution));
        }

        let (&fallback, distribution) = self.distributions.iter().next()?;
        warn!(
            requested = %key,
            fallback = %fallback,
            "no interval model for key, using fallback"
        );
        Some((fallback, distribution))
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.distributions.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, &IntervalDistribution)> + '_ {
        self.distributions.iter().map(|(&k, d)| (k, d))
    }

    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), keys = self.len(), "saved interval model");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json(&json)?;
        debug!(path = %path.display(), keys = model.len(), "loaded interval model");
        Ok(model)
    }
}

//! Random decisions for melody enhancement.
//!
//! Enhancement makes three kinds of draw: whether to fill a gap, how many
//! divisions to use, and which interval to step by. All of them go through
//! [`Chooser`] so callers can seed a generator for reproducible output or
//! script the draws in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait Chooser {
    /// A uniform draw from [0, 1).
    fn unit(&mut self) -> f64;

    /// A uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;
}

/// [`Chooser`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngChooser<R> {
    rng: R,
}

impl<R: Rng> RngChooser<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl RngChooser<StdRng> {
    /// Deterministic draws for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_os() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> Chooser for RngChooser<R> {
    fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.random_range(0..len)
    }
}

/// Replays fixed draws, then repeats the last one.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedChooser {
    units: Vec<f64>,
    indices: Vec<usize>,
    unit_pos: usize,
    index_pos: usize,
}

#[cfg(test)]
impl ScriptedChooser {
    pub(crate) fn new(units: &[f64], indices: &[usize]) -> Self {
        Self {
            units: units.to_vec(),
            indices: indices.to_vec(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl Chooser for ScriptedChooser {
    fn unit(&mut self) -> f64 {
        let value = self
            .units
            .get(self.unit_pos)
            .or(self.units.last())
            .copied()
            .unwrap_or(0.0);
        self.unit_pos += 1;
        value
    }

    fn index(&mut self, len: usize) -> usize {
        let value = self
            .indices
            .get(self.index_pos)
            .or(self.indices.last())
            .copied()
            .unwrap_or(0);
        self.index_pos += 1;
        value.min(len.saturating_sub(1))
    }
}

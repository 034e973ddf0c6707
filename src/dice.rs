//! Randomness seam for the engine.
//!
//! All stochastic decisions (freelance gigs, IPO allotments, fund NAV steps,
//! scam triggers, card picks) go through the [`Dice`] trait instead of a
//! global RNG. Production uses [`SeededDice`] backed by a seeded `StdRng`;
//! tests substitute [`ScriptedDice`] to pin exact outcomes.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::VecDeque;

/// Source of random draws for the engine.
///
/// Object-safe on purpose: the engine holds a `Box<dyn Dice>` injected at
/// construction.
pub trait Dice: Send {
    /// Uniform draw in [0, 1).
    fn roll(&mut self) -> f64;

    /// Uniform draw in [lo, hi).
    fn uniform(&mut self, lo: f64, hi: f64) -> f64;

    /// Gaussian draw with the given mean and standard deviation.
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64;

    /// Uniform index in [0, len). `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    /// Bernoulli draw with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.roll() < p
    }
}

/// Production dice backed by a seeded `StdRng`.
#[derive(Debug)]
pub struct SeededDice {
    rng: StdRng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Dice for SeededDice {
    fn roll(&mut self) -> f64 {
        self.rng.random_range(0.0..1.0)
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if lo >= hi {
            return lo;
        }
        self.rng.random_range(lo..hi)
    }

    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.rng.random_range(0..len)
    }
}

/// Dice that replays a scripted sequence of unit-interval values.
///
/// Each draw consumes the next scripted value `v`:
/// - `roll` returns `v`
/// - `uniform(lo, hi)` returns `lo + v * (hi - lo)`
/// - `gauss(mean, sd)` returns `mean + (v - 0.5) * 2 * sd`
/// - `index(len)` returns `(v * len).floor()`, capped at `len - 1`
///
/// When the script runs dry every draw sees `v = 0.5`, which keeps gaussian
/// steps at their mean and makes low-probability triggers (scams, missed
/// freelance gigs) fire deterministically false.
#[derive(Debug, Default)]
pub struct ScriptedDice {
    values: VecDeque<f64>,
}

impl ScriptedDice {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self { values: values.into_iter().collect() }
    }

    /// Append more scripted values.
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
    }

    fn next_value(&mut self) -> f64 {
        self.values.pop_front().unwrap_or(0.5)
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self) -> f64 {
        self.next_value()
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_value() * (hi - lo)
    }

    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + (self.next_value() - 0.5) * 2.0 * std_dev
    }

    fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        let idx = (self.next_value() * len as f64).floor() as usize;
        idx.min(len - 1)
    }
}

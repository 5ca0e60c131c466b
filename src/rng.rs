//! Random sources for resolution handlers.
//!
//! Every stochastic roll goes through [`RandomSource`], so tests can inject
//! a seeded generator or a scripted sequence. The dispatcher asks an
//! [`RngProvider`] for a fresh source per resolution.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Object-safe random number source.
pub trait RandomSource: Send {
    /// Uniform float in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform integer in `[lo, hi]`. Returns `lo` when `hi < lo`.
    fn int_inclusive(&mut self, lo: u64, hi: u64) -> u64;
}

impl<R: RngCore + Send> RandomSource for R {
    fn next_f64(&mut self) -> f64 {
        self.r#gen::<f64>()
    }

    fn int_inclusive(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        self.gen_range(lo..=hi)
    }
}

/// `true` with probability `percent / 100`.
pub fn percent_chance(rng: &mut dyn RandomSource, percent: f64) -> bool {
    rng.next_f64() * 100.0 < percent
}

/// `true` with probability `1 / one_in`. Values at or below one always hit.
pub fn roll(rng: &mut dyn RandomSource, one_in: u64) -> bool {
    if one_in <= 1 {
        return true;
    }
    rng.int_inclusive(1, one_in) == 1
}

/// Hands out one random source per task resolution.
pub trait RngProvider: Send + Sync {
    /// A fresh source, owned by a single resolution.
    fn source(&self) -> Box<dyn RandomSource>;
}

/// Sources seeded from operating-system entropy.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntropyRng;

impl RngProvider for EntropyRng {
    fn source(&self) -> Box<dyn RandomSource> {
        Box::new(StdRng::from_entropy())
    }
}

/// Reproducible sources: the n-th source is seeded with `seed + n`.
#[derive(Debug)]
pub struct SeededRng {
    seed: u64,
    issued: AtomicU64,
}

impl SeededRng {
    /// Provider whose first source is seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            issued: AtomicU64::new(0),
        }
    }
}

impl RngProvider for SeededRng {
    fn source(&self) -> Box<dyn RandomSource> {
        let n = self.issued.fetch_add(1, Ordering::Relaxed);
        Box::new(StdRng::seed_from_u64(self.seed.wrapping_add(n)))
    }
}

/// Pick the provider described by configuration.
pub fn provider_from_seed(seed: Option<u64>) -> Box<dyn RngProvider> {
    match seed {
        Some(seed) => Box::new(SeededRng::new(seed)),
        None => Box::new(EntropyRng),
    }
}

/// Replays a fixed list of floats, then repeats the last one.
///
/// Integer draws map the float onto the requested range, so a script of
/// `0.0` always yields `lo`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: VecDeque<f64>,
    last: f64,
}

impl ScriptedRandom {
    /// Script of floats in `[0, 1)`; an empty script always yields `0.0`.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            last: 0.0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        if let Some(value) = self.values.pop_front() {
            self.last = value;
        }
        self.last
    }

    fn int_inclusive(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as f64;
        let offset = (self.next_f64() * span).floor() as u64;
        lo + offset.min(hi - lo)
    }
}

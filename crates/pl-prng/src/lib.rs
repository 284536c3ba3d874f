//! Randomness primitives for dial parameter selection.
//!
//! Every selection the engine makes — protocol knobs, padding seeds, hold-off
//! durations — flows through this crate so that the distribution choices live
//! in one place. Seeds are opaque: downstream dialers derive padding lengths
//! and transform nonces from them, this crate only generates and carries them.

use std::fmt;
use std::time::Duration;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod regen;

/// Length in bytes of an opaque [`Seed`].
pub const SEED_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum PrngError {
    #[error("entropy source failed: {0}")]
    Entropy(String),

    #[error("invalid generator pattern: {0}")]
    Pattern(String),
}

/// Opaque cryptographic-strength seed.
///
/// Seeds are carried in persisted dial parameter records, so they serialize
/// as a fixed byte array. Equality is byte equality; two freshly drawn seeds
/// collide with negligible probability.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed(pub [u8; SEED_LENGTH]);

impl Seed {
    /// Draw a fresh seed from the OS entropy source.
    pub fn new() -> Result<Self, PrngError> {
        let mut bytes = [0u8; SEED_LENGTH];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| PrngError::Entropy(e.to_string()))?;
        Ok(Seed(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    // Seeds feed obfuscation layers; keep them out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Uniform integer choice in `[0, n)`. `n` must be greater than zero.
pub fn intn(n: usize) -> usize {
    debug_assert!(n > 0, "intn: n must be > 0");
    rand::thread_rng().gen_range(0..n.max(1))
}

/// Uniform duration in `[min, max]`. Returns `min` when the range is empty.
pub fn period(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = (max - min).as_secs_f64();
    let offset = rand::thread_rng().gen::<f64>() * span;
    min + Duration::from_secs_f64(offset)
}

/// Coin flip returning true with the given probability.
///
/// Probabilities outside `[0, 1]` are clamped.
pub fn weighted_coin_flip(probability: f64) -> bool {
    let p = probability.clamp(0.0, 1.0);
    rand::thread_rng().gen::<f64>() < p
}

/// A value in `[min, max]` drawn from an exponential distribution with rate
/// `lambda`, so values near `min` dominate.
///
/// With `lambda` near 2.0 the odds of landing near `min` are roughly 10x
/// those of landing near `max`; with `lambda` near 0.1 the distribution
/// approaches uniform.
pub fn exp_float64_range(min: f64, max: f64, lambda: f64) -> f64 {
    debug_assert!(lambda > 0.0, "exp_float64_range: lambda must be > 0");
    if max <= min {
        return min;
    }
    let u: f64 = rand::thread_rng().gen();
    // Inverse-CDF sample of Exp(1); u is in [0, 1) so the ln argument is
    // never zero.
    let exp = -(1.0 - u).ln();
    let value = min + (max - min) * (exp / lambda.max(f64::MIN_POSITIVE)).min(1.0);
    value.clamp(min, max)
}

//! Stochastic duration sources.
//!
//! Every sampler owns its own ChaCha stream derived from the run seed, so the
//! draws of one machine never shift the draws of another and two runs with the
//! same seed produce the same durations in the same order.
//!
//! Samples are truncated toward zero to whole ticks. A sample that truncates
//! below zero is a fatal [`SimError::NegativeDuration`].

use std::{collections::VecDeque, fmt};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Normal};

use crate::{
    clock::SimTime,
    error::{ConfigError, SimError},
};

/// Source of wait durations for a process.
pub trait DurationSampler: fmt::Debug {
    /// Draw the next duration in whole ticks.
    ///
    /// # Errors
    ///
    /// - `SimError::NegativeDuration` if the draw truncates below zero
    /// - `SimError::SamplerExhausted` for finite scripted sources
    fn sample(&mut self) -> Result<SimTime, SimError>;
}

/// Hands out independent RNG streams derived from one seed.
#[derive(Debug, Clone)]
pub struct SeedStreams {
    seed: u64,
    next_stream: u64,
}

impl SeedStreams {
    /// Streams for `seed`, starting at stream 0.
    pub fn new(seed: u64) -> Self {
        Self { seed, next_stream: 0 }
    }

    /// The run seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// RNG for the next stream.
    pub fn next_rng(&mut self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(self.next_stream);
        self.next_stream += 1;
        rng
    }
}

fn to_ticks(what: &'static str, raw: f64) -> Result<SimTime, SimError> {
    let value = raw.trunc() as i64;
    if value < 0 {
        return Err(SimError::NegativeDuration { what, value });
    }
    Ok(value as SimTime)
}

/// Normally distributed processing times.
#[derive(Debug, Clone)]
pub struct NormalSampler {
    dist: Normal<f64>,
    rng: ChaCha8Rng,
}

impl NormalSampler {
    /// Normal(`mean`, `sigma`) for machine `owner`.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidProcessTime` if `sigma` is negative or either
    ///   parameter is not finite
    pub fn new(owner: &str, mean: f64, sigma: f64, rng: ChaCha8Rng) -> Result<Self, ConfigError> {
        let invalid =
            || ConfigError::InvalidProcessTime { machine: owner.to_string(), mean, sigma };

        if !mean.is_finite() {
            return Err(invalid());
        }
        let dist = Normal::new(mean, sigma).map_err(|_| invalid())?;

        Ok(Self { dist, rng })
    }
}

impl DurationSampler for NormalSampler {
    fn sample(&mut self) -> Result<SimTime, SimError> {
        to_ticks("processing", self.dist.sample(&mut self.rng))
    }
}

/// Exponentially distributed intervals with a given mean.
#[derive(Debug, Clone)]
pub struct ExponentialSampler {
    what: &'static str,
    dist: Exp<f64>,
    rng: ChaCha8Rng,
}

impl ExponentialSampler {
    /// Exponential with rate `1 / mean`. `field` names the parameter
    /// (`mttf`, `mttr`) in errors and logs.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidRate` if `mean` is not positive and finite
    pub fn with_mean(
        owner: &str,
        field: &'static str,
        mean: f64,
        rng: ChaCha8Rng,
    ) -> Result<Self, ConfigError> {
        let invalid =
            || ConfigError::InvalidRate { machine: owner.to_string(), field, value: mean };

        if !(mean.is_finite() && mean > 0.0) {
            return Err(invalid());
        }
        let dist = Exp::new(1.0 / mean).map_err(|_| invalid())?;

        Ok(Self { what: field, dist, rng })
    }
}

impl DurationSampler for ExponentialSampler {
    fn sample(&mut self) -> Result<SimTime, SimError> {
        to_ticks(self.what, self.dist.sample(&mut self.rng))
    }
}

/// Always the same duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub SimTime);

impl DurationSampler for FixedSampler {
    fn sample(&mut self) -> Result<SimTime, SimError> {
        Ok(self.0)
    }
}

/// Replays a fixed list of durations, then an optional fallback forever.
#[derive(Debug, Clone)]
pub struct ScriptedSampler {
    name: String,
    values: VecDeque<SimTime>,
    fallback: Option<SimTime>,
}

impl ScriptedSampler {
    /// Replay `values` in order; error once they run out.
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = SimTime>) -> Self {
        Self { name: name.into(), values: values.into_iter().collect(), fallback: None }
    }

    /// After the script runs out, keep returning `value`.
    #[must_use]
    pub fn then_repeat(mut self, value: SimTime) -> Self {
        self.fallback = Some(value);
        self
    }
}

impl DurationSampler for ScriptedSampler {
    fn sample(&mut self) -> Result<SimTime, SimError> {
        self.values
            .pop_front()
            .or(self.fallback)
            .ok_or_else(|| SimError::SamplerExhausted(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_draws() {
        let mut a = SeedStreams::new(42);
        let mut b = SeedStreams::new(42);

        let mut sa = NormalSampler::new("m", 250.0, 15.0, a.next_rng()).unwrap();
        let mut sb = NormalSampler::new("m", 250.0, 15.0, b.next_rng()).unwrap();

        for _ in 0..100 {
            assert_eq!(sa.sample().unwrap(), sb.sample().unwrap());
        }
    }

    #[test]
    fn streams_are_independent() {
        let mut streams = SeedStreams::new(7);
        let mut first = ExponentialSampler::with_mean("m", "mttf", 100.0, streams.next_rng())
            .unwrap();
        let mut second = ExponentialSampler::with_mean("m", "mttf", 100.0, streams.next_rng())
            .unwrap();

        let a: Vec<_> = (0..20).map(|_| first.sample().unwrap()).collect();
        let b: Vec<_> = (0..20).map(|_| second.sample().unwrap()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn normal_draws_cluster_around_mean() {
        let mut s = NormalSampler::new("m", 250.0, 15.0, SeedStreams::new(1).next_rng()).unwrap();
        let n = 2_000;
        let total: u64 = (0..n).map(|_| s.sample().unwrap()).sum();
        let mean = total as f64 / f64::from(n);

        // truncation biases the mean down by about half a tick
        assert!((245.0..255.0).contains(&mean), "mean {mean}");
    }

    #[test]
    fn exponential_draws_have_configured_mean() {
        let mut s =
            ExponentialSampler::with_mean("m", "mttr", 1_000.0, SeedStreams::new(3).next_rng())
                .unwrap();
        let n = 5_000;
        let total: u64 = (0..n).map(|_| s.sample().unwrap()).sum();
        let mean = total as f64 / f64::from(n);

        assert!((900.0..1_100.0).contains(&mean), "mean {mean}");
    }

    #[test]
    fn negative_draw_is_fatal() {
        let mut s = NormalSampler::new("m", -50.0, 0.0, SeedStreams::new(0).next_rng()).unwrap();
        assert_eq!(
            s.sample().unwrap_err(),
            SimError::NegativeDuration { what: "processing", value: -50 }
        );
    }

    #[test]
    fn invalid_parameters_rejected() {
        let rng = SeedStreams::new(0).next_rng();
        assert!(NormalSampler::new("m", 10.0, -1.0, rng.clone()).is_err());
        assert!(NormalSampler::new("m", f64::NAN, 1.0, rng.clone()).is_err());
        assert!(ExponentialSampler::with_mean("m", "mttf", 0.0, rng.clone()).is_err());
        assert!(ExponentialSampler::with_mean("m", "mttr", f64::INFINITY, rng).is_err());
    }

    #[test]
    fn scripted_sampler_replays_then_falls_back() {
        let mut s = ScriptedSampler::new("ttf", [3, 5]).then_repeat(100);
        assert_eq!(s.sample().unwrap(), 3);
        assert_eq!(s.sample().unwrap(), 5);
        assert_eq!(s.sample().unwrap(), 100);
        assert_eq!(s.sample().unwrap(), 100);

        let mut finite = ScriptedSampler::new("repair", [1]);
        finite.sample().unwrap();
        assert_eq!(finite.sample().unwrap_err(), SimError::SamplerExhausted("repair".to_string()));
    }
}

//! Service and interarrival time distributions.
//!
//! A small closed set of distributions sampled by inverse CDF over a shared
//! 64-bit PRNG. Sampling dispatches over an enum rather than a boxed trait
//! object: one match per sample keeps the hot path free of indirection.

use rand::Rng;
use serde::Serialize;

use crate::error::Error;

/// The simulation-wide random number generator.
pub type SimRng = rand_pcg::Pcg64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
enum Kind {
    Exponential { mu: f64 },
    Uniform { a: f64, b: f64 },
    BoundedPareto { k: f64, p: f64, alpha: f64, c: f64 },
}

/// A nonnegative continuous distribution with validated parameters.
///
/// Construct via [`exponential`](Distribution::exponential),
/// [`uniform`](Distribution::uniform) or
/// [`bounded_pareto`](Distribution::bounded_pareto); invalid parameters are
/// rejected up front so that sampling can never fail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution {
    kind: Kind,
}

impl Distribution {
    /// Exponential with rate `mu`; `E[X] = 1/mu`. Requires `mu > 0`.
    pub fn exponential(mu: f64) -> Result<Self, Error> {
        if !(mu > 0.0) {
            return Err(Error::InvalidDistribution(format!(
                "exponential rate must be positive, got mu = {}",
                mu
            )));
        }
        Ok(Self {
            kind: Kind::Exponential { mu },
        })
    }

    /// Uniform on `[a, b]`. Requires `a <= b` and finite bounds.
    pub fn uniform(a: f64, b: f64) -> Result<Self, Error> {
        if !(a <= b) || !a.is_finite() || !b.is_finite() {
            return Err(Error::InvalidDistribution(format!(
                "uniform bounds must satisfy a <= b, got a = {}, b = {}",
                a, b
            )));
        }
        Ok(Self {
            kind: Kind::Uniform { a, b },
        })
    }

    /// Bounded Pareto on `[k, p]` with shape `alpha`.
    ///
    /// Requires `k > 0`, `p > k` and `alpha > 0`. The normalizer
    /// `C = k^alpha / (1 - (k/p)^alpha)` is precomputed once here.
    pub fn bounded_pareto(k: f64, p: f64, alpha: f64) -> Result<Self, Error> {
        if !(k > 0.0) || !(p > k) || !(alpha > 0.0) {
            return Err(Error::InvalidDistribution(format!(
                "bounded Pareto requires 0 < k < p and alpha > 0, got k = {}, p = {}, alpha = {}",
                k, p, alpha
            )));
        }
        let c = k.powf(alpha) / (1.0 - (k / p).powf(alpha));
        Ok(Self {
            kind: Kind::BoundedPareto { k, p, alpha, c },
        })
    }

    /// Draws one value. Consumes exactly one uniform from `rng`.
    pub fn sample(&self, rng: &mut SimRng) -> f64 {
        let u: f64 = rng.gen();
        match self.kind {
            Kind::Exponential { mu } => -(1.0 / mu) * (1.0 - u).ln(),
            Kind::Uniform { a, b } => (b - a) * u + a,
            Kind::BoundedPareto { k, alpha, c, .. } => {
                (-u / c + k.powf(-alpha)).powf(-1.0 / alpha)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn rng() -> SimRng {
        SimRng::seed_from_u64(123)
    }

    #[test]
    fn exponential_rejects_nonpositive_rate() {
        assert!(Distribution::exponential(0.0).is_err());
        assert!(Distribution::exponential(-1.5).is_err());
        assert!(Distribution::exponential(f64::NAN).is_err());
        assert!(Distribution::exponential(2.0).is_ok());
    }

    #[test]
    fn uniform_rejects_inverted_bounds() {
        assert!(Distribution::uniform(1.0, 0.5).is_err());
        assert!(Distribution::uniform(0.5, 0.5).is_ok());
    }

    #[test]
    fn bounded_pareto_rejects_bad_support() {
        assert!(Distribution::bounded_pareto(0.0, 10.0, 1.5).is_err());
        assert!(Distribution::bounded_pareto(2.0, 2.0, 1.5).is_err());
        assert!(Distribution::bounded_pareto(1.0, 10.0, 0.0).is_err());
        assert!(Distribution::bounded_pareto(1.0, 10.0, 1.5).is_ok());
    }

    #[test]
    fn exponential_sample_mean() {
        let dist = Distribution::exponential(2.0).unwrap();
        let mut rng = rng();
        let n = 200_000;
        let mean: f64 = (0..n).map(|_| dist.sample(&mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 0.5).abs() < 0.01, "mean = {}", mean);
    }

    #[test]
    fn uniform_sample_stays_in_bounds() {
        let dist = Distribution::uniform(0.3, 0.7).unwrap();
        let mut rng = rng();
        let mut sum = 0.0;
        for _ in 0..100_000 {
            let x = dist.sample(&mut rng);
            assert!((0.3..=0.7).contains(&x));
            sum += x;
        }
        assert!((sum / 100_000.0 - 0.5).abs() < 0.005);
    }

    #[test]
    fn bounded_pareto_sample_stays_in_bounds() {
        let dist = Distribution::bounded_pareto(1.0, 100.0, 1.5).unwrap();
        let mut rng = rng();
        for _ in 0..100_000 {
            let x = dist.sample(&mut rng);
            assert!(x >= 1.0 && x <= 100.0 + 1e-9, "x = {}", x);
        }
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let dist = Distribution::exponential(1.0).unwrap();
        let a: Vec<f64> = {
            let mut rng = rng();
            (0..16).map(|_| dist.sample(&mut rng)).collect()
        };
        let b: Vec<f64> = {
            let mut rng = rng();
            (0..16).map(|_| dist.sample(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }
}

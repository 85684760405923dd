//! Independent replications, optionally across worker threads.
//!
//! Every replication is seeded from `(base_seed, index)` alone, each worker
//! thread owns a private blueprint clone of the servers, and results land in
//! index-addressed slots, so the output is bit-identical no matter how many
//! workers run or how they are scheduled.

use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;

use colored::Color;
use log::debug;
use serde::Serialize;
use threadpool::ThreadPool;

use crate::error::Error;
use crate::log::get_colored;
use crate::seed::derive_seed;
use crate::server::ServerPolicy;
use crate::stats::{ci_half_width, mean};
use crate::system::{run_simulation, QueueSystem};

/// Knobs for a replication batch.
#[derive(Debug, Clone)]
pub struct ReplicateOptions {
    /// Number of independent runs; at least 2.
    pub n_replications: usize,
    /// Departures per replication.
    pub num_events: usize,
    /// Base seed; `None` draws one from entropy.
    pub seed: Option<u64>,
    /// Warmup departures discarded per replication.
    pub warmup: usize,
    /// Worker threads; 0 means all available cores (capped by
    /// `n_replications`).
    pub n_threads: usize,
    /// Confidence level of the reported intervals, in (0, 1).
    pub confidence: f64,
}

impl Default for ReplicateOptions {
    fn default() -> Self {
        Self {
            n_replications: 30,
            num_events: 1_000_000,
            seed: None,
            warmup: 0,
            n_threads: 0,
            confidence: 0.95,
        }
    }
}

/// Aggregated output of a replication batch.
#[derive(Debug, Clone, Serialize)]
pub struct ReplicationResult {
    /// Grand mean of the per-replication E\[N\] estimates.
    pub mean_n: f64,
    /// Grand mean of the per-replication E\[T\] estimates.
    pub mean_t: f64,
    /// Half-width of the t-interval around `mean_n`.
    pub ci_half_n: f64,
    /// Half-width of the t-interval around `mean_t`.
    pub ci_half_t: f64,
    /// Confidence level the intervals were computed at.
    pub confidence_level: f64,
    /// Per-replication E\[N\], indexed by replication id.
    pub raw_n: Vec<f64>,
    /// Per-replication E\[T\], indexed by replication id.
    pub raw_t: Vec<f64>,
}

impl ReplicationResult {
    /// Number of replications aggregated here.
    pub fn n_replications(&self) -> usize {
        self.raw_t.len()
    }

    /// Confidence interval for E\[N\] as `(lower, upper)`.
    pub fn ci_n(&self) -> (f64, f64) {
        (self.mean_n - self.ci_half_n, self.mean_n + self.ci_half_n)
    }

    /// Confidence interval for E\[T\] as `(lower, upper)`.
    pub fn ci_t(&self) -> (f64, f64) {
        (self.mean_t - self.ci_half_t, self.mean_t + self.ci_half_t)
    }
}

fn build_result(raw_n: Vec<f64>, raw_t: Vec<f64>, confidence: f64) -> ReplicationResult {
    ReplicationResult {
        mean_n: mean(&raw_n),
        mean_t: mean(&raw_t),
        ci_half_n: ci_half_width(&raw_n, confidence),
        ci_half_t: ci_half_width(&raw_t, confidence),
        confidence_level: confidence,
        raw_n,
        raw_t,
    }
}

impl QueueSystem {
    /// Runs `n_replications` statistically independent simulations and
    /// aggregates them into means with confidence intervals.
    ///
    /// The system itself is left untouched: workers simulate blueprint
    /// clones of the servers. For a fixed base seed the result is identical
    /// for every `n_threads` value.
    pub fn replicate(&self, options: &ReplicateOptions) -> Result<ReplicationResult, Error> {
        if options.n_replications < 2 {
            return Err(Error::TooFewReplications(options.n_replications));
        }
        if !(options.confidence > 0.0 && options.confidence < 1.0) {
            return Err(Error::InvalidConfidence(options.confidence));
        }
        self.routing.validate(self.servers.len())?;

        let n = options.n_replications;
        let base_seed = options.seed.unwrap_or_else(rand::random);
        let n_workers = if options.n_threads == 0 {
            thread::available_parallelism().map(|p| p.get()).unwrap_or(1)
        } else {
            options.n_threads
        }
        .min(n);

        debug!(
            target: "queuenet",
            "[0.000 {} queuenet] replicating: {} runs of {} events on {} workers, base seed {}",
            get_colored("DEBUG", Color::Blue),
            n,
            options.num_events,
            n_workers,
            base_seed
        );

        let blueprint: Vec<Box<dyn ServerPolicy>> = self
            .servers
            .iter()
            .map(|s| dyn_clone::clone_box(&*s.borrow()))
            .collect();
        let routing = Arc::new(self.routing.clone());
        let arrival_dist = self.arrival_dist;

        let mut raw_n = vec![0.0; n];
        let mut raw_t = vec![0.0; n];

        if n_workers == 1 {
            let mut local = blueprint;
            for (i, (slot_n, slot_t)) in raw_n.iter_mut().zip(raw_t.iter_mut()).enumerate() {
                let mut servers: Vec<&mut dyn ServerPolicy> = local
                    .iter_mut()
                    .map(|s: &mut Box<dyn ServerPolicy>| -> &mut dyn ServerPolicy { s.as_mut() })
                    .collect();
                let (rep_n, rep_t) = run_simulation(
                    &mut servers,
                    &arrival_dist,
                    &routing,
                    options.num_events,
                    derive_seed(base_seed, i as u64),
                    options.warmup,
                    None,
                    None,
                );
                *slot_n = rep_n;
                *slot_t = rep_t;
            }
            return Ok(build_result(raw_n, raw_t, options.confidence));
        }

        let pool = ThreadPool::new(n_workers);
        let (tx, rx) = channel();
        // Contiguous index ranges, the remainder spread over the first few
        // workers.
        let chunk = n / n_workers;
        let remainder = n % n_workers;
        let mut start = 0;
        for w in 0..n_workers {
            let end = start + chunk + usize::from(w < remainder);
            let tx = tx.clone();
            let mut local = blueprint.clone();
            let routing = routing.clone();
            let num_events = options.num_events;
            let warmup = options.warmup;
            pool.execute(move || {
                for i in start..end {
                    let mut servers: Vec<&mut dyn ServerPolicy> = local
                        .iter_mut()
                        .map(|s: &mut Box<dyn ServerPolicy>| -> &mut dyn ServerPolicy { s.as_mut() })
                        .collect();
                    let (rep_n, rep_t) = run_simulation(
                        &mut servers,
                        &arrival_dist,
                        &routing,
                        num_events,
                        derive_seed(base_seed, i as u64),
                        warmup,
                        None,
                        None,
                    );
                    tx.send((i, rep_n, rep_t)).unwrap();
                }
            });
            start = end;
        }
        drop(tx);

        let results: Vec<(usize, f64, f64)> = rx.iter().collect();
        assert_eq!(results.len(), n, "a replication worker failed");
        for (i, rep_n, rep_t) in results {
            raw_n[i] = rep_n;
            raw_t[i] = rep_t;
        }
        Ok(build_result(raw_n, raw_t, options.confidence))
    }
}

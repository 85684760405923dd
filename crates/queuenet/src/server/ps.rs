//! Processor sharing across `k` servers.
//!
//! With `n` jobs present, each receives service at rate `min(k, n) / n`:
//! full rate while capacity covers everyone, an even split once it does not.
//! For `k = 1` this is classic egalitarian processor sharing.

use crate::distribution::{Distribution, SimRng};
use crate::error::Error;
use crate::server::{validate_buffer_capacity, validate_num_servers, ServerCore, ServerPolicy};

/// PS policy with `k` servers.
#[derive(Debug, Clone)]
pub struct Ps {
    core: ServerCore,
    size_dist: Distribution,
    remaining: Vec<f64>,
    arrival_times: Vec<f64>,
}

impl Ps {
    /// Single server, unlimited buffer.
    pub fn new(size_dist: Distribution) -> Self {
        Self {
            core: ServerCore::new(1, None),
            size_dist,
            remaining: Vec::new(),
            arrival_times: Vec::new(),
        }
    }

    /// `num_servers` shared servers and an optional finite buffer.
    pub fn with_options(
        size_dist: Distribution,
        num_servers: u32,
        buffer_capacity: Option<u32>,
    ) -> Result<Self, Error> {
        validate_num_servers(num_servers)?;
        validate_buffer_capacity(buffer_capacity)?;
        Ok(Self {
            core: ServerCore::new(num_servers, buffer_capacity),
            size_dist,
            remaining: Vec::new(),
            arrival_times: Vec::new(),
        })
    }

    /// Per-job service rate at the current occupancy.
    fn rate(&self) -> f64 {
        let n = self.core.state;
        let k = self.core.num_servers;
        n.min(k) as f64 / n as f64
    }

    fn recalc_ttnc(&mut self) {
        if self.remaining.is_empty() {
            self.core.ttnc = f64::INFINITY;
            return;
        }
        let min_rem = self.remaining.iter().copied().fold(f64::INFINITY, f64::min);
        // Wall-clock horizon: remaining work divided by the per-job rate.
        self.core.ttnc = min_rem / self.rate();
    }

    fn min_index(&self) -> usize {
        let mut best = 0;
        for (i, &r) in self.remaining.iter().enumerate().skip(1) {
            if r < self.remaining[best] {
                best = i;
            }
        }
        best
    }
}

impl ServerPolicy for Ps {
    fn core(&self) -> &ServerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ServerCore {
        &mut self.core
    }

    fn reset(&mut self) {
        self.core.reset();
        self.remaining.clear();
        self.arrival_times.clear();
    }

    fn arrival(&mut self, rng: &mut SimRng) {
        self.remaining.push(self.size_dist.sample(rng));
        self.arrival_times.push(self.core.clock);
        self.core.state += 1;
        self.recalc_ttnc();
    }

    fn update(&mut self, dt: f64, _rng: &mut SimRng) -> bool {
        self.core.ttnc -= dt;
        self.core.clock += dt;
        if self.core.state == 0 {
            return false;
        }

        let work = dt * self.rate();
        for r in self.remaining.iter_mut() {
            *r -= work;
        }

        if self.core.ttnc <= 0.0 {
            let idx = self.min_index();
            let response_time = self.core.clock - self.arrival_times[idx];
            self.remaining.swap_remove(idx);
            self.arrival_times.swap_remove(idx);
            self.core.state -= 1;
            self.core.record_completion(response_time);
            self.recalc_ttnc();
            return true;
        }
        false
    }
}

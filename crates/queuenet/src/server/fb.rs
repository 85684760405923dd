//! Foreground-background (least attained service).
//!
//! All jobs tied for the least attained service share the server equally;
//! everyone else waits. Two future events compete for the next horizon: the
//! first active job finishing, and the active set catching up with the next
//! attained level (which then joins the sharing).

use crate::distribution::{Distribution, SimRng};
use crate::error::Error;
use crate::server::{validate_buffer_capacity, ServerCore, ServerPolicy};

// Attained-service levels drift apart by rounding without a comparison slack;
// the value is fixed so runs stay reproducible.
const LEVEL_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
struct Job {
    remaining: f64,
    attained: f64,
    arrival_time: f64,
}

/// FB policy. Intrinsically single-channel.
#[derive(Debug, Clone)]
pub struct Fb {
    core: ServerCore,
    size_dist: Distribution,
    jobs: Vec<Job>,
}

impl Fb {
    /// Unlimited buffer.
    pub fn new(size_dist: Distribution) -> Self {
        Self {
            core: ServerCore::new(1, None),
            size_dist,
            jobs: Vec::new(),
        }
    }

    /// Optional finite buffer.
    pub fn with_buffer_capacity(
        size_dist: Distribution,
        buffer_capacity: Option<u32>,
    ) -> Result<Self, Error> {
        validate_buffer_capacity(buffer_capacity)?;
        Ok(Self {
            core: ServerCore::new(1, buffer_capacity),
            size_dist,
            jobs: Vec::new(),
        })
    }

    fn min_attained(&self) -> f64 {
        self.jobs
            .iter()
            .map(|j| j.attained)
            .fold(f64::INFINITY, f64::min)
    }

    fn recalc_ttnc(&mut self) {
        if self.jobs.is_empty() {
            self.core.ttnc = f64::INFINITY;
            return;
        }

        let min_att = self.min_attained();
        let mut num_active = 0u32;
        let mut min_rem_active = f64::INFINITY;
        let mut next_level = f64::INFINITY;
        for j in &self.jobs {
            if j.attained <= min_att + LEVEL_EPSILON {
                num_active += 1;
                min_rem_active = min_rem_active.min(j.remaining);
            } else {
                next_level = next_level.min(j.attained);
            }
        }

        // Whichever comes first: an active job draining, or the active set
        // reaching the next attained level.
        let time_to_completion = min_rem_active * num_active as f64;
        let time_to_crossing = (next_level - min_att) * num_active as f64;
        self.core.ttnc = time_to_completion.min(time_to_crossing);
    }
}

impl ServerPolicy for Fb {
    fn core(&self) -> &ServerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ServerCore {
        &mut self.core
    }

    fn reset(&mut self) {
        self.core.reset();
        self.jobs.clear();
    }

    fn arrival(&mut self, rng: &mut SimRng) {
        self.jobs.push(Job {
            remaining: self.size_dist.sample(rng),
            attained: 0.0,
            arrival_time: self.core.clock,
        });
        self.core.state += 1;
        self.recalc_ttnc();
    }

    fn update(&mut self, dt: f64, _rng: &mut SimRng) -> bool {
        self.core.ttnc -= dt;
        self.core.clock += dt;
        if self.jobs.is_empty() {
            return false;
        }

        // The active set is stable within a step by the engine's dt choice.
        let min_att = self.min_attained();
        let num_active = self
            .jobs
            .iter()
            .filter(|j| j.attained <= min_att + LEVEL_EPSILON)
            .count();
        let work = dt / num_active as f64;
        for j in self.jobs.iter_mut() {
            if j.attained <= min_att + LEVEL_EPSILON {
                j.remaining -= work;
                j.attained += work;
            }
        }

        if self.core.ttnc <= 0.0 {
            if let Some(idx) = self.jobs.iter().position(|j| j.remaining <= LEVEL_EPSILON) {
                let response_time = self.core.clock - self.jobs[idx].arrival_time;
                self.jobs.remove(idx);
                self.core.state -= 1;
                self.core.record_completion(response_time);
                self.recalc_ttnc();
                return true;
            }
            // Level crossing: the active set just grew.
            self.recalc_ttnc();
        }
        false
    }
}

//! Shortest remaining processing time, preemptive.
//!
//! The job with the least remaining work is always in service; a shorter
//! arrival preempts it. Preempted jobs keep their remaining work exactly as
//! of the preemption instant.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::distribution::{Distribution, SimRng};
use crate::error::Error;
use crate::server::{validate_buffer_capacity, ServerCore, ServerPolicy};

#[derive(Debug, Clone)]
struct Job {
    remaining: f64,
    arrival_time: f64,
}

// Reversed comparison turns the max-heap into a min-heap on remaining work;
// arrival time breaks ties so the order is total and seed-deterministic.
impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .remaining
            .total_cmp(&self.remaining)
            .then(other.arrival_time.total_cmp(&self.arrival_time))
    }
}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.remaining == other.remaining && self.arrival_time == other.arrival_time
    }
}

impl Eq for Job {}

/// SRPT policy. Intrinsically single-channel.
#[derive(Debug, Clone)]
pub struct Srpt {
    core: ServerCore,
    size_dist: Distribution,
    /// Preempted and waiting jobs, keyed by remaining work.
    jobs: BinaryHeap<Job>,
    /// Arrival time of the job currently in service. Mirrors the in-service
    /// job because `ttnc` only carries its remaining work; it must be read
    /// before the next job is installed on completion.
    running_arrival_time: f64,
}

impl Srpt {
    /// Unlimited buffer.
    pub fn new(size_dist: Distribution) -> Self {
        Self {
            core: ServerCore::new(1, None),
            size_dist,
            jobs: BinaryHeap::new(),
            running_arrival_time: 0.0,
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
            jobs: BinaryHeap::new(),
            running_arrival_time: 0.0,
        })
    }

    fn install_top(&mut self) {
        let top = self.jobs.pop().unwrap();
        self.core.ttnc = top.remaining;
        self.running_arrival_time = top.arrival_time;
    }
}

impl ServerPolicy for Srpt {
    fn core(&self) -> &ServerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ServerCore {
        &mut self.core
    }

    fn reset(&mut self) {
        self.core.reset();
        self.jobs.clear();
        self.running_arrival_time = 0.0;
    }

    fn arrival(&mut self, rng: &mut SimRng) {
        if self.core.state > 0 {
            // Preempt: park the in-service job with its remaining work.
            self.jobs.push(Job {
                remaining: self.core.ttnc,
                arrival_time: self.running_arrival_time,
            });
        }
        self.jobs.push(Job {
            remaining: self.size_dist.sample(rng),
            arrival_time: self.core.clock,
        });
        self.install_top();
        self.core.state += 1;
    }

    fn update(&mut self, dt: f64, _rng: &mut SimRng) -> bool {
        self.core.ttnc -= dt;
        self.core.clock += dt;
        if self.core.ttnc <= 0.0 {
            self.core.state -= 1;
            // The completing job's arrival time must be consumed before the
            // next job overwrites it.
            let response_time = self.core.clock - self.running_arrival_time;
            self.core.record_completion(response_time);
            if self.core.state > 0 {
                self.install_top();
            } else {
                self.core.ttnc = f64::INFINITY;
            }
            return true;
        }
        false
    }
}

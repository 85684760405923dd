//! First-come-first-served with `k` parallel service channels.
//!
//! Jobs start service in arrival order as channels free up; with `k = 1`
//! this is the classic single FIFO line, with `k > 1` one line feeding `k`
//! registers (M/M/k when both distributions are exponential).

use std::collections::VecDeque;

use crate::distribution::{Distribution, SimRng};
use crate::error::Error;
use crate::server::{validate_buffer_capacity, validate_num_servers, ServerCore, ServerPolicy};

#[derive(Debug, Clone)]
struct Channel {
    remaining: f64,
    arrival_time: f64,
}

/// FCFS policy with `k` parallel channels and a FIFO wait queue.
#[derive(Debug, Clone)]
pub struct Fcfs {
    core: ServerCore,
    size_dist: Distribution,
    /// Jobs in service, at most `k` at a time.
    channels: Vec<Channel>,
    /// Arrival timestamps of jobs waiting for a free channel.
    wait_queue: VecDeque<f64>,
}

impl Fcfs {
    /// Single channel, unlimited buffer.
    pub fn new(size_dist: Distribution) -> Self {
        Self {
            core: ServerCore::new(1, None),
            size_dist,
            channels: Vec::new(),
            wait_queue: VecDeque::new(),
        }
    }

    /// `num_servers` parallel channels and an optional finite buffer.
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
            channels: Vec::with_capacity(num_servers as usize),
            wait_queue: VecDeque::new(),
        })
    }

    fn recalc_ttnc(&mut self) {
        self.core.ttnc = self
            .channels
            .iter()
            .map(|c| c.remaining)
            .fold(f64::INFINITY, f64::min);
    }

    /// Index of the channel closest to completion; first wins on ties.
    fn min_channel(&self) -> usize {
        let mut best = 0;
        for (i, c) in self.channels.iter().enumerate().skip(1) {
            if c.remaining < self.channels[best].remaining {
                best = i;
            }
        }
        best
    }
}

impl ServerPolicy for Fcfs {
    fn core(&self) -> &ServerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ServerCore {
        &mut self.core
    }

    fn reset(&mut self) {
        self.core.reset();
        self.channels.clear();
        self.wait_queue.clear();
    }

    fn arrival(&mut self, rng: &mut SimRng) {
        if self.channels.len() < self.core.num_servers as usize {
            self.channels.push(Channel {
                remaining: self.size_dist.sample(rng),
                arrival_time: self.core.clock,
            });
        } else {
            self.wait_queue.push_back(self.core.clock);
        }
        self.core.state += 1;
        self.recalc_ttnc();
    }

    fn update(&mut self, dt: f64, rng: &mut SimRng) -> bool {
        self.core.ttnc -= dt;
        self.core.clock += dt;
        for c in self.channels.iter_mut() {
            c.remaining -= dt;
        }
        if self.core.ttnc <= 0.0 && !self.channels.is_empty() {
            let idx = self.min_channel();
            let done = self.channels.swap_remove(idx);
            self.core.state -= 1;
            // A waiting job takes the freed channel; its wait so far is
            // credited through the original arrival timestamp.
            if let Some(arrival_time) = self.wait_queue.pop_front() {
                self.channels.push(Channel {
                    remaining: self.size_dist.sample(rng),
                    arrival_time,
                });
            }
            self.recalc_ttnc();
            self.core.record_completion(self.core.clock - done.arrival_time);
            return true;
        }
        false
    }
}

//! Server policies and the contract the network engine drives them through.
//!
//! Every policy is a state machine over three operations: a job arrives, a
//! slice of wall-clock time elapses, a completion is reported. The engine
//! only ever advances a server by at most its own time-to-next-completion
//! (TTNC), so "TTNC fell to zero or below" is the unique completion trigger.

use std::cell::RefCell;
use std::rc::Rc;

use dyn_clone::{clone_trait_object, DynClone};

use crate::distribution::{Distribution, SimRng};
use crate::error::Error;

mod fb;
mod fcfs;
mod ps;
mod srpt;

pub use fb::Fb;
pub use fcfs::Fcfs;
pub use ps::Ps;
pub use srpt::Srpt;

/// State and counters every policy exposes to the engine and to callers.
///
/// `mean_response_time` is the running mean sojourn of jobs completed at
/// this server, updated incrementally on each completion.
#[derive(Debug, Clone)]
pub struct ServerCore {
    pub(crate) clock: f64,
    pub(crate) ttnc: f64,
    pub(crate) state: u32,
    pub(crate) num_completions: u64,
    pub(crate) num_arrivals: u64,
    pub(crate) num_rejected: u64,
    pub(crate) last_response_time: f64,
    pub(crate) mean_response_time: f64,
    num_servers: u32,
    buffer_capacity: Option<u32>,
}

impl ServerCore {
    pub(crate) fn new(num_servers: u32, buffer_capacity: Option<u32>) -> Self {
        Self {
            clock: 0.0,
            ttnc: f64::INFINITY,
            state: 0,
            num_completions: 0,
            num_arrivals: 0,
            num_rejected: 0,
            last_response_time: 0.0,
            mean_response_time: 0.0,
            num_servers,
            buffer_capacity,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.clock = 0.0;
        self.ttnc = f64::INFINITY;
        self.state = 0;
        self.num_completions = 0;
        self.num_arrivals = 0;
        self.num_rejected = 0;
        self.last_response_time = 0.0;
        self.mean_response_time = 0.0;
    }

    /// Books one completion: counters, last response time and the running
    /// mean `T = T * (n-1)/n + t/n`.
    pub(crate) fn record_completion(&mut self, response_time: f64) {
        self.num_completions += 1;
        self.last_response_time = response_time;
        let n = self.num_completions as f64;
        self.mean_response_time = self.mean_response_time * (n - 1.0) / n + response_time / n;
    }
}

/// The behavioral contract between a scheduling policy and the engine.
///
/// The engine calls [`reset`](ServerPolicy::reset) once per simulation, then
/// interleaves [`arrival`](ServerPolicy::arrival) and
/// [`update`](ServerPolicy::update), reading
/// [`query_ttnc`](ServerPolicy::query_ttnc) to size each time step. Policies
/// are cloneable so replication workers can take private blueprint copies.
pub trait ServerPolicy: DynClone + Send + std::fmt::Debug {
    /// Shared state and counters.
    fn core(&self) -> &ServerCore;
    /// Mutable access for the engine's bookkeeping.
    fn core_mut(&mut self) -> &mut ServerCore;

    /// Restores the empty state and zeroes all counters.
    fn reset(&mut self);

    /// Registers a job arriving at the server's current local clock.
    ///
    /// The engine has already checked the server is not full.
    fn arrival(&mut self, rng: &mut SimRng);

    /// Advances the local clock by `dt` and drains `dt` of wall-clock time
    /// through the service rule. Returns `true` iff exactly one job
    /// completed during the step.
    ///
    /// The engine picks `dt` no larger than any server's TTNC, so at most
    /// one completion can occur; a call with `dt` below this server's own
    /// TTNC must not report one.
    fn update(&mut self, dt: f64, rng: &mut SimRng) -> bool;

    /// Time until this server's next completion, `+inf` when idle.
    fn query_ttnc(&self) -> f64 {
        self.core().ttnc
    }

    /// Local clock.
    fn clock(&self) -> f64 {
        self.core().clock
    }

    /// Number of jobs currently at this server (in service + waiting).
    fn state(&self) -> u32 {
        self.core().state
    }

    /// Jobs completed at this server.
    fn num_completions(&self) -> u64 {
        self.core().num_completions
    }

    /// Jobs offered to this server (accepted or rejected).
    fn num_arrivals(&self) -> u64 {
        self.core().num_arrivals
    }

    /// Jobs lost against this server's full buffer.
    fn num_rejected(&self) -> u64 {
        self.core().num_rejected
    }

    /// Number of parallel service channels.
    fn num_servers(&self) -> u32 {
        self.core().num_servers
    }

    /// Buffer capacity; `None` means unlimited.
    fn buffer_capacity(&self) -> Option<u32> {
        self.core().buffer_capacity
    }

    /// Sojourn time of the most recently completed job.
    fn last_response_time(&self) -> f64 {
        self.core().last_response_time
    }

    /// Running mean sojourn time of jobs completed here.
    fn mean_response_time(&self) -> f64 {
        self.core().mean_response_time
    }

    /// Whether an arriving job would be rejected.
    fn is_full(&self) -> bool {
        match self.core().buffer_capacity {
            Some(cap) => self.core().state >= cap,
            None => false,
        }
    }

    /// Fraction of offered jobs this server rejected, measured on the
    /// current measurement phase.
    fn loss_probability(&self) -> f64 {
        self.core().num_rejected as f64 / self.core().num_arrivals.max(1) as f64
    }
}

clone_trait_object!(ServerPolicy);

pub(crate) fn validate_buffer_capacity(buffer_capacity: Option<u32>) -> Result<(), Error> {
    match buffer_capacity {
        Some(0) => Err(Error::InvalidBufferCapacity),
        _ => Ok(()),
    }
}

pub(crate) fn validate_num_servers(num_servers: u32) -> Result<(), Error> {
    if num_servers == 0 {
        Err(Error::InvalidNumServers)
    } else {
        Ok(())
    }
}

/// Wraps a policy into the shared handle form [`QueueSystem`] consumes.
///
/// Keep a clone of the returned handle to read the server's counters after
/// a run.
///
/// [`QueueSystem`]: crate::system::QueueSystem
pub fn shared<P: ServerPolicy + 'static>(policy: P) -> Rc<RefCell<dyn ServerPolicy>> {
    Rc::new(RefCell::new(policy))
}

/// The four scheduling disciplines, for configuration-driven construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// First-come-first-served with `num_servers` parallel channels.
    Fcfs,
    /// Shortest remaining processing time, preemptive.
    Srpt,
    /// Processor sharing across `num_servers` servers.
    Ps,
    /// Foreground-background (least attained service).
    Fb,
}

/// Builds a server from a policy kind and the common options.
///
/// This is the uniform construction path: `num_servers > 1` on a policy that
/// intrinsically serves one job at a time (SRPT, FB) is a usage error.
pub fn build_server(
    kind: PolicyKind,
    size_dist: Distribution,
    num_servers: u32,
    buffer_capacity: Option<u32>,
) -> Result<Box<dyn ServerPolicy>, Error> {
    validate_num_servers(num_servers)?;
    match kind {
        PolicyKind::Fcfs => Ok(Box::new(Fcfs::with_options(
            size_dist,
            num_servers,
            buffer_capacity,
        )?)),
        PolicyKind::Ps => Ok(Box::new(Ps::with_options(
            size_dist,
            num_servers,
            buffer_capacity,
        )?)),
        PolicyKind::Srpt => {
            if num_servers > 1 {
                return Err(Error::MultiServerUnsupported { policy: "SRPT" });
            }
            Ok(Box::new(Srpt::with_buffer_capacity(
                size_dist,
                buffer_capacity,
            )?))
        }
        PolicyKind::Fb => {
            if num_servers > 1 {
                return Err(Error::MultiServerUnsupported { policy: "FB" });
            }
            Ok(Box::new(Fb::with_buffer_capacity(
                size_dist,
                buffer_capacity,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(mu: f64) -> Distribution {
        Distribution::exponential(mu).unwrap()
    }

    #[test]
    fn running_mean_matches_sample_mean() {
        let mut core = ServerCore::new(1, None);
        let samples = [0.5, 2.0, 1.25, 0.75];
        for &t in &samples {
            core.record_completion(t);
        }
        let expected: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((core.mean_response_time - expected).abs() < 1e-12);
        assert_eq!(core.num_completions, 4);
        assert_eq!(core.last_response_time, 0.75);
    }

    #[test]
    fn zero_buffer_capacity_is_rejected() {
        assert_eq!(
            Fcfs::with_options(exp(1.0), 1, Some(0)).err(),
            Some(Error::InvalidBufferCapacity)
        );
        assert_eq!(
            Srpt::with_buffer_capacity(exp(1.0), Some(0)).err(),
            Some(Error::InvalidBufferCapacity)
        );
    }

    #[test]
    fn build_server_rejects_multi_channel_srpt_and_fb() {
        assert_eq!(
            build_server(PolicyKind::Srpt, exp(1.0), 2, None).err(),
            Some(Error::MultiServerUnsupported { policy: "SRPT" })
        );
        assert_eq!(
            build_server(PolicyKind::Fb, exp(1.0), 2, None).err(),
            Some(Error::MultiServerUnsupported { policy: "FB" })
        );
        assert!(build_server(PolicyKind::Fcfs, exp(1.0), 2, None).is_ok());
        assert!(build_server(PolicyKind::Ps, exp(1.0), 2, None).is_ok());
    }

    #[test]
    fn build_server_rejects_zero_channels() {
        assert_eq!(
            build_server(PolicyKind::Fcfs, exp(1.0), 0, None).err(),
            Some(Error::InvalidNumServers)
        );
    }

    #[test]
    fn is_full_tracks_buffer_capacity() {
        let mut server = Fcfs::with_options(exp(1.0), 1, Some(2)).unwrap();
        let mut rng = crate::test_rng();
        assert!(!server.is_full());
        server.arrival(&mut rng);
        assert!(!server.is_full());
        server.arrival(&mut rng);
        assert!(server.is_full());
    }
}

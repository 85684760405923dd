#![warn(missing_docs)]
//! Discrete-event simulation of open queueing networks.
//!
//! A network is a list of stateful servers fed by an exogenous arrival
//! process, with probabilistic routing between servers and the system exit.
//! Four scheduling policies are provided ([`Fcfs`] with parallel channels,
//! preemptive [`Srpt`], processor-sharing [`Ps`] and foreground-background
//! [`Fb`]), all driven through one narrow contract ([`ServerPolicy`]) by a
//! time-to-next-event engine that accumulates E\[N\] and E\[T\].
//! [`QueueSystem::replicate`] runs statistically independent replications,
//! in parallel if asked, with deterministic per-replication seeding and
//! t-interval confidence estimates.
//!
//! ```rust
//! use queuenet::{Distribution, Fcfs, QueueSystem, SimOptions};
//! use queuenet::server::shared;
//!
//! // M/M/1: Poisson(1) arrivals, Exp(2) service.
//! let service = Distribution::exponential(2.0).unwrap();
//! let arrivals = Distribution::exponential(1.0).unwrap();
//! let mut system = QueueSystem::new(vec![shared(Fcfs::new(service))], arrivals);
//! let (mean_n, mean_t) = system
//!     .sim(&SimOptions { num_events: 50_000, seed: Some(42), ..Default::default() })
//!     .unwrap();
//! assert!(mean_n > 0.0 && mean_t > 0.0);
//! ```

pub mod distribution;
pub mod error;
pub mod event_log;
pub mod log;
pub mod replication;
pub mod routing;
pub mod seed;
pub mod server;
pub mod stats;
pub mod system;

pub use distribution::{Distribution, SimRng};
pub use error::Error;
pub use event_log::{EventKind, EventLog, OccupancyTrace, EXTERNAL, SYSTEM_EXIT};
pub use replication::{ReplicateOptions, ReplicationResult};
pub use routing::RoutingMatrix;
pub use server::{build_server, shared, Fb, Fcfs, PolicyKind, Ps, ServerPolicy, Srpt};
pub use system::{QueueSystem, SimOptions};

#[cfg(test)]
pub(crate) fn test_rng() -> SimRng {
    use rand::SeedableRng;
    SimRng::seed_from_u64(0x5EED)
}

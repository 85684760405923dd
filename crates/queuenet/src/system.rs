//! The queueing network and its time-to-next-event engine.
//!
//! A network is a set of servers fed by an external arrival process at
//! server 0, with completed jobs routed between servers or out of the
//! system. The engine never keeps an event calendar: the only future events
//! are each server's time-to-next-completion and the one pending external
//! arrival, so every step simply advances the shared clock to the nearest
//! of those horizons.

use std::cell::RefCell;
use std::rc::Rc;

use colored::Color;
use log::Level::Trace;
use log::{debug, log_enabled, trace};
use rand::SeedableRng;

use crate::distribution::{Distribution, SimRng};
use crate::error::Error;
use crate::event_log::{EventKind, EventLog, EXTERNAL, SYSTEM_EXIT};
use crate::log::get_colored;
use crate::routing::RoutingMatrix;
use crate::server::ServerPolicy;

/// Knobs for a single simulation run.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Number of job completions (departures from the system) to simulate.
    pub num_events: usize,
    /// RNG seed; `None` draws one from entropy.
    pub seed: Option<u64>,
    /// Departures to discard before measurement starts.
    pub warmup: usize,
    /// Record every departing job's sojourn time in `response_times`.
    pub track_response_times: bool,
    /// Record the full event trace in `event_log`.
    pub track_events: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            num_events: 1_000_000,
            seed: None,
            warmup: 0,
            track_response_times: false,
            track_events: false,
        }
    }
}

/// An open queueing network of servers plus the statistics of its last run.
///
/// Servers are shared handles: callers may keep their own `Rc` to a server
/// they added and read its counters after a run. The system borrows each
/// server mutably only for the duration of [`sim`](QueueSystem::sim) /
/// [`replicate`](QueueSystem::replicate).
pub struct QueueSystem {
    pub(crate) servers: Vec<Rc<RefCell<dyn ServerPolicy>>>,
    pub(crate) arrival_dist: Distribution,
    pub(crate) routing: RoutingMatrix,
    mean_response_time: f64,
    response_times: Vec<f64>,
    event_log: EventLog,
}

impl QueueSystem {
    /// Creates a network with tandem routing: each server forwards to the
    /// next one, the last server exits.
    pub fn new(servers: Vec<Rc<RefCell<dyn ServerPolicy>>>, arrival_dist: Distribution) -> Self {
        Self::with_routing_matrix(servers, arrival_dist, RoutingMatrix::tandem())
    }

    /// Creates a network with an explicit routing matrix.
    pub fn with_routing_matrix(
        servers: Vec<Rc<RefCell<dyn ServerPolicy>>>,
        arrival_dist: Distribution,
        routing: RoutingMatrix,
    ) -> Self {
        Self {
            servers,
            arrival_dist,
            routing,
            mean_response_time: 0.0,
            response_times: Vec::new(),
            event_log: EventLog::new(),
        }
    }

    /// Appends a server to the network.
    pub fn add_server(&mut self, server: Rc<RefCell<dyn ServerPolicy>>) {
        self.servers.push(server);
    }

    /// Replaces the routing matrix. Validated when a simulation starts.
    pub fn set_routing_matrix(&mut self, routing: RoutingMatrix) {
        self.routing = routing;
    }

    /// The servers of this network, in index order.
    pub fn servers(&self) -> &[Rc<RefCell<dyn ServerPolicy>>] {
        &self.servers
    }

    /// Mean sojourn time of the last run (the `T` of `sim`).
    pub fn mean_response_time(&self) -> f64 {
        self.mean_response_time
    }

    /// Per-job sojourn times of the last run; empty unless
    /// [`SimOptions::track_response_times`] was set.
    pub fn response_times(&self) -> &[f64] {
        &self.response_times
    }

    /// Event trace of the last run; empty unless
    /// [`SimOptions::track_events`] was set.
    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Runs one simulation and returns `(mean_N, mean_T)`: the time-average
    /// number of jobs in the network and the mean sojourn time.
    ///
    /// All configuration errors surface here, before any random draw.
    pub fn sim(&mut self, options: &SimOptions) -> Result<(f64, f64), Error> {
        self.routing.validate(self.servers.len())?;
        let seed = options.seed.unwrap_or_else(rand::random);

        self.response_times.clear();
        if options.track_response_times {
            self.response_times.reserve(options.num_events);
        }
        self.event_log.clear();
        if options.track_events {
            self.event_log.reserve(2 * options.num_events);
        }

        debug!(
            target: "queuenet",
            "[0.000 {} queuenet] starting simulation: {} servers, {} events, warmup {}, seed {}",
            get_colored("DEBUG", Color::Blue),
            self.servers.len(),
            options.num_events,
            options.warmup,
            seed
        );

        let mut guards: Vec<std::cell::RefMut<'_, dyn ServerPolicy>> = self
            .servers
            .iter()
            .map(|s: &Rc<RefCell<dyn ServerPolicy>>| -> std::cell::RefMut<'_, dyn ServerPolicy> {
                s.borrow_mut()
            })
            .collect();
        let mut servers: Vec<&mut dyn ServerPolicy> = guards
            .iter_mut()
            .map(|g: &mut std::cell::RefMut<'_, dyn ServerPolicy>| -> &mut dyn ServerPolicy {
                &mut **g
            })
            .collect();
        let (mean_n, mean_t) = run_simulation(
            &mut servers,
            &self.arrival_dist,
            &self.routing,
            options.num_events,
            seed,
            options.warmup,
            options.track_response_times.then_some(&mut self.response_times),
            options.track_events.then_some(&mut self.event_log),
        );
        drop(servers);
        drop(guards);

        debug!(
            target: "queuenet",
            "[{} queuenet] finished: mean_N = {:.6}, mean_T = {:.6}",
            get_colored("DEBUG", Color::Blue),
            mean_n,
            mean_t
        );

        self.mean_response_time = mean_t;
        Ok((mean_n, mean_t))
    }
}

fn min_ttnc(servers: &[&mut dyn ServerPolicy]) -> f64 {
    servers
        .iter()
        .map(|s| s.query_ttnc())
        .fold(f64::INFINITY, f64::min)
}

/// The event loop shared by `sim` and every replication worker.
///
/// Drives `servers` under `arrival_dist` and `routing` until `num_events`
/// jobs have left the system during the measurement phase, after an optional
/// warmup of `warmup` departures whose statistics are discarded.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_simulation(
    servers: &mut [&mut dyn ServerPolicy],
    arrival_dist: &Distribution,
    routing: &RoutingMatrix,
    num_events: usize,
    seed: u64,
    warmup: usize,
    mut response_times: Option<&mut Vec<f64>>,
    mut event_log: Option<&mut EventLog>,
) -> (f64, f64) {
    let n_servers = servers.len();
    let mut rng = SimRng::seed_from_u64(seed);

    for s in servers.iter_mut() {
        s.reset();
    }

    let mut ttna = arrival_dist.sample(&mut rng);
    let mut state: i64 = 0;
    let mut completed: Vec<usize> = Vec::with_capacity(n_servers);

    // Warmup: the same loop, with no statistics kept. Departures and
    // buffer losses both count towards the warmup target.
    if warmup > 0 {
        let mut warmup_done = 0;
        while warmup_done < warmup {
            let ttnc = min_ttnc(servers);
            let dt = ttnc.min(ttna);

            completed.clear();
            for (i, s) in servers.iter_mut().enumerate() {
                if s.update(dt, &mut rng) {
                    completed.push(i);
                }
            }
            for &idx in &completed {
                let dest = routing.route(idx, n_servers, &mut rng);
                if dest >= n_servers {
                    warmup_done += 1;
                    state -= 1;
                } else {
                    servers[dest].core_mut().num_arrivals += 1;
                    if servers[dest].is_full() {
                        servers[dest].core_mut().num_rejected += 1;
                        warmup_done += 1;
                        state -= 1;
                    } else {
                        servers[dest].arrival(&mut rng);
                    }
                }
            }
            if ttna <= ttnc {
                servers[0].core_mut().num_arrivals += 1;
                if servers[0].is_full() {
                    servers[0].core_mut().num_rejected += 1;
                } else {
                    state += 1;
                    servers[0].arrival(&mut rng);
                }
                ttna = arrival_dist.sample(&mut rng);
            } else {
                ttna -= dt;
            }
        }

        // Loss probabilities are measured on the steady-state phase only;
        // queues and in-service jobs are deliberately left as they are.
        for s in servers.iter_mut() {
            let core = s.core_mut();
            core.num_rejected = 0;
            core.num_arrivals = 0;
        }
    }

    // Measurement phase.
    let mut num_completions: usize = 0;
    let mut area_n = 0.0;
    let mut clock = 0.0;

    while num_completions < num_events {
        let ttnc = min_ttnc(servers);
        let dt = ttnc.min(ttna);

        clock += dt;
        area_n += state as f64 * dt;

        completed.clear();
        for (i, s) in servers.iter_mut().enumerate() {
            if s.update(dt, &mut rng) {
                completed.push(i);
            }
        }

        for &idx in &completed {
            let dest = routing.route(idx, n_servers, &mut rng);
            if dest >= n_servers {
                num_completions += 1;
                state -= 1;
                if let Some(rt) = response_times.as_mut() {
                    rt.push(servers[idx].last_response_time());
                }
                if let Some(log) = event_log.as_mut() {
                    log.push(clock, EventKind::Departure, idx as i32, SYSTEM_EXIT, state as i32);
                }
                if log_enabled!(Trace) {
                    trace!(
                        target: "queuenet",
                        "[{:.3} {} queuenet] departure: server {}, state {}",
                        clock,
                        get_colored("EVENT", Color::BrightBlack),
                        idx,
                        state
                    );
                }
            } else {
                servers[dest].core_mut().num_arrivals += 1;
                if servers[dest].is_full() {
                    servers[dest].core_mut().num_rejected += 1;
                    num_completions += 1;
                    state -= 1;
                    if let Some(log) = event_log.as_mut() {
                        log.push(clock, EventKind::Rejection, idx as i32, dest as i32, state as i32);
                    }
                    if log_enabled!(Trace) {
                        trace!(
                            target: "queuenet",
                            "[{:.3} {} queuenet] rejection: server {} -> {}, state {}",
                            clock,
                            get_colored("EVENT", Color::BrightBlack),
                            idx,
                            dest,
                            state
                        );
                    }
                } else {
                    servers[dest].arrival(&mut rng);
                    if let Some(log) = event_log.as_mut() {
                        log.push(clock, EventKind::Route, idx as i32, dest as i32, state as i32);
                    }
                    if log_enabled!(Trace) {
                        trace!(
                            target: "queuenet",
                            "[{:.3} {} queuenet] route: server {} -> {}, state {}",
                            clock,
                            get_colored("EVENT", Color::BrightBlack),
                            idx,
                            dest,
                            state
                        );
                    }
                }
            }
        }

        // Simultaneous horizons resolve completions first, then the arrival.
        if ttna <= ttnc {
            servers[0].core_mut().num_arrivals += 1;
            if servers[0].is_full() {
                servers[0].core_mut().num_rejected += 1;
                if let Some(log) = event_log.as_mut() {
                    log.push(clock, EventKind::Rejection, EXTERNAL, 0, state as i32);
                }
            } else {
                state += 1;
                servers[0].arrival(&mut rng);
                if let Some(log) = event_log.as_mut() {
                    log.push(clock, EventKind::Arrival, EXTERNAL, 0, state as i32);
                }
            }
            ttna = arrival_dist.sample(&mut rng);
        } else {
            ttna -= dt;
        }
    }

    let mean_n = if clock > 0.0 { area_n / clock } else { 0.0 };
    let mean_t = area_n / num_completions.max(1) as f64;
    (mean_n, mean_t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{shared, Fcfs};

    fn exp(rate: f64) -> Distribution {
        Distribution::exponential(rate).unwrap()
    }

    fn mm1(lam: f64, mu: f64) -> QueueSystem {
        QueueSystem::new(vec![shared(Fcfs::new(exp(mu)))], exp(lam))
    }

    #[test]
    fn sim_reports_positive_estimates() {
        let mut system = mm1(1.0, 2.0);
        let (n, t) = system
            .sim(&SimOptions {
                num_events: 20_000,
                seed: Some(42),
                ..Default::default()
            })
            .unwrap();
        assert!(n > 0.0);
        assert!(t > 0.0);
        assert_eq!(system.mean_response_time(), t);
    }

    #[test]
    fn invalid_routing_matrix_fails_before_running() {
        let mut system = mm1(1.0, 2.0);
        system.set_routing_matrix(RoutingMatrix::from_rows(vec![vec![0.5, 0.3]]));
        let err = system.sim(&SimOptions::default()).unwrap_err();
        assert!(matches!(err, Error::RoutingMatrixRowSum { row: 0, .. }));
    }

    #[test]
    fn tracking_disabled_leaves_buffers_empty() {
        let mut system = mm1(1.0, 2.0);
        system
            .sim(&SimOptions {
                num_events: 5_000,
                seed: Some(7),
                ..Default::default()
            })
            .unwrap();
        assert!(system.response_times().is_empty());
        assert!(system.event_log().is_empty());
    }

    #[test]
    fn server_counters_survive_the_run() {
        let server = shared(Fcfs::new(exp(2.0)));
        let mut system = QueueSystem::new(vec![server.clone()], exp(1.0));
        system
            .sim(&SimOptions {
                num_events: 10_000,
                seed: Some(42),
                ..Default::default()
            })
            .unwrap();
        // The caller-held handle sees the run's counters.
        assert_eq!(server.borrow().num_completions(), 10_000);
        assert!(server.borrow().num_arrivals() >= 10_000);
        assert!(server.borrow().mean_response_time() > 0.0);
    }

    #[test]
    fn warmup_changes_the_estimate_but_not_determinism() {
        let mut system = mm1(1.0, 2.0);
        let opts = |warmup| SimOptions {
            num_events: 10_000,
            seed: Some(42),
            warmup,
            ..Default::default()
        };
        let cold = system.sim(&opts(0)).unwrap();
        let warm_a = system.sim(&opts(2_000)).unwrap();
        let warm_b = system.sim(&opts(2_000)).unwrap();
        assert_ne!(cold, warm_a);
        assert_eq!(warm_a, warm_b);
    }
}

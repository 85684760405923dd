//! Append-only trace of simulation events.
//!
//! The log is five parallel vectors of equal length rather than a vector of
//! structs: downstream consumers (trajectory reconstruction, external
//! tooling) read the columns in bulk.

use serde::Serialize;

/// Sentinel index for "outside the system" as an event source.
pub const EXTERNAL: i32 = -1;
/// Sentinel index for "outside the system" as an event destination.
pub const SYSTEM_EXIT: i32 = -1;

/// What happened at a logged instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An external arrival entered the network at server 0.
    Arrival,
    /// A job left the network from some server.
    Departure,
    /// A completed job was routed to another server.
    Route,
    /// A job was lost against a full buffer.
    Rejection,
}

/// Ordered record of everything that happened during a measurement phase.
///
/// `times` is nondecreasing. `from_servers`/`to_servers` hold server indices,
/// with [`EXTERNAL`]/[`SYSTEM_EXIT`] marking the outside world. `states`
/// holds the total number of jobs in the network after each event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventLog {
    /// Event timestamps (simulation clock).
    pub times: Vec<f64>,
    /// Event kinds.
    pub kinds: Vec<EventKind>,
    /// Source server per event.
    pub from_servers: Vec<i32>,
    /// Destination server per event.
    pub to_servers: Vec<i32>,
    /// Total jobs in the network after each event.
    pub states: Vec<i32>,
}

/// Per-server occupancy replayed from an [`EventLog`].
#[derive(Debug, Clone, Serialize)]
pub struct OccupancyTrace {
    /// Event timestamps, one per log entry.
    pub times: Vec<f64>,
    /// `server_states[s][i]` is the occupancy of server `s` after event `i`.
    pub server_states: Vec<Vec<i32>>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the log holds no events.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.times.clear();
        self.kinds.clear();
        self.from_servers.clear();
        self.to_servers.clear();
        self.states.clear();
    }

    pub(crate) fn reserve(&mut self, n: usize) {
        self.times.reserve(n);
        self.kinds.reserve(n);
        self.from_servers.reserve(n);
        self.to_servers.reserve(n);
        self.states.reserve(n);
    }

    pub(crate) fn push(&mut self, time: f64, kind: EventKind, from: i32, to: i32, state: i32) {
        self.times.push(time);
        self.kinds.push(kind);
        self.from_servers.push(from);
        self.to_servers.push(to);
        self.states.push(state);
    }

    /// Reconstructs per-server occupancy over time.
    ///
    /// `n_servers` may be given explicitly; otherwise it is inferred from the
    /// largest server index present in the log. Returns `None` for an empty
    /// log.
    pub fn per_server_occupancy(&self, n_servers: Option<usize>) -> Option<OccupancyTrace> {
        if self.is_empty() {
            return None;
        }
        let n = n_servers.unwrap_or_else(|| {
            let max_idx = self
                .from_servers
                .iter()
                .chain(self.to_servers.iter())
                .copied()
                .filter(|&v| v >= 0)
                .max()
                .unwrap_or(-1);
            (max_idx + 1) as usize
        });

        let mut pops = vec![0i32; n];
        let mut server_states: Vec<Vec<i32>> = vec![Vec::with_capacity(self.len()); n];

        for i in 0..self.len() {
            let from = self.from_servers[i];
            let to = self.to_servers[i];
            match self.kinds[i] {
                EventKind::Arrival => pops[to as usize] += 1,
                EventKind::Departure => pops[from as usize] -= 1,
                EventKind::Route => {
                    pops[from as usize] -= 1;
                    pops[to as usize] += 1;
                }
                // An internal rejection removes the job from its source
                // server; an external rejection never occupied anything.
                EventKind::Rejection => {
                    if from >= 0 {
                        pops[from as usize] -= 1;
                    }
                }
            }
            for s in 0..n {
                server_states[s].push(pops[s]);
            }
        }

        Some(OccupancyTrace {
            times: self.times.clone(),
            server_states,
        })
    }
}

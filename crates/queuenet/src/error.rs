//! Errors.

use thiserror::Error;

/// Fatal errors raised before a simulation starts.
///
/// Configuration errors (invalid routing matrix, buffer capacity,
/// distribution parameters) and usage errors (a feature a policy does not
/// support) are surfaced at construction or at the start of `sim()` /
/// `replicate()`, always before any random draw. Nothing inside the event
/// loop itself can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Distribution parameters outside their support (e.g. `mu <= 0`).
    #[error("invalid distribution parameters: {0}")]
    InvalidDistribution(String),

    /// `buffer_capacity` of zero; use `None` for an unlimited buffer.
    #[error("buffer capacity must be at least 1, or None for unlimited")]
    InvalidBufferCapacity,

    /// `num_servers` of zero.
    #[error("num_servers must be at least 1")]
    InvalidNumServers,

    /// Multiple service channels requested on a policy that serves one job
    /// at a time by definition.
    #[error("{policy} does not support multiple service channels")]
    MultiServerUnsupported {
        /// Name of the offending policy.
        policy: &'static str,
    },

    /// Routing matrix row count does not match the number of servers.
    #[error("routing matrix must have {expected} rows, got {actual}")]
    RoutingMatrixRows {
        /// Expected row count (= number of servers).
        expected: usize,
        /// Actual row count.
        actual: usize,
    },

    /// A routing matrix row has the wrong number of entries.
    #[error("routing matrix row {row} must have {expected} entries, got {actual}")]
    RoutingMatrixRowLen {
        /// Offending row index.
        row: usize,
        /// Expected entry count (= number of servers + 1).
        expected: usize,
        /// Actual entry count.
        actual: usize,
    },

    /// A routing matrix row does not sum to one.
    #[error("routing matrix row {row} sums to {sum}, expected 1.0")]
    RoutingMatrixRowSum {
        /// Offending row index.
        row: usize,
        /// Actual row sum.
        sum: f64,
    },

    /// A routing matrix entry is negative.
    #[error("routing matrix row {row} contains a negative probability")]
    RoutingMatrixNegative {
        /// Offending row index.
        row: usize,
    },

    /// Fewer than two replications requested.
    #[error("n_replications must be at least 2, got {0}")]
    TooFewReplications(usize),

    /// Confidence level outside the open interval (0, 1).
    #[error("confidence level must lie in (0, 1), got {0}")]
    InvalidConfidence(f64),
}

//! Probabilistic routing between servers and the system exit.

use rand::Rng;

use crate::distribution::SimRng;
use crate::error::Error;

const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Row-stochastic routing of completed jobs.
///
/// Either *tandem* (the empty default: each server forwards to the next
/// index, the last server exits) or a dense `n x (n+1)` matrix where entry
/// `(i, j)` is the probability that a job completing at server `i` goes to
/// server `j`, with column `n` meaning "leave the system".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingMatrix {
    rows: Vec<Vec<f64>>,
}

impl RoutingMatrix {
    /// Strict tandem routing.
    pub fn tandem() -> Self {
        Self::default()
    }

    /// Probabilistic routing from explicit rows.
    ///
    /// Dimensions and row sums are checked against the server count when a
    /// simulation starts, before any random draw.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Whether this is the tandem default.
    pub fn is_tandem(&self) -> bool {
        self.rows.is_empty()
    }

    /// The underlying rows; empty for tandem routing.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub(crate) fn validate(&self, n_servers: usize) -> Result<(), Error> {
        if self.rows.is_empty() {
            return Ok(());
        }
        if self.rows.len() != n_servers {
            return Err(Error::RoutingMatrixRows {
                expected: n_servers,
                actual: self.rows.len(),
            });
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != n_servers + 1 {
                return Err(Error::RoutingMatrixRowLen {
                    row: i,
                    expected: n_servers + 1,
                    actual: row.len(),
                });
            }
            if row.iter().any(|&p| p < 0.0) {
                return Err(Error::RoutingMatrixNegative { row: i });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(Error::RoutingMatrixRowSum { row: i, sum });
            }
        }
        Ok(())
    }

    /// Picks the destination of a job completing at `from`.
    ///
    /// Returns a server index, or `n_servers` for the system exit. Tandem
    /// routing is deterministic and consumes no randomness; a matrix draw
    /// consumes exactly one uniform. If rounding makes the prefix sums never
    /// exceed the draw, the job exits.
    pub(crate) fn route(&self, from: usize, n_servers: usize, rng: &mut SimRng) -> usize {
        if self.rows.is_empty() {
            return from + 1;
        }
        let u: f64 = rng.gen();
        let mut acc = 0.0;
        for (j, &p) in self.rows[from].iter().enumerate() {
            acc += p;
            if u < acc {
                return j;
            }
        }
        n_servers
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn tandem_forwards_to_next_index() {
        let m = RoutingMatrix::tandem();
        let mut rng = SimRng::seed_from_u64(1);
        assert_eq!(m.route(0, 3, &mut rng), 1);
        assert_eq!(m.route(2, 3, &mut rng), 3);
        assert!(m.validate(5).is_ok());
    }

    #[test]
    fn validate_checks_dimensions() {
        let m = RoutingMatrix::from_rows(vec![vec![0.5, 0.5], vec![0.5, 0.5]]);
        assert_eq!(
            m.validate(1),
            Err(Error::RoutingMatrixRows {
                expected: 1,
                actual: 2
            })
        );

        let m = RoutingMatrix::from_rows(vec![vec![0.5, 0.5, 0.0]]);
        assert_eq!(
            m.validate(1),
            Err(Error::RoutingMatrixRowLen {
                row: 0,
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn validate_checks_row_sums_and_signs() {
        let m = RoutingMatrix::from_rows(vec![vec![0.5, 0.3]]);
        assert!(matches!(
            m.validate(1),
            Err(Error::RoutingMatrixRowSum { row: 0, .. })
        ));

        let m = RoutingMatrix::from_rows(vec![vec![-0.5, 1.5]]);
        assert_eq!(m.validate(1), Err(Error::RoutingMatrixNegative { row: 0 }));

        let m = RoutingMatrix::from_rows(vec![vec![0.3, 0.7]]);
        assert!(m.validate(1).is_ok());
    }

    #[test]
    fn route_respects_degenerate_rows() {
        // All mass on exit.
        let m = RoutingMatrix::from_rows(vec![vec![0.0, 1.0]]);
        let mut rng = SimRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(m.route(0, 1, &mut rng), 1);
        }

        // All mass on self.
        let m = RoutingMatrix::from_rows(vec![vec![1.0, 0.0]]);
        for _ in 0..100 {
            assert_eq!(m.route(0, 1, &mut rng), 0);
        }
    }

    #[test]
    fn route_frequencies_follow_the_row() {
        let m = RoutingMatrix::from_rows(vec![vec![0.3, 0.7]]);
        let mut rng = SimRng::seed_from_u64(11);
        let n = 100_000;
        let back = (0..n).filter(|_| m.route(0, 1, &mut rng) == 0).count();
        let frac = back as f64 / n as f64;
        assert!((frac - 0.3).abs() < 0.01, "frac = {}", frac);
    }
}

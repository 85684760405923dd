//! Shared helpers for the integration suites: closed-form queueing formulas
//! and tolerance assertions.

#![allow(dead_code)]

use queuenet::Distribution;

/// Asserts `actual` is within `rel` relative tolerance of `expected`.
pub fn assert_rel_close(actual: f64, expected: f64, rel: f64) {
    assert!(
        (actual - expected).abs() <= rel * expected.abs(),
        "value {:.6} not within {:.1}% of expected {:.6}",
        actual,
        rel * 100.0,
        expected
    );
}

pub fn exp(rate: f64) -> Distribution {
    Distribution::exponential(rate).unwrap()
}

pub fn uniform(a: f64, b: f64) -> Distribution {
    Distribution::uniform(a, b).unwrap()
}

/// Erlang-B blocking probability for M/M/c/c, by the stable recursion.
pub fn erlang_b(c: u32, offered_load: f64) -> f64 {
    let mut b = 1.0;
    for n in 1..=c {
        b = offered_load * b / (n as f64 + offered_load * b);
    }
    b
}

/// Erlang-C waiting probability for M/M/k.
pub fn erlang_c(k: u32, offered_load: f64) -> f64 {
    let rho = offered_load / k as f64;
    let mut factorial = 1.0;
    let mut sum = 0.0;
    let mut power = 1.0;
    for n in 0..k {
        if n > 0 {
            factorial *= n as f64;
            power *= offered_load;
        }
        sum += power / factorial;
    }
    factorial *= k as f64;
    power *= offered_load;
    let num = power / (factorial * (1.0 - rho));
    num / (sum + num)
}

/// Mean response time of M/M/k: `1/mu + C(k, a) / (k mu - lambda)`.
pub fn mmk_expected_t(lam: f64, mu: f64, k: u32) -> f64 {
    let a = lam / mu;
    1.0 / mu + erlang_c(k, a) / (k as f64 * mu - lam)
}

/// Loss probability of M/M/1/K.
pub fn mm1k_ploss(rho: f64, k: u32) -> f64 {
    if (rho - 1.0).abs() < 1e-10 {
        return 1.0 / (k as f64 + 1.0);
    }
    (1.0 - rho) * rho.powi(k as i32) / (1.0 - rho.powi(k as i32 + 1))
}

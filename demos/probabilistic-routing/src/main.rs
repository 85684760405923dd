//! Two servers feeding each other with probability 0.5 and exiting
//! otherwise. Sweeping the arrival rate exposes the bottleneck, and a
//! replication batch puts a confidence interval on the congested point.

use std::io::Write;

use clap::Parser;
use sugars::{rc, refcell};

use queuenet::{
    Distribution, Fcfs, QueueSystem, ReplicateOptions, RoutingMatrix, SimOptions, Srpt,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Departures to simulate per run
    #[clap(short, long, default_value_t = 500_000)]
    num_events: usize,

    /// Base RNG seed
    #[clap(short, long, default_value_t = 42)]
    seed: u64,

    /// Replications for the confidence interval
    #[clap(short, long, default_value_t = 20)]
    replications: usize,

    /// Worker threads for replications (0 = all cores)
    #[clap(short, long, default_value_t = 0)]
    threads: usize,

    /// Print the replication result as JSON
    #[clap(short, long, default_value_t = false)]
    json: bool,
}

fn init_logger() {
    use env_logger::Builder;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn build_system(lambda: f64) -> QueueSystem {
    let service = Distribution::exponential(2.0).expect("service rate");
    let arrivals = Distribution::exponential(lambda).expect("arrival rate");
    // Servers 0 and 1 pass jobs to each other w.p. 0.5; the last column is
    // the exit probability.
    let routing = RoutingMatrix::from_rows(vec![vec![0.0, 0.5, 0.5], vec![0.5, 0.0, 0.5]]);
    QueueSystem::with_routing_matrix(
        vec![
            rc!(refcell!(Fcfs::new(service))),
            rc!(refcell!(Srpt::new(service))),
        ],
        arrivals,
        routing,
    )
}

fn main() {
    init_logger();
    let args = Args::parse();

    // Each job makes 2 visits on average, so each server sees rate lambda;
    // the network saturates as lambda approaches mu = 2.
    println!("arrival rate sweep ({} events per point):", args.num_events);
    for lambda in [1.0, 1.2, 1.4, 1.6, 1.8] {
        let mut system = build_system(lambda);
        let (mean_n, mean_t) = system
            .sim(&SimOptions {
                num_events: args.num_events,
                seed: Some(args.seed),
                ..Default::default()
            })
            .expect("simulation");
        println!(
            "  lambda = {:.1}: E[N] = {:8.4}, E[T] = {:8.4}",
            lambda, mean_n, mean_t
        );
    }

    let congested = 1.6;
    let system = build_system(congested);
    let result = system
        .replicate(&ReplicateOptions {
            n_replications: args.replications,
            num_events: args.num_events,
            seed: Some(args.seed),
            n_threads: args.threads,
            ..Default::default()
        })
        .expect("replication");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result).expect("json"));
    } else {
        let (lo, hi) = result.ci_t();
        println!(
            "\nlambda = {}: E[T] = {:.4} (95% CI [{:.4}, {:.4}], {} replications)",
            congested,
            result.mean_t,
            lo,
            hi,
            result.n_replications()
        );
    }
}

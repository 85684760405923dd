//! Runs the same M/M/1-style workload through all four scheduling policies
//! and prints how their mean response times compare, then sweeps the arrival
//! rate to show how SRPT's advantage over FCFS grows with load.

use std::io::Write;

use clap::Parser;
use sugars::{rc, refcell};

use queuenet::{Distribution, Fb, Fcfs, Ps, QueueSystem, ServerPolicy, SimOptions, Srpt};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Arrival rate (jobs per second)
    #[clap(short, long, default_value_t = 10.0)]
    lambda: f64,

    /// Service rate (jobs per second)
    #[clap(short, long, default_value_t = 12.0)]
    mu: f64,

    /// Departures to simulate per run
    #[clap(short, long, default_value_t = 1_000_000)]
    num_events: usize,

    /// RNG seed
    #[clap(short, long, default_value_t = 42)]
    seed: u64,
}

fn init_logger() {
    use env_logger::Builder;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn run_policy(name: &str, server: std::rc::Rc<std::cell::RefCell<dyn ServerPolicy>>, args: &Args) {
    let arrivals = Distribution::exponential(args.lambda).expect("arrival rate");
    let mut system = QueueSystem::new(vec![server], arrivals);
    let (mean_n, mean_t) = system
        .sim(&SimOptions {
            num_events: args.num_events,
            seed: Some(args.seed),
            ..Default::default()
        })
        .expect("simulation");
    println!("{:<6} E[N] = {:8.4}   E[T] = {:8.4}", name, mean_n, mean_t);
}

fn main() {
    init_logger();
    let args = Args::parse();
    let service = Distribution::exponential(args.mu).expect("service rate");

    println!(
        "lambda = {}, mu = {}, rho = {:.3}, {} events per run",
        args.lambda,
        args.mu,
        args.lambda / args.mu,
        args.num_events
    );
    run_policy("FCFS", rc!(refcell!(Fcfs::new(service))), &args);
    run_policy("SRPT", rc!(refcell!(Srpt::new(service))), &args);
    run_policy("PS", rc!(refcell!(Ps::new(service))), &args);
    run_policy("FB", rc!(refcell!(Fb::new(service))), &args);

    // SRPT's edge over FCFS widens as the system saturates.
    println!("\nE[T]_FCFS / E[T]_SRPT by arrival rate (mu = 10):");
    let service = Distribution::exponential(10.0).expect("service rate");
    for lambda in [1.0, 3.0, 5.0, 7.0, 9.0] {
        let arrivals = Distribution::exponential(lambda).expect("arrival rate");
        let opts = SimOptions {
            num_events: args.num_events,
            seed: Some(args.seed),
            ..Default::default()
        };
        let mut fcfs = QueueSystem::new(vec![rc!(refcell!(Fcfs::new(service)))], arrivals);
        let mut srpt = QueueSystem::new(vec![rc!(refcell!(Srpt::new(service)))], arrivals);
        let (_, t_fcfs) = fcfs.sim(&opts).expect("simulation");
        let (_, t_srpt) = srpt.sim(&opts).expect("simulation");
        println!("  lambda = {:4.1}: {:6.3}", lambda, t_fcfs / t_srpt);
    }
}

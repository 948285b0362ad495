use average::{Estimate, Max, Mean};
use clap::Parser;
use coresched::{Discipline, Job, SchedError, Sim};
use log::info;
use rand::prelude::*;

#[derive(Debug, Parser)]
#[command(about = "Run a random workload through the core scheduler")]
struct Args {
    /// Number of cores
    #[arg(long, default_value_t = 2)]
    cores: usize,

    /// fcfs, sjf, psjf, pri, ppri or rr
    #[arg(long, default_value_t = Discipline::Fcfs)]
    scheme: Discipline,

    /// Round-robin time slice in ticks
    #[arg(long, default_value_t = 3)]
    quantum: u64,

    /// Length of the arrival window
    #[arg(long, default_value_t = 500)]
    ticks: u64,

    #[arg(long, default_value_t = 0.3)]
    arrival_rate: f64,

    #[arg(long, default_value_t = 0.3)]
    short_rate: f64,

    #[arg(long, default_value_t = 2)]
    short_ticks: u64,

    #[arg(long, default_value_t = 6)]
    long_ticks: u64,

    /// Priorities are drawn from 0..=max_priority
    #[arg(long, default_value_t = 4)]
    max_priority: i32,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print every scheduling event
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<(), SchedError> {
    env_logger::init();
    let args = Args::parse();

    let jobs = workload(&args);
    info!(
        "{} jobs, {} cores, scheme {}",
        jobs.len(),
        args.cores,
        args.scheme
    );
    let quantum = (args.scheme == Discipline::Rr).then_some(args.quantum);
    let mut sim = Sim::new(jobs, args.cores, args.scheme, quantum)?;

    while !sim.all_jobs_completed() {
        let now = sim.now();
        let events = sim.step()?;
        if args.trace {
            for event in events {
                println!("t={} {:?}", now, event);
            }
        }
    }

    println!("Average waiting time: {:.2} ticks", sim.core.average_waiting_time());
    println!(
        "Average turnaround time: {:.2} ticks",
        sim.core.average_turnaround_time()
    );
    println!(
        "Average response time: {:.2} ticks",
        sim.core.average_response_time()
    );

    let slowdowns = sim.jobs.iter().filter_map(|j| {
        let turnaround = j.turnaround_time()? as f64;
        Some(turnaround / j.job.run_time.max(1) as f64)
    });
    let longest_wait: Max = sim.jobs_map(|j| j.waiting_time()).collect();
    println!("Mean slowdown: {:.2}", slowdowns.collect::<Mean>().estimate());
    println!("Longest wait: {:.0} ticks", longest_wait.max());

    let leftover = sim.core.shutdown();
    info!("clean shutdown, {leftover} jobs left resident");
    Ok(())
}

/// Draws a workload where each tick of the window independently sees one
/// arrival, either short or long.
fn workload(args: &Args) -> Vec<Job> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let arrival = args.arrival_rate.clamp(0.0, 1.0);
    let short = args.short_rate.clamp(0.0, 1.0);
    let priorities = 0..=args.max_priority.max(0);

    let arrivals: Vec<u64> = (0..args.ticks)
        .filter(|_| rng.random_bool(arrival))
        .collect();

    arrivals
        .into_iter()
        .zip(0u64..)
        .map(|(arrival_time, id)| {
            let run_time = match rng.random_bool(short) {
                true => args.short_ticks,
                false => args.long_ticks,
            };
            Job {
                id,
                arrival_time,
                run_time: run_time.max(1),
                priority: rng.random_range(priorities.clone()),
            }
        })
        .collect()
}

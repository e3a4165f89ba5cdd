use anyhow::Context;
use clap::Parser;
use log::{info, LevelFilter};
use netsim_core::{as_secs_f64, CaptureRegistry, Simulation, SimulationConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "netsim-cli", about = "Backbone link joining two wireless cells, with a UDP echo exchange")]
struct Args {
    /// TOML scenario file; the built-in scenario is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stations in the first cell.
    #[arg(long = "n0-wifi")]
    n0_wifi: Option<u32>,

    /// Stations in the second cell.
    #[arg(long = "n1-wifi")]
    n1_wifi: Option<u32>,

    /// Stop time in seconds.
    #[arg(long)]
    stop: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Log application activity.
    #[arg(long)]
    verbose: bool,

    /// Report the links packet capture would attach to.
    #[arg(long)]
    tracing: bool,

    /// Write the fired-event trace as JSON.
    #[arg(long = "trace-out")]
    trace_out: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunSummary {
    stop_time_s: f64,
    events_fired: u64,
    nodes: usize,
    links: usize,
    routes: usize,
    unreachable_pairs: usize,
    delivery: netsim_core::DeliverySummary,
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_module("netsim_core::components", LevelFilter::Debug);
    } else {
        builder.filter_module("netsim_core::components", LevelFilter::Warn);
    }
    builder.init();
}

fn load_config(args: &Args) -> anyhow::Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(n) = args.n0_wifi {
        config = config.with_station_count(0, n);
    }
    if let Some(n) = args.n1_wifi {
        config = config.with_station_count(1, n);
    }
    if let Some(stop) = args.stop {
        config.stop_time_us = netsim_core::secs(stop);
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let mut sim = Simulation::from_config(config)?;

    let capture = CaptureRegistry::new();
    let captured = capture.handle();
    if args.tracing {
        sim.add_observer(Box::new(capture));
    }

    let fired = sim.run();

    if args.tracing {
        if let Ok(links) = captured.read() {
            for (link, time) in links.iter() {
                println!("capture enabled on link {} at {:.3}s", link, as_secs_f64(*time));
            }
        }
    }
    if let Some(path) = &args.trace_out {
        let json = sim.trace().to_json()?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {} trace records to {}", sim.trace().len(), path.display());
    }

    let summary = RunSummary {
        stop_time_s: as_secs_f64(sim.now()),
        events_fired: fired,
        nodes: sim.topology().nodes().len(),
        links: sim.topology().links().len(),
        routes: sim.routes().len(),
        unreachable_pairs: sim.routes().gaps().len(),
        delivery: sim.delivery_stats().summary(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

use anyhow::Context;
use clap::Parser;
use generator::profile::GeneratorConfig;
use log::info;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::ControllerConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Adaptive four-way junction signal controller")]
struct Args {
    /// Load the controller config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Junction id to monitor; defaults to the configured initial junction
    #[arg(long)]
    junction: Option<String>,
    /// Logical tick period; overrides the config file (default 1000)
    #[arg(long)]
    tick_millis: Option<u64>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Drive the cycle from seeded synthetic demand instead of the live feeds
    #[arg(long, default_value_t = false)]
    offline: bool,
    #[arg(long, default_value_t = 12)]
    rounds: u32,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 15)]
    ticks_per_round: u32,
    /// Write the offline report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
    /// Monitor live feeds and keep the operator bridge up until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    }
    .with_overrides(args.tick_millis, args.bind);
    config.validate()?;
    let junction = config
        .starting_junction(args.junction.as_deref())
        .context("no junction to monitor")?;

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating controller runtime")?;
    let runner = Runner::new(config);

    if args.offline {
        let generator = GeneratorConfig {
            seed: args.seed,
            rounds: args.rounds,
            ticks_per_round: args.ticks_per_round,
            ..Default::default()
        };
        let report = runtime.block_on(runner.run_offline(&junction, generator))?;

        for round in &report.rounds {
            println!(
                "round {:>3} demand={:?} green={:?} active={} remaining={}s",
                round.round, round.demand, round.allocation, round.active, round.remaining
            );
        }
        println!(
            "Offline run -> junction {}, ticks {}, advances {}, notifications {}/{}",
            report.junction,
            report.metrics.ticks,
            report.metrics.advances,
            report.metrics.notifications_sent,
            report.metrics.notifications_sent + report.metrics.notifications_failed
        );

        if let Some(path) = &args.report {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(&report)?;
            fs::write(path, json)
                .with_context(|| format!("writing offline report {}", path.display()))?;
            info!("offline report written to {}", path.display());
        }
    }
    if args.serve {
        runtime.block_on(runner.serve(&junction))?;
    }

    Ok(())
}

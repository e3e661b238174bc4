use std::time::Instant;

use bedrock_kernel::Simulation;
use clap::Parser;
use link_config::{LinkCli, RunMode};
use link_engine::{build_link, report};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let t0 = Instant::now();
    let cli = LinkCli::parse();

    let default_level = if cli.debug_en { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .without_time()
        .with_target(false)
        .init();

    info!("Link Unit-Level Simulation");
    info!("");
    info!("Run for {} ns", cli.sim_duration_ns);

    let link_params = cli.link_params();
    let producer_params = cli.producer_params();
    report::print_params(&link_params, &producer_params);

    let run_mode = cli.run_mode();
    let mut sim = Simulation::<u64>::new(cli.seed);

    // In bypass mode the single link is the reference instance itself.
    let primary = build_link(
        &mut sim,
        &link_params,
        &producer_params,
        run_mode == RunMode::Bypass,
    )?;
    let reference = if run_mode == RunMode::Both {
        Some(build_link(&mut sim, &link_params, &producer_params, true)?)
    } else {
        None
    };

    sim.run(cli.sim_duration_ps())?;

    report::print_demanded_bw(&producer_params);
    report::print_consumer_bw(&primary.borrow(), "Consumer Achieved BW");
    if let Some(reference) = &reference {
        report::print_consumer_bw(&reference.borrow(), "Consumer (Bypass) Achieved BW");
    }
    if run_mode != RunMode::Bypass {
        info!("");
        report::print_link_report(&primary.borrow());
    }

    if cli.plots_en {
        report::write_traces("link_result.csv", &primary.borrow())?;
        info!("Traces written to link_result.csv");
    }

    info!("");
    info!("Simulation Completed! ({:.2} sec)", t0.elapsed().as_secs_f64());
    info!("");
    Ok(())
}

use bedrock_kernel::{Simulation, aux};
use fabric_config::FabricSimConfig;
use fabric_core::Signal;
use fabric_engine::build;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => FabricSimConfig::load(path)?,
        None => FabricSimConfig::default(),
    };

    let default_level = if config.global.debug_level > 0 { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .without_time()
        .with_target(false)
        .init();

    let mut sim = Simulation::<Signal>::new(config.global.seed);

    aux::timestamp(sim.now(), "main", "Initialization Phase started");
    let system = build(&mut sim, &config)?;
    aux::timestamp(sim.now(), "main", "Initialization Phase completed");

    aux::timestamp(sim.now(), "main", "Run Phase started");
    sim.run(config.global.simulation_time_in_cycles)?;
    aux::timestamp(sim.now(), "main", "Run Phase completed");

    let stats = system.stats.borrow();
    aux::message(
        sim.now(),
        "main",
        &format!(
            "Requests: {} sent ({} bytes), {} overflow rejections",
            stats.requests_sent, stats.bytes_enqueued, stats.overflows
        ),
    );
    for (initiator, acks) in &stats.acks_by_initiator {
        aux::message(sim.now(), "main", &format!("ACKs for {initiator}: {acks}"));
    }
    aux::message(
        sim.now(),
        "main",
        &format!(
            "Bytes: {} acked, {} resident in queues",
            stats.bytes_acked,
            system.resident_bytes()
        ),
    );
    if !stats.latency_ps.is_empty() {
        let lat = stats.latency_ps.summary();
        aux::message(
            sim.now(),
            "main",
            &format!(
                "Request latency (ps): p50={} p90={} p99={} p99.9={} max={} count={}",
                lat.p50, lat.p90, lat.p99, lat.p999, lat.max, lat.count
            ),
        );
    }

    Ok(())
}

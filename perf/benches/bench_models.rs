use bedrock_kernel::Simulation;
use criterion::{Criterion, criterion_group, criterion_main};
use fabric_config::FabricSimConfig;
use fabric_core::Signal;
use link_core::{LinkParams, ProducerParams};

/// Full fabric testbench (CPU/PCIE -> SRAM/ROM) over 1 µs of simulated time.
fn bench_fabric_run(c: &mut Criterion) {
    let config = FabricSimConfig::default();
    c.bench_function("fabric_run_1us", |b| {
        b.iter(|| {
            let mut sim = Simulation::<Signal>::new(1);
            let system = fabric_engine::build(&mut sim, &config).expect("default config builds");
            sim.run(1_000.0).expect("fabric run completes");
            system.stats.borrow().acks
        })
    });
}

/// Gated link plus bypass reference over 2.5 ns (the default CLI run).
fn bench_link_dual_run(c: &mut Criterion) {
    let link_params = LinkParams::default();
    let producer_params = ProducerParams::default();
    c.bench_function("link_dual_run_2500ps", |b| {
        b.iter(|| {
            let mut sim = Simulation::<u64>::new(1);
            let gated = link_engine::build_link(&mut sim, &link_params, &producer_params, false)
                .expect("valid params");
            let _bypass = link_engine::build_link(&mut sim, &link_params, &producer_params, true)
                .expect("valid params");
            sim.run(2_500.0).expect("link run completes");
            gated.borrow().consumer_quota()
        })
    });
}

criterion_group!(benches, bench_fabric_run, bench_link_dual_run);
criterion_main!(benches);

//! End-to-end fabric model tests.
//!
//! These drive the full CPU/PCIE → SRAM/ROM testbench through the event
//! kernel and check the properties a fabric exploration run is trusted for:
//! requests reach their targets and come back as ACKs, bytes are conserved,
//! arbitration grants one initiator at a time, and a seeded run is exactly
//! reproducible.

use std::collections::BTreeMap;

use bedrock_kernel::Simulation;
use fabric_config::{
    ArbiterParams, ArbiterPolicy, FabricParams, FabricSimConfig, GlobalParams, InitiatorParams,
    ProcedureParams, QueueParams, SocketParams, SocketRole, StartAt, TargetParams,
};
use fabric_core::{AddrGen, Operation, Signal};
use fabric_engine::build;

fn default_run(until_ns: f64, seed: u64) -> (Simulation<Signal>, fabric_engine::FabricSystem) {
    let mut config = FabricSimConfig::default();
    config.global.seed = seed;
    let mut sim = Simulation::<Signal>::new(seed);
    let system = build(&mut sim, &config).expect("default config builds");
    sim.run(until_ns).expect("run completes without protocol errors");
    (sim, system)
}

/// A one-initiator, one-target setup with a tunable bandwidth throttle.
fn throttle_config(thr_in_mbps: f64) -> FabricSimConfig {
    let mut sockets = BTreeMap::new();
    sockets.insert(
        "CPU".to_string(),
        SocketParams {
            protocol: "AXI".into(),
            init_tgt: SocketRole::Initiator,
            latencies: Vec::new(),
        },
    );
    sockets.insert(
        "SRAM".to_string(),
        SocketParams {
            protocol: "AXI".into(),
            init_tgt: SocketRole::Target,
            latencies: Vec::new(),
        },
    );

    let mut procedures = BTreeMap::new();
    procedures.insert(
        "WR".to_string(),
        ProcedureParams {
            direction: Operation::Write,
            burst_length: 8,
            burst_size: 64,
            inter_bursts: 10,
            thr_in_mbps,
            outstanding: 10,
            address_gen: AddrGen::Random,
            queue: "WRQ".into(),
        },
    );
    let mut queues = BTreeMap::new();
    queues.insert("WRQ".to_string(), QueueParams { depth: 64, width: 64 });

    let mut initiators = BTreeMap::new();
    initiators.insert(
        "CPU".to_string(),
        InitiatorParams {
            frequency_mhz: 400.0,
            procedures,
            queues,
        },
    );

    let mut targets = BTreeMap::new();
    targets.insert("SRAM".to_string(), TargetParams { frequency_mhz: 500.0 });

    FabricSimConfig {
        global: GlobalParams {
            debug_level: 0,
            simulation_time_in_cycles: 10_000.0,
            seed: 3,
        },
        fabric: FabricParams {
            frequency_mhz: 200.0,
            arbiter: ArbiterParams {
                policy: ArbiterPolicy::RoundRobin,
                slot_length: 5,
                start_at: StartAt::First,
            },
            sockets,
        },
        initiators,
        targets,
    }
}

fn throttle_run(thr_in_mbps: f64, until_ns: f64) -> u64 {
    let config = throttle_config(thr_in_mbps);
    let mut sim = Simulation::<Signal>::new(config.global.seed);
    let system = build(&mut sim, &config).expect("throttle config builds");
    sim.run(until_ns).expect("throttle run completes");
    let bytes = system.stats.borrow().bytes_enqueued;
    bytes
}

#[test]
fn requests_reach_targets_and_ack_back() {
    let (_, system) = default_run(1_000.0, 1);
    let stats = system.stats.borrow();
    assert!(stats.requests_sent > 0, "no traffic was generated");
    assert!(stats.acks > 0, "no ACK made it back to an initiator");
    assert!(!stats.latency_ps.is_empty());
    // Every configured initiator gets at least one request all the way
    // through its target and back.
    for initiator in ["CPU", "PCIE"] {
        assert!(
            stats.acks_by_initiator.get(initiator).copied().unwrap_or(0) >= 1,
            "no ACK for {initiator}"
        );
    }
}

#[test]
fn short_run_still_produces_an_ack() {
    // 100 ns is enough for a grant, a dequeue and the same-instant ACK chain.
    let (_, system) = default_run(100.0, 1);
    assert!(system.stats.borrow().acks >= 1);
}

#[test]
fn bytes_are_conserved() {
    let (_, system) = default_run(2_000.0, 5);
    let stats = system.stats.borrow();
    // Every accepted byte is either acknowledged or still parked in a queue:
    // the dequeue→target→ACK chain completes without consuming simulated
    // time, so nothing can be in flight when the run stops.
    assert_eq!(
        stats.bytes_enqueued,
        stats.bytes_acked + system.resident_bytes(),
        "bytes leaked between queues and targets"
    );
}

#[test]
fn at_most_one_initiator_socket_holds_the_grant() {
    let (_, system) = default_run(777.5, 2);
    assert!(system.granted_initiator_sockets() <= 1);
}

#[test]
fn zero_length_run_is_a_noop() {
    let (sim, system) = default_run(0.0, 1);
    let stats = system.stats.borrow();
    assert_eq!(sim.now(), 0.0);
    assert_eq!(stats.requests_sent, 0);
    assert_eq!(stats.acks, 0);
    assert_eq!(system.resident_bytes(), 0);
}

#[test]
fn seeded_runs_are_reproducible() {
    let (_, a) = default_run(1_500.0, 42);
    let (_, b) = default_run(1_500.0, 42);
    let (sa, sb) = (a.stats.borrow(), b.stats.borrow());
    assert_eq!(sa.requests_sent, sb.requests_sent);
    assert_eq!(sa.bytes_enqueued, sb.bytes_enqueued);
    assert_eq!(sa.acks, sb.acks);
    assert_eq!(sa.overflows, sb.overflows);
    assert_eq!(
        a.arbiter.borrow().granted_name(),
        b.arbiter.borrow().granted_name()
    );
}

#[test]
fn bandwidth_throttle_caps_issued_bytes() {
    let until_ns = 10_000.0;
    let throttled = throttle_run(100.0, until_ns);
    let unthrottled = throttle_run(1.0e9, until_ns);

    assert!(throttled > 0, "throttled run generated nothing");
    assert!(
        throttled < unthrottled,
        "throttle had no effect: {throttled} vs {unthrottled}"
    );
    // Steady state: issued bytes per 1000 ns stay within the configured
    // allocation.
    let per_1000ns = throttled as f64 / (until_ns / 1000.0);
    assert!(per_1000ns <= 100_000.0, "issued {per_1000ns} bytes per 1000 ns");
}

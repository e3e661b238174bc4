//! End-to-end link simulator tests: producer, FSM and consumer wired
//! through the event kernel, in gated, bypass and dual mode.

use bedrock_kernel::Simulation;
use link_core::{LinkParams, PackState, ProducerParams, SharedLink};
use link_engine::build_link;

fn small_params() -> (LinkParams, ProducerParams) {
    (LinkParams::default(), ProducerParams::default())
}

fn run_single(dummy: bool, seed: u64, until_ps: f64) -> SharedLink {
    let (link_params, producer_params) = small_params();
    let mut sim = Simulation::<u64>::new(seed);
    let link = build_link(&mut sim, &link_params, &producer_params, dummy).expect("valid params");
    sim.run(until_ps).expect("run completes");
    link
}

#[test]
fn gated_link_delivers_messages() {
    let link = run_single(false, 1, 2_500.0);
    let link = link.borrow();
    assert!(link.consumer_quota() > 0, "nothing was drained");
    assert!(!link.state_trace().is_empty());
    assert_eq!(link.state_trace().len(), link.fullness_trace().len());
    // Traffic arrived, so the FSM must have left IDLE at least once.
    assert!(link.transitions().iter().any(|t| t.from == PackState::Idle));
}

#[test]
fn gated_consumer_stalls_while_idle() {
    // The FSM applies its first idle-exit only after fsm_delay_cyc; before
    // that the gated consumer must not have drained anything.
    let link = run_single(false, 1, 30.0);
    assert_eq!(link.borrow().consumer_quota(), 0);
}

#[test]
fn bypass_link_drains_without_gating() {
    let link = run_single(true, 1, 2_500.0);
    let link = link.borrow();
    assert!(link.consumer_quota() > 0);
    // The reference link records consumer bandwidth but no state traces.
    assert!(link.state_trace().is_empty());
    assert!(link.fullness_trace().is_empty());
    assert!(!link.consumer_bw().is_empty());
}

#[test]
fn bypass_drains_before_the_gated_link_opens() {
    let gated = run_single(false, 1, 60.0);
    let bypass = run_single(true, 1, 60.0);
    assert!(bypass.borrow().consumer_quota() >= gated.borrow().consumer_quota());
}

#[test]
fn dual_mode_links_are_independent() {
    let (link_params, producer_params) = small_params();
    let mut sim = Simulation::<u64>::new(1);
    let gated = build_link(&mut sim, &link_params, &producer_params, false).unwrap();
    let bypass = build_link(&mut sim, &link_params, &producer_params, true).unwrap();
    sim.run(2_500.0).unwrap();
    assert!(gated.borrow().consumer_quota() > 0);
    assert!(bypass.borrow().consumer_quota() > 0);
    assert!(bypass.borrow().state_trace().is_empty());
}

#[test]
fn seeded_runs_reproduce_the_consumer_trace() {
    let a = run_single(false, 9, 2_000.0);
    let b = run_single(false, 9, 2_000.0);
    assert_eq!(a.borrow().consumer_quota(), b.borrow().consumer_quota());
    assert_eq!(a.borrow().consumer_bw(), b.borrow().consumer_bw());
    assert_eq!(a.borrow().transitions(), b.borrow().transitions());
}

#[test]
fn zero_duration_run_is_a_noop() {
    let link = run_single(false, 1, 0.0);
    let link = link.borrow();
    assert_eq!(link.cyc_curr(), 0);
    assert_eq!(link.consumer_quota(), 0);
    assert!(link.state_trace().is_empty());
}

#[test]
fn silent_producer_generates_no_traffic() {
    let link_params = LinkParams::default();
    let producer_params = ProducerParams { utilization: 0.0, ..ProducerParams::default() };
    let mut sim = Simulation::<u64>::new(1);
    let link = build_link(&mut sim, &link_params, &producer_params, false).unwrap();
    sim.run(2_500.0).unwrap();
    let link = link.borrow();
    assert_eq!(link.consumer_quota(), 0);
    // The cycle process still runs; the FSM just never leaves IDLE.
    assert!(!link.state_trace().is_empty());
    assert!(link.state_trace().iter().all(|&s| s == PackState::Idle));
}

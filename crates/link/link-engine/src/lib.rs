//! `link-engine`: processes and wiring of the link simulator.
//!
//! Three processes per link instance share one bounded store and one
//! [`link_core::Link`] state:
//! - the cycle process drives the pack-rate FSM once per link cycle
//! - the producer emits message ids on a stochastic schedule, suspending on
//!   a full buffer (bounded-store backpressure)
//! - the consumer paces itself at the current pack rate and records the
//!   instantaneous drain bandwidth
//!
//! A bypass instance runs the consumer without FSM gating as the reference
//! curve; `run_mode` selects gated, bypass, or both side by side.

#![forbid(unsafe_code)]

pub mod consumer;
pub mod cycle;
pub mod producer;
pub mod report;

use bedrock_kernel::Simulation;
use link_core::{Link, LinkParams, ProducerParams, SharedLink};

pub use consumer::ConsumerProcess;
pub use cycle::CycleProcess;
pub use producer::ProducerProcess;

/// Instantiates one link (buffer store + cycle + producer + consumer).
///
/// Fails only when the producer idle distribution is malformed
/// (negative or non-finite standard deviation).
pub fn build_link(
    sim: &mut Simulation<u64>,
    link_params: &LinkParams,
    producer_params: &ProducerParams,
    dummy: bool,
) -> Result<SharedLink, rand_distr::NormalError> {
    let store = sim.add_store(link_params.buffer_size);
    let link = Link::new_shared(link_params.clone(), dummy);
    sim.add(Box::new(CycleProcess::new(link.clone(), store)));
    sim.add(Box::new(ProducerProcess::new(link.clone(), store, *producer_params)?));
    sim.add(Box::new(ConsumerProcess::new(link.clone(), store)));
    Ok(link)
}

//! `fabric-engine`: the bandwidth-exploration fabric model.
//!
//! Initiator procedures generate bursted traffic into bounded byte-accounted
//! queues; a round-robin arbiter grants one initiator socket per slot; the
//! fabric drains the granted initiator's queues and routes each request to
//! its target, which acknowledges back through the fabric in one tick.
//!
//! ```text
//!   ---------------------------------------------------
//!   |  Initiator Process                              |     ---------------------------
//!   |  -------------                 ---------        |     | Fabric                  |
//!   |  | Procedure |---enqueue()--->| Queue  |<--dequeue()---- Socket |---    ------   |     ----------
//!   |  | (BW gen)  |                | (FIFO) |        |     |            |   |Socket---->| Target |
//!   |  -------------                 ---------        |     |        ---------- ------  |     ----------
//!   |       .                           .             |     |        | ARBITER |        |
//!   |       .                           .             |     |        ----------         |
//!   ---------------------------------------------------     ---------------------------
//! ```
//!
//! All cross-component signalling uses [`fabric_core::Signal`] interrupts
//! carried by the `bedrock-kernel` scheduler; the queues are the only shared
//! objects, serialized by the cooperative scheduler and read exclusively on
//! behalf of the granted socket.

#![forbid(unsafe_code)]

pub mod arbiter;
pub mod fabric;
pub mod initiator;
pub mod procedure;
pub mod queue;
pub mod socket;
pub mod stats;
pub mod system;
pub mod target;

pub use arbiter::{Arbiter, ArbiterRotor, SharedArbiter};
pub use fabric::FabricProcess;
pub use initiator::InitiatorProcess;
pub use procedure::Procedure;
pub use queue::{DequeueJob, Enqueue, Queue, SharedQueue};
pub use socket::{SharedSocket, SocketProcess, SocketState};
pub use stats::{FabricStats, SharedStats};
pub use system::{FabricSystem, build};
pub use target::TargetProcess;

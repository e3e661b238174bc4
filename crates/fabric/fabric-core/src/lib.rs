//! `fabric-core`: the request and signal vocabulary of the fabric model.
//!
//! Everything that crosses a component boundary is defined here: the
//! [`Request`] bundle a bandwidth generator emits, and the closed [`Signal`]
//! sum the components interrupt each other with. An unknown tag is a type
//! error, not a runtime discovery.

#![forbid(unsafe_code)]

use bedrock_kernel::ProcId;
use serde::Deserialize;

/// Direction of a procedure's traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
}

/// Address pattern a procedure stamps on its requests. The fabric routes on
/// `dst` only; the pattern rides along for future target-side modelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddrGen {
    Random,
    Raster,
}

/// Where a request came from: the issuing initiator and the queue it sits in.
/// The queue name is what routes the Grant back to the right procedure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    pub initiator: String,
    pub queue: String,
}

/// One atomic request bundle. Immutable once enqueued.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub operation: Operation,
    pub src: Origin,
    pub dst: String,
    pub size: u64,
    pub addr_gen: AddrGen,
    /// Simulated time (ns) at enqueue.
    pub timestamp: f64,
}

/// Every interrupt cause that flows between fabric-model components.
#[derive(Clone, Debug)]
pub enum Signal {
    /// Queue → procedure: one outstanding slot has been freed.
    Grant,
    /// Socket → fabric: this initiator port holds the arbiter grant.
    SocketGranted(String),
    /// Dequeue job → fabric: a request left an initiator queue.
    InitiatorDequeue(Request),
    /// Fabric → target socket → fabric → target process. Carries the fabric
    /// id so the target can raise its ACK without a back-reference.
    MessageForTarget { request: Request, fabric: ProcId },
    /// Target → fabric → initiator process.
    AckFromTarget { target: String, initiator: String },
}

impl Signal {
    /// Short tag used in protocol-violation reports.
    pub fn tag(&self) -> &'static str {
        match self {
            Signal::Grant => "Grant",
            Signal::SocketGranted(_) => "SOCKET_GRANTED",
            Signal::InitiatorDequeue(_) => "INITIATOR_DEQUEUE",
            Signal::MessageForTarget { .. } => "MESSAGE_FOR_TARGET",
            Signal::AckFromTarget { .. } => "ACK_FROM_TARGET",
        }
    }
}

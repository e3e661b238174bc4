use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use bedrock_stats::LatencyStats;

pub type SharedStats = Rc<RefCell<FabricStats>>;

/// Run-wide counters, shared by every component through the testbench.
///
/// Conservation holds at any instant the scheduler is quiescent:
/// `bytes_enqueued == bytes_acked + Σ queue.fullness`, because the
/// dequeue-to-ACK interrupt chain completes without consuming simulated time.
#[derive(Default)]
pub struct FabricStats {
    /// Successful enqueues (OVF attempts excluded).
    pub requests_sent: u64,
    pub bytes_enqueued: u64,
    /// Enqueue attempts rejected for lack of queue capacity.
    pub overflows: u64,
    /// ACK interrupts observed by initiator processes.
    pub acks: u64,
    pub acks_by_initiator: BTreeMap<String, u64>,
    /// Bytes acknowledged target-side.
    pub bytes_acked: u64,
    /// Request timestamp → target ACK, in picoseconds.
    pub latency_ps: LatencyStats,
}

impl FabricStats {
    pub fn new_shared() -> SharedStats {
        Rc::new(RefCell::new(Self::default()))
    }
}

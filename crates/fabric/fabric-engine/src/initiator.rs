use bedrock_kernel::{Action, Ctx, Process, Resume, SimError, aux};
use fabric_core::Signal;

use crate::queue::SharedQueue;
use crate::stats::SharedStats;

/// Aggregates the procedures and queues of one initiator (CPU, PCIE, ...).
///
/// The procedures and queues run on their own; this process reports queue
/// fullness once per component tick and receives the ACKs routed back by the
/// fabric. Queue sharing between procedures is allowed.
pub struct InitiatorProcess {
    name: String,
    /// Bare initiator name as keyed in the stats.
    initiator: String,
    clk_ns: f64,
    queues: Vec<(String, SharedQueue)>,
    stats: SharedStats,
    deadline_ns: f64,
}

impl InitiatorProcess {
    pub fn new(
        initiator: impl Into<String>,
        clk_ns: f64,
        queues: Vec<(String, SharedQueue)>,
        stats: SharedStats,
    ) -> Self {
        let initiator = initiator.into();
        Self {
            name: format!("Initiator_{initiator}"),
            initiator,
            clk_ns,
            queues,
            stats,
            deadline_ns: 0.0,
        }
    }
}

impl Process<Signal> for InitiatorProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, resume: Resume<Signal>, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        match resume {
            Resume::Start => {
                aux::debug(
                    ctx.now(),
                    &self.name,
                    &format!("Created with clk={} ns, {} queues", self.clk_ns, self.queues.len()),
                );
                self.deadline_ns = ctx.now() + self.clk_ns;
                Action::Wait(self.clk_ns)
            }
            Resume::Timer => {
                let now = ctx.now();
                for (queue_name, queue) in &self.queues {
                    let queue = queue.borrow();
                    aux::debug(
                        now,
                        &self.name,
                        &format!(
                            "Queue \"{queue_name}\" fullness: {} / {}",
                            queue.fullness(),
                            queue.capacity_bytes()
                        ),
                    );
                }
                self.deadline_ns = now + self.clk_ns;
                Action::Wait(self.clk_ns)
            }
            Resume::Interrupted(Signal::AckFromTarget { target, .. }) => {
                let now = ctx.now();
                aux::debug(now, &self.name, &format!("ACK received from {target}"));
                let mut stats = self.stats.borrow_mut();
                stats.acks += 1;
                *stats
                    .acks_by_initiator
                    .entry(self.initiator.clone())
                    .or_default() += 1;
                drop(stats);
                Action::Wait((self.deadline_ns - now).max(0.0))
            }
            Resume::Interrupted(other) => Action::Fail(SimError::UnknownInterrupt {
                component: self.name.clone(),
                detail: other.tag().to_string(),
            }),
            other => Action::Fail(SimError::Protocol {
                component: self.name.clone(),
                detail: format!("unexpected resume: {other:?}"),
            }),
        }
    }
}

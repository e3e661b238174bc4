use std::collections::BTreeMap;

use bedrock_kernel::{Action, Ctx, ProcId, Process, Resume, SimError, aux};
use fabric_core::Signal;

use crate::arbiter::SharedArbiter;
use crate::queue::{DequeueJob, SharedQueue};
use crate::socket::SharedSocket;

/// A socket as the fabric sees it: shared grant state plus the process to
/// interrupt when a message must cross the port.
pub struct SocketHandle {
    pub state: SharedSocket,
    pub process: ProcId,
}

/// The router between initiator queues and target sinks.
///
/// Each fabric tick it copies the arbiter's decision onto the initiator
/// sockets; everything else is reaction to interrupts:
///
/// | cause               | action                                          |
/// |---------------------|-------------------------------------------------|
/// | `SOCKET_GRANTED`    | spawn a dequeue job per queue of that initiator |
/// | `INITIATOR_DEQUEUE` | forward the request to the destination socket   |
/// | `MESSAGE_FOR_TARGET`| (from a target socket) deliver to the target    |
/// | `ACK_FROM_TARGET`   | deliver the ACK to the issuing initiator        |
///
/// Anything else is a protocol violation and aborts the run.
pub struct FabricProcess {
    name: String,
    clk_ns: f64,
    arbiter: SharedArbiter,
    sockets: BTreeMap<String, SocketHandle>,
    /// Queues per initiator, drained on behalf of the granted socket.
    queues: BTreeMap<String, Vec<(String, SharedQueue)>>,
    initiators: BTreeMap<String, ProcId>,
    targets: BTreeMap<String, ProcId>,
    deadline_ns: f64,
}

impl FabricProcess {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        clk_ns: f64,
        arbiter: SharedArbiter,
        sockets: BTreeMap<String, SocketHandle>,
        queues: BTreeMap<String, Vec<(String, SharedQueue)>>,
        initiators: BTreeMap<String, ProcId>,
        targets: BTreeMap<String, ProcId>,
    ) -> Self {
        Self {
            name: format!("Fabric_{}", name.into()),
            clk_ns,
            arbiter,
            sockets,
            queues,
            initiators,
            targets,
            deadline_ns: 0.0,
        }
    }

    fn tick(&mut self, now: f64) -> Action<Signal> {
        let granted = self.arbiter.borrow().granted_name().to_string();
        for (port, handle) in &self.sockets {
            let mut state = handle.state.borrow_mut();
            if state.is_initiator() {
                state.set_grant(now, *port == granted);
            }
        }
        self.deadline_ns = now + self.clk_ns;
        Action::Wait(self.clk_ns)
    }

    fn rewait(&self, now: f64) -> Action<Signal> {
        Action::Wait((self.deadline_ns - now).max(0.0))
    }

    fn violation(&self, detail: impl Into<String>) -> Action<Signal> {
        Action::Fail(SimError::Protocol {
            component: self.name.clone(),
            detail: detail.into(),
        })
    }

    fn handle(&mut self, cause: Signal, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        let now = ctx.now();
        match cause {
            Signal::SocketGranted(initiator) => {
                let Some(queues) = self.queues.get(&initiator) else {
                    return self.violation(format!("granted unknown initiator '{initiator}'"));
                };
                for (queue_name, queue) in queues {
                    aux::debug(now, &self.name, &format!("Dequeue from {queue_name}"));
                    ctx.spawn(Box::new(DequeueJob::new(queue.clone(), ctx.self_id())));
                }
                self.rewait(now)
            }
            Signal::InitiatorDequeue(request) => {
                aux::debug(now, &self.name, &format!("Message received in Fabric: {request:?}"));
                let Some(handle) = self.sockets.get(&request.dst) else {
                    return self.violation(format!("no socket for destination '{}'", request.dst));
                };
                let fabric = ctx.self_id();
                ctx.interrupt(handle.process, Signal::MessageForTarget { request, fabric });
                self.rewait(now)
            }
            Signal::MessageForTarget { request, fabric } => {
                // Relayed back by the destination's target socket.
                aux::debug(now, &self.name, "Passing the message to target socket");
                let Some(target) = self.targets.get(&request.dst).copied() else {
                    return self.violation(format!("no target process for '{}'", request.dst));
                };
                ctx.interrupt(target, Signal::MessageForTarget { request, fabric });
                self.rewait(now)
            }
            Signal::AckFromTarget { target, initiator } => {
                aux::debug(now, &self.name, &format!("ACK received from Target \"{target}\""));
                let Some(process) = self.initiators.get(&initiator).copied() else {
                    return self.violation(format!("ACK for unknown initiator '{initiator}'"));
                };
                ctx.interrupt(process, Signal::AckFromTarget { target, initiator });
                self.rewait(now)
            }
            other => Action::Fail(SimError::UnknownInterrupt {
                component: self.name.clone(),
                detail: other.tag().to_string(),
            }),
        }
    }
}

impl Process<Signal> for FabricProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, resume: Resume<Signal>, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        match resume {
            Resume::Start => {
                aux::debug(
                    ctx.now(),
                    &self.name,
                    &format!("Created with clk={} ns, {} sockets", self.clk_ns, self.sockets.len()),
                );
                self.deadline_ns = ctx.now() + self.clk_ns;
                Action::Wait(self.clk_ns)
            }
            Resume::Timer => self.tick(ctx.now()),
            Resume::Interrupted(cause) => self.handle(cause, ctx),
            other => Action::Fail(SimError::Protocol {
                component: self.name.clone(),
                detail: format!("unexpected resume: {other:?}"),
            }),
        }
    }
}

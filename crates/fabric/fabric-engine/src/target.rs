use bedrock_kernel::{Action, Ctx, Process, Resume, SimError, aux};
use fabric_core::Signal;

use crate::stats::SharedStats;

/// Pure sink: every delivered request is acknowledged within the same
/// instant. No queueing and no latency table yet; the per-socket `latencies`
/// config key is the extension point.
pub struct TargetProcess {
    name: String,
    /// Bare port name as it appears in `Request::dst` and in ACKs.
    port: String,
    clk_ns: f64,
    stats: SharedStats,
    deadline_ns: f64,
}

impl TargetProcess {
    pub fn new(port: impl Into<String>, clk_ns: f64, stats: SharedStats) -> Self {
        let port = port.into();
        Self {
            name: format!("Target_{port}"),
            port,
            clk_ns,
            stats,
            deadline_ns: 0.0,
        }
    }
}

impl Process<Signal> for TargetProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, resume: Resume<Signal>, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        match resume {
            Resume::Start => {
                aux::debug(ctx.now(), &self.name, &format!("Created with clk={} ns", self.clk_ns));
                self.deadline_ns = ctx.now() + self.clk_ns;
                Action::Wait(self.clk_ns)
            }
            Resume::Timer => {
                self.deadline_ns = ctx.now() + self.clk_ns;
                Action::Wait(self.clk_ns)
            }
            Resume::Interrupted(Signal::MessageForTarget { request, fabric }) => {
                let now = ctx.now();
                aux::debug(now, &self.name, &format!("Message received: {request:?}"));

                {
                    let mut stats = self.stats.borrow_mut();
                    stats.bytes_acked += request.size;
                    let latency_ps = ((now - request.timestamp).max(0.0) * 1000.0) as u64;
                    stats.latency_ps.record(latency_ps);
                }

                ctx.interrupt(
                    fabric,
                    Signal::AckFromTarget {
                        target: self.port.clone(),
                        initiator: request.src.initiator,
                    },
                );
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

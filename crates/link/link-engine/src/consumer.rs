use bedrock_kernel::{Action, Ctx, Process, Resume, SimError, StoreId};
use link_core::{PackState, SharedLink};

/// Rate-limited sink.
///
/// Each round waits out the per-item interval of the current pack mode and
/// then drains one message — unless the FSM is idle, in which case the
/// gated consumer stalls. The bypass link's consumer ignores the FSM and
/// always drains at the 4PACK interval, producing the reference curve.
pub struct ConsumerProcess {
    link: SharedLink,
    store: StoreId,
    last_ps: f64,
}

impl ConsumerProcess {
    pub fn new(link: SharedLink, store: StoreId) -> Self {
        Self { link, store, last_ps: 0.0 }
    }
}

impl Process<u64> for ConsumerProcess {
    fn name(&self) -> &str {
        "Consumer"
    }

    fn step(&mut self, resume: Resume<u64>, ctx: &mut Ctx<'_, u64>) -> Action<u64> {
        match resume {
            Resume::Start => Action::Wait(self.link.borrow().can_dequeue_ps()),
            Resume::Timer => {
                let (gated_open, interval) = {
                    let link = self.link.borrow();
                    (link.is_dummy() || link.state() != PackState::Idle, link.can_dequeue_ps())
                };
                if gated_open {
                    self.link.borrow_mut().note_dequeue_start();
                    Action::Get(self.store)
                } else {
                    Action::Wait(interval)
                }
            }
            Resume::Item(msg) => {
                let now = ctx.now();
                let delta_ps = now - self.last_ps;
                if delta_ps > 0.0 {
                    let rate_gbps = (1e3 / 8.0) / delta_ps;
                    let mut link = self.link.borrow_mut();
                    link.mark_rate(rate_gbps);
                    tracing::debug!(
                        "time={now}ps - Consumer {} received: data={msg}, delta={delta_ps:.2}ps \
                         (={rate_gbps:.2}GB/s)",
                        u8::from(link.is_dummy())
                    );
                }
                self.last_ps = now;
                Action::Wait(self.link.borrow().can_dequeue_ps())
            }
            other => Action::Fail(SimError::Protocol {
                component: "Consumer".to_string(),
                detail: format!("unexpected resume: {other:?}"),
            }),
        }
    }
}

use bedrock_kernel::{Action, Ctx, Process, Resume, SimError, StoreId};
use link_core::{ProducerParams, SharedLink};
use rand_distr::{Distribution, Normal, NormalError};

/// Stochastic bitstream source.
///
/// Inside the active part of the square-wave window the idle gap between
/// messages is normally distributed; at the window boundary the producer
/// sleeps out the inactive remainder. A full buffer parks the put until the
/// consumer frees a slot, which is exactly the backpressure the link under
/// test must absorb.
pub struct ProducerProcess {
    link: SharedLink,
    store: StoreId,
    params: ProducerParams,
    idle_dist: Normal<f64>,
    msg: u64,
}

impl ProducerProcess {
    pub fn new(
        link: SharedLink,
        store: StoreId,
        params: ProducerParams,
    ) -> Result<Self, NormalError> {
        let idle_dist = Normal::new(params.idle_ps_mean, params.idle_ps_std)?;
        Ok(Self { link, store, params, idle_dist, msg: 0 })
    }

    fn next_idle_ps(&mut self, ctx: &mut Ctx<'_, u64>) -> f64 {
        let now = ctx.now();
        let mut idle_ps = -1.0;
        if self.params.window > 0 {
            let window = self.params.window as f64;
            let window_pos = now % window;
            if window_pos >= self.params.utilization * window {
                idle_ps = ((1.0 - self.params.utilization) * window).floor();
            }
        }
        if idle_ps < 0.0 {
            idle_ps = self.idle_dist.sample(ctx.rng());
        }
        let idle_ps = idle_ps.max(1.0);
        let rate_gbps = (1e3 / 8.0) / idle_ps;
        tracing::debug!(
            "time={now}ps - Producer sent: data={}, idle={idle_ps:.2}ps (={rate_gbps:.2}GB/s)",
            self.msg
        );
        idle_ps
    }
}

impl Process<u64> for ProducerProcess {
    fn name(&self) -> &str {
        "Producer"
    }

    fn step(&mut self, resume: Resume<u64>, ctx: &mut Ctx<'_, u64>) -> Action<u64> {
        match resume {
            Resume::Start => {
                if self.params.utilization <= 0.0 {
                    // Zero utilization silences the producer entirely.
                    return Action::Halt;
                }
                let idle = self.next_idle_ps(ctx);
                Action::Wait(idle)
            }
            Resume::Timer => Action::Put(self.store, self.msg),
            Resume::Stored => {
                let buffer_len = ctx.store_len(self.store);
                self.link.borrow_mut().note_enqueue(self.msg, buffer_len, ctx.now());
                self.msg += 1;
                let idle = self.next_idle_ps(ctx);
                Action::Wait(idle)
            }
            other => Action::Fail(SimError::Protocol {
                component: "Producer".to_string(),
                detail: format!("unexpected resume: {other:?}"),
            }),
        }
    }
}

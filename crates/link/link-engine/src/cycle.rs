use bedrock_kernel::{Action, Ctx, Process, Resume, SimError, StoreId};
use link_core::SharedLink;

/// Advances the link FSM once per link cycle.
pub struct CycleProcess {
    link: SharedLink,
    store: StoreId,
    step_ps: f64,
}

impl CycleProcess {
    pub fn new(link: SharedLink, store: StoreId) -> Self {
        let step_ps = link.borrow().cyc_step_ps() as f64;
        Self { link, store, step_ps }
    }
}

impl Process<u64> for CycleProcess {
    fn name(&self) -> &str {
        "LinkCycle"
    }

    fn step(&mut self, resume: Resume<u64>, ctx: &mut Ctx<'_, u64>) -> Action<u64> {
        match resume {
            Resume::Start => Action::Wait(self.step_ps),
            Resume::Timer => {
                let buffer_len = ctx.store_len(self.store);
                self.link.borrow_mut().cycle_tick(buffer_len, ctx.now());
                Action::Wait(self.step_ps)
            }
            other => Action::Fail(SimError::Protocol {
                component: "LinkCycle".to_string(),
                detail: format!("unexpected resume: {other:?}"),
            }),
        }
    }
}

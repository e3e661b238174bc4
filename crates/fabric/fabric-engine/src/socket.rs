use std::cell::RefCell;
use std::rc::Rc;

use bedrock_kernel::{Action, Ctx, ProcId, Process, Resume, SimError, aux};
use fabric_config::SocketRole;
use fabric_core::Signal;

pub type SharedSocket = Rc<RefCell<SocketState>>;

/// Per-port grant flag, written by the fabric each tick.
///
/// Initiator sockets start ungranted; target sockets hold the flag high
/// because arbitration never applies to them.
pub struct SocketState {
    name: String,
    role: SocketRole,
    granted: bool,
}

impl SocketState {
    pub fn new(name: impl Into<String>, role: SocketRole) -> Self {
        Self {
            name: name.into(),
            role,
            granted: role == SocketRole::Target,
        }
    }

    pub fn new_shared(name: impl Into<String>, role: SocketRole) -> SharedSocket {
        Rc::new(RefCell::new(Self::new(name, role)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initiator(&self) -> bool {
        self.role == SocketRole::Initiator
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }

    pub fn set_grant(&mut self, now: f64, granted: bool) {
        if !self.granted && granted {
            aux::debug(
                now,
                &format!("Socket_{}", self.name),
                &format!("\"{}\" has been granted by Fabric Arbiter", self.name),
            );
        }
        self.granted = granted;
    }
}

/// The process side of a port: ticks on the fabric clock and, while holding
/// the grant, signals the fabric; target ports relay inbound messages back
/// to the fabric unchanged.
pub struct SocketProcess {
    label: String,
    state: SharedSocket,
    fabric: ProcId,
    clk_ns: f64,
    deadline_ns: f64,
}

impl SocketProcess {
    pub fn new(state: SharedSocket, fabric: ProcId, clk_ns: f64) -> Self {
        let label = format!("Socket_{}", state.borrow().name());
        Self {
            label,
            state,
            fabric,
            clk_ns,
            deadline_ns: 0.0,
        }
    }

    fn tick(&mut self, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        let now = ctx.now();
        let state = self.state.borrow();
        if state.is_initiator() && state.is_granted() {
            let port = state.name().to_string();
            drop(state);
            ctx.interrupt(self.fabric, Signal::SocketGranted(port));
        }
        self.deadline_ns = now + self.clk_ns;
        Action::Wait(self.clk_ns)
    }
}

impl Process<Signal> for SocketProcess {
    fn name(&self) -> &str {
        &self.label
    }

    fn step(&mut self, resume: Resume<Signal>, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        match resume {
            Resume::Start => {
                let role = if self.state.borrow().is_initiator() { "initiator" } else { "target" };
                aux::debug(ctx.now(), &self.label, &format!("Created as {role} port"));
                self.deadline_ns = ctx.now() + self.clk_ns;
                Action::Wait(self.clk_ns)
            }
            Resume::Timer => self.tick(ctx),
            Resume::Interrupted(Signal::MessageForTarget { request, fabric }) => {
                if self.state.borrow().is_initiator() {
                    return Action::Fail(SimError::Protocol {
                        component: self.label.clone(),
                        detail: "an initiator socket cannot receive target messages".to_string(),
                    });
                }
                ctx.interrupt(self.fabric, Signal::MessageForTarget { request, fabric });
                Action::Wait((self.deadline_ns - ctx.now()).max(0.0))
            }
            Resume::Interrupted(other) => Action::Fail(SimError::UnknownInterrupt {
                component: self.label.clone(),
                detail: other.tag().to_string(),
            }),
            other => Action::Fail(SimError::Protocol {
                component: self.label.clone(),
                detail: format!("unexpected resume: {other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_sockets_start_granted_initiators_do_not() {
        let init = SocketState::new("CPU", SocketRole::Initiator);
        let tgt = SocketState::new("SRAM", SocketRole::Target);
        assert!(!init.is_granted());
        assert!(tgt.is_granted());
    }

    #[test]
    fn grant_flag_follows_the_fabric() {
        let mut s = SocketState::new("CPU", SocketRole::Initiator);
        s.set_grant(0.0, true);
        assert!(s.is_granted());
        s.set_grant(5.0, false);
        assert!(!s.is_granted());
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use bedrock_kernel::{Action, Ctx, Process, Resume, SimError, aux};
use fabric_config::StartAt;
use fabric_core::Signal;
use rand::Rng;
use rand::rngs::StdRng;

pub type SharedArbiter = Rc<RefCell<Arbiter>>;

/// Round-robin grant state over the initiator names.
pub struct Arbiter {
    initiators: Vec<String>,
    granted: usize,
}

impl Arbiter {
    /// `RANDOM` draws uniformly from the valid index range `[0, N-1]`.
    pub fn new(initiators: Vec<String>, start_at: StartAt, rng: &mut StdRng) -> Self {
        debug_assert!(!initiators.is_empty());
        let granted = match start_at {
            StartAt::First => 0,
            StartAt::Random => rng.random_range(0..initiators.len()),
        };
        Self { initiators, granted }
    }

    pub fn new_shared(initiators: Vec<String>, start_at: StartAt, rng: &mut StdRng) -> SharedArbiter {
        Rc::new(RefCell::new(Self::new(initiators, start_at, rng)))
    }

    pub fn granted_name(&self) -> &str {
        &self.initiators[self.granted]
    }

    pub fn granted_index(&self) -> usize {
        self.granted
    }

    pub fn len(&self) -> usize {
        self.initiators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initiators.is_empty()
    }

    pub fn rotate(&mut self) {
        self.granted = (self.granted + 1) % self.initiators.len();
    }
}

/// Rotates the grant one slot every `slot_length` fabric cycles.
pub struct ArbiterRotor {
    arbiter: SharedArbiter,
    slot_ns: f64,
}

impl ArbiterRotor {
    /// `slot_length` is in fabric ticks; `clk_ns` is the fabric tick.
    pub fn new(arbiter: SharedArbiter, slot_length: u64, clk_ns: f64) -> Self {
        Self {
            arbiter,
            slot_ns: slot_length as f64 * clk_ns,
        }
    }
}

impl Process<Signal> for ArbiterRotor {
    fn name(&self) -> &str {
        "Arbiter"
    }

    fn step(&mut self, resume: Resume<Signal>, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        match resume {
            Resume::Start => {
                aux::debug(
                    ctx.now(),
                    "Arbiter",
                    &format!("Created with slot={} ns over {} initiators",
                        self.slot_ns,
                        self.arbiter.borrow().len()
                    ),
                );
                Action::Wait(self.slot_ns)
            }
            Resume::Timer => {
                {
                    let arbiter = self.arbiter.borrow();
                    aux::debug(
                        ctx.now(),
                        "Arbiter",
                        &format!(
                            "Slot #{} ({} out of {}) granted",
                            arbiter.granted_name(),
                            arbiter.granted_index(),
                            arbiter.len()
                        ),
                    );
                }
                self.arbiter.borrow_mut().rotate();
                Action::Wait(self.slot_ns)
            }
            Resume::Interrupted(other) => Action::Fail(SimError::UnknownInterrupt {
                component: "Arbiter".to_string(),
                detail: other.tag().to_string(),
            }),
            other => Action::Fail(SimError::Protocol {
                component: "Arbiter".to_string(),
                detail: format!("unexpected resume: {other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedrock_kernel::Simulation;
    use rand::SeedableRng;

    #[test]
    fn starts_at_first_and_wraps() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut arbiter = Arbiter::new(
            vec!["CPU".into(), "PCIE".into()],
            StartAt::First,
            &mut rng,
        );
        assert_eq!(arbiter.granted_name(), "CPU");
        arbiter.rotate();
        assert_eq!(arbiter.granted_name(), "PCIE");
        arbiter.rotate();
        assert_eq!(arbiter.granted_name(), "CPU");
    }

    #[test]
    fn random_start_stays_in_range() {
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let arbiter = Arbiter::new(
                vec!["CPU".into(), "PCIE".into(), "DMA".into()],
                StartAt::Random,
                &mut rng,
            );
            assert!(arbiter.granted_index() < 3);
        }
    }

    /// Samples the grant every fabric tick of 5 ns with slot_length 5:
    /// CPU for 25 ns, PCIE for 25 ns, alternating.
    #[test]
    fn rotates_every_slot_length_fabric_cycles() {
        struct Probe {
            arbiter: SharedArbiter,
            clk_ns: f64,
            samples: Rc<RefCell<Vec<(f64, String)>>>,
        }
        impl Process<Signal> for Probe {
            fn name(&self) -> &str {
                "probe"
            }
            fn step(&mut self, resume: Resume<Signal>, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
                if let Resume::Timer = resume {
                    self.samples
                        .borrow_mut()
                        .push((ctx.now(), self.arbiter.borrow().granted_name().to_string()));
                }
                Action::Wait(self.clk_ns)
            }
        }

        let clk_ns = 1000.0 / 200.0; // 200 MHz -> 5 ns
        let mut sim = Simulation::<Signal>::new(1);
        let arbiter = Arbiter::new_shared(
            vec!["CPU".into(), "PCIE".into()],
            StartAt::First,
            sim.rng(),
        );
        // Rotor first so that at a shared instant the rotation is visible to
        // the probe sampling the same tick.
        sim.add(Box::new(ArbiterRotor::new(arbiter.clone(), 5, clk_ns)));
        let samples = Rc::new(RefCell::new(Vec::new()));
        sim.add(Box::new(Probe { arbiter: arbiter.clone(), clk_ns, samples: samples.clone() }));

        sim.run(180.0).unwrap();

        let expect_at = |t: f64| -> String {
            let slot = (t / 25.0) as u64;
            if slot % 2 == 0 { "CPU".into() } else { "PCIE".into() }
        };
        for (t, name) in samples.borrow().iter() {
            assert_eq!(*name, expect_at(*t), "wrong grant at {t} ns");
        }
        // Six slots covered: CPU, PCIE, CPU, PCIE, CPU, PCIE.
        let seen: Vec<String> = samples
            .borrow()
            .iter()
            .filter(|(t, _)| (t / 5.0).round() as u64 % 5 == 0)
            .map(|(_, n)| n.clone())
            .collect();
        assert!(seen.len() >= 6);
    }
}

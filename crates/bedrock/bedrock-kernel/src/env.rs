use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::SimError;
use crate::process::{Action, ProcId, Process, Resume, StoreId};

/// A scheduled wake-up. Ordered by `(at, seq)`: `seq` is a global monotonic
/// counter, so simultaneous wakes resume in the order they were scheduled.
struct Scheduled<M> {
    at: f64,
    seq: u64,
    wake: Wake<M>,
}

impl<M> PartialEq for Scheduled<M> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<M> Eq for Scheduled<M> {}

impl<M> PartialOrd for Scheduled<M> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for Scheduled<M> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.total_cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

enum Wake<M> {
    Start(ProcId),
    /// Carries the epoch the timer was armed under; a stale epoch means the
    /// wait was cancelled by an interrupt and the wake must be ignored.
    Timer(ProcId, u64),
    /// Pop the next pending interrupt and deliver it.
    Deliver(ProcId),
    /// A store operation completed while the process was parked.
    Resume(ProcId, Resume<M>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WaitKind {
    Timer,
    Get(StoreId),
    Put(StoreId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProcState {
    /// Declared but not yet attached; interrupts are buffered.
    Detached,
    /// Exactly one wake for this process is in the queue.
    Ready,
    Waiting(WaitKind),
    Halted,
}

struct ProcEntry<M> {
    /// Taken out while the process is stepping.
    behavior: Option<Box<dyn Process<M>>>,
    state: ProcState,
    /// Interrupts sent but not yet delivered, in send order.
    pending: VecDeque<M>,
    epoch: u64,
}

struct StoreState<M> {
    capacity: usize,
    items: VecDeque<M>,
    getters: VecDeque<ProcId>,
    putters: VecDeque<(ProcId, M)>,
}

/// Cooperative single-threaded discrete-event scheduler.
///
/// Owns every process, every bounded store, the simulated clock and the
/// seeded RNG. Time advances only between wakes; a process body runs
/// atomically with respect to its peers.
pub struct Simulation<M> {
    now: f64,
    seq: u64,
    queue: BinaryHeap<Reverse<Scheduled<M>>>,
    procs: Vec<ProcEntry<M>>,
    stores: Vec<StoreState<M>>,
    rng: StdRng,
    failure: Option<SimError>,
}

impl<M: fmt::Debug + 'static> Simulation<M> {
    pub fn new(seed: u64) -> Self {
        Self {
            now: 0.0,
            seq: 0,
            queue: BinaryHeap::new(),
            procs: Vec::new(),
            stores: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            failure: None,
        }
    }

    /// Current simulated time. Units are whatever the model uses (the fabric
    /// counts nanoseconds, the link picoseconds).
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Reserves a process id without a behavior, for wiring reference
    /// cycles: components that must know each other's ids before both exist.
    pub fn declare(&mut self) -> ProcId {
        self.procs.push(ProcEntry {
            behavior: None,
            state: ProcState::Detached,
            pending: VecDeque::new(),
            epoch: 0,
        });
        ProcId(self.procs.len() - 1)
    }

    /// Binds a behavior to a declared id and schedules its first activation
    /// at the current time, behind already-scheduled peers.
    pub fn attach(&mut self, id: ProcId, behavior: Box<dyn Process<M>>) {
        let entry = &mut self.procs[id.0];
        debug_assert!(entry.behavior.is_none() && entry.state == ProcState::Detached);
        entry.behavior = Some(behavior);
        entry.state = ProcState::Ready;
        self.schedule(self.now, Wake::Start(id));
    }

    pub fn add(&mut self, behavior: Box<dyn Process<M>>) -> ProcId {
        let id = self.declare();
        self.attach(id, behavior);
        id
    }

    /// Creates a bounded store. A `Put` into a full store parks the caller
    /// until a `Get` frees a slot.
    pub fn add_store(&mut self, capacity: usize) -> StoreId {
        self.stores.push(StoreState {
            capacity,
            items: VecDeque::new(),
            getters: VecDeque::new(),
            putters: VecDeque::new(),
        });
        StoreId(self.stores.len() - 1)
    }

    pub fn store_len(&self, id: StoreId) -> usize {
        self.stores[id.0].items.len()
    }

    /// Sends an interrupt. The target observes `Resume::Interrupted(cause)`
    /// at its next suspension point, cancelling any wait in flight.
    /// Interrupts to a halted process are dropped.
    pub fn interrupt(&mut self, target: ProcId, cause: M) {
        let entry = &mut self.procs[target.0];
        if entry.state == ProcState::Halted {
            tracing::trace!("interrupt {cause:?} dropped: process #{} halted", target.0);
            return;
        }
        entry.pending.push_back(cause);
        self.maybe_deliver(target);
    }

    /// Processes wakes strictly before `until`, then advances the clock to
    /// `until`. Returns the first fatal error raised by any process.
    pub fn run(&mut self, until: f64) -> Result<(), SimError> {
        loop {
            match self.queue.peek() {
                Some(Reverse(s)) if s.at < until => {}
                _ => break,
            }
            let Reverse(sched) = self.queue.pop().expect("peeked wake vanished");
            self.now = sched.at;
            self.dispatch(sched.wake);
            if let Some(err) = self.failure.take() {
                return Err(err);
            }
        }
        self.now = self.now.max(until);
        Ok(())
    }

    fn schedule(&mut self, at: f64, wake: Wake<M>) {
        self.seq += 1;
        self.queue.push(Reverse(Scheduled { at, seq: self.seq, wake }));
    }

    fn dispatch(&mut self, wake: Wake<M>) {
        match wake {
            Wake::Start(id) => {
                if self.procs[id.0].state == ProcState::Ready {
                    self.step_proc(id, Resume::Start);
                }
            }
            Wake::Timer(id, epoch) => {
                let entry = &self.procs[id.0];
                if entry.state == ProcState::Waiting(WaitKind::Timer) && entry.epoch == epoch {
                    self.step_proc(id, Resume::Timer);
                }
            }
            Wake::Deliver(id) => {
                if self.procs[id.0].state == ProcState::Ready {
                    if let Some(cause) = self.procs[id.0].pending.pop_front() {
                        self.step_proc(id, Resume::Interrupted(cause));
                    }
                }
            }
            Wake::Resume(id, resume) => {
                if self.procs[id.0].state == ProcState::Ready {
                    self.step_proc(id, resume);
                }
            }
        }
    }

    fn step_proc(&mut self, id: ProcId, resume: Resume<M>) {
        let Some(mut behavior) = self.procs[id.0].behavior.take() else {
            return;
        };
        let action = {
            let mut ctx = Ctx { sim: self, id };
            behavior.step(resume, &mut ctx)
        };
        self.procs[id.0].behavior = Some(behavior);
        self.apply_action(id, action);
    }

    fn apply_action(&mut self, id: ProcId, action: Action<M>) {
        match action {
            Action::Wait(d) => {
                let entry = &mut self.procs[id.0];
                entry.epoch += 1;
                let epoch = entry.epoch;
                entry.state = ProcState::Waiting(WaitKind::Timer);
                self.schedule(self.now + d.max(0.0), Wake::Timer(id, epoch));
            }
            Action::Get(sid) => {
                self.procs[id.0].state = ProcState::Waiting(WaitKind::Get(sid));
                self.stores[sid.0].getters.push_back(id);
                self.settle_store(sid);
            }
            Action::Put(sid, value) => {
                self.procs[id.0].state = ProcState::Waiting(WaitKind::Put(sid));
                self.stores[sid.0].putters.push_back((id, value));
                self.settle_store(sid);
            }
            Action::Halt => {
                let entry = &mut self.procs[id.0];
                entry.state = ProcState::Halted;
                entry.behavior = None;
                entry.pending.clear();
            }
            Action::Fail(err) => {
                self.procs[id.0].state = ProcState::Halted;
                self.failure = Some(err);
            }
        }
        self.maybe_deliver(id);
    }

    /// Moves items between a store's wait lists until nothing can progress.
    /// Getters are fed before parked putters are admitted, in FIFO order.
    fn settle_store(&mut self, sid: StoreId) {
        loop {
            let fed = {
                let st = &mut self.stores[sid.0];
                if !st.items.is_empty() && !st.getters.is_empty() {
                    let getter = st.getters.pop_front().expect("getter list emptied");
                    let item = st.items.pop_front().expect("item list emptied");
                    Some((getter, item))
                } else {
                    None
                }
            };
            if let Some((getter, item)) = fed {
                self.procs[getter.0].state = ProcState::Ready;
                self.schedule(self.now, Wake::Resume(getter, Resume::Item(item)));
                continue;
            }

            let admitted = {
                let st = &mut self.stores[sid.0];
                if st.items.len() < st.capacity && !st.putters.is_empty() {
                    let (putter, value) = st.putters.pop_front().expect("putter list emptied");
                    st.items.push_back(value);
                    Some(putter)
                } else {
                    None
                }
            };
            if let Some(putter) = admitted {
                self.procs[putter.0].state = ProcState::Ready;
                self.schedule(self.now, Wake::Resume(putter, Resume::Stored));
                continue;
            }

            break;
        }
    }

    /// If the process is blocked and has undelivered interrupts, cancel the
    /// wait and schedule a delivery at the current instant.
    fn maybe_deliver(&mut self, id: ProcId) {
        if self.procs[id.0].pending.is_empty() {
            return;
        }
        if let ProcState::Waiting(kind) = self.procs[id.0].state {
            self.cancel_wait(id, kind);
            self.procs[id.0].state = ProcState::Ready;
            self.schedule(self.now, Wake::Deliver(id));
        }
    }

    fn cancel_wait(&mut self, id: ProcId, kind: WaitKind) {
        match kind {
            WaitKind::Timer => {
                // Leaves the stale wake in the heap; the epoch bump makes it
                // a no-op when it fires.
                self.procs[id.0].epoch += 1;
            }
            WaitKind::Get(sid) => {
                self.stores[sid.0].getters.retain(|g| *g != id);
            }
            WaitKind::Put(sid) => {
                // The parked value is discarded with the cancelled put.
                self.stores[sid.0].putters.retain(|(p, _)| *p != id);
            }
        }
    }
}

/// What a process may do while it is stepping.
pub struct Ctx<'a, M: fmt::Debug + 'static> {
    sim: &'a mut Simulation<M>,
    id: ProcId,
}

impl<'a, M: fmt::Debug + 'static> Ctx<'a, M> {
    pub fn now(&self) -> f64 {
        self.sim.now
    }

    pub fn self_id(&self) -> ProcId {
        self.id
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.sim.rng
    }

    /// Sends an interrupt to another process. Self-interrupts are a
    /// programming error.
    pub fn interrupt(&mut self, target: ProcId, cause: M) {
        debug_assert!(target != self.id, "process interrupted itself");
        self.sim.interrupt(target, cause);
    }

    /// Spawns a process that first runs at the current instant, behind
    /// everything already scheduled for it.
    pub fn spawn(&mut self, behavior: Box<dyn Process<M>>) -> ProcId {
        self.sim.add(behavior)
    }

    pub fn store_len(&self, id: StoreId) -> usize {
        self.sim.store_len(id)
    }
}

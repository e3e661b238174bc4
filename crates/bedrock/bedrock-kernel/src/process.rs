use std::fmt;

use crate::env::Ctx;
use crate::error::SimError;

/// Stable handle to a process registered with the simulation.
///
/// Components hold `ProcId`s instead of references to each other, so the
/// reference cycles of the modelled hardware (fabric ↔ sockets ↔ initiators)
/// never become ownership cycles: the simulation exclusively owns all
/// process state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcId(pub(crate) usize);

/// Handle to a bounded store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StoreId(pub(crate) usize);

/// Why a process is being resumed.
#[derive(Debug)]
pub enum Resume<M> {
    /// First activation, at the simulated time the process was added.
    Start,
    /// The `Wait` issued by the previous step has elapsed.
    Timer,
    /// A `Get` completed; carries the item taken from the store.
    Item(M),
    /// A `Put` completed; the value is now resident in the store.
    Stored,
    /// An interrupt arrived, cancelling whatever the process was waiting on.
    Interrupted(M),
}

/// What a process asks the kernel to do next.
#[derive(Debug)]
pub enum Action<M> {
    /// Suspend for `d` simulated time units. `Wait(0.0)` re-enters the wake
    /// queue behind peers scheduled at the same instant.
    Wait(f64),
    /// Take the next item from a store, suspending while it is empty.
    Get(StoreId),
    /// Deposit a value into a store, suspending while it is full.
    Put(StoreId, M),
    /// Terminate this process. Pending interrupts are discarded.
    Halt,
    /// Abort the whole simulation through the fatal-error channel.
    Fail(SimError),
}

/// A simulated component.
///
/// `step` runs atomically with respect to every other process; the only
/// suspension points are the returned [`Action`]s.
pub trait Process<M: fmt::Debug + 'static> {
    /// Component name used in protocol-violation reports.
    fn name(&self) -> &str;

    fn step(&mut self, resume: Resume<M>, ctx: &mut Ctx<'_, M>) -> Action<M>;
}

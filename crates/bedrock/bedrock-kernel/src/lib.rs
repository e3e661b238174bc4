//! `bedrock-kernel`: cooperative discrete-event kernel for Bedrock simulators.
//!
//! This crate provides the scheduling backbone shared by the fabric and link
//! models: a single-threaded event loop over a simulated clock, long-lived
//! processes that alternate between timed waits and interrupt handling, and
//! bounded stores with put/get backpressure.
//!
//! # Core Components
//!
//! - [`Simulation`]: the event loop; owns every process, store and the RNG
//! - [`Process`]: the step function a component implements
//! - [`Ctx`]: what a process may do while stepping (send interrupts, spawn,
//!   query stores, draw random numbers)
//! - [`SimError`]: the common fatal-error channel
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │          Simulation          │
//!                 │  time-ordered wake queue     │
//!                 │  (FIFO at equal timestamps)  │
//!                 └──┬─────────┬─────────────┬───┘
//!            Timer   │  Item/  │  Interrupt  │
//!                    ▼  Stored ▼             ▼
//!              ┌─────────┐ ┌─────────┐ ┌─────────┐
//!              │ Process │ │ Process │ │ Process │ ...
//!              └─────────┘ └─────────┘ └─────────┘
//! ```
//!
//! A process never blocks the thread: `step` returns an [`Action`] telling
//! the kernel what to wait for, and the kernel resumes it with a [`Resume`]
//! when that wait completes. Interrupts cancel an in-flight wait and are
//! delivered in send order, one per resume.
//!
//! # Example
//!
//! ```ignore
//! let mut sim = Simulation::<u64>::new(1);
//! let store = sim.add_store(8);
//! sim.add(Box::new(MyProducer::new(store)));
//! sim.add(Box::new(MyConsumer::new(store)));
//! sim.run(1_000.0)?;
//! ```
//!
//! # Internal Modules
//!
//! - `env`: the event loop, wake queue and bounded stores
//! - `process`: process trait, resume/action vocabulary, ids
//! - `error`: the fatal-error channel
//! - `aux`: simulated-time log line helpers

#![forbid(unsafe_code)]

pub mod aux;
mod env;
mod error;
mod process;

pub use env::{Ctx, Simulation};
pub use error::SimError;
pub use process::{Action, ProcId, Process, Resume, StoreId};

//! `link-core`: the single-link pipeline model and its pack-rate FSM.
//!
//! A stochastic producer feeds a bounded buffer; a rate-limited consumer
//! drains it. Between them sits the pack-rate state machine: it widens the
//! link (1PACK → 2PACK → 4PACK) when the buffer shows sustained data
//! availability and narrows it when dequeue activity stays under the
//! per-state bandwidth thresholds on both the short and the long window.
//!
//! ```text
//!   ----------      --------------------------------------      ----------
//!   | Producer |--->| Buffer |---> pop @ pack rate -------|--->| Consumer |
//!   ----------      |    ^                |               |     ----------
//!                   |    |           -----------          |
//!                   |    -----------| pack FSM |          |
//!                   |               -----------           |
//!                   --------------------------------------
//! ```
//!
//! [`Link::cycle_tick`] is deliberately free of scheduler types: it consumes
//! the buffer occupancy and the current time, so the FSM can be unit-tested
//! cycle by cycle without an event loop.

#![forbid(unsafe_code)]

pub mod link;
pub mod pack;
pub mod params;

pub use link::{Link, SharedLink, Transition};
pub use pack::PackState;
pub use params::{
    AVAILS, Avail, AvailPair, LinkParams, ProducerParams, SCOPES, Scope, ScopePair, StateTable,
};

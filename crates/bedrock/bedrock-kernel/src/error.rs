/// Fatal simulation errors.
///
/// Capacity events (queue overflow/underflow) are expected under load and are
/// reported through component flags and counters, never through this type.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A message reached a component that must not receive it, e.g. a
    /// target-bound payload delivered to an initiator-side socket.
    #[error("[{component}] protocol violation: {detail}")]
    Protocol { component: String, detail: String },

    /// A component was interrupted with a cause it has no handler for.
    #[error("[{component}] unknown interrupt: {detail}")]
    UnknownInterrupt { component: String, detail: String },
}

//! Simulated-time log line helpers.
//!
//! Every fabric-side log line carries the simulated timestamp in the fixed
//! `[<now>.2f ns] [<tag>] <message>` shape so runs can be diffed and matched
//! by test oracles. Routing goes through `tracing`; the bins choose the
//! subscriber and level.

const BANNER_WIDTH: usize = 70;

/// Formats the canonical log line. Exposed so tests can match against it.
pub fn line(now_ns: f64, tag: &str, msg: &str) -> String {
    format!("[{now_ns:.2} ns] [{tag}] {msg}")
}

/// Debug-level line, suppressed unless the subscriber allows `DEBUG`.
pub fn debug(now_ns: f64, tag: &str, msg: &str) {
    tracing::debug!("{}", line(now_ns, tag, msg));
}

/// Always-on informational line.
pub fn message(now_ns: f64, tag: &str, msg: &str) {
    tracing::info!("{}", line(now_ns, tag, msg));
}

/// Phase banner: the line framed by 70 `=` characters above and below.
pub fn timestamp(now_ns: f64, tag: &str, msg: &str) {
    tracing::info!("{}", "=".repeat(BANNER_WIDTH));
    tracing::info!("{}", line(now_ns, tag, msg));
    tracing::info!("{}", "=".repeat(BANNER_WIDTH));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_has_two_decimal_timestamp() {
        assert_eq!(line(0.0, "Fabric_DATA", "tick"), "[0.00 ns] [Fabric_DATA] tick");
        assert_eq!(line(12.5, "Arbiter", "rotate"), "[12.50 ns] [Arbiter] rotate");
    }
}

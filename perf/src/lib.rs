//! Criterion harness for the simulator hot paths: raw kernel event
//! throughput and full-model runs of the fabric and link testbenches.

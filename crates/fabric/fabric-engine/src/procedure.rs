use bedrock_kernel::{Action, Ctx, Process, Resume, SimError, aux};
use fabric_config::ProcedureParams;
use fabric_core::{Origin, Request, Signal};
use rand::Rng;

use crate::queue::{Enqueue, SharedQueue};
use crate::stats::SharedStats;

/// Bandwidth generator.
///
/// Issues bursts of up to `burst_length` beats, one enqueue attempt per
/// component tick, throttled by the outstanding-credit quota and by the
/// achieved bandwidth of the current burst. After a burst it idles a uniform
/// number of ticks in `[0, inter_bursts]`.
///
/// ```text
///   Address:  O: --< Req #0 >--< Req #1 >-------< Req #2 > ... < Req #N >--
///             I: ------------------< Gnt #0 >------< Gnt #1 >-------------
///   Outstanding:  0    1      2          1      2        1    ...
/// ```
///
/// Throughput is "paid" when a request is accepted by the queue and released
/// when the Grant comes back; the throttle itself is computed over bytes
/// accepted in the current burst.
pub struct Procedure {
    name: String,
    initiator: String,
    params: ProcedureParams,
    clk_ns: f64,
    queue: SharedQueue,
    /// Destination pool; one is drawn uniformly per request.
    targets: Vec<String>,
    stats: SharedStats,

    outstanding: u32,
    /// Bytes accepted since the current burst began; throttle basis.
    payload_bytes: u64,
    /// Bytes confirmed by Grant over the whole run.
    completed_bytes: u64,
    average_bw_mbps: f64,
    burst_start_ns: f64,
    beat: u32,
    phase: Phase,
    /// Absolute time of the pending tick, so an interrupt mid-wait can
    /// resume the remainder instead of restarting a full tick.
    deadline_ns: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Beat,
    Gap,
}

impl Procedure {
    pub fn new(
        initiator: impl Into<String>,
        procedure: &str,
        params: ProcedureParams,
        clk_ns: f64,
        queue: SharedQueue,
        targets: Vec<String>,
        stats: SharedStats,
    ) -> Self {
        let initiator = initiator.into();
        Self {
            name: format!("Procedure_{initiator}_{procedure}"),
            initiator,
            params,
            clk_ns,
            queue,
            targets,
            stats,
            outstanding: 0,
            payload_bytes: 0,
            completed_bytes: 0,
            average_bw_mbps: 0.0,
            burst_start_ns: 0.0,
            beat: 0,
            phase: Phase::Beat,
            deadline_ns: 0.0,
        }
    }

    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }

    pub fn completed_bytes(&self) -> u64 {
        self.completed_bytes
    }

    fn begin_burst(&mut self, now: f64) -> Action<Signal> {
        self.burst_start_ns = now;
        self.payload_bytes = 0;
        self.average_bw_mbps = 0.0;
        self.beat = 0;
        self.phase = Phase::Beat;
        self.deadline_ns = now + self.clk_ns;
        Action::Wait(self.clk_ns)
    }

    fn send_request(&mut self, ctx: &mut Ctx<'_, Signal>) {
        let now = ctx.now();
        let dst_idx = ctx.rng().random_range(0..self.targets.len());
        let request = Request {
            operation: self.params.direction,
            src: Origin {
                initiator: self.initiator.clone(),
                queue: self.params.queue.clone(),
            },
            dst: self.targets[dst_idx].clone(),
            size: self.params.burst_size,
            addr_gen: self.params.address_gen,
            timestamp: now,
        };

        aux::debug(
            now,
            &self.name,
            &format!(
                "Request sent (outstanding: {} out of {})",
                self.outstanding + 1,
                self.params.outstanding
            ),
        );

        let result = self.queue.borrow_mut().enqueue(now, request);
        let mut stats = self.stats.borrow_mut();
        match result {
            Enqueue::Accepted => {
                self.outstanding += 1;
                self.payload_bytes += self.params.burst_size;
                stats.requests_sent += 1;
                stats.bytes_enqueued += self.params.burst_size;
            }
            Enqueue::Overflow => {
                // Dropped from this procedure's perspective; retried next beat.
                stats.overflows += 1;
            }
        }
        drop(stats);

        let elapsed_ns = now - self.burst_start_ns;
        if elapsed_ns > 0.0 {
            self.average_bw_mbps = 1000.0 * self.payload_bytes as f64 / elapsed_ns;
        }
    }

    fn beat_tick(&mut self, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        let now = ctx.now();
        if self.outstanding >= self.params.outstanding {
            aux::debug(
                now,
                &self.name,
                &format!(
                    "Stalled: reached maximum outstanding allocation ({})",
                    self.outstanding
                ),
            );
        } else if self.average_bw_mbps >= self.params.thr_in_mbps {
            aux::debug(
                now,
                &self.name,
                &format!(
                    "Stalled: reached maximum BW allocation ({:.2}MBPS)",
                    self.average_bw_mbps
                ),
            );
        } else {
            self.send_request(ctx);
        }

        self.beat += 1;
        if self.beat < self.params.burst_length {
            self.deadline_ns = now + self.clk_ns;
            Action::Wait(self.clk_ns)
        } else {
            self.phase = Phase::Gap;
            let gap_ticks = ctx.rng().random_range(0..=self.params.inter_bursts);
            let gap_ns = gap_ticks as f64 * self.clk_ns;
            self.deadline_ns = now + gap_ns;
            Action::Wait(gap_ns)
        }
    }

    /// Resumes the wait the interrupt cancelled, keeping the tick grid.
    fn rewait(&self, now: f64) -> Action<Signal> {
        Action::Wait((self.deadline_ns - now).max(0.0))
    }
}

impl Process<Signal> for Procedure {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, resume: Resume<Signal>, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        match resume {
            Resume::Start => {
                aux::debug(
                    ctx.now(),
                    &self.name,
                    &format!("Created with params: {:?}", self.params),
                );
                self.begin_burst(ctx.now())
            }
            Resume::Timer => match self.phase {
                Phase::Beat => self.beat_tick(ctx),
                Phase::Gap => self.begin_burst(ctx.now()),
            },
            Resume::Interrupted(Signal::Grant) => {
                let now = ctx.now();
                debug_assert!(self.outstanding > 0, "Grant without an outstanding request");
                self.outstanding = self.outstanding.saturating_sub(1);
                self.completed_bytes += self.params.burst_size;
                aux::debug(
                    now,
                    &self.name,
                    &format!(
                        "Grant received (outstanding: {} out of {})",
                        self.outstanding, self.params.outstanding
                    ),
                );
                self.rewait(now)
            }
            Resume::Interrupted(other) => Action::Fail(SimError::UnknownInterrupt {
                component: self.name.clone(),
                detail: other.tag().to_string(),
            }),
            other => Action::Fail(SimError::Protocol {
                component: self.name.clone(),
                detail: format!("unexpected resume: {other:?}"),
            }),
        }
    }
}

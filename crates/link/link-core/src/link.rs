use std::cell::RefCell;
use std::rc::Rc;

use crate::pack::PackState;
use crate::params::{AVAILS, LinkParams, SCOPES, Scope};

pub type SharedLink = Rc<RefCell<Link>>;

/// A decided pack-mode change. Recorded at decision time; applying it
/// `fsm_delay_cyc` later only flips the live state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: PackState,
    pub to: PackState,
    pub decided_cyc: u64,
}

/// One downgrade-evidence window: a per-cycle dequeue bitmap that starts
/// full of ones so a freshly opened window cannot immediately vote down.
struct BwWindow {
    list: Vec<u8>,
    start_cyc: u64,
    cond: bool,
}

/// Link state: pack-rate FSM, evidence counters, and run traces.
///
/// The buffer itself lives in the scheduler as a bounded store; this struct
/// only observes its occupancy. All cycle counters are in picoseconds,
/// advancing by `cyc_step_ps` per link cycle.
pub struct Link {
    params: LinkParams,
    dummy: bool,
    cyc_step_ps: u64,
    cyc_curr: u64,
    state: PackState,
    enqueue_while_idle: bool,
    last_dequeue_cyc: Option<u64>,
    last_mark_cyc: u64,
    data_avl_cnt: [u32; 2],
    data_avl_cond: [bool; 2],
    windows: [BwWindow; 2],
    /// At most one transition is ever in flight.
    fsm_pending: Option<(u64, PackState)>,

    state_trace: Vec<PackState>,
    fullness_trace: Vec<usize>,
    transitions: Vec<Transition>,
    consumer_bw: Vec<f64>,
    consumer_quota: u64,
}

impl Link {
    pub fn new(params: LinkParams, dummy: bool) -> Self {
        let cyc_step_ps = params.cyc_step_ps();
        let window = |len: u32| BwWindow {
            list: vec![1; len as usize],
            start_cyc: 0,
            cond: false,
        };
        let short_len = params.avg_bw_cyc.short.pack4;
        let long_len = params.avg_bw_cyc.long.pack4;
        Self {
            params,
            dummy,
            cyc_step_ps,
            cyc_curr: 0,
            state: PackState::Idle,
            enqueue_while_idle: false,
            last_dequeue_cyc: None,
            last_mark_cyc: 0,
            data_avl_cnt: [0; 2],
            data_avl_cond: [false; 2],
            windows: [window(short_len), window(long_len)],
            fsm_pending: None,
            state_trace: Vec::new(),
            fullness_trace: Vec::new(),
            transitions: Vec::new(),
            consumer_bw: Vec::new(),
            consumer_quota: 0,
        }
    }

    pub fn new_shared(params: LinkParams, dummy: bool) -> SharedLink {
        Rc::new(RefCell::new(Self::new(params, dummy)))
    }

    pub fn params(&self) -> &LinkParams {
        &self.params
    }

    pub fn is_dummy(&self) -> bool {
        self.dummy
    }

    pub fn state(&self) -> PackState {
        self.state
    }

    pub fn cyc_curr(&self) -> u64 {
        self.cyc_curr
    }

    pub fn cyc_step_ps(&self) -> u64 {
        self.cyc_step_ps
    }

    pub fn pending(&self) -> Option<(u64, PackState)> {
        self.fsm_pending
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn state_trace(&self) -> &[PackState] {
        &self.state_trace
    }

    pub fn fullness_trace(&self) -> &[usize] {
        &self.fullness_trace
    }

    pub fn consumer_bw(&self) -> &[f64] {
        &self.consumer_bw
    }

    pub fn consumer_quota(&self) -> u64 {
        self.consumer_quota
    }

    /// One link cycle: refresh the upscale and downgrade evidence, apply or
    /// evaluate a transition, and sample the traces.
    pub fn cycle_tick(&mut self, buffer_len: usize, now_ps: f64) {
        // Upscale evidence: occupancy must hold the per-channel threshold
        // for the configured consecutive cycle count.
        for avail in AVAILS {
            let i = avail.idx();
            self.data_avl_cond[i] = false;
            if self.state != PackState::Pack4 {
                if buffer_len as u32 >= self.params.data_avl_trns_num.get(avail) {
                    self.data_avl_cnt[i] += 1;
                } else {
                    self.data_avl_cnt[i] = 0;
                }
                if self.data_avl_cnt[i] >= self.params.data_avl_cyc.get(avail) {
                    self.data_avl_cond[i] = true;
                    self.data_avl_cnt[i] = 0;
                }
            }
        }

        // Downgrade evidence: per-cycle dequeue bitmap over two windows.
        for scope in SCOPES {
            let i = scope.idx();
            self.windows[i].cond = false;
            let win_cyc = self.cyc_curr - self.windows[i].start_cyc;
            if (win_cyc as usize) < self.windows[i].list.len() {
                let hit = self.last_dequeue_cyc == Some(self.cyc_curr);
                self.windows[i].list[win_cyc as usize] = u8::from(hit);
            }
            if self.state != PackState::Idle {
                if win_cyc >= u64::from(self.params.avg_bw_cyc.get(scope).get(self.state)) {
                    self.reset_window(scope, now_ps);
                } else if win_cyc > 0 {
                    let ones: u32 = self.windows[i].list.iter().map(|&b| u32::from(b)).sum();
                    self.windows[i].cond =
                        ones < self.params.avg_bw_trns.get(scope).get(self.state);
                }
            }
        }

        if let Some((apply_cyc, new_state)) = self.fsm_pending {
            // A pending transition blocks any new evaluation.
            if apply_cyc <= self.cyc_curr {
                let old_state = self.state;
                self.state = new_state;
                self.fsm_pending = None;
                for scope in SCOPES {
                    self.reset_window(scope, now_ps);
                }
                tracing::debug!("time={now_ps}ps - Link FSM Update: {old_state} --> {new_state}");
            }
        } else {
            let upscale = self.data_avl_cond[0] || self.data_avl_cond[1];
            let downgrade = self.windows[0].cond && self.windows[1].cond && !upscale;

            let mut new_state = self.state;
            match self.state {
                PackState::Idle => {
                    let pending_enqueue = self.enqueue_while_idle;
                    self.enqueue_while_idle = false;
                    if buffer_len > 0 || pending_enqueue {
                        new_state = if self.params.highperf {
                            PackState::Pack4
                        } else {
                            PackState::Pack1
                        };
                    }
                }
                PackState::Pack1 => {
                    if upscale {
                        new_state = if self.params.highperf {
                            PackState::Pack4
                        } else {
                            PackState::Pack2
                        };
                    } else if downgrade {
                        new_state = PackState::Idle;
                    }
                }
                PackState::Pack2 => {
                    if upscale {
                        new_state = PackState::Pack4;
                    } else if downgrade {
                        new_state = PackState::Pack1;
                    }
                }
                PackState::Pack4 => {
                    if downgrade {
                        new_state = PackState::Pack2;
                    }
                }
            }

            if new_state != self.state {
                self.transitions.push(Transition {
                    from: self.state,
                    to: new_state,
                    decided_cyc: self.cyc_curr,
                });
                self.fsm_pending = Some((self.cyc_curr + self.params.fsm_delay_cyc, new_state));
            }
        }

        // The bypass reference link keeps no state/fullness traces.
        if !self.dummy {
            self.state_trace.push(self.state);
            self.fullness_trace.push(buffer_len);
        }

        self.cyc_curr += self.cyc_step_ps;
    }

    /// Closes a window: flush the bandwidth snapshot to the debug log, clear
    /// the condition, and refill the bitmap with ones for the current state.
    fn reset_window(&mut self, scope: Scope, now_ps: f64) {
        let i = scope.idx();
        let win_cyc = self.cyc_curr - self.windows[i].start_cyc;
        if win_cyc == 0 {
            return;
        }
        let ones: u32 = self.windows[i].list.iter().map(|&b| u32::from(b)).sum();
        let bw_gbps = (1e3 / 8.0) * f64::from(ones) / (win_cyc as f64 * self.cyc_step_ps as f64);
        self.windows[i].start_cyc = self.cyc_curr;
        self.windows[i].cond = false;
        self.last_dequeue_cyc = None;
        if self.state != PackState::Idle {
            let len = self.params.avg_bw_cyc.get(scope).get(self.state) as usize;
            self.windows[i].list = vec![1; len];
        }
        tracing::debug!(
            "time={now_ps}ps - Link AvgBW {} Reset, BW={bw_gbps:.2}GBps",
            scope.label()
        );
    }

    /// Per-item drain interval for the current pack mode, in picoseconds.
    /// IDLE paces like 4PACK; the consumer separately refuses to drain while
    /// idle unless this is the bypass link.
    pub fn can_dequeue_ps(&self) -> f64 {
        let rate_gbps = match self.state {
            PackState::Pack1 => self.params.avg_bw_gbps.pack1,
            PackState::Pack2 => self.params.avg_bw_gbps.pack2,
            PackState::Pack4 | PackState::Idle => self.params.avg_bw_gbps.pack4,
        };
        (1e3 / 8.0) / rate_gbps
    }

    /// Producer-side bookkeeping once a put completes.
    pub fn note_enqueue(&mut self, value: u64, buffer_len: usize, now_ps: f64) {
        if self.state == PackState::Idle {
            self.enqueue_while_idle = true;
        }
        tracing::debug!(
            "time={now_ps}ps - Link enqueue: cyc={}, data={value}, capacity={buffer_len}, \
             data_avl_1={}, data_avl_2={}, avg_bw_long={}, avg_bw_short={}, state={}",
            self.cyc_curr,
            self.data_avl_cond[0],
            self.data_avl_cond[1],
            self.windows[Scope::Long.idx()].cond,
            self.windows[Scope::Short.idx()].cond,
            self.state
        );
    }

    /// Consumer-side bookkeeping at the instant a dequeue is initiated.
    pub fn note_dequeue_start(&mut self) {
        self.last_dequeue_cyc = Some(self.cyc_curr);
    }

    /// Records the instantaneous consumer rate, back-filling one sample per
    /// elapsed cycle since the previous mark.
    pub fn mark_rate(&mut self, rate_gbps: f64) {
        self.consumer_quota += 1;
        let gap = self.cyc_curr - self.last_mark_cyc;
        for _ in 0..gap {
            self.consumer_bw.push(rate_gbps);
        }
        self.last_mark_cyc = self.cyc_curr;
    }
}

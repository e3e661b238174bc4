use crate::pack::PackState;

/// Per-pack-state value table. IDLE rows do not exist: the FSM never
/// consults a table while idle, and window sizing falls back to the 4PACK
/// column by construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateTable<T> {
    pub pack1: T,
    pub pack2: T,
    pub pack4: T,
}

impl<T: Copy> StateTable<T> {
    pub fn get(&self, state: PackState) -> T {
        match state {
            PackState::Pack1 => self.pack1,
            PackState::Pack2 => self.pack2,
            // IDLE sizes like 4PACK; only reachable from window refills.
            PackState::Pack4 | PackState::Idle => self.pack4,
        }
    }
}

/// Short/long observation scope pair for the downgrade windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Short,
    Long,
}

pub const SCOPES: [Scope; 2] = [Scope::Short, Scope::Long];

impl Scope {
    pub fn idx(self) -> usize {
        match self {
            Scope::Short => 0,
            Scope::Long => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scope::Short => "short",
            Scope::Long => "long",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScopePair<T> {
    pub short: T,
    pub long: T,
}

impl<T: Copy> ScopePair<T> {
    pub fn get(&self, scope: Scope) -> T {
        match scope {
            Scope::Short => self.short,
            Scope::Long => self.long,
        }
    }
}

/// The two data-availability evidence channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Avail {
    Avl1,
    Avl2,
}

pub const AVAILS: [Avail; 2] = [Avail::Avl1, Avail::Avl2];

impl Avail {
    pub fn idx(self) -> usize {
        match self {
            Avail::Avl1 => 0,
            Avail::Avl2 => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AvailPair<T> {
    pub avl1: T,
    pub avl2: T,
}

impl<T: Copy> AvailPair<T> {
    pub fn get(&self, avail: Avail) -> T {
        match avail {
            Avail::Avl1 => self.avl1,
            Avail::Avl2 => self.avl2,
        }
    }
}

/// Link and FSM parameters.
#[derive(Clone, Debug)]
pub struct LinkParams {
    pub freq_ghz: f64,
    pub buffer_size: usize,
    /// Drain rate per pack mode, GB/s.
    pub avg_bw_gbps: StateTable<f64>,
    /// Downgrade threshold: dequeues per window, per scope per state.
    pub avg_bw_trns: ScopePair<StateTable<u32>>,
    /// Downgrade window length, per scope per state.
    pub avg_bw_cyc: ScopePair<StateTable<u32>>,
    /// Buffer occupancy an availability channel requires.
    pub data_avl_trns_num: AvailPair<u32>,
    /// Consecutive cycles the occupancy must hold.
    pub data_avl_cyc: AvailPair<u32>,
    /// Control-plane latency between a transition decision and its apply.
    pub fsm_delay_cyc: u64,
    /// Skip intermediate pack modes when upscaling.
    pub highperf: bool,
}

impl LinkParams {
    /// Simulated picoseconds per link cycle. Clamped to at least one so a
    /// sub-picosecond configuration cannot stall the clock.
    pub fn cyc_step_ps(&self) -> u64 {
        ((1e3 / self.freq_ghz) as u64).max(1)
    }
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            freq_ghz: 1000.0,
            buffer_size: 50,
            avg_bw_gbps: StateTable { pack1: 64.0 / 4.0, pack2: 64.0 / 2.0, pack4: 64.0 },
            avg_bw_trns: ScopePair {
                short: StateTable { pack1: 4, pack2: 4, pack4: 4 },
                long: StateTable { pack1: 10, pack2: 10, pack4: 10 },
            },
            avg_bw_cyc: ScopePair {
                short: StateTable { pack1: 4, pack2: 15, pack4: 25 },
                long: StateTable { pack1: 60, pack2: 60, pack4: 60 },
            },
            data_avl_trns_num: AvailPair { avl1: 5, avl2: 20 },
            data_avl_cyc: AvailPair { avl1: 15, avl2: 2 },
            fsm_delay_cyc: 35,
            highperf: true,
        }
    }
}

/// Producer traffic shape: square-wave bursts over a normal idle baseline.
#[derive(Clone, Copy, Debug)]
pub struct ProducerParams {
    pub idle_ps_mean: f64,
    pub idle_ps_std: f64,
    /// Burst window length in ps; zero disables the square wave.
    pub window: u64,
    /// Fraction of the window spent transmitting; zero silences the producer.
    pub utilization: f64,
}

impl Default for ProducerParams {
    fn default() -> Self {
        Self {
            idle_ps_mean: 4.0,
            idle_ps_std: 0.05,
            window: 1200,
            utilization: 0.7,
        }
    }
}

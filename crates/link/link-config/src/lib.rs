//! `link-config`: command line of the link simulator.
//!
//! Flag names use underscores (`--debug_en`, `--avg_bw_trns_short=4;4;4`)
//! and `;`-separated tuples. Parse failures exit with status 2, `-h` prints
//! usage and exits 0 (both are clap's defaults).

#![forbid(unsafe_code)]

use clap::Parser;
use link_core::{AvailPair, LinkParams, ProducerParams, ScopePair, StateTable};

/// Which links to instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Gated link and bypass reference side by side.
    Both,
    /// Bypass reference only.
    Bypass,
    /// Gated link only.
    NonBypass,
}

#[derive(Parser, Debug)]
#[command(name = "link-sim", about = "Link unit-level simulation for early uarch exploration")]
pub struct LinkCli {
    /// Simulation duration in nanoseconds
    #[arg(short = 's', value_name = "SIM_DURATION_NS", default_value_t = 2.5)]
    pub sim_duration_ns: f64,

    /// Enable per-event debug lines
    #[arg(long = "debug_en")]
    pub debug_en: bool,

    /// Write the run traces to link_result.csv
    #[arg(long = "plots_en")]
    pub plots_en: bool,

    /// 0 = Both, 1 = Bypass, 2 = NonBypass
    #[arg(long = "run_mode", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub run_mode: u8,

    /// Producer idle gap distribution, ps
    #[arg(long = "producer_idle_ps", value_name = "MEAN;STD", default_value = "4;0.05",
          value_parser = parse_mean_std)]
    pub producer_idle_ps: (f64, f64),

    /// Producer square-wave burst shape
    #[arg(long = "producer_burst", value_name = "WINDOW;UTILIZATION", default_value = "1200;0.7",
          value_parser = parse_burst)]
    pub producer_burst: (u64, f64),

    #[arg(long = "freq_ghz", default_value_t = 1000.0)]
    pub freq_ghz: f64,

    #[arg(long = "buffer_size", default_value_t = 50)]
    pub buffer_size: usize,

    #[arg(long = "avg_bw_1_gbps", default_value_t = 16.0)]
    pub avg_bw_1_gbps: f64,

    #[arg(long = "avg_bw_2_gbps", default_value_t = 32.0)]
    pub avg_bw_2_gbps: f64,

    #[arg(long = "avg_bw_4_gbps", default_value_t = 64.0)]
    pub avg_bw_4_gbps: f64,

    /// Downgrade thresholds per state, short window
    #[arg(long = "avg_bw_trns_short", value_name = "V1;V2;V4", default_value = "4;4;4",
          value_parser = parse_triplet)]
    pub avg_bw_trns_short: (u32, u32, u32),

    /// Downgrade thresholds per state, long window
    #[arg(long = "avg_bw_trns_long", value_name = "V1;V2;V4", default_value = "10;10;10",
          value_parser = parse_triplet)]
    pub avg_bw_trns_long: (u32, u32, u32),

    /// Window lengths per state, short window
    #[arg(long = "avg_bw_cyc_short", value_name = "V1;V2;V4", default_value = "4;15;25",
          value_parser = parse_triplet)]
    pub avg_bw_cyc_short: (u32, u32, u32),

    /// Window lengths per state, long window
    #[arg(long = "avg_bw_cyc_long", value_name = "V1;V2;V4", default_value = "60;60;60",
          value_parser = parse_triplet)]
    pub avg_bw_cyc_long: (u32, u32, u32),

    #[arg(long = "data_avl_1_trns_num", default_value_t = 5)]
    pub data_avl_1_trns_num: u32,

    #[arg(long = "data_avl_2_trns_num", default_value_t = 20)]
    pub data_avl_2_trns_num: u32,

    #[arg(long = "data_avl_1_cyc", default_value_t = 15)]
    pub data_avl_1_cyc: u32,

    #[arg(long = "data_avl_2_cyc", default_value_t = 2)]
    pub data_avl_2_cyc: u32,

    #[arg(long = "fsm_delay_cyc", default_value_t = 35)]
    pub fsm_delay_cyc: u64,

    /// 1 upscales straight to 4PACK, 0 steps through the pack modes
    #[arg(long = "fsm_highperf_mode", default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub fsm_highperf_mode: u8,

    /// RNG seed; identical seeds reproduce a run bit for bit
    #[arg(long = "seed", default_value_t = 1)]
    pub seed: u64,
}

fn parse_mean_std(s: &str) -> Result<(f64, f64), String> {
    let (mean, std) = s
        .split_once(';')
        .ok_or_else(|| format!("expected MEAN;STD, got '{s}'"))?;
    Ok((
        mean.trim().parse().map_err(|e| format!("bad mean '{mean}': {e}"))?,
        std.trim().parse().map_err(|e| format!("bad std '{std}': {e}"))?,
    ))
}

fn parse_burst(s: &str) -> Result<(u64, f64), String> {
    let (window, utilization) = s
        .split_once(';')
        .ok_or_else(|| format!("expected WINDOW;UTILIZATION, got '{s}'"))?;
    Ok((
        window.trim().parse().map_err(|e| format!("bad window '{window}': {e}"))?,
        utilization
            .trim()
            .parse()
            .map_err(|e| format!("bad utilization '{utilization}': {e}"))?,
    ))
}

fn parse_triplet(s: &str) -> Result<(u32, u32, u32), String> {
    let parts: Vec<&str> = s.split(';').collect();
    if parts.len() != 3 {
        return Err(format!("expected V1;V2;V4, got '{s}'"));
    }
    let parse = |p: &str| p.trim().parse::<u32>().map_err(|e| format!("bad value '{p}': {e}"));
    Ok((parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
}

impl LinkCli {
    pub fn run_mode(&self) -> RunMode {
        match self.run_mode {
            0 => RunMode::Both,
            1 => RunMode::Bypass,
            _ => RunMode::NonBypass,
        }
    }

    pub fn sim_duration_ps(&self) -> f64 {
        self.sim_duration_ns * 1e3
    }

    pub fn link_params(&self) -> LinkParams {
        let table = |(v1, v2, v4): (u32, u32, u32)| StateTable { pack1: v1, pack2: v2, pack4: v4 };
        LinkParams {
            freq_ghz: self.freq_ghz,
            buffer_size: self.buffer_size,
            avg_bw_gbps: StateTable {
                pack1: self.avg_bw_1_gbps,
                pack2: self.avg_bw_2_gbps,
                pack4: self.avg_bw_4_gbps,
            },
            avg_bw_trns: ScopePair {
                short: table(self.avg_bw_trns_short),
                long: table(self.avg_bw_trns_long),
            },
            avg_bw_cyc: ScopePair {
                short: table(self.avg_bw_cyc_short),
                long: table(self.avg_bw_cyc_long),
            },
            data_avl_trns_num: AvailPair {
                avl1: self.data_avl_1_trns_num,
                avl2: self.data_avl_2_trns_num,
            },
            data_avl_cyc: AvailPair { avl1: self.data_avl_1_cyc, avl2: self.data_avl_2_cyc },
            fsm_delay_cyc: self.fsm_delay_cyc,
            highperf: self.fsm_highperf_mode != 0,
        }
    }

    pub fn producer_params(&self) -> ProducerParams {
        ProducerParams {
            idle_ps_mean: self.producer_idle_ps.0,
            idle_ps_std: self.producer_idle_ps.1,
            window: self.producer_burst.0,
            utilization: self.producer_burst.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_setup() {
        let cli = LinkCli::try_parse_from(["link-sim"]).unwrap();
        assert_eq!(cli.sim_duration_ns, 2.5);
        assert_eq!(cli.run_mode(), RunMode::Both);
        let params = cli.link_params();
        assert_eq!(params.buffer_size, 50);
        assert_eq!(params.avg_bw_gbps.pack4, 64.0);
        assert_eq!(params.avg_bw_cyc.short.pack2, 15);
        assert_eq!(params.data_avl_trns_num.avl2, 20);
        assert!(params.highperf);
        let producer = cli.producer_params();
        assert_eq!(producer.window, 1200);
        assert_eq!(producer.utilization, 0.7);
    }

    #[test]
    fn tuples_parse_from_semicolon_lists() {
        let cli = LinkCli::try_parse_from([
            "link-sim",
            "-s",
            "10",
            "--run_mode",
            "2",
            "--producer_idle_ps=2;0.1",
            "--avg_bw_cyc_long=30;40;50",
            "--fsm_highperf_mode=0",
        ])
        .unwrap();
        assert_eq!(cli.sim_duration_ns, 10.0);
        assert_eq!(cli.run_mode(), RunMode::NonBypass);
        assert_eq!(cli.producer_idle_ps, (2.0, 0.1));
        let params = cli.link_params();
        assert_eq!(params.avg_bw_cyc.long.pack1, 30);
        assert_eq!(params.avg_bw_cyc.long.pack2, 40);
        assert_eq!(params.avg_bw_cyc.long.pack4, 50);
        assert!(!params.highperf);
    }

    #[test]
    fn malformed_triplet_is_rejected() {
        assert!(LinkCli::try_parse_from(["link-sim", "--avg_bw_trns_short=4;4"]).is_err());
        assert!(LinkCli::try_parse_from(["link-sim", "--avg_bw_trns_short=a;b;c"]).is_err());
    }

    #[test]
    fn run_mode_out_of_range_is_rejected() {
        assert!(LinkCli::try_parse_from(["link-sim", "--run_mode", "3"]).is_err());
    }
}

//! End-of-run summary: achieved-bandwidth histograms, state occupancy with
//! normalized power, fullness histogram, and the optional CSV trace dump.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use bedrock_stats::BinnedHistogram;
use link_core::{Link, LinkParams, PackState, ProducerParams};
use tracing::info;

const HIST_BINS: usize = 10;

pub fn print_params(link: &LinkParams, producer: &ProducerParams) {
    info!("");
    info!("Link Parameters:");
    info!("  freq_ghz = {}", link.freq_ghz);
    info!("  buffer_size = {}", link.buffer_size);
    info!(
        "  avg_bw_gbps = 1PACK:{} 2PACK:{} 4PACK:{}",
        link.avg_bw_gbps.pack1, link.avg_bw_gbps.pack2, link.avg_bw_gbps.pack4
    );
    info!(
        "  avg_bw_trns = short:{:?} long:{:?}",
        (link.avg_bw_trns.short.pack1, link.avg_bw_trns.short.pack2, link.avg_bw_trns.short.pack4),
        (link.avg_bw_trns.long.pack1, link.avg_bw_trns.long.pack2, link.avg_bw_trns.long.pack4)
    );
    info!(
        "  avg_bw_cyc = short:{:?} long:{:?}",
        (link.avg_bw_cyc.short.pack1, link.avg_bw_cyc.short.pack2, link.avg_bw_cyc.short.pack4),
        (link.avg_bw_cyc.long.pack1, link.avg_bw_cyc.long.pack2, link.avg_bw_cyc.long.pack4)
    );
    info!(
        "  data_avl_trns_num = avl1:{} avl2:{}",
        link.data_avl_trns_num.avl1, link.data_avl_trns_num.avl2
    );
    info!("  data_avl_cyc = avl1:{} avl2:{}", link.data_avl_cyc.avl1, link.data_avl_cyc.avl2);
    info!("  fsm_delay_cyc = {}", link.fsm_delay_cyc);
    info!("  fsm_highperf_mode = {}", link.highperf);
    info!("");
    info!("Producer Parameters:");
    info!("  idle_ps_mean = {}", producer.idle_ps_mean);
    info!("  idle_ps_std = {}", producer.idle_ps_std);
    info!("  window = {}", producer.window);
    info!("  utilization = {}", producer.utilization);
}

pub fn print_demanded_bw(producer: &ProducerParams) {
    let mean_bw = (1e3 / 8.0) / producer.idle_ps_mean * producer.utilization;
    info!("");
    info!("Producer Demanded BW:");
    info!(
        "   Idle~N({:.2}ps,{:.2}) --> MeanBW={:.2}GB/s  ( = (1e3/8.0)/{:.2} x {:.2} )",
        producer.idle_ps_mean,
        producer.idle_ps_std,
        mean_bw,
        producer.idle_ps_mean,
        producer.utilization
    );
}

pub fn print_consumer_bw(link: &Link, label: &str) {
    info!("");
    info!("{label}:");
    if let Some(hist) = BinnedHistogram::from_samples(link.consumer_bw(), HIST_BINS) {
        for (edge, count) in hist.edges.iter().zip(&hist.counts) {
            info!("   {edge:.2} GB/s --> x {count}");
        }
        info!("   Mean = {:.2} GB/s", hist.weighted_mean());
    }
    info!("   Quota = {} bits", link.consumer_quota());
}

pub fn state_occupancy(link: &Link) -> BTreeMap<PackState, u64> {
    let mut occupancy = BTreeMap::new();
    for &state in link.state_trace() {
        *occupancy.entry(state).or_insert(0u64) += 1;
    }
    occupancy
}

/// Cycle-normalized power estimate: dwell cycles weighted by the pack width
/// plus, per upscale transition, the control-plane delay charged at the
/// destination width.
pub fn normalized_power(link: &Link) -> Option<(f64, u64, u64)> {
    let occupancy = state_occupancy(link);
    let power_time: u64 = occupancy.values().sum();
    if power_time == 0 {
        return None;
    }
    let mut power_sum: u64 = occupancy
        .iter()
        .map(|(state, freq)| state.power_weight() * freq)
        .sum();
    for transition in link.transitions() {
        if transition.to > transition.from {
            power_sum += link.params().fsm_delay_cyc * transition.to.power_weight();
        }
    }
    Some((power_sum as f64 / power_time as f64, power_sum, power_time))
}

pub fn print_link_report(link: &Link) {
    info!("Link State Histogram:");
    for (state, freq) in state_occupancy(link) {
        info!("   {state} --> x {freq}");
    }
    info!("   SWT --> x {}", link.transitions().len());
    info!("");

    if let Some((normed, sum, time)) = normalized_power(link) {
        info!("Normalized Power = {normed:.2} (={sum}/{time})");
        info!("");
    }

    let fullness: Vec<f64> = link.fullness_trace().iter().map(|&f| f as f64).collect();
    info!("Link Buffer Fullness Histogram:");
    if let Some(hist) = BinnedHistogram::from_samples(&fullness, HIST_BINS) {
        for (edge, count) in hist.edges.iter().zip(&hist.counts) {
            info!("   {} --> x {count}", edge.round() as u64);
        }
        info!("   Mean = {:.2}", hist.weighted_mean());
    }
    info!("");
}

/// Dumps the per-cycle traces for offline plotting.
pub fn write_traces(path: impl AsRef<Path>, link: &Link) -> std::io::Result<()> {
    let mut out = std::fs::File::create(path)?;
    writeln!(out, "cycle,state,fullness,consumer_bw_gbps")?;
    let states = link.state_trace();
    let fullness = link.fullness_trace();
    let bw = link.consumer_bw();
    let rows = states.len().max(bw.len());
    for i in 0..rows {
        let state = states.get(i).map(|s| s.to_string()).unwrap_or_default();
        let fill = fullness.get(i).map(|f| f.to_string()).unwrap_or_default();
        let rate = bw.get(i).map(|r| format!("{r:.4}")).unwrap_or_default();
        writeln!(out, "{i},{state},{fill},{rate}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_counts_dwell_and_upscale_transitions() {
        let params = LinkParams { fsm_delay_cyc: 10, highperf: true, ..LinkParams::default() };
        let mut link = Link::new(params, false);
        // Non-empty buffer: IDLE -> 4PACK decided on the first cycle and
        // applied ten cycles later; dwell cycles split between the states.
        for _ in 0..40 {
            let now = link.cyc_curr() as f64;
            link.cycle_tick(6, now);
        }
        let (normed, sum, time) = normalized_power(&link).unwrap();
        assert_eq!(time, 40);
        let occupancy = state_occupancy(&link);
        let idle = occupancy.get(&PackState::Idle).copied().unwrap_or(0);
        let pack4 = occupancy.get(&PackState::Pack4).copied().unwrap_or(0);
        assert_eq!(idle + pack4, 40);
        // dwell power + one IDLE->4PACK upscale charged at delay x 4.
        assert_eq!(sum, pack4 * 4 + 10 * 4);
        assert!(normed > 0.0);
    }

    #[test]
    fn empty_trace_has_no_power_figure() {
        let link = Link::new(LinkParams::default(), true);
        assert!(normalized_power(&link).is_none());
    }
}

//! Write-only analytics sinks.
//!
//! Components push one sample per tick while active; nothing in the
//! simulation ever reads a series back, so recording cannot perturb the
//! run. `Network::report` collects everything into a serializable
//! `Report` for offline plotting.

use serde::Serialize;

/// One point of a time series.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Sample {
    pub t_ms: u64,
    pub value: f64,
}

/// Per-flow series: congestion window (packets) and send rate (Mbps over
/// the tick).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowSeries {
    pub window_pkts: Vec<Sample>,
    pub rate_mbps: Vec<Sample>,
}

impl FlowSeries {
    pub fn push_window(&mut self, t_ms: u64, value: f64) {
        self.window_pkts.push(Sample { t_ms, value });
    }

    pub fn push_rate(&mut self, t_ms: u64, value: f64) {
        self.rate_mbps.push(Sample { t_ms, value });
    }
}

/// Per-link series: buffer occupancy per side (bits, scaled per second),
/// throughput (Mbps) and cumulative drops.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkSeries {
    pub left_occupancy: Vec<Sample>,
    pub right_occupancy: Vec<Sample>,
    pub throughput_mbps: Vec<Sample>,
    pub drops: Vec<Sample>,
}

impl LinkSeries {
    pub fn push_left_occupancy(&mut self, t_ms: u64, value: f64) {
        self.left_occupancy.push(Sample { t_ms, value });
    }

    pub fn push_right_occupancy(&mut self, t_ms: u64, value: f64) {
        self.right_occupancy.push(Sample { t_ms, value });
    }

    pub fn push_throughput(&mut self, t_ms: u64, value: f64) {
        self.throughput_mbps.push(Sample { t_ms, value });
    }

    pub fn push_drops(&mut self, t_ms: u64, value: f64) {
        self.drops.push(Sample { t_ms, value });
    }
}

#[derive(Debug, Serialize)]
pub struct FlowReport {
    pub flow_id: u64,
    /// None while the flow is still in progress.
    pub completed_at_ms: Option<u64>,
    pub series: FlowSeries,
}

#[derive(Debug, Serialize)]
pub struct LinkReport {
    pub link_id: usize,
    pub series: LinkSeries,
}

/// Everything the simulation recorded, ready for `serde_json`.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub flows: Vec<FlowReport>,
    pub links: Vec<LinkReport>,
}

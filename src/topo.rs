//! 常用拓扑构建
//!
//! 给 bin 文件和测试用的两种最小拓扑：点对点单链路，
//! 以及经一台直通路由器相连的两段链路。

use crate::net::{Network, NodeId, TopologyError};
use crate::sim::SimTime;

/// 点对点拓扑配置选项
#[derive(Debug, Clone)]
pub struct PointToPointOpts {
    /// 链路速率（bits/ms）
    pub rate_bpms: u64,
    /// 单向传播时延
    pub delay: SimTime,
    /// 每侧缓冲容量（bits）
    pub buffer_bits: u64,
}

impl Default for PointToPointOpts {
    fn default() -> Self {
        Self {
            rate_bpms: 80,
            delay: SimTime(10),
            buffer_bits: 65_536,
        }
    }
}

/// 构建点对点拓扑：h0 <-> h1，单链路。
/// 返回 (源主机, 目的主机)。
pub fn point_to_point(
    net: &mut Network,
    opts: &PointToPointOpts,
) -> Result<(NodeId, NodeId), TopologyError> {
    let h0 = net.add_host("h0");
    let h1 = net.add_host("h1");
    net.connect(h0, h1, opts.rate_bpms, opts.delay, opts.buffer_bits)?;
    Ok((h0, h1))
}

/// 构建链式拓扑：h0 <-> r0 <-> h1，两段链路共用一台直通路由器。
/// 返回 (源主机, 目的主机)。
pub fn chain(
    net: &mut Network,
    opts: &PointToPointOpts,
) -> Result<(NodeId, NodeId), TopologyError> {
    let h0 = net.add_host("h0");
    let h1 = net.add_host("h1");
    let r0 = net.add_router("r0");
    net.connect(h0, r0, opts.rate_bpms, opts.delay, opts.buffer_bits)?;
    net.connect(r0, h1, opts.rate_bpms, opts.delay, opts.buffer_bits)?;
    Ok((h0, h1))
}

//! 拥塞控制器状态
//!
//! 每条活动流一份：滑动窗口计数、未确认集合、RTT 统计与 RENO/FAST 的窗口规则。
//! 重传动作本身（清缓冲、重新入队）发生在主机侧，这里只做窗口与统计的核算。

use std::collections::BTreeMap;

use super::Protocol;
use crate::sim::SimTime;

/// 初始拥塞窗口（包数）
pub const INIT_CWND: u64 = 1;
/// 重传定时器长度（毫秒）。固定值；EWMA 推导的超时未启用。
pub const INIT_TIMEOUT_MS: u64 = 3000;
/// RTT 指数加权平均的平滑因子
pub const RTT_EWMA_ALPHA: f64 = 0.1;
/// 触发快速重传的重复 ACK 数
pub const DUP_ACK_THRESHOLD: u32 = 3;
/// FAST 窗口更新的步进因子
pub const FAST_GAMMA: f64 = 0.5;
/// FAST 均衡项（目标在途包数）
pub const FAST_ALPHA: f64 = 10.0;

/// 单条流的拥塞控制状态。
///
/// 不变量：`cwnd >= 1`；`window_occupied <= cwnd`（窗口收缩瞬间除外）；
/// `send_times` 的键恰为当前未被累计确认的数据包 id。
#[derive(Debug, Clone)]
pub struct ControllerState {
    /// 拥塞窗口（包数）
    pub cwnd: u64,
    /// 拥塞避免阶段累计的 1/cwnd 份额
    pub partial_cwnd: u64,
    /// 慢启动阈值
    pub ssthresh: u64,
    pub slow_start: bool,
    /// 快速重传后等待窗口收缩（FR/FR 出口在下一次填窗时执行）
    pub awaiting_retransmit: bool,
    pub dup_ack_count: u32,
    pub most_recent_retransmitted: Option<u64>,
    /// 最近一次进入链路缓冲的数据包 id；填窗从它的下一个开始
    pub most_recent_queued: Option<u64>,
    /// 当前窗口占用的槽数
    pub window_occupied: u64,
    /// 未确认数据包 id -> 发送时刻
    pub send_times: BTreeMap<u64, SimTime>,
    pub rtt_min: Option<u64>,
    pub rtt_avg: Option<f64>,
    pub rtt_stddev: Option<f64>,
    /// 重传定时器长度
    pub timeout: SimTime,
}

impl Default for ControllerState {
    fn default() -> Self {
        ControllerState {
            cwnd: INIT_CWND,
            partial_cwnd: 0,
            ssthresh: u64::MAX,
            slow_start: true,
            awaiting_retransmit: false,
            dup_ack_count: 0,
            most_recent_retransmitted: None,
            most_recent_queued: None,
            window_occupied: 0,
            send_times: BTreeMap::new(),
            rtt_min: None,
            rtt_avg: None,
            rtt_stddev: None,
            timeout: SimTime(INIT_TIMEOUT_MS),
        }
    }
}

impl ControllerState {
    /// 新的 RTT 样本：更新最小值与 EWMA 均值/偏差。
    /// FAST 协议在这条路径上执行窗口均衡更新。
    pub fn on_rtt_sample(&mut self, rtt_ms: u64, protocol: Protocol) {
        self.rtt_min = Some(match self.rtt_min {
            Some(m) => m.min(rtt_ms),
            None => rtt_ms,
        });
        let r = rtt_ms as f64;
        let avg = match self.rtt_avg {
            Some(avg) => avg * (1.0 - RTT_EWMA_ALPHA) + r * RTT_EWMA_ALPHA,
            None => r,
        };
        self.rtt_avg = Some(avg);
        self.rtt_stddev = Some(match self.rtt_stddev {
            Some(sd) => sd * (1.0 - RTT_EWMA_ALPHA) + (r - avg).abs() * RTT_EWMA_ALPHA,
            None => r,
        });

        if protocol == Protocol::Fast {
            self.fast_window_update();
        }
    }

    /// FAST 均衡式更新：cwnd <- min(2*cwnd, (1-γ)*cwnd + γ*(rtt_min/rtt_avg*cwnd + α))
    fn fast_window_update(&mut self) {
        let (Some(base), Some(avg)) = (self.rtt_min, self.rtt_avg) else {
            return;
        };
        if avg <= 0.0 {
            return;
        }
        let cwnd = self.cwnd as f64;
        let target = (1.0 - FAST_GAMMA) * cwnd + FAST_GAMMA * (base as f64 / avg * cwnd + FAST_ALPHA);
        let next = target.min(2.0 * cwnd).round() as u64;
        self.cwnd = next.max(1);
    }

    /// 新的累计 ACK 到达后的窗口规则。
    pub fn on_new_ack(&mut self, protocol: Protocol) {
        if protocol != Protocol::Reno {
            // FAST 的窗口在 RTT 采样路径上更新
            return;
        }
        if self.slow_start {
            self.cwnd += 1;
            if self.cwnd > self.ssthresh {
                self.slow_start = false;
            }
        } else {
            self.partial_cwnd += 1;
            if self.partial_cwnd >= self.cwnd {
                self.cwnd += 1;
                self.partial_cwnd = 0;
            }
        }
    }

    /// RENO FR/FR 入口：第三个重复 ACK 触发。
    /// `dup_ack_count` 此刻尚未清零，膨胀量取当前计数。
    pub fn enter_fast_recovery(&mut self) {
        self.ssthresh = (self.cwnd / 2).max(2);
        self.cwnd = self.ssthresh + self.dup_ack_count as u64;
        self.slow_start = false;
        self.awaiting_retransmit = true;
    }

    /// FR/FR 出口：下一次填窗时把窗口收缩回 ssthresh。
    pub fn deflate_if_awaiting(&mut self) {
        if self.awaiting_retransmit {
            self.cwnd = self.ssthresh;
            self.awaiting_retransmit = false;
        }
    }
}

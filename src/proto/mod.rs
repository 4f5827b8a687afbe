//! 拥塞控制协议
//!
//! 目标：支持两种窗口控制方式：
//! - RENO：慢启动 + AIMD 拥塞避免，含 3 dupACK 快速重传与 FR/FR 窗口膨胀/收缩
//! - FAST：基于时延的均衡式窗口更新（在 RTT 采样路径上执行），
//!   快速重传机制共用，但不做 ssthresh/cwnd 手术
//!
//! 状态机本身由 `ControllerState` 承载，归属发送端主机的活动流。

mod controller;

pub use controller::{
    ControllerState, DUP_ACK_THRESHOLD, FAST_ALPHA, FAST_GAMMA, INIT_CWND, INIT_TIMEOUT_MS,
    RTT_EWMA_ALPHA,
};

use serde::{Deserialize, Serialize};

/// 拥塞控制协议选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Reno,
    Fast,
}

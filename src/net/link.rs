//! 链路类型
//!
//! 链路不只是物理线路：两端各带一个有限容量的 FIFO 缓冲区，
//! 中间共享一个半双工发送槽。方向命名 LEFT/RIGHT 是任意的，
//! 同一时刻只有一个数据包占用发送槽。
//! 链路还按周期维护每个方向的排队时延估计。

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::id::{LinkId, NodeId};
use super::node::Node;
use super::packet::Packet;
use crate::analytics::LinkSeries;
use crate::sim::SimTime;

/// 排队时延估计的重算周期（毫秒）
pub const BUFFER_DELAY_PERIOD_MS: u64 = 2000;

/// 数据包在链路上的流向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 左端 -> 右端（占用左侧缓冲）
    LeftToRight,
    /// 右端 -> 左端（占用右侧缓冲）
    RightToLeft,
}

impl Direction {
    fn opposite(self) -> Direction {
        match self {
            Direction::LeftToRight => Direction::RightToLeft,
            Direction::RightToLeft => Direction::LeftToRight,
        }
    }

    fn side(self) -> usize {
        match self {
            Direction::LeftToRight => 0,
            Direction::RightToLeft => 1,
        }
    }
}

/// 缓冲区中的数据包，带入队时刻
#[derive(Debug, Clone)]
struct Queued {
    pkt: Packet,
    enqueued: SimTime,
}

/// 发送槽中的数据包
#[derive(Debug, Clone)]
struct Transmitting {
    pkt: Packet,
    dir: Direction,
    started: SimTime,
}

/// 排队时延估计器：每个周期末把两侧缓冲的平均等待时间固化为估计值。
/// 周期之间估计值保持不变。
#[derive(Debug)]
struct DelayEstimator {
    countdown_ms: i64,
    sum_ms: [f64; 2],
    count: [u64; 2],
    estimate_ms: [f64; 2],
}

impl DelayEstimator {
    fn new() -> DelayEstimator {
        DelayEstimator {
            countdown_ms: BUFFER_DELAY_PERIOD_MS as i64,
            sum_ms: [0.0; 2],
            count: [0; 2],
            estimate_ms: [0.0; 2],
        }
    }

    fn record(&mut self, dir: Direction, waited_ms: u64) {
        self.sum_ms[dir.side()] += waited_ms as f64;
        self.count[dir.side()] += 1;
    }

    fn tick(&mut self, dt_ms: u64) {
        self.countdown_ms -= dt_ms as i64;
        if self.countdown_ms <= 0 {
            self.countdown_ms = BUFFER_DELAY_PERIOD_MS as i64;
            for side in 0..2 {
                self.estimate_ms[side] = if self.count[side] == 0 {
                    0.0
                } else {
                    self.sum_ms[side] / self.count[side] as f64
                };
                self.sum_ms[side] = 0.0;
                self.count[side] = 0;
            }
        }
    }
}

/// 网络链路
#[derive(Debug)]
pub struct Link {
    id: LinkId,
    /// 链路速率（bits per millisecond）
    rate_bpms: u64,
    /// 传播时延（毫秒）
    delay: SimTime,
    /// 每侧缓冲区容量（bits）
    buffer_bits: u64,
    left: NodeId,
    right: NodeId,
    left_buf: VecDeque<Queued>,
    right_buf: VecDeque<Queued>,
    left_free_bits: u64,
    right_free_bits: u64,
    in_transit: Option<Transmitting>,
    /// 发送槽内已传输的 bit 数
    bits_transmitted: u64,
    /// 本 tick 完成发送的 bit 数
    bits_this_tick: u64,
    /// 累计丢包数
    drops: u64,
    estimator: DelayEstimator,
    pub series: LinkSeries,
}

impl Link {
    pub(crate) fn new(
        id: LinkId,
        rate_bpms: u64,
        delay: SimTime,
        buffer_bits: u64,
        left: NodeId,
        right: NodeId,
    ) -> Link {
        Link {
            id,
            rate_bpms,
            delay,
            buffer_bits,
            left,
            right,
            left_buf: VecDeque::new(),
            right_buf: VecDeque::new(),
            left_free_bits: buffer_bits,
            right_free_bits: buffer_bits,
            in_transit: None,
            bits_transmitted: 0,
            bits_this_tick: 0,
            drops: 0,
            estimator: DelayEstimator::new(),
            series: LinkSeries::default(),
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn left_node(&self) -> NodeId {
        self.left
    }

    pub fn right_node(&self) -> NodeId {
        self.right
    }

    pub fn delay(&self) -> SimTime {
        self.delay
    }

    pub fn buffer_bits(&self) -> u64 {
        self.buffer_bits
    }

    pub fn drops(&self) -> u64 {
        self.drops
    }

    pub fn free_bits(&self, dir: Direction) -> u64 {
        match dir {
            Direction::LeftToRight => self.left_free_bits,
            Direction::RightToLeft => self.right_free_bits,
        }
    }

    /// 缓冲区中待发 bit 数之和（验证容量核算用）。
    pub fn queued_bits(&self, dir: Direction) -> u64 {
        let buf = match dir {
            Direction::LeftToRight => &self.left_buf,
            Direction::RightToLeft => &self.right_buf,
        };
        buf.iter().map(|q| q.pkt.size_bits).sum()
    }

    pub(crate) fn in_transit_packet(&self) -> Option<u64> {
        self.in_transit.as_ref().map(|t| t.pkt.id)
    }

    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if node == self.left {
            Some(self.right)
        } else if node == self.right {
            Some(self.left)
        } else {
            None
        }
    }

    /// `node` 出站的流向；`node` 不是端点时返回 None。
    fn direction_from(&self, node: NodeId) -> Option<Direction> {
        if node == self.left {
            Some(Direction::LeftToRight)
        } else if node == self.right {
            Some(Direction::RightToLeft)
        } else {
            None
        }
    }

    /// 把数据包放进 `from` 一侧的缓冲区。容量不足则计一次丢包并返回 false。
    /// 丢包是唯一的拥塞信号：没有 ECN，也没有显式 NACK。
    pub fn add_packet(&mut self, pkt: Packet, from: NodeId, now: SimTime) -> bool {
        let dir = self
            .direction_from(from)
            .unwrap_or_else(|| panic!("add_packet from unconnected node {from:?}"));
        let (buf, free) = match dir {
            Direction::LeftToRight => (&mut self.left_buf, &mut self.left_free_bits),
            Direction::RightToLeft => (&mut self.right_buf, &mut self.right_free_bits),
        };
        if pkt.size_bits <= *free {
            *free -= pkt.size_bits;
            trace!(link = self.id.0, pkt = pkt.id, ?dir, free_bits = *free, "packet 入队");
            buf.push_back(Queued { pkt, enqueued: now });
            true
        } else {
            self.drops += 1;
            debug!(
                link = self.id.0,
                pkt = pkt.id,
                ?dir,
                drops = self.drops,
                "缓冲区已满，丢弃 packet"
            );
            false
        }
    }

    /// 清空 `from` 一侧的缓冲区并恢复其全部容量。
    /// 发送端在重传时调用，避免把过期的窗口内容继续发出去。
    pub fn clear_buffer(&mut self, from: NodeId) {
        let dir = self
            .direction_from(from)
            .unwrap_or_else(|| panic!("clear_buffer from unconnected node {from:?}"));
        match dir {
            Direction::LeftToRight => {
                self.left_buf.clear();
                self.left_free_bits = self.buffer_bits;
            }
            Direction::RightToLeft => {
                self.right_buf.clear();
                self.right_free_bits = self.buffer_bits;
            }
        }
        trace!(link = self.id.0, ?dir, "缓冲区已清空");
    }

    /// `node` 出站方向的时延估计：传播时延 + 对侧缓冲的排队时延估计。
    ///
    /// 对侧缓冲是历史行为：它衡量的是回程（对向）队列的拥挤程度，
    /// 而不是本端出队前的等待。
    pub fn delay_for(&self, node: NodeId) -> f64 {
        let dir = self
            .direction_from(node)
            .unwrap_or_else(|| panic!("delay_for from unconnected node {node:?}"));
        self.delay.0 as f64 + self.estimator.estimate_ms[dir.opposite().side()]
    }

    /// 选下一个进入发送槽的数据包：两侧队头中入队更早者优先，
    /// 平局取右侧。出队时记入排队时延统计并归还缓冲容量。
    fn select_next(&mut self, now: SimTime) -> Option<Transmitting> {
        let take_left = match (self.left_buf.front(), self.right_buf.front()) {
            (None, None) => return None,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(l), Some(r)) => l.enqueued.0 < r.enqueued.0,
        };
        let (buf, free, dir) = if take_left {
            (&mut self.left_buf, &mut self.left_free_bits, Direction::LeftToRight)
        } else {
            (&mut self.right_buf, &mut self.right_free_bits, Direction::RightToLeft)
        };
        let q = buf.pop_front().expect("selected buffer is nonempty");
        *free += q.pkt.size_bits;
        debug_assert!(*free <= self.buffer_bits, "buffer accounting overflow");
        self.estimator.record(dir, now.0.saturating_sub(q.enqueued.0));
        self.bits_transmitted = 0;
        trace!(link = self.id.0, pkt = q.pkt.id, ?dir, "进入发送槽");
        Some(Transmitting {
            pkt: q.pkt,
            dir,
            started: now,
        })
    }

    /// 推进链路一个 tick：
    /// (a) 周期性重算排队时延估计
    /// (b) 在 bit 预算内驱动发送槽，完成的包交付给流向端点
    /// (c) 记录本 tick 的分析样本
    pub(crate) fn update_transmission(
        &mut self,
        dt: SimTime,
        now: SimTime,
        nodes: &mut [Option<Node>],
        links: &mut [Option<Link>],
    ) {
        self.estimator.tick(dt.0);
        self.bits_this_tick = 0;

        let mut usage_left: i64 = (dt.0.saturating_mul(self.rate_bpms)) as i64;
        while usage_left > 0 {
            if self.in_transit.is_none() {
                match self.select_next(now) {
                    Some(t) => self.in_transit = Some(t),
                    None => break,
                }
            }
            let (size_bits, started, dir) = {
                let t = self.in_transit.as_ref().expect("transmission slot occupied");
                (t.pkt.size_bits, t.started, t.dir)
            };

            // 传播窗口越过本 tick 末尾：这个包本 tick 发不了
            let end_of_delay = started.0 + self.delay.0;
            if end_of_delay > now.0 + dt.0 {
                usage_left = ((now.0 + dt.0) as i64 - end_of_delay as i64)
                    * self.rate_bpms as i64;
                continue;
            }

            let chunk = (usage_left as u64).min(size_bits - self.bits_transmitted);
            self.bits_transmitted += chunk;
            usage_left -= chunk as i64;

            if self.bits_transmitted == size_bits {
                let done = self.in_transit.take().expect("transmission slot occupied");
                self.bits_this_tick += done.pkt.size_bits;
                self.bits_transmitted = 0;
                let to = match dir {
                    Direction::LeftToRight => self.right,
                    Direction::RightToLeft => self.left,
                };
                debug!(link = self.id.0, pkt = done.pkt.id, to = to.0, "packet 送达端点");
                let mut node = nodes[to.0]
                    .take()
                    .unwrap_or_else(|| panic!("node {to:?} missing during delivery"));
                node.receive_packet(done.pkt, self, links, now);
                nodes[to.0] = Some(node);
            }
        }

        self.record_samples(dt, now);
    }

    fn record_samples(&mut self, dt: SimTime, now: SimTime) {
        let secs = dt.0 as f64 / 1000.0;
        let left_occ = (self.buffer_bits - self.left_free_bits) as f64 / secs;
        let right_occ = (self.buffer_bits - self.right_free_bits) as f64 / secs;
        self.series.push_left_occupancy(now.0, left_occ);
        self.series.push_right_occupancy(now.0, right_occ);
        self.series
            .push_throughput(now.0, self.bits_this_tick as f64 / (dt.0 as f64 * 1000.0));
        self.series.push_drops(now.0, self.drops as f64);
    }
}

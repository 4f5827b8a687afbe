//! 主机类型
//!
//! 主机是数据的源与汇：发起流、在滑动窗口约束下发送数据包、
//! 接收 ACK 并驱动拥塞控制状态机、为收到的数据包回 ACK。
//! 每台主机恰好挂一条链路。

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info, trace};

use super::id::{LinkId, NodeId};
use super::link::Link;
use super::packet::{Packet, PacketKind};
use super::{Flow, TopologyError};
use crate::analytics::FlowSeries;
use crate::proto::{ControllerState, Protocol, DUP_ACK_THRESHOLD};
use crate::sim::SimTime;

/// 接收端对一条入流的记录。
/// 不变量：`next_expected_id <= max_id + 1`；相等时下载完成并被移除。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Download {
    pub next_expected_id: u64,
    pub max_id: u64,
}

/// 发送端的活动流：静态描述 + 数据包队列 + 控制器状态 + 统计序列。
#[derive(Debug)]
pub(crate) struct ActiveFlow {
    pub(crate) flow: Flow,
    pub(crate) activated: bool,
    pub(crate) max_id: u64,
    /// 尚未被累计确认的数据包，队头即最早未确认者
    pub(crate) packets: VecDeque<Packet>,
    pub(crate) ctrl: ControllerState,
    pub(crate) series: FlowSeries,
    bits_sent_this_tick: u64,
}

/// 完成后留档的流：完成时刻与统计序列。
#[derive(Debug)]
pub struct CompletedFlow {
    pub flow_id: u64,
    pub finished_at: SimTime,
    pub series: FlowSeries,
}

impl ActiveFlow {
    fn new(flow: Flow) -> ActiveFlow {
        ActiveFlow {
            flow,
            activated: false,
            max_id: 0,
            packets: VecDeque::new(),
            ctrl: ControllerState::default(),
            series: FlowSeries::default(),
            bits_sent_this_tick: 0,
        }
    }

    /// 激活：占用一段连续 id（SETUP 一个，数据包随后），返回要发出的 SETUP。
    fn activate(&mut self, setup_id: u64) -> Packet {
        let n = self.flow.packet_count();
        let first_data = setup_id + 1;
        self.max_id = setup_id + n;
        self.packets = (first_data..=self.max_id)
            .map(|id| Packet::data(id, self.flow.src(), self.flow.dst()))
            .collect();
        self.activated = true;
        debug!(
            flow = self.flow.id(),
            first_data,
            max_id = self.max_id,
            "流激活，生成数据包序列"
        );
        Packet::setup(setup_id, self.max_id, self.flow.src(), self.flow.dst())
    }

    fn packet_for(&self, id: u64) -> &Packet {
        let head = self.packets.front().expect("nonempty packet queue").id;
        &self.packets[(id - head) as usize]
    }

    /// 新的累计 ACK：弹出所有已确认包并采样 RTT，释放一个窗口槽。
    fn on_new_ack(&mut self, ack_id: u64, now: SimTime) {
        while let Some(front) = self.packets.front() {
            if front.id >= ack_id {
                break;
            }
            let sent = self
                .ctrl
                .send_times
                .remove(&front.id)
                .unwrap_or_else(|| panic!("acked packet {} missing from send_times", front.id));
            self.ctrl
                .on_rtt_sample(now.0.saturating_sub(sent.0), self.flow.protocol());
            self.packets.pop_front();
        }
        self.ctrl.window_occupied = self.ctrl.window_occupied.saturating_sub(1);
        self.ctrl.dup_ack_count = 0;
        self.ctrl.on_new_ack(self.flow.protocol());
        trace!(
            flow = self.flow.id(),
            ack = ack_id,
            cwnd = self.ctrl.cwnd,
            occupied = self.ctrl.window_occupied,
            "新 ACK"
        );
    }

    /// 重复 ACK：第三个且队头尚未因此重传过时，触发快速重传。
    /// RENO 在此进入 FR/FR；FAST 只重传，不动窗口。
    fn on_dup_ack(&mut self, via: &mut Link, host: NodeId, now: SimTime) {
        self.ctrl.dup_ack_count += 1;
        let Some(head) = self.packets.front().cloned() else {
            return;
        };
        if self.ctrl.dup_ack_count >= DUP_ACK_THRESHOLD
            && self.ctrl.most_recent_retransmitted != Some(head.id)
        {
            debug!(flow = self.flow.id(), pkt = head.id, "三重复 ACK，快速重传");
            self.ctrl.most_recent_retransmitted = Some(head.id);
            self.ctrl.send_times.insert(head.id, now);
            via.clear_buffer(host);
            via.add_packet(head.clone(), host, now);
            // 缓冲里的旧窗口已被清掉，只有刚重传的这一个在途
            self.ctrl.window_occupied = 1;
            self.ctrl.most_recent_queued = Some(head.id);
            if self.flow.protocol() == Protocol::Reno && !self.ctrl.awaiting_retransmit {
                self.ctrl.enter_fast_recovery();
            }
            self.ctrl.dup_ack_count = 0;
        }
    }

    /// 发送阶段：先做超时重传扫描，再填满窗口，最后记录本 tick 样本。
    fn send_phase(&mut self, link: &mut Link, host: NodeId, dt: SimTime, now: SimTime) {
        self.bits_sent_this_tick = 0;

        // 超时重传：每个超过定时器的未确认包都重发一次
        let expired: Vec<u64> = self
            .ctrl
            .send_times
            .iter()
            .filter(|(_, sent)| sent.0 + self.ctrl.timeout.0 < now.0)
            .map(|(&id, _)| id)
            .collect();
        for id in expired {
            debug!(flow = self.flow.id(), pkt = id, now = now.0, "重传定时器到期");
            self.ctrl.send_times.insert(id, now);
            self.ctrl.window_occupied = 1;
            self.ctrl.most_recent_queued = Some(id);
            link.clear_buffer(host);
            let pkt = self.packet_for(id).clone();
            link.add_packet(pkt, host, now);
        }

        // 填窗：从最近入队者的下一个开始，直到窗口占满或无包可发。
        // 被链路拒收（丢弃）的包不退还窗口槽，留给定时器或重复 ACK 恢复。
        if let Some(front) = self.packets.front() {
            let first = front.id;
            let next = self.ctrl.most_recent_queued.map_or(first, |q| q + 1);
            debug_assert!(next >= first, "window fill cursor behind queue head");
            let mut idx = (next.saturating_sub(first)) as usize;
            while self.ctrl.window_occupied < self.ctrl.cwnd {
                let Some(pkt) = self.packets.get(idx) else {
                    break;
                };
                let pkt = pkt.clone();
                self.ctrl.deflate_if_awaiting();
                self.ctrl.window_occupied += 1;
                trace!(flow = self.flow.id(), pkt = pkt.id, "窗口发送");
                self.ctrl.send_times.insert(pkt.id, now);
                self.ctrl.most_recent_queued = Some(pkt.id);
                self.bits_sent_this_tick += pkt.size_bits;
                link.add_packet(pkt, host, now);
                idx += 1;
            }
        }

        self.series.push_window(now.0, self.ctrl.cwnd as f64);
        self.series
            .push_rate(now.0, self.bits_sent_this_tick as f64 / (dt.0 as f64 * 1000.0));
    }

    fn into_completed(self, now: SimTime) -> CompletedFlow {
        CompletedFlow {
            flow_id: self.flow.id(),
            finished_at: now,
            series: self.series,
        }
    }
}

/// 主机节点
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    address: String,
    link: Option<LinkId>,
    /// 本主机累计分配出去的包 id 数；严格单调，保证同主机各流 id 不重叠
    total_packets_generated: u64,
    /// 优先出站队列（ACK / SETUP）
    immediate_queue: VecDeque<Packet>,
    flows_by_dst: BTreeMap<NodeId, Vec<ActiveFlow>>,
    downloads_by_src: BTreeMap<NodeId, Vec<Download>>,
    completed: Vec<CompletedFlow>,
}

impl Host {
    pub(crate) fn new(id: NodeId, address: impl Into<String>) -> Host {
        Host {
            id,
            address: address.into(),
            link: None,
            total_packets_generated: 0,
            immediate_queue: VecDeque::new(),
            flows_by_dst: BTreeMap::new(),
            downloads_by_src: BTreeMap::new(),
            completed: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn link_id(&self) -> Option<LinkId> {
        self.link
    }

    pub(crate) fn attach_link(&mut self, link: LinkId) -> Result<(), TopologyError> {
        if self.link.is_some() {
            return Err(TopologyError::HostAlreadyLinked {
                address: self.address.clone(),
            });
        }
        self.link = Some(link);
        Ok(())
    }

    pub(crate) fn detach_link(&mut self) {
        self.link = None;
    }

    /// 注册一条以本主机为源的流。数据包序列到激活时刻才生成。
    pub(crate) fn add_flow(&mut self, flow: Flow) {
        debug_assert_eq!(flow.src(), self.id);
        self.flows_by_dst
            .entry(flow.dst())
            .or_default()
            .push(ActiveFlow::new(flow));
    }

    pub fn has_active_flows(&self) -> bool {
        self.flows_by_dst.values().any(|flows| !flows.is_empty())
    }

    pub fn completed_flows(&self) -> &[CompletedFlow] {
        &self.completed
    }

    pub fn total_packets_generated(&self) -> u64 {
        self.total_packets_generated
    }

    /// 指定流的控制器状态（仍在进行中才有）。
    pub fn controller(&self, flow_id: u64) -> Option<&ControllerState> {
        self.flows_by_dst
            .values()
            .flatten()
            .find(|af| af.flow.id() == flow_id)
            .map(|af| &af.ctrl)
    }

    /// 来自 `src` 的下载记录；该来源从未注册过时为 None。
    pub fn downloads_from(&self, src: NodeId) -> Option<&[Download]> {
        self.downloads_by_src.get(&src).map(Vec::as_slice)
    }

    pub(crate) fn active_flows(&self) -> impl Iterator<Item = &ActiveFlow> {
        self.flows_by_dst.values().flatten()
    }

    #[cfg(test)]
    pub(crate) fn immediate_queue(&self) -> &VecDeque<Packet> {
        &self.immediate_queue
    }

    /// 主机阶段的推进：
    /// (1) 激活到期的流（生成数据包并排入 SETUP）
    /// (2) 立即队列优先出站
    /// (3) 每条激活流跑发送阶段
    pub(crate) fn update(&mut self, dt: SimTime, now: SimTime, links: &mut [Option<Link>]) {
        let link_id = self.link.expect("host must be linked before the run");

        for flows in self.flows_by_dst.values_mut() {
            for af in flows.iter_mut() {
                if !af.activated && now.0 >= af.flow.start_time().0 {
                    let setup = af.activate(self.total_packets_generated);
                    self.total_packets_generated = af.max_id + 1;
                    self.immediate_queue.push_back(setup);
                }
            }
        }

        let link = links[link_id.0]
            .as_mut()
            .unwrap_or_else(|| panic!("link {link_id:?} missing during host update"));

        // ACK/SETUP 先走；放不下就按丢包处理，不再补偿
        while let Some(pkt) = self.immediate_queue.pop_front() {
            link.add_packet(pkt, self.id, now);
        }

        for flows in self.flows_by_dst.values_mut() {
            for af in flows.iter_mut() {
                if af.activated {
                    af.send_phase(link, self.id, dt, now);
                }
            }
        }
    }

    /// 链路交付入口：按包种类分发。
    pub(crate) fn receive_packet(&mut self, pkt: Packet, via: &mut Link, now: SimTime) {
        match pkt.kind {
            PacketKind::Setup { max_id } => self.receive_setup(&pkt, max_id),
            PacketKind::Data => self.receive_data(&pkt),
            PacketKind::Ack => self.receive_ack(&pkt, via, now),
        }
    }

    /// SETUP：登记一条来自 `pkt.src` 的下载，首个期待的数据包 id 是 SETUP id 的下一个。
    fn receive_setup(&mut self, pkt: &Packet, max_id: u64) {
        debug!(
            host = %self.address,
            from = pkt.src.0,
            first_data = pkt.id + 1,
            max_id,
            "收到 SETUP，登记下载"
        );
        self.downloads_by_src.entry(pkt.src).or_default().push(Download {
            next_expected_id: pkt.id + 1,
            max_id,
        });
    }

    /// DATA：命中某条下载窗口时推进游标并回累计 ACK；
    /// 来源已知但落在窗口外的包静默忽略（过期重传）。
    fn receive_data(&mut self, pkt: &Packet) {
        let Some(downloads) = self.downloads_by_src.get_mut(&pkt.src) else {
            panic!(
                "host `{}` received DATA {} from {:?} with no registered download",
                self.address, pkt.id, pkt.src
            );
        };
        let mut ack = None;
        let mut finished = None;
        for (i, dl) in downloads.iter_mut().enumerate() {
            if dl.next_expected_id <= pkt.id && pkt.id <= dl.max_id {
                if pkt.id == dl.next_expected_id {
                    dl.next_expected_id += 1;
                    if dl.next_expected_id > dl.max_id {
                        finished = Some(i);
                    }
                }
                ack = Some(Packet::ack(dl.next_expected_id, pkt.dst, pkt.src));
                break;
            }
        }
        if let Some(i) = finished {
            info!(host = %self.address, from = pkt.src.0, "下载完成");
            downloads.remove(i);
        }
        if let Some(a) = ack {
            trace!(host = %self.address, ack = a.id, "回送累计 ACK");
            self.immediate_queue.push_back(a);
        }
    }

    /// ACK：找到对应的活动流，区分新累计 ACK 与重复 ACK。
    fn receive_ack(&mut self, pkt: &Packet, via: &mut Link, now: SimTime) {
        let host_id = self.id;
        let Some(flows) = self.flows_by_dst.get_mut(&pkt.src) else {
            return;
        };
        let mut finished = None;
        for (i, af) in flows.iter_mut().enumerate() {
            let Some(head) = af.packets.front().map(|p| p.id) else {
                continue;
            };
            if pkt.id > head && pkt.id - 1 <= af.max_id {
                af.on_new_ack(pkt.id, now);
                // 最后一个累计 ACK 把队列清空：这条流到此全部确认
                if af.packets.is_empty() {
                    finished = Some(i);
                }
                break;
            } else if pkt.id == head {
                af.on_dup_ack(via, host_id, now);
                break;
            }
        }
        if let Some(i) = finished {
            let af = flows.remove(i);
            info!(flow = af.flow.id(), at = now.0, "流完成");
            self.completed.push(af.into_completed(now));
        }
    }
}

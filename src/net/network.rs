//! 网络拓扑管理
//!
//! 节点与链路放在以稳定整数 id 寻址的 arena 里，互相只持有 id，
//! 不形成所有权环。更新一个组件时把它从槽位里取出，
//! 协作者拿到的可变借用因此互不重叠。

use tracing::trace;

use super::error::TopologyError;
use super::flow::Flow;
use super::host::Host;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::node::{Node, Router};
use crate::analytics::{FlowReport, LinkReport, Report};
use crate::sim::{SimTime, Updatable};

/// 网络拓扑：全部主机、路由器与链路
#[derive(Debug, Default)]
pub struct Network {
    nodes: Vec<Option<Node>>,
    links: Vec<Option<Link>>,
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, address: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::Host(Host::new(id, address))));
        id
    }

    /// 添加直通路由器节点
    pub fn add_router(&mut self, address: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::Router(Router::new(id, address))));
        id
    }

    /// 用一条双向链路连接两个节点。
    /// 速率单位 bits/ms，缓冲容量按侧计，单位 bits。
    pub fn connect(
        &mut self,
        left: NodeId,
        right: NodeId,
        rate_bpms: u64,
        delay: SimTime,
        buffer_bits: u64,
    ) -> Result<LinkId, TopologyError> {
        let id = LinkId(self.links.len());
        if rate_bpms == 0 {
            return Err(TopologyError::ZeroLinkParameter { link: id.0, what: "rate" });
        }
        if delay.0 == 0 {
            return Err(TopologyError::ZeroLinkParameter { link: id.0, what: "delay" });
        }
        if buffer_bits == 0 {
            return Err(TopologyError::ZeroLinkParameter { link: id.0, what: "buffer" });
        }
        if left == right {
            return Err(TopologyError::SelfLoop { link: id.0, node: left.0 });
        }
        for end in [left, right] {
            if self.nodes.get(end.0).map_or(true, Option::is_none) {
                return Err(TopologyError::UnknownNode { link: id.0, node: end.0 });
            }
        }

        self.node_mut(left).attach_link(id)?;
        if let Err(e) = self.node_mut(right).attach_link(id) {
            // 回滚左端，保持拓扑一致
            match self.node_mut(left) {
                Node::Host(h) => h.detach_link(),
                Node::Router(r) => {
                    r.links.pop();
                }
            }
            return Err(e);
        }
        self.links
            .push(Some(Link::new(id, rate_bpms, delay, buffer_bits, left, right)));
        Ok(id)
    }

    /// 注册一条流到它的源主机。
    pub fn add_flow(&mut self, flow: Flow) -> Result<(), TopologyError> {
        let id = flow.id();
        if flow.data_bits() == 0 {
            return Err(TopologyError::EmptyFlow { flow: id });
        }
        if flow.src() == flow.dst() {
            return Err(TopologyError::FlowEndpointNotHost { flow: id });
        }
        for end in [flow.src(), flow.dst()] {
            let is_host = self
                .nodes
                .get(end.0)
                .and_then(Option::as_ref)
                .is_some_and(Node::is_host);
            if !is_host {
                return Err(TopologyError::FlowEndpointNotHost { flow: id });
            }
        }
        self.host_mut(flow.src())
            .expect("checked to be a host")
            .add_flow(flow);
        Ok(())
    }

    /// 运行前的整体校验：主机必须挂着一条链路，路由器恰好两条。
    pub fn validate(&self) -> Result<(), TopologyError> {
        for node in self.nodes.iter().flatten() {
            match node {
                Node::Host(h) => {
                    if h.link_id().is_none() {
                        return Err(TopologyError::HostWithoutLink {
                            address: h.address().to_string(),
                        });
                    }
                }
                Node::Router(_) => {
                    if node.link_count() != 2 {
                        return Err(TopologyError::RouterLinkCount {
                            address: node.address().to_string(),
                            count: node.link_count(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0].as_mut().expect("node present")
    }

    pub fn host(&self, id: NodeId) -> Option<&Host> {
        self.node(id).and_then(Node::as_host)
    }

    pub fn host_mut(&mut self, id: NodeId) -> Option<&mut Host> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .and_then(Node::as_host_mut)
    }

    pub fn link(&self, id: LinkId) -> &Link {
        self.links[id.0].as_ref().expect("link present")
    }

    pub fn link_mut(&mut self, id: LinkId) -> &mut Link {
        self.links[id.0].as_mut().expect("link present")
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// 所有注册过的流都已完成？
    pub fn all_flows_complete(&self) -> bool {
        self.nodes
            .iter()
            .flatten()
            .filter_map(Node::as_host)
            .all(|h| !h.has_active_flows())
    }

    /// 汇总全部统计序列。
    pub fn report(&self) -> Report {
        let mut report = Report::default();
        for host in self.nodes.iter().flatten().filter_map(Node::as_host) {
            for af in host.active_flows() {
                report.flows.push(FlowReport {
                    flow_id: af.flow.id(),
                    completed_at_ms: None,
                    series: af.series.clone(),
                });
            }
            for cf in host.completed_flows() {
                report.flows.push(FlowReport {
                    flow_id: cf.flow_id,
                    completed_at_ms: Some(cf.finished_at.0),
                    series: cf.series.clone(),
                });
            }
        }
        for link in self.links.iter().flatten() {
            report.links.push(LinkReport {
                link_id: link.id().0,
                series: link.series.clone(),
            });
        }
        report.flows.sort_by_key(|f| f.flow_id);
        report
    }

    /// 测试辅助：同时拿到一台主机和一条链路的可变借用。
    #[cfg(test)]
    pub(crate) fn with_host_and_link<R>(
        &mut self,
        host: NodeId,
        link: LinkId,
        f: impl FnOnce(&mut Host, &mut Link) -> R,
    ) -> R {
        let mut node = self.nodes[host.0].take().expect("node present");
        let mut l = self.links[link.0].take().expect("link present");
        let r = f(node.as_host_mut().expect("node is a host"), &mut l);
        self.links[link.0] = Some(l);
        self.nodes[host.0] = Some(node);
        r
    }
}

impl Updatable for Network {
    /// 一个 tick：先推进所有主机（向链路缓冲投包），
    /// 再推进所有链路（驱动发送槽、传播、交付）。
    /// 两个阶段内部都按 arena 下标升序，同一配置下顺序确定。
    fn update(&mut self, dt: SimTime, now: SimTime) {
        trace!(now = now.0, "tick 开始");
        for i in 0..self.nodes.len() {
            let mut node = self.nodes[i].take().expect("node present during host phase");
            node.update(dt, now, &mut self.links);
            self.nodes[i] = Some(node);
        }
        for j in 0..self.links.len() {
            let mut link = self.links[j].take().expect("link present during link phase");
            link.update_transmission(dt, now, &mut self.nodes, &mut self.links);
            self.links[j] = Some(link);
        }
    }
}

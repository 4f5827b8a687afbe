//! 节点类型
//!
//! 定义网络端点：主机（数据的源与汇）和直通路由器。
//! 数据包按种类分发，在这里只做一次 match。

use tracing::trace;

use super::host::Host;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::packet::Packet;
use crate::sim::SimTime;

/// 网络节点
#[derive(Debug)]
pub enum Node {
    Host(Host),
    Router(Router),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Host(h) => h.id(),
            Node::Router(r) => r.id,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Node::Host(h) => h.address(),
            Node::Router(r) => &r.address,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Node::Host(_))
    }

    pub fn as_host(&self) -> Option<&Host> {
        match self {
            Node::Host(h) => Some(h),
            Node::Router(_) => None,
        }
    }

    pub fn as_host_mut(&mut self) -> Option<&mut Host> {
        match self {
            Node::Host(h) => Some(h),
            Node::Router(_) => None,
        }
    }

    pub(crate) fn attach_link(&mut self, link: LinkId) -> Result<(), super::TopologyError> {
        match self {
            Node::Host(h) => h.attach_link(link),
            Node::Router(r) => {
                r.links.push(link);
                Ok(())
            }
        }
    }

    pub(crate) fn link_count(&self) -> usize {
        match self {
            Node::Host(h) => usize::from(h.link_id().is_some()),
            Node::Router(r) => r.links.len(),
        }
    }

    /// 主机阶段的推进；路由器是无状态直通，没有每 tick 的工作。
    pub(crate) fn update(&mut self, dt: SimTime, now: SimTime, links: &mut [Option<Link>]) {
        match self {
            Node::Host(h) => h.update(dt, now, links),
            Node::Router(_) => {}
        }
    }

    /// 链路交付入口。`via` 是送达本节点的链路（它正处于自身的更新中，
    /// 因此从 `links` 槽位里是取不到的）。
    pub(crate) fn receive_packet(
        &mut self,
        pkt: Packet,
        via: &mut Link,
        links: &mut [Option<Link>],
        now: SimTime,
    ) {
        match self {
            Node::Host(h) => h.receive_packet(pkt, via, now),
            Node::Router(r) => r.forward(pkt, via, links, now),
        }
    }
}

/// 直通路由器：静态路由下连接恰好两条链路，
/// 从一侧收到的包立即转入另一侧的缓冲区（存储转发）。
#[derive(Debug)]
pub struct Router {
    pub(crate) id: NodeId,
    pub(crate) address: String,
    pub(crate) links: Vec<LinkId>,
}

impl Router {
    pub(crate) fn new(id: NodeId, address: impl Into<String>) -> Router {
        Router {
            id,
            address: address.into(),
            links: Vec::new(),
        }
    }

    fn forward(&mut self, pkt: Packet, via: &mut Link, links: &mut [Option<Link>], now: SimTime) {
        let out = self
            .links
            .iter()
            .copied()
            .find(|l| *l != via.id())
            .unwrap_or_else(|| panic!("router `{}` has no egress link", self.address));
        trace!(router = %self.address, pkt = pkt.id, out = out.0, "直通转发");
        let link = links[out.0]
            .as_mut()
            .unwrap_or_else(|| panic!("link {out:?} missing during forward"));
        // 放不下由出链路计为丢包
        link.add_packet(pkt, self.id, now);
    }
}

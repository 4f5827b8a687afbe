//! 网络仿真模块
//!
//! 此模块包含仿真的核心组件：数据包、节点（主机/路由器）、链路、流和网络拓扑。

// 子模块声明
mod error;
mod flow;
mod host;
mod id;
mod link;
mod network;
mod node;
mod packet;

// 重新导出公共接口
pub use error::TopologyError;
pub use flow::Flow;
pub use host::{CompletedFlow, Download, Host};
pub use id::{LinkId, NodeId};
pub use link::{Direction, Link, BUFFER_DELAY_PERIOD_MS};
pub use network::Network;
pub use node::{Node, Router};
pub use packet::{Packet, PacketKind, CONTROL_PACKET_BITS, DATA_PACKET_BITS};

pub mod analytics;
pub mod config;
pub mod net;
pub mod proto;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;

// 常用类型在 crate 根再导出一次，bin 文件可以少写几层路径。
pub use net::{Flow, Host, Link, LinkId, Network, Node, NodeId, Packet, PacketKind};
pub use proto::{ControllerState, Protocol};
pub use sim::{Runner, SimTime, Updatable};

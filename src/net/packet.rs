//! 数据包类型
//!
//! 定义网络数据包及其种类。数据包一经创建不可变。

use super::id::NodeId;

/// DATA 包大小（bits）
pub const DATA_PACKET_BITS: u64 = 8192;
/// ACK / SETUP 包大小（bits）
pub const CONTROL_PACKET_BITS: u64 = 512;

/// 数据包种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// 数据段
    Data,
    /// 累计确认：`id` 为接收方下一个期待的数据包 id
    Ack,
    /// 流建立：`id` 为本包自身的 id，首个数据包 id = `id + 1`
    Setup { max_id: u64 },
}

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub size_bits: u64,
    pub src: NodeId,
    pub dst: NodeId,
    pub kind: PacketKind,
}

impl Packet {
    pub fn data(id: u64, src: NodeId, dst: NodeId) -> Packet {
        Packet {
            id,
            size_bits: DATA_PACKET_BITS,
            src,
            dst,
            kind: PacketKind::Data,
        }
    }

    /// 累计 ACK：由原目的主机发回原源主机。
    pub fn ack(next_expected: u64, src: NodeId, dst: NodeId) -> Packet {
        Packet {
            id: next_expected,
            size_bits: CONTROL_PACKET_BITS,
            src,
            dst,
            kind: PacketKind::Ack,
        }
    }

    pub fn setup(id: u64, max_id: u64, src: NodeId, dst: NodeId) -> Packet {
        Packet {
            id,
            size_bits: CONTROL_PACKET_BITS,
            src,
            dst,
            kind: PacketKind::Setup { max_id },
        }
    }
}

//! 流：把 D bits 从一个主机搬到另一个主机的静态描述
//!
//! 流只携带传输意图（端点、数据量、开始时刻、协议）。
//! 控制器状态、数据包队列和统计都归属源主机的活动流记录。

use super::id::NodeId;
use super::packet::DATA_PACKET_BITS;
use crate::proto::Protocol;
use crate::sim::SimTime;

/// 传输描述
#[derive(Debug, Clone)]
pub struct Flow {
    id: u64,
    src: NodeId,
    dst: NodeId,
    data_bits: u64,
    start: SimTime,
    protocol: Protocol,
}

impl Flow {
    pub fn new(
        id: u64,
        src: NodeId,
        dst: NodeId,
        data_bits: u64,
        start: SimTime,
        protocol: Protocol,
    ) -> Flow {
        Flow {
            id,
            src,
            dst,
            data_bits,
            start,
            protocol,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn dst(&self) -> NodeId {
        self.dst
    }

    pub fn data_bits(&self) -> u64 {
        self.data_bits
    }

    pub fn start_time(&self) -> SimTime {
        self.start
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// 承载 `data_bits` 需要的数据包数（不足一个包按一个包算）。
    pub fn packet_count(&self) -> u64 {
        self.data_bits.div_ceil(DATA_PACKET_BITS)
    }
}

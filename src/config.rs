//! Static simulation description and the validating topology builder.
//!
//! The config names nodes by address string; `build` resolves names to
//! arena ids, wires everything up and runs the whole-topology validation
//! before a single tick executes.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::net::{Flow, Network, NodeId, TopologyError};
use crate::proto::Protocol;
use crate::sim::SimTime;

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// bits per millisecond
    pub rate_bpms: u64,
    pub delay_ms: u64,
    pub buffer_bits: u64,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
    pub id: u64,
    pub src: String,
    pub dst: String,
    pub data_bits: u64,
    #[serde(default)]
    pub start_ms: u64,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub routers: Vec<RouterConfig>,
    pub links: Vec<LinkConfig>,
    pub flows: Vec<FlowConfig>,
}

pub fn load_json(text: &str) -> Result<SimConfig, serde_json::Error> {
    serde_json::from_str(text)
}

/// Build a validated `Network` from a config. Every error names the
/// offending entity; nothing is left half-wired on failure.
pub fn build(cfg: &SimConfig) -> Result<Network, TopologyError> {
    let mut net = Network::default();
    let mut by_address: BTreeMap<&str, NodeId> = BTreeMap::new();

    for host in &cfg.hosts {
        if by_address.contains_key(host.address.as_str()) {
            return Err(TopologyError::DuplicateAddress {
                address: host.address.clone(),
            });
        }
        by_address.insert(&host.address, net.add_host(&host.address));
    }
    for router in &cfg.routers {
        if by_address.contains_key(router.address.as_str()) {
            return Err(TopologyError::DuplicateAddress {
                address: router.address.clone(),
            });
        }
        by_address.insert(&router.address, net.add_router(&router.address));
    }

    for (i, link) in cfg.links.iter().enumerate() {
        let resolve = |name: &str| {
            by_address
                .get(name)
                .copied()
                .ok_or_else(|| TopologyError::UnknownEndpoint {
                    link: i,
                    name: name.to_string(),
                })
        };
        let left = resolve(&link.left)?;
        let right = resolve(&link.right)?;
        net.connect(
            left,
            right,
            link.rate_bpms,
            SimTime(link.delay_ms),
            link.buffer_bits,
        )?;
    }

    for flow in &cfg.flows {
        let resolve = |name: &str| {
            by_address
                .get(name)
                .copied()
                .ok_or_else(|| TopologyError::UnknownFlowEndpoint {
                    flow: flow.id,
                    name: name.to_string(),
                })
        };
        let src = resolve(&flow.src)?;
        let dst = resolve(&flow.dst)?;
        net.add_flow(Flow::new(
            flow.id,
            src,
            dst,
            flow.data_bits,
            SimTime(flow.start_ms),
            flow.protocol,
        ))?;
    }

    net.validate()?;
    Ok(net)
}

use std::net::Ipv4Addr;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::{
    config::{ConfigError, LinkDesc, NodeDesc},
    entities::{
        link::{Endpoint, Link},
        node::Node,
    },
    packet::Packet,
    port::{PortId, PortSet},
    simulation::{Command, LinkCmd, NodeCmd, Simulation},
    stats::{Notice, Record},
    topology::{LinkId, NodeId, Topology},
    units::{Nanosecs, Octets},
};

/// A static route: traffic for `dst` leaves `node` through `port`.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct RouteDesc {
    #[builder(setter(into))]
    pub node: String,
    pub dst: Ipv4Addr,
    pub port: usize,
}

/// A payload entering the domain at a node's port at a given time.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct Injection {
    #[builder(setter(into))]
    pub at: Nanosecs,
    #[builder(setter(into))]
    pub node: String,
    pub port: usize,
    pub dst: Ipv4Addr,
    #[builder(setter(into))]
    pub size: Octets,
}

/// A scheduled link failure or recovery.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct Outage {
    #[builder(setter(into))]
    pub at: Nanosecs,
    #[builder(setter(into))]
    pub link: String,
    pub up: bool,
}

/// A complete scenario.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub nodes: Vec<NodeDesc>,
    pub links: Vec<LinkDesc>,
    #[builder(default)]
    pub routes: Vec<RouteDesc>,
    #[builder(default)]
    pub injections: Vec<Injection>,
    #[builder(default)]
    pub outages: Vec<Outage>,

    /// Clock granularity.
    #[builder(setter(into))]
    pub tic: Nanosecs,
    /// Absolute end of simulated time.
    #[builder(setter(into))]
    pub horizon: Nanosecs,
}

/// Everything a run produces: the statistics sink's counters plus the
/// notices a visualizer would have received, in emission order.
#[derive(Debug)]
pub struct Summary {
    pub records: Vec<Record>,
    pub notices: Vec<Notice>,
}

pub fn run(cfg: Config) -> Result<Summary, Error> {
    let mut topology = Topology::default();
    let mut nodes = FxHashMap::default();
    let mut links = FxHashMap::default();

    for desc in &cfg.nodes {
        desc.validate(&topology, false)?;
        let id = NodeId::new(desc.id);
        let name = desc.name.as_deref().expect("validated name");
        if topology.node_by_address(desc.address).is_some() {
            return Err(Error::DuplicateAddress(desc.address));
        }
        topology.register_node(id, name, desc.address);
        let node = Node::builder()
            .id(id)
            .address(desc.address)
            .caps(desc.kind.caps())
            .switching_power(desc.switching_power)
            .ports(PortSet::new(desc.nr_ports, desc.buffer))
            .build();
        nodes.insert(id, node);
    }

    for desc in &cfg.links {
        desc.validate(&topology, false)?;
        let id = LinkId::new(desc.id);
        let a = resolve_end(&topology, &nodes, desc.end_a)?;
        let b = resolve_end(&topology, &nodes, desc.end_b)?;
        topology.register_link(id, desc.name.as_deref(), (a.node, a.port), (b.node, b.port));
        let link = Link::builder()
            .id(id)
            .kind(desc.kind)
            .delay(desc.delay)
            .a(a)
            .b(b)
            .build();
        links.insert(id, link);
    }

    for route in &cfg.routes {
        let node = topology
            .node_by_name(&route.node)
            .ok_or_else(|| Error::UnknownNode(route.node.clone()))?;
        topology.add_route(node, route.dst, PortId::new(route.port));
    }

    let mut seeds = Vec::new();
    for inj in &cfg.injections {
        let node = topology
            .node_by_name(&inj.node)
            .ok_or_else(|| Error::UnknownNode(inj.node.clone()))?;
        let src = topology.address_of(node).expect("registered node");
        if inj.port >= nodes[&node].ports.nr_ports() {
            return Err(Error::BadPort {
                address: src,
                port: inj.port,
            });
        }
        let pkt = Packet::native(src, inj.dst, inj.size);
        let cmd = NodeCmd::new_inject(node, PortId::new(inj.port), pkt);
        seeds.push((inj.at.into_time(), Command::from(cmd)));
    }
    for outage in &cfg.outages {
        let link = topology
            .link_by_name(&outage.link)
            .ok_or_else(|| Error::UnknownLink(outage.link.clone()))?;
        let cmd = if outage.up {
            LinkCmd::new_up(link)
        } else {
            LinkCmd::new_down(link)
        };
        seeds.push((outage.at.into_time(), Command::from(cmd)));
    }

    let mut sim = Simulation::builder()
        .nodes(nodes)
        .links(links)
        .topology(topology)
        .tic(cfg.tic.into_delta())
        .horizon(cfg.horizon.into_time())
        .build();
    for (at, cmd) in seeds {
        sim.seed(at, cmd)?;
    }
    sim.run()
}

fn resolve_end(
    topology: &Topology,
    nodes: &FxHashMap<NodeId, Node>,
    (address, port): (Ipv4Addr, usize),
) -> Result<Endpoint, Error> {
    let node = topology
        .node_by_address(address)
        .ok_or(Error::Config(ConfigError::UnknownEndpoint(address)))?;
    let nr_ports = nodes[&node].ports.nr_ports();
    if port >= nr_ports {
        return Err(Error::BadPort { address, port });
    }
    Ok(Endpoint::new(node, PortId::new(port)))
}

pub fn read_config(path: impl AsRef<Path>) -> Result<Config, Error> {
    let s = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serde error")]
    Serde(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("configuration rejected")]
    Config(#[from] ConfigError),

    #[error("identifier space exhausted")]
    IdSpaceExhausted(#[from] crate::ident::Exhausted),

    #[error("label space exhausted")]
    LabelSpaceExhausted(#[from] crate::table::LabelExhausted),

    #[error("address {0} is already in use")]
    DuplicateAddress(Ipv4Addr),

    #[error("no node named {0:?}")]
    UnknownNode(String),

    #[error("no link named {0:?}")]
    UnknownLink(String),

    #[error("node {address} has no port {port}")]
    BadPort { address: Ipv4Addr, port: usize },
}

use std::net::Ipv4Addr;

use crate::{
    topology::{LinkId, NodeId, Topology},
    units::{Mbps, Nanosecs, Octets},
};

const NODE_RECORD_FIELDS: usize = 11;
const LINK_RECORD_FIELDS: usize = 10;
const RECORD_SEP: char = '#';

/// Configuration problems, reported as values and never thrown across the
/// simulation boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("entity has no name")]
    MissingName,
    #[error("entity name is blank")]
    BlankName,
    #[error("name is already used")]
    NameAlreadyUsed,
    #[error("record has {found} fields, expected {expected}")]
    MalformedRecord { expected: usize, found: usize },
    #[error("record field {0:?} cannot be parsed")]
    BadField(String),
    #[error("endpoint address {0} is not part of the topology")]
    UnknownEndpoint(Ipv4Addr),
}

/// The switching behaviors a node kind enables. One engine serves every
/// kind; the table replaces a hierarchy of node classes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Caps {
    /// Heads of new paths are synthesized here from unlabeled arrivals.
    pub(crate) edge: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Edge,
    Interior,
}

impl NodeKind {
    pub(crate) fn caps(self) -> Caps {
        Caps {
            edge: matches!(self, NodeKind::Edge),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            NodeKind::Edge => "edge",
            NodeKind::Interior => "interior",
        }
    }

    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "edge" => Ok(NodeKind::Edge),
            "interior" => Ok(NodeKind::Interior),
            other => Err(ConfigError::BadField(other.to_owned())),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Internal,
    External,
}

impl LinkKind {
    fn as_str(self) -> &'static str {
        match self {
            LinkKind::Internal => "internal",
            LinkKind::External => "external",
        }
    }

    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "internal" => Ok(LinkKind::Internal),
            "external" => Ok(LinkKind::External),
            other => Err(ConfigError::BadField(other.to_owned())),
        }
    }
}

/// A node configuration.
#[derive(
    Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize,
)]
pub struct NodeDesc {
    pub id: usize,
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,
    pub address: Ipv4Addr,
    pub kind: NodeKind,
    /// Switching power; converted to bits per nanosecond by the engine.
    #[builder(setter(into))]
    pub switching_power: Mbps,
    /// Shared octet budget of the node's port set.
    #[builder(setter(into))]
    pub buffer: Octets,
    pub nr_ports: usize,
    #[builder(default = true)]
    pub show_name: bool,
    #[builder(default)]
    pub position: (i64, i64),
}

impl NodeDesc {
    pub fn validate(&self, topology: &Topology, reconfiguration: bool) -> Result<(), ConfigError> {
        let name = self.name.as_deref().ok_or(ConfigError::MissingName)?;
        if name.trim().is_empty() {
            return Err(ConfigError::BlankName);
        }
        let excluding = reconfiguration.then(|| NodeId::new(self.id));
        if topology.name_in_use(name, excluding) {
            return Err(ConfigError::NameAlreadyUsed);
        }
        Ok(())
    }

    pub fn to_record(&self) -> String {
        [
            "node".to_owned(),
            self.id.to_string(),
            self.name.clone().unwrap_or_default(),
            (self.show_name as u8).to_string(),
            self.position.0.to_string(),
            self.position.1.to_string(),
            self.kind.as_str().to_owned(),
            self.address.to_string(),
            self.switching_power.to_string(),
            self.buffer.to_string(),
            self.nr_ports.to_string(),
        ]
        .join(&RECORD_SEP.to_string())
    }

    pub fn from_record(record: &str) -> Result<Self, ConfigError> {
        let fields: Vec<&str> = record.split(RECORD_SEP).collect();
        if fields.len() != NODE_RECORD_FIELDS {
            return Err(ConfigError::MalformedRecord {
                expected: NODE_RECORD_FIELDS,
                found: fields.len(),
            });
        }
        if fields[0] != "node" {
            return Err(ConfigError::BadField(fields[0].to_owned()));
        }
        let name = (!fields[2].is_empty()).then(|| fields[2].to_owned());
        Ok(Self {
            id: parse_field(fields[1])?,
            name,
            address: parse_field(fields[7])?,
            kind: NodeKind::parse(fields[6])?,
            switching_power: parse_field(fields[8])?,
            buffer: parse_field(fields[9])?,
            nr_ports: parse_field(fields[10])?,
            show_name: fields[3] == "1",
            position: (parse_field(fields[4])?, parse_field(fields[5])?),
        })
    }
}

/// A link configuration. Endpoints are stored as addresses and re-resolved
/// against the live topology when a record is loaded.
#[derive(
    Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize,
)]
pub struct LinkDesc {
    pub id: usize,
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,
    pub kind: LinkKind,
    /// Propagation delay across the link.
    #[builder(setter(into))]
    pub delay: Nanosecs,
    /// (address, port) of each attachment.
    pub end_a: (Ipv4Addr, usize),
    pub end_b: (Ipv4Addr, usize),
    #[builder(default = true)]
    pub show_name: bool,
}

impl LinkDesc {
    pub fn validate(&self, topology: &Topology, reconfiguration: bool) -> Result<(), ConfigError> {
        let name = self.name.as_deref().ok_or(ConfigError::MissingName)?;
        if name.trim().is_empty() {
            return Err(ConfigError::BlankName);
        }
        let excluding = reconfiguration.then(|| LinkId::new(self.id));
        if topology.link_name_in_use(name, excluding) {
            return Err(ConfigError::NameAlreadyUsed);
        }
        Ok(())
    }

    pub fn to_record(&self) -> String {
        [
            "link".to_owned(),
            self.id.to_string(),
            self.name.clone().unwrap_or_default(),
            (self.show_name as u8).to_string(),
            self.kind.as_str().to_owned(),
            self.delay.to_string(),
            self.end_a.0.to_string(),
            self.end_a.1.to_string(),
            self.end_b.0.to_string(),
            self.end_b.1.to_string(),
        ]
        .join(&RECORD_SEP.to_string())
    }

    /// Parses a record, re-resolving both endpoint addresses against the
    /// live topology before accepting it.
    pub fn from_record(record: &str, topology: &Topology) -> Result<Self, ConfigError> {
        let fields: Vec<&str> = record.split(RECORD_SEP).collect();
        if fields.len() != LINK_RECORD_FIELDS {
            return Err(ConfigError::MalformedRecord {
                expected: LINK_RECORD_FIELDS,
                found: fields.len(),
            });
        }
        if fields[0] != "link" {
            return Err(ConfigError::BadField(fields[0].to_owned()));
        }
        let end_a = (parse_field(fields[6])?, parse_field(fields[7])?);
        let end_b = (parse_field(fields[8])?, parse_field(fields[9])?);
        for (address, _) in [end_a, end_b] {
            if topology.node_by_address(address).is_none() {
                return Err(ConfigError::UnknownEndpoint(address));
            }
        }
        let name = (!fields[2].is_empty()).then(|| fields[2].to_owned());
        Ok(Self {
            id: parse_field(fields[1])?,
            name,
            kind: LinkKind::parse(fields[4])?,
            delay: parse_field(fields[5])?,
            end_a,
            end_b,
            show_name: fields[3] == "1",
        })
    }
}

fn parse_field<T: std::str::FromStr>(s: &str) -> Result<T, ConfigError> {
    s.parse().map_err(|_| ConfigError::BadField(s.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_node(id: usize, name: Option<&str>) -> NodeDesc {
        NodeDesc {
            id,
            name: name.map(str::to_owned),
            address: Ipv4Addr::new(10, 0, 0, 1 + id as u8),
            kind: NodeKind::Interior,
            switching_power: Mbps::new(1_000),
            buffer: Octets::new(1_000_000),
            nr_ports: 4,
            show_name: true,
            position: (0, 0),
        }
    }

    #[test]
    fn validate_name_rules() {
        let mut topo = Topology::default();
        topo.register_node(NodeId::new(0), "lsr0", Ipv4Addr::new(10, 0, 0, 1));

        assert_eq!(
            mk_node(1, None).validate(&topo, false),
            Err(ConfigError::MissingName)
        );
        assert_eq!(
            mk_node(1, Some("  ")).validate(&topo, false),
            Err(ConfigError::BlankName)
        );
        assert_eq!(
            mk_node(1, Some("lsr0")).validate(&topo, false),
            Err(ConfigError::NameAlreadyUsed)
        );
        assert_eq!(mk_node(1, Some("lsr1")).validate(&topo, false), Ok(()));
    }

    #[test]
    fn reconfiguration_relaxes_the_duplicate_check_for_the_owner() {
        let mut topo = Topology::default();
        topo.register_node(NodeId::new(0), "lsr0", Ipv4Addr::new(10, 0, 0, 1));

        assert_eq!(mk_node(0, Some("lsr0")).validate(&topo, true), Ok(()));
        assert_eq!(
            mk_node(1, Some("lsr0")).validate(&topo, true),
            Err(ConfigError::NameAlreadyUsed)
        );
    }

    #[test]
    fn node_record_round_trips() {
        let desc = mk_node(3, Some("lsr3"));
        let parsed = NodeDesc::from_record(&desc.to_record()).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("lsr3"));
        assert_eq!(parsed.switching_power, desc.switching_power);
        assert_eq!(parsed.nr_ports, desc.nr_ports);
    }

    #[test]
    fn short_record_is_rejected() {
        assert_eq!(
            NodeDesc::from_record("node#1#lsr1"),
            Err(ConfigError::MalformedRecord {
                expected: NODE_RECORD_FIELDS,
                found: 3,
            })
        );
    }

    #[test]
    fn link_record_resolves_endpoints_against_the_topology() {
        let mut topo = Topology::default();
        topo.register_node(NodeId::new(0), "lsr0", Ipv4Addr::new(10, 0, 0, 1));
        topo.register_node(NodeId::new(1), "lsr1", Ipv4Addr::new(10, 0, 0, 2));

        let desc = LinkDesc {
            id: 0,
            name: Some("l0".to_owned()),
            kind: LinkKind::Internal,
            delay: Nanosecs::new(500),
            end_a: (Ipv4Addr::new(10, 0, 0, 1), 1),
            end_b: (Ipv4Addr::new(10, 0, 0, 2), 0),
            show_name: true,
        };
        let record = desc.to_record();
        assert!(LinkDesc::from_record(&record, &topo).is_ok());

        // An endpoint that no longer resolves rejects the whole record.
        let stale = record.replace("10.0.0.2", "10.0.0.9");
        assert_eq!(
            LinkDesc::from_record(&stale, &topo),
            Err(ConfigError::UnknownEndpoint(Ipv4Addr::new(10, 0, 0, 9)))
        );
    }
}

use std::net::Ipv4Addr;

use rustc_hash::FxHashMap;

use crate::{ident::identifier, port::PortId};

identifier!(NodeId);
identifier!(LinkId);

/// What sits on the far side of a (node, port) pair.
#[derive(Debug, Copy, Clone, derive_new::new)]
pub(crate) struct Attachment {
    pub(crate) link: LinkId,
    pub(crate) peer: NodeId,
    pub(crate) peer_port: PortId,
}

/// The collaborator the engines query for addressing and next-hop answers.
///
/// Route entries are static; computing them is someone else's job.
#[derive(Debug, Default)]
pub struct Topology {
    names: FxHashMap<String, NodeId>,
    addresses: FxHashMap<Ipv4Addr, NodeId>,
    node_addresses: FxHashMap<NodeId, Ipv4Addr>,
    link_names: FxHashMap<String, LinkId>,
    attachments: FxHashMap<(NodeId, PortId), Attachment>,
    routes: FxHashMap<(NodeId, Ipv4Addr), PortId>,
}

impl Topology {
    pub(crate) fn register_node(&mut self, id: NodeId, name: &str, address: Ipv4Addr) {
        self.names.insert(name.to_owned(), id);
        self.addresses.insert(address, id);
        self.node_addresses.insert(id, address);
    }

    pub(crate) fn register_link(
        &mut self,
        id: LinkId,
        name: Option<&str>,
        a: (NodeId, PortId),
        b: (NodeId, PortId),
    ) {
        if let Some(name) = name {
            self.link_names.insert(name.to_owned(), id);
        }
        self.attachments
            .insert(a, Attachment::new(id, b.0, b.1));
        self.attachments
            .insert(b, Attachment::new(id, a.0, a.1));
    }

    pub(crate) fn add_route(&mut self, node: NodeId, dst: Ipv4Addr, port: PortId) {
        self.routes.insert((node, dst), port);
    }

    /// The egress port toward `dst` from `node`, if a route is configured.
    pub(crate) fn next_hop(&self, node: NodeId, dst: Ipv4Addr) -> Option<PortId> {
        self.routes.get(&(node, dst)).copied()
    }

    pub(crate) fn attachment(&self, node: NodeId, port: PortId) -> Option<&Attachment> {
        self.attachments.get(&(node, port))
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn node_by_address(&self, address: Ipv4Addr) -> Option<NodeId> {
        self.addresses.get(&address).copied()
    }

    pub(crate) fn address_of(&self, node: NodeId) -> Option<Ipv4Addr> {
        self.node_addresses.get(&node).copied()
    }

    pub(crate) fn link_by_name(&self, name: &str) -> Option<LinkId> {
        self.link_names.get(name).copied()
    }

    /// Whether `name` already names a node other than `excluding`.
    pub fn name_in_use(&self, name: &str, excluding: Option<NodeId>) -> bool {
        match self.names.get(name) {
            Some(&owner) => excluding != Some(owner),
            None => false,
        }
    }

    pub(crate) fn link_name_in_use(&self, name: &str, excluding: Option<LinkId>) -> bool {
        match self.link_names.get(name) {
            Some(&owner) => excluding != Some(owner),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_in_use_relaxes_for_the_owner() {
        let mut topo = Topology::default();
        topo.register_node(NodeId::new(0), "lsr0", Ipv4Addr::new(10, 0, 0, 1));
        assert!(topo.name_in_use("lsr0", None));
        assert!(!topo.name_in_use("lsr0", Some(NodeId::new(0))));
        assert!(topo.name_in_use("lsr0", Some(NodeId::new(1))));
        assert!(!topo.name_in_use("lsr1", None));
    }

    #[test]
    fn attachments_are_symmetric() {
        let mut topo = Topology::default();
        let a = (NodeId::new(0), PortId::new(1));
        let b = (NodeId::new(1), PortId::new(0));
        topo.register_link(LinkId::new(0), Some("l0"), a, b);

        let att = topo.attachment(a.0, a.1).unwrap();
        assert_eq!(att.peer, b.0);
        assert_eq!(att.peer_port, b.1);
        let att = topo.attachment(b.0, b.1).unwrap();
        assert_eq!(att.peer, a.0);
    }
}

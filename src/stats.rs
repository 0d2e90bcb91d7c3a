use std::net::Ipv4Addr;

use rustc_hash::FxHashMap;

use crate::{
    packet::PacketClass,
    topology::{LinkId, NodeId},
};

/// Which way a packet crossed the node boundary.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Direction {
    In,
    Out,
    Discard,
}

/// The per-run statistics sink. Every packet entering, leaving, or discarded
/// at a node lands here exactly once; aggregation is entirely this side's
/// responsibility.
#[derive(Debug, Default)]
pub struct Stats {
    counts: FxHashMap<(NodeId, PacketClass, Direction), u64>,
}

impl Stats {
    pub(crate) fn classify(&mut self, node: NodeId, class: PacketClass, direction: Direction) {
        *self.counts.entry((node, class, direction)).or_insert(0) += 1;
    }

    pub(crate) fn into_records(self) -> Vec<Record> {
        let mut records: Vec<_> = self
            .counts
            .into_iter()
            .map(|((node, class, direction), count)| Record {
                node,
                class,
                direction,
                count,
            })
            .collect();
        records.sort_by_key(|r| (r.node, r.class, r.direction));
        records
    }
}

#[cfg(test)]
impl Stats {
    pub(crate) fn count(&self, node: NodeId, class: PacketClass, direction: Direction) -> u64 {
        self.counts
            .get(&(node, class, direction))
            .copied()
            .unwrap_or(0)
    }
}

/// One aggregated counter at the end of a run.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Record {
    /// The node the packets crossed.
    pub node: NodeId,
    pub class: PacketClass,
    pub direction: Direction,
    pub count: u64,
}

/// Events a visualizer would subscribe to; collected in order of emission.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Notice {
    /// An in-flight packet advanced; `pct` is its transit completion.
    Transit { link: LinkId, pct: u8 },
    LinkDown(LinkId),
    LinkRecovered(LinkId),
    /// An in-flight packet was flushed when its link went down.
    TransitDiscard { link: LinkId, endpoint: NodeId },
    /// A payload left the simulated domain at `node`.
    Delivered { node: NodeId, dst: Ipv4Addr },
}

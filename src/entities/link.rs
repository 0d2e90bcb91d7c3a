use log::debug;

use crate::{
    config::LinkKind,
    packet::Packet,
    port::PortId,
    stats::{Direction, Notice, Stats},
    time::Tic,
    topology::{LinkId, NodeId},
    units::Nanosecs,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum End {
    A,
    B,
}

#[derive(Debug, Copy, Clone, derive_new::new)]
pub(crate) struct Endpoint {
    pub(crate) node: NodeId,
    pub(crate) port: PortId,
}

/// A packet somewhere along the wire.
#[derive(Debug, derive_new::new)]
pub(crate) struct Transit {
    pub(crate) pkt: Packet,
    pub(crate) to: End,
    pub(crate) remaining: Nanosecs,
}

/// A bidirectional transit channel between two ports.
///
/// Time on the wire is modeled cooperatively: each tic shaves the clock's
/// delta off every in-flight packet and delivers whatever reached zero.
#[derive(Debug, typed_builder::TypedBuilder)]
pub(crate) struct Link {
    pub(crate) id: LinkId,
    kind: LinkKind,
    #[builder(setter(into))]
    delay: Nanosecs,
    a: Endpoint,
    b: Endpoint,
    #[builder(default, setter(skip))]
    in_flight: Vec<Transit>,
    #[builder(default = false, setter(skip))]
    down: bool,
    #[builder(default, setter(skip))]
    active_lsps: u64,
    #[builder(default, setter(skip))]
    backup_lsps: u64,
    #[builder(default, setter(skip))]
    enqueued: u64,
    #[builder(default, setter(skip))]
    delivered: u64,
}

impl Link {
    fn endpoint(&self, end: End) -> Endpoint {
        match end {
            End::A => self.a,
            End::B => self.b,
        }
    }

    /// Accepts a packet from one of the attached nodes.
    pub(crate) fn receive(&mut self, from: NodeId, pkt: Packet) {
        debug_assert!(!self.down, "transmission onto a dead link");
        debug_assert!(from == self.a.node || from == self.b.node);
        let to = if from == self.a.node { End::B } else { End::A };
        self.enqueued += 1;
        self.in_flight.push(Transit::new(pkt, to, self.delay));
    }

    /// Advances every in-flight packet and hands back the arrivals as
    /// (node, port, packet) deliveries.
    #[must_use]
    pub(crate) fn tic(
        &mut self,
        tic: &Tic,
        notices: &mut Vec<Notice>,
    ) -> Vec<(NodeId, PortId, Packet)> {
        if self.down {
            return Vec::new();
        }
        let delta = tic.delta().into_nanos();
        for transit in &mut self.in_flight {
            transit.remaining = transit.remaining.saturating_sub(delta);
            let pct = if self.delay == Nanosecs::ZERO {
                100
            } else {
                let done = self.delay - transit.remaining;
                (done.into_u64() * 100 / self.delay.into_u64()) as u8
            };
            notices.push(Notice::Transit { link: self.id, pct });
        }
        let mut arrived = Vec::new();
        let mut still = Vec::with_capacity(self.in_flight.len());
        for transit in std::mem::take(&mut self.in_flight) {
            if transit.remaining == Nanosecs::ZERO {
                self.delivered += 1;
                let ep = self.endpoint(transit.to);
                arrived.push((ep.node, ep.port, transit.pkt));
            } else {
                still.push(transit);
            }
        }
        self.in_flight = still;
        arrived
    }

    /// Takes the link down: everything on the wire is flushed, one discard
    /// per addressed endpoint, and the paths over it no longer count.
    pub(crate) fn set_down(&mut self, stats: &mut Stats, notices: &mut Vec<Notice>) {
        if self.down {
            return;
        }
        self.down = true;
        for transit in std::mem::take(&mut self.in_flight) {
            let ep = self.endpoint(transit.to);
            stats.classify(ep.node, transit.pkt.class(), Direction::Discard);
            notices.push(Notice::TransitDiscard {
                link: self.id,
                endpoint: ep.node,
            });
        }
        self.active_lsps = 0;
        self.backup_lsps = 0;
        debug!("link {} down", self.id);
        notices.push(Notice::LinkDown(self.id));
    }

    /// Brings the link back. Nothing is replayed; adjacent nodes simply
    /// start using it again.
    pub(crate) fn set_up(&mut self, notices: &mut Vec<Notice>) {
        if !self.down {
            return;
        }
        self.down = false;
        debug!("link {} recovered", self.id);
        notices.push(Notice::LinkRecovered(self.id));
    }

    pub(crate) fn is_down(&self) -> bool {
        self.down
    }

    pub(crate) fn grant_lsp(&mut self, backup: bool) {
        if self.kind != LinkKind::Internal {
            return;
        }
        if backup {
            self.backup_lsps += 1;
        } else {
            self.active_lsps += 1;
        }
    }

    // Saturating: a link that went down has already zeroed its counters,
    // and late teardown acknowledgments must not underflow them.
    pub(crate) fn release_lsp(&mut self, backup: bool) {
        if self.kind != LinkKind::Internal {
            return;
        }
        if backup {
            self.backup_lsps = self.backup_lsps.saturating_sub(1);
        } else {
            self.active_lsps = self.active_lsps.saturating_sub(1);
        }
    }

    /// A backup path just carried its first packet; it now counts as active.
    pub(crate) fn activate_backup(&mut self) {
        if self.kind != LinkKind::Internal {
            return;
        }
        self.backup_lsps = self.backup_lsps.saturating_sub(1);
        self.active_lsps += 1;
    }

    /// Routing weight exposed to path computation, which lives outside the
    /// engine. External links are judged by delay alone; internal links
    /// blend in endpoint congestion and load.
    #[allow(dead_code)]
    pub(crate) fn routing_weight(&self, weight_a: u64, weight_b: u64) -> u64 {
        let delay = self.delay.into_u64();
        match self.kind {
            LinkKind::External => delay,
            LinkKind::Internal => {
                delay
                    + (weight_a + weight_b) / 10
                    + 100 * (self.active_lsps + self.backup_lsps)
                    + 10 * self.in_flight.len() as u64
            }
        }
    }
}

#[cfg(test)]
impl Link {
    pub(crate) fn active_lsps(&self) -> u64 {
        self.active_lsps
    }

    pub(crate) fn backup_lsps(&self) -> u64 {
        self.backup_lsps
    }

    pub(crate) fn enqueued(&self) -> u64 {
        self.enqueued
    }

    pub(crate) fn delivered(&self) -> u64 {
        self.delivered
    }

    pub(crate) fn in_flight(&self) -> &[Transit] {
        &self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use crate::{
        time::{Delta, Time},
        units::Octets,
    };

    use super::*;

    fn mk_link(delay: u64) -> Link {
        Link::builder()
            .id(LinkId::new(0))
            .kind(LinkKind::Internal)
            .delay(Nanosecs::new(delay))
            .a(Endpoint::new(NodeId::new(0), PortId::new(1)))
            .b(Endpoint::new(NodeId::new(1), PortId::new(0)))
            .build()
    }

    fn mk_pkt() -> Packet {
        Packet::native(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            Octets::new(512),
        )
    }

    fn mk_tic(delta: u128) -> Tic {
        Tic::new(Delta::new(delta), Time::new(delta))
    }

    #[test]
    fn delivers_after_the_propagation_delay() {
        let mut link = mk_link(1_000);
        let mut notices = Vec::new();
        link.receive(NodeId::new(0), mk_pkt());

        let arrived = link.tic(&mk_tic(600), &mut notices);
        assert!(arrived.is_empty());
        assert_eq!(notices, vec![Notice::Transit { link: link.id, pct: 60 }]);

        let arrived = link.tic(&mk_tic(600), &mut notices);
        assert_eq!(arrived.len(), 1);
        let (node, port, _) = &arrived[0];
        assert_eq!(*node, NodeId::new(1));
        assert_eq!(*port, PortId::new(0));
    }

    #[test]
    fn conserves_packets() {
        let mut link = mk_link(100);
        let mut notices = Vec::new();
        for _ in 0..3 {
            link.receive(NodeId::new(1), mk_pkt());
        }
        let arrived = link.tic(&mk_tic(100), &mut notices);
        assert_eq!(arrived.len(), 3);
        assert_eq!(link.enqueued(), 3);
        assert_eq!(link.delivered(), 3);
        assert!(link.in_flight().is_empty());
    }

    #[test]
    fn going_down_flushes_the_wire() {
        let mut link = mk_link(1_000);
        let mut stats = Stats::default();
        let mut notices = Vec::new();
        link.receive(NodeId::new(0), mk_pkt());
        link.receive(NodeId::new(1), mk_pkt());
        link.grant_lsp(false);

        link.set_down(&mut stats, &mut notices);
        assert!(link.is_down());
        assert!(link.in_flight().is_empty());
        assert_eq!(link.active_lsps(), 0);
        let discards = notices
            .iter()
            .filter(|n| matches!(n, Notice::TransitDiscard { .. }))
            .count();
        assert_eq!(discards, 2);
        assert!(notices.contains(&Notice::LinkDown(link.id)));

        // A second set_down is a no-op.
        let before = notices.len();
        link.set_down(&mut stats, &mut notices);
        assert_eq!(notices.len(), before);
    }

    #[test]
    fn release_saturates_after_down() {
        let mut link = mk_link(100);
        let mut stats = Stats::default();
        let mut notices = Vec::new();
        link.grant_lsp(false);
        link.set_down(&mut stats, &mut notices);
        link.release_lsp(false);
        assert_eq!(link.active_lsps(), 0);
    }

    #[test]
    fn weight_reflects_load_on_internal_links() {
        let mut link = mk_link(500);
        assert_eq!(link.routing_weight(0, 0), 500);
        link.grant_lsp(false);
        link.grant_lsp(true);
        link.receive(NodeId::new(0), mk_pkt());
        assert_eq!(link.routing_weight(40, 20), 500 + 6 + 200 + 10);
    }
}

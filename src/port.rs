use crate::{ident::identifier, packet::Packet, queue::Fifo, units::Octets};

identifier!(PortId);

/// The ingress/egress buffers of one node: a fixed set of ports sharing a
/// single octet budget.
///
/// Ports are created once at node construction and live as long as the node.
/// Backlog doubles as the congestion measure.
#[derive(Debug)]
pub(crate) struct PortSet {
    ports: Vec<Fifo>,
    capacity: Octets,
    occupancy: Octets,
    rr_next: usize,
}

impl PortSet {
    pub(crate) fn new(nr_ports: usize, capacity: Octets) -> Self {
        assert!(nr_ports > 0);
        assert!(capacity > Octets::ZERO);
        Self {
            ports: (0..nr_ports).map(|_| Fifo::new()).collect(),
            capacity,
            occupancy: Octets::ZERO,
            rr_next: 0,
        }
    }

    pub(crate) fn nr_ports(&self) -> usize {
        self.ports.len()
    }

    pub(crate) fn has_traffic(&self) -> bool {
        self.ports.iter().any(|q| !q.is_empty())
    }

    /// Backlog as a percentage of the shared budget.
    pub(crate) fn congestion_percent(&self) -> u64 {
        self.occupancy.into_u64() * 100 / self.capacity.into_u64()
    }

    /// Appends a packet to a port, or hands it back when the shared budget
    /// is exhausted. The caller decides what the rejection counts as.
    pub(crate) fn enqueue(&mut self, port: PortId, pkt: Packet) -> Result<(), Packet> {
        if self.occupancy + pkt.size > self.capacity {
            return Err(pkt);
        }
        self.occupancy += pkt.size;
        self.ports[port.into_usize()].enqueue(pkt);
        Ok(())
    }

    // Ports are drained in rotating order; fairness advances only when a
    // packet is actually taken.
    fn next_nonempty(&self) -> Option<usize> {
        let n = self.ports.len();
        (0..n)
            .map(|i| (self.rr_next + i) % n)
            .find(|&idx| !self.ports[idx].is_empty())
    }

    /// The port and size of the packet `dequeue_next` would take.
    pub(crate) fn peek_next(&self) -> Option<(PortId, Octets)> {
        let idx = self.next_nonempty()?;
        let pkt = self.ports[idx].peek().unwrap();
        Some((PortId::new(idx), pkt.size))
    }

    pub(crate) fn dequeue_next(&mut self) -> Option<(PortId, Packet)> {
        let idx = self.next_nonempty()?;
        let pkt = self.ports[idx].dequeue().unwrap();
        self.occupancy -= pkt.size;
        self.rr_next = (idx + 1) % self.ports.len();
        Some((PortId::new(idx), pkt))
    }
}

#[cfg(test)]
impl PortSet {
    pub(crate) fn occupancy(&self) -> Octets {
        self.occupancy
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    fn mk_pkt(size: u64) -> Packet {
        Packet::native(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            Octets::new(size),
        )
    }

    #[test]
    fn empty_set_yields_nothing() {
        let ports = PortSet::new(4, Octets::new(1_000));
        assert!(ports.peek_next().is_none());
        assert!(!ports.has_traffic());
    }

    #[test]
    fn full_buffer_rejects_at_the_boundary() {
        let mut ports = PortSet::new(2, Octets::new(1_000));
        assert!(ports.enqueue(PortId::new(0), mk_pkt(800)).is_ok());
        assert!(ports.enqueue(PortId::new(1), mk_pkt(300)).is_err());
        // The rejection leaves occupancy untouched.
        assert_eq!(ports.occupancy(), Octets::new(800));
        assert!(ports.enqueue(PortId::new(1), mk_pkt(200)).is_ok());
    }

    #[test]
    fn drains_ports_round_robin() {
        let mut ports = PortSet::new(3, Octets::new(10_000));
        for _ in 0..2 {
            ports.enqueue(PortId::new(0), mk_pkt(10)).unwrap();
            ports.enqueue(PortId::new(2), mk_pkt(10)).unwrap();
        }
        let order: Vec<_> = std::iter::from_fn(|| ports.dequeue_next())
            .map(|(port, _)| port.into_usize())
            .collect();
        assert_eq!(order, vec![0, 2, 0, 2]);
        assert_eq!(ports.occupancy(), Octets::ZERO);
    }

    #[test]
    fn congestion_tracks_occupancy() {
        let mut ports = PortSet::new(1, Octets::new(1_000));
        ports.enqueue(PortId::new(0), mk_pkt(250)).unwrap();
        assert_eq!(ports.congestion_percent(), 25);
    }
}

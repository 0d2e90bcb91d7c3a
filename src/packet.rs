use std::net::Ipv4Addr;

use smallvec::SmallVec;

use crate::{
    ident::{identifier, SessionId},
    units::Octets,
};

identifier!(FlowId);

/// An MPLS label value.
///
/// Values below [`Label::MIN`] are reserved; the simulator uses the
/// service-class label and implicit null from that range.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    PartialEq,
    Eq,
    Hash,
    derive_more::Display,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Label(u32);

impl Label {
    /// Prepended on top of the stack to mark service-differentiated traffic.
    pub const SERVICE: Label = Label::new(1);
    /// Advertised by the egress of a path: pop and forward, no outgoing label.
    pub const IMPLICIT_NULL: Label = Label::new(3);
    /// First unreserved label value.
    pub const MIN: Label = Label::new(16);
    /// Labels occupy a 20-bit space.
    pub const MAX: Label = Label::new(0xF_FFFF);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub const fn is_reserved(self) -> bool {
        self.0 < Self::MIN.0
    }
}

/// One level of a packet's label stack.
#[derive(Debug, Copy, Clone, PartialEq, Eq, derive_new::new)]
pub struct LabelEntry {
    pub label: Label,
    pub bos: bool,
    pub ttl: u8,
}

// Stacks are shallow in practice; four levels covers service class plus
// nested tunnels without spilling to the heap.
pub type LabelStack = SmallVec<[LabelEntry; 4]>;

/// Addressing common to every packet class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, derive_new::new)]
pub struct Header {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TldpKind {
    Request,
    LabelOk,
    LabelNo,
    Withdraw,
    WithdrawOk,
}

/// Which way a signaling message travels along the path being built.
///
/// `Downstream` messages (toward the tail) carry the sender's own session id
/// and are correlated at the receiver by predecessor id and arrival port.
/// `Upstream` messages carry the receiver's own session id.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Heading {
    Downstream,
    Upstream,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, derive_new::new)]
pub struct Tldp {
    pub kind: TldpKind,
    pub session: SessionId,
    pub fec: Ipv4Addr,
    pub label: Option<Label>,
    pub heading: Heading,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GpsrpKind {
    Request,
    Granted,
    Denied,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, derive_new::new)]
pub struct Gpsrp {
    pub kind: GpsrpKind,
    pub flow: FlowId,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Labeled (or, at the head of a path, still-unlabeled) user data.
    /// `ttl` is the payload's own time-to-live, consulted when the first
    /// label is pushed.
    Mpls { stack: LabelStack, ttl: u8 },
    Tldp(Tldp),
    Gpsrp(Gpsrp),
}

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
pub enum PacketClass {
    Mpls,
    Tldp,
    Gpsrp,
}

/// A packet in transit through the simulated network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub size: Octets,
    pub payload: Payload,
}

impl Packet {
    /// Signaling messages are fixed-size.
    pub const SZ_TLDP: Octets = Octets::new(56);
    pub const SZ_GPSRP: Octets = Octets::new(56);
    /// Time-to-live given to a payload entering the domain.
    pub const TTL_FRESH: u8 = 255;

    pub fn mpls(src: Ipv4Addr, dst: Ipv4Addr, size: Octets, stack: LabelStack, ttl: u8) -> Self {
        Self {
            header: Header::new(src, dst),
            size,
            payload: Payload::Mpls { stack, ttl },
        }
    }

    /// An unlabeled payload as it arrives at the head of a path.
    pub fn native(src: Ipv4Addr, dst: Ipv4Addr, size: Octets) -> Self {
        Self::mpls(src, dst, size, LabelStack::new(), Self::TTL_FRESH)
    }

    pub fn tldp(src: Ipv4Addr, dst: Ipv4Addr, tldp: Tldp) -> Self {
        Self {
            header: Header::new(src, dst),
            size: Self::SZ_TLDP,
            payload: Payload::Tldp(tldp),
        }
    }

    pub fn gpsrp(src: Ipv4Addr, dst: Ipv4Addr, gpsrp: Gpsrp) -> Self {
        Self {
            header: Header::new(src, dst),
            size: Self::SZ_GPSRP,
            payload: Payload::Gpsrp(gpsrp),
        }
    }

    pub fn class(&self) -> PacketClass {
        match self.payload {
            Payload::Mpls { .. } => PacketClass::Mpls,
            Payload::Tldp(_) => PacketClass::Tldp,
            Payload::Gpsrp(_) => PacketClass::Gpsrp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_label_space() {
        assert!(Label::SERVICE.is_reserved());
        assert!(Label::IMPLICIT_NULL.is_reserved());
        assert!(!Label::MIN.is_reserved());
    }

    #[test]
    fn native_packets_start_unlabeled() {
        let pkt = Packet::native(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            Octets::new(1_024),
        );
        assert_eq!(pkt.class(), PacketClass::Mpls);
        match pkt.payload {
            Payload::Mpls { ref stack, ttl } => {
                assert!(stack.is_empty());
                assert_eq!(ttl, Packet::TTL_FRESH);
            }
            _ => unreachable!(),
        }
    }
}

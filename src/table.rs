use std::net::Ipv4Addr;

use rustc_hash::FxHashMap;

use crate::{
    ident::SessionId,
    packet::Label,
    port::PortId,
    units::Nanosecs,
};

/// How long an unanswered request or withdraw waits before a resend.
pub(crate) const TLDP_TIMEOUT: Nanosecs = Nanosecs::new(50_000);
/// Resends allowed after the first transmission.
pub(crate) const TLDP_ATTEMPTS: u32 = 3;

/// The signaling state of an entry's outgoing label.
///
/// An entry either sits in one of the sentinel states or holds the concrete
/// label granted by the next hop; the enum makes any other combination
/// unrepresentable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EgressLabel {
    Undefined,
    Requesting,
    Denied,
    Withdrawing,
    Granted(Label),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LabelOp {
    Noop,
    Push,
    Pop,
    Swap,
}

/// What an entry is looked up by on the data path: the incoming label for
/// entries in the middle of a path, or the forwarding-equivalence class
/// (the destination) at the head, where packets are still unlabeled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntryKey {
    Label(Label),
    Fec(Ipv4Addr),
}

/// One path segment through a node.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub(crate) struct SwitchingEntry {
    pub(crate) ingress: PortId,
    pub(crate) key: EntryKey,
    /// The incoming label this node advertised upstream, if any.
    #[builder(default, setter(strip_option))]
    pub(crate) local_label: Option<Label>,
    #[builder(default, setter(strip_option))]
    pub(crate) egress: Option<PortId>,
    #[builder(default = EgressLabel::Undefined)]
    pub(crate) egress_label: EgressLabel,
    pub(crate) op: LabelOp,
    pub(crate) session: SessionId,
    #[builder(default, setter(strip_option))]
    pub(crate) predecessor: Option<SessionId>,
    pub(crate) fec: Ipv4Addr,
    #[builder(default = false)]
    pub(crate) is_backup: bool,
    // Latched by the first swap through a backup entry.
    #[builder(default = false)]
    pub(crate) backup_live: bool,
    // Set once the granted label has been counted on the egress link, so
    // teardown releases exactly what establishment took.
    #[builder(default = false)]
    pub(crate) counted: bool,
    #[builder(default = TLDP_ATTEMPTS)]
    pub(crate) attempts_left: u32,
    #[builder(default = Nanosecs::ZERO)]
    pub(crate) timeout: Nanosecs,
    /// Port an unacknowledged withdraw went out of, awaiting its ack.
    #[builder(default)]
    pub(crate) pending_withdraw: Option<PortId>,
}

impl SwitchingEntry {
    pub(crate) fn arm_timeout(&mut self) {
        self.timeout = TLDP_TIMEOUT;
        self.attempts_left = TLDP_ATTEMPTS;
    }
}

/// The per-node map from (ingress port, key) to path segments.
///
/// Owned by exactly one node and only mutated during that node's tic, so a
/// create-if-absent followed by a state transition is atomic: two packets of
/// the same new flow cannot race into duplicate sessions.
#[derive(Debug, Default)]
pub(crate) struct SwitchingTable {
    entries: FxHashMap<(PortId, EntryKey), SwitchingEntry>,
}

impl SwitchingTable {
    pub(crate) fn lookup(&self, port: PortId, key: EntryKey) -> Option<&SwitchingEntry> {
        self.entries.get(&(port, key))
    }

    /// Correlates replies and withdraws arriving from downstream.
    pub(crate) fn lookup_by_session(&mut self, id: SessionId) -> Option<&mut SwitchingEntry> {
        self.entries.values_mut().find(|e| e.session == id)
    }

    /// Correlates requests and withdraws arriving from upstream.
    pub(crate) fn lookup_by_predecessor(
        &mut self,
        id: SessionId,
        port: PortId,
    ) -> Option<&mut SwitchingEntry> {
        self.entries
            .values_mut()
            .find(|e| e.predecessor == Some(id) && e.ingress == port)
    }

    pub(crate) fn insert(&mut self, entry: SwitchingEntry) {
        let prev = self.entries.insert((entry.ingress, entry.key), entry);
        debug_assert!(prev.is_none(), "duplicate switching entry");
    }

    pub(crate) fn remove_by_session(&mut self, id: SessionId) -> Option<SwitchingEntry> {
        let key = self
            .entries
            .iter()
            .find(|(_, e)| e.session == id)
            .map(|(k, _)| *k)?;
        self.entries.remove(&key)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &SwitchingEntry> {
        self.entries.values()
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut SwitchingEntry> {
        self.entries.values_mut()
    }
}

#[cfg(test)]
impl SwitchingTable {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Per-node allocator for the incoming labels advertised upstream.
///
/// The 20-bit label space is finite; running out aborts the run instead of
/// reusing live labels.
#[derive(Debug)]
pub(crate) struct LabelPool {
    next: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("label space exhausted")]
pub struct LabelExhausted;

impl Default for LabelPool {
    fn default() -> Self {
        Self {
            next: Label::MIN.value(),
        }
    }
}

impl LabelPool {
    pub(crate) fn next_label(&mut self) -> Result<Label, LabelExhausted> {
        if self.next > Label::MAX.value() {
            return Err(LabelExhausted);
        }
        let label = Label::new(self.next);
        self.next += 1;
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_entry(port: usize, key: EntryKey, session: usize) -> SwitchingEntry {
        SwitchingEntry::builder()
            .ingress(PortId::new(port))
            .key(key)
            .op(LabelOp::Swap)
            .session(SessionId::new(session))
            .fec(Ipv4Addr::new(10, 0, 0, 9))
            .build()
    }

    #[test]
    fn lookup_is_keyed_by_port_and_label() {
        let mut table = SwitchingTable::default();
        let key = EntryKey::Label(Label::new(16));
        table.insert(mk_entry(0, key, 1));
        assert!(table.lookup(PortId::new(0), key).is_some());
        assert!(table.lookup(PortId::new(1), key).is_none());
        assert!(table
            .lookup(PortId::new(0), EntryKey::Label(Label::new(17)))
            .is_none());
    }

    #[test]
    fn correlates_by_session_and_predecessor() {
        let mut table = SwitchingTable::default();
        let mut entry = mk_entry(2, EntryKey::Label(Label::new(20)), 7);
        entry.predecessor = Some(SessionId::new(3));
        table.insert(entry);

        assert!(table.lookup_by_session(SessionId::new(7)).is_some());
        assert!(table.lookup_by_session(SessionId::new(3)).is_none());
        assert!(table
            .lookup_by_predecessor(SessionId::new(3), PortId::new(2))
            .is_some());
        // The predecessor id only matches on the port it arrived from.
        assert!(table
            .lookup_by_predecessor(SessionId::new(3), PortId::new(0))
            .is_none());
    }

    #[test]
    fn remove_by_session_is_idempotent() {
        let mut table = SwitchingTable::default();
        table.insert(mk_entry(0, EntryKey::Label(Label::new(16)), 4));
        assert!(table.remove_by_session(SessionId::new(4)).is_some());
        assert!(table.remove_by_session(SessionId::new(4)).is_none());
    }

    #[test]
    fn label_pool_stops_at_the_end_of_the_space() {
        let mut pool = LabelPool {
            next: Label::MAX.value(),
        };
        assert_eq!(pool.next_label(), Ok(Label::MAX));
        assert_eq!(pool.next_label(), Err(LabelExhausted));
    }
}

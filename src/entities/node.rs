use std::net::Ipv4Addr;

use log::{debug, trace, warn};

use crate::{
    config::Caps,
    driver::Error,
    ident::SessionId,
    packet::{
        Header, Heading, Label, LabelEntry, LabelStack, Packet, PacketClass, Payload, Tldp,
        TldpKind,
    },
    port::{PortId, PortSet},
    simulation::Context,
    stats::{Direction, Notice, Stats},
    table::{
        EgressLabel, EntryKey, LabelOp, LabelPool, SwitchingEntry, SwitchingTable, TLDP_TIMEOUT,
    },
    time::Tic,
    topology::NodeId,
    units::{Mbps, Nanosecs, Octets},
};

/// A label-switching node: one port set, one switching table, and a rated
/// amount of switching work per unit of time.
#[derive(Debug, typed_builder::TypedBuilder)]
pub(crate) struct Node {
    pub(crate) id: NodeId,
    pub(crate) address: Ipv4Addr,
    caps: Caps,
    switching_power: Mbps,
    pub(crate) ports: PortSet,
    #[builder(default, setter(skip))]
    pub(crate) table: SwitchingTable,
    #[builder(default, setter(skip))]
    labels: LabelPool,
    // Switching credit carried over while traffic is backlogged.
    #[builder(default = Nanosecs::ZERO, setter(skip))]
    avail: Nanosecs,
    #[builder(default, setter(skip))]
    tics_without_emission: u64,
}

impl Node {
    /// A packet crossing into this node, from a link or from outside the
    /// simulation. A full buffer discards at the boundary instead of
    /// blocking the sender.
    pub(crate) fn deliver(&mut self, port: PortId, pkt: Packet, stats: &mut Stats) {
        let class = pkt.class();
        match self.ports.enqueue(port, pkt) {
            Ok(()) => stats.classify(self.id, class, Direction::In),
            Err(_) => stats.classify(self.id, class, Direction::Discard),
        }
    }

    /// Congestion doubles as this node's contribution to the routing
    /// weights path computation reads off the adjacent links.
    #[allow(dead_code)]
    pub(crate) fn routing_weight(&self) -> u64 {
        self.ports.congestion_percent()
    }

    /// Consecutive tics in which nothing left the node; nonzero values with
    /// backlogged ports flag a stall to whoever watches the run.
    #[allow(dead_code)]
    pub(crate) fn tics_without_emission(&self) -> u64 {
        self.tics_without_emission
    }

    pub(crate) fn tic(&mut self, tic: &Tic, ctx: &mut Context) -> Result<(), Error> {
        trace!("node {} tic at {}", self.id, ctx.now);
        let delta = tic.delta().into_nanos();
        if self.ports.has_traffic() {
            self.avail += delta;
        } else {
            // An idle node does not hoard switching credit.
            self.avail = delta;
            self.tics_without_emission = 0;
        }
        self.sweep_link_health(ctx);
        self.sweep_timeouts(delta, ctx);
        let emitted = self.forward(ctx)?;
        if emitted {
            self.tics_without_emission = 0;
        } else {
            self.tics_without_emission += 1;
        }
        Ok(())
    }

    // ===== per-tic sweeps =====

    fn port_link_down(&self, port: PortId, ctx: &Context) -> bool {
        ctx.topology
            .attachment(self.id, port)
            .map(|att| ctx.links[&att.link].is_down())
            .unwrap_or(false)
    }

    /// Entries whose ingress or egress link died start a withdraw toward
    /// the opposite side of the path.
    fn sweep_link_health(&mut self, ctx: &mut Context) {
        let mut teardowns: Vec<(SessionId, Option<PortId>)> = Vec::new();
        for e in self.table.entries() {
            if e.egress_label == EgressLabel::Withdrawing {
                continue;
            }
            let egress_down = e
                .egress
                .map(|p| self.port_link_down(p, ctx))
                .unwrap_or(false);
            if egress_down {
                teardowns.push((e.session, e.predecessor.is_some().then_some(e.ingress)));
            } else if self.port_link_down(e.ingress, ctx) {
                teardowns.push((e.session, e.egress));
            }
        }
        for (session, toward) in teardowns {
            debug!("node {}: link failure tears down session {session}", self.id);
            self.start_withdraw(session, toward, ctx);
        }
    }

    /// Cooperative timeouts: pending requests and withdraws age by the tic
    /// delta, resend while retries remain, and give up after that.
    fn sweep_timeouts(&mut self, delta: Nanosecs, ctx: &mut Context) {
        enum Expiry {
            Resend,
            GiveUp,
        }
        let mut expiries = Vec::new();
        for e in self.table.entries_mut() {
            if !matches!(
                e.egress_label,
                EgressLabel::Requesting | EgressLabel::Withdrawing
            ) {
                continue;
            }
            e.timeout = e.timeout.saturating_sub(delta);
            if e.timeout != Nanosecs::ZERO {
                continue;
            }
            if e.attempts_left > 0 {
                e.attempts_left -= 1;
                e.timeout = TLDP_TIMEOUT;
                expiries.push((e.session, Expiry::Resend));
            } else {
                expiries.push((e.session, Expiry::GiveUp));
            }
        }
        for (session, expiry) in expiries {
            let Some(e) = self.table.lookup_by_session(session) else {
                continue;
            };
            let (state, ingress, egress, pending, predecessor, own, fec) = (
                e.egress_label,
                e.ingress,
                e.egress,
                e.pending_withdraw,
                e.predecessor,
                e.session,
                e.fec,
            );
            match (expiry, state) {
                (Expiry::Resend, EgressLabel::Requesting) => {
                    if let Some(port) = egress {
                        trace!("node {}: request resend for session {session}", self.id);
                        self.send_tldp(
                            port,
                            TldpKind::Request,
                            own,
                            fec,
                            None,
                            Heading::Downstream,
                            ctx,
                        );
                    }
                }
                (Expiry::Resend, EgressLabel::Withdrawing) => {
                    if let Some(port) = pending {
                        let (sid, heading) = if port == ingress {
                            match predecessor {
                                Some(p) => (p, Heading::Upstream),
                                None => continue,
                            }
                        } else {
                            (own, Heading::Downstream)
                        };
                        trace!("node {}: withdraw resend for session {session}", self.id);
                        self.send_tldp(port, TldpKind::Withdraw, sid, fec, None, heading, ctx);
                    }
                }
                (Expiry::GiveUp, EgressLabel::Requesting) => {
                    debug!("node {}: request for session {session} denied after retries", self.id);
                    if let Some(e) = self.table.lookup_by_session(session) {
                        e.egress_label = EgressLabel::Denied;
                    }
                }
                (Expiry::GiveUp, EgressLabel::Withdrawing) => {
                    debug!("node {}: withdraw for session {session} abandoned", self.id);
                    self.remove_entry(session, ctx);
                }
                _ => {}
            }
        }
    }

    // ===== forwarding =====

    /// Drains as much backlog as the switching budget covers, dispatching
    /// by packet class. Whatever the budget does not cover waits for the
    /// next tic; nothing is dropped for lack of time.
    fn forward(&mut self, ctx: &mut Context) -> Result<bool, Error> {
        let mut emitted = false;
        while let Some((_, size)) = self.ports.peek_next() {
            let cost = self.switching_power.time_to_switch(size);
            if cost > self.avail {
                break;
            }
            let (port, pkt) = self.ports.dequeue_next().expect("peeked packet vanished");
            let sent = match pkt.class() {
                PacketClass::Mpls => self.handle_mpls(port, pkt, ctx)?,
                PacketClass::Tldp => self.handle_tldp(port, pkt, ctx)?,
                PacketClass::Gpsrp => self.handle_gpsrp(pkt, ctx),
            };
            emitted |= sent;
            self.avail = self.avail.saturating_sub(cost);
        }
        Ok(emitted)
    }

    fn discard(&mut self, class: PacketClass, ctx: &mut Context) {
        ctx.stats.classify(self.id, class, Direction::Discard);
    }

    /// Puts a packet onto the link behind `port`. A port with no attachment
    /// is the edge of the simulated world; the packet is counted out and
    /// reported as delivered.
    fn transmit(&mut self, port: PortId, pkt: Packet, ctx: &mut Context) -> bool {
        match ctx.topology.attachment(self.id, port) {
            Some(att) => {
                let link = ctx
                    .links
                    .get_mut(&att.link)
                    .expect("attachment to unknown link");
                if link.is_down() {
                    ctx.stats.classify(self.id, pkt.class(), Direction::Discard);
                    return false;
                }
                ctx.stats.classify(self.id, pkt.class(), Direction::Out);
                link.receive(self.id, pkt);
                true
            }
            None => {
                ctx.stats.classify(self.id, pkt.class(), Direction::Out);
                ctx.notices.push(Notice::Delivered {
                    node: self.id,
                    dst: pkt.header.dst,
                });
                true
            }
        }
    }

    fn send_tldp(
        &mut self,
        port: PortId,
        kind: TldpKind,
        session: SessionId,
        fec: Ipv4Addr,
        label: Option<Label>,
        heading: Heading,
        ctx: &mut Context,
    ) -> bool {
        let peer = match ctx.topology.attachment(self.id, port) {
            Some(att) => att.peer,
            None => {
                self.discard(PacketClass::Tldp, ctx);
                return false;
            }
        };
        let Some(dst) = ctx.topology.address_of(peer) else {
            self.discard(PacketClass::Tldp, ctx);
            return false;
        };
        let pkt = Packet::tldp(self.address, dst, Tldp::new(kind, session, fec, label, heading));
        self.transmit(port, pkt, ctx)
    }

    // ===== the label-swap data path =====

    fn handle_mpls(&mut self, port: PortId, pkt: Packet, ctx: &mut Context) -> Result<bool, Error> {
        let Payload::Mpls { mut stack, ttl } = pkt.payload else {
            unreachable!()
        };
        let header = pkt.header;
        let size = pkt.size;

        // The service-class label rides on top, invisible to the switching
        // decision, and is restored on the way out.
        let service = match stack.last() {
            Some(top) if top.label == Label::SERVICE => stack.pop(),
            _ => None,
        };
        let key = match stack.last() {
            Some(top) => EntryKey::Label(top.label),
            None => EntryKey::Fec(header.dst),
        };

        let found = self.table.lookup(port, key).map(|e| {
            (
                e.session,
                e.egress_label,
                e.egress,
                e.op,
                e.is_backup,
                e.backup_live,
            )
        });
        let Some((session, state, egress, op, is_backup, backup_live)) = found else {
            if self.caps.edge && matches!(key, EntryKey::Fec(_)) {
                return self.admit_flow(port, key, header, size, stack, ttl, service, ctx);
            }
            self.discard(PacketClass::Mpls, ctx);
            return Ok(false);
        };

        match state {
            EgressLabel::Undefined => {
                self.solicit(session, ctx);
                self.hold(port, header, size, stack, ttl, service, ctx);
                Ok(false)
            }
            EgressLabel::Requesting => {
                self.hold(port, header, size, stack, ttl, service, ctx);
                Ok(false)
            }
            EgressLabel::Denied | EgressLabel::Withdrawing => {
                self.discard(PacketClass::Mpls, ctx);
                Ok(false)
            }
            EgressLabel::Granted(out) => {
                match op {
                    LabelOp::Push => {
                        let inherited = stack.last().map(|top| top.ttl).unwrap_or(ttl);
                        let bos = stack.is_empty();
                        stack.push(LabelEntry::new(out, bos, inherited.saturating_sub(1)));
                    }
                    LabelOp::Pop => {
                        stack.pop();
                    }
                    LabelOp::Swap => {
                        let top = stack.last_mut().expect("swap on an empty stack");
                        top.label = out;
                        top.ttl = top.ttl.saturating_sub(1);
                    }
                    LabelOp::Noop => {}
                }
                if op == LabelOp::Swap && is_backup && !backup_live {
                    self.activate_backup(session, egress, ctx);
                }
                if let Some(sv) = service {
                    stack.push(LabelEntry::new(sv.label, false, sv.ttl));
                }
                let out_pkt = Packet::mpls(header.src, header.dst, size, stack, ttl);
                match egress {
                    Some(p) => Ok(self.transmit(p, out_pkt, ctx)),
                    None => {
                        // The path ends here; the payload leaves the domain.
                        ctx.stats.classify(self.id, PacketClass::Mpls, Direction::Out);
                        ctx.notices.push(Notice::Delivered {
                            node: self.id,
                            dst: header.dst,
                        });
                        Ok(true)
                    }
                }
            }
        }
    }

    /// First packet of a flow with no path yet: one entry is synthesized at
    /// the head, a label request goes downstream, and the packet waits in
    /// its ingress queue.
    #[allow(clippy::too_many_arguments)]
    fn admit_flow(
        &mut self,
        port: PortId,
        key: EntryKey,
        header: Header,
        size: Octets,
        stack: LabelStack,
        ttl: u8,
        service: Option<LabelEntry>,
        ctx: &mut Context,
    ) -> Result<bool, Error> {
        let Some(egress) = ctx.topology.next_hop(self.id, header.dst) else {
            self.discard(PacketClass::Mpls, ctx);
            return Ok(false);
        };
        let session = ctx.sessions.next_id()?;
        let entry = SwitchingEntry::builder()
            .ingress(port)
            .key(key)
            .egress(egress)
            .op(LabelOp::Push)
            .session(session)
            .fec(header.dst)
            .build();
        debug!(
            "node {}: new flow toward {} admitted as session {session}",
            self.id, header.dst
        );
        self.table.insert(entry);
        self.solicit(session, ctx);
        self.hold(port, header, size, stack, ttl, service, ctx);
        Ok(false)
    }

    /// Moves an entry into `Requesting` and asks the next hop for a label.
    fn solicit(&mut self, session: SessionId, ctx: &mut Context) {
        let Some(e) = self.table.lookup_by_session(session) else {
            return;
        };
        e.egress_label = EgressLabel::Requesting;
        e.arm_timeout();
        let (mut egress, fec, own) = (e.egress, e.fec, e.session);
        if egress.is_none() {
            egress = ctx.topology.next_hop(self.id, fec);
            if let Some(port) = egress {
                if let Some(e) = self.table.lookup_by_session(session) {
                    e.egress = Some(port);
                }
            }
        }
        match egress {
            Some(port) => {
                self.send_tldp(port, TldpKind::Request, own, fec, None, Heading::Downstream, ctx);
            }
            None => warn!("node {}: no next hop toward {fec}", self.id),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn hold(
        &mut self,
        port: PortId,
        header: Header,
        size: Octets,
        mut stack: LabelStack,
        ttl: u8,
        service: Option<LabelEntry>,
        ctx: &mut Context,
    ) {
        if let Some(sv) = service {
            stack.push(LabelEntry::new(sv.label, false, sv.ttl));
        }
        let pkt = Packet::mpls(header.src, header.dst, size, stack, ttl);
        if self.ports.enqueue(port, pkt).is_err() {
            ctx.stats.classify(self.id, PacketClass::Mpls, Direction::Discard);
        }
    }

    fn activate_backup(&mut self, session: SessionId, egress: Option<PortId>, ctx: &mut Context) {
        if let Some(e) = self.table.lookup_by_session(session) {
            e.backup_live = true;
        }
        if let Some(port) = egress {
            if let Some(att) = ctx.topology.attachment(self.id, port) {
                let link = ctx
                    .links
                    .get_mut(&att.link)
                    .expect("attachment to unknown link");
                link.activate_backup();
            }
        }
    }

    // ===== the signaling state machine =====

    fn handle_tldp(&mut self, port: PortId, pkt: Packet, ctx: &mut Context) -> Result<bool, Error> {
        let Payload::Tldp(t) = pkt.payload else {
            unreachable!()
        };
        match t.kind {
            TldpKind::Request => self.on_request(port, t, ctx),
            TldpKind::LabelOk => Ok(self.on_label_ok(t, ctx)),
            TldpKind::LabelNo => Ok(self.on_label_no(t, ctx)),
            TldpKind::Withdraw => Ok(self.on_withdraw(port, t, ctx)),
            TldpKind::WithdrawOk => Ok(self.on_withdraw_ok(port, t, ctx)),
        }
    }

    fn on_request(&mut self, port: PortId, t: Tldp, ctx: &mut Context) -> Result<bool, Error> {
        let found = self
            .table
            .lookup_by_predecessor(t.session, port)
            .map(|e| (e.session, e.egress_label, e.local_label));
        let Some((session, state, local)) = found else {
            return self.accept_request(port, t, ctx);
        };
        match state {
            // Our own request is still pending; the requester waits with us.
            EgressLabel::Requesting => Ok(false),
            EgressLabel::Undefined => {
                self.solicit(session, ctx);
                Ok(true)
            }
            EgressLabel::Denied => Ok(self.send_tldp(
                port,
                TldpKind::LabelNo,
                t.session,
                t.fec,
                None,
                Heading::Upstream,
                ctx,
            )),
            EgressLabel::Granted(_) => {
                let label = local.expect("granted entry without a local label");
                Ok(self.send_tldp(
                    port,
                    TldpKind::LabelOk,
                    t.session,
                    t.fec,
                    Some(label),
                    Heading::Upstream,
                    ctx,
                ))
            }
            EgressLabel::Withdrawing => Ok(self.send_tldp(
                port,
                TldpKind::Withdraw,
                t.session,
                t.fec,
                None,
                Heading::Upstream,
                ctx,
            )),
        }
    }

    /// A request with no entry yet: allocate the label we advertise
    /// upstream and either grant (path ends here), forward the request
    /// (interior), or deny (no route).
    fn accept_request(&mut self, port: PortId, t: Tldp, ctx: &mut Context) -> Result<bool, Error> {
        let local = self.labels.next_label()?;
        let session = ctx.sessions.next_id()?;
        let builder = SwitchingEntry::builder()
            .ingress(port)
            .key(EntryKey::Label(local))
            .local_label(local)
            .session(session)
            .predecessor(t.session)
            .fec(t.fec);

        let is_tail = t.fec == self.address;
        let next_hop = ctx.topology.next_hop(self.id, t.fec);
        let exits_domain = next_hop
            .map(|p| ctx.topology.attachment(self.id, p).is_none())
            .unwrap_or(false);

        if is_tail || exits_domain {
            let mut entry = builder
                .op(LabelOp::Pop)
                .egress_label(EgressLabel::Granted(Label::IMPLICIT_NULL))
                .build();
            if !is_tail {
                entry.egress = next_hop;
            }
            self.table.insert(entry);
            debug!("node {}: granted label {local} for {}", self.id, t.fec);
            Ok(self.send_tldp(
                port,
                TldpKind::LabelOk,
                t.session,
                t.fec,
                Some(local),
                Heading::Upstream,
                ctx,
            ))
        } else if let Some(nh) = next_hop {
            let entry = builder.op(LabelOp::Swap).egress(nh).build();
            self.table.insert(entry);
            self.solicit(session, ctx);
            Ok(true)
        } else {
            let entry = builder
                .op(LabelOp::Noop)
                .egress_label(EgressLabel::Denied)
                .build();
            self.table.insert(entry);
            debug!("node {}: no route toward {}, label denied", self.id, t.fec);
            Ok(self.send_tldp(
                port,
                TldpKind::LabelNo,
                t.session,
                t.fec,
                None,
                Heading::Upstream,
                ctx,
            ))
        }
    }

    fn on_label_ok(&mut self, t: Tldp, ctx: &mut Context) -> bool {
        let found = self.table.lookup_by_session(t.session).map(|e| e.egress_label);
        let (Some(EgressLabel::Requesting), Some(granted)) = (found, t.label) else {
            // A reply for a session that cannot accept it: an expected race
            // under failures and retries, not an error.
            self.discard(PacketClass::Tldp, ctx);
            return false;
        };
        let e = self
            .table
            .lookup_by_session(t.session)
            .expect("entry vanished mid-handling");
        e.egress_label = EgressLabel::Granted(granted);
        e.counted = true;
        let (egress, is_backup, ingress, predecessor, local, fec) = (
            e.egress,
            e.is_backup,
            e.ingress,
            e.predecessor,
            e.local_label,
            e.fec,
        );
        debug!("node {}: session {} granted label {granted}", self.id, t.session);
        if let Some(port) = egress {
            if let Some(att) = ctx.topology.attachment(self.id, port) {
                let link = ctx
                    .links
                    .get_mut(&att.link)
                    .expect("attachment to unknown link");
                link.grant_lsp(is_backup);
            }
        }
        match predecessor {
            Some(pred) => {
                let label = local.expect("mid-path entry without a local label");
                self.send_tldp(
                    ingress,
                    TldpKind::LabelOk,
                    pred,
                    fec,
                    Some(label),
                    Heading::Upstream,
                    ctx,
                )
            }
            None => false,
        }
    }

    fn on_label_no(&mut self, t: Tldp, ctx: &mut Context) -> bool {
        let found = self.table.lookup_by_session(t.session).map(|e| e.egress_label);
        let Some(EgressLabel::Requesting) = found else {
            self.discard(PacketClass::Tldp, ctx);
            return false;
        };
        let e = self
            .table
            .lookup_by_session(t.session)
            .expect("entry vanished mid-handling");
        e.egress_label = EgressLabel::Denied;
        let (ingress, predecessor, fec) = (e.ingress, e.predecessor, e.fec);
        debug!("node {}: session {} denied downstream", self.id, t.session);
        match predecessor {
            Some(pred) => self.send_tldp(
                ingress,
                TldpKind::LabelNo,
                pred,
                fec,
                None,
                Heading::Upstream,
                ctx,
            ),
            None => false,
        }
    }

    fn on_withdraw(&mut self, port: PortId, t: Tldp, ctx: &mut Context) -> bool {
        let found = match t.heading {
            Heading::Downstream => self.table.lookup_by_predecessor(t.session, port),
            Heading::Upstream => self.table.lookup_by_session(t.session),
        }
        .map(|e| (e.session, e.egress_label, e.ingress, e.egress, e.predecessor));
        let Some((session, state, ingress, egress, predecessor)) = found else {
            self.discard(PacketClass::Tldp, ctx);
            return false;
        };

        // Acknowledge toward the sender unconditionally.
        let sent = match t.heading {
            Heading::Downstream => self.send_tldp(
                port,
                TldpKind::WithdrawOk,
                t.session,
                t.fec,
                None,
                Heading::Upstream,
                ctx,
            ),
            Heading::Upstream => self.send_tldp(
                port,
                TldpKind::WithdrawOk,
                session,
                t.fec,
                None,
                Heading::Downstream,
                ctx,
            ),
        };
        if state == EgressLabel::Withdrawing {
            // Already tearing down; the duplicate only needed its ack.
            return sent;
        }
        let toward = match t.heading {
            Heading::Downstream => egress,
            Heading::Upstream => predecessor.is_some().then_some(ingress),
        };
        self.start_withdraw(session, toward, ctx);
        true
    }

    fn on_withdraw_ok(&mut self, port: PortId, t: Tldp, ctx: &mut Context) -> bool {
        let found = match t.heading {
            Heading::Upstream => self.table.lookup_by_session(t.session),
            Heading::Downstream => self.table.lookup_by_predecessor(t.session, port),
        }
        .map(|e| (e.session, e.egress_label));
        let Some((session, EgressLabel::Withdrawing)) = found else {
            self.discard(PacketClass::Tldp, ctx);
            return false;
        };
        debug!("node {}: session {session} withdrawn", self.id);
        self.remove_entry(session, ctx);
        false
    }

    /// Marks an entry withdrawing and sends the withdraw out `toward`, or
    /// removes the entry outright when there is nobody left to tell.
    fn start_withdraw(&mut self, session: SessionId, toward: Option<PortId>, ctx: &mut Context) {
        let Some(e) = self.table.lookup_by_session(session) else {
            return;
        };
        e.egress_label = EgressLabel::Withdrawing;
        e.arm_timeout();
        e.pending_withdraw = toward;
        let (ingress, predecessor, own, fec) = (e.ingress, e.predecessor, e.session, e.fec);
        match toward {
            Some(port) => {
                let (sid, heading) = if port == ingress {
                    match predecessor {
                        Some(p) => (p, Heading::Upstream),
                        None => {
                            self.remove_entry(session, ctx);
                            return;
                        }
                    }
                } else {
                    (own, Heading::Downstream)
                };
                self.send_tldp(port, TldpKind::Withdraw, sid, fec, None, heading, ctx);
            }
            None => self.remove_entry(session, ctx),
        }
    }

    /// Deletes an entry, returning what establishment counted on the
    /// downstream link. Safe to call twice: the second call finds nothing.
    fn remove_entry(&mut self, session: SessionId, ctx: &mut Context) {
        let Some(e) = self.table.remove_by_session(session) else {
            return;
        };
        if !e.counted {
            return;
        }
        if let Some(port) = e.egress {
            if let Some(att) = ctx.topology.attachment(self.id, port) {
                let link = ctx
                    .links
                    .get_mut(&att.link)
                    .expect("attachment to unknown link");
                link.release_lsp(e.is_backup && !e.backup_live);
            }
        }
    }

    // ===== retransmission-request relay =====

    /// An LSR is never a retransmission endpoint; it either relays one hop
    /// toward the target or drops the packet.
    fn handle_gpsrp(&mut self, pkt: Packet, ctx: &mut Context) -> bool {
        if pkt.header.dst == self.address {
            self.discard(PacketClass::Gpsrp, ctx);
            return false;
        }
        match ctx.topology.next_hop(self.id, pkt.header.dst) {
            Some(port) => self.transmit(port, pkt, ctx),
            None => {
                self.discard(PacketClass::Gpsrp, ctx);
                false
            }
        }
    }
}

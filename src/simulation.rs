pub(crate) mod event;
mod schedule;

use log::trace;
use rustc_hash::FxHashMap;

use crate::{
    driver::{Error, Summary},
    entities::{link::Link, node::Node},
    ident::SessionIdGen,
    packet::Packet,
    port::PortId,
    stats::{Notice, Stats},
    time::{Delta, Tic, Time},
    topology::{LinkId, NodeId, Topology},
};

use self::schedule::Schedule;

/// The run itself: every node and link, one clock, one schedule.
///
/// Each clock tic is broadcast to all links and then all nodes, in
/// ascending id order, before the next event is considered. Entities only
/// interact by appending packets to link buffers, so a tic never blocks on
/// another entity mid-step.
#[derive(Debug, typed_builder::TypedBuilder)]
pub(crate) struct Simulation {
    // Run-time
    #[builder(default, setter(skip))]
    cur_time: Time,
    #[builder(default, setter(skip))]
    schedule: Schedule,

    // Entities
    nodes: FxHashMap<NodeId, Node>,
    links: FxHashMap<LinkId, Link>,
    topology: Topology,

    // Observers and id spaces owned by the run
    #[builder(default, setter(skip))]
    stats: Stats,
    #[builder(default, setter(skip))]
    sessions: SessionIdGen,
    #[builder(default, setter(skip))]
    notices: Vec<Notice>,

    // Clock configuration
    tic: Delta,
    horizon: Time,

    #[builder(default, setter(skip))]
    node_order: Vec<NodeId>,
    #[builder(default, setter(skip))]
    link_order: Vec<LinkId>,
}

impl Simulation {
    /// Queues a scenario event (injection, outage) before or during a run.
    pub(crate) fn seed(&mut self, at: Time, cmd: impl Into<Command>) -> Result<(), Error> {
        self.schedule.push(at, cmd)?;
        Ok(())
    }

    pub(crate) fn run(mut self) -> Result<Summary, Error> {
        self.node_order = {
            let mut ids: Vec<_> = self.nodes.keys().copied().collect();
            ids.sort();
            ids
        };
        self.link_order = {
            let mut ids: Vec<_> = self.links.keys().copied().collect();
            ids.sort();
            ids
        };
        // Kick off the clock
        self.schedule.push(Time::ZERO, ClockCmd::new_tic())?;
        while !self.should_stop() {
            self.step()?;
        }
        Ok(Summary {
            records: self.stats.into_records(),
            notices: self.notices,
        })
    }

    fn should_stop(&self) -> bool {
        self.schedule.is_empty() || self.cur_time > self.horizon
    }

    fn step(&mut self) -> Result<(), Error> {
        let next = self.schedule.pop().expect("stepped an empty schedule");
        let (time, cmd) = (next.time(), next.cmd);
        assert!(self.cur_time <= time);
        self.cur_time = time;
        self.apply(cmd)
    }

    fn apply(&mut self, cmd: Command) -> Result<(), Error> {
        match cmd {
            Command::Clock(ClockCmd::Tic) => self.apply_tic(),
            Command::Link(cmd) => {
                self.apply_link(cmd);
                Ok(())
            }
            Command::Node(cmd) => {
                self.apply_node(cmd);
                Ok(())
            }
            Command::Test => unreachable!(),
        }
    }

    fn apply_tic(&mut self) -> Result<(), Error> {
        let tic = Tic::new(self.tic, self.cur_time + self.tic);
        trace!("tic at {}", self.cur_time);

        // Links age their in-flight packets and deliver arrivals first, so
        // a node sees this tic's arrivals in this tic's forwarding pass.
        let mut deliveries = Vec::new();
        for idx in 0..self.link_order.len() {
            let id = self.link_order[idx];
            let link = self.links.get_mut(&id).expect("unknown link id");
            deliveries.extend(link.tic(&tic, &mut self.notices));
        }
        for (node, port, pkt) in deliveries {
            let node = self.nodes.get_mut(&node).expect("delivery to unknown node");
            node.deliver(port, pkt, &mut self.stats);
        }

        for idx in 0..self.node_order.len() {
            let id = self.node_order[idx];
            let node = self.nodes.get_mut(&id).expect("unknown node id");
            let mut ctx = Context {
                now: self.cur_time,
                topology: &self.topology,
                links: &mut self.links,
                stats: &mut self.stats,
                sessions: &mut self.sessions,
                notices: &mut self.notices,
            };
            node.tic(&tic, &mut ctx)?;
        }

        let next = self.cur_time + self.tic;
        if next < self.horizon {
            self.schedule.push(next, ClockCmd::new_tic())?;
        }
        Ok(())
    }

    fn apply_link(&mut self, cmd: LinkCmd) {
        match cmd {
            LinkCmd::Down { link } => {
                self.links
                    .get_mut(&link)
                    .expect("outage for unknown link")
                    .set_down(&mut self.stats, &mut self.notices);
            }
            LinkCmd::Up { link } => {
                self.links
                    .get_mut(&link)
                    .expect("recovery for unknown link")
                    .set_up(&mut self.notices);
            }
        }
    }

    fn apply_node(&mut self, cmd: NodeCmd) {
        match cmd {
            NodeCmd::Inject { node, port, pkt } => {
                self.nodes
                    .get_mut(&node)
                    .expect("injection at unknown node")
                    .deliver(port, pkt, &mut self.stats);
            }
        }
    }
}

#[derive(Debug, Clone, derive_more::From)]
pub(crate) enum Command {
    Clock(ClockCmd),
    Link(LinkCmd),
    Node(NodeCmd),
    #[allow(unused)]
    Test,
}

#[derive(Debug, Clone, derive_new::new)]
pub(crate) enum ClockCmd {
    Tic,
}

#[derive(Debug, Clone, derive_new::new)]
pub(crate) enum LinkCmd {
    Down { link: LinkId },
    Up { link: LinkId },
}

#[derive(Debug, Clone, derive_new::new)]
pub(crate) enum NodeCmd {
    Inject {
        node: NodeId,
        port: PortId,
        pkt: Packet,
    },
}

/// What one node sees of the rest of the world during its tic: the
/// topology to query, the links to put packets on, and the run-owned
/// observers and id spaces.
#[derive(Debug)]
pub(crate) struct Context<'a> {
    pub(crate) now: Time,
    pub(crate) topology: &'a Topology,
    pub(crate) links: &'a mut FxHashMap<LinkId, Link>,
    pub(crate) stats: &'a mut Stats,
    pub(crate) sessions: &'a mut SessionIdGen,
    pub(crate) notices: &'a mut Vec<Notice>,
}

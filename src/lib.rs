pub mod driver;
pub mod time;
pub mod units;

pub(crate) mod config;
pub(crate) mod entities;
pub(crate) mod ident;
pub(crate) mod packet;
pub(crate) mod port;
pub(crate) mod queue;
pub(crate) mod simulation;
pub(crate) mod stats;
pub(crate) mod table;
pub(crate) mod topology;

pub use config::{ConfigError, LinkDesc, LinkKind, NodeDesc, NodeKind};
pub use driver::{read_config, run, Config, Error, Injection, Outage, RouteDesc, Summary};
pub use ident::{Exhausted, SessionId};
pub use packet::{
    FlowId, Gpsrp, GpsrpKind, Header, Heading, Label, LabelEntry, LabelStack, Packet, PacketClass,
    Payload, Tldp, TldpKind,
};
pub use port::PortId;
pub use stats::{Direction, Notice, Record};
pub use table::{EgressLabel, EntryKey, LabelExhausted, LabelOp};
pub use topology::{LinkId, NodeId, Topology};

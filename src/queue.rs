use std::collections::VecDeque;

use crate::packet::Packet;

#[derive(Debug, Default, derive_new::new)]
pub(crate) struct Fifo {
    #[new(default)]
    inner: VecDeque<Packet>,
}

impl Fifo {
    delegate::delegate! {
        to self.inner {
            #[call(push_back)]
            pub(crate) fn enqueue(&mut self, pkt: Packet);

            #[call(pop_front)]
            pub(crate) fn dequeue(&mut self) -> Option<Packet>;

            #[call(front)]
            pub(crate) fn peek(&self) -> Option<&Packet>;

            pub(crate) fn is_empty(&self) -> bool;
        }
    }
}

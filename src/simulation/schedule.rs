use std::collections::BinaryHeap;

use delegate::delegate;

use crate::{ident::Exhausted, time::Time};

use super::{event::Event, Command};

#[derive(Debug, Default)]
pub(crate) struct Schedule {
    inner: BinaryHeap<Event>,
    next_seq: u64,
}

impl Schedule {
    /// Event ids are finite like every other id space; running out aborts
    /// the run instead of wrapping.
    pub(crate) fn push(&mut self, time: Time, cmd: impl Into<Command>) -> Result<(), Exhausted> {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.checked_add(1).ok_or(Exhausted)?;
        self.inner.push(Event::new(time, seq, cmd));
        Ok(())
    }

    delegate! {
        to self.inner {
            pub(crate) fn pop(&mut self) -> Option<Event>;
            pub(crate) fn is_empty(&self) -> bool;
        }
    }
}

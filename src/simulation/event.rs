#![allow(clippy::non_canonical_partial_ord_impl)]

use std::cmp::Reverse;

use crate::time::Time;

use super::Command;

#[derive(Debug, derivative::Derivative)]
#[derivative(PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Event {
    time: Reverse<Time>,
    // FIFO among events sharing a time.
    seq: Reverse<u64>,
    #[derivative(PartialEq = "ignore", PartialOrd = "ignore", Ord = "ignore")]
    pub(crate) cmd: Command,
}

impl Event {
    pub(crate) fn new(time: Time, seq: u64, cmd: impl Into<Command>) -> Self {
        Self {
            time: Reverse(time),
            seq: Reverse(seq),
            cmd: cmd.into(),
        }
    }

    pub(crate) fn time(&self) -> Time {
        self.time.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_order() {
        let e1 = Event::new(Time::ZERO, 0, Command::Test);
        let e2 = Event::new(Time::ONE, 1, Command::Test);
        assert!(e1 > e2);
    }

    #[test]
    fn same_time_is_fifo() {
        let e1 = Event::new(Time::ONE, 0, Command::Test);
        let e2 = Event::new(Time::ONE, 1, Command::Test);
        assert!(e1 > e2);
    }
}

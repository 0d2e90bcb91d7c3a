use crate::time::{Delta, Time};

macro_rules! unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            derive_more::Display,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);
            pub const MAX: $name = Self::new(u64::MAX);

            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn into_u64(self) -> u64 {
                self.0
            }

            pub const fn into_f64(self) -> f64 {
                self.0 as f64
            }

            pub const fn into_usize(self) -> usize {
                self.0 as usize
            }

            pub fn scale_by(self, val: f64) -> Self {
                let inner = self.0 as f64 * val;
                Self(inner.round() as u64)
            }

            pub const fn checked_div(self, rhs: u64) -> Option<Self> {
                if rhs == 0 {
                    None
                } else {
                    Some(Self::new(self.0 / rhs))
                }
            }

            pub const fn saturating_sub(self, rhs: Self) -> Self {
                Self::new(self.0.saturating_sub(rhs.0))
            }
        }
    };
}

unit!(Nanosecs);

impl Nanosecs {
    pub fn into_time(self) -> Time {
        Time::new(u128::from(self.0))
    }

    pub fn into_delta(self) -> Delta {
        Delta::new(u128::from(self.0))
    }
}

unit!(Octets);
unit!(Bits);

impl Octets {
    pub fn into_bits(self) -> Bits {
        Bits::new(self.0 * 8)
    }
}

impl From<Octets> for Bits {
    fn from(val: Octets) -> Self {
        val.into_bits()
    }
}

unit!(Mbps);

impl Mbps {
    /// Time needed to switch `size` octets at this rate, rounded up.
    ///
    /// One Mbps is 10^-3 bits per nanosecond, so switching a packet takes
    /// `octets * 8_000 / mbps` nanoseconds.
    pub fn time_to_switch(&self, size: Octets) -> Nanosecs {
        assert!(*self != Mbps::ZERO);
        if size == Octets::ZERO {
            return Nanosecs::ZERO;
        }
        let bits = size.into_u64() * 8;
        let ns = (bits * 1_000).div_ceil(self.0);
        Nanosecs::new(ns)
    }

    /// How many whole octets fit in `delta` at this rate.
    pub fn octets_within(&self, delta: Nanosecs) -> Octets {
        if delta == Nanosecs::ZERO {
            return Octets::ZERO;
        }
        Octets::new(delta.into_u64() * self.0 / 8_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_time_to_switch() {
        let rate = Mbps::new(10);
        let size = Octets::new(1_000);
        assert_eq!(rate.time_to_switch(size), Nanosecs::new(800_000));
    }

    #[test]
    fn rate_octets_within() {
        let rate = Mbps::new(10);
        let delta = Nanosecs::new(800_000);
        assert_eq!(rate.octets_within(delta), Octets::new(1_000));
    }

    #[test]
    fn rate_rounds_against_the_sender() {
        // Switching time rounds up, budget width rounds down.
        let rate = Mbps::new(3);
        let size = Octets::new(100);
        let t = rate.time_to_switch(size);
        assert!(rate.octets_within(t) >= size);
        assert!(rate.octets_within(t.saturating_sub(Nanosecs::ONE)) < size);
    }
}

macro_rules! identifier {
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
            derive_more::Display,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(usize);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);
            pub const MAX: $name = Self::new(usize::MAX);

            pub const fn new(value: usize) -> Self {
                Self(value)
            }

            pub fn from_usize(val: usize) -> Self {
                Self(val)
            }

            pub fn into_usize(self) -> usize {
                self.0 as usize
            }
        }
    };
}

pub(crate) use identifier;

identifier!(SessionId);

/// Identifier spaces are finite and exhaustion is fatal for the run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identifier space exhausted")]
pub struct Exhausted;

/// Hands out signaling-session identifiers for one simulation run.
///
/// Owned by the run and passed explicitly to whoever needs ids; `next_id`
/// fails instead of wrapping around.
#[derive(Debug, Default)]
pub struct SessionIdGen {
    next: usize,
}

impl SessionIdGen {
    pub(crate) fn next_id(&mut self) -> Result<SessionId, Exhausted> {
        let next = self.next.checked_add(1).ok_or(Exhausted)?;
        let id = SessionId::new(self.next);
        self.next = next;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_sequential() {
        let mut gen = SessionIdGen::default();
        assert_eq!(gen.next_id().unwrap(), SessionId::new(0));
        assert_eq!(gen.next_id().unwrap(), SessionId::new(1));
    }

    #[test]
    fn session_ids_fail_instead_of_wrapping() {
        let mut gen = SessionIdGen {
            next: usize::MAX,
        };
        assert_eq!(gen.next_id(), Err(Exhausted));
    }
}

//! Random arm assignment.
//!
//! RULE: Nothing in the crate calls a platform RNG directly.
//! All randomness flows through an AssignmentRng so a run with a fixed
//! seed assigns participants identically every time.

use crate::types::GroupName;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

pub struct AssignmentRng {
    inner: Pcg64Mcg,
}

impl AssignmentRng {
    /// Deterministic stream derived from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Seeded from the OS; used when no seed is configured.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::new(s),
            None => Self::from_entropy(),
        }
    }

    /// Draw one random byte.
    pub fn next_byte(&mut self) -> u8 {
        use rand::RngCore;
        (self.inner.next_u32() >> 24) as u8
    }

    /// Fair coin between the two arms.
    pub fn pick_group(&mut self) -> GroupName {
        if self.next_byte() < 128 {
            GroupName::Test
        } else {
            GroupName::Control
        }
    }
}

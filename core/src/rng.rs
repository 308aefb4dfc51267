//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through PathRng instances derived from the
//! master seed in the engine configuration.
//!
//! Every simulated path owns one stream per pipeline stage, seeded from
//! (master_seed, path_key, stage slot). This means:
//!   - Paths can be simulated on any thread in any order.
//!   - Adding a new stage never changes existing stages' streams.
//!   - A path is fully reproducible in isolation.

use rand::{Rng, RngCore, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64Mcg;

/// SplitMix64 finaliser. Spreads nearby integers over the full u64 range.
pub fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// A named, deterministic RNG for one stage of one path.
pub struct PathRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl PathRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Uniform integer in [lo, hi). Returns `lo` for an empty range.
    pub fn int_range(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..hi)
    }

    /// One draw from N(0, 1).
    pub fn standard_normal(&mut self) -> f64 {
        self.inner.sample(StandardNormal)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Derives every stream of a run from one master seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Key identifying path `index` within the stream family `family`
    /// (a scenario key, or a candidate key during calibration).
    pub fn path_key(&self, family: u64, index: u64) -> u64 {
        mix(self.master_seed ^ mix(family)) ^ mix(index.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    pub fn for_stage(&self, path_key: u64, slot: StreamSlot) -> PathRng {
        PathRng::from_seed(mix(path_key ^ (slot as u64).wrapping_mul(0xd1b5_4a32_d192_ed03)))
            .with_name(slot.name())
    }
}

/// Stable stage slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every stage's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Diffusion = 0,
    CrisisSchedule = 1,
    Envelope = 2,
    // Add new stages here, append only.
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Diffusion => "diffusion",
            Self::CrisisSchedule => "crisis_schedule",
            Self::Envelope => "envelope",
        }
    }
}

//! Namespace hashing for per-launch metadata lookup.
//!
//! Launches identify their bound agent function, message types, and birth
//! target by combining name hashes rather than registering entries in a
//! central table. The combined key is carried in the per-launch argument
//! bundle and compared against the metadata the host staged for that
//! launch; it has no lifecycle beyond one launch.

use std::fmt;

/// Collision-resistant integer key derived from a name.
///
/// Computed with 64-bit FNV-1a. Keys for distinct roles of the same launch
/// (function, inbound message, outbound message, birth target) are combined
/// with [`NamespaceHash::combine`]; the all-zero hash means "role absent"
/// (e.g. a function with no inbound message binding).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceHash(pub u64);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl NamespaceHash {
    /// The absent-role hash.
    pub const NONE: NamespaceHash = NamespaceHash(0);

    /// Hash a name with 64-bit FNV-1a.
    pub fn of(name: &str) -> Self {
        let mut h = FNV_OFFSET;
        for byte in name.as_bytes() {
            h ^= u64::from(*byte);
            h = h.wrapping_mul(FNV_PRIME);
        }
        Self(h)
    }

    /// Hash an instance identifier (distinguishes concurrent simulations).
    pub fn of_instance(instance: u64) -> Self {
        Self::of(&format!("instance:{instance}"))
    }

    /// Combine two role hashes into one lookup key.
    ///
    /// Combination is wrapping addition, so `a.combine(b) == b.combine(a)`
    /// and combining with [`NamespaceHash::NONE`] is the identity.
    pub fn combine(self, other: NamespaceHash) -> Self {
        Self(self.0.wrapping_add(other.0))
    }

    /// Returns `true` if this is the absent-role hash.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NamespaceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

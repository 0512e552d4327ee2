//! Typesafe bitmask composition.
//!
//! Vulkan expresses many parameters as integer bitmasks. `ash` already ships
//! typed flags for every native mask; this module provides the same veneer
//! for the crate's own tag enums, so a set of enumerators can be composed,
//! queried, and handed to the raw layer without losing the tag type.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr, BitOrAssign, BitXor, Not};

/// Raw integer representations a flag set can wrap.
pub trait Bits:
    Copy
    + Eq
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
{
    /// The empty mask.
    const EMPTY: Self;
}

impl Bits for u32 {
    const EMPTY: Self = 0;
}

impl Bits for u64 {
    const EMPTY: Self = 0;
}

/// A tag enum whose variants each name one bit of a mask.
pub trait FlagBits: Copy {
    /// Underlying integer representation.
    type Repr: Bits;

    /// The single bit this enumerator names.
    fn bit(self) -> Self::Repr;
}

/// A typed set of flags over the tag enum `B`.
///
/// Purely a compile-time veneer over integer bit operations; there is no
/// runtime state beyond the raw integer and no validation of combinations.
pub struct Flags<B: FlagBits> {
    bits: B::Repr,
    _tag: PhantomData<B>,
}

impl<B: FlagBits> Flags<B> {
    /// The empty set.
    pub fn empty() -> Self {
        Self::from_raw(B::Repr::EMPTY)
    }

    /// A set containing exactly one enumerator.
    pub fn single(flag: B) -> Self {
        Self::from_raw(flag.bit())
    }

    /// Wrap a raw representation without interpretation.
    pub fn from_raw(bits: B::Repr) -> Self {
        Self {
            bits,
            _tag: PhantomData,
        }
    }

    /// The raw representation.
    pub fn raw(self) -> B::Repr {
        self.bits
    }

    /// Replace the whole set with exactly the given flags.
    pub fn set(&mut self, flags: impl IntoIterator<Item = B>) {
        self.bits = B::Repr::EMPTY;
        self.insert_all(flags);
    }

    /// Add one flag to the set.
    pub fn insert(&mut self, flag: B) {
        self.bits = self.bits | flag.bit();
    }

    /// Add several flags to the set.
    pub fn insert_all(&mut self, flags: impl IntoIterator<Item = B>) {
        for flag in flags {
            self.insert(flag);
        }
    }

    /// Remove one flag from the set.
    pub fn remove(&mut self, flag: B) {
        self.bits = self.bits & !flag.bit();
    }

    /// Flip one flag in the set.
    pub fn toggle(&mut self, flag: B) {
        self.bits = self.bits ^ flag.bit();
    }

    /// True if the flag is present.
    pub fn contains(self, flag: B) -> bool {
        self.bits & flag.bit() == flag.bit()
    }

    /// True if the set consists of exactly this one flag.
    pub fn is_exactly(self, flag: B) -> bool {
        self.bits == flag.bit()
    }

    /// True if any flag of `other` is also present here.
    pub fn intersects(self, other: Self) -> bool {
        self.bits & other.bits != B::Repr::EMPTY
    }

    /// True if no flag is set.
    pub fn is_empty(self) -> bool {
        self.bits == B::Repr::EMPTY
    }
}

// Manual impls: deriving would put unwanted bounds on `B` itself.
impl<B: FlagBits> Clone for Flags<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: FlagBits> Copy for Flags<B> {}

impl<B: FlagBits> Default for Flags<B> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<B: FlagBits> PartialEq for Flags<B> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<B: FlagBits> Eq for Flags<B> {}

impl<B: FlagBits> fmt::Debug for Flags<B>
where
    B::Repr: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Flags").field(&self.bits).finish()
    }
}

impl<B: FlagBits> From<B> for Flags<B> {
    fn from(flag: B) -> Self {
        Self::single(flag)
    }
}

impl<B: FlagBits> FromIterator<B> for Flags<B> {
    fn from_iter<I: IntoIterator<Item = B>>(iter: I) -> Self {
        let mut flags = Self::empty();
        flags.insert_all(iter);
        flags
    }
}

impl<B: FlagBits> BitOr for Flags<B> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::from_raw(self.bits | rhs.bits)
    }
}

impl<B: FlagBits> BitOr<B> for Flags<B> {
    type Output = Self;

    fn bitor(self, rhs: B) -> Self {
        Self::from_raw(self.bits | rhs.bit())
    }
}

impl<B: FlagBits> BitOrAssign for Flags<B> {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits = self.bits | rhs.bits;
    }
}

impl<B: FlagBits> BitAnd for Flags<B> {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self::from_raw(self.bits & rhs.bits)
    }
}

impl<B: FlagBits> BitXor for Flags<B> {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        Self::from_raw(self.bits ^ rhs.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Stage {
        Vertex,
        Fragment,
        Compute,
        Transfer,
    }

    impl FlagBits for Stage {
        type Repr = u32;

        fn bit(self) -> u32 {
            match self {
                Stage::Vertex => 1 << 0,
                Stage::Fragment => 1 << 1,
                Stage::Compute => 1 << 2,
                Stage::Transfer => 1 << 3,
            }
        }
    }

    const ALL: [Stage; 4] = [Stage::Vertex, Stage::Fragment, Stage::Compute, Stage::Transfer];

    #[test]
    fn set_then_contains_matches_membership() {
        // Every subset of the enumerators, driven by a mask over ALL.
        for mask in 0u32..16 {
            let members: Vec<Stage> = ALL
                .iter()
                .copied()
                .filter(|s| mask & s.bit() != 0)
                .collect();

            let mut flags = Flags::empty();
            flags.set(members.iter().copied());

            for stage in ALL {
                assert_eq!(flags.contains(stage), members.contains(&stage));
            }
        }
    }

    #[test]
    fn insert_remove_toggle() {
        let mut flags = Flags::single(Stage::Vertex);
        flags.insert(Stage::Fragment);
        assert!(flags.contains(Stage::Vertex));
        assert!(flags.contains(Stage::Fragment));

        flags.remove(Stage::Vertex);
        assert!(!flags.contains(Stage::Vertex));
        assert!(flags.contains(Stage::Fragment));

        flags.toggle(Stage::Compute);
        assert!(flags.contains(Stage::Compute));
        flags.toggle(Stage::Compute);
        assert!(!flags.contains(Stage::Compute));
    }

    #[test]
    fn exactness_and_intersection() {
        let one = Flags::single(Stage::Compute);
        assert!(one.is_exactly(Stage::Compute));
        assert!(!one.is_exactly(Stage::Vertex));

        let many = one | Stage::Transfer;
        assert!(!many.is_exactly(Stage::Compute));
        assert!(many.intersects(Flags::single(Stage::Transfer)));
        assert!(!many.intersects(Flags::single(Stage::Vertex)));
    }

    #[test]
    fn raw_round_trip() {
        let flags: Flags<Stage> = [Stage::Vertex, Stage::Transfer].into_iter().collect();
        let raw = flags.raw();
        assert_eq!(Flags::<Stage>::from_raw(raw), flags);
        assert_eq!(raw, Stage::Vertex.bit() | Stage::Transfer.bit());
    }

    #[test]
    fn empty_set_contains_nothing() {
        let flags: Flags<Stage> = Flags::empty();
        assert!(flags.is_empty());
        for stage in ALL {
            assert!(!flags.contains(stage));
        }
    }
}

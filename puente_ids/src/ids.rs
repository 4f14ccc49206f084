//! Type-safe generational identifiers (slotmap-style) for arenas.
//! All IDs use u64 = index (low 32 bits) | generation (high 32 bits). Index 0 = nil.
//! IDs are created by their owning arena/manager; slot reuse bumps generation so stale IDs are invalid.

use std::fmt;

// ---- Generational ID: base encoding ----
// u64 layout: low 32 = index (0 = nil, 1.. = slot), high 32 = generation.
// When a slot is reused, generation is bumped so old IDs no longer match.

/// Defines a generational ID type (NodeID, BehaviorID, etc.).
/// All such IDs use index + generation for safe arena slot reuse.
macro_rules! define_generational_id {
    ($type_name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $type_name(pub u64);

        impl $type_name {
            #[inline]
            pub const fn new(id: u32) -> Self {
                Self::from_parts(id, 0)
            }

            #[inline]
            pub const fn nil() -> Self {
                Self(0)
            }

            #[inline]
            pub const fn index(self) -> u32 {
                (self.0 & 0xFFFF_FFFF) as u32
            }

            #[inline]
            pub const fn generation(self) -> u32 {
                (self.0 >> 32) as u32
            }

            #[inline]
            pub const fn from_parts(index: u32, generation: u32) -> Self {
                Self((index as u64) | ((generation as u64) << 32))
            }

            #[inline]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            #[inline]
            pub const fn from_u64(value: u64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn is_nil(self) -> bool {
                self.0 == 0
            }
        }

        impl Default for $type_name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Debug for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(stringify!($type_name), "({}:{})"),
                    self.index(),
                    self.generation()
                )
            }
        }

        impl fmt::Display for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", self.index(), self.generation())
            }
        }
    };
}

define_generational_id!(
    NodeID,
    "Node ID — allocated by NodeArena. Index + generation."
);
define_generational_id!(
    BehaviorID,
    "Behavior ID — allocated by BehaviorArena. Index + generation."
);
define_generational_id!(
    SubscriptionID,
    "Subscription ID — allocated by an event router or remote store. Monotonic; generation 0."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_zero() {
        assert!(NodeID::nil().is_nil());
        assert_eq!(NodeID::nil().as_u64(), 0);
        assert_eq!(NodeID::default(), NodeID::nil());
    }

    #[test]
    fn parts_round_trip() {
        let id = BehaviorID::from_parts(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
        assert_eq!(BehaviorID::from_u64(id.as_u64()), id);
    }

    #[test]
    fn generation_distinguishes_reused_slots() {
        let a = NodeID::from_parts(1, 0);
        let b = NodeID::from_parts(1, 1);
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
    }
}

//! Category bitmasks and the include/exclude filter applied during search.

use serde::{Deserialize, Serialize};

/// Bitmask of semantic categories attached to a pose.
pub type CategoryMask = u64;

/// Returns true if `mask` has the reserved discard bit set.
#[inline]
pub fn is_discarded(mask: CategoryMask, discard_bit: u32) -> bool {
    discard_bit < 64 && mask & (1u64 << discard_bit) != 0
}

/// Include/exclude predicate over category masks.
///
/// A row passes when all of its categories are part of `include` and none of
/// them is part of `exclude`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    /// Categories a row may carry.
    pub include: CategoryMask,
    /// Categories a row must not carry.
    pub exclude: CategoryMask,
}

impl CategoryFilter {
    /// Accepts every row.
    pub const ANY: Self = Self {
        include: u64::MAX,
        exclude: 0,
    };

    /// Create a filter from include and exclude masks.
    pub fn new(include: CategoryMask, exclude: CategoryMask) -> Self {
        Self { include, exclude }
    }

    /// Whether a row with `category` passes the filter.
    #[inline]
    pub fn accepts(&self, category: CategoryMask) -> bool {
        (category & self.include) == category && (category & self.exclude) == 0
    }

    /// True when the filter cannot reject anything, so search may skip it.
    pub fn is_unfiltered(&self) -> bool {
        self.include == u64::MAX && self.exclude == 0
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::ANY
    }
}

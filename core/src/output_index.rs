use serde::{Deserialize, Serialize};
use std::{fmt, num, str};

/// identifies the position of an output within its transaction.
#[derive(
    Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OutputIndex(u64);

impl OutputIndex {
    /// the largest value an [`OutputIndex`] can be
    pub const MAX: Self = Self::new(u64::MAX);

    /// the smallest value an [`OutputIndex`] can be.
    pub const MIN: Self = Self::new(u64::MIN);

    /// wrap the given value into an OutputIndex type
    #[inline(always)]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Try to increase by `1` the [`OutputIndex`]
    ///
    /// If the addition will overflow, the function will returns `None`.
    #[must_use = "The function does not modify the state, the new value is returned"]
    #[inline]
    pub fn checked_next(self) -> Option<Self> {
        self.checked_add(1)
    }

    /// Increase by `1` the [`OutputIndex`]
    ///
    /// If the addition will overflow, the function will returns [`Self::MAX`].
    #[must_use = "The function does not modify the state, the new value is returned"]
    #[inline]
    pub fn saturating_next(self) -> Self {
        self.saturating_add(1)
    }

    /// Try to add the right hand side (`rhs`) value to the [`OutputIndex`].
    ///
    /// If the addition will overflow, the function will returns `None`.
    #[must_use = "The function does not modify the state, the new value is returned"]
    #[inline]
    pub fn checked_add(self, rhs: u64) -> Option<Self> {
        self.0.checked_add(rhs).map(Self)
    }

    /// Add the right hand side (`rhs`) value to the [`OutputIndex`].
    ///
    /// If the addition will overflow we returns the [`Self::MAX`].
    #[must_use = "The function does not modify the state, the new value is returned"]
    #[inline]
    pub fn saturating_add(self, rhs: u64) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

impl fmt::Display for OutputIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl str::FromStr for OutputIndex {
    type Err = num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u64> for OutputIndex {
    fn from(index: u64) -> Self {
        Self(index)
    }
}

impl From<OutputIndex> for u64 {
    fn from(OutputIndex(index): OutputIndex) -> Self {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_next_overflow() {
        assert_eq!(None, OutputIndex::MAX.checked_next())
    }

    #[test]
    fn check_add_overflow() {
        assert_eq!(None, OutputIndex::MAX.checked_add(1))
    }

    #[test]
    fn saturating_next_overflow() {
        assert_eq!(OutputIndex::MAX, OutputIndex::MAX.saturating_next())
    }

    #[test]
    fn saturating_add_overflow() {
        assert_eq!(OutputIndex::MAX, OutputIndex::MAX.saturating_add(1))
    }

    #[test]
    fn checked_next_regular() {
        assert_eq!(Some(OutputIndex::new(1)), OutputIndex::new(0).checked_next());
    }
}

//! The position module holds the [Position] type and its arithmetic.

use super::FaultError;
use std::fmt;

/// Computes a generalized index from a depth and index at depth.
///
/// ### Takes
/// - `depth`: The depth of the generalized index.
/// - `index_at_depth`: The index at depth of the generalized index.
///
/// ### Returns
/// - `u128`: The generalized index: `2^{depth} + index_at_depth`.
pub fn compute_gindex(depth: u8, index_at_depth: u64) -> u128 {
    2u128.pow(depth as u32) + index_at_depth as u128
}

/// A [Position] is a generalized index within the game tree, calculated as
/// `2^{depth} + index_at_depth`. The root is `1`, the left child of `g` is `2g` (an attack)
/// and the right child is `2g + 1` (a defense).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u128);

impl Position {
    /// The [Position] of the root claim.
    pub const ROOT: Position = Position(1);

    /// Creates a [Position] from a raw generalized index, as stored onchain.
    pub fn from_gindex(gindex: u128) -> Result<Self, FaultError> {
        if gindex == 0 {
            return Err(FaultError::InvalidGindex);
        }
        Ok(Self(gindex))
    }

    /// Creates a [Position] from a depth and an index at that depth.
    pub fn from_depth_and_index(depth: u8, index_at_depth: u64) -> Self {
        Self(compute_gindex(depth, index_at_depth))
    }

    /// Returns the raw generalized index.
    pub fn gindex(&self) -> u128 {
        self.0
    }

    /// Returns the depth of the [Position] within the tree.
    pub fn depth(&self) -> u8 {
        (127 - self.0.leading_zeros()) as u8
    }

    /// Returns the index at depth of the [Position] within the tree.
    pub fn index_at_depth(&self) -> u64 {
        (self.0 - (1 << self.depth())) as u64
    }

    /// Returns `true` if the [Position] is the root of the tree.
    pub fn is_root(&self) -> bool {
        self.0 == 1
    }

    /// Returns `true` if the [Position] is the right child of its parent.
    pub fn is_right_child(&self) -> bool {
        !self.is_root() && self.0 & 1 == 1
    }

    /// Returns the left child, the position of an attack.
    pub fn left_child(&self) -> Self {
        Self(self.0 << 1)
    }

    /// Returns the right child.
    pub fn right_child(&self) -> Self {
        Self(self.left_child().0 | 1)
    }

    /// Returns the parent [Position], or [None] for the root.
    pub fn parent(&self) -> Option<Self> {
        (!self.is_root()).then_some(Self(self.0 >> 1))
    }

    /// Returns the [Position] of an attack against the current [Position].
    pub fn attack(&self) -> Self {
        self.left_child()
    }

    /// Returns the [Position] of a defense of the current [Position].
    pub fn defend(&self) -> Self {
        self.right_child()
    }

    /// Returns the relative [Position] for an attack or defense move against the current
    /// [Position].
    pub fn make_move(&self, is_attack: bool) -> Self {
        Self((self.0 << 1) | (!is_attack as u128))
    }

    /// Returns the rightmost [Position] at `max_depth` that commits to the same trace index as
    /// the current [Position]. The current depth must not exceed `max_depth`.
    pub fn right_index(&self, max_depth: u8) -> Self {
        let remaining = max_depth - self.depth();
        Self((self.0 << remaining) | ((1 << remaining) - 1))
    }

    /// Returns the trace index that the current [Position] commits to.
    pub fn trace_index(&self, max_depth: u8) -> u64 {
        self.right_index(max_depth).index_at_depth()
    }
}

impl TryFrom<u128> for Position {
    type Error = FaultError;

    fn try_from(value: u128) -> Result<Self, Self::Error> {
        Self::from_gindex(value)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Errors raised by the local game state.

use super::Position;
use thiserror::Error;

/// The [FaultError] enum describes the failures of the local fault dispute game state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultError {
    /// A generalized index of zero does not describe a node in the tree.
    #[error("generalized index must be non-zero")]
    InvalidGindex,
    /// A claim already occupies the position.
    #[error("duplicate claim at position {0}")]
    DuplicateClaim(Position),
    /// The position lies below the maximum depth of the game tree.
    #[error("position {position} exceeds the maximum game depth of {max_depth}")]
    MaxDepthExceeded { position: Position, max_depth: u8 },
}

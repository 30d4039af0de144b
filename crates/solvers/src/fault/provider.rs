//! The provider module holds the [TraceProvider] trait.

use super::Position;
use anyhow::Result;
use ethers::types::{Bytes, H256};

/// A [TraceProvider] supplies the commitments that the local participant believes are correct
/// at any [Position] of the game tree, up to the maximum depth of the game.
#[async_trait::async_trait]
pub trait TraceProvider: Send + Sync {
    /// Returns the canonical claim value at the given [Position].
    async fn canonical_value(&self, position: Position) -> Result<H256>;

    /// Returns the raw absolute prestate of the trace.
    async fn absolute_prestate(&self) -> Result<Bytes>;
}

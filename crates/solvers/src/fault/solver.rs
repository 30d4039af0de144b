//! The solver module holds the [Solver], which computes the counter moves to make against a
//! snapshot of the game's claims.

use super::{Claim, ClaimData, Position, Response, TraceProvider};
use anyhow::{Context, Result};
use std::{collections::HashSet, sync::Arc};

/// The [Solver] compares every claim in a snapshot of the game against the canonical trace and
/// produces one [Response] per claim it disagrees with.
#[derive(Clone)]
pub struct Solver {
    /// The source of the canonical claim values.
    provider: Arc<dyn TraceProvider>,
    /// The maximum depth of the game tree.
    max_depth: u8,
}

impl Solver {
    /// Creates a [Solver] over the given [TraceProvider] for a game of `max_depth`.
    pub fn new(provider: Arc<dyn TraceProvider>, max_depth: u8) -> Self {
        Self {
            provider,
            max_depth,
        }
    }

    /// Returns the maximum depth of the game.
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Computes the responses to every claim in the snapshot, in snapshot order.
    ///
    /// ### Takes
    /// - `claims`: A snapshot of the local game state.
    ///
    /// ### Returns
    /// - `Ok(Vec<Response>)`: The moves to submit. Empty if there is nothing to counter.
    /// - `Err(anyhow::Error)`: The trace provider failed; no responses are returned.
    pub async fn responses(&self, claims: &[Claim]) -> Result<Vec<Response>> {
        let occupied = claims
            .iter()
            .map(|claim| claim.data.position)
            .collect::<HashSet<_>>();

        let mut responses = Vec::new();
        for claim in claims {
            if let Some(response) = self.next_move(claim, &occupied).await? {
                responses.push(response);
            }
        }
        Ok(responses)
    }

    /// Computes the response to a single claim, if one is needed.
    ///
    /// ### Takes
    /// - `claim`: The claim to inspect.
    /// - `occupied`: The positions of every claim in the snapshot.
    ///
    /// ### Returns
    /// - `Ok(Some(Response))`: An attack against the claim.
    /// - `Ok(None)`: The claim is the root, already countered, final, or agrees with us.
    pub async fn next_move(
        &self,
        claim: &Claim,
        occupied: &HashSet<Position>,
    ) -> Result<Option<Response>> {
        let position = claim.data.position;
        if claim.is_root_position() {
            return Ok(None);
        }
        if claim.countered
            || occupied.contains(&position.left_child())
            || occupied.contains(&position.right_child())
        {
            tracing::trace!(target: "fault-solver", "Claim at {} already countered", position);
            return Ok(None);
        }
        if position.depth() >= self.max_depth {
            tracing::trace!(target: "fault-solver", "Claim at {} is at the maximum depth", position);
            return Ok(None);
        }

        let canonical = self
            .provider
            .canonical_value(position)
            .await
            .with_context(|| format!("Failed to fetch the canonical value at {}", position))?;
        if canonical == claim.data.value {
            return Ok(None);
        }

        let target = position.attack();
        let value = self
            .provider
            .canonical_value(target)
            .await
            .with_context(|| format!("Failed to fetch the canonical value at {}", target))?;

        tracing::debug!(
            target: "fault-solver",
            "Disagree with claim {} at {}, attacking at {}",
            claim.contract_index,
            position,
            target
        );
        Ok(Some(Response {
            parent_contract_index: claim.contract_index,
            parent: claim.data,
            data: ClaimData {
                value,
                position: target,
            },
        }))
    }
}

//! The `loader` module contains the [Loader], which synchronizes the local game state with the
//! claims of the onchain dispute game.

use crate::bindings::FaultDisputeGame;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::{providers::Middleware, types::U256};
use op_challenger_solvers::fault::{Claim, ClaimData, Game, Position};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Upper bound on the claims preallocated for a single fetch.
const MAX_PREALLOCATED_CLAIMS: u64 = 1 << 10;

/// A [RemoteClaim] is a claim as it is stored in the onchain claim data array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteClaim {
    /// The index of the parent claim. `u32::MAX` for the root claim.
    pub parent_index: u32,
    /// Whether the claim has been countered.
    pub countered: bool,
    /// The claimed value.
    pub claim: [u8; 32],
    /// The generalized index of the claim.
    pub position: u128,
    /// The packed chess clock of the claim.
    pub clock: u128,
}

/// The [ClaimFetcher] trait is the read side of the remote claim source.
#[async_trait]
pub trait ClaimFetcher: Send + Sync {
    /// Returns the number of claims in the remote claim array.
    async fn claim_count(&self) -> Result<u64>;

    /// Returns the claim at `index` in the remote claim array.
    async fn fetch_claim(&self, index: u64) -> Result<RemoteClaim>;
}

#[async_trait]
impl<M: Middleware + 'static> ClaimFetcher for FaultDisputeGame<M> {
    async fn claim_count(&self) -> Result<u64> {
        let len = self
            .claim_data_len()
            .call()
            .await
            .map_err(|e| anyhow!("Failed to fetch the claim data length: {}", e))?;
        if len > U256::from(u64::MAX) {
            anyhow::bail!("Claim data length {} overflows a u64", len);
        }
        Ok(len.as_u64())
    }

    async fn fetch_claim(&self, index: u64) -> Result<RemoteClaim> {
        let (parent_index, countered, claim, position, clock) = self
            .claim_data(U256::from(index))
            .call()
            .await
            .map_err(|e| anyhow!("Failed to fetch claim data at index {}: {}", index, e))?;
        Ok(RemoteClaim {
            parent_index,
            countered,
            claim,
            position,
            clock,
        })
    }
}

/// The [Loader] fetches the claims of a dispute game through a [ClaimFetcher] and pushes them into
/// the local [Game] state.
pub struct Loader<G: Game> {
    /// The local game state, shared with the agent.
    state: Arc<Mutex<G>>,
    /// The remote claim source.
    fetcher: Arc<dyn ClaimFetcher>,
}

impl<G: Game + Send> Loader<G> {
    pub fn new(state: Arc<Mutex<G>>, fetcher: Arc<dyn ClaimFetcher>) -> Self {
        Self { state, fetcher }
    }

    /// Returns a handle to the local game state.
    pub fn state(&self) -> Arc<Mutex<G>> {
        Arc::clone(&self.state)
    }

    /// Fetches every claim of the remote game and hydrates each non-root claim with the data of
    /// its parent.
    ///
    /// ### Returns
    /// - `Ok(Vec<Claim>)`: The claims, in remote order.
    /// - `Err(anyhow::Error)`: A remote call failed. No partial results are returned.
    pub async fn fetch_claims(&self) -> Result<Vec<Claim>> {
        let count = self
            .fetcher
            .claim_count()
            .await
            .context("Failed to fetch the claim count")?;
        tracing::debug!(target: "fault-loader", "Fetching {} claims", count);

        // The count is remote input, so the preallocation is capped.
        let mut claims: Vec<Claim> =
            Vec::with_capacity(count.min(MAX_PREALLOCATED_CLAIMS) as usize);
        for index in 0..count {
            let remote = self
                .fetcher
                .fetch_claim(index)
                .await
                .with_context(|| format!("Failed to fetch claim {}", index))?;
            let claim = self.hydrate(index as usize, remote, &claims).await?;
            claims.push(claim);
        }
        Ok(claims)
    }

    /// Stores the given claims in the local game state, stopping at the first rejected claim.
    pub async fn push_claims(&self, claims: Vec<Claim>) -> Result<()> {
        let mut state = self.state.lock().await;
        for claim in claims {
            let contract_index = claim.contract_index;
            state
                .put(claim)
                .with_context(|| format!("Failed to push claim {}", contract_index))?;
        }
        Ok(())
    }

    /// Builds a [Claim] from a [RemoteClaim]. Parents already fetched this cycle are reused; any
    /// other parent is fetched from the remote source.
    async fn hydrate(
        &self,
        contract_index: usize,
        remote: RemoteClaim,
        fetched: &[Claim],
    ) -> Result<Claim> {
        let data = ClaimData {
            value: remote.claim.into(),
            position: Position::from_gindex(remote.position)?,
        };
        let parent_contract_index = remote.parent_index as usize;

        let parent = if data.position.is_root() {
            None
        } else if let Some(parent) = fetched.get(parent_contract_index) {
            Some(parent.data)
        } else {
            tracing::trace!(target: "fault-loader", "Parent {} of claim {} not cached", parent_contract_index, contract_index);
            let parent = self
                .fetcher
                .fetch_claim(remote.parent_index as u64)
                .await
                .with_context(|| format!("Failed to fetch parent claim {}", remote.parent_index))?;
            Some(ClaimData {
                value: parent.claim.into(),
                position: Position::from_gindex(parent.position)?,
            })
        };

        Ok(Claim {
            data,
            parent,
            contract_index,
            parent_contract_index,
            countered: remote.countered,
            clock: remote.clock.into(),
        })
    }
}

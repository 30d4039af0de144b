//! The `player` module contains the [GamePlayer], which progresses a single dispute game until it
//! resolves.

use crate::{agent::Agent, bindings::FaultDisputeGame, loader::ClaimFetcher, types::GameStatus};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ethers::{providers::Middleware, types::H256, utils::keccak256};
use op_challenger_solvers::fault::{Game, TraceProvider};
use std::{sync::Arc, time::Duration};

/// The [GameInfo] trait reads the global state of a dispute game.
#[async_trait]
pub trait GameInfo: Send + Sync {
    /// Returns the current status of the game.
    async fn game_status(&self) -> Result<GameStatus>;

    /// Returns the number of claims in the game.
    async fn claim_count(&self) -> Result<u64>;

    /// Returns the hash of the absolute prestate that the game was created with.
    async fn absolute_prestate(&self) -> Result<H256>;
}

#[async_trait]
impl<M: Middleware + 'static> GameInfo for FaultDisputeGame<M> {
    async fn game_status(&self) -> Result<GameStatus> {
        let status = self
            .status()
            .call()
            .await
            .map_err(|e| anyhow!("Failed to fetch the game status: {}", e))?;
        GameStatus::try_from(status)
    }

    async fn claim_count(&self) -> Result<u64> {
        ClaimFetcher::claim_count(self).await
    }

    async fn absolute_prestate(&self) -> Result<H256> {
        let prestate = FaultDisputeGame::absolute_prestate(self)
            .call()
            .await
            .map_err(|e| anyhow!("Failed to fetch the absolute prestate: {}", e))?;
        Ok(H256::from(prestate))
    }
}

/// Checks that the absolute prestate of the [TraceProvider] hashes to the absolute prestate of the
/// game.
pub async fn validate_absolute_prestate(
    provider: &dyn TraceProvider,
    game: &dyn GameInfo,
) -> Result<()> {
    let prestate = provider
        .absolute_prestate()
        .await
        .context("Failed to get the trace provider's absolute prestate")?;
    let prestate_hash = H256::from(keccak256(&prestate));
    let onchain = game
        .absolute_prestate()
        .await
        .context("Failed to get the game's absolute prestate")?;

    if prestate_hash != onchain {
        bail!(
            "Trace provider's absolute prestate {:?} does not match the game's absolute prestate {:?}",
            prestate_hash,
            onchain
        );
    }
    Ok(())
}

/// The [GamePlayer] runs the [Agent] against a game once per call to
/// [GamePlayer::progress_game] and reports the outcome once the game resolves.
pub struct GamePlayer<G: Game> {
    agent: Agent<G>,
    caller: Arc<dyn GameInfo>,
    agree_with_proposed_output: bool,
    act_timeout: Duration,
    completed: bool,
}

impl<G: Game + Send> GamePlayer<G> {
    pub fn new(
        agent: Agent<G>,
        caller: Arc<dyn GameInfo>,
        agree_with_proposed_output: bool,
        act_timeout: Duration,
    ) -> Self {
        Self {
            agent,
            caller,
            agree_with_proposed_output,
            act_timeout,
            completed: false,
        }
    }

    /// Runs a single cycle of play and returns whether the game has completed.
    pub async fn progress_game(&mut self) -> bool {
        if self.completed {
            tracing::trace!(target: "game-player", "Skipping completed game");
            return true;
        }

        match tokio::time::timeout(self.act_timeout, self.agent.act()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(target: "game-player", "Error when acting on game: {:?}", e)
            }
            Err(_) => {
                tracing::error!(target: "game-player", "Acting on game timed out after {:?}", self.act_timeout)
            }
        }

        match self.caller.game_status().await {
            Ok(status) => {
                self.log_game_status(status).await;
                self.completed = status != GameStatus::InProgress;
                self.completed
            }
            Err(e) => {
                tracing::warn!(target: "game-player", "Unable to retrieve game status: {:?}", e);
                false
            }
        }
    }

    async fn log_game_status(&self, status: GameStatus) {
        if status == GameStatus::InProgress {
            match self.caller.claim_count().await {
                Ok(claim_count) => {
                    tracing::info!(target: "game-player", "Game info: {} claims, status {}", claim_count, status)
                }
                Err(e) => {
                    tracing::error!(target: "game-player", "Failed to get the claim count: {:?}", e)
                }
            }
            return;
        }

        let expected = if self.agree_with_proposed_output {
            GameStatus::ChallengerWins
        } else {
            GameStatus::DefenderWins
        };
        if status == expected {
            tracing::info!(target: "game-player", "Game won: {}", status);
        } else {
            tracing::error!(target: "game-player", "Game lost: {}", status);
        }
    }
}

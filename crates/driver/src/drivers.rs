//! The `drivers` module contains implementations of the [Driver] trait.

use crate::{
    agent::Agent,
    bindings::FaultDisputeGame,
    loader::Loader,
    player::{validate_absolute_prestate, GamePlayer},
    responder::FaultResponder,
    txmgr::{Queue, SimpleTxManager},
    Driver, DriverConfig, SignerMiddlewareWS, TraceType,
};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ethers::{
    prelude::SignerMiddleware,
    providers::{Middleware, Provider, Ws},
    signers::{LocalWallet, Signer},
    types::U256,
};
use op_challenger_solvers::fault::{AlphabetTraceProvider, ClaimTree, Game, Solver, TraceProvider};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::MissedTickBehavior};

/// The deepest game the driver can play: trace indices at this depth still fit in a `u64`.
const MAX_SUPPORTED_DEPTH: u64 = 64;

/// The [FaultGameDriver] plays a single fault dispute game until it resolves.
pub struct FaultGameDriver {
    /// The configuration for the driver.
    pub config: DriverConfig,
    player: GamePlayer<ClaimTree>,
    responder: Arc<FaultResponder>,
}

#[async_trait]
impl Driver for FaultGameDriver {
    async fn try_new(config: DriverConfig) -> Result<Self> {
        config.check()?;

        let provider = Provider::<Ws>::connect(config.ws_endpoint.clone())
            .await
            .context("Failed to connect to the websocket endpoint")?;
        let chain_id = provider.get_chainid().await?;
        let wallet = config
            .private_key
            .parse::<LocalWallet>()
            .context("Failed to parse the private key")?
            .with_chain_id(chain_id.as_u64());
        let client: Arc<SignerMiddlewareWS> = Arc::new(SignerMiddleware::new(provider, wallet));
        tracing::info!(target: "fault-driver", "Connected to chain {} as {:?}", chain_id, client.address());

        let game = Arc::new(FaultDisputeGame::new(
            config.game_address,
            Arc::clone(&client),
        ));
        let max_depth = game
            .max_game_depth()
            .call()
            .await
            .map_err(|e| anyhow!("Failed to fetch the max game depth: {}", e))?;
        if max_depth > U256::from(MAX_SUPPORTED_DEPTH) {
            bail!("Unsupported max game depth: {}", max_depth);
        }
        let max_depth = max_depth.as_u64() as u8;

        let trace_provider: Arc<dyn TraceProvider> = match config.trace_type {
            TraceType::Alphabet => {
                let trace = config
                    .alphabet_trace
                    .as_deref()
                    .ok_or(anyhow!("Missing alphabet trace"))?;
                Arc::new(AlphabetTraceProvider::new(trace, max_depth))
            }
        };
        validate_absolute_prestate(trace_provider.as_ref(), game.as_ref()).await?;
        tracing::info!(target: "fault-driver", "Absolute prestate validated, max game depth {}", max_depth);

        let txmgr = SimpleTxManager::new(Arc::clone(&client), config.num_confirmations);
        let queue = Queue::new(Arc::new(txmgr), config.max_pending_transactions);
        let responder = Arc::new(FaultResponder::new(Arc::new(queue), game.clone()));

        let loader = Loader::new(
            Arc::new(Mutex::new(ClaimTree::new(max_depth))),
            game.clone(),
        );
        let agent = Agent::new(
            loader,
            Solver::new(trace_provider, max_depth),
            Arc::clone(&responder),
        );
        let player = GamePlayer::new(
            agent,
            game,
            config.agree_with_proposed_output,
            config.act_timeout,
        );

        Ok(Self {
            config,
            player,
            responder,
        })
    }

    async fn start(self) -> Result<()> {
        let Self {
            config,
            mut player,
            responder,
        } = self;
        tracing::info!(target: "fault-driver", "Playing game {:?}", config.game_address);

        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(target: "fault-driver", "Failed to listen for interrupts: {:?}", e);
            }
            tracing::info!(target: "fault-driver", "Received interrupt, shutting down");
        };
        if play(&mut player, &responder, config.poll_interval, interrupt).await {
            tracing::info!(target: "fault-driver", "Game {:?} completed", config.game_address);
        }
        Ok(())
    }
}

/// Progresses the game once per `poll_interval` until it completes or `shutdown` resolves, then
/// quits the responder. Returns whether the game completed.
///
/// `shutdown` is raced against the running cycle as well, so a cycle waiting on receipts is
/// released as soon as it resolves.
async fn play<G, S>(
    player: &mut GamePlayer<G>,
    responder: &FaultResponder,
    poll_interval: Duration,
    shutdown: S,
) -> bool
where
    G: Game + Send,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let completed = loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break false,
            _ = interval.tick() => {}
        }

        let cycle = player.progress_game();
        tokio::pin!(cycle);
        tokio::select! {
            biased;
            completed = &mut cycle => {
                if completed {
                    break true;
                }
            }
            _ = &mut shutdown => {
                responder.quit();
                // Outstanding responses are released; let the cycle unwind.
                cycle.await;
                break false;
            }
        }
    };

    responder.quit();
    completed
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        loader::{ClaimFetcher, RemoteClaim},
        player::GameInfo,
        responder::TxData,
        txmgr::{TxCandidate, TxQueue, TxReceipt},
        GameStatus,
    };
    use ethers::types::{Address, H256};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::oneshot;

    const MAX_DEPTH: u8 = 3;

    struct DishonestGame;

    #[async_trait]
    impl ClaimFetcher for DishonestGame {
        async fn claim_count(&self) -> Result<u64> {
            Ok(2)
        }

        async fn fetch_claim(&self, index: u64) -> Result<RemoteClaim> {
            Ok(match index {
                0 => RemoteClaim {
                    parent_index: u32::MAX,
                    claim: [0xaa; 32],
                    position: 1,
                    ..Default::default()
                },
                _ => RemoteClaim {
                    parent_index: 0,
                    claim: [0xbb; 32],
                    position: 2,
                    ..Default::default()
                },
            })
        }
    }

    struct InProgressGame;

    #[async_trait]
    impl GameInfo for InProgressGame {
        async fn game_status(&self) -> Result<GameStatus> {
            Ok(GameStatus::InProgress)
        }

        async fn claim_count(&self) -> Result<u64> {
            Ok(2)
        }

        async fn absolute_prestate(&self) -> Result<H256> {
            Ok(H256::zero())
        }
    }

    struct ResolvedGame;

    #[async_trait]
    impl GameInfo for ResolvedGame {
        async fn game_status(&self) -> Result<GameStatus> {
            Ok(GameStatus::ChallengerWins)
        }

        async fn claim_count(&self) -> Result<u64> {
            Ok(2)
        }

        async fn absolute_prestate(&self) -> Result<H256> {
            Ok(H256::zero())
        }
    }

    /// Accepts every transaction and never confirms any of them.
    #[derive(Default)]
    struct StalledQueue {
        pending: StdMutex<Vec<oneshot::Sender<TxReceipt<TxData>>>>,
    }

    #[async_trait]
    impl TxQueue<TxData> for StalledQueue {
        async fn send(
            &self,
            _: TxData,
            _: TxCandidate,
            receipt_tx: oneshot::Sender<TxReceipt<TxData>>,
        ) {
            self.pending.lock().unwrap().push(receipt_tx);
        }
    }

    fn setup(
        info: Arc<dyn GameInfo>,
    ) -> (GamePlayer<ClaimTree>, Arc<FaultResponder>, Arc<StalledQueue>) {
        let queue = Arc::new(StalledQueue::default());
        let (client, _) = Provider::mocked();
        let game = Arc::new(FaultDisputeGame::new(Address::zero(), Arc::new(client)));
        let responder = Arc::new(FaultResponder::new(Arc::clone(&queue) as _, game));
        let agent = Agent::new(
            Loader::new(
                Arc::new(Mutex::new(ClaimTree::new(MAX_DEPTH))),
                Arc::new(DishonestGame),
            ),
            Solver::new(
                Arc::new(AlphabetTraceProvider::new("abcdefgh", MAX_DEPTH)),
                MAX_DEPTH,
            ),
            Arc::clone(&responder),
        );
        let player = GamePlayer::new(agent, info, false, Duration::from_secs(3600));
        (player, responder, queue)
    }

    #[tokio::test]
    async fn shutdown_releases_running_cycle() {
        let (mut player, responder, queue) = setup(Arc::new(InProgressGame));
        let shutdown = tokio::time::sleep(Duration::from_millis(50));

        let completed = tokio::time::timeout(
            Duration::from_secs(5),
            play(&mut player, &responder, Duration::from_secs(3600), shutdown),
        )
        .await
        .expect("shutdown did not release the cycle");

        assert!(!completed);
        assert_eq!(queue.pending.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completed_game_stops_playing() {
        let (mut player, responder, _queue) = setup(Arc::new(ResolvedGame));
        // Quit up front so the cycle does not wait on its receipt.
        responder.quit();

        let completed = tokio::time::timeout(
            Duration::from_secs(5),
            play(
                &mut player,
                &responder,
                Duration::from_millis(10),
                std::future::pending(),
            ),
        )
        .await
        .unwrap();
        assert!(completed);
    }
}

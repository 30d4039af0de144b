//! The `agent` module contains the [Agent], which runs a single cycle of play against a dispute
//! game.

use crate::{loader::Loader, responder::FaultResponder};
use anyhow::{Context, Result};
use futures::future::join_all;
use op_challenger_solvers::fault::{Game, Solver};
use std::sync::Arc;

/// The [Agent] ties the [Loader], the [Solver] and the [FaultResponder] together.
pub struct Agent<G: Game> {
    loader: Loader<G>,
    solver: Solver,
    responder: Arc<FaultResponder>,
}

impl<G: Game + Send> Agent<G> {
    pub fn new(loader: Loader<G>, solver: Solver, responder: Arc<FaultResponder>) -> Self {
        Self {
            loader,
            solver,
            responder,
        }
    }

    /// Syncs the local game state with the remote game, then responds to every claim that the
    /// solver disagrees with. Failures of individual responses are logged.
    pub async fn act(&self) -> Result<()> {
        let claims = self
            .loader
            .fetch_claims()
            .await
            .context("Failed to fetch claims")?;

        let state = self.loader.state();
        let fresh = {
            let state = state.lock().await;
            claims
                .into_iter()
                .filter(|claim| !state.is_duplicate(&claim.data))
                .collect::<Vec<_>>()
        };
        tracing::debug!(target: "fault-agent", "Pushing {} new claims", fresh.len());
        self.loader
            .push_claims(fresh)
            .await
            .context("Failed to push claims")?;

        let snapshot = state.lock().await.claims();
        let responses = self.solver.responses(&snapshot).await?;
        if responses.is_empty() {
            tracing::debug!(target: "fault-agent", "No moves to make");
            return Ok(());
        }

        tracing::info!(target: "fault-agent", "Responding to {} claims", responses.len());
        let results = join_all(responses.into_iter().map(|response| async move {
            (response, self.responder.respond(response).await)
        }))
        .await;
        for (response, result) in results {
            if let Err(e) = result {
                tracing::error!(target: "fault-agent", "Failed to respond to claim {}: {:?}", response.parent_contract_index, e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bindings::{AttackCall, FaultDisputeGame, FaultDisputeGameCalls},
        loader::{ClaimFetcher, RemoteClaim},
        responder::TxData,
        txmgr::{TxCandidate, TxQueue, TxReceipt},
    };
    use async_trait::async_trait;
    use ethers::{
        abi::AbiDecode,
        providers::Provider,
        types::{Address, TransactionReceipt, U256},
    };
    use op_challenger_solvers::fault::{AlphabetTraceProvider, ClaimTree, Position, TraceProvider};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::{oneshot, Mutex};

    const MAX_DEPTH: u8 = 3;

    #[derive(Default)]
    struct MockFetcher {
        claims: StdMutex<Vec<RemoteClaim>>,
    }

    #[async_trait]
    impl ClaimFetcher for MockFetcher {
        async fn claim_count(&self) -> Result<u64> {
            Ok(self.claims.lock().unwrap().len() as u64)
        }

        async fn fetch_claim(&self, index: u64) -> Result<RemoteClaim> {
            self.claims
                .lock()
                .unwrap()
                .get(index as usize)
                .copied()
                .ok_or(anyhow::anyhow!("missing claim {}", index))
        }
    }

    #[derive(Default)]
    struct MockQueue {
        sent: StdMutex<Vec<TxCandidate>>,
    }

    #[async_trait]
    impl TxQueue<TxData> for MockQueue {
        async fn send(
            &self,
            id: TxData,
            candidate: TxCandidate,
            receipt_tx: oneshot::Sender<TxReceipt<TxData>>,
        ) {
            self.sent.lock().unwrap().push(candidate);
            let _ = receipt_tx.send(TxReceipt {
                id,
                result: Ok(TransactionReceipt::default()),
            });
        }
    }

    struct Setup {
        agent: Agent<ClaimTree>,
        fetcher: Arc<MockFetcher>,
        queue: Arc<MockQueue>,
        provider: Arc<AlphabetTraceProvider>,
    }

    fn setup(claims: Vec<RemoteClaim>) -> Setup {
        let fetcher = Arc::new(MockFetcher {
            claims: StdMutex::new(claims),
        });
        let queue = Arc::new(MockQueue::default());
        let provider = Arc::new(AlphabetTraceProvider::new("abcdefgh", MAX_DEPTH));

        let (client, _) = Provider::mocked();
        let game = Arc::new(FaultDisputeGame::new(Address::zero(), Arc::new(client)));
        let loader = Loader::new(
            Arc::new(Mutex::new(ClaimTree::new(MAX_DEPTH))),
            Arc::clone(&fetcher) as _,
        );
        let responder = Arc::new(FaultResponder::new(Arc::clone(&queue) as _, game));
        let agent = Agent::new(
            loader,
            Solver::new(Arc::clone(&provider) as _, MAX_DEPTH),
            responder,
        );

        Setup {
            agent,
            fetcher,
            queue,
            provider,
        }
    }

    fn remote(parent_index: u32, position: u128, claim: [u8; 32]) -> RemoteClaim {
        RemoteClaim {
            parent_index,
            claim,
            position,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn attacks_dishonest_claim() {
        let Setup {
            agent,
            queue,
            provider,
            ..
        } = setup(vec![
            remote(u32::MAX, 1, [0xaa; 32]),
            remote(0, 2, [0xbb; 32]),
        ]);

        agent.act().await.unwrap();

        let sent = queue.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        let expected = provider
            .canonical_value(Position::from_gindex(4).unwrap())
            .await
            .unwrap();
        assert_eq!(
            FaultDisputeGameCalls::decode(&sent[0].tx_data).unwrap(),
            FaultDisputeGameCalls::Attack(AttackCall {
                parent_index: U256::from(1),
                pivot: expected.0,
            })
        );
    }

    #[tokio::test]
    async fn honest_game_needs_no_moves() {
        let honest = AlphabetTraceProvider::new("abcdefgh", MAX_DEPTH);
        let value = honest
            .canonical_value(Position::from_gindex(2).unwrap())
            .await
            .unwrap();
        let Setup { agent, queue, .. } = setup(vec![
            remote(u32::MAX, 1, [0xaa; 32]),
            remote(0, 2, value.0),
        ]);

        agent.act().await.unwrap();
        assert!(queue.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_cycles_are_idempotent() {
        let Setup {
            agent,
            fetcher,
            queue,
            provider,
        } = setup(vec![
            remote(u32::MAX, 1, [0xaa; 32]),
            remote(0, 2, [0xbb; 32]),
        ]);

        agent.act().await.unwrap();
        assert_eq!(queue.sent.lock().unwrap().len(), 1);

        // Our attack lands in the remote game.
        let value = provider
            .canonical_value(Position::from_gindex(4).unwrap())
            .await
            .unwrap();
        fetcher.claims.lock().unwrap().push(remote(1, 4, value.0));

        agent.act().await.unwrap();
        agent.act().await.unwrap();
        assert_eq!(queue.sent.lock().unwrap().len(), 1);

        let state = agent.loader.state();
        assert_eq!(state.lock().await.len(), 3);
    }
}

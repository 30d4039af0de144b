//! The `responder` module contains the [FaultResponder], which turns the solver's responses into
//! transactions against the dispute game and tracks them until their receipts arrive.

use crate::{
    bindings::FaultDisputeGame,
    txmgr::{TxCandidate, TxQueue, TxReceipt},
};
use anyhow::{anyhow, Context, Result};
use ethers::{
    providers::Middleware,
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, U256, U64},
};
use op_challenger_solvers::fault::Response;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

/// [TxData] is the encoded calldata of a move and the game it is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxData {
    data: Bytes,
    destination: Address,
}

impl TxData {
    /// Creates a [TxData] for `data` sent to `destination`.
    pub fn new(data: Bytes, destination: Address) -> Self {
        Self { data, destination }
    }

    /// Returns the calldata.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Returns the address of the game.
    pub fn destination(&self) -> Address {
        self.destination
    }
}

impl TryFrom<TypedTransaction> for TxData {
    type Error = anyhow::Error;

    fn try_from(tx: TypedTransaction) -> Result<Self> {
        let data = tx
            .data()
            .cloned()
            .ok_or(anyhow!("Transaction is missing calldata"))?;
        let destination = tx
            .to_addr()
            .copied()
            .ok_or(anyhow!("Transaction is missing a destination address"))?;
        Ok(Self { data, destination })
    }
}

/// The [MoveEncoder] trait is the write side of the dispute game: it encodes the calls that make
/// a move against a claim.
pub trait MoveEncoder: Send + Sync {
    /// Encodes an attack against the claim at `parent_index`.
    fn encode_attack(&self, parent_index: U256, value: [u8; 32]) -> Result<TxData>;

    /// Encodes a defense of the claim at `parent_index`.
    fn encode_defend(&self, parent_index: U256, value: [u8; 32]) -> Result<TxData>;
}

impl<M: Middleware + 'static> MoveEncoder for FaultDisputeGame<M> {
    fn encode_attack(&self, parent_index: U256, value: [u8; 32]) -> Result<TxData> {
        TxData::try_from(self.attack(parent_index, value).tx)
    }

    fn encode_defend(&self, parent_index: U256, value: [u8; 32]) -> Result<TxData> {
        TxData::try_from(self.defend(parent_index, value).tx)
    }
}

/// The [FaultResponder] submits moves through a shared [TxQueue] and waits for their receipts.
pub struct FaultResponder {
    queue: Arc<dyn TxQueue<TxData>>,
    encoder: Arc<dyn MoveEncoder>,
    /// Raised once by [FaultResponder::quit] to release every pending wait.
    shutdown: watch::Sender<bool>,
}

impl FaultResponder {
    pub fn new(queue: Arc<dyn TxQueue<TxData>>, encoder: Arc<dyn MoveEncoder>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            queue,
            encoder,
            shutdown,
        }
    }

    /// Encodes the move for the given [Response]: a defense if the response sits at the right
    /// child of its parent, an attack otherwise.
    pub fn build_tx_data(&self, response: &Response) -> Result<TxData> {
        let parent_index = U256::from(response.parent_contract_index);
        if response.defends_parent() {
            self.encoder
                .encode_defend(parent_index, response.value_bytes())
                .context("Failed to encode defend")
        } else {
            self.encoder
                .encode_attack(parent_index, response.value_bytes())
                .context("Failed to encode attack")
        }
    }

    /// Submits the given [Response] and waits until its receipt arrives or the responder is shut
    /// down. The outcome of the transaction is logged, not returned.
    pub async fn respond(&self, response: Response) -> Result<()> {
        let tx_data = self.build_tx_data(&response)?;
        let candidate = TxCandidate {
            to: tx_data.destination(),
            tx_data: tx_data.bytes().clone(),
            gas_limit: U256::zero(),
        };
        let (receipt_tx, receipt_rx) = oneshot::channel();
        let mut shutdown = self.shutdown.subscribe();

        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => {
                tracing::debug!(target: "fault-responder", "Responder shut down before the receipt for {} arrived", response.data.position);
            }
            receipt = async {
                self.queue.send(tx_data, candidate, receipt_tx).await;
                receipt_rx.await
            } => {
                match receipt {
                    Ok(receipt) => log_receipt(&response, receipt),
                    Err(_) => {
                        tracing::warn!(target: "fault-responder", "Receipt channel closed for the move at {}", response.data.position);
                    }
                }
            }
        }
        Ok(())
    }

    /// Releases every pending and future [FaultResponder::respond] wait.
    pub fn quit(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Resolves once the shutdown flag is raised or its sender is dropped.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

fn log_receipt(response: &Response, receipt: TxReceipt<TxData>) {
    let kind = if response.defends_parent() {
        "defend"
    } else {
        "attack"
    };
    match receipt.result {
        Ok(receipt) if receipt.status == Some(U64::from(1)) => {
            tracing::info!(target: "fault-responder", "Successfully submitted {} at {}. Tx hash: {:?}", kind, response.data.position, receipt.transaction_hash);
        }
        Ok(receipt) => {
            tracing::error!(target: "fault-responder", "The {} at {} reverted. Tx hash: {:?}", kind, response.data.position, receipt.transaction_hash);
        }
        Err(e) => {
            tracing::error!(target: "fault-responder", "Failed to submit {} at {}: {:?}", kind, response.data.position, e);
        }
    }
}

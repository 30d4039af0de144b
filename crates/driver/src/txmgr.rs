//! The `txmgr` module contains the transaction manager and the bounded transaction queue that the
//! responder submits its moves through.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::{
    providers::Middleware,
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest,
        TransactionReceipt, U256,
    },
};
use std::sync::Arc;
use tokio::sync::{oneshot, Semaphore};

/// A [TxCandidate] is a transaction that has not been signed or sent yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxCandidate {
    /// The recipient of the transaction.
    pub to: Address,
    /// The calldata of the transaction.
    pub tx_data: Bytes,
    /// The gas limit of the transaction. Zero means the limit is estimated before sending.
    pub gas_limit: U256,
}

/// A [TxReceipt] is the outcome of a queued transaction, tagged with the id it was queued with.
#[derive(Debug)]
pub struct TxReceipt<T> {
    /// The id the transaction was queued with.
    pub id: T,
    /// The mined receipt, or the error that stopped the transaction.
    pub result: Result<TransactionReceipt>,
}

/// The [TxManager] trait signs, sends and confirms a single [TxCandidate].
#[async_trait]
pub trait TxManager: Send + Sync {
    /// Sends the candidate and waits for its receipt.
    async fn send(&self, candidate: TxCandidate) -> Result<TransactionReceipt>;
}

/// The [SimpleTxManager] sends EIP-1559 transactions through a signing [Middleware].
pub struct SimpleTxManager<M> {
    client: Arc<M>,
    /// The number of confirmations to wait for before a receipt is returned.
    num_confirmations: usize,
}

impl<M: Middleware + 'static> SimpleTxManager<M> {
    pub fn new(client: Arc<M>, num_confirmations: usize) -> Self {
        Self {
            client,
            num_confirmations,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> TxManager for SimpleTxManager<M> {
    async fn send(&self, candidate: TxCandidate) -> Result<TransactionReceipt> {
        let mut tx: TypedTransaction = Eip1559TransactionRequest::new()
            .to(candidate.to)
            .data(candidate.tx_data)
            .into();

        let gas_limit = if candidate.gas_limit.is_zero() {
            self.client
                .estimate_gas(&tx, None)
                .await
                .map_err(|e| anyhow!("Failed to estimate gas: {}", e))?
        } else {
            candidate.gas_limit
        };
        tx.set_gas(gas_limit);

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| anyhow!("Failed to send transaction: {}", e))?;
        let tx_hash = pending.tx_hash();
        tracing::debug!(target: "txmgr", "Transaction sent. Tx hash: {:?}", tx_hash);

        pending
            .confirmations(self.num_confirmations)
            .await
            .map_err(|e| anyhow!("Failed to confirm transaction {:?}: {}", tx_hash, e))?
            .ok_or(anyhow!("Transaction {:?} was dropped from the mempool", tx_hash))
    }
}

/// The [TxQueue] trait hands transactions off to be sent in the background. The receipt of each
/// transaction is delivered through the given [oneshot::Sender].
#[async_trait]
pub trait TxQueue<T>: Send + Sync {
    /// Queues the candidate. Waits while the queue is full.
    async fn send(
        &self,
        id: T,
        candidate: TxCandidate,
        receipt_tx: oneshot::Sender<TxReceipt<T>>,
    );
}

/// The [Queue] sends transactions through a [TxManager] with a bounded number of transactions in
/// flight at once.
pub struct Queue {
    txmgr: Arc<dyn TxManager>,
    /// Holds one permit per transaction that may be in flight.
    pending: Arc<Semaphore>,
}

impl Queue {
    /// Creates a new [Queue]. A `max_pending` of zero places no bound on the transactions in
    /// flight.
    pub fn new(txmgr: Arc<dyn TxManager>, max_pending: usize) -> Self {
        let permits = if max_pending == 0 {
            Semaphore::MAX_PERMITS
        } else {
            max_pending
        };
        Self {
            txmgr,
            pending: Arc::new(Semaphore::new(permits)),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> TxQueue<T> for Queue {
    async fn send(
        &self,
        id: T,
        candidate: TxCandidate,
        receipt_tx: oneshot::Sender<TxReceipt<T>>,
    ) {
        let permit = match Arc::clone(&self.pending).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                let _ = receipt_tx.send(TxReceipt {
                    id,
                    result: Err(anyhow!("Transaction queue closed: {}", e)),
                });
                return;
            }
        };

        let txmgr = Arc::clone(&self.txmgr);
        tokio::spawn(async move {
            let result = txmgr.send(candidate).await;
            drop(permit);
            if receipt_tx.send(TxReceipt { id, result }).is_err() {
                tracing::debug!(target: "txmgr", "Receipt receiver dropped before the receipt arrived");
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    #[derive(Default)]
    struct MockTxManager {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        sent: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TxManager for MockTxManager {
        async fn send(&self, candidate: TxCandidate) -> Result<TransactionReceipt> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.sent.fetch_add(1, Ordering::SeqCst);

            if self.fail {
                anyhow::bail!("send failed");
            }
            Ok(TransactionReceipt {
                to: Some(candidate.to),
                status: Some(1u64.into()),
                ..Default::default()
            })
        }
    }

    fn candidate() -> TxCandidate {
        TxCandidate {
            to: Address::repeat_byte(0x11),
            tx_data: Bytes::from(vec![0xde, 0xad]),
            gas_limit: U256::zero(),
        }
    }

    #[tokio::test]
    async fn bounds_transactions_in_flight() {
        let txmgr = Arc::new(MockTxManager::default());
        let queue = Queue::new(Arc::clone(&txmgr) as Arc<dyn TxManager>, 2);

        let mut receivers = Vec::new();
        for id in 0..5u64 {
            let (tx, rx) = oneshot::channel();
            queue.send(id, candidate(), tx).await;
            receivers.push(rx);
        }

        let mut ids = Vec::new();
        for rx in receivers {
            let receipt = rx.await.unwrap();
            assert_eq!(receipt.result.unwrap().to, Some(Address::repeat_byte(0x11)));
            ids.push(receipt.id);
        }

        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(txmgr.sent.load(Ordering::SeqCst), 5);
        assert!(txmgr.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn unbounded_queue() {
        let txmgr = Arc::new(MockTxManager::default());
        let queue = Queue::new(Arc::clone(&txmgr) as Arc<dyn TxManager>, 0);

        let mut receivers = Vec::new();
        for id in 0..4u64 {
            let (tx, rx) = oneshot::channel();
            queue.send(id, candidate(), tx).await;
            receivers.push(rx);
        }
        for rx in receivers {
            assert!(rx.await.unwrap().result.is_ok());
        }
        assert_eq!(txmgr.max_in_flight.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn delivers_send_errors() {
        let txmgr = Arc::new(MockTxManager {
            fail: true,
            ..Default::default()
        });
        let queue = Queue::new(txmgr, 1);

        let (tx, rx) = oneshot::channel();
        queue.send("attack", candidate(), tx).await;
        let receipt = rx.await.unwrap();
        assert_eq!(receipt.id, "attack");
        assert_eq!(receipt.result.unwrap_err().to_string(), "send failed");
    }
}

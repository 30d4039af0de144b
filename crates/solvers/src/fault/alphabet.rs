//! The alphabet module contains an implementation of the [TraceProvider] trait for the
//! alphabet fault dispute game.

use super::{FaultError, Position, TraceProvider};
use anyhow::{anyhow, Result};
use ethers::{
    abi::{self, Token},
    types::{Bytes, H256, U256},
    utils::keccak256,
};
use std::sync::Arc;

/// The absolute prestate of the alphabet VM: the letter preceding `a`.
const ALPHABET_PRESTATE: u8 = 0x60;

/// The [AlphabetTraceProvider] serves the honest trace of the mock alphabet VM, where each trace
/// index holds a single letter.
#[derive(Debug, Clone)]
pub struct AlphabetTraceProvider {
    /// Our full execution trace.
    pub trace: Arc<[u8]>,
    /// The maximum depth of the game tree.
    pub max_depth: u8,
}

impl AlphabetTraceProvider {
    pub fn new(trace: impl AsRef<str>, max_depth: u8) -> Self {
        Self {
            trace: trace.as_ref().as_bytes().into(),
            max_depth,
        }
    }

    /// Returns the letter committed to at the given [Position]. Trace indices past the end of the
    /// trace repeat the final letter.
    pub fn state_at(&self, position: Position) -> Result<u8> {
        if position.depth() > self.max_depth {
            return Err(FaultError::MaxDepthExceeded {
                position,
                max_depth: self.max_depth,
            }
            .into());
        }

        let trace_index = position.trace_index(self.max_depth) as usize;
        self.trace
            .get(trace_index)
            .or_else(|| self.trace.last())
            .copied()
            .ok_or(anyhow!("Empty alphabet trace"))
    }
}

#[async_trait::async_trait]
impl TraceProvider for AlphabetTraceProvider {
    async fn canonical_value(&self, position: Position) -> Result<H256> {
        let letter = self.state_at(position)?;
        let claim_hash = keccak256(abi::encode(&[
            Token::Uint(U256::from(position.trace_index(self.max_depth))),
            Token::Uint(U256::from(letter)),
        ]));
        Ok(H256::from(claim_hash))
    }

    async fn absolute_prestate(&self) -> Result<Bytes> {
        Ok(abi::encode(&[Token::Uint(U256::from(ALPHABET_PRESTATE))]).into())
    }
}

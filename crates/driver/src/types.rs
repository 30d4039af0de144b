use ethers::{
    prelude::{k256::ecdsa::SigningKey, SignerMiddleware},
    providers::{Provider, Ws},
    signers::Wallet,
};
use std::fmt;

/// The [SignerMiddlewareWS] type is a [SignerMiddleware] that signs transactions with a local
/// wallet and sends them over a websocket [Provider].
pub type SignerMiddlewareWS = SignerMiddleware<Provider<Ws>, Wallet<SigningKey>>;

/// The [GameStatus] enum mirrors the status of a dispute game onchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GameStatus {
    InProgress = 0,
    ChallengerWins = 1,
    DefenderWins = 2,
}

impl TryFrom<u8> for GameStatus {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GameStatus::InProgress),
            1 => Ok(GameStatus::ChallengerWins),
            2 => Ok(GameStatus::DefenderWins),
            _ => Err(anyhow::anyhow!("Invalid game status: {}", value)),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::InProgress => write!(f, "In Progress"),
            GameStatus::ChallengerWins => write!(f, "Challenger Won"),
            GameStatus::DefenderWins => write!(f, "Defender Won"),
        }
    }
}

//! The `config` module contains the [DriverConfig].

use anyhow::{anyhow, bail, Result};
use ethers::types::Address;
use std::{fmt, str::FromStr, time::Duration};

/// The [TraceType] enum lists the trace backends the driver can play with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceType {
    /// The mock alphabet VM, whose trace is a string of letters.
    Alphabet,
}

impl FromStr for TraceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "alphabet" => Ok(TraceType::Alphabet),
            _ => Err(anyhow!("Unsupported trace type: {}", s)),
        }
    }
}

impl fmt::Display for TraceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceType::Alphabet => write!(f, "alphabet"),
        }
    }
}

/// The [DriverConfig] struct contains the configuration for the [Driver](crate::Driver).
#[derive(Clone)]
pub struct DriverConfig {
    /// The URL of the RPC endpoint used to read the game and send transactions.
    pub ws_endpoint: String,
    /// The private key of the account that submits moves.
    pub private_key: String,
    /// The address of the fault dispute game contract.
    pub game_address: Address,
    /// The trace backend to play with.
    pub trace_type: TraceType,
    /// The trace served by the alphabet trace provider.
    pub alphabet_trace: Option<String>,
    /// Whether the challenger agrees with the proposed output root.
    pub agree_with_proposed_output: bool,
    /// The maximum number of transactions in flight at once. Zero places no bound.
    pub max_pending_transactions: usize,
    /// The number of confirmations to wait for after sending a move.
    pub num_confirmations: usize,
    /// The interval between two cycles of play.
    pub poll_interval: Duration,
    /// The upper bound on the duration of a single cycle of play.
    pub act_timeout: Duration,
}

impl DriverConfig {
    /// Checks that the configuration is complete.
    pub fn check(&self) -> Result<()> {
        if self.ws_endpoint.is_empty() {
            bail!("Missing websocket endpoint");
        }
        if self.private_key.is_empty() {
            bail!("Missing private key");
        }
        if self.game_address.is_zero() {
            bail!("Missing game address");
        }
        match self.trace_type {
            TraceType::Alphabet if self.alphabet_trace.as_deref().unwrap_or_default().is_empty() => {
                bail!("The alphabet trace type requires an alphabet trace")
            }
            _ => {}
        }
        if self.poll_interval.is_zero() || self.act_timeout.is_zero() {
            bail!("The poll interval and act timeout must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config() -> DriverConfig {
        DriverConfig {
            ws_endpoint: "ws://localhost:8546".to_string(),
            private_key: "0x01".to_string(),
            game_address: Address::repeat_byte(0x01),
            trace_type: TraceType::Alphabet,
            alphabet_trace: Some("abcdefgh".to_string()),
            agree_with_proposed_output: true,
            max_pending_transactions: 10,
            num_confirmations: 1,
            poll_interval: Duration::from_secs(12),
            act_timeout: Duration::from_secs(300),
        }
    }

    #[test]
    fn parse_trace_type() {
        assert_eq!("alphabet".parse::<TraceType>().unwrap(), TraceType::Alphabet);
        assert!("cannon".parse::<TraceType>().is_err());
        assert_eq!(TraceType::Alphabet.to_string(), "alphabet");
    }

    #[test]
    fn complete_config_passes() {
        assert!(config().check().is_ok());
    }

    #[test]
    fn alphabet_trace_required() {
        let mut config = config();
        config.alphabet_trace = None;
        assert!(config.check().is_err());
        config.alphabet_trace = Some(String::new());
        assert!(config.check().is_err());
    }

    #[test]
    fn game_address_required() {
        let config = DriverConfig {
            game_address: Address::zero(),
            ..config()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn zero_intervals_rejected() {
        let config = DriverConfig {
            act_timeout: Duration::ZERO,
            ..config()
        };
        assert!(config.check().is_err());
    }
}

#![doc = include_str!("../README.md")]

use anyhow::Result;
use async_trait::async_trait;

/// Contains the smart contract bindings used by the driver.
pub mod bindings;

mod config;
pub use config::{DriverConfig, TraceType};

mod types;
pub use types::{GameStatus, SignerMiddlewareWS};

pub mod loader;
pub mod txmgr;

pub mod responder;

mod agent;
pub use agent::Agent;

mod player;
pub use player::{validate_absolute_prestate, GameInfo, GamePlayer};

mod drivers;
pub use drivers::FaultGameDriver;

/// The [Driver] trait defines the interface for all driver loops that are ran by the `op-challenger` binary.
#[async_trait]
pub trait Driver {
    /// Creates a new [Driver] with the given configuration.
    async fn try_new(config: DriverConfig) -> Result<Self>
    where
        Self: Sized;

    /// Starts the [Driver] loop.
    async fn start(self) -> Result<()>;
}

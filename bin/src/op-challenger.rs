use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use ethers::types::Address;
use op_challenger_driver::{Driver, DriverConfig, FaultGameDriver, TraceType};
use std::time::Duration;
use tracing::Level;

/// Arguments for the `op-challenger` binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Verbosity level (0-4)
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count, env = "VERBOSITY")]
    v: u8,

    /// The Websocket RPC endpoint used to read the game and send transactions.
    #[arg(
        long,
        short,
        help = "The Websocket RPC endpoint used to read the game and send transactions.",
        env = "OP_CHALLENGER_WS"
    )]
    ws_endpoint: String,

    /// The private key of the account that submits moves.
    #[arg(
        long,
        short,
        help = "The private key of the account that submits moves.",
        env = "OP_CHALLENGER_KEY",
        hide_env_values = true
    )]
    private_key: String,

    /// The address of the fault dispute game contract.
    #[arg(
        long,
        short,
        help = "The address of the fault dispute game contract.",
        env = "OP_CHALLENGER_GAME"
    )]
    game_address: Address,

    /// The trace backend to play with.
    #[arg(
        long,
        help = "The trace backend to play with. Supported: alphabet",
        default_value = "alphabet",
        env = "OP_CHALLENGER_TRACE_TYPE"
    )]
    trace_type: TraceType,

    /// The trace served by the alphabet trace provider.
    #[arg(
        long,
        help = "The trace served by the alphabet trace provider.",
        env = "OP_CHALLENGER_ALPHABET"
    )]
    alphabet_trace: Option<String>,

    /// Whether the challenger agrees with the proposed output root.
    #[arg(
        long,
        help = "Whether the challenger agrees with the proposed output root.",
        env = "OP_CHALLENGER_AGREE_WITH_PROPOSED_OUTPUT"
    )]
    agree_with_proposed_output: bool,

    /// The maximum number of transactions in flight at once.
    #[arg(
        long,
        help = "The maximum number of transactions in flight at once. 0 places no bound.",
        default_value_t = 10,
        env = "OP_CHALLENGER_MAX_PENDING_TX"
    )]
    max_pending_transactions: usize,

    /// The number of confirmations to wait for after sending a move.
    #[arg(
        long,
        help = "The number of confirmations to wait for after sending a move.",
        default_value_t = 1,
        env = "OP_CHALLENGER_NUM_CONFIRMATIONS"
    )]
    num_confirmations: usize,

    /// The interval between two cycles of play, in seconds.
    #[arg(
        long,
        help = "The interval between two cycles of play, in seconds.",
        default_value_t = 12,
        env = "OP_CHALLENGER_POLL_INTERVAL"
    )]
    poll_interval: u64,

    /// The upper bound on the duration of a single cycle of play, in seconds.
    #[arg(
        long,
        help = "The upper bound on the duration of a single cycle of play, in seconds.",
        default_value_t = 300,
        env = "OP_CHALLENGER_ACT_TIMEOUT"
    )]
    act_timeout: u64,
}

impl From<Args> for DriverConfig {
    fn from(args: Args) -> Self {
        Self {
            ws_endpoint: args.ws_endpoint,
            private_key: args.private_key,
            game_address: args.game_address,
            trace_type: args.trace_type,
            alphabet_trace: args.alphabet_trace,
            agree_with_proposed_output: args.agree_with_proposed_output,
            max_pending_transactions: args.max_pending_transactions,
            num_confirmations: args.num_confirmations,
            poll_interval: Duration::from_secs(args.poll_interval),
            act_timeout: Duration::from_secs(args.act_timeout),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse the command arguments
    let args = Args::parse();

    // Initialize the tracing subscriber
    init_tracing_subscriber(args.v)?;

    // Create the driver config.
    let driver_config = DriverConfig::from(args);
    tracing::info!(target: "op-challenger-cli", "Driver config created successfully.");

    // Create the driver and connect to the websocket endpoint.
    tracing::debug!(target: "op-challenger-cli", "Creating driver and connecting to websocket endpoint...");
    let driver = FaultGameDriver::try_new(driver_config).await?;
    tracing::info!(target: "op-challenger-cli", "Driver created successfully, websocket connected @ {}", &driver.config.ws_endpoint);

    // Start the driver loop.
    driver.start().await?;

    Ok(())
}

/// Initializes the tracing subscriber
///
/// # Arguments
/// * `verbosity_level` - The verbosity level (0-4)
///
/// # Returns
/// * `Result<()>` - Ok if successful, Err otherwise.
fn init_tracing_subscriber(verbosity_level: u8) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(match verbosity_level {
            0 => Level::ERROR,
            1 => Level::WARN,
            2 => Level::INFO,
            3 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}

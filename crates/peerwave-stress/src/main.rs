mod scenario;

use std::time::Duration;

use clap::{Parser, Subcommand};

use peerwave_protocol::{DriverConfig, RetryPolicy};

#[derive(Parser)]
#[command(name = "peerwave-stress", about = "Stress scenarios for the peerwave protocol")]
struct Cli {
    /// Protocol tick interval in ms.
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Peer silence timeout in ms.
    #[arg(long, default_value = "1000")]
    peer_timeout_ms: u64,

    /// Discovery probe interval in ms.
    #[arg(long, default_value = "500")]
    discovery_ms: u64,

    /// Max delivery attempts per send.
    #[arg(long, default_value = "5")]
    max_retries: u32,

    /// Completion-report wait per attempt in ms.
    #[arg(long, default_value = "50")]
    ack_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Two nodes discover each other and exchange heartbeats and commands.
    Pair {
        /// Run duration in seconds.
        #[arg(long, default_value = "5")]
        duration: u64,
    },

    /// One node drops mid-run: watch eviction, fallback to discovery, and
    /// rediscovery after recovery.
    Failover {
        /// Run duration in seconds.
        #[arg(long, default_value = "10")]
        duration: u64,
        /// Take node B offline this many seconds in.
        #[arg(long, default_value = "3")]
        drop_at: u64,
        /// Bring node B back this many seconds in.
        #[arg(long, default_value = "6")]
        recover_at: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = DriverConfig {
        tick_interval: Duration::from_millis(cli.tick_ms),
        peer_timeout: Duration::from_millis(cli.peer_timeout_ms),
        discovery_interval: Duration::from_millis(cli.discovery_ms),
        retry: RetryPolicy {
            max_retries: cli.max_retries,
            ack_timeout: Duration::from_millis(cli.ack_timeout_ms),
            ..RetryPolicy::default()
        },
    };

    match cli.command {
        Command::Pair { duration } => {
            scenario::pair(config, Duration::from_secs(duration)).await
        }
        Command::Failover {
            duration,
            drop_at,
            recover_at,
        } => {
            scenario::failover(
                config,
                Duration::from_secs(duration),
                Duration::from_secs(drop_at),
                Duration::from_secs(recover_at),
            )
            .await
        }
    }
}

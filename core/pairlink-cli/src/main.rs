//! pairlink: CLI front end for the relay-channel session manager.
//!
//! Drives `pairlink-core` against file storage under `~/.pairlink`.
//!
//! ## Subcommands
//!
//! - `pair`: generate a pairing code and wait for the confirmation
//! - `status`: print the persisted session and its liveness
//! - `disconnect`: tear the session down
//! - `watch`: poll a conversation in live mode for a while

mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use pairlink_core::{
    ChatListRefresh, ConnectionManager, FileStorage, FixedDelaySignal, LivePoller, Liveness,
    MessageRefresh, QrServerRenderer, Storage, StorageConfigSink, SystemClock,
};
use tracing::info;

const CONFIRMATION_POLL_PERIOD: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "pairlink")]
#[command(about = "Relay-channel pairing and session manager")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a pairing code and wait for the confirmation
    Pair {
        /// Seconds to wait for the pairing confirmation
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Show the current session and its liveness
    Status,

    /// Tear the session down and clear persisted state
    Disconnect,

    /// Poll a conversation in live mode
    Watch {
        /// Conversation to poll for new messages
        #[arg(value_name = "CONVERSATION_ID")]
        conversation_id: String,

        /// Seconds to keep polling before stopping
        #[arg(long, default_value_t = 60)]
        duration: u64,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Pair { timeout } => run_pair(timeout),
        Commands::Status => run_status(),
        Commands::Disconnect => run_disconnect(),
        Commands::Watch {
            conversation_id,
            duration,
        } => run_watch(&conversation_id, duration),
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "pairlink command failed");
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn data_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(".pairlink"))
}

fn build_manager() -> Result<ConnectionManager, String> {
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(data_dir()?));
    Ok(ConnectionManager::new(
        storage.clone(),
        Arc::new(QrServerRenderer::default()),
        Arc::new(FixedDelaySignal::default()),
        Arc::new(StorageConfigSink::new(storage)),
        Arc::new(SystemClock),
    ))
}

fn run_pair(timeout: u64) -> Result<(), String> {
    let manager = build_manager()?;

    let artifact = manager.generate().map_err(|err| err.to_string())?;
    println!("Scan to pair: {}", artifact);
    println!("Waiting for confirmation...");

    let deadline = Instant::now() + Duration::from_secs(timeout);
    loop {
        let state = manager.state();
        if state.is_connected {
            println!("Paired with {}", state.bound_identifier);
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err("pairing confirmation timed out".to_string());
        }
        thread::sleep(CONFIRMATION_POLL_PERIOD);
    }
}

fn run_status() -> Result<(), String> {
    let manager = build_manager()?;
    let state = manager.state();

    println!("liveness: {}", manager.liveness());
    match manager.liveness() {
        Liveness::Disconnected => {
            if !state.pairing_artifact.is_empty() {
                println!("pending pairing: {}", state.pairing_artifact);
            }
        }
        Liveness::Idle | Liveness::Active => {
            println!("session: {}", state.session_id);
            println!("bound to: {}", state.bound_identifier);
            if let Some(connected_at) = state.last_connected_at {
                println!("connected at: {}", connected_at.to_rfc3339());
            }
        }
    }
    Ok(())
}

fn run_disconnect() -> Result<(), String> {
    let manager = build_manager()?;
    manager.disconnect();
    println!("Disconnected.");
    Ok(())
}

fn run_watch(conversation_id: &str, duration: u64) -> Result<(), String> {
    let manager = build_manager()?;
    if !manager.state().is_connected {
        return Err("no connected session; run `pairlink pair` first".to_string());
    }

    let poller = LivePoller::new();
    let refresh_messages: MessageRefresh = Arc::new(|conversation_id: &str| {
        info!(conversation_id = %conversation_id, "Refreshing messages");
    });
    let refresh_chat_list: ChatListRefresh = Arc::new(|| {
        info!("Refreshing conversation list");
    });

    poller.start(conversation_id, refresh_messages, refresh_chat_list);
    println!(
        "Live mode on {} for {}s (logs in ~/.pairlink/logs)",
        conversation_id, duration
    );
    thread::sleep(Duration::from_secs(duration));
    poller.stop();
    println!("Live mode stopped.");
    Ok(())
}

//! # pairlink-core
//!
//! Connection-session manager for a message-relay channel: pairing-code
//! generation, pairing confirmation, session liveness, durable persistence,
//! and the live polling loop that keeps a conversation view fresh.
//!
//! ## Design Principles
//!
//! - **Synchronous API over background threads**: no async runtime; the
//!   confirmation signal and the poll workers are plain threads, and all
//!   session mutation funnels through one mutex.
//! - **Disconnect wins races**: asynchronous results (render completion,
//!   pairing confirmation) are validated against the pending session id and
//!   dropped when stale.
//! - **Graceful degradation**: missing or corrupt persisted state loads as
//!   the empty state, never as an error.
//! - **External collaborators behind traits**: artifact rendering, the
//!   confirmation push channel, durable storage, the config sink, and the
//!   wall clock are all injectable.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pairlink_core::{ConnectionManager, FileStorage, FixedDelaySignal,
//!     QrServerRenderer, StorageConfigSink, SystemClock};
//! use std::sync::Arc;
//!
//! let storage: Arc<dyn pairlink_core::Storage> =
//!     Arc::new(FileStorage::new("/tmp/pairlink"));
//! let manager = ConnectionManager::new(
//!     storage.clone(),
//!     Arc::new(QrServerRenderer::default()),
//!     Arc::new(FixedDelaySignal::default()),
//!     Arc::new(StorageConfigSink::new(storage)),
//!     Arc::new(SystemClock),
//! );
//! let artifact = manager.generate()?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod live;
pub mod pairing;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ChannelConfig, ConfigSink, ConfigUpdate, RecordingConfigSink, StorageConfigSink};
pub use error::{PairingError, RenderError, Result};
pub use lifecycle::ConnectionManager;
pub use live::{
    ChatListRefresh, LivePoller, MessageRefresh, CHAT_LIST_REFRESH_PERIOD, MESSAGE_REFRESH_PERIOD,
};
pub use pairing::{
    ArtifactRenderer, FixedDelaySignal, PairingConfirmation, PairingSignal, QrServerRenderer,
};
pub use session::{Liveness, SessionState, SessionStore, IDLE_THRESHOLD_MINS};
pub use storage::{FileStorage, MemoryStorage, Storage};

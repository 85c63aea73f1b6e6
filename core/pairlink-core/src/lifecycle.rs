//! Connect/disconnect transitions and liveness classification.
//!
//! `ConnectionManager` owns the `Disconnected → Generating → Connected`
//! machine. All state mutation funnels through its mutex; asynchronous
//! callbacks (the render result and the pairing confirmation) are validated
//! against the pending session id, so a disconnect that races an in-flight
//! pairing always wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{ConfigSink, ConfigUpdate};
use crate::error::{PairingError, Result};
use crate::pairing::{self, ArtifactRenderer, PairingSignal};
use crate::session::{Liveness, SessionState, SessionStore};
use crate::storage::Storage;

struct Inner {
    state: SessionState,
    /// Session id a confirmation must match to be accepted. `None` when no
    /// pairing is pending; cleared by disconnect so a late confirmation for
    /// a superseded session is dropped.
    pending_session: Option<String>,
}

/// Single canonical owner of the channel connection lifecycle.
///
/// Cloning is cheap and shares the underlying state; UI-facing callers hold
/// clones instead of re-deriving connection state themselves.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Mutex<Inner>>,
    store: Arc<SessionStore>,
    renderer: Arc<dyn ArtifactRenderer>,
    signal: Arc<dyn PairingSignal>,
    config: Arc<dyn ConfigSink>,
    clock: Arc<dyn Clock>,
}

impl ConnectionManager {
    /// Builds a manager and rehydrates any persisted session. A pairing that
    /// was pending at persist time comes back with its artifact but without
    /// an armed confirmation; the user regenerates to pair.
    pub fn new(
        storage: Arc<dyn Storage>,
        renderer: Arc<dyn ArtifactRenderer>,
        signal: Arc<dyn PairingSignal>,
        config: Arc<dyn ConfigSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(SessionStore::new(storage));
        let state = store.load();
        ConnectionManager {
            inner: Arc::new(Mutex::new(Inner {
                state,
                pending_session: None,
            })),
            store,
            renderer,
            signal,
            config,
            clock,
        }
    }

    /// Starts a pairing attempt: mints a fresh session id, renders its
    /// payload into a scannable artifact, and arms a one-shot confirmation.
    ///
    /// Returns the artifact reference. At most one generation may be
    /// outstanding; a second call while one is in flight fails with
    /// [`PairingError::GenerationInProgress`] without minting a second
    /// session id or issuing a second render request. Calling this while
    /// connected supersedes the live session (re-pairing).
    pub fn generate(&self) -> Result<String> {
        let session_id = {
            let mut inner = self.lock_inner();
            if inner.state.is_generating {
                return Err(PairingError::GenerationInProgress);
            }
            let session_id = pairing::mint_session_id();
            inner.state = SessionState {
                session_id: session_id.clone(),
                is_generating: true,
                ..SessionState::default()
            };
            inner.pending_session = Some(session_id.clone());
            session_id
        };

        debug!(session_id = %session_id, "Pairing generation started");

        // The fallible external call happens outside the lock; disconnect
        // stays callable while the render is in flight.
        let payload = pairing::encode_payload(&session_id);
        match self.renderer.render(&payload) {
            Ok(artifact) => {
                let adopted = {
                    let mut inner = self.lock_inner();
                    if inner.pending_session.as_deref() != Some(session_id.as_str()) {
                        // Disconnected while rendering; the result is stale.
                        debug!(session_id = %session_id, "Discarding superseded render result");
                        false
                    } else {
                        inner.state.pairing_artifact = artifact.clone();
                        inner.state.is_generating = false;
                        true
                    }
                };

                if adopted {
                    self.persist();
                    let manager = self.clone();
                    self.signal.subscribe(
                        &session_id,
                        Box::new(move |confirmation| {
                            manager.confirm_pairing(
                                &confirmation.session_id,
                                &confirmation.bound_identifier,
                            );
                        }),
                    );
                    info!(session_id = %session_id, "Pairing artifact ready");
                }
                Ok(artifact)
            }
            Err(err) => {
                let mut inner = self.lock_inner();
                if inner.pending_session.as_deref() == Some(session_id.as_str()) {
                    inner.state = SessionState::default();
                    inner.pending_session = None;
                }
                warn!(session_id = %session_id, error = %err, "Pairing artifact render failed");
                Err(PairingError::ArtifactRender(err))
            }
        }
    }

    /// Handles a pairing confirmation from the signal channel.
    ///
    /// Confirmations whose session id does not match the pending one are
    /// silently dropped; that is the expected outcome of a confirmation
    /// racing a disconnect or a newer generation, not an error.
    pub fn confirm_pairing(&self, session_id: &str, bound_identifier: &str) {
        let connected = {
            let mut inner = self.lock_inner();
            if inner.pending_session.as_deref() != Some(session_id) {
                debug!(session_id = %session_id, "Ignoring stale pairing confirmation");
                return;
            }
            inner.pending_session = None;
            inner.state.is_connected = true;
            inner.state.bound_identifier = bound_identifier.to_string();
            inner.state.last_connected_at = Some(self.clock.now());
            inner.state.pairing_artifact.clear();
            inner.state.is_generating = false;
            inner.state.clone()
        };

        self.persist();
        self.config.apply(ConfigUpdate {
            is_connected: Some(true),
            authorized_number: Some(connected.bound_identifier.clone()),
            qr_code: Some(String::new()),
        });
        info!(
            session_id = %session_id,
            bound_identifier = %connected.bound_identifier,
            "Pairing confirmed, session connected"
        );
    }

    /// Tears the session down: resets all fields, clears durable storage,
    /// and cancels any pending confirmation. Idempotent.
    pub fn disconnect(&self) {
        {
            let mut inner = self.lock_inner();
            inner.pending_session = None;
            inner.state = SessionState::default();
        }

        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear persisted session");
        }
        self.config.apply(ConfigUpdate {
            is_connected: Some(false),
            authorized_number: Some(String::new()),
            qr_code: Some(String::new()),
        });
        info!("Session disconnected");
    }

    /// Classifies current liveness. Pure read, safe to call on every render.
    pub fn liveness(&self) -> Liveness {
        let now = self.clock.now();
        self.lock_inner().state.liveness(now)
    }

    /// Read-only snapshot of the session state.
    pub fn state(&self) -> SessionState {
        self.lock_inner().state.clone()
    }

    fn persist(&self) {
        let snapshot = self.lock_inner().state.clone();
        if let Err(err) = self.store.save(&snapshot) {
            warn!(error = %err, "Failed to persist session state");
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Pairing payload encoding, session-id minting, and the confirmation seam.
//!
//! A pairing attempt mints a fresh session id, encodes it into a payload the
//! external device scans, and subscribes for a one-shot confirmation. The
//! confirmation channel is a trait so the fixed-delay stand-in used here can
//! be swapped for a real webhook/event subscription without touching the
//! lifecycle controller.

use std::thread;
use std::time::Duration;

use rand::Rng;
use ulid::Ulid;

use crate::error::RenderError;

/// Scheme prefix for pairing payloads. The session id is embedded verbatim
/// so a confirmation can be correlated back to the generation attempt.
const PAYLOAD_PREFIX: &str = "pairlink://session/";

/// Delay of the simulated confirmation push. Stand-in for an external scan
/// event; see [`FixedDelaySignal`].
pub const SIMULATED_CONFIRMATION_DELAY: Duration = Duration::from_secs(15);

/// Mints a fresh session id: millisecond timestamp plus 80 random bits.
/// Collisions are treated as negligible and not handled.
pub fn mint_session_id() -> String {
    Ulid::new().to_string()
}

/// Encodes a session id into its scannable payload.
pub fn encode_payload(session_id: &str) -> String {
    format!("{}{}", PAYLOAD_PREFIX, session_id)
}

/// Extracts the session id from a pairing payload, if it is one of ours.
pub fn decode_payload(payload: &str) -> Option<&str> {
    payload
        .strip_prefix(PAYLOAD_PREFIX)
        .filter(|session_id| !session_id.is_empty())
}

/// External rendering service: turns an opaque payload into a displayable
/// artifact reference. Any error is a generation failure.
pub trait ArtifactRenderer: Send + Sync {
    fn render(&self, payload: &str) -> Result<String, RenderError>;
}

/// Renders via the qrserver.com code-image API by building the request URL.
/// Fetching the image is the display layer's problem; this only validates
/// the payload and produces the reference.
pub struct QrServerRenderer {
    base_url: String,
}

impl QrServerRenderer {
    pub fn new(base_url: impl Into<String>) -> Self {
        QrServerRenderer {
            base_url: base_url.into(),
        }
    }
}

impl Default for QrServerRenderer {
    fn default() -> Self {
        QrServerRenderer::new("https://api.qrserver.com/v1/create-qr-code/")
    }
}

impl ArtifactRenderer for QrServerRenderer {
    fn render(&self, payload: &str) -> Result<String, RenderError> {
        if payload.trim().is_empty() {
            return Err(RenderError::new("empty pairing payload"));
        }
        let encoded: String = url::form_urlencoded::byte_serialize(payload.as_bytes()).collect();
        Ok(format!("{}?size=300x300&data={}", self.base_url, encoded))
    }
}

/// One-shot pairing confirmation delivered by a [`PairingSignal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingConfirmation {
    pub session_id: String,
    pub bound_identifier: String,
}

/// Seam for the external confirmation push channel.
///
/// `subscribe` arms a one-shot delivery for `session_id`; the callback may
/// fire from another thread, and stale deliveries are filtered by the
/// subscriber via the session-id correlation check.
pub trait PairingSignal: Send + Sync {
    fn subscribe(&self, session_id: &str, on_confirmed: Box<dyn FnOnce(PairingConfirmation) + Send>);
}

/// Fires a synthetic confirmation once after a fixed delay.
///
/// This simulates the external scan event in the absence of a real push
/// channel. A production deployment replaces it with a webhook or event
/// subscription implementing [`PairingSignal`]; nothing downstream changes.
pub struct FixedDelaySignal {
    delay: Duration,
}

impl FixedDelaySignal {
    pub fn new(delay: Duration) -> Self {
        FixedDelaySignal { delay }
    }
}

impl Default for FixedDelaySignal {
    fn default() -> Self {
        FixedDelaySignal::new(SIMULATED_CONFIRMATION_DELAY)
    }
}

impl PairingSignal for FixedDelaySignal {
    fn subscribe(
        &self,
        session_id: &str,
        on_confirmed: Box<dyn FnOnce(PairingConfirmation) + Send>,
    ) {
        let delay = self.delay;
        let session_id = session_id.to_string();
        thread::spawn(move || {
            thread::sleep(delay);
            on_confirmed(PairingConfirmation {
                session_id,
                bound_identifier: synthetic_identifier(),
            });
        });
    }
}

/// Brazilian-mobile-shaped number for the simulated confirmation.
fn synthetic_identifier() -> String {
    let mut rng = rand::thread_rng();
    format!("+55119{:08}", rng.gen_range(0..100_000_000u32))
}

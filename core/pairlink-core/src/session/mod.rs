//! Session state types and their durable persistence.

mod store;
mod types;

pub use store::SessionStore;
pub use types::{Liveness, SessionState, IDLE_THRESHOLD_MINS};

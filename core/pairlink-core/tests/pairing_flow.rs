//! End-to-end pairing flow over real file storage: generate, confirm,
//! reload, poll, disconnect.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use pairlink_core::{
    ArtifactRenderer, ChatListRefresh, ConnectionManager, FileStorage, Liveness, LivePoller,
    ManualClock, MessageRefresh, PairingConfirmation, PairingSignal, RecordingConfigSink,
    RenderError, Storage,
};

struct StaticRenderer {
    artifact: String,
}

impl ArtifactRenderer for StaticRenderer {
    fn render(&self, payload: &str) -> Result<String, RenderError> {
        assert!(payload.starts_with("pairlink://session/"));
        Ok(self.artifact.clone())
    }
}

/// Holds subscriptions until the test fires them.
#[derive(Default)]
struct HeldSignal {
    armed: Mutex<Vec<(String, Box<dyn FnOnce(PairingConfirmation) + Send>)>>,
}

impl HeldSignal {
    fn fire_all(&self, bound_identifier: &str) {
        let armed = std::mem::take(&mut *self.armed.lock().unwrap());
        for (session_id, callback) in armed {
            callback(PairingConfirmation {
                session_id,
                bound_identifier: bound_identifier.to_string(),
            });
        }
    }
}

impl PairingSignal for HeldSignal {
    fn subscribe(
        &self,
        session_id: &str,
        on_confirmed: Box<dyn FnOnce(PairingConfirmation) + Send>,
    ) {
        self.armed
            .lock()
            .unwrap()
            .push((session_id.to_string(), on_confirmed));
    }
}

fn manager_over(
    storage: Arc<dyn Storage>,
    signal: Arc<HeldSignal>,
    clock: ManualClock,
) -> ConnectionManager {
    ConnectionManager::new(
        storage,
        Arc::new(StaticRenderer {
            artifact: "https://example.invalid/code.png".to_string(),
        }),
        signal,
        Arc::new(RecordingConfigSink::new()),
        Arc::new(clock),
    )
}

#[test]
fn full_session_lifecycle_over_file_storage() {
    let temp = tempfile::tempdir().expect("temp dir");
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(temp.path()));
    let signal = Arc::new(HeldSignal::default());
    let clock = ManualClock::at(Utc::now());

    // Pair.
    let manager = manager_over(storage.clone(), signal.clone(), clock.clone());
    let artifact = manager.generate().expect("generate");
    assert_eq!(artifact, "https://example.invalid/code.png");
    assert_eq!(manager.liveness(), Liveness::Disconnected);

    signal.fire_all("+5511999999999");
    assert_eq!(manager.liveness(), Liveness::Active);

    // Survives a "page reload": a fresh manager over the same directory.
    let reloaded = manager_over(storage.clone(), Arc::new(HeldSignal::default()), clock.clone());
    let state = reloaded.state();
    assert!(state.is_connected);
    assert_eq!(state.bound_identifier, "+5511999999999");
    assert_eq!(reloaded.liveness(), Liveness::Active);

    // Live mode polls the selected conversation while connected.
    let poller = LivePoller::with_periods(Duration::from_millis(5), Duration::from_millis(5));
    let refreshes = Arc::new(AtomicUsize::new(0));
    let messages: MessageRefresh = {
        let refreshes = Arc::clone(&refreshes);
        Arc::new(move |_conversation_id| {
            refreshes.fetch_add(1, Ordering::SeqCst);
        })
    };
    let chats: ChatListRefresh = Arc::new(|| {});
    poller.start("conv-1", messages, chats);
    std::thread::sleep(Duration::from_millis(60));
    poller.stop();
    assert!(refreshes.load(Ordering::SeqCst) > 0);

    // Disconnect clears the persisted entry; the next reload starts empty.
    reloaded.disconnect();
    let fresh = manager_over(storage, Arc::new(HeldSignal::default()), clock);
    assert!(fresh.state().is_empty());
    assert_eq!(fresh.liveness(), Liveness::Disconnected);
}

//! Live mode: periodic message and chat-list refresh for the selected
//! conversation.
//!
//! Two worker threads tick on independent periods and invoke externally
//! supplied refresh callbacks. Teardown is a correctness requirement, not an
//! optimization: a leaked worker keeps firing network calls after the view
//! is gone, so `stop()` joins both workers and `Drop` calls it as a
//! backstop.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Default period for the per-conversation message refresh.
pub const MESSAGE_REFRESH_PERIOD: Duration = Duration::from_secs(3);
/// Default period for the conversation-list refresh.
pub const CHAT_LIST_REFRESH_PERIOD: Duration = Duration::from_secs(10);

/// Refresh callback for the selected conversation's messages. Assumed
/// idempotent and safe to call repeatedly.
pub type MessageRefresh = Arc<dyn Fn(&str) + Send + Sync>;
/// Refresh callback for the conversation list.
pub type ChatListRefresh = Arc<dyn Fn() + Send + Sync>;

/// Condvar-guarded stop flag shared by the two workers. Stopping wakes
/// sleepers immediately instead of waiting out the period.
struct StopFlag {
    stopped: Mutex<bool>,
    wakeup: Condvar,
}

impl StopFlag {
    fn new() -> Arc<Self> {
        Arc::new(StopFlag {
            stopped: Mutex::new(false),
            wakeup: Condvar::new(),
        })
    }

    fn stop(&self) {
        let mut stopped = self.lock();
        *stopped = true;
        self.wakeup.notify_all();
    }

    /// Sleeps for one period. Returns true when stop was requested.
    fn wait(&self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        let mut stopped = self.lock();
        loop {
            if *stopped {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _timeout) = self
                .wakeup
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            stopped = guard;
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct ActiveRun {
    conversation_id: String,
    flag: Arc<StopFlag>,
    workers: Vec<JoinHandle<()>>,
}

/// At most one live-mode run at a time. Starting while active tears the
/// previous run down first; both workers are alive iff the poller reports
/// active.
pub struct LivePoller {
    message_period: Duration,
    chat_list_period: Duration,
    run: Mutex<Option<ActiveRun>>,
}

impl LivePoller {
    pub fn new() -> Self {
        LivePoller::with_periods(MESSAGE_REFRESH_PERIOD, CHAT_LIST_REFRESH_PERIOD)
    }

    /// Poller with explicit periods. Tests use short ones.
    pub fn with_periods(message_period: Duration, chat_list_period: Duration) -> Self {
        LivePoller {
            message_period,
            chat_list_period,
            run: Mutex::new(None),
        }
    }

    /// Starts live mode for `conversation_id`, replacing any previous run.
    pub fn start(
        &self,
        conversation_id: &str,
        refresh_messages: MessageRefresh,
        refresh_chat_list: ChatListRefresh,
    ) {
        // No dangling workers from a previous conversation.
        self.stop();

        let flag = StopFlag::new();

        let message_worker = {
            let flag = Arc::clone(&flag);
            let period = self.message_period;
            let conversation_id = conversation_id.to_string();
            thread::spawn(move || {
                while !flag.wait(period) {
                    refresh_messages(&conversation_id);
                }
            })
        };

        let chat_list_worker = {
            let flag = Arc::clone(&flag);
            let period = self.chat_list_period;
            thread::spawn(move || {
                while !flag.wait(period) {
                    refresh_chat_list();
                }
            })
        };

        debug!(conversation_id = %conversation_id, "Live mode started");
        *self.lock_run() = Some(ActiveRun {
            conversation_id: conversation_id.to_string(),
            flag,
            workers: vec![message_worker, chat_list_worker],
        });
    }

    /// Stops live mode and joins both workers. Idempotent; tolerates a
    /// never-started poller.
    pub fn stop(&self) {
        let Some(run) = self.lock_run().take() else {
            return;
        };

        run.flag.stop();
        for worker in run.workers {
            if worker.join().is_err() {
                warn!("Live-mode worker panicked");
            }
        }
        debug!(conversation_id = %run.conversation_id, "Live mode stopped");
    }

    pub fn is_active(&self) -> bool {
        self.lock_run().is_some()
    }

    /// Conversation currently being polled, if any.
    pub fn active_conversation_id(&self) -> Option<String> {
        self.lock_run()
            .as_ref()
            .map(|run| run.conversation_id.clone())
    }

    fn lock_run(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LivePoller {
    fn default() -> Self {
        LivePoller::new()
    }
}

impl Drop for LivePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SHORT: Duration = Duration::from_millis(5);

    fn counting_callbacks() -> (
        MessageRefresh,
        ChatListRefresh,
        Arc<AtomicUsize>,
        Arc<AtomicUsize>,
    ) {
        let message_count = Arc::new(AtomicUsize::new(0));
        let chat_count = Arc::new(AtomicUsize::new(0));
        let messages: MessageRefresh = {
            let count = Arc::clone(&message_count);
            Arc::new(move |_conversation_id| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        let chats: ChatListRefresh = {
            let count = Arc::clone(&chat_count);
            Arc::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        (messages, chats, message_count, chat_count)
    }

    fn settle() {
        thread::sleep(Duration::from_millis(60));
    }

    #[test]
    fn test_workers_fire_on_both_periods() {
        let poller = LivePoller::with_periods(SHORT, SHORT);
        let (messages, chats, message_count, chat_count) = counting_callbacks();

        poller.start("conv-1", messages, chats);
        settle();
        poller.stop();

        assert!(message_count.load(Ordering::SeqCst) > 0);
        assert!(chat_count.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_stop_halts_refreshing() {
        let poller = LivePoller::with_periods(SHORT, SHORT);
        let (messages, chats, message_count, _) = counting_callbacks();

        poller.start("conv-1", messages, chats);
        settle();
        poller.stop();

        let after_stop = message_count.load(Ordering::SeqCst);
        settle();
        assert_eq!(message_count.load(Ordering::SeqCst), after_stop);
        assert!(!poller.is_active());
        assert!(poller.active_conversation_id().is_none());
    }

    #[test]
    fn test_restart_replaces_previous_run() {
        let poller = LivePoller::with_periods(SHORT, SHORT);
        let (messages_a, chats_a, count_a, _) = counting_callbacks();
        let (messages_b, chats_b, count_b, _) = counting_callbacks();

        poller.start("conv-1", messages_a, chats_a);
        poller.start("conv-2", messages_b, chats_b);

        // start() joins the previous workers, so the old counters freeze.
        let frozen = count_a.load(Ordering::SeqCst);
        settle();
        assert_eq!(count_a.load(Ordering::SeqCst), frozen);
        assert!(count_b.load(Ordering::SeqCst) > 0);
        assert_eq!(poller.active_conversation_id().as_deref(), Some("conv-2"));

        poller.stop();
    }

    #[test]
    fn test_stop_is_idempotent_and_safe_when_never_started() {
        let poller = LivePoller::with_periods(SHORT, SHORT);
        poller.stop();
        poller.stop();
        assert!(!poller.is_active());
    }

    #[test]
    fn test_drop_tears_down_workers() {
        let (messages, chats, message_count, _) = counting_callbacks();
        {
            let poller = LivePoller::with_periods(SHORT, SHORT);
            poller.start("conv-1", messages, chats);
            settle();
        }
        let after_drop = message_count.load(Ordering::SeqCst);
        settle();
        assert_eq!(message_count.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_message_callback_receives_conversation_id() {
        let poller = LivePoller::with_periods(SHORT, Duration::from_secs(60));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let messages: MessageRefresh = {
            let seen = Arc::clone(&seen);
            Arc::new(move |conversation_id: &str| {
                seen.lock().unwrap().push(conversation_id.to_string());
            })
        };
        let chats: ChatListRefresh = Arc::new(|| {});

        poller.start("conv-42", messages, chats);
        settle();
        poller.stop();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|id| id == "conv-42"));
    }
}

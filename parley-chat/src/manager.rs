//! Conversation sessions keyed by session id.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parley_core::CompletionBackend;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, warn};

use crate::conversation::{
    ChatOptions, ConversationSession, ConversationSummary, DEFAULT_HISTORY_EXCHANGES, ReplyStream,
};
use crate::error::Result;

/// Session id used when a request does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Live sessions kept before idle ones are evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

struct Slot {
    session: Arc<Mutex<ConversationSession>>,
    last_used: AtomicU64,
}

/// Creates sessions on first use and serializes exchanges per session.
///
/// Each session sits behind its own mutex, held for a whole exchange
/// (including a streamed reply), so requests on one session run in order
/// while different sessions proceed in parallel.
///
/// At most `max_sessions` sessions are kept. Creating one more evicts the
/// least recently used session that no request is holding. Reading or
/// clearing a summary never creates a session.
#[derive(Clone)]
pub struct SessionManager {
    backend: Arc<dyn CompletionBackend>,
    max_exchanges: usize,
    max_sessions: usize,
    sessions: Arc<RwLock<HashMap<String, Slot>>>,
    clock: Arc<AtomicU64>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self::with_max_exchanges(backend, DEFAULT_HISTORY_EXCHANGES)
    }

    pub fn with_max_exchanges(backend: Arc<dyn CompletionBackend>, max_exchanges: usize) -> Self {
        Self {
            backend,
            max_exchanges,
            max_sessions: DEFAULT_MAX_SESSIONS,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cap the number of live sessions (at least one).
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// The session for `session_id`, created if it does not exist yet.
    pub async fn session(&self, session_id: &str) -> Arc<Mutex<ConversationSession>> {
        if let Some(slot) = self.sessions.read().await.get(session_id) {
            slot.last_used.store(self.tick(), Ordering::Relaxed);
            return Arc::clone(&slot.session);
        }

        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session_id) && sessions.len() >= self.max_sessions {
            evict_idle(&mut sessions);
        }
        let slot = sessions.entry(session_id.to_string()).or_insert_with(|| {
            debug!(session.id = session_id, "creating conversation session");
            Slot {
                session: Arc::new(Mutex::new(ConversationSession::with_max_exchanges(
                    Arc::clone(&self.backend),
                    self.max_exchanges,
                ))),
                last_used: AtomicU64::new(0),
            }
        });
        slot.last_used.store(self.tick(), Ordering::Relaxed);
        Arc::clone(&slot.session)
    }

    async fn existing(&self, session_id: &str) -> Option<Arc<Mutex<ConversationSession>>> {
        self.sessions.read().await.get(session_id).map(|slot| Arc::clone(&slot.session))
    }

    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn send(&self, session_id: &str, message: &str, options: &ChatOptions) -> Result<String> {
        let session = self.session(session_id).await;
        let mut session = session.lock().await;
        session.send(message, options).await
    }

    /// Stream a reply; the session stays locked until the stream is dropped.
    pub async fn send_stream(&self, session_id: &str, message: String, options: ChatOptions) -> ReplyStream {
        let guard: OwnedMutexGuard<ConversationSession> = self.session(session_id).await.lock_owned().await;
        ConversationSession::send_stream(guard, message, options)
    }

    /// Forget a session's history. Unknown ids are a no-op.
    pub async fn clear(&self, session_id: &str) {
        if let Some(session) = self.existing(session_id).await {
            session.lock().await.clear();
        }
    }

    /// Summary of a session; an unknown id reads as an empty conversation.
    pub async fn summary(&self, session_id: &str) -> ConversationSummary {
        match self.existing(session_id).await {
            Some(session) => session.lock().await.summary(),
            None => ConversationSummary::empty(),
        }
    }
}

/// Drop the least recently used session nobody else holds.
fn evict_idle(sessions: &mut HashMap<String, Slot>) {
    let victim = sessions
        .iter()
        .filter(|(_, slot)| Arc::strong_count(&slot.session) == 1)
        .min_by_key(|(_, slot)| slot.last_used.load(Ordering::Relaxed))
        .map(|(id, _)| id.clone());

    match victim {
        Some(id) => {
            sessions.remove(&id);
            debug!(session.id = %id, "evicted idle conversation session");
        }
        None => warn!(sessions = sessions.len(), "session limit reached with every session busy"),
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use parley_model::MockBackend;

    use super::*;

    #[tokio::test]
    async fn sessions_are_isolated() {
        let manager = SessionManager::new(Arc::new(MockBackend::new()));
        manager.send("a", "hello", &ChatOptions::default()).await.unwrap();

        assert_eq!(manager.summary("a").await.message_count, 2);
        assert_eq!(manager.summary("b").await.message_count, 0);
        assert!(!manager.has_session("b").await);
    }

    #[tokio::test]
    async fn reading_unknown_sessions_creates_nothing() {
        let manager = SessionManager::new(Arc::new(MockBackend::new()));
        for i in 0..10_000 {
            let id = format!("visitor-{i}");
            assert_eq!(manager.summary(&id).await.message_count, 0);
            manager.clear(&id).await;
        }
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn least_recently_used_idle_session_is_evicted() {
        let manager = SessionManager::new(Arc::new(MockBackend::new())).with_max_sessions(2);
        let options = ChatOptions::default();
        manager.send("a", "one", &options).await.unwrap();
        manager.send("b", "two", &options).await.unwrap();
        manager.send("a", "three", &options).await.unwrap();
        manager.send("c", "four", &options).await.unwrap();

        assert_eq!(manager.session_count().await, 2);
        assert!(manager.has_session("a").await);
        assert!(!manager.has_session("b").await);
        assert!(manager.has_session("c").await);
        assert_eq!(manager.summary("a").await.message_count, 4);
    }

    #[tokio::test]
    async fn held_sessions_survive_the_limit() {
        let manager = SessionManager::new(Arc::new(MockBackend::new())).with_max_sessions(1);
        let held = manager.session("a").await;
        manager.send("b", "hi", &ChatOptions::default()).await.unwrap();

        assert!(manager.has_session("a").await);
        assert!(manager.has_session("b").await);
        drop(held);

        manager.send("c", "hi", &ChatOptions::default()).await.unwrap();
        assert_eq!(manager.session_count().await, 2);
        assert!(manager.has_session("c").await);
    }

    #[tokio::test]
    async fn same_id_returns_same_session() {
        let manager = SessionManager::new(Arc::new(MockBackend::new()));
        let first = manager.session(DEFAULT_SESSION_ID).await;
        let second = manager.session(DEFAULT_SESSION_ID).await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn streamed_exchange_is_recorded() {
        let backend = Arc::new(MockBackend::new().with_fragments(["Hel", "lo"]));
        let manager = SessionManager::new(backend);

        let fragments: Vec<String> = manager
            .send_stream("s", "hi".into(), ChatOptions::default())
            .await
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["Hel", "lo"]);

        let summary = manager.summary("s").await;
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.last_messages[1].content, "Hello");
    }
}

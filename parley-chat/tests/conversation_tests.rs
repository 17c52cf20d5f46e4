//! Conversation history bounds and streamed-reply bookkeeping.

use std::sync::Arc;

use futures::StreamExt;
use parley_chat::{
    ChatError, ChatOptions, ConversationSession, SessionManager, SentimentAnalysis,
    analyze_sentiment,
};
use parley_core::{BackendError, Role};
use parley_model::MockBackend;
use proptest::prelude::*;
use tokio::sync::Mutex;

fn transport_error() -> BackendError {
    BackendError::Transport { provider: "mock".into(), message: "connection reset".into() }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// History never exceeds twice the exchange cap and stays chronological.
    #[test]
    fn history_is_capped_and_chronological(cap in 1usize..6, sends in 0usize..20) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let history = rt.block_on(async {
            let mut session = ConversationSession::with_max_exchanges(Arc::new(MockBackend::new()), cap);
            for i in 0..sends {
                session.send(&format!("{i}"), &ChatOptions::default()).await.unwrap();
            }
            session.history().to_vec()
        });

        prop_assert_eq!(history.len(), (2 * sends).min(2 * cap));
        let users: Vec<usize> = history
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.parse().unwrap())
            .collect();
        let expected: Vec<usize> = (sends.saturating_sub(cap)..sends).collect();
        prop_assert_eq!(users, expected);
        for pair in history.chunks(2) {
            prop_assert_eq!(pair[0].role, Role::User);
            prop_assert_eq!(pair[1].role, Role::Assistant);
        }
    }
}

#[tokio::test]
async fn request_carries_at_most_the_cap() {
    let backend = Arc::new(MockBackend::new());
    let mut session = ConversationSession::with_max_exchanges(backend.clone(), 2);
    for i in 0..6 {
        session.send(&format!("m{i}"), &ChatOptions::default()).await.unwrap();
    }
    // 4 retained history messages plus the new user message
    assert_eq!(backend.last_request().unwrap().messages.len(), 5);
}

#[tokio::test]
async fn stream_failure_partway_commits_partial_reply() {
    let backend = Arc::new(MockBackend::new().with_broken_stream(["The sky ", "is"], transport_error()));
    let session = Arc::new(Mutex::new(ConversationSession::new(backend)));

    let guard = Arc::clone(&session).lock_owned().await;
    let items: Vec<_> =
        ConversationSession::send_stream(guard, "sky?".into(), ChatOptions::default()).collect().await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_deref().unwrap(), "The sky ");
    assert!(matches!(items[2], Err(ChatError::Backend(BackendError::Transport { .. }))));

    let summary = session.lock().await.summary();
    assert_eq!(summary.message_count, 2);
    assert_eq!(summary.last_messages[1].content, "The sky is");
}

#[tokio::test]
async fn stream_failure_before_first_fragment_commits_nothing() {
    let backend = Arc::new(MockBackend::new().with_broken_stream(Vec::<String>::new(), transport_error()));
    let manager = SessionManager::new(backend);

    let items: Vec<_> = manager.send_stream("s", "hi".into(), ChatOptions::default()).await.collect().await;
    assert_eq!(items.len(), 1);
    assert!(items[0].is_err());
    assert_eq!(manager.summary("s").await.message_count, 0);
}

#[tokio::test]
async fn stream_that_cannot_open_commits_nothing() {
    let backend = Arc::new(MockBackend::new().with_failure(transport_error()));
    let manager = SessionManager::new(backend);

    let items: Vec<_> = manager.send_stream("s", "hi".into(), ChatOptions::default()).await.collect().await;
    assert!(matches!(items.as_slice(), [Err(ChatError::Backend(_))]));
    assert_eq!(manager.summary("s").await.message_count, 0);
}

#[tokio::test]
async fn concurrent_sends_on_one_session_are_serialized() {
    let manager = SessionManager::new(Arc::new(MockBackend::new()));
    let opts = ChatOptions::default();
    let (a, b) = tokio::join!(
        manager.send("shared", "first", &opts),
        manager.send("shared", "second", &opts),
    );
    a.unwrap();
    b.unwrap();

    let summary = manager.summary("shared").await;
    assert_eq!(summary.message_count, 4);
    let roles: Vec<Role> = summary.last_messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn malformed_sentiment_falls_back_to_neutral() {
    let backend = MockBackend::new().with_reply("Definitely positive vibes!");
    let analysis = analyze_sentiment(&backend, "I love it").await.unwrap();
    assert_eq!(analysis, SentimentAnalysis::fallback());

    let request = backend.last_request().unwrap();
    assert_eq!(request.max_tokens, 300);
    assert_eq!(request.messages[1].content, "Analyze sentiment: I love it");
}

#[tokio::test]
async fn sentiment_backend_failure_propagates() {
    let backend = MockBackend::new().with_failure(transport_error());
    assert!(matches!(analyze_sentiment(&backend, "meh").await, Err(ChatError::Backend(_))));
}

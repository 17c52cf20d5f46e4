//! # parley-chat
//!
//! Conversations and single-shot language tasks on top of a
//! [`CompletionBackend`](parley_core::CompletionBackend).
//!
//! - [`ConversationSession`] — bounded rolling history, plain and streamed replies
//! - [`SessionManager`] — sessions keyed by id, one exchange at a time per session
//! - [`tasks`] — summarize, generate code, check the backend connection
//! - [`sentiment`] — sentiment analysis parsed through a strict schema

pub mod conversation;
pub mod error;
pub mod manager;
pub mod sentiment;
pub mod tasks;

pub use conversation::{
    ChatOptions, ConversationSession, ConversationSummary, DEFAULT_HISTORY_EXCHANGES, ReplyStream,
};
pub use error::{ChatError, Result};
pub use manager::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_ID, SessionManager};
pub use sentiment::{Sentiment, SentimentAnalysis, analyze_sentiment, parse_sentiment};
pub use tasks::{DEFAULT_CODE_LANGUAGE, DEFAULT_SUMMARY_WORDS, check_connection, generate_code, summarize};

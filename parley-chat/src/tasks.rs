//! Single-shot tasks. None of these touch conversation history.

use parley_core::{CompletionBackend, CompletionRequest};
use tracing::{error, info};

use crate::error::{ChatError, Result};

/// Summary length, in words, when the caller does not say.
pub const DEFAULT_SUMMARY_WORDS: u32 = 500;

/// Language used by [`generate_code`] when the caller does not say.
pub const DEFAULT_CODE_LANGUAGE: &str = "python";

/// Characters of the reply reported by [`check_connection`].
const CONNECTION_PREVIEW_CHARS: usize = 50;

async fn run(backend: &dyn CompletionBackend, task: &str, request: CompletionRequest) -> Result<String> {
    backend.complete(request).await.map_err(|e| {
        error!(task, error = %e, "task failed");
        ChatError::Backend(e)
    })
}

/// Summarize `text` in roughly `max_words` words.
pub async fn summarize(backend: &dyn CompletionBackend, text: &str, max_words: u32) -> Result<String> {
    let system = format!(
        "You are an expert document summarizer. Create a concise, informative summary of the \
         provided text in approximately {max_words} words. Focus on key points, main arguments, \
         and important details."
    );
    let request =
        CompletionRequest::with_system(system, format!("Please summarize this document:\n\n{text}"))
            .max_tokens(max_words.saturating_mul(2))
            .temperature(0.3);
    run(backend, "summarize", request).await
}

/// Generate `language` code that does what `description` says.
pub async fn generate_code(
    backend: &dyn CompletionBackend,
    description: &str,
    language: &str,
) -> Result<String> {
    let system = format!(
        "You are an expert {language} developer. Generate clean, well-commented, production-ready \
         code based on the user's description. Include error handling where appropriate and \
         follow best practices."
    );
    let request =
        CompletionRequest::with_system(system, format!("Generate {language} code: {description}"))
            .max_tokens(1500)
            .temperature(0.2);
    run(backend, "generate_code", request).await
}

/// Send a minimal prompt and return the start of the reply.
///
/// Used for health checks and to verify credentials at startup.
pub async fn check_connection(backend: &dyn CompletionBackend) -> Result<String> {
    let request = CompletionRequest::new(vec![parley_core::Message::user("Hello")]).max_tokens(10);
    let reply = run(backend, "connection check", request).await?;
    info!(backend = backend.name(), "backend connection verified");
    Ok(preview(&reply, CONNECTION_PREVIEW_CHARS))
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use parley_core::Role;
    use parley_model::MockBackend;

    use super::*;

    #[tokio::test]
    async fn summarize_budgets_twice_the_words() {
        let backend = MockBackend::new().with_reply("short");
        assert_eq!(summarize(&backend, "long text", 120).await.unwrap(), "short");

        let request = backend.last_request().unwrap();
        assert_eq!(request.max_tokens, 240);
        assert_eq!(request.temperature, 0.3);
        assert!(request.messages[0].content.contains("approximately 120 words"));
        assert_eq!(request.messages[1].content, "Please summarize this document:\n\nlong text");
    }

    #[tokio::test]
    async fn generate_code_names_the_language() {
        let backend = MockBackend::new();
        generate_code(&backend, "reverse a list", "rust").await.unwrap();

        let request = backend.last_request().unwrap();
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.starts_with("You are an expert rust developer."));
        assert_eq!(request.messages[1].content, "Generate rust code: reverse a list");
        assert_eq!(request.max_tokens, 1500);
    }

    #[tokio::test]
    async fn connection_check_truncates_long_replies() {
        let backend = MockBackend::new().with_reply("x".repeat(80));
        let reply = check_connection(&backend).await.unwrap();
        assert_eq!(reply, format!("{}...", "x".repeat(50)));

        let request = backend.last_request().unwrap();
        assert_eq!(request.max_tokens, 10);
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("Hi there", 50), "Hi there");
        assert_eq!(preview("héllo", 2), "hé...");
    }
}

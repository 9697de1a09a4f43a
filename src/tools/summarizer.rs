//! # Summarizer
//!
//! Comprime conteúdos longos via provedor de completions. Se o provedor
//! falhar (ou devolver vazio), trunca o texto original em `max_words × 5`
//! caracteres + `...`.

use std::sync::Arc;

use crate::llm::{CompletionProvider, CompletionRequest};
use crate::utils::{take_chars, ELLIPSIS};

/// Temperatura dos resumos
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Caracteres por palavra usados no fallback de truncamento
const CHARS_PER_WORD: usize = 5;

/// Resumidor de conteúdo
pub struct Summarizer {
    llm: Arc<dyn CompletionProvider>,
}

impl Summarizer {
    /// Cria resumidor com o provedor dado
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    /// Prompt de resumo
    pub fn build_prompt(text: &str, max_words: usize) -> String {
        format!(
            "Summarize the following text in under {} words, focusing on the key facts and figures:\n\n{}",
            max_words, text
        )
    }

    /// Resume `text` em até `max_words` palavras. Nunca falha.
    pub async fn summarize(&self, text: &str, max_words: usize) -> String {
        let request = CompletionRequest {
            prompt: Self::build_prompt(text, max_words),
            max_tokens: (max_words + 50) as u32,
            temperature: SUMMARY_TEMPERATURE,
            stop: vec!["\n".to_string()],
        };

        match self.llm.complete(&request).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => {
                log::warn!("⚠️ Resumo vazio, usando truncamento");
                truncation_fallback(text, max_words)
            }
            Err(err) => {
                log::error!("❌ Erro ao resumir texto: {}", err);
                truncation_fallback(text, max_words)
            }
        }
    }
}

/// Primeiros `max_words × 5` caracteres + `...`
pub fn truncation_fallback(text: &str, max_words: usize) -> String {
    format!("{}{}", take_chars(text, max_words * CHARS_PER_WORD), ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};

    #[tokio::test]
    async fn test_summarize_uses_provider() {
        let mock = Arc::new(MockLlmClient::new().with_completions(vec![Ok("  Short summary. ".into())]));
        let summarizer = Summarizer::new(mock.clone());

        let summary = summarizer.summarize("long text", 250).await;
        assert_eq!(summary, "Short summary.");

        let request = &mock.completion_requests()[0];
        assert_eq!(request.max_tokens, 300);
        assert!(request.prompt.starts_with("Summarize the following text in under 250 words"));
        assert!(request.prompt.ends_with("\n\nlong text"));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_truncation() {
        let mock = Arc::new(MockLlmClient::new().with_completions(vec![Err(LlmError::Api("boom".into()))]));
        let summarizer = Summarizer::new(mock);

        let text = "a".repeat(2000);
        let summary = summarizer.summarize(&text, 250).await;
        assert_eq!(summary.len(), 1250 + 3);
        assert!(summary.ends_with("..."));
    }

    #[tokio::test]
    async fn test_empty_summary_falls_back() {
        let mock = Arc::new(MockLlmClient::new().with_completions(vec![Ok("   ".into())]));
        let summarizer = Summarizer::new(mock);
        assert_eq!(summarizer.summarize("abc", 10).await, "abc...");
    }
}

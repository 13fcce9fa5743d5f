use crate::llm::{Chat, ChatTurn};
use async_trait::async_trait;
use std::sync::Arc;

/// Language detection + translation to the canonical retrieval language
/// (English). Mirrors the source system's translator component, which
/// always translated a fixed (French → English) pair; this one detects the
/// language instead of assuming it, since the core is not single-locale.
#[async_trait]
pub trait Translator: Send + Sync {
    fn detect(&self, text: &str) -> String;
    async fn translate(&self, text: &str, from: &str, to: &str) -> anyhow::Result<String>;
}

/// No bundled offline translation model ships with this core; detection is
/// a light stopword heuristic and translation is delegated to the
/// configured chat backend with a translation-only instruction.
pub struct HeuristicTranslator {
    chat: Arc<dyn Chat>,
}

impl HeuristicTranslator {
    pub fn new(chat: Arc<dyn Chat>) -> Self {
        Self { chat }
    }
}

const FRENCH_STOPWORDS: &[&str] = &[
    "le", "la", "les", "de", "des", "un", "une", "est", "pour", "avec", "bonjour", "merci",
    "comment", "pourquoi", "qui", "que",
];

#[async_trait]
impl Translator for HeuristicTranslator {
    fn detect(&self, text: &str) -> String {
        let normalized = text.to_lowercase();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        if words.is_empty() {
            return "en".to_string();
        }
        let french_hits = words
            .iter()
            .filter(|w| FRENCH_STOPWORDS.contains(w))
            .count();
        if french_hits as f64 / words.len() as f64 > 0.2 {
            "fr".to_string()
        } else {
            "en".to_string()
        }
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> anyhow::Result<String> {
        if from == to {
            return Ok(text.to_string());
        }
        let prompt = format!(
            "Translate the following text from {from} to {to}. Reply with only the translation, no commentary.\n\n{text}"
        );
        self.chat
            .generate(
                vec![ChatTurn {
                    role: "user".to_string(),
                    content: prompt,
                }],
                0.0,
            )
            .await
    }
}

/// Used when translation is disabled in config; always returns the input
/// unchanged and reports English.
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    fn detect(&self, _text: &str) -> String {
        "en".to_string()
    }

    async fn translate(&self, text: &str, _from: &str, _to: &str) -> anyhow::Result<String> {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoChat;

    #[async_trait]
    impl Chat for EchoChat {
        async fn generate(&self, messages: Vec<ChatTurn>, _temperature: f32) -> anyhow::Result<String> {
            Ok(messages.last().unwrap().content.clone())
        }
    }

    #[test]
    fn detects_english_by_default() {
        let t = HeuristicTranslator::new(Arc::new(EchoChat));
        assert_eq!(t.detect("how do I reset my password"), "en");
    }

    #[test]
    fn detects_french_stopwords() {
        let t = HeuristicTranslator::new(Arc::new(EchoChat));
        assert_eq!(t.detect("comment puis-je reinitialiser le mot de passe"), "fr");
    }

    #[tokio::test]
    async fn passthrough_never_changes_text() {
        let t = PassthroughTranslator;
        let out = t.translate("bonjour", "fr", "en").await.unwrap();
        assert_eq!(out, "bonjour");
    }

    #[tokio::test]
    async fn same_language_short_circuits() {
        let t = HeuristicTranslator::new(Arc::new(EchoChat));
        let out = t.translate("hello", "en", "en").await.unwrap();
        assert_eq!(out, "hello");
    }
}

//! Test-only mock provider.

use std::sync::{Arc, Mutex};

use crate::provider::{ChatStream, LlmProvider, Message};

/// Dimension of the vectors produced by [`MockProvider::embed`].
pub const MOCK_EMBEDDING_DIM: usize = 64;

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    recorded: Arc<Mutex<Vec<Vec<Message>>>>,
    embed_calls: Arc<Mutex<usize>>,
    pub default_response: String,
    pub supports_embeddings: bool,
    pub streaming: bool,
    pub fail_chat: bool,
    pub fail_embed: bool,
    pub embedding_model: String,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            recorded: Arc::new(Mutex::new(Vec::new())),
            embed_calls: Arc::new(Mutex::new(0)),
            default_response: "mock response".into(),
            supports_embeddings: true,
            streaming: true,
            fail_chat: false,
            fail_embed: false,
            embedding_model: "mock-embedding".into(),
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            fail_embed: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_embeddings(mut self) -> Self {
        self.supports_embeddings = false;
        self
    }

    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Message lists received by `chat` and `chat_stream`, oldest first.
    #[must_use]
    pub fn recorded(&self) -> Vec<Vec<Message>> {
        self.recorded.lock().unwrap().clone()
    }

    #[must_use]
    pub fn chat_calls(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    #[must_use]
    pub fn embed_calls(&self) -> usize {
        *self.embed_calls.lock().unwrap()
    }
}

/// Deterministic bag-of-bytes embedding: identical texts map to identical
/// unit vectors, different texts almost always to different directions.
#[must_use]
pub fn mock_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0_f32; MOCK_EMBEDDING_DIM];
    for (i, b) in text.bytes().enumerate() {
        let slot = (usize::from(b) * 31 + i % 7) % MOCK_EMBEDDING_DIM;
        v[slot] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    } else {
        v[0] = 1.0;
    }
    v
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        self.recorded.lock().unwrap().push(messages.to_vec());
        if self.fail_chat {
            return Err(crate::LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, crate::LlmError> {
        let response = self.chat(messages).await?;
        let chunks: Vec<_> = response
            .split_inclusive(' ')
            .map(str::to_owned)
            .map(Ok)
            .collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        *self.embed_calls.lock().unwrap() += 1;
        if !self.supports_embeddings {
            return Err(crate::LlmError::EmbedUnsupported {
                provider: "mock".into(),
            });
        }
        if self.fail_embed {
            return Err(crate::LlmError::Unauthorized {
                provider: "mock".into(),
                status: 401,
            });
        }
        Ok(mock_embedding(text))
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    fn embedding_model(&self) -> Option<&str> {
        self.supports_embeddings
            .then_some(self.embedding_model.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn mock_embedding_is_deterministic_unit_vector() {
        let a = mock_embedding("fn main() {}");
        let b = mock_embedding("fn main() {}");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_ne!(a, mock_embedding("something else entirely"));
    }

    #[test]
    fn mock_embedding_of_empty_text_is_nonzero() {
        assert_eq!(mock_embedding("")[0], 1.0);
    }

    #[tokio::test]
    async fn responses_are_consumed_in_order() {
        let p = MockProvider::with_responses(vec!["one".into(), "two".into()]);
        let msgs = [Message::user("q")];
        assert_eq!(p.chat(&msgs).await.unwrap(), "one");
        assert_eq!(p.chat(&msgs).await.unwrap(), "two");
        assert_eq!(p.chat(&msgs).await.unwrap(), "mock response");
        assert_eq!(p.chat_calls(), 3);
    }

    #[tokio::test]
    async fn stream_concatenates_to_response() {
        let p = MockProvider::with_responses(vec!["a b c".into()]);
        let mut stream = p.chat_stream(&[Message::user("q")]).await.unwrap();
        let mut out = String::new();
        while let Some(part) = stream.next().await {
            out.push_str(&part.unwrap());
        }
        assert_eq!(out, "a b c");
    }

    #[tokio::test]
    async fn without_embeddings_rejects_embed() {
        let p = MockProvider::default().without_embeddings();
        assert!(p.embed("x").await.is_err());
        assert!(p.embedding_model().is_none());
    }
}

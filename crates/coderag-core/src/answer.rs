//! Retrieval-augmented answer composition.

use std::sync::Arc;

use coderag_index::{Retriever, ScoredChunk, format_as_context};
use coderag_llm::any::AnyProvider;
use coderag_llm::provider::{ChatStream, LlmProvider, Message};

use crate::config::Config;
use crate::error::RagError;

/// Prompt sent as the single user message. `{context}`, `{question}` and
/// `{language}` are substituted in one pass.
pub const PROMPT_TEMPLATE: &str = "\
You are a senior programmer and an assistant for this code repository.
Answer the [Question] clearly in {language}, based on the [Context] code provided below.
Use only the information in the [Context]. If the answer cannot be found there, say explicitly: \
\"Based on the provided context, I cannot answer this question.\"

[Context]:
{context}

[Question]:
{question}
";

/// Answers questions about an indexed repository.
pub struct AnswerComposer {
    retriever: Retriever,
    chat: Arc<AnyProvider>,
    top_k: usize,
    language: String,
}

impl AnswerComposer {
    /// Load the index at `config.index.path` and bind the providers.
    ///
    /// The index is opened before anything else, so a missing or mismatched
    /// index fails without contacting either model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] if the index is missing, corrupt, or was
    /// built with a different embedding provider.
    pub async fn open(
        config: &Config,
        chat: Arc<AnyProvider>,
        embed: Arc<AnyProvider>,
    ) -> Result<Self, RagError> {
        let retriever = Retriever::open(config.index_path(), embed).await?;
        tracing::info!(
            entries = retriever.index().len(),
            path = %config.index.path,
            "vector index loaded"
        );
        Ok(Self {
            retriever,
            chat,
            top_k: config.retrieval.top_k,
            language: config.answer.language.clone(),
        })
    }

    #[must_use]
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Retrieve context for `question` and render the full prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] if the question cannot be embedded or searched.
    pub async fn build_prompt(&self, question: &str) -> Result<String, RagError> {
        let hits = self.retriever.retrieve(question, self.top_k).await?;
        log_hits(&hits);
        let context = format_as_context(&hits);
        Ok(render_prompt(&context, question, &self.language))
    }

    /// Blocking mode: the complete answer text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] for retrieval failures and
    /// [`RagError::Llm`] for chat failures.
    pub async fn answer(&self, question: &str) -> Result<String, RagError> {
        let prompt = self.build_prompt(question).await?;
        let answer = self.chat.chat(&[Message::user(prompt)]).await?;
        Ok(answer)
    }

    /// Streaming mode: answer fragments in arrival order.
    ///
    /// Providers without streaming support yield the blocking answer as a
    /// single fragment.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] for retrieval failures and
    /// [`RagError::Llm`] if the request cannot be started.
    pub async fn answer_stream(&self, question: &str) -> Result<ChatStream, RagError> {
        let prompt = self.build_prompt(question).await?;
        let messages = [Message::user(prompt)];
        if self.chat.supports_streaming() {
            return Ok(self.chat.chat_stream(&messages).await?);
        }
        let answer = self.chat.chat(&messages).await?;
        Ok(Box::pin(futures::stream::iter([Ok(answer)])))
    }
}

fn log_hits(hits: &[ScoredChunk]) {
    for hit in hits {
        tracing::debug!(
            source = %hit.chunk.source,
            chunk = hit.chunk.chunk_index,
            score = hit.score,
            "context chunk"
        );
    }
}

/// Substitute the template placeholders without re-scanning inserted text.
#[must_use]
pub fn render_prompt(context: &str, question: &str, language: &str) -> String {
    let mut out = String::with_capacity(PROMPT_TEMPLATE.len() + context.len() + question.len());
    let mut rest = PROMPT_TEMPLATE;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let (value, consumed) = if tail.starts_with("{context}") {
            (context, "{context}".len())
        } else if tail.starts_with("{question}") {
            (question, "{question}".len())
        } else if tail.starts_with("{language}") {
            (language, "{language}".len())
        } else {
            ("{", 1)
        };
        out.push_str(value);
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

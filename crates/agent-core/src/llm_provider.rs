//! Abstraction over LLM transports so multiple vendors can plug into the
//! agent core.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::AgentError;
use crate::model::{FunctionCall, Part, Turn, TurnRole};
use crate::registry::FunctionDecl;

/// One model response: free text, zero or more function calls, and the raw
/// turn to append to history when calls get dispatched.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub text: Option<String>,
    pub calls: Vec<FunctionCall>,
    pub turn: Turn,
}

impl ModelReply {
    /// Build a reply from parts, deriving text and calls from the turn.
    pub fn from_turn(turn: Turn) -> Self {
        let text = {
            let joined = turn.text();
            if joined.trim().is_empty() {
                None
            } else {
                Some(joined)
            }
        };
        let calls = turn.function_calls().into_iter().cloned().collect();
        Self { text, calls, turn }
    }

    pub fn has_calls(&self) -> bool {
        !self.calls.is_empty()
    }
}

/// The transport contract the loop depends on. Implementations must support
/// structured function-calling with named, typed parameters.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One model turn over the full history.
    async fn generate(
        &self,
        history: &[Turn],
        system_prompt: &str,
        catalogue: &[FunctionDecl],
    ) -> Result<ModelReply, AgentError>;

    /// Token count for the full history, used by budget pruning.
    async fn count_tokens(&self, history: &[Turn]) -> Result<u64, AgentError>;
}

/// Deterministic provider used for tests and offline development: serves a
/// scripted queue of replies and charges a flat token price per turn.
pub struct MockLlmProvider {
    replies: Mutex<VecDeque<ModelReply>>,
    seen: Mutex<Vec<Vec<Turn>>>,
    tokens_per_turn: u64,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
            tokens_per_turn: 10,
        }
    }

    pub fn with_tokens_per_turn(mut self, tokens: u64) -> Self {
        self.tokens_per_turn = tokens;
        self
    }

    /// Queue a reply built from model-turn parts.
    pub fn enqueue_parts(&self, parts: Vec<Part>) {
        let reply = ModelReply::from_turn(Turn::new(TurnRole::Model, parts));
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Queue a call-carrying reply with a thinking line.
    pub fn enqueue_call(&self, thinking: &str, call: FunctionCall) {
        self.enqueue_parts(vec![
            Part::Text(thinking.to_string()),
            Part::FunctionCall(call),
        ]);
    }

    /// Queue a text-only reply (no actionable calls).
    pub fn enqueue_text(&self, text: &str) {
        self.enqueue_parts(vec![Part::Text(text.to_string())]);
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    /// The history snapshots this provider was invoked with, in order.
    pub fn seen_histories(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().unwrap().clone()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn generate(
        &self,
        history: &[Turn],
        _system_prompt: &str,
        _catalogue: &[FunctionDecl],
    ) -> Result<ModelReply, AgentError> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::transport("mock provider ran out of scripted replies"))
    }

    async fn count_tokens(&self, history: &[Turn]) -> Result<u64, AgentError> {
        Ok(history.len() as u64 * self.tokens_per_turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_replies_come_back_in_order() {
        let provider = MockLlmProvider::new();
        provider.enqueue_text("thinking");
        provider.enqueue_call("go", FunctionCall::new("go_back"));

        let first = provider.generate(&[], "", &[]).await.unwrap();
        assert!(!first.has_calls());
        assert_eq!(first.text.as_deref(), Some("thinking"));

        let second = provider.generate(&[], "", &[]).await.unwrap();
        assert!(second.has_calls());
        assert_eq!(second.calls[0].name, "go_back");

        assert!(provider.generate(&[], "", &[]).await.is_err());
    }

    #[tokio::test]
    async fn token_count_scales_with_history() {
        let provider = MockLlmProvider::new().with_tokens_per_turn(7);
        let history = vec![Turn::user_text("a"), Turn::user_text("b")];
        assert_eq!(provider.count_tokens(&history).await.unwrap(), 14);
    }

    #[test]
    fn blank_text_is_treated_as_missing() {
        let reply = ModelReply::from_turn(Turn::model_text("   "));
        assert!(reply.text.is_none());
    }
}

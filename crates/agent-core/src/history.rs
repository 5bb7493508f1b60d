//! Token-budget management for the conversation history.

use tracing::{debug, warn};

use crate::errors::AgentError;
use crate::llm_provider::LlmProvider;
use crate::model::Turn;

/// The minimum retained window: the first user turn (the task prompt, which
/// must survive or the agent loses its goal) plus one model/tool exchange.
pub const MIN_RETAINED_TURNS: usize = 3;

/// What pruning did to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneOutcome {
    /// Already within budget; history unchanged.
    WithinBudget,
    /// Removed this many turns to get back under the limit.
    Pruned { removed: usize },
    /// Still over the limit but nothing more can go. The run proceeds in a
    /// degraded posture; the transport may still reject the request later.
    Exhausted { removed: usize, tokens: u64 },
}

/// Prune the oldest exchanges until the history fits the token budget.
///
/// The first turn is never removed; pruning takes the two turns immediately
/// after it (the oldest model/tool pair), preserving recency because recent
/// state matters most for the next decision.
pub async fn ensure_within_budget<P>(
    history: &mut Vec<Turn>,
    token_limit: u64,
    provider: &P,
) -> Result<PruneOutcome, AgentError>
where
    P: LlmProvider + ?Sized,
{
    let mut removed = 0usize;
    loop {
        let tokens = provider.count_tokens(history).await?;
        debug!(tokens, token_limit, turns = history.len(), "history budget check");

        if tokens <= token_limit {
            return Ok(if removed == 0 {
                PruneOutcome::WithinBudget
            } else {
                PruneOutcome::Pruned { removed }
            });
        }

        if history.len() > MIN_RETAINED_TURNS {
            history.drain(1..3);
            removed += 2;
        } else {
            warn!(
                tokens,
                token_limit, "history cannot be pruned further; proceeding over budget"
            );
            return Ok(PruneOutcome::Exhausted { removed, tokens });
        }
    }
}

//! The agent loop execution mode.
//!
//! The model is consulted at each step to decide the next action based on
//! the current browser state:
//!
//! ```text
//! loop:
//!     prune history to the token budget
//!     reply = llm.generate(history, system prompt, catalogue)
//!     no calls?  -> nudge | finished | abort (safety governor)
//!     for each call: dispatch -> capture feedback -> append tool turn
//! ```
//!
//! # Key Components
//!
//! - [`AgentConfig`]: run parameters, fixed at session start
//! - [`Session`]: history, safety counter, finished flag, step log
//! - [`AgentLoop`]: the orchestrating controller
//! - [`RunOutcome`]: terminal status plus the audit trail

pub mod config;
pub mod controller;
pub mod prompt;
pub mod session;

pub use config::AgentConfig;
pub use controller::{AgentLoop, RunOutcome, RunStatus};
pub use prompt::system_prompt;
pub use session::{FinishSummary, Session};

//! WebPilot agent core.
//!
//! Turns the unbounded back-and-forth between a function-calling language
//! model and a live browser into a bounded, auditable, recoverable run:
//! conversation management under a token budget, typed action dispatch,
//! coordinate normalization, screenshot feedback, and the safety governor
//! that keeps the loop from running away.

pub mod actions;
pub mod agent_loop;
pub mod audit;
pub mod capture;
pub mod cleaner;
pub mod coords;
pub mod dispatcher;
pub mod driver;
pub mod errors;
pub mod governor;
pub mod history;
pub mod llm_provider;
pub mod methods;
pub mod model;
pub mod registry;

pub use actions::{parse_call, AgentAction, FinishStatus, ParsedCall, SchemaViolation};
pub use agent_loop::{AgentConfig, AgentLoop, FinishSummary, RunOutcome, RunStatus, Session};
pub use audit::{AuditSink, FsAuditSink, TracingAuditSink};
pub use capture::{mark_screenshot, marker_note, MARKER_SIZE};
pub use cleaner::{ContentCleaner, MarkupCleaner};
pub use coords::{map_point, MODEL_SPACE};
pub use dispatcher::{ActionResult, ActionStatus, Dispatcher};
pub use driver::{BrowserDriver, DriverError, ElementHandle, MockBrowserDriver};
pub use errors::AgentError;
pub use governor::{Decision, SafetyGovernor, DEFAULT_SAFETY_CEILING};
pub use history::{ensure_within_budget, PruneOutcome, MIN_RETAINED_TURNS};
pub use llm_provider::{LlmProvider, MockLlmProvider, ModelReply};
pub use methods::{HostMethodError, HostMethods};
pub use model::{FunctionCall, Part, Turn, TurnRole};
pub use registry::{action_catalogue, FunctionDecl, ParamKind, ParamSpec};

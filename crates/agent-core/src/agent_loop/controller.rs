//! The agent loop: builds context, invokes the model, interprets the
//! response, dispatches actions, captures feedback, repeats.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use webpilot_core_types::Point;

use super::config::AgentConfig;
use super::prompt::{system_prompt, DESCRIPTION_REMINDER, NUDGE, STEP_FOLLOWUP, THOUGHTS_REMINDER};
use super::session::{FinishSummary, Session};
use crate::actions::{parse_call, FinishStatus, ParsedCall};
use crate::audit::AuditSink;
use crate::capture::{mark_screenshot, marker_note};
use crate::cleaner::ContentCleaner;
use crate::coords::map_point;
use crate::dispatcher::{ActionResult, Dispatcher};
use crate::driver::BrowserDriver;
use crate::errors::AgentError;
use crate::governor::{Decision, SafetyGovernor};
use crate::history::ensure_within_budget;
use crate::llm_provider::LlmProvider;
use crate::methods::HostMethods;
use crate::model::{Part, Turn};
use crate::registry::action_catalogue;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The model explicitly finished and the summary was recorded.
    Finished,
    /// Safety ceiling, validation mismatch, or unrecoverable failure.
    Aborted,
}

/// What a run produced: exactly one terminal status, the cause, and the
/// accumulated audit trail.
#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub message: String,
    pub summary: Option<FinishSummary>,
    pub step_log: Vec<String>,
    pub steps_taken: usize,
    pub error: Option<AgentError>,
}

impl RunOutcome {
    /// Finished with a passing summary (or no explicit status).
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Finished
            && self
                .summary
                .as_ref()
                .map(|s| s.status == FinishStatus::Pass)
                .unwrap_or(true)
    }
}

/// Orchestrator owning one run at a time. The only component with
/// cross-cutting knowledge; dispatcher, governor, mapper, and history
/// manager stay unaware of each other.
pub struct AgentLoop {
    config: AgentConfig,
    provider: Arc<dyn LlmProvider>,
    driver: Arc<dyn BrowserDriver>,
    dispatcher: Dispatcher,
    governor: SafetyGovernor,
    audit: Arc<dyn AuditSink>,
}

impl AgentLoop {
    pub fn new(
        config: AgentConfig,
        provider: Arc<dyn LlmProvider>,
        driver: Arc<dyn BrowserDriver>,
        cleaner: Arc<dyn ContentCleaner>,
        methods: Arc<HostMethods>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            driver.clone(),
            cleaner,
            methods,
            audit.clone(),
            config.action_space,
            config.scroll_magnitude,
        );
        let governor = SafetyGovernor::new(config.safety_ceiling);
        Self {
            config,
            provider,
            driver,
            dispatcher,
            governor,
            audit,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Execute one task to its terminal state. A new run starts a fresh
    /// session; there are no partial-cancellation or resume semantics.
    pub async fn run(&self, task_prompt: &str) -> RunOutcome {
        let mut session = Session::new(task_prompt);
        info!(run = %session.run_id, "starting agent run");

        let result = self.run_session(&mut session).await;
        self.audit.run_log(&session.rendered_log());

        match result {
            Ok(summary) => {
                info!(run = %session.run_id, "run finished: {}", summary.summary);
                RunOutcome {
                    status: RunStatus::Finished,
                    message: summary.summary.clone(),
                    summary: Some(summary),
                    steps_taken: session.step_log.len(),
                    step_log: session.step_log,
                    error: None,
                }
            }
            Err(err) => {
                warn!(run = %session.run_id, %err, "run aborted");
                RunOutcome {
                    status: RunStatus::Aborted,
                    message: err.to_string(),
                    summary: session.finish_summary.clone(),
                    steps_taken: session.step_log.len(),
                    step_log: session.step_log,
                    error: Some(err),
                }
            }
        }
    }

    async fn run_session(&self, session: &mut Session) -> Result<FinishSummary, AgentError> {
        // Consistent resolution first, or coordinate mapping drifts.
        self.driver
            .set_viewport(self.config.viewport)
            .await
            .map_err(|err| AgentError::environment(format!("viewport setup failed: {err}")))?;

        loop {
            ensure_within_budget(
                &mut session.history,
                self.config.token_limit,
                self.provider.as_ref(),
            )
            .await?;

            let reply = self
                .provider
                .generate(&session.history, system_prompt(), action_catalogue())
                .await?;

            match &reply.text {
                Some(text) => debug!(thoughts = %text, "model thoughts"),
                None => session.history.push(Turn::user_text(THOUGHTS_REMINDER)),
            }

            let decision =
                self.governor
                    .assess(&mut session.safety_counter, session.finished, reply.has_calls());
            match decision {
                Decision::Finished => {
                    return Ok(session.finish_summary.clone().unwrap_or(FinishSummary {
                        status: FinishStatus::Pass,
                        summary: reply.text.unwrap_or_default(),
                    }));
                }
                Decision::Abort => {
                    return Err(AgentError::SafetyCeilingExceeded {
                        limit: self.governor.ceiling(),
                    });
                }
                Decision::Nudge => {
                    debug!(counter = session.safety_counter, "no function call; nudging");
                    session.history.push(Turn::user_text(NUDGE));
                    continue;
                }
                Decision::Continue => {}
            }

            session.history.push(reply.turn.clone());

            for call in &reply.calls {
                let parsed = match parse_call(call) {
                    Ok(parsed) => parsed,
                    Err(violation) => {
                        warn!(%violation, "dropping call with invalid arguments");
                        session.log_step(format!("dropped invalid call: {violation}"));
                        let mut values = Map::new();
                        values.insert("status".to_string(), Value::String("error".into()));
                        values.insert("message".to_string(), Value::String(violation.to_string()));
                        session.history.push(Turn::tool(vec![Part::FunctionResponse {
                            name: call.name.clone(),
                            values,
                        }]));
                        continue;
                    }
                };

                // Audit-only capture of the state the action acted on.
                self.audit_capture(&parsed, "before step").await;

                let result = self.dispatcher.dispatch(&parsed, session).await?;
                self.governor.record_dispatch(&mut session.safety_counter);

                if parsed.description.is_none() {
                    session.history.push(Turn::user_text(DESCRIPTION_REMINDER));
                }

                if self.config.settle_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
                }

                self.append_feedback(&parsed, result, session).await;
            }
        }
    }

    /// Device-pixel target of a coordinate-carrying call, mapped against
    /// the live viewport.
    async fn device_target(&self, parsed: &ParsedCall) -> Option<Point> {
        let target = parsed.target?;
        match self.driver.viewport().await {
            Ok(viewport) => Some(map_point(target, self.config.action_space, viewport)),
            Err(err) => {
                warn!(%err, "viewport query failed; skipping marker");
                None
            }
        }
    }

    /// Capture for the audit trail only; never appended to history.
    async fn audit_capture(&self, parsed: &ParsedCall, label: &str) {
        let png = match self.driver.screenshot().await {
            Ok(png) => png,
            Err(err) => {
                debug!(%err, "audit capture failed");
                return;
            }
        };
        let bytes = match self.device_target(parsed).await {
            Some(device) => mark_screenshot(&png, device).unwrap_or(png),
            None => png,
        };
        self.audit.attach(label, "image/png", &bytes);
    }

    /// Append the function response, feedback screenshot (marked when the
    /// action targeted a point), and follow-up instruction to history.
    async fn append_feedback(
        &self,
        parsed: &ParsedCall,
        result: ActionResult,
        session: &mut Session,
    ) {
        if let Some(target) = parsed.target {
            session.history.push(Turn::user_text(marker_note(target)));
        }

        let mut parts = vec![Part::FunctionResponse {
            name: parsed.call_name.clone(),
            values: result.response_values(),
        }];

        if let Some(payload) = result.screenshot {
            parts.push(Part::InlineImage {
                mime: "image/png".to_string(),
                data: payload,
            });
        }

        match self.driver.screenshot().await {
            Ok(png) => {
                let bytes = match self.device_target(parsed).await {
                    Some(device) => mark_screenshot(&png, device).unwrap_or(png),
                    None => png,
                };
                self.audit.attach("after step", "image/png", &bytes);
                parts.push(Part::InlineImage {
                    mime: "image/png".to_string(),
                    data: bytes,
                });
            }
            Err(err) => {
                // The model simply gets no image this turn.
                warn!(%err, "feedback capture failed");
            }
        }

        parts.push(Part::Text(STEP_FOLLOWUP.to_string()));
        session.history.push(Turn::tool(parts));
    }
}

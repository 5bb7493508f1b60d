//! Mutable state of one agent run.

use serde::{Deserialize, Serialize};
use webpilot_core_types::RunId;

use crate::actions::FinishStatus;
use crate::model::Turn;

/// Summary recorded by the explicit completion action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinishSummary {
    pub status: FinishStatus,
    pub summary: String,
}

/// The state of one run: conversation history, stall counter, finished
/// flag, and the human-readable step log.
///
/// Owned and mutated exclusively by the agent loop; discarded when the run
/// ends. The step log is audit-only and never reaches the model.
#[derive(Debug)]
pub struct Session {
    pub run_id: RunId,
    pub history: Vec<Turn>,
    pub safety_counter: u32,
    pub finished: bool,
    pub step_log: Vec<String>,
    pub finish_summary: Option<FinishSummary>,
}

impl Session {
    /// Start a session with the task prompt as the first user turn.
    pub fn new(task_prompt: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            history: vec![Turn::user_text(task_prompt)],
            safety_counter: 0,
            finished: false,
            step_log: Vec::new(),
            finish_summary: None,
        }
    }

    pub fn log_step(&mut self, entry: impl Into<String>) {
        self.step_log.push(entry.into());
    }

    pub fn record_finish(&mut self, status: FinishStatus, summary: impl Into<String>) {
        let summary = summary.into();
        self.step_log.push(format!("Summary: {summary}"));
        self.finish_summary = Some(FinishSummary { status, summary });
        self.finished = true;
    }

    /// The accumulated step log as one report.
    pub fn rendered_log(&self) -> String {
        self.step_log.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_seeded_with_the_task_prompt() {
        let session = Session::new("buy a rubber duck");
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].text(), "buy a rubber duck");
        assert_eq!(session.safety_counter, 0);
        assert!(!session.finished);
    }

    #[test]
    fn recording_a_finish_flips_the_flag_and_logs_the_summary() {
        let mut session = Session::new("task");
        session.record_finish(FinishStatus::Pass, "everything worked");
        assert!(session.finished);
        assert_eq!(session.rendered_log(), "Summary: everything worked");
        assert_eq!(
            session.finish_summary.as_ref().unwrap().status,
            FinishStatus::Pass
        );
    }
}

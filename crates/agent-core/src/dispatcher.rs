//! Executes one typed action against the environment and shapes the result.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use webpilot_core_types::{Point, Viewport};

use crate::actions::{AgentAction, ParsedCall, ScrollDirection};
use crate::agent_loop::session::Session;
use crate::audit::AuditSink;
use crate::cleaner::ContentCleaner;
use crate::coords::map_point;
use crate::driver::{BrowserDriver, DriverError, ElementHandle};
use crate::errors::AgentError;
use crate::methods::HostMethods;

/// Outcome status of one dispatched action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Structured result of one dispatched action, fed back to the model and
/// enriched with the current location for audit purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub extra: Map<String, Value>,
    /// Raw screenshot payload for the explicit screenshot action; sent to
    /// the model as an image part, not inside the JSON values.
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ActionResult {
    pub fn success() -> Self {
        Self {
            status: ActionStatus::Success,
            message: None,
            extra: Map::new(),
            screenshot: None,
            url: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            message: Some(message.into()),
            ..Self::success()
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }

    /// Flatten into the value map of a function response part.
    pub fn response_values(&self) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert(
            "status".to_string(),
            Value::String(
                match self.status {
                    ActionStatus::Success => "success",
                    ActionStatus::Error => "error",
                }
                .to_string(),
            ),
        );
        if let Some(message) = &self.message {
            values.insert("message".to_string(), Value::String(message.clone()));
        }
        for (key, value) in &self.extra {
            values.insert(key.clone(), value.clone());
        }
        if self.screenshot.is_some() {
            values.insert("screenshot".to_string(), Value::String("attached".into()));
        }
        if let Some(url) = &self.url {
            values.insert("url".to_string(), Value::String(url.clone()));
        }
        values
    }
}

/// Control types the pre-clear guard refuses to touch.
const NON_CLEARABLE_TYPES: [&str; 6] = ["checkbox", "radio", "button", "submit", "file", "hidden"];

/// Whether a resolved element may safely be cleared before typing: a plain
/// text control, enabled, and not read-only.
pub fn is_clearable(element: &ElementHandle) -> bool {
    let text_entry = element.tag_name.eq_ignore_ascii_case("input")
        || element.tag_name.eq_ignore_ascii_case("textarea");
    let invalid_type = element
        .attr("type")
        .map(|t| NON_CLEARABLE_TYPES.contains(&t.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    let disabled = element.has_attr("disabled");
    let readonly = element.has_attr("readonly");
    text_entry && !invalid_type && !disabled && !readonly
}

/// Executes single named actions against the environment.
pub struct Dispatcher {
    driver: Arc<dyn BrowserDriver>,
    cleaner: Arc<dyn ContentCleaner>,
    methods: Arc<HostMethods>,
    audit: Arc<dyn AuditSink>,
    action_space: Viewport,
    scroll_magnitude: i32,
}

impl Dispatcher {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        cleaner: Arc<dyn ContentCleaner>,
        methods: Arc<HostMethods>,
        audit: Arc<dyn AuditSink>,
        action_space: Viewport,
        scroll_magnitude: i32,
    ) -> Self {
        Self {
            driver,
            cleaner,
            methods,
            audit,
            action_space,
            scroll_magnitude,
        }
    }

    /// Dispatch one parsed call as one auditable step.
    ///
    /// Environment failures land in the result as `status=error` so the
    /// model can adapt; only a validation mismatch is returned as a fatal
    /// error.
    pub async fn dispatch(
        &self,
        parsed: &ParsedCall,
        session: &mut Session,
    ) -> Result<ActionResult, AgentError> {
        let step = parsed.step_description();
        self.audit.step(&step);
        session.log_step(step);

        let mut result = self.execute(&parsed.action, session).await?;

        if parsed.safety_decision {
            result = result.with_extra("safety_acknowledgement", "true");
        }
        if parsed.description.is_none() {
            result = result.with_extra("warning", "mandatory description field missing");
        }
        if let Ok(url) = self.driver.current_url().await {
            result.url = Some(url);
        }

        debug!(
            call = %parsed.call_name,
            status = ?result.status,
            detail = result.message.as_deref().unwrap_or(""),
            "dispatched action"
        );
        Ok(result)
    }

    async fn execute(
        &self,
        action: &AgentAction,
        session: &mut Session,
    ) -> Result<ActionResult, AgentError> {
        let result = match action {
            AgentAction::OpenBrowser => ActionResult::success(),
            AgentAction::Navigate { url } => self.plain(self.driver.navigate(url)).await,
            AgentAction::GoBack => self.plain(self.driver.back()).await,
            AgentAction::ClickElement { selector } => match self.click_selector(selector).await {
                Ok(()) => ActionResult::success(),
                Err(err) => ActionResult::error(err.to_string()),
            },
            AgentAction::ClickAt { point } => match self.click_point(*point).await {
                Ok(()) => ActionResult::success(),
                Err(err) => ActionResult::error(err.to_string()),
            },
            AgentAction::TypeText { text, selector } => {
                match self.type_text(text, selector.as_deref()).await {
                    Ok(()) => ActionResult::success(),
                    Err(err) => ActionResult::error(err.to_string()),
                }
            }
            AgentAction::TypeTextAt {
                point,
                text,
                clear_before_typing,
                press_enter,
            } => match self
                .type_text_at(*point, text, *clear_before_typing, *press_enter, session)
                .await
            {
                Ok(()) => ActionResult::success(),
                Err(err) => ActionResult::error(err.to_string()),
            },
            AgentAction::ScrollDocument {
                direction,
                magnitude,
            } => {
                let distance = magnitude.unwrap_or(self.scroll_magnitude);
                let dy = match direction {
                    ScrollDirection::Down => distance,
                    ScrollDirection::Up => -distance,
                };
                self.plain(self.driver.scroll_by(0, dy)).await
            }
            AgentAction::HoverAt { point } => match self.hover_point(*point).await {
                Ok(()) => ActionResult::success(),
                Err(err) => ActionResult::error(err.to_string()),
            },
            AgentAction::Wait { seconds } => {
                tokio::time::sleep(Duration::from_secs(*seconds)).await;
                ActionResult::success()
            }
            AgentAction::TakeScreenshot => match self.driver.screenshot().await {
                Ok(bytes) => {
                    let mut result = ActionResult::success();
                    result.screenshot = Some(bytes);
                    result
                }
                Err(err) => ActionResult::error(err.to_string()),
            },
            AgentAction::GetPageContent => match self.driver.outer_html().await {
                Ok(raw) => {
                    let cleaned = self.cleaner.clean(&raw);
                    self.audit
                        .attach("DOM Content", "text/html", cleaned.as_bytes());
                    ActionResult::success()
                        .with_extra("content", format!("Current page DOM:\n{cleaned}"))
                }
                Err(err) => ActionResult::error(err.to_string()),
            },
            AgentAction::CallMethod { name, parameter } => {
                match self.methods.invoke(name, parameter) {
                    Ok(Some(value)) => ActionResult::success().with_extra("value", value),
                    Ok(None) => ActionResult::success(),
                    Err(err) => {
                        warn!(method = %name, %err, "host method invocation failed");
                        ActionResult::error(err.to_string())
                    }
                }
            }
            AgentAction::ReportIssue {
                expected_value,
                actual_value,
                error_message,
            } => {
                if expected_value == actual_value {
                    ActionResult::success()
                } else {
                    return Err(AgentError::ValidationFailed {
                        expected: expected_value.clone(),
                        actual: actual_value.clone(),
                        detail: error_message.clone(),
                    });
                }
            }
            AgentAction::Finish { status, summary } => {
                session.record_finish(*status, summary.clone());
                ActionResult::success()
            }
            AgentAction::Unsupported => ActionResult::error("unsupported function"),
        };
        Ok(result)
    }

    /// Run a simple driver operation, capturing failures into the result.
    async fn plain(
        &self,
        op: impl std::future::Future<Output = Result<(), DriverError>>,
    ) -> ActionResult {
        match op.await {
            Ok(()) => ActionResult::success(),
            Err(err) => ActionResult::error(err.to_string()),
        }
    }

    /// Map an action-space point into device pixels against the live
    /// viewport, queried fresh because it may change between turns.
    async fn device_point(&self, point: Point) -> Result<Point, DriverError> {
        let viewport = self.driver.viewport().await?;
        Ok(map_point(point, self.action_space, viewport))
    }

    async fn click_selector(&self, selector: &str) -> Result<(), DriverError> {
        let element = self.driver.find_element(selector).await?;
        self.driver.highlight(&element).await?;
        self.driver.click(&element).await
    }

    async fn click_point(&self, point: Point) -> Result<(), DriverError> {
        let device = self.device_point(point).await?;
        let element = self.driver.element_at(device).await?;
        self.driver.click(&element).await
    }

    async fn hover_point(&self, point: Point) -> Result<(), DriverError> {
        let device = self.device_point(point).await?;
        let element = self.driver.element_at(device).await?;
        self.driver.hover(&element).await
    }

    async fn type_text(&self, text: &str, selector: Option<&str>) -> Result<(), DriverError> {
        if let Some(selector) = selector {
            let element = self.driver.find_element(selector).await?;
            self.driver.highlight(&element).await?;
            self.driver.click(&element).await?;
        }
        self.driver.send_keys(text).await
    }

    async fn type_text_at(
        &self,
        point: Point,
        text: &str,
        clear_before_typing: bool,
        press_enter: bool,
        session: &mut Session,
    ) -> Result<(), DriverError> {
        let device = self.device_point(point).await?;

        if clear_before_typing {
            let element = self.driver.element_at(device).await?;
            if is_clearable(&element) {
                self.driver.clear(&element).await?;
            } else {
                debug!(tag = %element.tag_name, "skipped clearing element");
                session.log_step(format!("skipped clearing <{}>", element.tag_name));
            }
        }

        let element = self.driver.element_at(device).await?;
        self.driver.click(&element).await?;
        self.driver.send_keys(text).await?;
        if press_enter {
            self.driver.press_enter().await?;
        }
        Ok(())
    }
}

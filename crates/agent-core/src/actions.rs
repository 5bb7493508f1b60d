//! Typed actions parsed from raw model function calls.
//!
//! Each action variant carries its own concrete parameter record; arguments
//! are validated against the declared schema at this boundary so dispatch
//! never sees an untyped string-keyed map.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use webpilot_core_types::Point;

use crate::model::FunctionCall;
use crate::registry::names;

/// Scroll direction accepted by `scroll_document`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Declared outcome of a finished run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinishStatus {
    Pass,
    Fail,
}

/// One fully-typed action request from the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AgentAction {
    OpenBrowser,
    Navigate {
        url: String,
    },
    GoBack,
    ClickElement {
        selector: String,
    },
    ClickAt {
        point: Point,
    },
    TypeText {
        text: String,
        selector: Option<String>,
    },
    TypeTextAt {
        point: Point,
        text: String,
        clear_before_typing: bool,
        press_enter: bool,
    },
    ScrollDocument {
        direction: ScrollDirection,
        magnitude: Option<i32>,
    },
    HoverAt {
        point: Point,
    },
    Wait {
        seconds: u64,
    },
    TakeScreenshot,
    GetPageContent,
    CallMethod {
        name: String,
        parameter: String,
    },
    ReportIssue {
        expected_value: String,
        actual_value: String,
        error_message: String,
    },
    Finish {
        status: FinishStatus,
        summary: String,
    },
    /// Name outside the catalogue. Dispatched as a non-fatal error result.
    Unsupported,
}

/// A parsed call plus the protocol metadata that rides along with it.
#[derive(Debug, Clone)]
pub struct ParsedCall {
    pub action: AgentAction,
    /// Name as the model sent it, echoed back in the function response.
    pub call_name: String,
    /// The mandatory per-call rationale, when the model remembered it.
    pub description: Option<String>,
    /// Present when the model attached a safety decision to the call.
    pub safety_decision: bool,
    /// Action-space coordinates, when the call targeted a point.
    pub target: Option<Point>,
}

impl ParsedCall {
    /// Step description for the audit log: the declared rationale or a
    /// fallback built from the call itself.
    pub fn step_description(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => format!("{} {:?}", self.call_name, self.action),
        }
    }
}

/// The model emitted arguments that do not match the declared schema.
/// Caught locally; the attempt is dropped with a diagnostic and the loop
/// continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid arguments for '{call}': {detail}")]
pub struct SchemaViolation {
    pub call: String,
    pub detail: String,
}

impl SchemaViolation {
    fn new(call: &str, detail: impl Into<String>) -> Self {
        Self {
            call: call.to_string(),
            detail: detail.into(),
        }
    }
}

/// Validate and type a raw function call.
///
/// Unknown names parse successfully into [`AgentAction::Unsupported`]; that
/// outcome is an error *result*, not a schema violation, so the model gets
/// told rather than ignored.
pub fn parse_call(call: &FunctionCall) -> Result<ParsedCall, SchemaViolation> {
    let require_str = |key: &str| {
        call.arg_str(key)
            .map(str::to_string)
            .ok_or_else(|| SchemaViolation::new(&call.name, format!("missing required field '{key}'")))
    };
    let require_point = || -> Result<Point, SchemaViolation> {
        let x = call
            .arg_i32("x")
            .ok_or_else(|| SchemaViolation::new(&call.name, "missing required field 'x'"))?;
        let y = call
            .arg_i32("y")
            .ok_or_else(|| SchemaViolation::new(&call.name, "missing required field 'y'"))?;
        Ok(Point::new(x, y))
    };

    let action = match call.name.as_str() {
        names::OPEN_BROWSER => AgentAction::OpenBrowser,
        names::NAVIGATE => AgentAction::Navigate {
            url: require_str("url")?,
        },
        names::GO_BACK => AgentAction::GoBack,
        names::CLICK_ELEMENT => AgentAction::ClickElement {
            selector: require_str("selector")?,
        },
        names::CLICK_AT => AgentAction::ClickAt {
            point: require_point()?,
        },
        names::TYPE_TEXT => AgentAction::TypeText {
            text: require_str("text")?,
            selector: call.arg_str("selector").map(str::to_string),
        },
        names::TYPE_TEXT_AT => AgentAction::TypeTextAt {
            point: require_point()?,
            text: require_str("text")?,
            clear_before_typing: call.arg_bool("clear_before_typing").unwrap_or(false),
            press_enter: call.arg_bool("press_enter").unwrap_or(false),
        },
        names::SCROLL_DOCUMENT => {
            let direction = match require_str("direction")?.as_str() {
                "up" => ScrollDirection::Up,
                "down" => ScrollDirection::Down,
                other => {
                    return Err(SchemaViolation::new(
                        &call.name,
                        format!("direction must be 'up' or 'down', got '{other}'"),
                    ))
                }
            };
            AgentAction::ScrollDocument {
                direction,
                magnitude: call.arg_i32("magnitude"),
            }
        }
        names::HOVER_AT => AgentAction::HoverAt {
            point: require_point()?,
        },
        names::WAIT => AgentAction::Wait {
            seconds: call.arg_i32("seconds").map(|s| s.max(0) as u64).unwrap_or(5),
        },
        names::TAKE_SCREENSHOT => AgentAction::TakeScreenshot,
        names::GET_PAGE_CONTENT => AgentAction::GetPageContent,
        names::CALL_METHOD => AgentAction::CallMethod {
            name: require_str("name")?,
            parameter: require_str("parameter")?,
        },
        names::REPORT_ISSUE => AgentAction::ReportIssue {
            expected_value: require_str("expectedValue")?,
            actual_value: require_str("actualValue")?,
            error_message: require_str("errorMessage")?,
        },
        names::FINISH => {
            let status = match require_str("status")?.as_str() {
                "PASS" => FinishStatus::Pass,
                "FAIL" => FinishStatus::Fail,
                other => {
                    return Err(SchemaViolation::new(
                        &call.name,
                        format!("status must be PASS or FAIL, got '{other}'"),
                    ))
                }
            };
            AgentAction::Finish {
                status,
                summary: require_str("summary")?,
            }
        }
        _ => AgentAction::Unsupported,
    };

    let target = match &action {
        AgentAction::ClickAt { point }
        | AgentAction::HoverAt { point }
        | AgentAction::TypeTextAt { point, .. } => Some(*point),
        _ => None,
    };

    Ok(ParsedCall {
        call_name: call.name.clone(),
        description: call.arg_str("description").map(str::to_string),
        safety_decision: call.args.contains_key("safety_decision"),
        target,
        action,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_click_at_with_floats() {
        let call = FunctionCall::new("click_at")
            .with_arg("x", 499.7)
            .with_arg("y", 200)
            .with_arg("description", "click the login button");
        let parsed = parse_call(&call).unwrap();
        assert_eq!(
            parsed.action,
            AgentAction::ClickAt {
                point: Point::new(500, 200)
            }
        );
        assert_eq!(parsed.target, Some(Point::new(500, 200)));
        assert_eq!(parsed.description.as_deref(), Some("click the login button"));
    }

    #[test]
    fn missing_required_field_is_a_schema_violation() {
        let call = FunctionCall::new("navigate");
        let err = parse_call(&call).unwrap_err();
        assert!(err.detail.contains("url"));
    }

    #[test]
    fn bad_enum_value_is_a_schema_violation() {
        let call = FunctionCall::new("scroll_document").with_arg("direction", "sideways");
        assert!(parse_call(&call).is_err());
    }

    #[test]
    fn unknown_name_parses_as_unsupported() {
        let call = FunctionCall::new("launch_rocket");
        let parsed = parse_call(&call).unwrap();
        assert_eq!(parsed.action, AgentAction::Unsupported);
    }

    #[test]
    fn type_text_at_defaults_optional_flags() {
        let call = FunctionCall::new("type_text_at")
            .with_arg("x", 10)
            .with_arg("y", 20)
            .with_arg("text", "hello");
        let parsed = parse_call(&call).unwrap();
        match parsed.action {
            AgentAction::TypeTextAt {
                clear_before_typing,
                press_enter,
                ..
            } => {
                assert!(!clear_before_typing);
                assert!(!press_enter);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn safety_decision_flag_is_detected() {
        let call = FunctionCall::new("go_back").with_arg("safety_decision", "confirmed");
        assert!(parse_call(&call).unwrap().safety_decision);
    }

    #[test]
    fn fallback_step_description_names_the_call() {
        let call = FunctionCall::new("go_back");
        let parsed = parse_call(&call).unwrap();
        assert!(parsed.step_description().starts_with("go_back"));
    }
}

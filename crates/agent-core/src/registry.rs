//! The fixed catalogue of actions advertised to the model.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Canonical action names. Dispatch matches on these exact strings.
pub mod names {
    pub const OPEN_BROWSER: &str = "open_browser";
    pub const NAVIGATE: &str = "navigate";
    pub const GO_BACK: &str = "go_back";
    pub const CLICK_ELEMENT: &str = "click_element";
    pub const CLICK_AT: &str = "click_at";
    pub const TYPE_TEXT: &str = "type_text";
    pub const TYPE_TEXT_AT: &str = "type_text_at";
    pub const SCROLL_DOCUMENT: &str = "scroll_document";
    pub const HOVER_AT: &str = "hover_at";
    pub const WAIT: &str = "wait";
    pub const TAKE_SCREENSHOT: &str = "take_screenshot";
    pub const GET_PAGE_CONTENT: &str = "get_page_content";
    pub const CALL_METHOD: &str = "call_method";
    pub const REPORT_ISSUE: &str = "report_issue";
    pub const FINISH: &str = "finish";
}

/// Parameter value kind, as declared to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    Enum(Vec<String>),
}

/// One declared parameter of a catalogue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        }
    }
}

/// One callable action as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl FunctionDecl {
    fn new(name: &str, description: &str, mut params: Vec<ParamSpec>) -> Self {
        // The protocol requires a rationale on every call.
        params.push(ParamSpec::required(
            "description",
            ParamKind::String,
            "A very short description of the goal of this function call.",
        ));
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

static CATALOGUE: Lazy<Vec<FunctionDecl>> = Lazy::new(build_catalogue);

/// The static, ordered catalogue for this agent configuration. Never
/// mutated during a run.
pub fn action_catalogue() -> &'static [FunctionDecl] {
    &CATALOGUE
}

/// Look up one entry by name.
pub fn declaration(name: &str) -> Option<&'static FunctionDecl> {
    CATALOGUE.iter().find(|decl| decl.name == name)
}

fn build_catalogue() -> Vec<FunctionDecl> {
    use names::*;

    let coord = |axis: &str| {
        ParamSpec::required(
            axis,
            ParamKind::Number,
            "Coordinate on the 1000x1000 action grid.",
        )
    };

    vec![
        FunctionDecl::new(
            OPEN_BROWSER,
            "Acknowledges that the browser is already open. Takes no other effect.",
            vec![],
        ),
        FunctionDecl::new(
            NAVIGATE,
            "Loads the given URL in the browser.",
            vec![ParamSpec::required(
                "url",
                ParamKind::String,
                "Absolute URL to open.",
            )],
        ),
        FunctionDecl::new(GO_BACK, "Navigates one step back in browser history.", vec![]),
        FunctionDecl::new(
            CLICK_ELEMENT,
            "Extract the matching selector from the DOM and click it.",
            vec![ParamSpec::required(
                "selector",
                ParamKind::String,
                "The CSS locator for the desired element.",
            )],
        ),
        FunctionDecl::new(
            CLICK_AT,
            "Clicks the element found at the given action-grid coordinates.",
            vec![coord("x"), coord("y")],
        ),
        FunctionDecl::new(
            TYPE_TEXT,
            "Types text into the element matching the selector, or into the \
             currently focused element when no selector is given.",
            vec![
                ParamSpec::required("text", ParamKind::String, "The text to type."),
                ParamSpec::optional(
                    "selector",
                    ParamKind::String,
                    "CSS locator of the target field.",
                ),
            ],
        ),
        FunctionDecl::new(
            TYPE_TEXT_AT,
            "Clicks the given coordinates and types text there.",
            vec![
                coord("x"),
                coord("y"),
                ParamSpec::required("text", ParamKind::String, "The text to type."),
                ParamSpec::optional(
                    "clear_before_typing",
                    ParamKind::Boolean,
                    "Clear the field first, if it is a clearable text control.",
                ),
                ParamSpec::optional(
                    "press_enter",
                    ParamKind::Boolean,
                    "Press Enter after typing.",
                ),
            ],
        ),
        FunctionDecl::new(
            SCROLL_DOCUMENT,
            "Scrolls the document up or down.",
            vec![
                ParamSpec::required(
                    "direction",
                    ParamKind::Enum(vec!["up".into(), "down".into()]),
                    "Scroll direction.",
                ),
                ParamSpec::optional(
                    "magnitude",
                    ParamKind::Number,
                    "Scroll distance in pixels.",
                ),
            ],
        ),
        FunctionDecl::new(
            HOVER_AT,
            "Hovers the element found at the given action-grid coordinates.",
            vec![coord("x"), coord("y")],
        ),
        FunctionDecl::new(
            WAIT,
            "Pauses before the next observation.",
            vec![ParamSpec::optional(
                "seconds",
                ParamKind::Number,
                "Seconds to wait, defaults to 5.",
            )],
        ),
        FunctionDecl::new(
            TAKE_SCREENSHOT,
            "Captures the current visual state of the page.",
            vec![],
        ),
        FunctionDecl::new(
            GET_PAGE_CONTENT,
            "Retrieves the cleaned DOM content from the browser.",
            vec![],
        ),
        FunctionDecl::new(
            CALL_METHOD,
            "Calls a registered host method if the task demands it.",
            vec![
                ParamSpec::required("name", ParamKind::String, "The name of the method."),
                ParamSpec::required("parameter", ParamKind::String, "The parameter needed."),
            ],
        ),
        FunctionDecl::new(
            REPORT_ISSUE,
            "Call this ONLY when you have extracted a value and are ready to \
             validate it. A mismatch stops the run.",
            vec![
                ParamSpec::required("actualValue", ParamKind::String, "The extracted value."),
                ParamSpec::required("expectedValue", ParamKind::String, "The expected value."),
                ParamSpec::required(
                    "errorMessage",
                    ParamKind::String,
                    "Error details if failing.",
                ),
            ],
        ),
        FunctionDecl::new(
            FINISH,
            "Terminates the session. Call this ONLY when the objective is \
             complete and validated.",
            vec![
                ParamSpec::required(
                    "status",
                    ParamKind::Enum(vec!["PASS".into(), "FAIL".into()]),
                    "The final result of the run.",
                ),
                ParamSpec::required(
                    "summary",
                    ParamKind::String,
                    "A short summary of everything that happened.",
                ),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_complete_and_ordered() {
        let names: Vec<&str> = action_catalogue().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "open_browser",
                "navigate",
                "go_back",
                "click_element",
                "click_at",
                "type_text",
                "type_text_at",
                "scroll_document",
                "hover_at",
                "wait",
                "take_screenshot",
                "get_page_content",
                "call_method",
                "report_issue",
                "finish",
            ]
        );
    }

    #[test]
    fn every_entry_requires_a_description() {
        for decl in action_catalogue() {
            let param = decl
                .param("description")
                .unwrap_or_else(|| panic!("{} lacks a description param", decl.name));
            assert!(param.required, "{}: description must be required", decl.name);
        }
    }

    #[test]
    fn coordinate_actions_require_both_axes() {
        for name in [names::CLICK_AT, names::HOVER_AT, names::TYPE_TEXT_AT] {
            let decl = declaration(name).unwrap();
            for axis in ["x", "y"] {
                assert!(decl.param(axis).map(|p| p.required).unwrap_or(false));
            }
        }
    }

    #[test]
    fn finish_status_is_an_enum() {
        let decl = declaration(names::FINISH).unwrap();
        match &decl.param("status").unwrap().kind {
            ParamKind::Enum(values) => assert_eq!(values, &["PASS", "FAIL"]),
            other => panic!("unexpected kind {other:?}"),
        }
    }
}

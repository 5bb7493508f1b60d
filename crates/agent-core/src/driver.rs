//! Browser driver port consumed by the dispatcher.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use webpilot_core_types::{Point, Viewport};

/// A resolved element with enough metadata for guards to stay pure.
///
/// The center point is in device pixels; interactions happen there, which
/// also means a stale handle simply acts on whatever occupies that spot now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementHandle {
    pub point: Point,
    pub tag_name: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl ElementHandle {
    pub fn new(point: Point, tag_name: impl Into<String>) -> Self {
        Self {
            point,
            tag_name: tag_name.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// Errors surfaced by the environment. The dispatcher catches these
/// per-action; one bad action never kills the loop.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("browser command failed: {0}")]
    Command(String),
    #[error("browser connection failed: {0}")]
    Connection(String),
}

impl DriverError {
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }
}

/// Operations the control loop needs from the environment.
///
/// Every operation may fail with a [`DriverError`]; only failures during
/// run setup (viewport sizing) are treated as fatal by the loop.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;
    async fn back(&self) -> Result<(), DriverError>;
    /// Resolve a CSS selector to exactly one element.
    async fn find_element(&self, selector: &str) -> Result<ElementHandle, DriverError>;
    /// Resolve whatever element sits at the given device point.
    async fn element_at(&self, point: Point) -> Result<ElementHandle, DriverError>;
    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError>;
    async fn hover(&self, element: &ElementHandle) -> Result<(), DriverError>;
    async fn clear(&self, element: &ElementHandle) -> Result<(), DriverError>;
    /// Visually mark an element for the audit trail.
    async fn highlight(&self, element: &ElementHandle) -> Result<(), DriverError>;
    /// Inject keystrokes into whatever currently holds focus.
    async fn send_keys(&self, text: &str) -> Result<(), DriverError>;
    async fn press_enter(&self) -> Result<(), DriverError>;
    async fn scroll_by(&self, dx: i32, dy: i32) -> Result<(), DriverError>;
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, DriverError>;
    async fn outer_html(&self) -> Result<String, DriverError>;
    async fn current_url(&self) -> Result<String, DriverError>;
    /// PNG-encoded capture of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;
    async fn viewport(&self) -> Result<Viewport, DriverError>;
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), DriverError>;
}

/// Deterministic in-memory driver used for tests and offline development.
///
/// Records every operation in an op journal and serves configurable
/// elements. Screenshots are real (tiny) PNGs so marker code paths work.
pub struct MockBrowserDriver {
    ops: Mutex<Vec<String>>,
    url: Mutex<String>,
    html: Mutex<String>,
    viewport: Mutex<Viewport>,
    elements: Mutex<HashMap<String, ElementHandle>>,
    point_element: Mutex<Option<ElementHandle>>,
    fail_selectors: Mutex<Vec<String>>,
}

impl Default for MockBrowserDriver {
    fn default() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            url: Mutex::new("about:blank".to_string()),
            html: Mutex::new("<html><body></body></html>".to_string()),
            viewport: Mutex::new(Viewport::new(1600, 800)),
            elements: Mutex::new(HashMap::new()),
            point_element: Mutex::new(None),
            fail_selectors: Mutex::new(Vec::new()),
        }
    }
}

impl MockBrowserDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(self, html: impl Into<String>) -> Self {
        *self.html.lock().unwrap() = html.into();
        self
    }

    /// Serve this element for the given selector.
    pub fn with_element(self, selector: impl Into<String>, element: ElementHandle) -> Self {
        self.elements.lock().unwrap().insert(selector.into(), element);
        self
    }

    /// Serve this element for every point lookup.
    pub fn with_point_element(self, element: ElementHandle) -> Self {
        *self.point_element.lock().unwrap() = Some(element);
        self
    }

    /// Make lookups for this selector fail.
    pub fn with_failing_selector(self, selector: impl Into<String>) -> Self {
        self.fail_selectors.lock().unwrap().push(selector.into());
        self
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }

    fn blank_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(32, 32, image::Rgba([255, 255, 255, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .expect("encoding an in-memory PNG cannot fail");
        out.into_inner()
    }
}

#[async_trait]
impl BrowserDriver for MockBrowserDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate {url}"));
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn back(&self) -> Result<(), DriverError> {
        self.record("back".to_string());
        Ok(())
    }

    async fn find_element(&self, selector: &str) -> Result<ElementHandle, DriverError> {
        self.record(format!("find_element {selector}"));
        if self.fail_selectors.lock().unwrap().iter().any(|s| s == selector) {
            return Err(DriverError::NotFound(selector.to_string()));
        }
        Ok(self
            .elements
            .lock()
            .unwrap()
            .get(selector)
            .cloned()
            .unwrap_or_else(|| ElementHandle::new(Point::new(10, 10), "div")))
    }

    async fn element_at(&self, point: Point) -> Result<ElementHandle, DriverError> {
        self.record(format!("element_at {point}"));
        Ok(self
            .point_element
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| ElementHandle::new(point, "input").with_attr("type", "text")))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.record(format!("click {} at {}", element.tag_name, element.point));
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.record(format!("hover {} at {}", element.tag_name, element.point));
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.record(format!("clear {} at {}", element.tag_name, element.point));
        Ok(())
    }

    async fn highlight(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.record(format!("highlight {}", element.tag_name));
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<(), DriverError> {
        self.record(format!("send_keys {text}"));
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), DriverError> {
        self.record("press_enter".to_string());
        Ok(())
    }

    async fn scroll_by(&self, dx: i32, dy: i32) -> Result<(), DriverError> {
        self.record(format!("scroll_by {dx} {dy}"));
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        self.record(format!("execute_script {script}"));
        Ok(serde_json::Value::Null)
    }

    async fn outer_html(&self) -> Result<String, DriverError> {
        self.record("outer_html".to_string());
        Ok(self.html.lock().unwrap().clone())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.record("screenshot".to_string());
        Ok(Self::blank_png())
    }

    async fn viewport(&self) -> Result<Viewport, DriverError> {
        Ok(*self.viewport.lock().unwrap())
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<(), DriverError> {
        self.record(format!("set_viewport {viewport}"));
        *self.viewport.lock().unwrap() = viewport;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_driver_journals_operations() {
        let driver = MockBrowserDriver::new();
        driver.navigate("https://example.org").await.unwrap();
        driver.scroll_by(0, 800).await.unwrap();
        assert_eq!(
            driver.ops(),
            vec!["navigate https://example.org", "scroll_by 0 800"]
        );
        assert_eq!(driver.current_url().await.unwrap(), "https://example.org");
    }

    #[tokio::test]
    async fn mock_screenshots_are_decodable_png() {
        let driver = MockBrowserDriver::new();
        let bytes = driver.screenshot().await.unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[tokio::test]
    async fn failing_selector_reports_not_found() {
        let driver = MockBrowserDriver::new().with_failing_selector("#missing");
        assert!(matches!(
            driver.find_element("#missing").await,
            Err(DriverError::NotFound(_))
        ));
    }
}

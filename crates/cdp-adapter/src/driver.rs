//! The chromiumoxide-backed [`BrowserDriver`] implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
    InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webpilot_core_types::{Point, Viewport};

use agent_core::{BrowserDriver, DriverError, ElementHandle};

use crate::config::CdpConfig;

/// Element metadata returned by the in-page resolution scripts.
#[derive(Debug, Deserialize)]
struct JsElement {
    x: f64,
    y: f64,
    tag: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

impl JsElement {
    fn into_handle(self) -> ElementHandle {
        ElementHandle {
            point: Point::new(self.x.round() as i32, self.y.round() as i32),
            tag_name: self.tag,
            attributes: self.attributes,
        }
    }
}

/// Exclusive handle on one launched Chromium instance with a single page.
///
/// Element resolution happens in-page; interactions are raw input events
/// dispatched at element centers, so they stay trusted from the page's
/// point of view.
pub struct CdpDriver {
    _browser: Browser,
    page: Page,
    _event_loop: JoinHandle<()>,
}

impl CdpDriver {
    /// Launch a browser and open the initial page.
    pub async fn launch(config: CdpConfig) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .no_sandbox();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable.clone());
        }
        let browser_config = builder.build().map_err(DriverError::Connection)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| DriverError::Connection(err.to_string()))?;

        let event_loop = tokio::task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(%err, "cdp event loop closed");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| DriverError::Connection(err.to_string()))?;

        info!(headless = config.headless, "chromium launched");
        Ok(Self {
            _browser: browser,
            page,
            _event_loop: event_loop,
        })
    }

    async fn eval(&self, expression: &str) -> Result<Value, DriverError> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|err| DriverError::Command(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Resolve element metadata through an in-page script that yields the
    /// center point, tag name, and attribute map.
    async fn resolve(&self, producer: &str, context: &str) -> Result<ElementHandle, DriverError> {
        let expression = format!(
            "(() => {{\n    const el = {producer};\n    if (!el) {{ return null; }}\n    const rect = el.getBoundingClientRect();\n    const attributes = {{}};\n    for (const attr of el.attributes) {{ attributes[attr.name] = attr.value; }}\n    return {{\n        x: rect.left + rect.width / 2,\n        y: rect.top + rect.height / 2,\n        tag: el.tagName.toLowerCase(),\n        attributes\n    }};\n}})()"
        );
        let value = self.eval(&expression).await?;
        if value.is_null() {
            return Err(DriverError::NotFound(context.to_string()));
        }
        let element: JsElement = serde_json::from_value(value)
            .map_err(|err| DriverError::Command(format!("malformed element payload: {err}")))?;
        Ok(element.into_handle())
    }

    async fn mouse_event(
        &self,
        kind: DispatchMouseEventType,
        point: Point,
    ) -> Result<(), DriverError> {
        let event = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(point.x as f64)
            .y(point.y as f64)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(DriverError::Command)?;
        self.page
            .execute(event)
            .await
            .map_err(|err| DriverError::Command(err.to_string()))?;
        Ok(())
    }

    async fn key_event(&self, kind: DispatchKeyEventType) -> Result<(), DriverError> {
        let event = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key("Enter")
            .code("Enter")
            .text("\r")
            .windows_virtual_key_code(13)
            .native_virtual_key_code(13)
            .build()
            .map_err(DriverError::Command)?;
        self.page
            .execute(event)
            .await
            .map_err(|err| DriverError::Command(err.to_string()))?;
        Ok(())
    }

    async fn inner_size(&self) -> Result<Viewport, DriverError> {
        let value = self
            .eval("({ width: window.innerWidth, height: window.innerHeight })")
            .await?;
        let width = value.get("width").and_then(Value::as_u64).unwrap_or(0) as u32;
        let height = value.get("height").and_then(Value::as_u64).unwrap_or(0) as u32;
        Ok(Viewport::new(width, height))
    }
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|err| DriverError::Command(err.to_string()))?;
        // Best-effort settle; slow pages surface through later observations.
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    async fn back(&self) -> Result<(), DriverError> {
        self.eval("window.history.back()").await.map(|_| ())
    }

    async fn find_element(&self, selector: &str) -> Result<ElementHandle, DriverError> {
        let literal = serde_json::to_string(selector)
            .map_err(|err| DriverError::Command(err.to_string()))?;
        self.resolve(&format!("document.querySelector({literal})"), selector)
            .await
    }

    async fn element_at(&self, point: Point) -> Result<ElementHandle, DriverError> {
        self.resolve(
            &format!("document.elementFromPoint({}, {})", point.x, point.y),
            &format!("point {point}"),
        )
        .await
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.mouse_event(DispatchMouseEventType::MouseMoved, element.point)
            .await?;
        self.mouse_event(DispatchMouseEventType::MousePressed, element.point)
            .await?;
        self.mouse_event(DispatchMouseEventType::MouseReleased, element.point)
            .await
    }

    async fn hover(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.mouse_event(DispatchMouseEventType::MouseMoved, element.point)
            .await
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), DriverError> {
        let expression = format!(
            "(() => {{\n    const el = document.elementFromPoint({x}, {y});\n    if (!el) {{ return false; }}\n    el.value = '';\n    el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n    el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n    return true;\n}})()",
            x = element.point.x,
            y = element.point.y
        );
        match self.eval(&expression).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(DriverError::NotFound(format!(
                "no clearable element at {}",
                element.point
            ))),
        }
    }

    async fn highlight(&self, element: &ElementHandle) -> Result<(), DriverError> {
        let expression = format!(
            "(() => {{\n    const el = document.elementFromPoint({x}, {y});\n    if (el) {{ el.style.outline = '2px solid magenta'; }}\n}})()",
            x = element.point.x,
            y = element.point.y
        );
        self.eval(&expression).await.map(|_| ())
    }

    async fn send_keys(&self, text: &str) -> Result<(), DriverError> {
        self.page
            .execute(InsertTextParams::new(text))
            .await
            .map_err(|err| DriverError::Command(err.to_string()))?;
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), DriverError> {
        self.key_event(DispatchKeyEventType::KeyDown).await?;
        self.key_event(DispatchKeyEventType::KeyUp).await
    }

    async fn scroll_by(&self, dx: i32, dy: i32) -> Result<(), DriverError> {
        self.eval(&format!("window.scrollBy({dx}, {dy})"))
            .await
            .map(|_| ())
    }

    async fn execute_script(&self, script: &str) -> Result<Value, DriverError> {
        self.eval(script).await
    }

    async fn outer_html(&self) -> Result<String, DriverError> {
        let value = self.eval("document.documentElement.outerHTML").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::Command("outerHTML was not a string".to_string()))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|err| DriverError::Command(err.to_string()))?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(false)
                    .build(),
            )
            .await
            .map_err(|err| DriverError::Command(err.to_string()))
    }

    async fn viewport(&self) -> Result<Viewport, DriverError> {
        self.inner_size().await
    }

    /// Force the page to the exact inner size the coordinate mapping
    /// expects. The override is verified and retried because resizes can
    /// apply asynchronously.
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), DriverError> {
        for attempt in 0..3 {
            let metrics = SetDeviceMetricsOverrideParams::new(
                viewport.width as i64,
                viewport.height as i64,
                1.0,
                false,
            );
            self.page
                .execute(metrics)
                .await
                .map_err(|err| DriverError::Command(err.to_string()))?;

            let actual = self.inner_size().await?;
            if actual == viewport {
                return Ok(());
            }
            warn!(%actual, wanted = %viewport, attempt, "viewport not settled yet");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        let actual = self.inner_size().await?;
        if actual == viewport {
            Ok(())
        } else {
            Err(DriverError::Command(format!(
                "viewport stuck at {actual}, wanted {viewport}"
            )))
        }
    }
}

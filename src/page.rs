use std::path::Path;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::Page as CrPage;
use chromiumoxide::page::ScreenshotParams;
use serde::de::DeserializeOwned;

use crate::element::Element;
use crate::error::{Error, Result};

/// Document extent and viewport dimensions measured from the live page.
///
/// Measured once at the start of a capture; a window resize mid-capture is
/// not accounted for.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct PageMetrics {
    /// Total scrollable width of the document.
    pub total_width: u32,
    /// Total scrollable height of the document.
    pub total_height: u32,
    /// Visible viewport width.
    pub viewport_width: u32,
    /// Visible viewport height.
    pub viewport_height: u32,
}

/// Wrapper around a chromiumoxide Page with the operations a capture needs.
pub struct Page {
    inner: CrPage,
}

impl Page {
    pub(crate) fn new(inner: CrPage) -> Self {
        Self { inner }
    }

    /// Returns a reference to the underlying chromiumoxide Page.
    pub fn inner(&self) -> &CrPage {
        &self.inner
    }

    /// Navigate to the given URL and wait for the page to load.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    /// Get the current page title.
    pub async fn title(&self) -> Result<String> {
        let result = self
            .inner
            .evaluate("document.title")
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(result.into_value::<String>().unwrap_or_default())
    }

    /// Evaluate a JavaScript expression, discarding its result.
    pub async fn evaluate_void(&self, expression: &str) -> Result<()> {
        self.inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(())
    }

    async fn eval_value<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let result = self
            .inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| Error::JsError(e.to_string()))
    }

    /// Scroll the window so document position (x, y) is at the viewport origin.
    pub async fn scroll_to(&self, x: u32, y: u32) -> Result<()> {
        self.evaluate_void(&format!("window.scrollTo({x}, {y})")).await
    }

    /// The document's current scroll height.
    pub async fn scroll_height(&self) -> Result<u32> {
        self.eval_value("document.body.scrollHeight").await
    }

    /// Measure the document extent and the viewport, in CSS pixels.
    pub async fn metrics(&self) -> Result<PageMetrics> {
        let js = r#"
            JSON.stringify({
                total_width: document.body.offsetWidth,
                total_height: document.body.parentNode.scrollHeight,
                viewport_width: document.body.clientWidth,
                viewport_height: window.innerHeight
            })
        "#;
        let json: String = self.eval_value(js).await?;
        serde_json::from_str(&json).map_err(|e| Error::JsError(e.to_string()))
    }

    /// Capture the visible viewport as PNG bytes.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.inner
            .screenshot(params)
            .await
            .map_err(|e| Error::ScreenshotError(e.to_string()))
    }

    /// Capture the visible viewport and save it to a file.
    pub async fn screenshot_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.inner
            .save_screenshot(params, path)
            .await
            .map_err(|e| Error::ScreenshotError(e.to_string()))?;
        Ok(())
    }

    /// Find an element matching the given CSS selector.
    pub async fn find_element(&self, selector: &str) -> Result<Element> {
        let el = self
            .inner
            .find_element(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        Ok(Element::new(el))
    }
}

use std::path::Path;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element as CrElement;

use crate::error::Result;

/// Wrapper around a chromiumoxide Element, providing capture helpers.
pub struct Element {
    inner: CrElement,
}

impl Element {
    pub(crate) fn new(inner: CrElement) -> Self {
        Self { inner }
    }

    /// Returns a reference to the underlying chromiumoxide Element.
    pub fn inner(&self) -> &CrElement {
        &self.inner
    }

    /// Capture this element's bounding box as PNG bytes (scrolls it into
    /// view first).
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.inner.screenshot(CaptureScreenshotFormat::Png).await?)
    }

    /// Capture this element and write the PNG to `path`.
    pub async fn save_screenshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let png = self.screenshot().await?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }
}

use tracing::warn;

use crate::page::Page;

/// A parsed hide-selector: an element id or a class name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HideTarget {
    Id(String),
    Class(String),
}

impl HideTarget {
    /// Parse an `id=<value>` / `class=<value>` selector string. The prefix is
    /// case-insensitive; the value is kept as written. Any other form is
    /// unsupported and yields `None`.
    pub fn parse(selector: &str) -> Option<Self> {
        let lower = selector.to_ascii_lowercase();
        if lower.starts_with("id=") {
            Some(Self::Id(selector[3..].to_string()))
        } else if lower.starts_with("class=") {
            Some(Self::Class(selector[6..].to_string()))
        } else {
            None
        }
    }

    /// The style mutation that hides the matching element.
    pub fn to_script(&self) -> String {
        match self {
            Self::Id(id) => format!(
                "document.getElementById('{id}').setAttribute('style', 'display:none;');"
            ),
            Self::Class(class) => format!(
                "document.getElementsByClassName('{class}')[0].setAttribute('style', 'display:none;');"
            ),
        }
    }
}

/// Split selectors into hide scripts and unsupported entries.
pub fn hide_scripts(selectors: &[String]) -> (Vec<String>, Vec<String>) {
    let mut scripts = Vec::new();
    let mut unsupported = Vec::new();
    for selector in selectors {
        match HideTarget::parse(selector) {
            Some(target) => scripts.push(target.to_script()),
            None => unsupported.push(selector.clone()),
        }
    }
    (scripts, unsupported)
}

/// Hide every matching element before a capture.
///
/// Unsupported selector forms and per-element failures (e.g. an id that
/// matches nothing) are logged and skipped; they never abort the capture.
pub async fn hide_elements(page: &Page, selectors: &[String]) {
    let (scripts, unsupported) = hide_scripts(selectors);
    for selector in &unsupported {
        warn!(selector = %selector, "hiding supports only id= and class= selectors, skipping");
    }
    for script in &scripts {
        if let Err(e) = page.evaluate_void(script).await {
            warn!(error = %e, "failed to hide element, continuing");
        }
    }
}

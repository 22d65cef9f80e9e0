use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::browser::StitchBrowser;
use crate::error::Result;

/// The browsers a config file may name. Edge and Safari are recognized but
/// refuse to launch with [`Error::UnsupportedBrowser`](crate::Error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum BrowserKind {
    Firefox,
    Chrome,
    Edge,
    Safari,
}

impl TryFrom<String> for BrowserKind {
    type Error = String;

    fn try_from(name: String) -> std::result::Result<Self, String> {
        match name.to_ascii_lowercase().as_str() {
            "firefox" => Ok(Self::Firefox),
            "chrome" => Ok(Self::Chrome),
            "edge" => Ok(Self::Edge),
            "safari" => Ok(Self::Safari),
            other => Err(format!("unknown browser name: {other}")),
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Firefox => "firefox",
            Self::Chrome => "chrome",
            Self::Edge => "edge",
            Self::Safari => "safari",
        };
        f.write_str(name)
    }
}

/// Fixed settle delays inserted between browser interactions so the page can
/// finish loading/rendering before a capture. These are timed waits, not
/// completion signals; captures of slow pages need longer values.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    /// Wait after the initial navigation/scroll-to-origin.
    pub initial_settle: Duration,
    /// Wait after scrolling to each tile past the first.
    pub tile_settle: Duration,
    /// Wait after each scroll-to-bottom step of the preload phase.
    pub preload_wait: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            initial_settle: Duration::from_secs(2),
            tile_settle: Duration::from_secs(3),
            preload_wait: Duration::from_secs(5),
        }
    }
}

impl WaitPolicy {
    /// Zero delays everywhere. Only sensible for static pages and tests.
    pub fn none() -> Self {
        Self {
            initial_settle: Duration::ZERO,
            tile_settle: Duration::ZERO,
            preload_wait: Duration::ZERO,
        }
    }
}

pub struct BrowserConfig {
    pub kind: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Path to the browser executable. Defaults to whatever is on PATH.
    pub browser_path: Option<PathBuf>,
    /// Profile directory handed to the browser (`driver.location` in the
    /// config file).
    pub profile_dir: Option<PathBuf>,
    /// Bound on session startup, e.g. waiting for Firefox to expose its
    /// DevTools endpoint.
    pub default_timeout: Duration,
    pub wait: WaitPolicy,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chrome,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            browser_path: None,
            profile_dir: None,
            default_timeout: Duration::from_secs(30),
            wait: WaitPolicy::default(),
        }
    }
}

/// The `driver:` section of a YAML config file.
#[derive(Debug, Deserialize)]
pub struct DriverConfig {
    pub name: BrowserKind,
    pub location: Option<PathBuf>,
}

/// A parsed config file, e.g.:
///
/// ```yaml
/// driver:
///   name: firefox
///   location: /home/user/.mozilla/firefox/default
/// ```
#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub driver: DriverConfig,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn browser(mut self, kind: BrowserKind) -> Self {
        self.config.kind = kind;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn browser_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.browser_path = Some(path.into());
        self
    }

    pub fn profile_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.profile_dir = Some(path.into());
        self
    }

    /// Set the timeout bounding session startup.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Set the settle delays used by captures on this session.
    pub fn wait(mut self, wait: WaitPolicy) -> Self {
        self.config.wait = wait;
        self
    }

    /// Apply `driver.name` and `driver.location` from a YAML config file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let file = ConfigFile::load(path)?;
        self.config.kind = file.driver.name;
        self.config.profile_dir = file.driver.location;
        Ok(self)
    }

    pub fn build_config(self) -> BrowserConfig {
        self.config
    }

    pub async fn build(self) -> Result<StitchBrowser> {
        StitchBrowser::launch(self.build_config()).await
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_kind_names_are_case_insensitive() {
        assert_eq!(BrowserKind::try_from("Firefox".to_string()), Ok(BrowserKind::Firefox));
        assert_eq!(BrowserKind::try_from("CHROME".to_string()), Ok(BrowserKind::Chrome));
        assert_eq!(BrowserKind::try_from("edge".to_string()), Ok(BrowserKind::Edge));
        assert_eq!(BrowserKind::try_from("safari".to_string()), Ok(BrowserKind::Safari));
    }

    #[test]
    fn unknown_browser_name_is_rejected() {
        assert!(BrowserKind::try_from("opera".to_string()).is_err());
    }

    #[test]
    fn config_file_parses_driver_section() {
        let yaml = "driver:\n  name: firefox\n  location: /home/user/.mozilla/firefox/default\n";
        let file: ConfigFile = serde_yaml::from_str(yaml).expect("valid config");
        assert_eq!(file.driver.name, BrowserKind::Firefox);
        assert_eq!(
            file.driver.location.as_deref(),
            Some(Path::new("/home/user/.mozilla/firefox/default"))
        );
    }

    #[test]
    fn config_file_location_is_optional() {
        let yaml = "driver:\n  name: chrome\n";
        let file: ConfigFile = serde_yaml::from_str(yaml).expect("valid config");
        assert_eq!(file.driver.name, BrowserKind::Chrome);
        assert!(file.driver.location.is_none());
    }

    #[test]
    fn unknown_driver_name_fails_to_parse() {
        let yaml = "driver:\n  name: opera\n";
        assert!(serde_yaml::from_str::<ConfigFile>(yaml).is_err());
    }

    #[test]
    fn builder_applies_config_file() {
        let path = std::env::temp_dir().join(format!("stitchcap_config_{}.yml", std::process::id()));
        fs::write(&path, "driver:\n  name: firefox\n  location: /tmp/profile\n").unwrap();

        let config = BrowserBuilder::new()
            .config_file(&path)
            .expect("config file should load")
            .build_config();
        fs::remove_file(&path).ok();

        assert_eq!(config.kind, BrowserKind::Firefox);
        assert_eq!(config.profile_dir.as_deref(), Some(Path::new("/tmp/profile")));
    }
}

use std::path::{Path, PathBuf};
use std::process::Stdio;

use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::handler::Handler;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{info, warn};

use crate::config::{BrowserBuilder, BrowserConfig, BrowserKind, WaitPolicy};
use crate::error::{Error, Result};
use crate::page::Page;

/// The main entry point: one live browser session driven over CDP.
///
/// Chrome is launched directly. Firefox is spawned with remote debugging
/// enabled and connected to through the DevTools endpoint it advertises.
/// Edge and Safari are recognized config values but refuse to launch.
pub struct StitchBrowser {
    browser: CrBrowser,
    wait: WaitPolicy,
    handler_task: tokio::task::JoinHandle<()>,
    // Spawned Firefox process; dropping the handle would kill it early.
    browser_child: Option<Child>,
}

impl StitchBrowser {
    /// Create a new BrowserBuilder for configuring and launching a browser.
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    /// Launch a browser session with the given configuration.
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let (browser, mut handler, child) = match config.kind {
            BrowserKind::Chrome => {
                let (browser, handler) = Self::launch_chrome(&config).await?;
                (browser, handler, None)
            }
            BrowserKind::Firefox => {
                let (browser, handler, child) = Self::connect_firefox(&config).await?;
                (browser, handler, Some(child))
            }
            kind => return Err(Error::UnsupportedBrowser(kind)),
        };
        info!(browser = %config.kind, "browser session established");

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        Ok(Self {
            browser,
            wait: config.wait,
            handler_task,
            browser_child: child,
        })
    }

    async fn launch_chrome(config: &BrowserConfig) -> Result<(CrBrowser, Handler)> {
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox().arg("start-maximized");
        }

        if let Some(ref dir) = config.profile_dir {
            builder = builder.user_data_dir(dir);
        }

        if let Some(ref path) = config.browser_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder.viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        });

        let cr_config = builder.build().map_err(Error::LaunchError)?;

        CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))
    }

    /// Spawn Firefox with remote debugging on an ephemeral port and connect
    /// to the DevTools endpoint it prints on stderr.
    async fn connect_firefox(config: &BrowserConfig) -> Result<(CrBrowser, Handler, Child)> {
        let binary = config
            .browser_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("firefox"));

        let mut command = Command::new(&binary);
        command.arg("--remote-debugging-port").arg("0");
        if let Some(ref profile) = config.profile_dir {
            command.arg("--profile").arg(profile);
        }
        if config.headless {
            command.arg("--headless");
        }
        command
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| Error::LaunchError(format!("failed to spawn {}: {e}", binary.display())))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::LaunchError("firefox stderr was not captured".into()))?;

        let ws_url = tokio::time::timeout(
            config.default_timeout,
            Self::read_devtools_endpoint(stderr),
        )
        .await
        .map_err(|_| Error::LaunchError("timed out waiting for the firefox DevTools endpoint".into()))??;

        let (browser, handler) = CrBrowser::connect(ws_url)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        Ok((browser, handler, child))
    }

    async fn read_devtools_endpoint(stderr: ChildStderr) -> Result<String> {
        let mut lines = BufReader::new(stderr).lines();
        while let Some(line) = lines.next_line().await? {
            // "DevTools listening on ws://127.0.0.1:PORT/devtools/browser/UUID"
            if let Some(idx) = line.find("ws://") {
                return Ok(line[idx..].trim().to_string());
            }
        }
        Err(Error::LaunchError(
            "firefox exited before advertising a DevTools endpoint".into(),
        ))
    }

    /// Open a new page (tab) navigated to the given URL.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let cr_page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(Page::new(cr_page))
    }

    /// The settle delays this session was configured with.
    pub fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }

    /// Navigate to `url`, capture the first element matching `selector` as a
    /// PNG at `save_path`/`image_name`, and close the session.
    ///
    /// A selector that matches nothing, or an image that cannot be written,
    /// yields `Ok(None)`; session-level failures are errors. The session is
    /// closed in every case.
    pub async fn capture_element(
        mut self,
        url: &str,
        selector: &str,
        save_path: impl AsRef<Path>,
        image_name: &str,
    ) -> Result<Option<PathBuf>> {
        let captured = self
            .capture_element_inner(url, selector, save_path.as_ref(), image_name)
            .await;
        let closed = self.close_inner().await;
        let result = captured?;
        closed?;
        Ok(result)
    }

    async fn capture_element_inner(
        &self,
        url: &str,
        selector: &str,
        save_path: &Path,
        image_name: &str,
    ) -> Result<Option<PathBuf>> {
        let page = self.new_page(url).await?;
        tokio::time::sleep(self.wait.initial_settle).await;

        let element = match page.find_element(selector).await {
            Ok(element) => element,
            Err(Error::ElementNotFound(reason)) => {
                warn!(selector, %reason, "no element matched, nothing captured");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let target = std::path::absolute(save_path.join(image_name))?;
        match element.save_screenshot(&target).await {
            Ok(()) => Ok(Some(target)),
            Err(Error::IoError(e)) => {
                warn!(path = %target.display(), error = %e, "could not write element screenshot");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Close the browser session and tear down its background tasks.
    pub async fn close(mut self) -> Result<()> {
        self.close_inner().await
    }

    async fn close_inner(&mut self) -> Result<()> {
        self.browser.close().await?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        if let Some(mut child) = self.browser_child.take() {
            let _ = child.kill().await;
        }
        Ok(())
    }
}

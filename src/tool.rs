//! The computer tool
//!
//! Ties the pieces together for one session: enumerate displays, bind the
//! configured one, and serve agent requests through a [`Dispatcher`].

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::sleep;

use crate::adb::AdbClient;
use crate::backend::{self, Backend};
use crate::config::Config;
use crate::dispatch::{ActionRequest, ActionResult, Dispatcher};
use crate::display::monitor::XcapMonitors;
use crate::display::{self, Catalog, DisplayKind};
use crate::error::ToolResult;
use crate::screenshot::{self, ScreenshotStore};

/// Display description advertised to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOptions {
    pub display_width_px: u32,
    pub display_height_px: u32,
    pub display_number: Option<usize>,
}

/// Enumerate displays using the OS monitors and the configured ADB server
pub async fn list_displays(config: &Config) -> ToolResult<Catalog> {
    let devices = AdbClient::new(config.adb_addr.clone());
    Ok(display::enumerate(&XcapMonitors, &devices).await?)
}

pub struct ComputerTool {
    dispatcher: Dispatcher,
    store: ScreenshotStore,
    screenshot_delay: Duration,
}

impl ComputerTool {
    pub const NAME: &'static str = "computer";
    pub const API_TYPE: &'static str = "computer_20241022";

    /// Bind to the display selected by `config`
    pub async fn from_config(config: &Config) -> ToolResult<Self> {
        let catalog = list_displays(config).await?;
        let display = catalog.select(&config.display)?;
        let backend = backend::connect(display, config).await?;
        Ok(Self::new(backend, config))
    }

    pub fn new(backend: Box<dyn Backend>, config: &Config) -> Self {
        Self {
            dispatcher: Dispatcher::new(backend),
            store: ScreenshotStore::new(config.output_dir.clone()),
            screenshot_delay: config.screenshot_delay,
        }
    }

    pub fn options(&self) -> ToolOptions {
        let backend = self.dispatcher.backend();
        let frame = backend.scaler().logical_frame();
        let display = backend.display();
        ToolOptions {
            display_width_px: frame.width(),
            display_height_px: frame.height(),
            display_number: match display.kind {
                DisplayKind::Native => None,
                DisplayKind::Remote => Some(display.index),
            },
        }
    }

    /// Tool definition in the shape the agent API expects
    pub fn params(&self) -> serde_json::Value {
        let options = self.options();
        json!({
            "name": Self::NAME,
            "type": Self::API_TYPE,
            "display_width_px": options.display_width_px,
            "display_height_px": options.display_height_px,
            "display_number": options.display_number,
        })
    }

    /// Switch coordinate scaling on or off for the bound display
    pub fn set_scaling(&mut self, enabled: bool) {
        let scaler = self.dispatcher.backend_mut().scaler_mut();
        if scaler.is_enabled() != enabled {
            scaler.set_enabled(enabled);
            tracing::info!(
                "Coordinate scaling {}, logical frame {}",
                if enabled { "enabled" } else { "disabled" },
                scaler.logical_frame()
            );
        }
    }

    pub async fn call(&mut self, request: &ActionRequest) -> ActionResult {
        self.dispatcher.dispatch(request).await
    }

    /// Run a shell command, optionally followed by a screenshot once the
    /// screen has had time to settle
    pub async fn shell(&mut self, command: &str, take_screenshot: bool) -> ToolResult<ActionResult> {
        tracing::info!("Running shell command: {}", command);
        let (shell, flag) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        let output = Command::new(shell).arg(flag).arg(command).output().await?;
        tracing::debug!("Shell command exited with {}", output.status);

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let mut result = ActionResult {
            output: (!stdout.is_empty()).then_some(stdout),
            error: (!stderr.is_empty()).then_some(stderr),
            ..Default::default()
        };

        if take_screenshot {
            sleep(self.screenshot_delay).await;
            result.base64_image = self.dispatcher.screenshot().await?.base64_image;
        }
        Ok(result)
    }

    /// Write the image attached to a result, if any, to the screenshot store
    pub async fn save_image(&self, result: &ActionResult) -> ToolResult<Option<PathBuf>> {
        match &result.base64_image {
            Some(data) => {
                let png = screenshot::decode_base64(data)?;
                Ok(Some(self.store.save(&png).await?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NativeBackend, RemoteBackend};
    use crate::scaling::Scaler;
    use crate::testing::{native_display, remote_display, FakeDevice, FakeMonitors, RecordingDriver};
    use std::sync::Arc;

    fn config() -> Config {
        let mut config = Config::new();
        config.screenshot_delay = Duration::ZERO;
        config.output_dir = std::env::temp_dir().join(format!(
            "screenpilot-tool-{}",
            uuid::Uuid::new_v4().simple()
        ));
        config
    }

    fn native_tool(config: &Config) -> ComputerTool {
        let display = native_display(0, (0, 0), 1920, 1080);
        let backend = NativeBackend::new(
            display.clone(),
            Scaler::new(display.resolution, config.scaling_enabled),
            Box::new(RecordingDriver::new()),
            Arc::new(FakeMonitors::new(vec![(0, 0, 1920, 1080, true)])),
        );
        ComputerTool::new(Box::new(backend), config)
    }

    #[test]
    fn test_native_options() {
        let tool = native_tool(&config());
        assert_eq!(
            tool.options(),
            ToolOptions {
                display_width_px: 1366,
                display_height_px: 768,
                display_number: None,
            }
        );
        let params = tool.params();
        assert_eq!(params["name"], "computer");
        assert_eq!(params["type"], "computer_20241022");
        assert_eq!(params["display_width_px"], 1366);
    }

    #[test]
    fn test_options_without_scaling_report_native_size() {
        let mut config = config();
        config.scaling_enabled = false;
        let options = native_tool(&config).options();
        assert_eq!((options.display_width_px, options.display_height_px), (1920, 1080));
    }

    #[test]
    fn test_remote_options_carry_display_number() {
        let display = remote_display(2, "emulator-5554", 1080, 2340);
        let backend = RemoteBackend::new(
            display.clone(),
            Scaler::new(display.resolution, true),
            Box::new(FakeDevice::new("emulator-5554", 1080, 2340)),
        );
        let tool = ComputerTool::new(Box::new(backend), &config());
        assert_eq!(tool.options().display_number, Some(2));
    }

    #[tokio::test]
    async fn test_set_scaling_switches_coordinate_space() {
        let mut tool = native_tool(&config());
        tool.set_scaling(false);
        assert_eq!(tool.options().display_width_px, 1920);

        // Native coordinates are accepted once scaling is off
        let request = ActionRequest::new("mouse_move").with_coordinate(1500, 1000);
        assert!(!tool.call(&request).await.is_error());

        tool.set_scaling(true);
        assert_eq!(tool.options().display_width_px, 1366);
        assert!(tool.call(&request).await.is_error());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_with_screenshot() {
        let mut tool = native_tool(&config());
        let result = tool.shell("echo hello; echo oops >&2", true).await.unwrap();

        assert_eq!(result.output.as_deref(), Some("hello\n"));
        assert_eq!(result.error.as_deref(), Some("oops\n"));
        assert!(result.base64_image.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_without_screenshot() {
        let mut tool = native_tool(&config());
        let result = tool.shell("true", false).await.unwrap();
        assert_eq!(result, ActionResult::default());
    }

    #[tokio::test]
    async fn test_save_image() {
        let config = config();
        let mut tool = native_tool(&config);
        let result = tool.call(&ActionRequest::new("screenshot")).await;

        let path = tool.save_image(&result).await.unwrap().unwrap();
        assert!(path.starts_with(&config.output_dir));
        assert!(tool.save_image(&ActionResult::success("ok")).await.unwrap().is_none());

        tokio::fs::remove_dir_all(&config.output_dir).await.unwrap();
    }
}

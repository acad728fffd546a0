//! Android device backend over the ADB server
//!
//! Touch input has no hover, so moving the pointer only records where the
//! next tap or swipe starts. Buttons other than a single left click have no
//! touch equivalent and are rejected.

use async_trait::async_trait;
use image::RgbaImage;
use std::time::Duration;

use super::{Backend, ClickKind};
use crate::adb::{AdbClient, AdbDevice, AdbError};
use crate::display::Display;
use crate::error::{ToolError, ToolResult};
use crate::scaling::Scaler;
use crate::screenshot;

/// Duration of the swipe used for drags
const SWIPE_DURATION: Duration = Duration::from_millis(500);

/// Device operations the remote backend needs
#[async_trait]
pub trait DeviceConnection: Send + Sync {
    fn serial(&self) -> &str;
    async fn tap(&self, x: u32, y: u32) -> Result<(), AdbError>;
    async fn swipe(&self, from: (u32, u32), to: (u32, u32), duration: Duration) -> Result<(), AdbError>;
    async fn key_events(&self, codes: &[String]) -> Result<(), AdbError>;
    async fn input_text(&self, text: &str) -> Result<(), AdbError>;
    async fn screenshot(&self) -> Result<RgbaImage, AdbError>;
}

#[async_trait]
impl DeviceConnection for AdbDevice {
    fn serial(&self) -> &str {
        AdbDevice::serial(self)
    }

    async fn tap(&self, x: u32, y: u32) -> Result<(), AdbError> {
        AdbDevice::tap(self, x, y).await
    }

    async fn swipe(&self, from: (u32, u32), to: (u32, u32), duration: Duration) -> Result<(), AdbError> {
        AdbDevice::swipe(self, from, to, duration).await
    }

    async fn key_events(&self, codes: &[String]) -> Result<(), AdbError> {
        AdbDevice::key_events(self, codes).await
    }

    async fn input_text(&self, text: &str) -> Result<(), AdbError> {
        AdbDevice::input_text(self, text).await
    }

    async fn screenshot(&self) -> Result<RgbaImage, AdbError> {
        AdbDevice::screenshot(self).await
    }
}

/// Map an agent key name to an Android keycode name
pub fn android_keycode(name: &str) -> String {
    let normalized: String = name
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .flat_map(char::to_lowercase)
        .collect();

    let code = match normalized.as_str() {
        "return" | "enter" => "ENTER",
        "backspace" => "DEL",
        "delete" | "del" => "FORWARD_DEL",
        "escape" | "esc" => "ESCAPE",
        "home" => "HOME",
        "back" => "BACK",
        "menu" => "MENU",
        "tab" => "TAB",
        "space" => "SPACE",
        "up" => "DPAD_UP",
        "down" => "DPAD_DOWN",
        "left" => "DPAD_LEFT",
        "right" => "DPAD_RIGHT",
        "page_up" | "pageup" => "PAGE_UP",
        "page_down" | "pagedown" => "PAGE_DOWN",
        "power" => "POWER",
        "volume_up" | "volumeup" => "VOLUME_UP",
        "volume_down" | "volumedown" => "VOLUME_DOWN",
        "ctrl" | "control" => "CTRL_LEFT",
        "shift" => "SHIFT_LEFT",
        "alt" => "ALT_LEFT",
        "super" | "super_l" | "meta" | "win" | "cmd" => "META_LEFT",
        other => return format!("KEYCODE_{}", other.to_uppercase()),
    };
    format!("KEYCODE_{}", code)
}

pub struct RemoteBackend {
    display: Display,
    scaler: Scaler,
    device: Box<dyn DeviceConnection>,
    pointer: (u32, u32),
}

impl RemoteBackend {
    pub fn new(display: Display, scaler: Scaler, device: Box<dyn DeviceConnection>) -> Self {
        Self {
            display,
            scaler,
            device,
            pointer: (0, 0),
        }
    }

    /// Bind to the device named by `display`, checking it is attached
    pub async fn connect(client: &AdbClient, display: Display, scaler: Scaler) -> ToolResult<Self> {
        let serials = client.device_list().await.map_err(|e| {
            ToolError::DeviceUnavailable(format!("ADB server at {} unreachable: {}", client.addr(), e))
        })?;
        if serials.is_empty() {
            return Err(ToolError::DeviceUnavailable(
                "No Android devices found via ADB".to_string(),
            ));
        }

        let serial = display.name.clone().unwrap_or_default();
        if !serials.contains(&serial) {
            return Err(ToolError::DeviceUnavailable(format!(
                "No Android device found with serial number {}",
                serial
            )));
        }

        tracing::info!("Connected to Android device {}", serial);
        Ok(Self::new(display, scaler, Box::new(client.device(serial))))
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    fn display(&self) -> &Display {
        &self.display
    }

    fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    fn scaler_mut(&mut self) -> &mut Scaler {
        &mut self.scaler
    }

    async fn move_to(&mut self, x: u32, y: u32) -> ToolResult<()> {
        self.pointer = (x, y);
        Ok(())
    }

    async fn click(&mut self, kind: ClickKind) -> ToolResult<()> {
        if kind != ClickKind::Left {
            return Err(ToolError::Unsupported {
                action: kind.action_name().to_string(),
            });
        }
        let (x, y) = self.pointer;
        tracing::debug!("Tapping {} at ({}, {})", self.device.serial(), x, y);
        self.device.tap(x, y).await?;
        Ok(())
    }

    async fn drag_to(&mut self, from: (u32, u32), to: (u32, u32)) -> ToolResult<()> {
        self.device.swipe(from, to, SWIPE_DURATION).await?;
        self.pointer = to;
        Ok(())
    }

    async fn press_keys(&mut self, keys: &[String]) -> ToolResult<()> {
        let codes: Vec<String> = keys.iter().map(|key| android_keycode(key)).collect();
        self.device.key_events(&codes).await?;
        Ok(())
    }

    async fn type_text(&mut self, text: &str) -> ToolResult<()> {
        self.device.input_text(text).await?;
        Ok(())
    }

    async fn capture_screen(&mut self) -> ToolResult<RgbaImage> {
        tracing::debug!("Capturing screen of {}", self.device.serial());
        let image = self
            .device
            .screenshot()
            .await
            .map_err(|e| ToolError::Capture(e.to_string()))?;
        Ok(screenshot::fit_to_frame(image, self.scaler.logical_frame()))
    }

    async fn cursor_position(&mut self) -> ToolResult<(u32, u32)> {
        Ok(self.pointer)
    }
}

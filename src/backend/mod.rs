//! Backend adapters
//!
//! A [`Backend`] turns abstract pointer, keyboard and capture operations into
//! calls against one display. There are two implementations:
//! - native: OS input synthesis and monitor capture
//! - remote: Android devices over the ADB server
//!
//! Coordinates passed to a backend are already in native pixels of the bound
//! display; scaling happens in the dispatcher.

pub mod input;
pub mod native;
pub mod remote;

use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;

use crate::adb::AdbClient;
use crate::config::Config;
use crate::display::monitor::XcapMonitors;
use crate::display::{Display, DisplayKind};
use crate::error::ToolResult;
use crate::scaling::Scaler;

pub use native::{FramePolicy, NativeBackend};
pub use remote::RemoteBackend;

/// Click variants shared by all backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Left,
    Right,
    Middle,
    Double,
}

impl ClickKind {
    /// Action name the agent used to request this click
    pub fn action_name(&self) -> &'static str {
        match self {
            ClickKind::Left => "left_click",
            ClickKind::Right => "right_click",
            ClickKind::Middle => "middle_click",
            ClickKind::Double => "double_click",
        }
    }
}

/// Capability set every display backend provides
#[async_trait]
pub trait Backend: Send {
    /// Display this backend is bound to
    fn display(&self) -> &Display;

    /// Scaling state derived from the bound display
    fn scaler(&self) -> &Scaler;

    fn scaler_mut(&mut self) -> &mut Scaler;

    async fn move_to(&mut self, x: u32, y: u32) -> ToolResult<()>;

    async fn click(&mut self, kind: ClickKind) -> ToolResult<()>;

    async fn drag_to(&mut self, from: (u32, u32), to: (u32, u32)) -> ToolResult<()>;

    async fn press_keys(&mut self, keys: &[String]) -> ToolResult<()>;

    async fn type_text(&mut self, text: &str) -> ToolResult<()>;

    /// Capture the display, normalized to the logical frame
    async fn capture_screen(&mut self) -> ToolResult<RgbaImage>;

    /// Pointer position in native pixels of the bound display
    async fn cursor_position(&mut self) -> ToolResult<(u32, u32)>;
}

/// Build the backend for a selected display.
///
/// The variant is chosen once here from the display kind.
pub async fn connect(display: &Display, config: &Config) -> ToolResult<Box<dyn Backend>> {
    let scaler = Scaler::new(display.resolution, config.scaling_enabled);
    // tracing's macros import `field::display`, which shadows a local named `display`
    let target = display;
    tracing::info!(
        "Binding to {} (logical frame {})",
        target,
        scaler.logical_frame()
    );

    match display.kind {
        DisplayKind::Native => {
            let driver = input::EnigoDriver::spawn()?;
            let backend = NativeBackend::new(
                display.clone(),
                scaler,
                Box::new(driver),
                Arc::new(XcapMonitors),
            )
            .with_typing_delay(config.typing_delay);
            Ok(Box::new(backend))
        }
        DisplayKind::Remote => {
            let client = AdbClient::new(config.adb_addr.clone());
            let backend = RemoteBackend::connect(&client, display.clone(), scaler).await?;
            Ok(Box::new(backend))
        }
    }
}

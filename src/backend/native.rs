//! Native OS backend
//!
//! Drives the local keyboard and pointer through an [`InputDriver`] and
//! captures the bound monitor through a [`MonitorSource`]. Input coordinates
//! are offset by the monitor's origin so they land on the right monitor of a
//! multi-monitor desktop.

use async_trait::async_trait;
use enigo::{Button, Direction};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::input::{self, InputDriver};
use super::{Backend, ClickKind};
use crate::display::monitor::MonitorSource;
use crate::display::Display;
use crate::error::{ToolError, ToolResult};
use crate::scaling::Scaler;
use crate::screenshot;

/// Delay between the clicks of a double click
const DOUBLE_CLICK_GAP: Duration = Duration::from_millis(10);

/// Characters sent per text injection call
const TYPING_GROUP_SIZE: usize = 50;

/// Default pause between typed groups
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(12);

/// Whether the one-time first-capture letterboxing has happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePolicy {
    /// No capture taken yet
    Unpadded,
    /// First capture taken and padded if it was narrower than 16:10
    Padded,
}

pub struct NativeBackend {
    display: Display,
    scaler: Scaler,
    driver: Box<dyn InputDriver>,
    monitors: Arc<dyn MonitorSource>,
    frame_policy: FramePolicy,
    typing_delay: Duration,
}

impl NativeBackend {
    pub fn new(
        display: Display,
        scaler: Scaler,
        driver: Box<dyn InputDriver>,
        monitors: Arc<dyn MonitorSource>,
    ) -> Self {
        Self {
            display,
            scaler,
            driver,
            monitors,
            frame_policy: FramePolicy::Unpadded,
            typing_delay: DEFAULT_TYPING_DELAY,
        }
    }

    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    pub fn frame_policy(&self) -> FramePolicy {
        self.frame_policy
    }

    /// Establish the frame from the first capture.
    ///
    /// Letterboxes the image to 16:10 when it is narrower and moves the policy
    /// to [`FramePolicy::Padded`]. Later captures pass through unchanged.
    ///
    /// The padded frame's pixels do not line up with logical coordinates.
    /// On a 4:3 monitor the 16:10 padded image is resized to XGA, which
    /// squashes it horizontally by 0.8 relative to [`Scaler::to_native`].
    /// Only the first capture is affected.
    pub fn initialize_frame(&mut self, image: RgbaImage) -> RgbaImage {
        if self.frame_policy == FramePolicy::Padded {
            return image;
        }
        self.frame_policy = FramePolicy::Padded;

        match screenshot::letterbox(&image) {
            Some(padded) => {
                tracing::debug!(
                    "Letterboxed first capture from {}x{} to {}x{}",
                    image.width(),
                    image.height(),
                    padded.width(),
                    padded.height()
                );
                padded
            }
            None => image,
        }
    }

    /// Translate display-relative pixels to virtual-desktop pixels
    fn desktop(&self, x: u32, y: u32) -> (i32, i32) {
        let (origin_x, origin_y) = self.display.origin;
        (origin_x + x as i32, origin_y + y as i32)
    }

    fn move_pointer(&mut self, x: u32, y: u32) -> ToolResult<()> {
        let (dx, dy) = self.desktop(x, y);
        self.driver.move_to(dx, dy)?;
        Ok(())
    }
}

#[async_trait]
impl Backend for NativeBackend {
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
        self.move_pointer(x, y)
    }

    async fn click(&mut self, kind: ClickKind) -> ToolResult<()> {
        let button = match kind {
            ClickKind::Left | ClickKind::Double => Button::Left,
            ClickKind::Right => Button::Right,
            ClickKind::Middle => Button::Middle,
        };

        self.driver.button(button, Direction::Click)?;
        if kind == ClickKind::Double {
            sleep(DOUBLE_CLICK_GAP).await;
            self.driver.button(button, Direction::Click)?;
        }
        Ok(())
    }

    async fn drag_to(&mut self, from: (u32, u32), to: (u32, u32)) -> ToolResult<()> {
        self.move_pointer(from.0, from.1)?;
        self.driver.button(Button::Left, Direction::Press)?;

        // The button must come back up even if the move fails
        let moved = self.move_pointer(to.0, to.1);
        let released = self.driver.button(Button::Left, Direction::Release);
        moved?;
        released?;
        Ok(())
    }

    async fn press_keys(&mut self, keys: &[String]) -> ToolResult<()> {
        let keys = keys
            .iter()
            .map(|name| input::parse_key(name))
            .collect::<Result<Vec<_>, _>>()?;
        input::press_combination(self.driver.as_mut(), &keys)?;
        Ok(())
    }

    async fn type_text(&mut self, text: &str) -> ToolResult<()> {
        let chars: Vec<char> = text.chars().collect();
        for (i, group) in chars.chunks(TYPING_GROUP_SIZE).enumerate() {
            if i > 0 && !self.typing_delay.is_zero() {
                sleep(self.typing_delay).await;
            }
            let group: String = group.iter().collect();
            self.driver.text(&group)?;
        }
        Ok(())
    }

    async fn capture_screen(&mut self) -> ToolResult<RgbaImage> {
        let image = self
            .monitors
            .capture(self.display.bounds())
            .map_err(|e| ToolError::Capture(e.to_string()))?;
        let image = self.initialize_frame(image);
        Ok(screenshot::fit_to_frame(image, self.scaler.logical_frame()))
    }

    async fn cursor_position(&mut self) -> ToolResult<(u32, u32)> {
        let (x, y) = self.driver.location()?;
        let (origin_x, origin_y) = self.display.origin;
        let resolution = self.display.resolution;

        // The pointer may sit on another monitor; pin it to this one
        let clamp = |value: i32, max: u32| value.clamp(0, max as i32 - 1) as u32;
        Ok((
            clamp(x - origin_x, resolution.width()),
            clamp(y - origin_y, resolution.height()),
        ))
    }
}

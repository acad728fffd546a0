//! Native monitor discovery and capture
//!
//! Uses the xcap crate for cross-platform monitor metadata and screen
//! capture. Everything is re-queried on each call so reconnected monitors are
//! picked up.

use image::RgbaImage;
use thiserror::Error;
use xcap::Monitor;

/// Position and size of a monitor inside the virtual desktop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Metadata reported by the OS for one monitor
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorInfo {
    pub name: String,
    pub bounds: Bounds,
    pub is_primary: bool,
}

/// Errors from monitor enumeration or capture
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("xcap error: {0}")]
    XCap(String),

    #[error("no monitor at ({x}, {y}); was it disconnected?")]
    Disconnected { x: i32, y: i32 },
}

// Some platform errors inside XCapError are not Sync
impl From<xcap::XCapError> for MonitorError {
    fn from(e: xcap::XCapError) -> Self {
        MonitorError::XCap(e.to_string())
    }
}

/// Source of native monitor metadata and pixels
pub trait MonitorSource: Send + Sync {
    /// List monitors in OS order
    fn monitors(&self) -> Result<Vec<MonitorInfo>, MonitorError>;

    /// Capture the monitor occupying `bounds`
    fn capture(&self, bounds: Bounds) -> Result<RgbaImage, MonitorError>;
}

/// Monitor source backed by xcap
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapMonitors;

impl MonitorSource for XcapMonitors {
    fn monitors(&self) -> Result<Vec<MonitorInfo>, MonitorError> {
        Monitor::all()?.iter().map(describe).collect()
    }

    fn capture(&self, bounds: Bounds) -> Result<RgbaImage, MonitorError> {
        for monitor in Monitor::all()? {
            if monitor.x()? == bounds.x && monitor.y()? == bounds.y {
                tracing::debug!(
                    "Capturing monitor '{}' at ({}, {})",
                    monitor.name().unwrap_or_default(),
                    bounds.x,
                    bounds.y
                );
                return Ok(monitor.capture_image()?);
            }
        }

        Err(MonitorError::Disconnected {
            x: bounds.x,
            y: bounds.y,
        })
    }
}

fn describe(monitor: &Monitor) -> Result<MonitorInfo, MonitorError> {
    Ok(MonitorInfo {
        name: monitor.name()?,
        bounds: Bounds {
            x: monitor.x()?,
            y: monitor.y()?,
            width: monitor.width()?,
            height: monitor.height()?,
        },
        is_primary: monitor.is_primary()?,
    })
}

//! Coordinate scaling between the agent's logical frame and native pixels
//!
//! The agent always sees one of a few standard resolutions. The frame is
//! picked once per display from its aspect ratio; coordinates are then
//! scaled per axis in either direction.

use serde::Serialize;
use std::fmt;

use crate::error::{ToolError, ToolResult};

/// Relative aspect-ratio tolerance when matching a scaling target
const ASPECT_TOLERANCE: f64 = 0.02;

/// A pixel resolution with both dimensions positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Create a resolution, rejecting zero-sized dimensions
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    const fn fixed(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A named standard resolution bounding the logical coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScalingTarget {
    pub name: &'static str,
    pub resolution: Resolution,
}

/// 4:3
pub const XGA: ScalingTarget = ScalingTarget {
    name: "XGA",
    resolution: Resolution::fixed(1024, 768),
};

/// 16:10
pub const WXGA: ScalingTarget = ScalingTarget {
    name: "WXGA",
    resolution: Resolution::fixed(1280, 800),
};

/// ~16:9
pub const FWXGA: ScalingTarget = ScalingTarget {
    name: "FWXGA",
    resolution: Resolution::fixed(1366, 768),
};

/// Scan order for frame selection
pub const SCALING_TARGETS: [ScalingTarget; 3] = [XGA, WXGA, FWXGA];

/// Target used when nothing in the table matches
pub const DEFAULT_TARGET: ScalingTarget = WXGA;

/// Pick the logical frame for a display of the given native resolution.
///
/// The first table entry whose aspect ratio is within tolerance and whose
/// width is strictly below the native width wins. An entry matching only on
/// aspect ratio does not end the scan.
pub fn derive_logical_frame(native: Resolution) -> ScalingTarget {
    let ratio = native.aspect_ratio();

    SCALING_TARGETS
        .iter()
        .find(|target| {
            let target_ratio = target.resolution.aspect_ratio();
            ((target_ratio - ratio) / ratio).abs() < ASPECT_TOLERANCE
                && target.resolution.width < native.width
        })
        .copied()
        .unwrap_or(DEFAULT_TARGET)
}

/// Scale a native coordinate down into the logical frame
pub fn to_logical(native: Resolution, frame: Resolution, x: u32, y: u32) -> (u32, u32) {
    let (x_factor, y_factor) = factors(native, frame);
    (
        (x as f64 * x_factor).round() as u32,
        (y as f64 * y_factor).round() as u32,
    )
}

/// Scale a logical coordinate up into native pixels.
///
/// Bounds are checked on the incoming coordinate against the native size,
/// before the inversion.
pub fn to_native(native: Resolution, frame: Resolution, x: u32, y: u32) -> ToolResult<(u32, u32)> {
    if x >= native.width || y >= native.height {
        return Err(ToolError::OutOfBounds { x, y });
    }
    let (x_factor, y_factor) = factors(native, frame);
    Ok((
        (x as f64 / x_factor).round() as u32,
        (y as f64 / y_factor).round() as u32,
    ))
}

fn factors(native: Resolution, frame: Resolution) -> (f64, f64) {
    (
        frame.width as f64 / native.width as f64,
        frame.height as f64 / native.height as f64,
    )
}

/// Per-display scaling state.
///
/// Holds the native resolution and the frame derived from it. When scaling is
/// disabled both conversions are the identity and the logical frame is the
/// native resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaler {
    native: Resolution,
    target: ScalingTarget,
    enabled: bool,
}

impl Scaler {
    pub fn new(native: Resolution, enabled: bool) -> Self {
        Self {
            native,
            target: derive_logical_frame(native),
            enabled,
        }
    }

    pub fn native(&self) -> Resolution {
        self.native
    }

    /// The scaling target in effect, `None` when scaling is disabled
    pub fn target(&self) -> Option<ScalingTarget> {
        self.enabled.then_some(self.target)
    }

    /// Resolution of the coordinate space the agent addresses
    pub fn logical_frame(&self) -> Resolution {
        match self.target() {
            Some(target) => target.resolution,
            None => self.native,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn to_logical(&self, x: u32, y: u32) -> (u32, u32) {
        match self.target() {
            Some(target) => to_logical(self.native, target.resolution, x, y),
            None => (x, y),
        }
    }

    pub fn to_native(&self, x: u32, y: u32) -> ToolResult<(u32, u32)> {
        match self.target() {
            Some(target) => to_native(self.native, target.resolution, x, y),
            None if x >= self.native.width || y >= self.native.height => {
                Err(ToolError::OutOfBounds { x, y })
            }
            None => Ok((x, y)),
        }
    }
}

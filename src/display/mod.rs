//! Display registry
//!
//! Builds an ordered catalog of every surface the agent could drive: native
//! monitors sorted left to right, followed by Android devices attached to the
//! local ADB server. The registry holds no state; each call re-queries the OS
//! and the device endpoint.

pub mod monitor;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use crate::scaling::Resolution;
use crate::adb::AdbError;
use monitor::{Bounds, MonitorError, MonitorInfo, MonitorSource};

/// Which backend a display is driven through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    Native,
    Remote,
}

/// Horizontal placement of a native monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Layout {
    Left,
    Center,
    Right,
}

/// Whether a native monitor is the OS primary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Primary,
    Secondary,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Left => write!(f, "Left"),
            Layout::Center => write!(f, "Center"),
            Layout::Right => write!(f, "Right"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Primary => write!(f, "Primary"),
            Role::Secondary => write!(f, "Secondary"),
        }
    }
}

/// One enumerated display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Display {
    /// Position in the catalog
    pub index: usize,
    /// Device serial; `None` for native monitors
    pub name: Option<String>,
    pub kind: DisplayKind,
    pub resolution: Resolution,
    pub layout: Option<Layout>,
    pub role: Option<Role>,
    /// Top-left corner inside the virtual desktop; (0, 0) for remote devices
    pub origin: (i32, i32),
}

impl Display {
    /// Bounding box of a native monitor inside the virtual desktop
    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.origin.0,
            y: self.origin.1,
            width: self.resolution.width(),
            height: self.resolution.height(),
        }
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DisplayKind::Native => {
                write!(f, "Monitor {}: {}", self.index, self.resolution)?;
                if let Some(layout) = self.layout {
                    write!(f, ", {}", layout)?;
                }
                if let Some(role) = self.role {
                    write!(f, ", {}", role)?;
                }
                Ok(())
            }
            DisplayKind::Remote => write!(
                f,
                "ADB Device {}: {}",
                self.name.as_deref().unwrap_or("unknown"),
                self.resolution
            ),
        }
    }
}

/// Errors from display enumeration and selection
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to enumerate monitors: {0}")]
    Enumeration(#[from] MonitorError),

    #[error("Display not found: {0}")]
    NotFound(String),
}

/// How configuration picks a display from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplaySelector {
    #[default]
    Primary,
    Index(usize),
    Serial(String),
}

impl FromStr for DisplaySelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("primary") {
            return Ok(DisplaySelector::Primary);
        }
        if let Some(serial) = s.strip_prefix("serial:") {
            let serial = serial.trim();
            if serial.is_empty() {
                return Err("serial selector needs a device serial".to_string());
            }
            return Ok(DisplaySelector::Serial(serial.to_string()));
        }
        s.parse::<usize>()
            .map(DisplaySelector::Index)
            .map_err(|_| format!("invalid display selector '{}'", s))
    }
}

impl fmt::Display for DisplaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplaySelector::Primary => write!(f, "primary"),
            DisplaySelector::Index(index) => write!(f, "{}", index),
            DisplaySelector::Serial(serial) => write!(f, "serial:{}", serial),
        }
    }
}

/// Result of one enumeration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    pub displays: Vec<Display>,
    /// Catalog index of the OS primary monitor
    pub primary_index: usize,
}

impl Catalog {
    pub fn primary(&self) -> Option<&Display> {
        self.displays.get(self.primary_index)
    }

    /// Resolve a configured selection against this catalog
    pub fn select(&self, selector: &DisplaySelector) -> Result<&Display, RegistryError> {
        let found = match selector {
            DisplaySelector::Primary => self.primary(),
            DisplaySelector::Index(index) => self.displays.get(*index),
            DisplaySelector::Serial(serial) => self
                .displays
                .iter()
                .find(|display| display.name.as_deref() == Some(serial.as_str())),
        };
        found.ok_or_else(|| RegistryError::NotFound(selector.to_string()))
    }
}

/// Source of remote devices reachable through a device-management endpoint
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Serials of attached, ready devices
    async fn serials(&self) -> Result<Vec<String>, AdbError>;

    /// Current window size of a device
    async fn window_size(&self, serial: &str) -> Result<Resolution, AdbError>;
}

/// Enumerate every display available right now.
///
/// Only a failure to list native monitors is an error. An unreachable device
/// endpoint contributes no entries.
pub async fn enumerate(
    monitors: &dyn MonitorSource,
    devices: &dyn DeviceSource,
) -> Result<Catalog, RegistryError> {
    let mut infos = monitors.monitors()?;
    infos.sort_by_key(|info| info.bounds.x);

    let sized: Vec<(MonitorInfo, Resolution)> = infos
        .into_iter()
        .filter_map(|info| match Resolution::new(info.bounds.width, info.bounds.height) {
            Some(resolution) => Some((info, resolution)),
            None => {
                tracing::warn!("Skipping monitor '{}' with empty bounds", info.name);
                None
            }
        })
        .collect();

    // Layout is positional among the monitors that made it into the catalog
    let count = sized.len();
    let mut primary_index = 0;
    let mut displays = Vec::with_capacity(count);

    for (index, (info, resolution)) in sized.into_iter().enumerate() {
        let layout = if index == 0 {
            Layout::Left
        } else if index == count - 1 {
            Layout::Right
        } else {
            Layout::Center
        };

        let role = if info.is_primary {
            primary_index = index;
            Role::Primary
        } else {
            Role::Secondary
        };

        displays.push(Display {
            index,
            name: None,
            kind: DisplayKind::Native,
            resolution,
            layout: Some(layout),
            role: Some(role),
            origin: (info.bounds.x, info.bounds.y),
        });
    }

    let serials = match devices.serials().await {
        Ok(serials) => serials,
        Err(e) => {
            tracing::debug!("Device endpoint unavailable, no remote displays: {}", e);
            Vec::new()
        }
    };

    for serial in serials {
        match devices.window_size(&serial).await {
            Ok(resolution) => displays.push(Display {
                index: displays.len(),
                name: Some(serial),
                kind: DisplayKind::Remote,
                resolution,
                layout: None,
                role: None,
                origin: (0, 0),
            }),
            Err(e) => tracing::warn!("Skipping device {}: {}", serial, e),
        }
    }

    tracing::debug!(
        "Enumerated {} displays, primary index {}",
        displays.len(),
        primary_index
    );

    Ok(Catalog {
        displays,
        primary_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDevices, FakeMonitors};

    #[tokio::test]
    async fn test_single_monitor_is_left_and_primary() {
        let monitors = FakeMonitors::new(vec![(0, 0, 1920, 1080, true)]);
        let catalog = enumerate(&monitors, &FakeDevices::unreachable()).await.unwrap();

        assert_eq!(catalog.displays.len(), 1);
        assert_eq!(catalog.primary_index, 0);
        let display = &catalog.displays[0];
        assert_eq!(display.layout, Some(Layout::Left));
        assert_eq!(display.role, Some(Role::Primary));
        assert_eq!(display.to_string(), "Monitor 0: 1920x1080, Left, Primary");
    }

    #[tokio::test]
    async fn test_monitors_sorted_left_to_right() {
        let monitors = FakeMonitors::new(vec![
            (3840, 0, 1920, 1080, false),
            (0, 0, 1920, 1080, false),
            (1920, 0, 2560, 1440, true),
        ]);
        let catalog = enumerate(&monitors, &FakeDevices::unreachable()).await.unwrap();

        let layouts: Vec<_> = catalog.displays.iter().map(|d| d.layout).collect();
        assert_eq!(
            layouts,
            vec![Some(Layout::Left), Some(Layout::Center), Some(Layout::Right)]
        );
        let origins: Vec<_> = catalog.displays.iter().map(|d| d.origin.0).collect();
        assert_eq!(origins, vec![0, 1920, 3840]);
        assert_eq!(catalog.primary_index, 1);
        assert_eq!(catalog.displays[1].role, Some(Role::Primary));
        assert_eq!(catalog.displays[0].role, Some(Role::Secondary));
        assert_eq!(catalog.displays[2].role, Some(Role::Secondary));
    }

    #[tokio::test]
    async fn test_zero_size_monitor_does_not_shift_layout() {
        let monitors = FakeMonitors::new(vec![
            (-100, 0, 0, 0, false),
            (0, 0, 1920, 1080, true),
            (1920, 0, 1920, 1080, false),
        ]);
        let catalog = enumerate(&monitors, &FakeDevices::unreachable()).await.unwrap();

        let layouts: Vec<_> = catalog.displays.iter().map(|d| d.layout).collect();
        assert_eq!(layouts, vec![Some(Layout::Left), Some(Layout::Right)]);
        let indices: Vec<_> = catalog.displays.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(catalog.primary_index, 0);
    }

    #[tokio::test]
    async fn test_trailing_zero_size_monitor_keeps_right() {
        let monitors = FakeMonitors::new(vec![
            (0, 0, 1920, 1080, true),
            (1920, 0, 2560, 1440, false),
            (4480, 0, 0, 0, false),
        ]);
        let catalog = enumerate(&monitors, &FakeDevices::unreachable()).await.unwrap();

        let layouts: Vec<_> = catalog.displays.iter().map(|d| d.layout).collect();
        assert_eq!(layouts, vec![Some(Layout::Left), Some(Layout::Right)]);
    }

    #[tokio::test]
    async fn test_remote_devices_appended() {
        let monitors = FakeMonitors::new(vec![(0, 0, 1920, 1080, true)]);
        let devices = FakeDevices::new(vec![("emulator-5554", 1080, 2340)]);
        let catalog = enumerate(&monitors, &devices).await.unwrap();

        assert_eq!(catalog.displays.len(), 2);
        let remote = &catalog.displays[1];
        assert_eq!(remote.index, 1);
        assert_eq!(remote.kind, DisplayKind::Remote);
        assert_eq!(remote.name.as_deref(), Some("emulator-5554"));
        assert_eq!(remote.layout, None);
        assert_eq!(remote.role, None);
        assert_eq!(remote.to_string(), "ADB Device emulator-5554: 1080x2340");
    }

    #[tokio::test]
    async fn test_device_with_failing_size_is_skipped() {
        let monitors = FakeMonitors::new(vec![(0, 0, 1920, 1080, true)]);
        let devices = FakeDevices::new(vec![("good", 720, 1280)]).with_broken("flaky");
        let catalog = enumerate(&monitors, &devices).await.unwrap();

        let names: Vec<_> = catalog.displays.iter().filter_map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["good".to_string()]);
    }

    #[tokio::test]
    async fn test_monitor_failure_is_registry_error() {
        let monitors = FakeMonitors::failing();
        let result = enumerate(&monitors, &FakeDevices::unreachable()).await;
        assert!(matches!(result, Err(RegistryError::Enumeration(_))));
    }

    #[tokio::test]
    async fn test_select() {
        let monitors = FakeMonitors::new(vec![(0, 0, 1920, 1080, false), (1920, 0, 1920, 1080, true)]);
        let devices = FakeDevices::new(vec![("R58M123", 1080, 2400)]);
        let catalog = enumerate(&monitors, &devices).await.unwrap();

        assert_eq!(catalog.select(&DisplaySelector::Primary).unwrap().index, 1);
        assert_eq!(catalog.select(&DisplaySelector::Index(0)).unwrap().index, 0);
        let remote = catalog
            .select(&DisplaySelector::Serial("R58M123".to_string()))
            .unwrap();
        assert_eq!(remote.kind, DisplayKind::Remote);
        assert!(matches!(
            catalog.select(&DisplaySelector::Serial("missing".to_string())),
            Err(RegistryError::NotFound(_))
        ));
        assert!(catalog.select(&DisplaySelector::Index(7)).is_err());
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!("primary".parse::<DisplaySelector>(), Ok(DisplaySelector::Primary));
        assert_eq!("".parse::<DisplaySelector>(), Ok(DisplaySelector::Primary));
        assert_eq!("2".parse::<DisplaySelector>(), Ok(DisplaySelector::Index(2)));
        assert_eq!(
            "serial:emulator-5554".parse::<DisplaySelector>(),
            Ok(DisplaySelector::Serial("emulator-5554".to_string()))
        );
        assert!("left".parse::<DisplaySelector>().is_err());
        assert!("serial:".parse::<DisplaySelector>().is_err());
    }
}

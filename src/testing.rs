//! In-crate fakes for monitors, devices and input

use async_trait::async_trait;
use enigo::{Button, Direction, Key};
use image::{Rgba, RgbaImage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::adb::AdbError;
use crate::backend::input::{InputDriver, InputError};
use crate::backend::remote::DeviceConnection;
use crate::display::monitor::{Bounds, MonitorError, MonitorInfo, MonitorSource};
use crate::display::{DeviceSource, Display, DisplayKind, Layout, Resolution, Role};

/// Fill color of fake captures
pub const SCREEN_COLOR: Rgba<u8> = Rgba([40, 40, 40, 255]);

pub fn native_display(index: usize, origin: (i32, i32), width: u32, height: u32) -> Display {
    Display {
        index,
        name: None,
        kind: DisplayKind::Native,
        resolution: Resolution::new(width, height).unwrap(),
        layout: Some(Layout::Left),
        role: Some(Role::Primary),
        origin,
    }
}

pub fn remote_display(index: usize, serial: &str, width: u32, height: u32) -> Display {
    Display {
        index,
        name: Some(serial.to_string()),
        kind: DisplayKind::Remote,
        resolution: Resolution::new(width, height).unwrap(),
        layout: None,
        role: None,
        origin: (0, 0),
    }
}

/// Monitors described as `(x, y, width, height, is_primary)`
pub struct FakeMonitors {
    monitors: Option<Vec<MonitorInfo>>,
}

impl FakeMonitors {
    pub fn new(monitors: Vec<(i32, i32, u32, u32, bool)>) -> Self {
        let monitors = monitors
            .into_iter()
            .enumerate()
            .map(|(i, (x, y, width, height, is_primary))| MonitorInfo {
                name: format!("fake-{}", i),
                bounds: Bounds { x, y, width, height },
                is_primary,
            })
            .collect();
        Self {
            monitors: Some(monitors),
        }
    }

    /// A display subsystem that cannot be queried
    pub fn failing() -> Self {
        Self { monitors: None }
    }
}

impl MonitorSource for FakeMonitors {
    fn monitors(&self) -> Result<Vec<MonitorInfo>, MonitorError> {
        self.monitors
            .clone()
            .ok_or_else(|| MonitorError::XCap("no display server".to_string()))
    }

    fn capture(&self, bounds: Bounds) -> Result<RgbaImage, MonitorError> {
        let found = self
            .monitors()?
            .into_iter()
            .any(|info| info.bounds == bounds);
        if !found {
            return Err(MonitorError::Disconnected {
                x: bounds.x,
                y: bounds.y,
            });
        }
        Ok(RgbaImage::from_pixel(bounds.width, bounds.height, SCREEN_COLOR))
    }
}

/// Device endpoint with a fixed device list
pub struct FakeDevices {
    devices: Option<Vec<(String, u32, u32)>>,
    broken: Vec<String>,
}

impl FakeDevices {
    pub fn new(devices: Vec<(&str, u32, u32)>) -> Self {
        Self {
            devices: Some(
                devices
                    .into_iter()
                    .map(|(serial, w, h)| (serial.to_string(), w, h))
                    .collect(),
            ),
            broken: Vec::new(),
        }
    }

    /// No endpoint listening
    pub fn unreachable() -> Self {
        Self {
            devices: None,
            broken: Vec::new(),
        }
    }

    /// Add a listed device whose size query fails
    pub fn with_broken(mut self, serial: &str) -> Self {
        self.broken.push(serial.to_string());
        self
    }
}

#[async_trait]
impl DeviceSource for FakeDevices {
    async fn serials(&self) -> Result<Vec<String>, AdbError> {
        let devices = self.devices.as_ref().ok_or_else(|| {
            AdbError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
        })?;
        let mut serials: Vec<String> = devices.iter().map(|(serial, _, _)| serial.clone()).collect();
        serials.extend(self.broken.iter().cloned());
        Ok(serials)
    }

    async fn window_size(&self, serial: &str) -> Result<Resolution, AdbError> {
        self.devices
            .iter()
            .flatten()
            .find(|(s, _, _)| s == serial)
            .and_then(|(_, w, h)| Resolution::new(*w, *h))
            .ok_or_else(|| AdbError::Parse(format!("no size for {}", serial)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    MoveTo(i32, i32),
    Button(Button, Direction),
    Key(Key, Direction),
    Text(String),
}

#[derive(Default)]
struct RecorderState {
    events: Vec<InputEvent>,
    cursor: (i32, i32),
    held: Vec<Key>,
}

/// Input driver that records every call; clones share one log
#[derive(Clone, Default)]
pub struct RecordingDriver {
    state: Arc<Mutex<RecorderState>>,
    fail_press: Vec<Key>,
    fail_release: Vec<Key>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_press(mut self, key: Key) -> Self {
        self.fail_press.push(key);
        self
    }

    pub fn fail_release(mut self, key: Key) -> Self {
        self.fail_release.push(key);
        self
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn held_keys(&self) -> Vec<Key> {
        self.state.lock().unwrap().held.clone()
    }
}

impl InputDriver for RecordingDriver {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        let mut state = self.state.lock().unwrap();
        state.cursor = (x, y);
        state.events.push(InputEvent::MoveTo(x, y));
        Ok(())
    }

    fn location(&mut self) -> Result<(i32, i32), InputError> {
        Ok(self.state.lock().unwrap().cursor)
    }

    fn button(&mut self, button: Button, direction: Direction) -> Result<(), InputError> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(InputEvent::Button(button, direction));
        Ok(())
    }

    fn key(&mut self, key: Key, direction: Direction) -> Result<(), InputError> {
        let failure = match direction {
            Direction::Press if self.fail_press.contains(&key) => Some("press"),
            Direction::Release if self.fail_release.contains(&key) => Some("release"),
            _ => None,
        };
        if let Some(stage) = failure {
            return Err(InputError::Backend(format!("{:?} {} failed", key, stage)));
        }

        let mut state = self.state.lock().unwrap();
        match direction {
            Direction::Press => state.held.push(key),
            Direction::Release => state.held.retain(|held| *held != key),
            Direction::Click => {}
        }
        state.events.push(InputEvent::Key(key, direction));
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), InputError> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(InputEvent::Text(text.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Tap(u32, u32),
    /// From, to, duration in milliseconds
    Swipe((u32, u32), (u32, u32), u128),
    Keys(Vec<String>),
    Text(String),
}

/// Remote device that records input and returns blank screenshots
#[derive(Clone)]
pub struct FakeDevice {
    serial: String,
    size: (u32, u32),
    events: Arc<Mutex<Vec<DeviceEvent>>>,
}

impl FakeDevice {
    pub fn new(serial: &str, width: u32, height: u32) -> Self {
        Self {
            serial: serial.to_string(),
            size: (width, height),
            events: Arc::default(),
        }
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: DeviceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl DeviceConnection for FakeDevice {
    fn serial(&self) -> &str {
        &self.serial
    }

    async fn tap(&self, x: u32, y: u32) -> Result<(), AdbError> {
        self.record(DeviceEvent::Tap(x, y));
        Ok(())
    }

    async fn swipe(&self, from: (u32, u32), to: (u32, u32), duration: Duration) -> Result<(), AdbError> {
        self.record(DeviceEvent::Swipe(from, to, duration.as_millis()));
        Ok(())
    }

    async fn key_events(&self, codes: &[String]) -> Result<(), AdbError> {
        self.record(DeviceEvent::Keys(codes.to_vec()));
        Ok(())
    }

    async fn input_text(&self, text: &str) -> Result<(), AdbError> {
        self.record(DeviceEvent::Text(text.to_string()));
        Ok(())
    }

    async fn screenshot(&self) -> Result<RgbaImage, AdbError> {
        Ok(RgbaImage::from_pixel(self.size.0, self.size.1, SCREEN_COLOR))
    }
}

//! screenpilot: drive native monitors and Android devices for a computer-use agent
//!
//! The agent addresses a small standard logical resolution. This library
//! finds the available displays, binds one, scales coordinates between the
//! logical frame and the display's pixels, and routes each validated action
//! to the matching input backend.

pub mod adb;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod scaling;
pub mod screenshot;
pub mod tool;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use dispatch::{Action, ActionRequest, ActionResult, Dispatcher};
pub use error::{ToolError, ToolResult};
pub use tool::{ComputerTool, ToolOptions};

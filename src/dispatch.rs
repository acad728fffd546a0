//! Action dispatch
//!
//! Validates agent requests against the per-action argument contract, scales
//! coordinates between the logical frame and native pixels, and routes the
//! command to the bound backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::backend::{Backend, ClickKind};
use crate::error::{ToolError, ToolResult};
use crate::screenshot;

/// Every action the agent can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Key,
    Type,
    MouseMove,
    LeftClick,
    LeftClickDrag,
    RightClick,
    MiddleClick,
    DoubleClick,
    Screenshot,
    CursorPosition,
}

/// Whether a request field must or must not be present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    Forbidden,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Key,
        Action::Type,
        Action::MouseMove,
        Action::LeftClick,
        Action::LeftClickDrag,
        Action::RightClick,
        Action::MiddleClick,
        Action::DoubleClick,
        Action::Screenshot,
        Action::CursorPosition,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::Key => "key",
            Action::Type => "type",
            Action::MouseMove => "mouse_move",
            Action::LeftClick => "left_click",
            Action::LeftClickDrag => "left_click_drag",
            Action::RightClick => "right_click",
            Action::MiddleClick => "middle_click",
            Action::DoubleClick => "double_click",
            Action::Screenshot => "screenshot",
            Action::CursorPosition => "cursor_position",
        }
    }

    /// Rules for the `text` and `coordinate` fields, in that order
    pub fn contract(&self) -> (FieldRule, FieldRule) {
        use FieldRule::*;
        match self {
            Action::MouseMove | Action::LeftClickDrag => (Forbidden, Required),
            Action::Key | Action::Type => (Required, Forbidden),
            Action::LeftClick
            | Action::RightClick
            | Action::MiddleClick
            | Action::DoubleClick
            | Action::Screenshot
            | Action::CursorPosition => (Forbidden, Forbidden),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| ToolError::argument("action", format!("Invalid action: {}", s)))
    }
}

/// A request from the agent.
///
/// Fields are kept loosely typed so malformed values produce errors naming
/// the offending field instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<Value>,
}

/// A validated request ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MouseMove { x: u32, y: u32 },
    LeftClickDrag { x: u32, y: u32 },
    Key { combo: String, keys: Vec<String> },
    Type { text: String },
    Click(ClickKind),
    Screenshot,
    CursorPosition,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(Value::String(text.into()));
        self
    }

    pub fn with_coordinate(mut self, x: i64, y: i64) -> Self {
        self.coordinate = Some(Value::from(vec![x, y]));
        self
    }

    /// Check the request against its action's contract.
    ///
    /// Checks run in a fixed order: action name, then missing and forbidden
    /// fields, then the shape of the values. No backend is touched.
    pub fn validate(&self) -> ToolResult<Command> {
        let action: Action = self.action.parse()?;
        let (text_rule, coordinate_rule) = action.contract();

        if text_rule == FieldRule::Required && self.text.is_none() {
            return Err(ToolError::argument("text", format!("text is required for {}", action)));
        }
        if coordinate_rule == FieldRule::Required && self.coordinate.is_none() {
            return Err(ToolError::argument(
                "coordinate",
                format!("coordinate is required for {}", action),
            ));
        }
        if text_rule == FieldRule::Forbidden && self.text.is_some() {
            return Err(ToolError::argument(
                "text",
                format!("text is not accepted for {}", action),
            ));
        }
        if coordinate_rule == FieldRule::Forbidden && self.coordinate.is_some() {
            return Err(ToolError::argument(
                "coordinate",
                format!("coordinate is not accepted for {}", action),
            ));
        }

        let command = match action {
            Action::MouseMove => {
                let (x, y) = self.coordinate_pair()?;
                Command::MouseMove { x, y }
            }
            Action::LeftClickDrag => {
                let (x, y) = self.coordinate_pair()?;
                Command::LeftClickDrag { x, y }
            }
            Action::Key => {
                let combo = self.text_value()?;
                let keys: Vec<String> = combo
                    .split('+')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .collect();
                if keys.is_empty() {
                    return Err(ToolError::argument("text", "text must name at least one key"));
                }
                Command::Key { combo, keys }
            }
            Action::Type => Command::Type {
                text: self.text_value()?,
            },
            Action::LeftClick => Command::Click(ClickKind::Left),
            Action::RightClick => Command::Click(ClickKind::Right),
            Action::MiddleClick => Command::Click(ClickKind::Middle),
            Action::DoubleClick => Command::Click(ClickKind::Double),
            Action::Screenshot => Command::Screenshot,
            Action::CursorPosition => Command::CursorPosition,
        };
        Ok(command)
    }

    fn text_value(&self) -> ToolResult<String> {
        match &self.text {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(other) => Err(ToolError::argument("text", format!("{} must be a string", other))),
            None => Err(ToolError::argument("text", "text is required")),
        }
    }

    fn coordinate_pair(&self) -> ToolResult<(u32, u32)> {
        let raw = self.coordinate.as_ref().unwrap_or(&Value::Null);
        let items = match raw.as_array() {
            Some(items) if items.len() == 2 => items,
            _ => {
                return Err(ToolError::argument(
                    "coordinate",
                    format!("{} must be a tuple of length 2", raw),
                ))
            }
        };

        let mut pair = [0u32; 2];
        for (slot, item) in pair.iter_mut().zip(items) {
            let value = item.as_u64().ok_or_else(|| {
                ToolError::argument(
                    "coordinate",
                    format!("{} must be a tuple of non-negative ints", raw),
                )
            })?;
            // Anything past u32 is far outside every display
            *slot = u32::try_from(value).unwrap_or(u32::MAX);
        }
        Ok((pair[0], pair[1]))
    }
}

/// Outcome reported back to the agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// PNG, base64 encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl ActionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn image(base64_image: String) -> Self {
        Self {
            base64_image: Some(base64_image),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, base64_image: String) -> Self {
        self.base64_image = Some(base64_image);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Routes validated requests to one backend
pub struct Dispatcher {
    backend: Box<dyn Backend>,
}

impl Dispatcher {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    /// Execute a request, folding any failure into the result
    pub async fn dispatch(&mut self, request: &ActionRequest) -> ActionResult {
        match self.execute(request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Action '{}' failed: {}", request.action, e);
                ActionResult::error(e.to_string())
            }
        }
    }

    pub async fn execute(&mut self, request: &ActionRequest) -> ToolResult<ActionResult> {
        let command = request.validate()?;
        tracing::info!("Dispatching {}", request.action);

        match command {
            Command::MouseMove { x, y } => {
                let (nx, ny) = self.backend.scaler().to_native(x, y)?;
                tracing::debug!("mouse_move ({}, {}) -> native ({}, {})", x, y, nx, ny);
                self.backend.move_to(nx, ny).await?;
                Ok(ActionResult::success(format!("Moved mouse to ({}, {})", x, y)))
            }
            Command::LeftClickDrag { x, y } => {
                let to = self.backend.scaler().to_native(x, y)?;
                let from = self.backend.cursor_position().await?;
                tracing::debug!("left_click_drag native {:?} -> {:?}", from, to);
                self.backend.drag_to(from, to).await?;

                let (fx, fy) = self.backend.scaler().to_logical(from.0, from.1);
                Ok(ActionResult::success(format!(
                    "Dragged mouse from ({}, {}) to ({}, {})",
                    fx, fy, x, y
                )))
            }
            Command::Key { combo, keys } => {
                self.backend.press_keys(&keys).await?;
                Ok(ActionResult::success(format!("Pressed keys: {}", combo)))
            }
            Command::Type { text } => {
                self.backend.type_text(&text).await?;
                let image = self.capture_base64().await?;
                Ok(ActionResult::success(text).with_image(image))
            }
            Command::Click(kind) => {
                self.backend.click(kind).await?;
                Ok(ActionResult::success(format!("Performed {}", kind.action_name())))
            }
            Command::Screenshot => self.screenshot().await,
            Command::CursorPosition => {
                let (nx, ny) = self.backend.cursor_position().await?;
                let (x, y) = self.backend.scaler().to_logical(nx, ny);
                Ok(ActionResult::success(format!("X={},Y={}", x, y)))
            }
        }
    }

    /// Capture the bound display in the logical frame
    pub async fn screenshot(&mut self) -> ToolResult<ActionResult> {
        Ok(ActionResult::image(self.capture_base64().await?))
    }

    async fn capture_base64(&mut self) -> ToolResult<String> {
        let image = self.backend.capture_screen().await?;
        let png = screenshot::encode_png(&image)?;
        Ok(screenshot::encode_base64(&png))
    }
}

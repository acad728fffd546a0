//! Native keyboard and pointer injection
//!
//! The [`InputDriver`] trait is the seam between the native backend and the
//! OS. Production uses [`EnigoDriver`], which owns a single Enigo instance on a
//! dedicated thread so held keys and buttons persist between calls.

use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use std::sync::mpsc;
use std::thread;
use thiserror::Error;

/// Errors from native input injection
#[derive(Error, Debug)]
pub enum InputError {
    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("{0}")]
    Backend(String),

    #[error("input thread is not running")]
    Disconnected,

    /// A key press failed and releasing the keys already held failed too
    #[error("{cause}; releasing held keys also failed: {release}")]
    StuckKeys {
        cause: Box<InputError>,
        release: Box<InputError>,
    },
}

/// OS-level pointer and keyboard synthesis in virtual-desktop coordinates
pub trait InputDriver: Send {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError>;
    fn location(&mut self) -> Result<(i32, i32), InputError>;
    fn button(&mut self, button: Button, direction: Direction) -> Result<(), InputError>;
    fn key(&mut self, key: Key, direction: Direction) -> Result<(), InputError>;
    fn text(&mut self, text: &str) -> Result<(), InputError>;
}

/// Resolve a key name through the alias table.
///
/// Matching ignores case as well as spaces, dashes and underscores, so
/// `Page_Down`, `page down` and `pagedown` are the same key.
pub fn parse_key(name: &str) -> Result<Key, InputError> {
    let trimmed = name.trim();
    let normalized: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect();

    let key = match normalized.as_str() {
        "return" | "enter" => Key::Return,
        "tab" => Key::Tab,
        "space" => Key::Space,
        "backspace" => Key::Backspace,
        "escape" | "esc" => Key::Escape,
        "delete" | "del" => Key::Delete,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "prior" => Key::PageUp,
        "pagedown" | "next" => Key::PageDown,
        "up" | "uparrow" => Key::UpArrow,
        "down" | "downarrow" => Key::DownArrow,
        "left" | "leftarrow" => Key::LeftArrow,
        "right" | "rightarrow" => Key::RightArrow,
        "ctrl" | "control" | "controll" | "controlr" => Key::Control,
        "shift" | "shiftl" | "shiftr" => Key::Shift,
        "alt" | "altl" | "altr" | "option" => Key::Alt,
        "super" | "superl" | "superr" | "win" | "meta" | "cmd" | "command" => Key::Meta,
        "capslock" => Key::CapsLock,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => {
            let mut chars = trimmed.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c.to_lowercase().next().unwrap_or(c)),
                _ => return Err(InputError::UnknownKey(trimmed.to_string())),
            }
        }
    };

    Ok(key)
}

/// Hold every key in order, then release in reverse.
///
/// If a press fails, the keys already held are released before the error is
/// returned so nothing stays stuck down.
pub fn press_combination(driver: &mut dyn InputDriver, keys: &[Key]) -> Result<(), InputError> {
    let mut held = Vec::with_capacity(keys.len());

    for &key in keys {
        if let Err(cause) = driver.key(key, Direction::Press) {
            tracing::warn!("Pressing {:?} failed, releasing {} held keys", key, held.len());
            return Err(match release_all(driver, &held) {
                Ok(()) => cause,
                Err(release) => InputError::StuckKeys {
                    cause: Box::new(cause),
                    release: Box::new(release),
                },
            });
        }
        held.push(key);
    }

    release_all(driver, &held)
}

/// Release keys in reverse order, attempting every key even after a failure
fn release_all(driver: &mut dyn InputDriver, held: &[Key]) -> Result<(), InputError> {
    let mut first_error = None;
    for &key in held.iter().rev() {
        if let Err(e) = driver.key(key, Direction::Release) {
            tracing::error!("Failed to release {:?}: {}", key, e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

enum Request {
    MoveTo(i32, i32),
    Location,
    Button(Button, Direction),
    Key(Key, Direction),
    Text(String),
}

type Reply = Result<Option<(i32, i32)>, InputError>;

/// Enigo owned by a dedicated input thread
pub struct EnigoDriver {
    requests: mpsc::Sender<(Request, mpsc::Sender<Reply>)>,
}

impl EnigoDriver {
    /// Start the input thread and connect to the OS input system
    pub fn spawn() -> Result<Self, InputError> {
        let (requests, inbox) = mpsc::channel::<(Request, mpsc::Sender<Reply>)>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), InputError>>();

        thread::Builder::new()
            .name("screenpilot-input".to_string())
            .spawn(move || {
                let mut enigo = match Enigo::new(&Settings::default()) {
                    Ok(enigo) => enigo,
                    Err(e) => {
                        let _ = ready_tx.send(Err(InputError::Backend(e.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Runs until the driver is dropped
                for (request, reply) in inbox {
                    let _ = reply.send(serve(&mut enigo, request));
                }
            })
            .map_err(|e| InputError::Backend(e.to_string()))?;

        ready_rx.recv().map_err(|_| InputError::Disconnected)??;
        tracing::debug!("Input thread started");
        Ok(Self { requests })
    }

    fn call(&self, request: Request) -> Reply {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.requests
            .send((request, reply_tx))
            .map_err(|_| InputError::Disconnected)?;
        reply_rx.recv().map_err(|_| InputError::Disconnected)?
    }
}

fn serve(enigo: &mut Enigo, request: Request) -> Reply {
    let backend = |e: enigo::InputError| InputError::Backend(e.to_string());
    match request {
        Request::MoveTo(x, y) => enigo.move_mouse(x, y, Coordinate::Abs).map_err(backend)?,
        Request::Location => return enigo.location().map(Some).map_err(backend),
        Request::Button(button, direction) => enigo.button(button, direction).map_err(backend)?,
        Request::Key(key, direction) => enigo.key(key, direction).map_err(backend)?,
        Request::Text(text) => enigo.text(&text).map_err(backend)?,
    }
    Ok(None)
}

impl InputDriver for EnigoDriver {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        self.call(Request::MoveTo(x, y)).map(|_| ())
    }

    fn location(&mut self) -> Result<(i32, i32), InputError> {
        self.call(Request::Location)?
            .ok_or_else(|| InputError::Backend("no cursor location reported".to_string()))
    }

    fn button(&mut self, button: Button, direction: Direction) -> Result<(), InputError> {
        self.call(Request::Button(button, direction)).map(|_| ())
    }

    fn key(&mut self, key: Key, direction: Direction) -> Result<(), InputError> {
        self.call(Request::Key(key, direction)).map(|_| ())
    }

    fn text(&mut self, text: &str) -> Result<(), InputError> {
        self.call(Request::Text(text.to_string())).map(|_| ())
    }
}

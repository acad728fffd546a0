//! Minimal client for the ADB server host protocol
//!
//! Talks to a running `adb` server over TCP (127.0.0.1:5037 by default).
//! Every request opens a fresh connection: a 4-hex-digit length prefix, the
//! request, then an `OKAY`/`FAIL` status frame.

use async_trait::async_trait;
use image::RgbaImage;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::display::{DeviceSource, Resolution};

/// Address of a local ADB server
pub const DEFAULT_ADB_ADDR: &str = "127.0.0.1:5037";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors from the ADB client
#[derive(Error, Debug)]
pub enum AdbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out connecting to ADB server at {0}")]
    Timeout(String),

    /// The server answered with a FAIL frame
    #[error("ADB server refused request: {0}")]
    Failed(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unexpected device output: {0}")]
    Parse(String),

    #[error("invalid screenshot: {0}")]
    Image(#[from] image::ImageError),
}

/// Connection factory for one ADB server
#[derive(Debug, Clone)]
pub struct AdbClient {
    addr: String,
}

impl Default for AdbClient {
    fn default() -> Self {
        Self::new(DEFAULT_ADB_ADDR)
    }
}

impl AdbClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<TcpStream, AdbError> {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr)).await {
            Ok(stream) => Ok(stream?),
            Err(_) => Err(AdbError::Timeout(self.addr.clone())),
        }
    }

    /// Serials of devices in the `device` state
    pub async fn device_list(&self) -> Result<Vec<String>, AdbError> {
        let mut stream = self.connect().await?;
        send_request(&mut stream, "host:devices").await?;
        read_status(&mut stream).await?;
        let listing = read_length_prefixed(&mut stream).await?;
        Ok(parse_device_list(&listing))
    }

    /// Handle for one device; does not check that it is attached
    pub fn device(&self, serial: impl Into<String>) -> AdbDevice {
        AdbDevice {
            client: self.clone(),
            serial: serial.into(),
        }
    }
}

#[async_trait]
impl DeviceSource for AdbClient {
    async fn serials(&self) -> Result<Vec<String>, AdbError> {
        self.device_list().await
    }

    async fn window_size(&self, serial: &str) -> Result<Resolution, AdbError> {
        self.device(serial).window_size().await
    }
}

/// One attached device
#[derive(Debug, Clone)]
pub struct AdbDevice {
    client: AdbClient,
    serial: String,
}

impl AdbDevice {
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Open a transport to this device and run `service` on it
    async fn open(&self, service: &str) -> Result<TcpStream, AdbError> {
        let mut stream = self.client.connect().await?;
        send_request(&mut stream, &format!("host:transport:{}", self.serial)).await?;
        read_status(&mut stream).await?;
        send_request(&mut stream, service).await?;
        read_status(&mut stream).await?;
        Ok(stream)
    }

    /// Run a shell command and collect its raw output
    pub async fn shell(&self, command: &str) -> Result<Vec<u8>, AdbError> {
        tracing::debug!("adb -s {} shell {}", self.serial, command);
        let mut stream = self.open(&format!("shell:{}", command)).await?;
        let mut output = Vec::new();
        stream.read_to_end(&mut output).await?;
        Ok(output)
    }

    /// Display size as reported by `wm size`, preferring an override size
    pub async fn window_size(&self) -> Result<Resolution, AdbError> {
        let output = self.shell("wm size").await?;
        parse_window_size(&String::from_utf8_lossy(&output))
    }

    pub async fn tap(&self, x: u32, y: u32) -> Result<(), AdbError> {
        self.shell(&format!("input tap {} {}", x, y)).await?;
        Ok(())
    }

    pub async fn swipe(
        &self,
        from: (u32, u32),
        to: (u32, u32),
        duration: Duration,
    ) -> Result<(), AdbError> {
        self.shell(&format!(
            "input swipe {} {} {} {} {}",
            from.0,
            from.1,
            to.0,
            to.1,
            duration.as_millis()
        ))
        .await?;
        Ok(())
    }

    /// Send key events in order, e.g. `KEYCODE_HOME`
    pub async fn key_events(&self, codes: &[String]) -> Result<(), AdbError> {
        self.shell(&format!("input keyevent {}", codes.join(" "))).await?;
        Ok(())
    }

    pub async fn input_text(&self, text: &str) -> Result<(), AdbError> {
        for chunk in split_literal_escapes(text) {
            self.shell(&format!("input text {}", escape_input_text(chunk))).await?;
        }
        Ok(())
    }

    /// Capture the screen as decoded pixels
    pub async fn screenshot(&self) -> Result<RgbaImage, AdbError> {
        // exec: keeps the PNG stream binary-clean
        let mut stream = self.open("exec:screencap -p").await?;
        let mut png = Vec::new();
        stream.read_to_end(&mut png).await?;
        Ok(image::load_from_memory(&png)?.to_rgba8())
    }
}

async fn send_request<S>(stream: &mut S, payload: &str) -> Result<(), AdbError>
where
    S: AsyncWrite + Unpin,
{
    if payload.len() > 0xffff {
        return Err(AdbError::Protocol(format!(
            "request of {} bytes is too long",
            payload.len()
        )));
    }
    let frame = format!("{:04x}{}", payload.len(), payload);
    stream.write_all(frame.as_bytes()).await?;
    Ok(())
}

async fn read_status<S>(stream: &mut S) -> Result<(), AdbError>
where
    S: AsyncRead + Unpin,
{
    let mut status = [0u8; 4];
    stream.read_exact(&mut status).await?;
    match &status {
        b"OKAY" => Ok(()),
        b"FAIL" => Err(AdbError::Failed(read_length_prefixed(stream).await?)),
        other => Err(AdbError::Protocol(format!(
            "unexpected status {:?}",
            String::from_utf8_lossy(other)
        ))),
    }
}

async fn read_length_prefixed<S>(stream: &mut S) -> Result<String, AdbError>
where
    S: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await?;
    let prefix = std::str::from_utf8(&prefix)
        .map_err(|_| AdbError::Protocol("non-ascii length prefix".to_string()))?;
    let len = usize::from_str_radix(prefix, 16)
        .map_err(|_| AdbError::Protocol(format!("bad length prefix {:?}", prefix)))?;

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Parse `host:devices` output, keeping only ready devices
fn parse_device_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let serial = fields.next()?;
            (fields.next() == Some("device")).then(|| serial.to_string())
        })
        .collect()
}

/// Parse `wm size` output
fn parse_window_size(output: &str) -> Result<Resolution, AdbError> {
    let size_of = |label: &str| {
        output
            .lines()
            .find_map(|line| line.trim().strip_prefix(label))
            .map(str::trim)
    };

    let size = size_of("Override size:")
        .or_else(|| size_of("Physical size:"))
        .ok_or_else(|| AdbError::Parse(output.trim().to_string()))?;

    let (width, height) = size
        .split_once('x')
        .ok_or_else(|| AdbError::Parse(size.to_string()))?;
    let width = width.trim().parse::<u32>();
    let height = height.trim().parse::<u32>();

    match (width, height) {
        (Ok(width), Ok(height)) => {
            Resolution::new(width, height).ok_or_else(|| AdbError::Parse(size.to_string()))
        }
        _ => Err(AdbError::Parse(size.to_string())),
    }
}

/// Split text between `%` and `s` wherever it contains a literal `%s`.
///
/// `input text` decodes `%s` into a space, so each piece goes out in its own
/// call and the pair never reaches the device side by side.
fn split_literal_escapes(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find("%s") {
        chunks.push(&rest[..=pos]);
        rest = &rest[pos + 1..];
    }
    chunks.push(rest);
    chunks
}

/// Quote text for `input text`: spaces become `%s`, the rest is single-quoted
fn escape_input_text(text: &str) -> String {
    let encoded = text.replace(' ', "%s");
    format!("'{}'", encoded.replace('\'', r"'\''"))
}

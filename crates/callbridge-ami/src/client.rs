// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP client for the Asterisk Manager Interface.

use std::time::Duration;

use async_trait::async_trait;
use callbridge_config::model::AmiConfig;
use callbridge_core::{CallbridgeError, EventSource, SwitchEvent};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info, trace, warn};

use crate::frame::{FrameReader, encode_action};

/// Connection settings for one AMI endpoint.
#[derive(Debug, Clone)]
pub struct AmiSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub secret: SecretString,
    /// Bound on TCP connect plus login.
    pub connect_timeout: Duration,
    /// Idle time before a keepalive `Ping`. `None` disables keepalive.
    pub ping_interval: Option<Duration>,
    /// How long a `Ping` may go unanswered before the link counts as dead.
    pub ping_timeout: Duration,
}

impl AmiSettings {
    /// Builds settings from the `[ami]` section; credentials are required.
    pub fn from_config(config: &AmiConfig) -> Result<Self, CallbridgeError> {
        let username = config
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CallbridgeError::Config("ami.username is required".into()))?;
        let secret = config
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CallbridgeError::Config("ami.secret is required".into()))?;

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            username,
            secret: SecretString::from(secret),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs.max(1)),
            ping_interval: match config.ping_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            ping_timeout: Duration::from_secs(config.ping_timeout_secs.max(1)),
        })
    }
}

struct Connection {
    frames: FrameReader<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    pings_sent: u64,
}

/// An authenticated AMI session delivering call events.
pub struct AmiClient {
    settings: AmiSettings,
    name: String,
    connection: Option<Connection>,
}

impl std::fmt::Debug for AmiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmiClient")
            .field("name", &self.name)
            .field("username", &self.settings.username)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

impl AmiClient {
    pub fn new(settings: AmiSettings) -> Self {
        let name = format!("ami://{}:{}", settings.host, settings.port);
        Self {
            settings,
            name,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn open(&self) -> Result<Connection, CallbridgeError> {
        let addr = format!("{}:{}", self.settings.host, self.settings.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| unavailable(format!("cannot connect to {addr}"), e))?;
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);

        let mut banner = Vec::new();
        reader
            .read_until(b'\n', &mut banner)
            .await
            .map_err(|e| unavailable("failed to read AMI banner".into(), e))?;
        debug!(
            banner = String::from_utf8_lossy(&banner).trim(),
            "AMI banner received"
        );

        let login = encode_action(&[
            ("Action", "Login"),
            ("Username", &self.settings.username),
            ("Secret", self.settings.secret.expose_secret()),
            ("Events", "on"),
        ]);
        write
            .write_all(login.as_bytes())
            .await
            .map_err(|e| unavailable("failed to send AMI login".into(), e))?;

        // Events may arrive before the login response; skip them.
        let mut frames = FrameReader::new(reader);
        loop {
            let frame = frames
                .next_frame()
                .await
                .map_err(|e| unavailable("failed to read AMI login response".into(), e))?
                .ok_or_else(|| CallbridgeError::SourceUnavailable {
                    message: "AMI closed the connection during login".into(),
                    source: None,
                })?;
            let Some(response) = frame.get("Response") else {
                continue;
            };
            if response.eq_ignore_ascii_case("Success") {
                return Ok(Connection {
                    frames,
                    writer: write,
                    pings_sent: 0,
                });
            }
            return Err(CallbridgeError::SourceUnavailable {
                message: format!(
                    "AMI login rejected: {}",
                    frame.get("Message").unwrap_or(response)
                ),
                source: None,
            });
        }
    }
}

fn unavailable(message: String, e: std::io::Error) -> CallbridgeError {
    CallbridgeError::SourceUnavailable {
        message: format!("{message}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl EventSource for AmiClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> Result<(), CallbridgeError> {
        self.connection = None;
        let connection = tokio::time::timeout(self.settings.connect_timeout, self.open())
            .await
            .map_err(|_| CallbridgeError::SourceUnavailable {
                message: format!(
                    "AMI connect timed out after {}s",
                    self.settings.connect_timeout.as_secs()
                ),
                source: None,
            })??;
        self.connection = Some(connection);
        info!(source = %self.name, "AMI connected and authenticated");
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<SwitchEvent>, CallbridgeError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(CallbridgeError::SourceUnavailable {
                message: "AMI is not connected".into(),
                source: None,
            });
        };

        let mut awaiting_pong = false;
        loop {
            let read = connection.frames.next_frame();
            let outcome = match (awaiting_pong, self.settings.ping_interval) {
                (_, None) => Some(read.await),
                (true, Some(_)) => tokio::time::timeout(self.settings.ping_timeout, read)
                    .await
                    .ok(),
                (false, Some(idle)) => tokio::time::timeout(idle, read).await.ok(),
            };

            let frame = match outcome {
                Some(Ok(Some(frame))) => frame,
                Some(Ok(None)) => {
                    self.connection = None;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.connection = None;
                    return Err(unavailable("AMI read failed".into(), e));
                }
                None if awaiting_pong => {
                    warn!(source = %self.name, "AMI keepalive ping unanswered");
                    self.connection = None;
                    return Err(CallbridgeError::SourceUnavailable {
                        message: format!(
                            "AMI did not answer a ping within {}s",
                            self.settings.ping_timeout.as_secs()
                        ),
                        source: None,
                    });
                }
                None => {
                    connection.pings_sent += 1;
                    let ping = encode_action(&[
                        ("Action", "Ping"),
                        ("ActionID", &format!("callbridge-ping-{}", connection.pings_sent)),
                    ]);
                    if let Err(e) = connection.writer.write_all(ping.as_bytes()).await {
                        self.connection = None;
                        return Err(unavailable("failed to send AMI ping".into(), e));
                    }
                    trace!(source = %self.name, "AMI idle, ping sent");
                    awaiting_pong = true;
                    continue;
                }
            };

            // Any traffic proves the link is alive.
            awaiting_pong = false;
            if let Some(event) = frame.to_switch_event(Utc::now()) {
                return Ok(Some(event));
            }
            trace!(event = frame.event().unwrap_or("-"), "AMI frame ignored");
        }
    }
}

//! Version identification over the handshake protocol.
//!
//! The identifier opens a connection, sends a handshake for the current major version
//! and polls for the server's one-byte verdict. An outdated verdict closes the
//! connection, bumps the major version by one and starts over on a fresh connection.
//!
//! **Connection ownership**
//! The connection lives inside the state itself (`Connecting`/`Outdated` carry the
//! framed stream), so a transition that drops a state drops its socket. The old
//! connection is always closed before the next one is opened, and every exit path from
//! [`VersionIdentifier::identify_version`] leaves the identifier `Disconnected`.

use crate::config::IdentifyConfig;
use crate::core::handshake::{HandshakeCodec, HandshakeRequest, HandshakeResponse};
use crate::error::{constants, GamepackError, Result};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

type Connection = Framed<TcpStream, HandshakeCodec>;

/// Identifier state. Active states own the connection they are waiting on.
#[derive(Debug, Default)]
pub enum ConnectionState {
    /// No connection; initial state and the state after teardown
    #[default]
    Disconnected,
    /// Handshake sent, waiting for the response byte
    Connecting(Connection),
    /// Server rejected the major version; must reconnect with `major + 1`
    Outdated(Connection),
}

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting(_) => "connecting",
            ConnectionState::Outdated(_) => "outdated",
        }
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

/// Result of a single polling iteration.
enum Poll {
    Identified(u32),
    Pending,
}

/// Discovers the major version currently accepted by a handshake server.
#[derive(Debug)]
pub struct VersionIdentifier {
    address: String,
    connection_key: Bytes,
    major: u32,
    minor: u32,
    poll_interval: Duration,
    connect_timeout: Duration,
    default_attempts: u32,
    state: ConnectionState,
    connections_opened: u32,
}

impl VersionIdentifier {
    /// Create an identifier for `address` (`host:port`) using the default timings.
    ///
    /// # Errors
    /// Returns `GamepackError::InvalidKeyLength` if the key is not 32 bytes.
    pub fn new(address: impl Into<String>, connection_key: impl Into<Bytes>) -> Result<Self> {
        Self::with_config(&IdentifyConfig::default(), connection_key).map(|mut identifier| {
            identifier.address = address.into();
            identifier
        })
    }

    /// Create an identifier from the identification settings.
    pub fn with_config(config: &IdentifyConfig, connection_key: impl Into<Bytes>) -> Result<Self> {
        let connection_key = connection_key.into();
        // Validate the key up front rather than on the first connect
        HandshakeRequest::new(config.major_version, config.minor_version, connection_key.clone())?;

        Ok(Self {
            address: config.address(),
            connection_key,
            major: config.major_version,
            minor: config.minor_version,
            poll_interval: config.poll_interval,
            connect_timeout: config.connect_timeout,
            default_attempts: config.max_attempts,
            state: ConnectionState::Disconnected,
            connections_opened: 0,
        })
    }

    /// Override the wait for each response poll.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Number of connections opened over the lifetime of this identifier
    pub fn connections_opened(&self) -> u32 {
        self.connections_opened
    }

    /// Open a fresh connection and send the handshake for `major`/`minor`.
    ///
    /// Any existing connection is closed first.
    ///
    /// # Errors
    /// Returns `GamepackError::Connection` if the transport cannot be opened or the
    /// request cannot be written.
    #[instrument(skip(self), fields(address = %self.address))]
    pub async fn connect(&mut self, major: u32, minor: u32) -> Result<()> {
        self.close();
        self.major = major;
        self.minor = minor;

        let connection = self.open().await?;
        self.state = ConnectionState::Connecting(connection);
        Ok(())
    }

    /// Identify the version using the configured attempt budget.
    pub async fn identify_version(&mut self) -> Result<u32> {
        self.identify_version_with_cancel(self.default_attempts, &CancellationToken::new())
            .await
    }

    /// Identify the version, making at most `max_attempts` polling iterations.
    pub async fn identify_version_with_attempts(&mut self, max_attempts: u32) -> Result<u32> {
        self.identify_version_with_cancel(max_attempts, &CancellationToken::new())
            .await
    }

    /// Identify the version, aborting with `GamepackError::Cancelled` once `cancel` fires.
    ///
    /// The connection is closed on every exit path.
    ///
    /// # Errors
    /// - `UnexpectedResponse` for a status byte other than 0 or 6 (not retried)
    /// - `ExhaustedAttempts` when no valid response arrived within `max_attempts`
    /// - `Connection`/`ConnectionClosed` on transport failures
    /// - `InvalidState` if called while disconnected
    #[instrument(skip(self, cancel), fields(address = %self.address, start_major = self.major))]
    pub async fn identify_version_with_cancel(
        &mut self,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<u32> {
        let result = self.poll_loop(max_attempts, cancel).await;
        self.close();
        result
    }

    /// Close the active connection. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state.is_connected() {
            debug!(state = self.state.name(), "Closing handshake connection");
        }
        // Dropping the framed stream closes the socket
        self.state = ConnectionState::Disconnected;
    }

    async fn poll_loop(&mut self, max_attempts: u32, cancel: &CancellationToken) -> Result<u32> {
        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(GamepackError::Cancelled);
            }

            match self.step(cancel).await? {
                Poll::Identified(major) => {
                    info!(major, attempt, "Identified client version");
                    return Ok(major);
                }
                Poll::Pending => {}
            }
        }

        warn!(max_attempts, major = self.major, "Version identification exhausted");
        Err(GamepackError::ExhaustedAttempts(max_attempts))
    }

    /// Run one polling iteration, advancing the state machine.
    async fn step(&mut self, cancel: &CancellationToken) -> Result<Poll> {
        let state = std::mem::take(&mut self.state);

        let state = match state {
            ConnectionState::Connecting(mut connection) => {
                match self.await_response(&mut connection, cancel).await? {
                    None => {
                        self.state = ConnectionState::Connecting(connection);
                        return Ok(Poll::Pending);
                    }
                    Some(HandshakeResponse::Valid) => return Ok(Poll::Identified(self.major)),
                    Some(HandshakeResponse::Invalid) => {
                        debug!(major = self.major, "Server rejected major version");
                        // Falls through to the reconnect below within this iteration
                        ConnectionState::Outdated(connection)
                    }
                    Some(HandshakeResponse::Unknown(value)) => {
                        return Err(GamepackError::UnexpectedResponse(value));
                    }
                }
            }
            other => other,
        };

        match state {
            ConnectionState::Outdated(connection) => {
                drop(connection);
                let major = self
                    .major
                    .checked_add(1)
                    .ok_or_else(|| GamepackError::InvalidState("major version overflow".into()))?;
                self.connect(major, self.minor).await?;
                Ok(Poll::Pending)
            }
            ConnectionState::Disconnected => Err(GamepackError::InvalidState(
                constants::ERR_NOT_CONNECTED.into(),
            )),
            ConnectionState::Connecting(_) => Err(GamepackError::InvalidState(
                "unexpected connecting state".into(),
            )),
        }
    }

    /// Wait up to one poll interval for the response byte.
    ///
    /// Returns `Ok(None)` if nothing arrived in time; no byte is consumed in that case.
    async fn await_response(
        &self,
        connection: &mut Connection,
        cancel: &CancellationToken,
    ) -> Result<Option<HandshakeResponse>> {
        tokio::select! {
            _ = cancel.cancelled() => Err(GamepackError::Cancelled),
            polled = tokio::time::timeout(self.poll_interval, connection.next()) => match polled {
                Err(_elapsed) => Ok(None),
                Ok(Some(response)) => response.map(Some),
                Ok(None) => Err(GamepackError::ConnectionClosed),
            },
        }
    }

    async fn open(&mut self) -> Result<Connection> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| GamepackError::Connection(constants::ERR_CONNECT_TIMEOUT.into()))?
            .map_err(|e| GamepackError::Connection(format!("{}: {e}", self.address)))?;
        stream.set_nodelay(true).ok();
        self.connections_opened += 1;

        let request = HandshakeRequest::new(self.major, self.minor, self.connection_key.clone())?;
        let mut connection = Framed::new(stream, HandshakeCodec);
        connection.send(request).await.map_err(|e| match e {
            GamepackError::Io(io) => GamepackError::Connection(format!("write failed: {io}")),
            other => other,
        })?;

        debug!(major = self.major, minor = self.minor, "Sent handshake");
        Ok(connection)
    }
}

impl Drop for VersionIdentifier {
    fn drop(&mut self) {
        self.close();
    }
}

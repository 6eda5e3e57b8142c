//! Connection lifecycle: one live transport at a time, Join on open,
//! exactly one "closed" notification per dropped attempt.
//!
//! The manager holds no timers. Whoever receives the closed notification
//! decides when to start the next attempt.

use std::fmt;
use std::sync::Arc;

use crate::{
    codec::{MessageCodec, OutboundCommand},
    error::ClientError,
};

/// A bidirectional text-frame transport
///
/// Implementations queue frames; delivery happens elsewhere.
pub trait Transport: Send + Sync {
    /// Queue one text frame for delivery
    fn send_text(&self, frame: String) -> Result<(), ClientError>;

    /// Close the transport; closing twice is harmless
    fn close(&self);

    /// Whether the transport has been closed by either side
    fn is_closed(&self) -> bool;
}

/// Connection status shared by the manager and the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Identifier of one connection attempt
///
/// Transport events carry the id of the attempt that produced them so that
/// late events from a superseded attempt can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where to connect and which room to join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub room: String,
}

/// Send capability bound to one live transport
///
/// Installed into the session on identity assignment; it keeps pointing at
/// the transport it was created from even after a reconnect.
#[derive(Clone)]
pub struct OutboundSink {
    transport: Arc<dyn Transport>,
}

impl OutboundSink {
    /// Send a chat line as `ClientMessage`
    pub fn send_chat(&self, message: String) -> Result<(), ClientError> {
        let frame = MessageCodec::encode(&OutboundCommand::ClientMessage { message })?;
        tracing::debug!("Sending frame: {}", frame);
        self.transport.send_text(frame)
    }
}

impl fmt::Debug for OutboundSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundSink")
            .field("closed", &self.transport.is_closed())
            .finish()
    }
}

/// Callback invoked once per disconnect
pub type ClosedListener = Box<dyn FnMut() + Send>;

/// Owner of the single live transport handle
pub struct ConnectionManager {
    endpoint: Endpoint,
    current: AttemptId,
    transport: Option<Arc<dyn Transport>>,
    status: ConnectionStatus,
    closed_notified: bool,
    on_closed: ClosedListener,
}

impl ConnectionManager {
    /// Create a manager in the `Disconnected` state
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The websocket URL and room to join on every open
    /// * `on_closed` - The external collaborator that schedules the next attempt
    pub fn new(endpoint: Endpoint, on_closed: ClosedListener) -> Self {
        Self {
            endpoint,
            current: AttemptId(0),
            transport: None,
            status: ConnectionStatus::Disconnected,
            // Nothing to report until the first attempt starts.
            closed_notified: true,
            on_closed,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether `attempt` is the live one
    pub fn is_current(&self, attempt: AttemptId) -> bool {
        attempt == self.current
    }

    /// Start a new connection attempt, superseding any previous one
    ///
    /// A transport still held from the previous attempt is closed without
    /// notifying; its late events become stale.
    pub fn begin_attempt(&mut self) -> AttemptId {
        if let Some(previous) = self.transport.take() {
            tracing::debug!("Attempt {} superseded; closing its transport", self.current);
            previous.close();
        }

        self.current = AttemptId(self.current.0 + 1);
        self.status = ConnectionStatus::Connecting;
        self.closed_notified = false;

        tracing::info!(
            "Connecting to {} (room '{}', attempt {})",
            self.endpoint.url,
            self.endpoint.room,
            self.current
        );
        self.current
    }

    /// Adopt the transport opened by `attempt` and send `Join{room}`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - the transport is now live and Join was queued
    /// * `Ok(false)` - the attempt is stale or already closed; the transport was closed
    pub fn handle_open(
        &mut self,
        attempt: AttemptId,
        transport: Arc<dyn Transport>,
    ) -> Result<bool, ClientError> {
        if !self.is_current(attempt) || self.closed_notified {
            tracing::debug!("Ignoring open from stale attempt {}", attempt);
            transport.close();
            return Ok(false);
        }

        self.transport = Some(transport);
        self.status = ConnectionStatus::Connected;
        tracing::info!("Connected to {} (attempt {})", self.endpoint.url, attempt);

        self.send(&OutboundCommand::Join {
            room: self.endpoint.room.clone(),
        })?;
        Ok(true)
    }

    /// Handle a close of `attempt`'s transport
    ///
    /// # Returns
    ///
    /// `true` if this call reported the disconnect, `false` for stale or
    /// already-reported attempts
    pub fn handle_close(&mut self, attempt: AttemptId) -> bool {
        self.disconnect(attempt, None)
    }

    /// Handle a transport error; the transport is closed and the disconnect
    /// reported unless it already was
    pub fn handle_error(&mut self, attempt: AttemptId, reason: &str) -> bool {
        self.disconnect(attempt, Some(reason))
    }

    /// Encode and queue a command on the live transport
    pub fn send(&self, command: &OutboundCommand) -> Result<(), ClientError> {
        let transport = self.transport.as_ref().ok_or(ClientError::NotConnected)?;
        let frame = MessageCodec::encode(command)?;
        tracing::debug!("Sending frame: {}", frame);
        transport.send_text(frame)
    }

    /// A send capability bound to the live transport
    pub fn sink(&self) -> Option<OutboundSink> {
        self.transport.as_ref().map(|transport| OutboundSink {
            transport: Arc::clone(transport),
        })
    }

    /// Close the live transport without reporting a disconnect (teardown)
    pub fn shutdown(&mut self) {
        self.closed_notified = true;
        self.status = ConnectionStatus::Disconnected;
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
    }

    fn disconnect(&mut self, attempt: AttemptId, reason: Option<&str>) -> bool {
        if !self.is_current(attempt) {
            tracing::debug!("Ignoring disconnect of stale attempt {}", attempt);
            return false;
        }
        if self.closed_notified {
            return false;
        }

        match reason {
            Some(reason) => tracing::warn!("Connection error on attempt {}: {}", attempt, reason),
            None => tracing::info!("Connection closed (attempt {})", attempt),
        }

        if let Some(transport) = self.transport.take()
            && !transport.is_closed()
        {
            transport.close();
        }

        self.status = ConnectionStatus::Disconnected;
        self.closed_notified = true;
        (self.on_closed)();
        true
    }
}

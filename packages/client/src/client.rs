//! Dispatcher wiring transport events and UI events into the session core.

use std::sync::Arc;

use livechat_shared::time::Clock;

use crate::{
    codec::{InboundMessage, MessageCodec},
    connection::{AttemptId, ClosedListener, ConnectionManager, Endpoint, Transport},
    donation::{DonationIndicatorScheduler, IndicatorId},
    invoice::InvoiceRequestTracker,
    ports::UiPorts,
    session::ChatSession,
};

/// What the transport reported for one attempt
pub enum TransportEvent {
    /// The transport is open and ready to queue frames
    Opened(Arc<dyn Transport>),
    /// One inbound text frame
    Frame(String),
    Closed,
    Error(String),
}

/// What the user did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Keystroke, paste or any other edit of the chat input
    InputChanged(String),
    /// Enter key or send button
    Submit,
    /// Send this text instead of the input
    SendCustom(String),
    /// Author name clicked
    ReplyTo(String),
    /// Donate dialog confirmed; `None` takes the current chat input
    RequestInvoice { amount: u64, message: Option<String> },
    /// The payment surface was dismissed
    InvoiceDialogClosed,
    IndicatorClicked(IndicatorId),
}

/// The live chat client
///
/// Owns exactly one of each component. All methods run to completion, so
/// events are applied strictly one after another.
pub struct ChatClient {
    ui: Arc<dyn UiPorts>,
    connection: ConnectionManager,
    session: ChatSession,
    invoices: InvoiceRequestTracker,
    indicators: DonationIndicatorScheduler,
}

impl ChatClient {
    pub fn new(
        endpoint: Endpoint,
        ui: Arc<dyn UiPorts>,
        clock: Arc<dyn Clock>,
        on_closed: ClosedListener,
    ) -> Self {
        Self {
            ui,
            connection: ConnectionManager::new(endpoint, on_closed),
            session: ChatSession::new(),
            invoices: InvoiceRequestTracker::new(),
            indicators: DonationIndicatorScheduler::new(clock),
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn invoices(&self) -> &InvoiceRequestTracker {
        &self.invoices
    }

    pub fn indicators(&self) -> &DonationIndicatorScheduler {
        &self.indicators
    }

    /// Render the initial state
    pub fn start(&self) {
        self.session.start(self.ui.as_ref());
    }

    /// Begin a connection attempt; the caller opens the transport
    pub fn begin_connect(&mut self) -> AttemptId {
        let attempt = self.connection.begin_attempt();
        self.invoices.abandon();
        self.session.on_connecting(self.ui.as_ref());
        attempt
    }

    pub fn handle_transport_event(&mut self, attempt: AttemptId, event: TransportEvent) {
        match event {
            TransportEvent::Opened(transport) => {
                if let Err(e) = self.connection.handle_open(attempt, transport) {
                    tracing::warn!("Failed to join room: {}", e);
                    self.disconnected(attempt, Some(&e.to_string()));
                }
            }
            TransportEvent::Frame(frame) => {
                if !self.connection.is_current(attempt) {
                    tracing::debug!("Dropping frame from stale attempt {}", attempt);
                    return;
                }
                self.handle_frame(&frame);
            }
            TransportEvent::Closed => self.disconnected(attempt, None),
            TransportEvent::Error(reason) => self.disconnected(attempt, Some(&reason)),
        }
    }

    /// Decode and dispatch one inbound frame; bad frames are logged and dropped
    pub fn handle_frame(&mut self, frame: &str) {
        tracing::debug!("Received frame: {}", frame);
        match MessageCodec::decode(frame) {
            Ok(message) => self.dispatch(message),
            Err(e) => tracing::warn!("Dropping inbound frame: {}", e),
        }
    }

    pub fn dispatch(&mut self, message: InboundMessage) {
        let ui = self.ui.as_ref();
        match message {
            InboundMessage::AssignedUsername { username } => match self.connection.sink() {
                Some(sink) => self.session.on_assigned_username(ui, username, sink),
                None => tracing::warn!("Username '{}' assigned without a live transport", username),
            },
            InboundMessage::ServerMessage {
                from,
                message,
                extra,
            } => {
                self.session
                    .on_server_message(ui, &mut self.indicators, from, message, extra);
            }
            InboundMessage::Invoice { id } => {
                self.invoices.resolve(&id);
            }
            InboundMessage::UpdateViewers { viewers } => ui.set_viewer_count(viewers),
        }
    }

    pub fn handle_ui_event(&mut self, event: UiEvent) {
        let ui = self.ui.as_ref();
        match event {
            UiEvent::InputChanged(text) => self.session.on_input_changed(ui, text),
            UiEvent::Submit => {
                self.session.send_message(ui);
            }
            UiEvent::SendCustom(text) => {
                self.session.send_custom_message(ui, text);
            }
            UiEvent::ReplyTo(author) => self.session.reply_to(ui, &author),
            UiEvent::RequestInvoice { amount, message } => {
                let message = message.unwrap_or_else(|| self.session.message().to_string());
                self.request_invoice(amount, message);
            }
            UiEvent::InvoiceDialogClosed => self.session.clear_message(ui),
            UiEvent::IndicatorClicked(id) => {
                if !self.indicators.click(ui, id) {
                    tracing::debug!("Indicator {} is no longer active", id);
                }
            }
        }
    }

    /// Ask for an invoice and show it on the payment surface when it arrives
    pub fn request_invoice(&mut self, amount: u64, message: String) {
        let ui = Arc::clone(&self.ui);
        let result = self.invoices.request(
            &self.connection,
            amount,
            message,
            Box::new(move |id: &str| ui.show_invoice(id)),
        );
        if let Err(e) = result {
            tracing::warn!("Invoice request for {} not sent: {}", amount, e);
        }
    }

    /// Advance donation indicators to the current time
    pub fn tick(&mut self) {
        self.indicators.tick(self.ui.as_ref());
    }

    /// Page teardown: close the transport without scheduling a reconnect
    pub fn shutdown(&mut self) {
        self.connection.shutdown();
        self.invoices.abandon();
        self.session.on_disconnected(self.ui.as_ref());
    }

    fn disconnected(&mut self, attempt: AttemptId, reason: Option<&str>) {
        let reported = match reason {
            Some(reason) => self.connection.handle_error(attempt, reason),
            None => self.connection.handle_close(attempt),
        };
        if reported {
            self.invoices.abandon();
            self.session.on_disconnected(self.ui.as_ref());
        }
    }
}

//! Client execution loop with indefinite fixed-delay reconnection.
//!
//! One `select!` loop owns the [`ChatClient`]; transport tasks, UI input and
//! the indicator refresh all feed it through channels, so state changes are
//! applied one event at a time.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::{SinkExt, StreamExt};
use livechat_shared::time::{Clock, SystemClock};
use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, MissedTickBehavior},
};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::{
    client::{ChatClient, TransportEvent, UiEvent},
    config::ClientConfig,
    connection::{AttemptId, Transport},
    error::ClientError,
    ports::UiPorts,
};

type EventSender = mpsc::UnboundedSender<(AttemptId, TransportEvent)>;

/// User input delivered to the runner
#[derive(Debug)]
pub enum UiInput {
    Event(UiEvent),
    /// The events of one typed line; `handled` fires once all of them are applied
    Line {
        events: Vec<UiEvent>,
        handled: oneshot::Sender<()>,
    },
}

impl From<UiEvent> for UiInput {
    fn from(event: UiEvent) -> Self {
        UiInput::Event(event)
    }
}

enum Outgoing {
    Frame(String),
    Close,
}

/// Transport handle backed by the writer half of one websocket task
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Outgoing>,
    closed: AtomicBool,
}

impl ChannelTransport {
    fn new(tx: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self {
            tx,
            closed: AtomicBool::new(false),
        }
    }
}

impl Transport for ChannelTransport {
    fn send_text(&self, frame: String) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::TransportClosed);
        }
        self.tx
            .send(Outgoing::Frame(frame))
            .map_err(|_| ClientError::TransportClosed)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // The writer may already be gone.
            let _ = self.tx.send(Outgoing::Close);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

/// Run the chat client until the UI event source closes (page teardown)
///
/// Every disconnect schedules exactly one new attempt after
/// `config.reconnect_delay`; there is no attempt limit.
pub async fn run_client(
    config: ClientConfig,
    ui: Arc<dyn UiPorts>,
    ui_inputs: mpsc::UnboundedReceiver<UiInput>,
) -> Result<(), ClientError> {
    run_client_with_clock(config, ui, Arc::new(SystemClock), ui_inputs).await
}

/// [`run_client`] with an explicit clock for the indicator decay
pub async fn run_client_with_clock(
    config: ClientConfig,
    ui: Arc<dyn UiPorts>,
    clock: Arc<dyn Clock>,
    mut ui_inputs: mpsc::UnboundedReceiver<UiInput>,
) -> Result<(), ClientError> {
    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel::<()>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<(AttemptId, TransportEvent)>();

    let mut client = ChatClient::new(
        config.endpoint.clone(),
        ui,
        clock,
        Box::new(move || {
            let _ = closed_tx.send(());
        }),
    );
    client.start();

    let attempt = client.begin_connect();
    spawn_attempt(attempt, config.endpoint.url.clone(), event_tx.clone());

    let mut reconnect_at: Option<Instant> = None;
    let mut refresh = tokio::time::interval(config.indicator_refresh);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some((attempt, event)) = event_rx.recv() => {
                client.handle_transport_event(attempt, event);
            }
            Some(()) = closed_rx.recv() => {
                tracing::info!(
                    "Reconnecting in {} ms...",
                    config.reconnect_delay.as_millis()
                );
                reconnect_at = Some(Instant::now() + config.reconnect_delay);
            }
            _ = tokio::time::sleep_until(reconnect_at.unwrap_or_else(Instant::now)),
                if reconnect_at.is_some() =>
            {
                reconnect_at = None;
                let attempt = client.begin_connect();
                spawn_attempt(attempt, config.endpoint.url.clone(), event_tx.clone());
            }
            input = ui_inputs.recv() => match input {
                Some(UiInput::Event(event)) => client.handle_ui_event(event),
                Some(UiInput::Line { events, handled }) => {
                    for event in events {
                        client.handle_ui_event(event);
                    }
                    // The reader may have given up waiting.
                    let _ = handled.send(());
                }
                None => {
                    tracing::info!("UI closed; shutting down");
                    break;
                }
            },
            _ = refresh.tick() => client.tick(),
        }
    }

    client.shutdown();
    Ok(())
}

/// Open one websocket and pump it until either direction ends
fn spawn_attempt(attempt: AttemptId, url: String, events: EventSender) {
    tokio::spawn(async move {
        let (ws_stream, _response) = match connect_async(url.as_str()).await {
            Ok(result) => result,
            Err(e) => {
                let _ = events.send((attempt, TransportEvent::Error(e.to_string())));
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outgoing>();
        let transport: Arc<dyn Transport> = Arc::new(ChannelTransport::new(out_tx));
        if events
            .send((attempt, TransportEvent::Opened(transport)))
            .is_err()
        {
            return;
        }

        let writer = async {
            while let Some(outgoing) = out_rx.recv().await {
                match outgoing {
                    Outgoing::Frame(frame) => {
                        if let Err(e) = write.send(Message::Text(frame.into())).await {
                            tracing::warn!("WebSocket write error: {}", e);
                            break;
                        }
                    }
                    Outgoing::Close => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        };

        let reader = async {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if events
                            .send((attempt, TransportEvent::Frame(text.as_str().to_string())))
                            .is_err()
                        {
                            return;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("Server closed the connection");
                        return;
                    }
                    Ok(Message::Binary(data)) => {
                        tracing::debug!("Ignoring {} bytes of binary data", data.len());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = events.send((attempt, TransportEvent::Error(e.to_string())));
                        return;
                    }
                }
            }
        };

        tokio::select! {
            _ = writer => {}
            _ = reader => {}
        }

        // Duplicates after an error are ignored by the connection manager.
        let _ = events.send((attempt, TransportEvent::Closed));
    });
}

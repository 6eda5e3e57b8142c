//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use livechat_client::{
    ClientError,
    connection::{ConnectionStatus, Transport},
    donation::IndicatorId,
    ports::{IndicatorView, MessageId, RenderedMessage, UiPorts},
};

/// Every call the core made on the UI ports
#[derive(Debug, Clone, PartialEq)]
pub enum UiCall {
    Append(RenderedMessage),
    ScrollToBottom,
    ScrollToMessage(MessageId),
    SetInput(String),
    FocusInput,
    SendEnabled(bool),
    Status(ConnectionStatus),
    Viewers(u64),
    ShowIndicator(IndicatorView),
    UpdateIndicator(IndicatorId, f64),
    RemoveIndicator(IndicatorId),
    ShowInvoice(String),
}

/// UI double that records calls and reports a configurable scroll position
pub struct RecordingUi {
    calls: Mutex<Vec<UiCall>>,
    at_bottom: AtomicBool,
}

impl RecordingUi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            at_bottom: AtomicBool::new(true),
        })
    }

    pub fn set_at_bottom(&self, at_bottom: bool) {
        self.at_bottom.store(at_bottom, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn messages(&self) -> Vec<RenderedMessage> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::Append(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<ConnectionStatus> {
        self.calls().into_iter().rev().find_map(|call| match call {
            UiCall::Status(status) => Some(status),
            _ => None,
        })
    }

    pub fn last_send_enabled(&self) -> Option<bool> {
        self.calls().into_iter().rev().find_map(|call| match call {
            UiCall::SendEnabled(enabled) => Some(enabled),
            _ => None,
        })
    }

    pub fn invoices(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::ShowInvoice(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&UiCall) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: UiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl UiPorts for RecordingUi {
    fn append_message(&self, message: &RenderedMessage) {
        self.record(UiCall::Append(message.clone()));
    }

    fn is_scrolled_to_bottom(&self) -> bool {
        self.at_bottom.load(Ordering::SeqCst)
    }

    fn scroll_to_bottom(&self) {
        self.record(UiCall::ScrollToBottom);
    }

    fn scroll_to_message(&self, id: MessageId) {
        self.record(UiCall::ScrollToMessage(id));
    }

    fn set_input(&self, text: &str) {
        self.record(UiCall::SetInput(text.to_string()));
    }

    fn focus_input(&self) {
        self.record(UiCall::FocusInput);
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.record(UiCall::SendEnabled(enabled));
    }

    fn set_connection_indicator(&self, status: ConnectionStatus) {
        self.record(UiCall::Status(status));
    }

    fn set_viewer_count(&self, viewers: u64) {
        self.record(UiCall::Viewers(viewers));
    }

    fn show_indicator(&self, indicator: &IndicatorView) {
        self.record(UiCall::ShowIndicator(*indicator));
    }

    fn update_indicator(&self, id: IndicatorId, remaining: f64) {
        self.record(UiCall::UpdateIndicator(id, remaining));
    }

    fn remove_indicator(&self, id: IndicatorId) {
        self.record(UiCall::RemoveIndicator(id));
    }

    fn show_invoice(&self, invoice_id: &str) {
        self.record(UiCall::ShowInvoice(invoice_id.to_string()));
    }
}

/// Transport double that keeps every queued frame
#[derive(Default)]
pub struct RecordingTransport {
    frames: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    pub fn take_frames(&self) -> Vec<String> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }
}

impl Transport for RecordingTransport {
    fn send_text(&self, frame: String) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::TransportClosed);
        }
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Poll `condition` every 10 ms until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

//! Terminal front end: renders the UI ports as printed lines and turns typed
//! lines into UI events.

use std::{
    collections::HashMap,
    io::Write,
    sync::{Arc, Mutex},
    thread::JoinHandle,
};

use livechat_shared::time::{Clock, SystemClock, format_wall_clock};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{mpsc, oneshot};

use crate::{
    client::UiEvent,
    connection::ConnectionStatus,
    donation::{IndicatorId, TextTone},
    ports::{Emphasis, IndicatorView, MessageId, RenderedMessage, UiPorts},
    runner::UiInput,
};

/// Text shown in the input prompt, shared with the readline thread
pub type Draft = Arc<Mutex<String>>;

/// Message formatter for terminal display
pub struct TerminalFormatter;

impl TerminalFormatter {
    /// Format a chat entry
    ///
    /// Mentions are wrapped in `**`, own lines are prefixed with `>`, and
    /// boosted lines carry the amount and tier.
    pub fn format_message(message: &RenderedMessage, received_at: i64) -> String {
        let text = if message.bold {
            format!("**{}**", message.text)
        } else {
            message.text.clone()
        };
        let time = format_wall_clock(received_at);

        match message.emphasis {
            Emphasis::Plain => format!("[{}] {}: {}", time, message.from, text),
            Emphasis::Own => format!("[{}] > {}: {}", time, message.from, text),
            Emphasis::Donation { amount, tier } => {
                format!("[{}] {} +{} [{}]: {}", time, message.from, amount, tier, text)
            }
        }
    }

    /// Format a newly shown donation indicator
    pub fn format_indicator(indicator: &IndicatorView) -> String {
        let tone = match indicator.tier.text_tone() {
            TextTone::Light => "light",
            TextTone::Dark => "dark",
        };
        format!(
            "$ indicator #{}: {} ({}, {}% wide, {} text on {}) for {}s - /jump {}",
            indicator.id,
            indicator.amount,
            indicator.tier,
            indicator.tier.width_percent(),
            tone,
            indicator.tier.background(),
            indicator.duration_secs,
            indicator.id
        )
    }

    pub fn format_status(status: ConnectionStatus) -> String {
        match status {
            ConnectionStatus::Disconnected => "~ reconnecting...".to_string(),
            ConnectionStatus::Connecting => "~ connecting...".to_string(),
            ConnectionStatus::Connected => "~ connected".to_string(),
        }
    }

    pub fn format_viewers(viewers: u64) -> String {
        format!("~ {} watching", viewers)
    }

    pub fn format_invoice(invoice_id: &str) -> String {
        format!(
            "$ invoice {} created; pay it to boost your message, then /paid",
            invoice_id
        )
    }
}

/// Parse one typed line into the UI events it stands for
///
/// Plain text replaces the input and submits it. Commands:
/// `/reply <name>`, `/donate <amount> [message]`, `/paid`, `/jump <id>`,
/// `/say <text>`. Unknown or invalid commands yield no events.
pub fn parse_input_line(line: &str) -> Vec<UiEvent> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    if !line.starts_with('/') {
        return vec![UiEvent::InputChanged(line.to_string()), UiEvent::Submit];
    }

    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/reply" if !rest.is_empty() => vec![UiEvent::ReplyTo(rest.to_string())],
        "/say" if !rest.is_empty() => vec![UiEvent::SendCustom(rest.to_string())],
        "/paid" => vec![UiEvent::InvoiceDialogClosed],
        "/jump" => rest
            .parse::<u64>()
            .map(|id| vec![UiEvent::IndicatorClicked(IndicatorId(id))])
            .unwrap_or_default(),
        "/donate" => {
            let (amount, message) = match rest.split_once(' ') {
                Some((amount, message)) => (amount, Some(message.trim().to_string())),
                None => (rest, None),
            };
            match amount.parse::<u64>() {
                Ok(amount) if amount > 0 => vec![UiEvent::RequestInvoice { amount, message }],
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// [`UiPorts`] implementation printing to stdout
pub struct TerminalUi {
    clock: Arc<dyn Clock>,
    draft: Draft,
    history: Mutex<HashMap<MessageId, String>>,
}

impl Default for TerminalUi {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalUi {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            draft: Arc::new(Mutex::new(String::new())),
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Handle to the input text, for the readline thread
    pub fn draft(&self) -> Draft {
        Arc::clone(&self.draft)
    }

    fn print_line(&self, line: &str) {
        println!("{}", line);
        std::io::stdout().flush().ok();
    }
}

impl UiPorts for TerminalUi {
    fn append_message(&self, message: &RenderedMessage) {
        let line = TerminalFormatter::format_message(message, self.clock.now_millis());
        self.print_line(&line);
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(message.id, line);
    }

    fn is_scrolled_to_bottom(&self) -> bool {
        // A terminal always shows its newest line.
        true
    }

    fn scroll_to_bottom(&self) {}

    fn scroll_to_message(&self, id: MessageId) {
        let line = self
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned();
        if let Some(line) = line {
            self.print_line(&format!("^ {}", line));
        }
    }

    fn set_input(&self, text: &str) {
        let mut draft = self.draft.lock().unwrap_or_else(|e| e.into_inner());
        draft.clear();
        draft.push_str(text);
    }

    fn focus_input(&self) {}

    fn set_send_enabled(&self, enabled: bool) {
        tracing::trace!("Send control enabled: {}", enabled);
    }

    fn set_connection_indicator(&self, status: ConnectionStatus) {
        self.print_line(&TerminalFormatter::format_status(status));
    }

    fn set_viewer_count(&self, viewers: u64) {
        self.print_line(&TerminalFormatter::format_viewers(viewers));
    }

    fn show_indicator(&self, indicator: &IndicatorView) {
        self.print_line(&TerminalFormatter::format_indicator(indicator));
    }

    fn update_indicator(&self, _id: IndicatorId, _remaining: f64) {}

    fn remove_indicator(&self, id: IndicatorId) {
        self.print_line(&format!("$ indicator #{} expired", id));
    }

    fn show_invoice(&self, invoice_id: &str) {
        self.print_line(&TerminalFormatter::format_invoice(invoice_id));
    }
}

/// Read lines on a blocking thread and forward them as UI events
///
/// Each prompt is pre-filled with the draft as it stands after the previous
/// line was applied. The thread ends on Ctrl+C, Ctrl+D or when the runner
/// goes away; dropping the sender then shuts the client down.
pub fn spawn_input_thread(inputs: mpsc::UnboundedSender<UiInput>, draft: Draft) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            let initial = draft.lock().unwrap_or_else(|e| e.into_inner()).clone();
            match rl.readline_with_initial("> ", (initial.as_str(), "")) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str()).ok();
                    }
                    let mut events = parse_input_line(&line);
                    if events.is_empty() && line.trim().is_empty() && !initial.is_empty() {
                        // The pre-filled draft was erased.
                        events.push(UiEvent::InputChanged(String::new()));
                    }
                    if events.is_empty() {
                        continue;
                    }
                    // Wait for the events to be applied so the next prompt shows the new draft.
                    let (handled_tx, handled_rx) = oneshot::channel();
                    let input = UiInput::Line {
                        events,
                        handled: handled_tx,
                    };
                    if inputs.send(input).is_err() || handled_rx.blocking_recv().is_err() {
                        return;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    })
}

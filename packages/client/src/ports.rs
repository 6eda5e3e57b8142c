//! Narrow interface between the session core and whatever renders it.
//!
//! The core never touches a view directly; it calls these ports with plain
//! values. A browser front end, the terminal front end and test doubles all
//! implement the same trait.

use crate::{
    connection::ConnectionStatus,
    donation::{IndicatorId, Tier},
};

/// Identifier of one rendered chat entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

/// How a chat entry is decorated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Plain,
    /// Authored by this session's own username
    Own,
    /// Boosted by a donation; takes the tier's colors
    Donation { amount: u64, tier: Tier },
}

/// A chat entry ready to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub from: String,
    pub text: String,
    /// The text mentions `@<own username>`
    pub bold: bool,
    pub emphasis: Emphasis,
}

/// A donation indicator as first shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorView {
    pub id: IndicatorId,
    pub amount: u64,
    pub tier: Tier,
    pub linked_message: MessageId,
    pub duration_secs: u64,
}

/// Render/query surface consumed by the core
#[cfg_attr(test, mockall::automock)]
pub trait UiPorts: Send + Sync {
    /// Append an entry to the bottom of the chat list
    fn append_message(&self, message: &RenderedMessage);

    /// Whether the chat list is currently scrolled to its bottom
    fn is_scrolled_to_bottom(&self) -> bool;

    fn scroll_to_bottom(&self);

    /// Bring a previously appended entry into view
    fn scroll_to_message(&self, id: MessageId);

    /// Replace the text of the chat input
    fn set_input(&self, text: &str);

    fn focus_input(&self);

    fn set_send_enabled(&self, enabled: bool);

    /// Switch the send control between its connected and reconnecting looks
    fn set_connection_indicator(&self, status: ConnectionStatus);

    fn set_viewer_count(&self, viewers: u64);

    /// Show a new indicator at full width
    fn show_indicator(&self, indicator: &IndicatorView);

    /// Shrink an indicator; `remaining` goes from 1.0 down to 0.0
    fn update_indicator(&self, id: IndicatorId, remaining: f64);

    fn remove_indicator(&self, id: IndicatorId);

    /// Hand an invoice to the payment surface
    fn show_invoice(&self, invoice_id: &str);
}

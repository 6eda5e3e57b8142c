//! Correlation of the single outstanding invoice request.
//!
//! The protocol carries no request id: an `Invoice` frame answers whatever
//! request is pending. Callers keep at most one request in flight.

use std::fmt;

use crate::{codec::OutboundCommand, connection::ConnectionManager, error::ClientError};

/// Receives the invoice id once the server answers
pub type InvoiceCallback = Box<dyn FnOnce(&str) + Send>;

/// The request waiting for its `Invoice` response
struct PendingInvoiceRequest {
    amount: u64,
    on_resolved: InvoiceCallback,
}

impl fmt::Debug for PendingInvoiceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingInvoiceRequest")
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct InvoiceRequestTracker {
    pending: Option<PendingInvoiceRequest>,
}

impl InvoiceRequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `on_resolved` as the pending callback and send `GetInvoice`
    ///
    /// A request already pending is replaced; its callback is never invoked.
    /// If the command cannot be queued the slot is left empty.
    pub fn request(
        &mut self,
        connection: &ConnectionManager,
        amount: u64,
        message: String,
        on_resolved: InvoiceCallback,
    ) -> Result<(), ClientError> {
        if let Some(previous) = &self.pending {
            tracing::warn!(
                "Invoice request for {} replaces pending request for {}; the next invoice answers the newest one",
                amount,
                previous.amount
            );
        }

        self.pending = Some(PendingInvoiceRequest {
            amount,
            on_resolved,
        });

        if let Err(e) = connection.send(&OutboundCommand::GetInvoice { amount, message }) {
            self.pending = None;
            return Err(e);
        }
        Ok(())
    }

    /// Hand `invoice_id` to the pending callback and clear the slot
    ///
    /// # Returns
    ///
    /// `false` if nothing was pending; the response is dropped
    pub fn resolve(&mut self, invoice_id: &str) -> bool {
        match self.pending.take() {
            Some(request) => {
                tracing::debug!("Invoice {} resolves request for {}", invoice_id, request.amount);
                (request.on_resolved)(invoice_id);
                true
            }
            None => {
                tracing::warn!("Received invoice {} with no pending request", invoice_id);
                false
            }
        }
    }

    /// Drop the pending request without resolving it (connection lost)
    pub fn abandon(&mut self) {
        if let Some(request) = self.pending.take() {
            tracing::warn!(
                "Abandoning invoice request for {}: connection changed",
                request.amount
            );
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

//! Live chat session client for a streaming platform.
//!
//! The core keeps one websocket session alive with fixed-delay reconnects,
//! dispatches the JSON wire protocol, correlates invoice requests with their
//! responses and decays donation indicators over time. Rendering goes through
//! the [`ports::UiPorts`] trait; [`terminal`] provides a line-oriented front end.

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod donation;
pub mod error;
pub mod invoice;
pub mod ports;
pub mod runner;
pub mod session;
pub mod terminal;

pub use client::{ChatClient, TransportEvent, UiEvent};
pub use config::ClientConfig;
pub use error::{ClientError, DecodeError};
pub use runner::{UiInput, run_client};

//! Shared utilities for the live chat workspace: logger bootstrap and clocks.

pub mod logger;
pub mod time;

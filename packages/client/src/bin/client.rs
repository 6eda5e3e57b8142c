//! Terminal live chat client.
//!
//! Joins the chat of one stream, stays connected (reconnecting every second
//! after a drop) and shows donation indicators as they arrive.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin livechat-client -- --page-url "http://127.0.0.1:8080/watch?v=my-stream"
//! cargo run --bin livechat-client -- --url ws://127.0.0.1:8080/ws --room my-stream
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;

use livechat_client::{
    ClientConfig, run_client,
    terminal::{TerminalUi, spawn_input_thread},
};
use livechat_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "livechat-client")]
#[command(about = "Live stream chat client with donation indicators", long_about = None)]
struct Args {
    /// Viewer page URL; the websocket URL and room (`v` parameter) are derived from it
    #[arg(short = 'p', long)]
    page_url: Option<String>,

    /// WebSocket server URL (overrides the one derived from --page-url)
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Room to join (overrides the `v` parameter of --page-url)
    #[arg(short = 'r', long)]
    room: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let config = match ClientConfig::resolve(args.page_url.as_deref(), args.url, args.room) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    let ui = Arc::new(TerminalUi::new());
    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    let _input = spawn_input_thread(ui_tx, ui.draft());

    if let Err(e) = run_client(config, ui, ui_rx).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

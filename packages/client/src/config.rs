//! Client configuration: endpoint derivation from the viewer page URL.

use std::time::Duration;

use url::Url;

use crate::{connection::Endpoint, error::ClientError};

/// Query parameter on the viewer page carrying the room id
pub const ROOM_QUERY_PARAM: &str = "v";

/// Websocket path served next to the viewer page
pub const WS_PATH: &str = "/ws";

/// Fixed delay between a disconnect and the next attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// How often donation indicators are redrawn
pub const INDICATOR_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

impl Endpoint {
    /// Derive the websocket endpoint from a viewer page URL
    ///
    /// Both `http` and `https` pages map to `ws://`, keeping host and any
    /// explicit port. The room comes from the `v` query parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use livechat_client::connection::Endpoint;
    ///
    /// let endpoint = Endpoint::from_page_url("https://tv.example:8443/watch?v=abc").unwrap();
    /// assert_eq!(endpoint.url, "ws://tv.example:8443/ws");
    /// assert_eq!(endpoint.room, "abc");
    /// ```
    pub fn from_page_url(page_url: &str) -> Result<Self, ClientError> {
        let page = parse_page(page_url)?;
        let url = ws_url(&page)?;
        let room = room_from_page(&page)
            .ok_or_else(|| ClientError::MissingRoom(ROOM_QUERY_PARAM.to_string()))?;

        Ok(Self { url, room })
    }
}

/// Websocket URL for the page at `page_url`
///
/// Secure pages are not upgraded to `wss://`.
pub fn ws_url_for_page(page_url: &str) -> Result<String, ClientError> {
    ws_url(&parse_page(page_url)?)
}

fn ws_url(page: &Url) -> Result<String, ClientError> {
    let scheme = match page.scheme() {
        "http" | "https" => "ws://",
        other => return Err(ClientError::UnsupportedScheme(other.to_string())),
    };
    let host = page
        .host_str()
        .ok_or_else(|| ClientError::MissingHost(page.to_string()))?;
    let port = page.port().map(|port| format!(":{}", port)).unwrap_or_default();

    Ok(format!("{}{}{}{}", scheme, host, port, WS_PATH))
}

/// Value of the room query parameter, percent-decoded
fn room_from_page(page: &Url) -> Option<String> {
    page.query_pairs()
        .find(|(key, _)| key == ROOM_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
}

fn parse_page(page_url: &str) -> Result<Url, ClientError> {
    Url::parse(page_url).map_err(|e| ClientError::InvalidPageUrl {
        url: page_url.to_string(),
        reason: e.to_string(),
    })
}

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub reconnect_delay: Duration,
    pub indicator_refresh: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            reconnect_delay: RECONNECT_DELAY,
            indicator_refresh: INDICATOR_REFRESH_INTERVAL,
        }
    }

    /// Combine a page URL with explicit overrides
    ///
    /// # Arguments
    ///
    /// * `page_url` - Viewer page URL; yields both websocket URL and room
    /// * `url` - Explicit websocket URL, wins over the derived one
    /// * `room` - Explicit room, wins over the `v` parameter
    pub fn resolve(
        page_url: Option<&str>,
        url: Option<String>,
        room: Option<String>,
    ) -> Result<Self, ClientError> {
        let (derived_url, derived_room) = match page_url {
            Some(page_url) => {
                let page = parse_page(page_url)?;
                (Some(ws_url(&page)?), room_from_page(&page))
            }
            None => (None, None),
        };

        let url = url.or(derived_url).ok_or(ClientError::MissingUrl)?;
        let room = room
            .or(derived_room)
            .ok_or_else(|| ClientError::MissingRoom(ROOM_QUERY_PARAM.to_string()))?;

        Ok(Self::new(Endpoint { url, room }))
    }
}

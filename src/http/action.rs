//! The actions a [`super::ServerBlock`] route can dispatch to once a
//! request has been admitted.

use std::path::PathBuf;

/// What to do once a request has been routed.
#[derive(Debug, Clone)]
pub enum HttpAction {
    /// Hand the connection off to the WebSocket transport adapter
    /// for the upgrade handshake.
    WebsocketUpgrade,
    /// Serve a file relative to a configured document root.
    StaticFile { root: PathBuf },
    /// Answer with a fixed status/body, e.g. a health check endpoint.
    CustomResponse { status: u16, content_type: &'static str, body: Vec<u8> },
    /// Redirect to another location.
    Redirect { location: String, permanent: bool },
}

impl HttpAction {
    /// The `Connection` header value a response for this action gets.
    /// Only a successful (2xx) `CustomResponse`/`StaticFile` may keep
    /// the connection alive; anything else (including every upgrade,
    /// which hands the socket off entirely) forces a close.
    pub fn keep_alive_eligible(&self, status: u16) -> bool {
        matches!(self, HttpAction::CustomResponse { .. } | HttpAction::StaticFile { .. }) && (200..300).contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_2xx_custom_response_keeps_connection_alive() {
        let action = HttpAction::CustomResponse { status: 200, content_type: "text/plain", body: vec![] };
        assert!(action.keep_alive_eligible(200));
        assert!(!action.keep_alive_eligible(404));
    }

    #[test]
    fn websocket_upgrade_never_keeps_connection_alive_at_this_layer() {
        assert!(!HttpAction::WebsocketUpgrade.keep_alive_eligible(101));
    }
}

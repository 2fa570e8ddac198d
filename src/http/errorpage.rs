//! Renders the body for an HTTP admission failure. Kept intentionally
//! tiny: plain-text by default, with an escape hatch for a server block
//! to supply its own page per status code.

use std::collections::HashMap;

use crate::error::HttpStatus;

/// Renders a minimal but valid HTTP/1.1 response for `status`, using
/// `custom` to override the body when a matching entry exists.
pub fn render(status: HttpStatus, custom: &HashMap<u16, String>) -> (String, Vec<u8>) {
    let code = status.code();
    let reason = status.reason();
    let body = custom.get(&code).cloned().unwrap_or_else(|| default_body(status));

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        code,
        reason,
        body.len()
    );
    (head, body.into_bytes())
}

fn default_body(status: HttpStatus) -> String {
    format!("{}\n", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_body_names_the_status() {
        let (head, body) = render(HttpStatus::NotFound, &HashMap::new());
        assert!(head.starts_with("HTTP/1.1 404"));
        assert!(String::from_utf8(body).unwrap().contains("Not Found"));
    }

    #[test]
    fn custom_body_overrides_default() {
        let mut custom = HashMap::new();
        custom.insert(404, "nothing here".to_string());
        let (_, body) = render(HttpStatus::NotFound, &custom);
        assert_eq!(body, b"nothing here");
    }
}

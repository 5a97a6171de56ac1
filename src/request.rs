//! Builds the opening handshake's HTTP/1.1 GET request.

use crate::error::Error;
use crate::utils::generate_websocket_key;
use url::Url;

/// Everything the transport layer needs to open the TCP connection and
/// everything the handshake layer needs to send the request.
pub struct HandshakeRequest {
    pub bytes: Vec<u8>,
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    /// The `Sec-WebSocket-Key` value this client sent, needed later to
    /// verify the server's `Sec-WebSocket-Accept` response header.
    pub key: String,
}

/// Parses a `ws`/`wss`/`http`/`https` URL and renders the handshake request
/// bytes: the mandatory `Upgrade`/`Connection`/`Sec-WebSocket-*` headers,
/// plus an optional `Origin`, optional `Sec-WebSocket-Protocol`, and any
/// caller-supplied pass-through headers.
pub fn build_request(
    ws_url: &str,
    protocols: &[String],
    extra_headers: &[(String, String)],
    origin: Option<&str>,
) -> Result<HandshakeRequest, Error> {
    let parsed_url = Url::parse(ws_url)?;

    let (default_port, use_tls) = match parsed_url.scheme() {
        "ws" | "http" => (80, false),
        "wss" | "https" => (443, true),
        _ => return Err(Error::InvalidSchemeURL),
    };

    let host = parsed_url.host_str().ok_or(Error::URLNoHost)?.to_string();
    let port = parsed_url.port().unwrap_or(default_port);

    let host_header = match parsed_url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.clone(),
    };

    let path = match parsed_url.query() {
        Some(query) => format!("{}?{}", parsed_url.path(), query),
        None => parsed_url.path().to_string(),
    };

    let key = generate_websocket_key();

    let mut request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host_header}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n"
    );

    if let Some(origin) = origin {
        request.push_str(&format!("Origin: {origin}\r\n"));
    }

    if !protocols.is_empty() {
        request.push_str(&format!(
            "Sec-WebSocket-Protocol: {}\r\n",
            protocols.join(", ")
        ));
    }

    for (name, value) in extra_headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }

    request.push_str("\r\n");

    Ok(HandshakeRequest {
        bytes: request.into_bytes(),
        host,
        port,
        use_tls,
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ws_url_defaults_to_port_80() {
        let req = build_request("ws://example.com/socket", &[], &[], None).unwrap();
        assert_eq!(req.port, 80);
        assert!(!req.use_tls);
        assert!(String::from_utf8(req.bytes.clone())
            .unwrap()
            .starts_with("GET /socket HTTP/1.1\r\n"));
    }

    #[test]
    fn wss_url_defaults_to_port_443_and_tls() {
        let req = build_request("wss://example.com/socket", &[], &[], None).unwrap();
        assert_eq!(req.port, 443);
        assert!(req.use_tls);
    }

    #[test]
    fn explicit_port_is_respected() {
        let req = build_request("ws://example.com:9001/", &[], &[], None).unwrap();
        assert_eq!(req.port, 9001);
        let text = String::from_utf8(req.bytes).unwrap();
        assert!(text.contains("Host: example.com:9001\r\n"));
    }

    #[test]
    fn protocols_origin_and_extra_headers_are_included() {
        let req = build_request(
            "ws://example.com/",
            &["chat".to_string(), "superchat".to_string()],
            &[("X-Client".to_string(), "demo".to_string())],
            Some("https://example.com"),
        )
        .unwrap();
        let text = String::from_utf8(req.bytes).unwrap();
        assert!(text.contains("Sec-WebSocket-Protocol: chat, superchat\r\n"));
        assert!(text.contains("Origin: https://example.com\r\n"));
        assert!(text.contains("X-Client: demo\r\n"));
    }

    #[test]
    fn invalid_scheme_is_rejected() {
        assert!(matches!(
            build_request("ftp://example.com/", &[], &[], None),
            Err(Error::InvalidSchemeURL)
        ));
    }
}

//! Client-side opening handshake: send the GET request, then incrementally
//! scan the response for the end of its headers.

use crate::error::Error;
use crate::request::HandshakeRequest;
use crate::stream::SocketFlowStream;
use crate::utils::generate_websocket_accept_value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout, Duration};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const MAX_HANDSHAKE_BUFFER: usize = 16 * 1024;
const HANDSHAKE_READ_TIMEOUT: Duration = Duration::from_secs(10);

pub enum ScanOutcome {
    NeedMore,
    /// Handshake accepted; any bytes past the header terminator belong to
    /// the frame decoder.
    Success { remainder: Vec<u8> },
    Fail { status: u16 },
}

/// Looks for `\r\n\r\n` in `buffer`. If present, parses the accumulated
/// prefix as an HTTP response and checks it is a valid 101 switch with a
/// correct `Sec-WebSocket-Accept` digest for `key`.
pub fn scan(buffer: &[u8], key: &str) -> Result<ScanOutcome, Error> {
    let Some(pos) = buffer
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
    else {
        return Ok(ScanOutcome::NeedMore);
    };
    let header_end = pos + HEADER_TERMINATOR.len();

    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut response = httparse::Response::new(&mut headers);
    response.parse(&buffer[..header_end])?;

    let status = response.code.unwrap_or(0);
    if status != 101 {
        return Ok(ScanOutcome::Fail { status });
    }

    let accept_header = response
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("Sec-WebSocket-Accept"))
        .ok_or(Error::NoSecWebsocketAccept)?;
    let accept_value = String::from_utf8_lossy(accept_header.value).to_string();
    if accept_value.is_empty() {
        return Err(Error::NoSecWebsocketAccept);
    }

    let expected = generate_websocket_accept_value(key.to_string());
    if accept_value != expected {
        return Err(Error::InvalidAcceptKey);
    }

    Ok(ScanOutcome::Success {
        remainder: buffer[header_end..].to_vec(),
    })
}

/// Writes the handshake request and reads the response incrementally until
/// `scan` reports success or failure. Returns any bytes read past the
/// header terminator, which belong to the frame decoder.
pub async fn perform_handshake(
    stream: &mut SocketFlowStream,
    request: &HandshakeRequest,
) -> Result<Vec<u8>, Error> {
    stream.write_all(&request.bytes).await?;

    let mut buffer = Vec::new();
    let mut read_buf = [0u8; 4096];

    loop {
        match scan(&buffer, &request.key)? {
            ScanOutcome::Success { remainder } => return Ok(remainder),
            ScanOutcome::Fail { status } => {
                return Err(Error::NonSwitchingProtocolsStatus(status))
            }
            ScanOutcome::NeedMore => {
                if buffer.len() >= MAX_HANDSHAKE_BUFFER {
                    return Err(Error::HandshakeBufferExceeded);
                }
                let n = timeout(HANDSHAKE_READ_TIMEOUT, stream.read(&mut read_buf)).await??;
                if n == 0 {
                    return Err(Error::IncompleteHTTPResponse);
                }
                buffer.extend_from_slice(&read_buf[..n]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_for(key: &str) -> Vec<u8> {
        let accept = generate_websocket_accept_value(key.to_string());
        format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {accept}\r\n\
             \r\n"
        )
        .into_bytes()
    }

    #[test]
    fn incomplete_headers_need_more_bytes() {
        let response = response_for("dGhlIHNhbXBsZSBub25jZQ==");
        let partial = &response[..response.len() - 10];
        assert!(matches!(
            scan(partial, "dGhlIHNhbXBsZSBub25jZQ=="),
            Ok(ScanOutcome::NeedMore)
        ));
    }

    #[test]
    fn valid_accept_digest_succeeds() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let mut response = response_for(key);
        response.extend_from_slice(b"leftover-frame-bytes");
        match scan(&response, key).unwrap() {
            ScanOutcome::Success { remainder } => {
                assert_eq!(remainder, b"leftover-frame-bytes");
            }
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn mismatched_accept_digest_is_rejected() {
        let response = response_for("some-other-key");
        assert!(matches!(
            scan(&response, "dGhlIHNhbXBsZSBub25jZQ=="),
            Err(Error::InvalidAcceptKey)
        ));
    }

    #[test]
    fn non_101_status_reports_fail() {
        let response = b"HTTP/1.1 404 Not Found\r\n\r\n";
        assert!(matches!(
            scan(response, "any-key"),
            Ok(ScanOutcome::Fail { status: 404 })
        ));
    }
}

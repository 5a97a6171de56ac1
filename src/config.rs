use rustls::CipherSuite;

/// Frame/message size ceilings and other protocol-level knobs, independent
/// of transport or handshake concerns.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub max_frame_size: usize,
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig {
            max_frame_size: 16 << 20,
            max_message_size: 64 << 20,
        }
    }
}

/// TLS trust options, consulted only when the connection scheme is
/// `wss`/`https`. Left at its default, the platform root store validates
/// the peer the normal way.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Path to a PEM file of extra trusted root certificates, appended to
    /// the default `webpki-roots` trust anchors.
    pub ca_file: Option<String>,
    /// Disables chain validation and hostname matching entirely. Meant for
    /// talking to a known self-signed endpoint in development; never set
    /// this for a connection to an untrusted host.
    pub accept_self_signed: bool,
    /// When non-empty, restricts the negotiated cipher suites to this list.
    pub cipher_suites: Vec<CipherSuite>,
}

/// Client-side connection configuration: handshake headers, protocol
/// limits, and TLS trust options.
///
/// Constructed with `Default` and adjusted with builder-style setters
/// before calling `WebSocket::connect`.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub web_socket_config: WebSocketConfig,
    pub tls_config: TlsConfig,
    /// Subprotocols offered via `Sec-WebSocket-Protocol`, comma-joined.
    pub protocols: Vec<String>,
    /// Extra headers carried through to the handshake GET request verbatim.
    pub extra_headers: Vec<(String, String)>,
    /// Overrides the `Origin` header; left unset, no Origin header is sent.
    pub origin: Option<String>,
    /// Accepted for interface parity with the reference client; has no
    /// effect on a portable Tokio transport.
    pub voip_enabled: bool,
}

impl ClientConfig {
    pub fn with_protocols(mut self, protocols: Vec<String>) -> Self {
        self.protocols = protocols;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.web_socket_config.max_frame_size = max_frame_size;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.web_socket_config.max_message_size = max_message_size;
        self
    }

    pub fn with_ca_file(mut self, ca_file: impl Into<String>) -> Self {
        self.tls_config.ca_file = Some(ca_file.into());
        self
    }

    pub fn with_self_signed_allowed(mut self, allowed: bool) -> Self {
        self.tls_config.accept_self_signed = allowed;
        self
    }

    pub fn with_cipher_suites(mut self, cipher_suites: Vec<CipherSuite>) -> Self {
        self.tls_config.cipher_suites = cipher_suites;
        self
    }
}

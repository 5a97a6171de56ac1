//! The public `WebSocket` connection type: configuration, the opening
//! handshake, the reader/writer task pair, and the Created/Connecting/
//! Open/Closing/Closed state machine.

use crate::config::ClientConfig;
use crate::decoder::{DecodedEvent, FrameDecoder};
use crate::delegate::{Callbacks, WebSocketDelegate};
use crate::error::Error;
use crate::executor::{Executor, TokioExecutor};
use crate::frame::{CloseCode, Frame, OpCode};
use crate::handshake::perform_handshake;
use crate::message::Message;
use crate::request::build_request;
use crate::stream::{self, SocketFlowStream};
use crate::tls::{build_connector, TrustPredicate};
use crate::write::{WritePump, Writer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{split, AsyncReadExt, ReadHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Tracks where a connection is in its lifetime. `connect()` may only be
/// called once per `WebSocket`; reconnection is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Created,
    Connecting,
    Open,
    Closing,
    Closed,
}

struct Shared {
    callbacks: Callbacks,
    executor: Arc<dyn Executor>,
    state: Mutex<ConnectionState>,
    write_pump: Mutex<Option<WritePump>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    disconnect_fired: AtomicBool,
}

impl Shared {
    async fn set_state(&self, state: ConnectionState) {
        *self.state.lock().await = state;
    }

    /// Fires `on_disconnect` exactly once no matter how many code paths
    /// (EOF, protocol error, local `disconnect()`, forced timeout) race to
    /// close the connection.
    async fn fire_disconnect(self: &Arc<Self>, error: Option<Error>) {
        if self
            .disconnect_fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.set_state(ConnectionState::Closed).await;
        *self.write_pump.lock().await = None;

        let shared = self.clone();
        shared.executor.execute(Box::pin(async move {
            shared.callbacks.notify_disconnect(error.as_ref());
        }));
    }

    fn notify_text(self: &Arc<Self>, text: String) {
        let shared = self.clone();
        shared
            .executor
            .execute(Box::pin(async move { shared.callbacks.notify_text(&text) }));
    }

    fn notify_data(self: &Arc<Self>, data: Vec<u8>) {
        let shared = self.clone();
        shared
            .executor
            .execute(Box::pin(async move { shared.callbacks.notify_data(&data) }));
    }

    fn notify_pong(self: &Arc<Self>, payload: Vec<u8>) {
        let shared = self.clone();
        shared
            .executor
            .execute(Box::pin(async move { shared.callbacks.notify_pong(&payload) }));
    }

    fn notify_connect(self: &Arc<Self>) {
        let shared = self.clone();
        shared
            .executor
            .execute(Box::pin(async move { shared.callbacks.notify_connect() }));
    }
}

/// A client-side WebSocket connection.
///
/// Construct with [`WebSocket::new`], adjust configuration, then call
/// [`WebSocket::connect`]. Inbound messages and lifecycle events are
/// delivered through whatever delegate or closures were set before
/// connecting; outbound messages go through `write_text`/`write_binary`/
/// `write_ping`.
pub struct WebSocket {
    url: String,
    config: ClientConfig,
    callbacks: Callbacks,
    executor: Arc<dyn Executor>,
    trust_predicate: Option<TrustPredicate>,
    shared: Option<Arc<Shared>>,
}

impl WebSocket {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: ClientConfig::default(),
            callbacks: Callbacks::default(),
            executor: Arc::new(TokioExecutor::new()),
            trust_predicate: None,
            shared: None,
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_executor(&mut self, executor: Arc<dyn Executor>) -> &mut Self {
        self.executor = executor;
        self
    }

    pub fn set_trust_predicate(&mut self, predicate: TrustPredicate) -> &mut Self {
        self.trust_predicate = Some(predicate);
        self
    }

    pub fn set_delegate(&mut self, delegate: Box<dyn WebSocketDelegate>) -> &mut Self {
        self.callbacks.delegate = Some(delegate);
        self
    }

    pub fn on_connect(&mut self, f: impl Fn() + Send + Sync + 'static) -> &mut Self {
        self.callbacks.on_connect = Some(Box::new(f));
        self
    }

    pub fn on_disconnect(&mut self, f: impl Fn(Option<&Error>) + Send + Sync + 'static) -> &mut Self {
        self.callbacks.on_disconnect = Some(Box::new(f));
        self
    }

    pub fn on_text(&mut self, f: impl Fn(&str) + Send + Sync + 'static) -> &mut Self {
        self.callbacks.on_text = Some(Box::new(f));
        self
    }

    pub fn on_data(&mut self, f: impl Fn(&[u8]) + Send + Sync + 'static) -> &mut Self {
        self.callbacks.on_data = Some(Box::new(f));
        self
    }

    pub fn on_pong(&mut self, f: impl Fn(&[u8]) + Send + Sync + 'static) -> &mut Self {
        self.callbacks.on_pong = Some(Box::new(f));
        self
    }

    pub async fn state(&self) -> ConnectionState {
        match &self.shared {
            Some(shared) => *shared.state.lock().await,
            None => ConnectionState::Created,
        }
    }

    /// Performs the TCP (and optional TLS) connect, the opening handshake,
    /// and spawns the reader/writer tasks. Resolves once the handshake is
    /// accepted; `on_connect` fires right after.
    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.shared.is_some() {
            return Err(Error::NotConnected);
        }

        let request = build_request(
            &self.url,
            &self.config.protocols,
            &self.config.extra_headers,
            self.config.origin.as_deref(),
        )?;

        log::debug!("connecting to {}:{} (tls={})", request.host, request.port, request.use_tls);

        let connector = if request.use_tls {
            Some(build_connector(
                &self.config.tls_config,
                self.trust_predicate.clone(),
            )?)
        } else {
            None
        };

        let server_name = pki_types::ServerName::try_from(request.host.clone())?;

        let mut transport = stream::connect(
            &request.host,
            request.port,
            request.use_tls,
            connector.as_ref(),
            server_name,
        )
        .await?;

        let remainder = perform_handshake(&mut transport, &request).await?;
        log::debug!("handshake accepted for {}", self.url);

        let (read_half, write_half) = split(transport);
        let writer = Writer::new(write_half);
        let write_pump = WritePump::spawn(writer);

        let shared = Arc::new(Shared {
            callbacks: std::mem::take(&mut self.callbacks),
            executor: self.executor.clone(),
            state: Mutex::new(ConnectionState::Connecting),
            write_pump: Mutex::new(Some(write_pump)),
            reader_task: Mutex::new(None),
            disconnect_fired: AtomicBool::new(false),
        });

        // `on_connect` must be queued before the reader task exists at all:
        // once spawned, it may decode a complete message out of `remainder`
        // and queue a callback of its own, and that must never land ahead of
        // `on_connect` in the callback queue.
        shared.set_state(ConnectionState::Open).await;
        shared.notify_connect();

        let reader_shared = shared.clone();
        let max_frame_size = self.config.web_socket_config.max_frame_size;
        let max_message_size = self.config.web_socket_config.max_message_size;

        let reader_task = tokio::spawn(async move {
            run_reader(reader_shared, read_half, remainder, max_frame_size, max_message_size).await;
        });
        *shared.reader_task.lock().await = Some(reader_task);

        self.shared = Some(shared);
        Ok(())
    }

    fn shared(&self) -> Result<&Arc<Shared>, Error> {
        self.shared.as_ref().ok_or(Error::NotConnected)
    }

    async fn send_frame(&self, frame: Frame) -> Result<(), Error> {
        let shared = self.shared()?;
        if *shared.state.lock().await != ConnectionState::Open {
            return Err(Error::NotConnected);
        }
        let pump = shared.write_pump.lock().await;
        match pump.as_ref() {
            Some(pump) => pump.send(frame).await,
            None => Err(Error::NotConnected),
        }
    }

    pub async fn write_text(&self, text: impl Into<String>) -> Result<(), Error> {
        let max_frame_size = self.frame_size_limit().await?;
        for frame in Message::Text(text.into()).to_frames(max_frame_size) {
            self.send_frame(frame).await?;
        }
        Ok(())
    }

    pub async fn write_binary(&self, data: Vec<u8>) -> Result<(), Error> {
        let max_frame_size = self.frame_size_limit().await?;
        for frame in Message::Binary(data).to_frames(max_frame_size) {
            self.send_frame(frame).await?;
        }
        Ok(())
    }

    pub async fn write_ping(&self, payload: Vec<u8>) -> Result<(), Error> {
        self.send_frame(Frame::new(true, OpCode::Ping, payload)).await
    }

    async fn frame_size_limit(&self) -> Result<usize, Error> {
        self.shared()?;
        Ok(self.config.web_socket_config.max_frame_size)
    }

    /// `timeout = None`: send a close frame and let the server drive EOF.
    /// `timeout = Some(d)` with `d > 0`: send a close frame and force the
    /// transport closed after `d` if the server hasn't already.
    /// `timeout = Some(d)` with `d == 0`: force the transport closed
    /// immediately without sending a close frame.
    pub async fn disconnect(&self, timeout: Option<Duration>) -> Result<(), Error> {
        let shared = match &self.shared {
            Some(shared) => shared.clone(),
            None => return Ok(()),
        };

        if *shared.state.lock().await == ConnectionState::Closed {
            return Ok(());
        }
        shared.set_state(ConnectionState::Closing).await;

        match timeout {
            Some(d) if d.is_zero() => {
                if let Some(task) = shared.reader_task.lock().await.take() {
                    task.abort();
                }
                shared.fire_disconnect(None).await;
                return Ok(());
            }
            _ => {
                let pump = shared.write_pump.lock().await;
                if let Some(pump) = pump.as_ref() {
                    let _ = pump
                        .send(Frame::new(
                            true,
                            OpCode::Close,
                            CloseCode::Normal.as_u16().to_be_bytes().to_vec(),
                        ))
                        .await;
                }
            }
        }

        if let Some(d) = timeout {
            if !d.is_zero() {
                let shared = shared.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(d).await;
                    if let Some(task) = shared.reader_task.lock().await.take() {
                        task.abort();
                    }
                    shared.fire_disconnect(None).await;
                });
            }
        }

        Ok(())
    }
}

async fn run_reader(
    shared: Arc<Shared>,
    mut read_half: ReadHalf<SocketFlowStream>,
    initial: Vec<u8>,
    max_frame_size: usize,
    max_message_size: usize,
) {
    let mut decoder = FrameDecoder::new(max_frame_size, max_message_size);

    if !initial.is_empty() {
        match decoder.decode(&initial) {
            Ok(events) => {
                if dispatch(&shared, events).await {
                    shared.fire_disconnect(None).await;
                    return;
                }
            }
            Err(err) => {
                shared.fire_disconnect(Some(err)).await;
                return;
            }
        }
    }

    let mut buf = [0u8; 8192];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                shared.fire_disconnect(None).await;
                break;
            }
            Ok(n) => match decoder.decode(&buf[..n]) {
                Ok(events) => {
                    if dispatch(&shared, events).await {
                        shared.fire_disconnect(None).await;
                        break;
                    }
                }
                Err(err) => {
                    send_protocol_error_close(&shared, &err).await;
                    shared.fire_disconnect(Some(err)).await;
                    break;
                }
            },
            Err(err) => {
                shared.fire_disconnect(Some(err.into())).await;
                break;
            }
        }
    }
}

/// Dispatches a batch of decoded events to callbacks and to the writer
/// (for auto-replied PONG/CLOSE frames). Returns `true` if a CLOSE frame
/// was observed and the reader loop should stop.
async fn dispatch(shared: &Arc<Shared>, events: Vec<DecodedEvent>) -> bool {
    for event in events {
        match event {
            DecodedEvent::Message(Message::Text(text)) => shared.notify_text(text),
            DecodedEvent::Message(Message::Binary(data)) => shared.notify_data(data),
            DecodedEvent::Pong(payload) => shared.notify_pong(payload),
            DecodedEvent::Ping(payload) => {
                let pump = shared.write_pump.lock().await;
                if let Some(pump) = pump.as_ref() {
                    let _ = pump.send(Frame::new(true, OpCode::Pong, payload)).await;
                }
            }
            DecodedEvent::Close { code, reason } => {
                log::debug!("received close frame: {code:?} {reason}");
                let pump = shared.write_pump.lock().await;
                if let Some(pump) = pump.as_ref() {
                    let _ = pump
                        .send(Frame::new(true, OpCode::Close, code.as_u16().to_be_bytes().to_vec()))
                        .await;
                }
                return true;
            }
        }
    }
    false
}

async fn send_protocol_error_close(shared: &Arc<Shared>, err: &Error) {
    let pump = shared.write_pump.lock().await;
    if let Some(pump) = pump.as_ref() {
        let _ = pump
            .send(Frame::new(
                true,
                OpCode::Close,
                err.close_code().as_u16().to_be_bytes().to_vec(),
            ))
            .await;
    }
}

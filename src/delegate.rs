//! Callback surface notified as the connection progresses.
//!
//! Two equally-supported ways to receive notifications, mirroring the
//! reference client's delegate-or-closure duality: implement
//! [`WebSocketDelegate`] and hand an instance to the connection, or set
//! individual closures (`on_connect`, `on_text`, ...) directly. Both paths
//! feed the same dispatch in `connection.rs`; a connection with no delegate
//! and no closures set simply drops events on the floor.

use crate::error::Error;

/// Default methods are no-ops, so implementors only override what they
/// care about.
pub trait WebSocketDelegate: Send + Sync {
    fn on_connect(&self) {}
    fn on_disconnect(&self, _error: Option<&Error>) {}
    fn on_text(&self, _text: &str) {}
    fn on_data(&self, _data: &[u8]) {}
    fn on_pong(&self, _payload: &[u8]) {}
}

pub type ConnectClosure = Box<dyn Fn() + Send + Sync>;
pub type DisconnectClosure = Box<dyn Fn(Option<&Error>) + Send + Sync>;
pub type TextClosure = Box<dyn Fn(&str) + Send + Sync>;
pub type DataClosure = Box<dyn Fn(&[u8]) + Send + Sync>;
pub type PongClosure = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Holds an optional delegate plus optional per-event closures. A closure,
/// when set, is invoked in addition to the delegate for that event.
#[derive(Default)]
pub struct Callbacks {
    pub delegate: Option<Box<dyn WebSocketDelegate>>,
    pub on_connect: Option<ConnectClosure>,
    pub on_disconnect: Option<DisconnectClosure>,
    pub on_text: Option<TextClosure>,
    pub on_data: Option<DataClosure>,
    pub on_pong: Option<PongClosure>,
}

impl Callbacks {
    pub fn notify_connect(&self) {
        if let Some(delegate) = &self.delegate {
            delegate.on_connect();
        }
        if let Some(closure) = &self.on_connect {
            closure();
        }
    }

    pub fn notify_disconnect(&self, error: Option<&Error>) {
        if let Some(delegate) = &self.delegate {
            delegate.on_disconnect(error);
        }
        if let Some(closure) = &self.on_disconnect {
            closure(error);
        }
    }

    pub fn notify_text(&self, text: &str) {
        if let Some(delegate) = &self.delegate {
            delegate.on_text(text);
        }
        if let Some(closure) = &self.on_text {
            closure(text);
        }
    }

    pub fn notify_data(&self, data: &[u8]) {
        if let Some(delegate) = &self.delegate {
            delegate.on_data(data);
        }
        if let Some(closure) = &self.on_data {
            closure(data);
        }
    }

    pub fn notify_pong(&self, payload: &[u8]) {
        if let Some(delegate) = &self.delegate {
            delegate.on_pong(payload);
        }
        if let Some(closure) = &self.on_pong {
            closure(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn closure_and_delegate_both_fire() {
        struct CountingDelegate(Arc<AtomicUsize>);
        impl WebSocketDelegate for CountingDelegate {
            fn on_text(&self, _text: &str) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let delegate_hits = Arc::new(AtomicUsize::new(0));
        let closure_hits = Arc::new(AtomicUsize::new(0));
        let closure_hits_clone = closure_hits.clone();

        let callbacks = Callbacks {
            delegate: Some(Box::new(CountingDelegate(delegate_hits.clone()))),
            on_text: Some(Box::new(move |_text| {
                closure_hits_clone.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };

        callbacks.notify_text("hello");
        assert_eq!(delegate_hits.load(Ordering::SeqCst), 1);
        assert_eq!(closure_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_callbacks_set_is_a_silent_no_op() {
        let callbacks = Callbacks::default();
        callbacks.notify_connect();
        callbacks.notify_text("hi");
    }
}

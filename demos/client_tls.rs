use log::*;
use rand::distr::Alphanumeric;
use rand::{rng, Rng};
use socket_flow::config::ClientConfig;
use socket_flow::connection::WebSocket;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

#[tokio::main]
async fn main() {
    env_logger::init();

    let addr = "wss://localhost:9002";
    let received = Arc::new(AtomicUsize::new(0));

    let config = ClientConfig::default().with_ca_file("ca.crt");
    let mut ws = WebSocket::new(addr).with_config(config);

    let received_clone = received.clone();
    ws.on_text(move |text| {
        info!("Received message: {text}");
        received_clone.fetch_add(1, Ordering::SeqCst);
    });
    ws.on_disconnect(|error| {
        if let Some(err) = error {
            error!("Received error from the stream: {err}");
        }
    });

    if let Err(err) = ws.connect().await {
        error!("Error when performing handshake: {err}");
        return;
    }

    let mut ticker = interval(Duration::from_secs(5));
    loop {
        ticker.tick().await;

        let random_string = generate_random_string();
        if ws.write_text(random_string).await.is_err() {
            eprintln!("Failed to send message");
            break;
        }

        if received.load(Ordering::SeqCst) >= 3 {
            if ws.disconnect(None).await.is_err() {
                error!("Error occurred when closing connection");
            }
            break;
        }
    }
}

fn generate_random_string() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(30)
        .map(char::from)
        .collect()
}

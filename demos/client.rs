use rand::distr::Alphanumeric;
use rand::{rng, Rng};
use socket_flow::connection::WebSocket;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

#[tokio::main]
async fn main() {
    let addr = "ws://127.0.0.1:9002";
    let received = Arc::new(AtomicUsize::new(0));

    let mut ws = WebSocket::new(addr);

    let received_clone = received.clone();
    ws.on_text(move |text| {
        println!("Received message: {text}");
        received_clone.fetch_add(1, Ordering::SeqCst);
    });
    ws.on_disconnect(|error| match error {
        Some(err) => eprintln!("Received error from the stream: {err}"),
        None => println!("Connection closed"),
    });

    if let Err(err) = ws.connect().await {
        eprintln!("Error when performing handshake: {err}");
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

        // close the connection once 3 messages have round-tripped
        if received.load(Ordering::SeqCst) >= 3 {
            if ws.disconnect(None).await.is_err() {
                eprintln!("Error occurred when closing connection");
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

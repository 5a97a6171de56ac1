use log::*;
use rand::distr::Alphanumeric;
use rand::{rng, Rng};
use socket_flow::connection::WebSocket;

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut ws = WebSocket::new("ws://127.0.0.1:9002");
    ws.on_disconnect(|error| {
        if let Some(err) = error {
            error!("Received error from the stream: {err}");
        }
    });

    if let Err(err) = ws.connect().await {
        error!("Error when performing handshake: {err}");
        return;
    }

    let my_random_string = generate_random_string();
    info!("Sending random string: {my_random_string}");

    // longer than the configured max frame size, so the client fragments it
    // across CONTINUATION frames automatically.
    if ws.write_text(my_random_string).await.is_err() {
        error!("Error occurred when sending data in chunks");
    }

    ws.disconnect(None).await.unwrap();
}

fn generate_random_string() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(30)
        .map(char::from)
        .collect()
}

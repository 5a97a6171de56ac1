use socket_flow::connection::WebSocket;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::Notify;

#[tokio::main]
async fn main() {
    let url = "ws://127.0.0.1:9002";
    let connection_count = 100; // Number of WebSocket clients
    let message_count = 1000; // Messages per client
    let message_size = 16384; // Size of each message in bytes

    let (tx, mut rx) = mpsc::unbounded_channel();

    for _ in 0..connection_count {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut ws = WebSocket::new(url);
            let received = Arc::new(AtomicUsize::new(0));
            let notify = Arc::new(Notify::new());

            let received_clone = received.clone();
            let notify_clone = notify.clone();
            ws.on_data(move |_data| {
                received_clone.fetch_add(1, Ordering::SeqCst);
                notify_clone.notify_one();
            });

            ws.connect().await.unwrap();

            let payload = vec![b'a'; message_size];
            let start = Instant::now();

            for i in 0..message_count {
                ws.write_binary(payload.clone()).await.unwrap();
                while received.load(Ordering::SeqCst) <= i {
                    notify.notified().await;
                }
            }

            let duration = start.elapsed();
            tx.send(duration).unwrap();
        });
    }

    drop(tx); // Close the channel

    let mut total_duration = Duration::new(0, 0);
    while let Some(duration) = rx.recv().await {
        total_duration += duration;
    }

    let avg_latency = total_duration / (connection_count as u32 * message_count as u32);
    println!("Average Latency: {avg_latency:?}");
}

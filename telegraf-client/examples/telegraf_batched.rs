use std::{thread, time::Duration};

use telegraf_client::TelegrafClient;

fn main() {
    tracing_subscriber::fmt::init();

    let client = TelegrafClient::builder()
        .with_remote_address("localhost:8094")
        .expect("failed to resolve remote address")
        .with_tag("env", "example")
        .with_batched_delivery()
        .with_batch_size(16)
        .build()
        .expect("failed to build client");

    // Recording never blocks here: points queue up and the background delivery thread
    // flushes them in newline-joined batches.
    for i in 0..100i64 {
        client
            .record("worker", [("processed", i), ("backlog", 100 - i)], &[("shard", "a")], 1.0)
            .expect("invalid point");
        thread::sleep(Duration::from_millis(10));
    }

    // Stops the delivery thread; anything still queued at this instant is dropped, which is
    // the same best-effort contract every other part of the pipeline follows.
    client.shutdown();
}

use telegraf_client::TelegrafClient;

fn main() {
    tracing_subscriber::fmt::init();

    let client = TelegrafClient::builder()
        .with_remote_address("localhost:8094")
        .expect("failed to resolve remote address")
        .with_tag("env", "example")
        .build()
        .expect("failed to build client");

    // Every recording call encodes and transmits inline, so by the time the loop finishes,
    // everything has hit the socket.
    for i in 0..10 {
        client
            .record_count("requests", 1, &[("handler", "index")], 1.0)
            .expect("invalid point");
        client.record_value("queue_depth", i, &[], 1.0).expect("invalid point");
    }
}

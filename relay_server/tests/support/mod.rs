// Shared primitives for one-time relay bootstrapping across integration tests.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::{
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    time::Duration,
};
use sync_protocol::{ParticipantId, PositionSample, StateTable, decode_table, encode_sample};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

// host:port of the relay shared by every test in this binary.
static SERVER_ADDR: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// Ensure the relay is running and return its host:port.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_addr = Arc::new(OnceLock::<String>::new());
        let published_addr_thread = Arc::clone(&published_addr);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_addr_thread.set(addr.to_string());
                relay_server::run(listener).await.expect("relay failed");
            });
        });
        wait_for_server_addr_and_readiness(published_addr);
    });

    SERVER_ADDR
        .get()
        .expect("server addr should be initialized")
        .as_str()
}

fn wait_for_server_addr_and_readiness(published_addr: Arc<OnceLock<String>>) {
    // Poll until the server thread publishes the bound address.
    let addr = loop {
        if let Some(addr) = published_addr.get() {
            break addr.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_ADDR.set(addr.clone());

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("relay did not become ready in time");
}

pub fn ws_url() -> String {
    format!("ws://{}/ws", ensure_server())
}

pub fn http_url() -> String {
    format!("http://{}", ensure_server())
}

pub async fn connect() -> Ws {
    let (ws, _response) = connect_async(ws_url()).await.expect("websocket connect");
    ws
}

pub async fn send_sample(ws: &mut Ws, id: &ParticipantId, sample: PositionSample) {
    let payload = encode_sample(id, &sample).expect("sample should encode");
    ws.send(Message::text(payload)).await.expect("send sample");
}

pub async fn send_raw(ws: &mut Ws, payload: &str) {
    ws.send(Message::text(payload.to_string()))
        .await
        .expect("send raw payload");
}

// Read tables until one satisfies `accept`; other tests share the relay, so unrelated
// broadcasts may arrive in between.
pub async fn next_table_where(ws: &mut Ws, accept: impl Fn(&StateTable) -> bool) -> StateTable {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            let msg = ws
                .next()
                .await
                .expect("socket closed while waiting for table")
                .expect("websocket error");
            let Message::Text(text) = msg else {
                continue;
            };
            let table = decode_table(text.as_str()).expect("relay sent a malformed table");
            if accept(&table) {
                return table;
            }
        }
    })
    .await
    .expect("timed out waiting for table")
}

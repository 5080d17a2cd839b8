//! End-to-end tests over real sockets: REST calls drive the session
//! service while WebSocket clients observe the pushed events.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use obmen_gateway::app_state::AppState;
use obmen_gateway::build_app;
use obmen_gateway::domain::{Directory, UserId};
use obmen_gateway::persistence::{MemoryStore, Store};

const TIMEOUT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    base: String,
    ws_base: String,
    directory: Arc<Directory>,
    http: reqwest::Client,
}

/// Boots the full app on an ephemeral port with an in-memory store.
async fn spawn_server() -> TestServer {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = AppState::new(store, 1024);
    let directory = Arc::clone(&state.directory);
    let app = build_app(state);

    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        base: format!("http://{addr}/api/v1"),
        ws_base: format!("ws://{addr}/ws"),
        directory,
        http: reqwest::Client::new(),
    }
}

impl TestServer {
    async fn post(&self, path: &str, body: Option<Value>) -> (u16, Value) {
        let mut request = self.http.post(format!("{}{path}", self.base));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let Ok(response) = request.send().await else {
            panic!("POST {path} failed");
        };
        let status = response.status().as_u16();
        let Ok(json) = response.json::<Value>().await else {
            panic!("POST {path} returned non-JSON");
        };
        (status, json)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let Ok(response) = self.http.get(format!("{}{path}", self.base)).send().await else {
            panic!("GET {path} failed");
        };
        let status = response.status().as_u16();
        let Ok(json) = response.json::<Value>().await else {
            panic!("GET {path} returned non-JSON");
        };
        (status, json)
    }

    async fn create_user(&self) -> i64 {
        let (status, user) = self.post("/user/create", None).await;
        assert_eq!(status, 201);
        let Some(id) = user["user_id"].as_i64() else {
            panic!("user without id: {user}");
        };
        id
    }

    /// Registers two currencies and an offer by `creator`.
    async fn seed_offer(&self, creator: i64) -> i64 {
        let (status, currencies) = self
            .post(
                "/currency/add",
                Some(json!({"data": [
                    {"name": "dollar", "capitalName": "USD", "unicodeSymbol": "$", "colorHex": "#00aa00"},
                    {"name": "ruble", "capitalName": "RUB", "unicodeSymbol": "₽", "colorHex": "#aa0000"}
                ]})),
            )
            .await;
        assert_eq!(status, 201, "{currencies}");
        let (status, offer) = self
            .post(
                "/offer/create",
                Some(json!({
                    "creatorId": creator,
                    "fromCurrencyId": currencies[0]["currencyId"],
                    "toCurrencyId": currencies[1]["currencyId"],
                    "fromAmount": 100.0,
                    "toAmount": 9000.0,
                    "exchangeRate": 90.0
                })),
            )
            .await;
        assert_eq!(status, 201, "{offer}");
        let Some(id) = offer["offerId"].as_i64() else {
            panic!("offer without id: {offer}");
        };
        id
    }

    /// Opens a socket for `user_id` and waits until it is registered.
    async fn connect(&self, user_id: i64) -> WsStream {
        let url = format!("{}/{user_id}", self.ws_base);
        let Ok((ws, _)) = connect_async(url.as_str()).await else {
            panic!("ws connect to {url} failed");
        };
        self.wait_for(user_id, true).await;
        ws
    }

    async fn wait_for(&self, user_id: i64, connected: bool) {
        let user_id = UserId::new(user_id);
        let waited = timeout(TIMEOUT, async {
            while self.directory.lookup(user_id).await.is_some() != connected {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "user {user_id} never reached connected={connected}");
    }
}

async fn next_event(ws: &mut WsStream) -> Value {
    loop {
        let Ok(Some(Ok(frame))) = timeout(TIMEOUT, ws.next()).await else {
            panic!("no event within {TIMEOUT:?}");
        };
        if let Message::Text(text) = frame {
            let Ok(json) = serde_json::from_str(text.as_str()) else {
                panic!("event is not JSON: {text}");
            };
            return json;
        }
    }
}

async fn assert_silent(ws: &mut WsStream) {
    let frame = timeout(QUIET, ws.next()).await;
    assert!(frame.is_err(), "unexpected frame: {frame:?}");
}

/// Waits for the server to close `ws`, failing if an event arrives first.
async fn wait_closed(ws: &mut WsStream) {
    loop {
        let Ok(frame) = timeout(TIMEOUT, ws.next()).await else {
            panic!("socket still open after {TIMEOUT:?}");
        };
        match frame {
            Some(Ok(Message::Text(text))) => panic!("closed socket received {text}"),
            Some(Ok(Message::Close(_)) | Err(_)) | None => return,
            Some(Ok(_)) => {}
        }
    }
}

fn session_request(owner: i64, users: &[i64], offer: i64, text: &str) -> Value {
    json!({
        "ownerId": owner,
        "userIds": users,
        "offerId": offer,
        "initialMessage": {
            "senderId": owner,
            "messageDate": "2024-01-01 10:00:00",
            "messageText": text
        }
    })
}

#[tokio::test]
async fn session_lifecycle_reaches_connected_participants() {
    let server = spawn_server().await;
    let owner = server.create_user().await;
    let guest = server.create_user().await;
    let offline = server.create_user().await;
    let offer = server.seed_offer(owner).await;

    let mut owner_ws = server.connect(owner).await;
    let mut guest_ws = server.connect(guest).await;

    let (status, created) = server
        .post(
            "/session/create",
            Some(session_request(owner, &[owner, guest, offline], offer, "hello")),
        )
        .await;
    assert_eq!(status, 201, "{created}");
    assert_eq!(created["sessionType"], "outcoming");
    let session_id = created["sessionId"].clone();

    // The owner is not told about its own session, only about the message.
    let event = next_event(&mut owner_ws).await;
    assert_eq!(event["responseType"], "messageSent");
    assert_eq!(event["message"]["messageText"], "hello");

    let event = next_event(&mut guest_ws).await;
    assert_eq!(event["responseType"], "sessionCreated");
    assert_eq!(event["session"]["sessionType"], "incoming");
    assert_eq!(event["session"]["sessionState"], 1);
    let others: Vec<i64> = event["session"]["sessionUsers"]
        .as_array()
        .map(|users| users.iter().filter_map(|u| u["user_id"].as_i64()).collect())
        .unwrap_or_default();
    assert_eq!(others, vec![owner, offline]);
    let event = next_event(&mut guest_ws).await;
    assert_eq!(event["responseType"], "messageSent");

    let (status, _) = server
        .post(
            "/session/sendMessage",
            Some(json!({
                "senderId": guest,
                "sessionId": session_id,
                "messageDate": "2024-01-01 10:05:00",
                "messageText": "deal?"
            })),
        )
        .await;
    assert_eq!(status, 201);
    for ws in [&mut owner_ws, &mut guest_ws] {
        let event = next_event(ws).await;
        assert_eq!(event["responseType"], "messageSent");
        assert_eq!(event["message"]["messageSender"]["user_id"], guest);
        assert_eq!(event["message"]["messageDate"], "2024-01-01 10:05:00");
    }

    let (status, body) = server
        .post(&format!("/session/close?sessionId={session_id}"), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Session closed");
    for ws in [&mut owner_ws, &mut guest_ws] {
        let event = next_event(ws).await;
        assert_eq!(event["responseType"], "sessionClosed");
        assert_eq!(event["session"]["sessionState"], 0);
    }

    let (status, body) = server
        .post("/session/close", Some(json!({"sessionId": session_id})))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Session already closed");
    assert_silent(&mut owner_ws).await;
    assert_silent(&mut guest_ws).await;

    // The offline participant still sees the full history.
    let (status, listed) = server.get(&format!("/session/list?userId={offline}")).await;
    assert_eq!(status, 200);
    assert_eq!(listed[0]["sessionId"], session_id);
    assert_eq!(listed[0]["sessionMessages"].as_array().map(Vec::len), Some(2));
    assert_eq!(listed[0]["sessionLastMessage"], "2024-01-01 10:05:00");
}

#[tokio::test]
async fn newer_connection_supersedes_older_one() {
    let server = spawn_server().await;
    let owner = server.create_user().await;
    let guest = server.create_user().await;
    let offer = server.seed_offer(owner).await;

    let mut first = server.connect(guest).await;
    let mut second = server.connect(guest).await;
    wait_closed(&mut first).await;
    drop(first);

    let (status, created) = server
        .post(
            "/session/create",
            Some(session_request(owner, &[owner, guest], offer, "hello")),
        )
        .await;
    assert_eq!(status, 201, "{created}");
    let event = next_event(&mut second).await;
    assert_eq!(event["responseType"], "sessionCreated");
    let event = next_event(&mut second).await;
    assert_eq!(event["responseType"], "messageSent");

    // The stale disconnect must not clear the newer registration.
    sleep(QUIET).await;
    assert!(server.directory.lookup(UserId::new(guest)).await.is_some());
    assert_eq!(server.directory.len().await, 1);
}

#[tokio::test]
async fn disconnect_unregisters_the_user() {
    let server = spawn_server().await;
    let user = server.create_user().await;
    let mut ws = server.connect(user).await;

    let closed = ws.send(Message::Close(None)).await;
    assert!(closed.is_ok());
    server.wait_for(user, false).await;
}

#[tokio::test]
async fn inbound_frames_are_ignored() {
    let server = spawn_server().await;
    let user = server.create_user().await;
    let mut ws = server.connect(user).await;

    assert!(ws.send(Message::text("not json")).await.is_ok());
    assert!(ws.send(Message::text(r#"{"hello":"world"}"#)).await.is_ok());
    assert_silent(&mut ws).await;
    assert!(server.directory.lookup(UserId::new(user)).await.is_some());
}

#[tokio::test]
async fn unknown_user_cannot_connect() {
    let server = spawn_server().await;
    let result = connect_async(format!("{}/404", server.ws_base).as_str()).await;
    assert!(result.is_err());
    assert!(server.directory.is_empty().await);
}

#[tokio::test]
async fn incomplete_session_request_is_rejected() {
    let server = spawn_server().await;
    let owner = server.create_user().await;
    let guest = server.create_user().await;

    let mut request = session_request(owner, &[guest], 1, "hi");
    if let Some(fields) = request.as_object_mut() {
        fields.remove("offerId");
    }
    let (status, body) = server.post("/session/create", Some(request)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], 1001);

    let (status, body) = server.get("/session/list?userId=999").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], 2001);
}

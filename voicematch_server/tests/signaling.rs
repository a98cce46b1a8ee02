use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use voicematch_protocol::{PeerEvent, PeerId, PeerRequest};
use voicematch_server::{Config, RelayPolicy, ServerState, SignalingServer};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const SILENCE: Duration = Duration::from_millis(200);

struct TestServer {
    addr: SocketAddr,
    state: ServerState,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn spawn_server(relay_policy: RelayPolicy) -> TestServer {
    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        relay_policy,
        ..Config::default()
    };
    let server = SignalingServer::bind(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let state = server.state().clone();
    let shutdown = CancellationToken::new();
    tokio::spawn(server.serve(shutdown.clone()));
    TestServer {
        addr,
        state,
        shutdown,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws
}

async fn send(client: &mut Client, request: PeerRequest) {
    client
        .send(Message::text(request.to_string()))
        .await
        .unwrap();
}

async fn recv(client: &mut Client) -> PeerEvent {
    loop {
        let message = timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = message {
            return text.as_str().parse().unwrap();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    assert!(timeout(SILENCE, client.next()).await.is_err());
}

async fn wait_for_peers(state: &ServerState, expected: usize) {
    for _ in 0..100 {
        if state.connected_peers() == expected {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {expected} connected peers, found {}",
        state.connected_peers()
    );
}

async fn matched_pair(addr: SocketAddr) -> (Client, PeerId, Client, PeerId) {
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;

    send(&mut a, PeerRequest::Start).await;
    assert_eq!(recv(&mut a).await, PeerEvent::waiting());

    send(&mut b, PeerRequest::Start).await;
    let PeerEvent::Matched { peer_id: b_id } = recv(&mut a).await else {
        panic!("a was not matched");
    };
    let PeerEvent::Matched { peer_id: a_id } = recv(&mut b).await else {
        panic!("b was not matched");
    };
    (a, a_id, b, b_id)
}

#[tokio::test]
async fn pair_and_exchange_offer_and_answer() {
    let server = spawn_server(RelayPolicy::Open).await;
    let (mut a, a_id, mut b, b_id) = matched_pair(server.addr).await;
    assert_ne!(a_id, b_id);
    assert_eq!(server.state.waiting_peer(), None);

    send(
        &mut a,
        PeerRequest::Offer {
            peer_id: b_id,
            offer: json!({"type": "offer", "sdp": "X"}),
        },
    )
    .await;
    assert_eq!(
        recv(&mut b).await,
        PeerEvent::Offer {
            peer_id: a_id,
            offer: json!({"type": "offer", "sdp": "X"}),
        }
    );

    send(
        &mut b,
        PeerRequest::Answer {
            peer_id: a_id,
            answer: json!({"type": "answer", "sdp": "Y"}),
        },
    )
    .await;
    assert_eq!(
        recv(&mut a).await,
        PeerEvent::Answer {
            peer_id: b_id,
            answer: json!({"type": "answer", "sdp": "Y"}),
        }
    );

    send(
        &mut a,
        PeerRequest::Candidate {
            peer_id: b_id,
            candidate: json!({"candidate": "candidate:0 1 UDP 2122252543 192.0.2.1 40000 typ host"}),
        },
    )
    .await;
    assert!(matches!(
        recv(&mut b).await,
        PeerEvent::Candidate { peer_id, .. } if peer_id == a_id
    ));
}

#[tokio::test]
async fn third_client_waits_after_pairing() {
    let server = spawn_server(RelayPolicy::Open).await;
    let (mut a, _, mut b, _) = matched_pair(server.addr).await;

    let mut c = connect(server.addr).await;
    send(&mut c, PeerRequest::Start).await;
    assert_eq!(recv(&mut c).await, PeerEvent::waiting());

    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
}

#[tokio::test]
async fn disconnect_while_paired_drops_relays_silently() {
    let server = spawn_server(RelayPolicy::Open).await;
    let (mut a, a_id, mut b, _) = matched_pair(server.addr).await;
    wait_for_peers(&server.state, 2).await;

    a.close(None).await.unwrap();
    wait_for_peers(&server.state, 1).await;

    // b is not told its partner left
    assert_silent(&mut b).await;

    send(
        &mut b,
        PeerRequest::Offer {
            peer_id: a_id,
            offer: json!("X"),
        },
    )
    .await;
    assert_silent(&mut b).await;

    send(&mut b, PeerRequest::Start).await;
    assert_eq!(recv(&mut b).await, PeerEvent::waiting());
}

#[tokio::test]
async fn waiting_client_disconnect_frees_the_slot() {
    let server = spawn_server(RelayPolicy::Open).await;

    let mut a = connect(server.addr).await;
    send(&mut a, PeerRequest::Start).await;
    assert_eq!(recv(&mut a).await, PeerEvent::waiting());
    drop(a);
    wait_for_peers(&server.state, 0).await;
    assert_eq!(server.state.waiting_peer(), None);

    let mut b = connect(server.addr).await;
    send(&mut b, PeerRequest::Start).await;
    assert_eq!(recv(&mut b).await, PeerEvent::waiting());
}

#[tokio::test]
async fn malformed_messages_do_not_end_the_connection() {
    let server = spawn_server(RelayPolicy::Open).await;
    let mut a = connect(server.addr).await;

    a.send(Message::text("{not json")).await.unwrap();
    a.send(Message::text(r#"{"event":"hangup"}"#)).await.unwrap();
    a.send(Message::text(
        r#"{"event":"offer","data":{"peerId":"nobody","offer":{}}}"#,
    ))
    .await
    .unwrap();
    a.send(Message::binary(vec![0u8, 1, 2])).await.unwrap();
    send(&mut a, PeerRequest::KeepAlive).await;

    send(&mut a, PeerRequest::Start).await;
    assert_eq!(recv(&mut a).await, PeerEvent::waiting());
}

#[tokio::test]
async fn relay_to_unknown_peer_is_silent() {
    let server = spawn_server(RelayPolicy::Open).await;
    let mut a = connect(server.addr).await;

    send(
        &mut a,
        PeerRequest::Candidate {
            peer_id: uuid::Uuid::new_v4().into(),
            candidate: json!({}),
        },
    )
    .await;
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn paired_only_policy_blocks_other_clients() {
    let server = spawn_server(RelayPolicy::PairedOnly).await;
    let (mut a, a_id, mut b, b_id) = matched_pair(server.addr).await;

    let mut intruder = connect(server.addr).await;
    send(
        &mut intruder,
        PeerRequest::Offer {
            peer_id: b_id,
            offer: json!("spoofed"),
        },
    )
    .await;
    assert_silent(&mut b).await;

    send(
        &mut a,
        PeerRequest::Offer {
            peer_id: b_id,
            offer: json!("real"),
        },
    )
    .await;
    assert_eq!(
        recv(&mut b).await,
        PeerEvent::Offer {
            peer_id: a_id,
            offer: json!("real"),
        }
    );
}

#[tokio::test]
async fn shutdown_closes_open_connections() {
    let server = spawn_server(RelayPolicy::Open).await;
    let mut a = connect(server.addr).await;
    wait_for_peers(&server.state, 1).await;

    server.shutdown.cancel();
    wait_for_peers(&server.state, 0).await;

    let closed = timeout(RECV_TIMEOUT, async {
        while let Some(Ok(message)) = a.next().await {
            if message.is_close() {
                break;
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn serve_returns_after_connections_are_closed() {
    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        ..Config::default()
    };
    let server = SignalingServer::bind(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let state = server.state().clone();
    let shutdown = CancellationToken::new();
    let serving = tokio::spawn(server.serve(shutdown.clone()));

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    send(&mut a, PeerRequest::Start).await;
    assert_eq!(recv(&mut a).await, PeerEvent::waiting());
    wait_for_peers(&state, 2).await;

    shutdown.cancel();
    timeout(RECV_TIMEOUT, serving)
        .await
        .expect("serve did not return")
        .unwrap()
        .unwrap();

    // Nothing is left running once serve has returned
    assert_eq!(state.connected_peers(), 0);
    assert_eq!(state.waiting_peer(), None);

    for client in [&mut a, &mut b] {
        let saw_close = timeout(RECV_TIMEOUT, async {
            while let Some(Ok(message)) = client.next().await {
                if message.is_close() {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap();
        assert!(saw_close);
    }
}

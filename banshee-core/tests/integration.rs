//! Integration tests: probe, dispatcher and decoding against a fake
//! listener on localhost.

use std::sync::Arc;
use std::time::Duration;

use banshee_core::protocol::{PlayerStatus, SongInfo, StatusRequest, VolumeAction};
use banshee_core::{
    Command, CommandEvent, Connection, ConnectionConfig, DEFAULT_CHECK_TIMEOUT, Endpoint, Repeat,
    Reply, ServerStatus, Shuffle, TcpTransport, check_server,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

// ── Helpers ──────────────────────────────────────────────────────

/// A fake server that answers every request with `reply(request)` and
/// closes the socket. Returns the endpoint and a channel of received
/// request frames.
async fn fake_server<F>(password_id: u16, reply: F) -> (Endpoint, mpsc::UnboundedReceiver<Vec<u8>>)
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let reply = Arc::new(reply);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let reply = Arc::clone(&reply);
            let seen_tx = seen_tx.clone();
            tokio::spawn(async move {
                // Requests are small; one read gets the whole frame.
                let mut buf = vec![0u8; 1024];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                buf.truncate(n);
                let _ = seen_tx.send(buf.clone());
                let response = reply(&buf);
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (
        Endpoint::new(addr.ip().to_string(), addr.port(), password_id),
        seen_rx,
    )
}

/// Answers the probe like the real listener: `[1]` for the right
/// password id, `[0]` otherwise.
fn probe_reply(expected_password: u16) -> impl Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static {
    move |req: &[u8]| {
        let password = u16::from_le_bytes([req[1], req[2]]);
        vec![(password == expected_password) as u8]
    }
}

async fn next_event(rx: &mut mpsc::Receiver<CommandEvent>) -> CommandEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout")
        .expect("channel closed")
}

// ── Server check ─────────────────────────────────────────────────

#[tokio::test]
async fn test_probe_accepted() {
    let (endpoint, mut seen) = fake_server(42, probe_reply(42)).await;
    let status = check_server(&TcpTransport::new(), &endpoint, DEFAULT_CHECK_TIMEOUT).await;
    assert_eq!(status, ServerStatus::Accepted);
    assert_eq!(seen.recv().await.unwrap(), vec![0, 42, 0]);
}

#[tokio::test]
async fn test_probe_rejected() {
    let (mut endpoint, _seen) = fake_server(42, probe_reply(42)).await;
    endpoint.password_id = 7;
    let status = check_server(&TcpTransport::new(), &endpoint, DEFAULT_CHECK_TIMEOUT).await;
    assert_eq!(status, ServerStatus::Rejected);
}

#[tokio::test]
async fn test_probe_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let endpoint = Endpoint::new("127.0.0.1", port, 0);
    let status = check_server(&TcpTransport::new(), &endpoint, DEFAULT_CHECK_TIMEOUT).await;
    assert_eq!(status, ServerStatus::Unreachable);
}

// ── Player status ────────────────────────────────────────────────

#[tokio::test]
async fn test_player_status_end_to_end() {
    let (endpoint, mut seen) = fake_server(5, |_| vec![0x70, 42, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).await;
    let (tx, mut rx) = mpsc::channel(8);
    let conn = Connection::open(endpoint, ConnectionConfig::default(), Some(tx));

    let request = StatusRequest::new().volume(VolumeAction::Set(42));
    conn.send_command(Command::PlayerStatus, Some(request.to_params()));

    let CommandEvent::Handled {
        command, response, ..
    } = next_event(&mut rx).await
    else {
        panic!("expected a handled event");
    };
    assert_eq!(command, Command::PlayerStatus);

    let status = PlayerStatus::decode(&response).unwrap();
    assert!(status.playing);
    assert!(!status.paused);
    assert_eq!(status.volume, 42);
    assert_eq!(status.repeat, Repeat::All);
    assert_eq!(status.shuffle, Shuffle::Unknown);

    assert_eq!(seen.recv().await.unwrap(), vec![1, 5, 0, 0, 0, 42, 0, 0, 0, 0]);
    conn.close();
}

#[tokio::test]
async fn test_player_status_shuffle_off() {
    let (endpoint, _seen) = fake_server(0, |_| vec![0x71, 42, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).await;
    let (tx, mut rx) = mpsc::channel(8);
    let conn = Connection::open(endpoint, ConnectionConfig::default(), Some(tx));
    conn.send_command(Command::PlayerStatus, Some(StatusRequest::new().to_params()));

    let CommandEvent::Handled {
        command,
        params,
        response,
    } = next_event(&mut rx).await
    else {
        panic!("expected a handled event");
    };
    match Reply::decode(command, params.as_deref(), &response).unwrap() {
        Reply::Status(status) => assert_eq!(status.shuffle, Shuffle::Off),
        other => panic!("unexpected reply: {other:?}"),
    }
}

// ── Song info ────────────────────────────────────────────────────

#[tokio::test]
async fn test_song_info_end_to_end() {
    let mut song = Vec::new();
    song.extend_from_slice(&200_000u32.to_le_bytes());
    for s in ["Windowlicker", "Aphex Twin", "Windowlicker EP", "Electronic"] {
        song.extend_from_slice(&(s.len() as u16).to_le_bytes());
        song.extend_from_slice(s.as_bytes());
    }
    song.extend_from_slice(&1999u16.to_le_bytes());
    song.extend_from_slice(&[0, 0]);

    let (endpoint, _seen) = fake_server(0, move |_| song.clone()).await;
    let (tx, mut rx) = mpsc::channel(8);
    let conn = Connection::open(endpoint, ConnectionConfig::default(), Some(tx));
    conn.send_command(Command::SongInfo, None);

    let CommandEvent::Handled { response, .. } = next_event(&mut rx).await else {
        panic!("expected a handled event");
    };
    let info = SongInfo::decode(&response).unwrap();
    assert_eq!(info.title, "Windowlicker");
    assert_eq!(info.artist, "Aphex Twin");
    assert_eq!(info.year, 1999);
    assert!(!info.has_cover());
}

// ── Failure path ─────────────────────────────────────────────────

#[tokio::test]
async fn test_silent_server_loses_connection() {
    // Accepts and closes without answering: every round-trip is empty.
    let (endpoint, _seen) = fake_server(0, |_| Vec::new()).await;
    let (tx, mut rx) = mpsc::channel(8);
    let conn = Connection::open(endpoint, ConnectionConfig::default(), Some(tx));

    conn.send_command(Command::PlayerStatus, None);
    conn.send_command(Command::SongInfo, None);

    assert_eq!(next_event(&mut rx).await, CommandEvent::ConnectionLost);
    assert!(conn.is_closed());
}

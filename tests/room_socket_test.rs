//! Two websocket clients sharing a room board

use assert_matches::assert_matches;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tile_merge::config::GameSettings;
use tile_merge::servers::{RoomSocketServer, ServerMessage};
use tile_merge::services::RoomManager;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (String, RoomManager) {
    let rooms = RoomManager::new(GameSettings::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server = RoomSocketServer::new(rooms.clone());
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    (url, rooms)
}

async fn send(client: &mut Client, payload: &str) {
    client.send(Message::text(payload.to_string())).await.unwrap();
}

async fn receive(client: &mut Client) -> ServerMessage {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for the server")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_room_members_share_the_board() {
    let (url, rooms) = start_server().await;
    let (mut alice, _) = connect_async(url.as_str()).await.unwrap();
    let (mut bob, _) = connect_async(url.as_str()).await.unwrap();

    send(&mut alice, r#"{"event": "join_room", "room_id": "lobby"}"#).await;
    assert_eq!(
        receive(&mut alice).await,
        ServerMessage::RoomJoined {
            room_id: "lobby".to_string(),
            players_count: 1
        }
    );
    let initial = match receive(&mut alice).await {
        ServerMessage::GameState(snapshot) => snapshot,
        other => panic!("expected game state, got {other:?}"),
    };

    send(&mut bob, r#"{"event": "join_room", "room_id": "lobby"}"#).await;
    assert_matches!(
        receive(&mut bob).await,
        ServerMessage::RoomJoined { players_count: 2, .. }
    );
    assert_eq!(receive(&mut bob).await, ServerMessage::GameState(initial));

    send(
        &mut bob,
        r#"{"event": "game_action", "room_id": "lobby", "action": "new_game", "size": 6}"#,
    )
    .await;

    for client in [&mut alice, &mut bob] {
        assert_matches!(
            receive(client).await,
            ServerMessage::GameState(snapshot) if snapshot.size == 6 && snapshot.moves == 0
        );
    }

    drop(bob);
    tokio::time::timeout(Duration::from_secs(5), async {
        while rooms.players_count("lobby").await != Some(1) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("departure was not recorded");
}

#[tokio::test]
async fn test_bad_messages_get_errors() {
    let (url, _rooms) = start_server().await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();

    send(&mut client, "not json").await;
    assert_matches!(receive(&mut client).await, ServerMessage::Error { .. });

    send(
        &mut client,
        r#"{"event": "game_action", "room_id": "elsewhere", "action": "move_left"}"#,
    )
    .await;
    assert_matches!(
        receive(&mut client).await,
        ServerMessage::Error { message } if message.contains("elsewhere")
    );
}

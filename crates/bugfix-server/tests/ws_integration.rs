#[allow(dead_code)]
mod common;

use bugfix_core::game::GameId;
use bugfix_core::identity::Identity;
use bugfix_core::net::messages::{AcceptedMsg, EventMsg, GameRefMsg, JoinedMsg, ServerMessage};
use bugfix_core::verdict::{Outcome, Verdict};
use common::{
    TestServer, expect_error, request, ws_call, ws_connect, ws_create_game, ws_read_json,
    ws_read_server_msg, ws_send_json, ws_send_text, ws_try_read_text,
};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

fn alice() -> Identity {
    Identity::new("player1", "pass")
}

fn bob() -> Identity {
    Identity::new("player2", "pass2")
}

#[tokio::test]
async fn create_game_returns_id() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    ws_send_json(&mut stream, &request("createGame", &alice(), None, None)).await;
    let reply = ws_read_json(&mut stream).await;
    let id = reply["gameId"].as_str().unwrap();
    assert!(!id.is_empty());
    assert!(reply.get("error").is_none());
    assert_eq!(server.state.registry.len().await, 1);
}

#[tokio::test]
async fn full_scenario_fixed() {
    let server = TestServer::new().await;
    let mut creator = ws_connect(&server.ws_url()).await;
    let mut joiner = ws_connect(&server.ws_url()).await;

    let game_id = ws_create_game(&mut creator, &alice()).await;

    let found = ws_call(&mut joiner, &request("findGame", &bob(), None, None)).await;
    assert_eq!(
        found,
        ServerMessage::GameRef(GameRefMsg {
            game_id: game_id.clone()
        })
    );

    let joined = ws_call(&mut joiner, &request("joinGame", &bob(), Some(&game_id), None)).await;
    assert_eq!(
        joined,
        ServerMessage::Joined(JoinedMsg {
            joined: true,
            game_id: game_id.clone(),
            opponent: "player1".to_string(),
        })
    );

    // Creator is told who joined and gets the snippet to bug
    let push = ws_read_json(&mut creator).await;
    assert_eq!(push["event"], "opponentJoined");
    assert_eq!(push["opponent"], "player2");
    assert_eq!(push["gameId"], game_id.as_str());
    assert!(push["code"].as_str().is_some_and(|c| !c.is_empty()));

    let bug = ws_call(
        &mut creator,
        &request("bug", &alice(), Some(&game_id), Some("a\nb\nc")),
    )
    .await;
    assert_eq!(bug, ServerMessage::Accepted(AcceptedMsg { accepted: true }));

    let push = ws_read_server_msg(&mut joiner).await;
    assert_eq!(
        push,
        ServerMessage::Event(EventMsg::BugSubmitted {
            game_id: game_id.clone(),
            code: "a\nb\nc".to_string(),
        })
    );

    ws_send_json(
        &mut joiner,
        &request("fix", &bob(), Some(&game_id), Some("a\nb\nc")),
    )
    .await;
    let result = ws_read_json(&mut joiner).await;
    assert_eq!(result["verdict"], "fixed");
    assert_eq!(result["diff"], serde_json::json!([]));

    let push = ws_read_server_msg(&mut creator).await;
    assert_eq!(
        push,
        ServerMessage::Event(EventMsg::Result {
            game_id: game_id.clone(),
            outcome: Outcome {
                verdict: Verdict::Fixed,
                diff: vec![],
            },
        })
    );

    assert!(server.state.registry.is_empty().await);
}

#[tokio::test]
async fn full_scenario_not_fixed() {
    let server = TestServer::new().await;
    let mut creator = ws_connect(&server.ws_url()).await;
    let mut joiner = ws_connect(&server.ws_url()).await;

    let game_id = ws_create_game(&mut creator, &alice()).await;
    ws_call(&mut joiner, &request("joinGame", &bob(), Some(&game_id), None)).await;
    let _ = ws_read_server_msg(&mut creator).await;

    ws_call(
        &mut creator,
        &request("bug", &alice(), Some(&game_id), Some("a\nb\nc")),
    )
    .await;
    let _ = ws_read_server_msg(&mut joiner).await;

    ws_send_json(
        &mut joiner,
        &request("fix", &bob(), Some(&game_id), Some("a\nx\nc")),
    )
    .await;
    let result = ws_read_json(&mut joiner).await;
    assert_eq!(result["verdict"], "not fixed");
    assert_eq!(result["diff"], serde_json::json!([1]));
}

#[tokio::test]
async fn find_game_with_no_open_games() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    ws_send_json(&mut stream, &request("findGame", &bob(), None, None)).await;
    let reply = ws_read_json(&mut stream).await;
    assert_eq!(reply["error"], "no open game");
    assert_eq!(reply["code"], "NoOpenGame");
}

#[tokio::test]
async fn unknown_action_keeps_connection_open() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    ws_send_json(&mut stream, &request("fakeAction", &bob(), None, None)).await;
    let reply = ws_read_json(&mut stream).await;
    assert_eq!(reply["error"], "unknown action");

    // Still usable afterwards
    ws_create_game(&mut stream, &alice()).await;
}

#[tokio::test]
async fn malformed_messages_get_error_replies() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    ws_send_text(&mut stream, "not json at all").await;
    let err = expect_error(ws_read_server_msg(&mut stream).await);
    assert_eq!(err.code, "MalformedMessage");

    // joinGame without a gameId
    let err = expect_error(ws_call(&mut stream, &request("joinGame", &bob(), None, None)).await);
    assert_eq!(err.code, "MalformedMessage");
    assert!(err.error.contains("gameId"), "{}", err.error);

    // bug without code
    let id = GameId::from("whatever");
    let err = expect_error(ws_call(&mut stream, &request("bug", &alice(), Some(&id), None)).await);
    assert_eq!(err.code, "MalformedMessage");

    // missing player
    ws_send_text(&mut stream, r#"{"action":"createGame"}"#).await;
    let err = expect_error(ws_read_server_msg(&mut stream).await);
    assert_eq!(err.code, "MalformedMessage");
}

#[tokio::test]
async fn oversized_message_is_rejected() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    let code = "x".repeat(70 * 1024);
    let id = GameId::from("g");
    let err = expect_error(
        ws_call(&mut stream, &request("bug", &alice(), Some(&id), Some(&code))).await,
    );
    assert_eq!(err.code, "MalformedMessage");
}

#[tokio::test]
async fn binary_frames_are_accepted_as_json() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    let body = request("createGame", &alice(), None, None).to_string();
    stream
        .send(Message::Binary(body.into_bytes().into()))
        .await
        .unwrap();
    match ws_read_server_msg(&mut stream).await {
        ServerMessage::GameRef(_) => {},
        other => panic!("Expected GameRef, got: {other:?}"),
    }
}

#[tokio::test]
async fn join_unknown_game_is_not_found() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    let id = GameId::from("no-such-game");
    let err = expect_error(ws_call(&mut stream, &request("joinGame", &bob(), Some(&id), None)).await);
    assert_eq!(err.code, "NotFound");
}

#[tokio::test]
async fn out_of_turn_actions_are_rejected() {
    let server = TestServer::new().await;
    let mut creator = ws_connect(&server.ws_url()).await;
    let mut joiner = ws_connect(&server.ws_url()).await;
    let game_id = ws_create_game(&mut creator, &alice()).await;

    // bug before anyone joined
    let err = expect_error(
        ws_call(&mut creator, &request("bug", &alice(), Some(&game_id), Some("a"))).await,
    );
    assert_eq!(err.code, "WrongTurn");

    ws_call(&mut joiner, &request("joinGame", &bob(), Some(&game_id), None)).await;
    let _ = ws_read_server_msg(&mut creator).await;

    // fix before bug
    let err = expect_error(
        ws_call(&mut joiner, &request("fix", &bob(), Some(&game_id), Some("a"))).await,
    );
    assert_eq!(err.code, "WrongTurn");

    // bug by someone other than the creator
    let err = expect_error(
        ws_call(&mut joiner, &request("bug", &bob(), Some(&game_id), Some("a"))).await,
    );
    assert_eq!(err.code, "WrongTurn");

    // wrong password for the creator
    let impostor = Identity::new("player1", "guess");
    let err = expect_error(
        ws_call(&mut joiner, &request("bug", &impostor, Some(&game_id), Some("a"))).await,
    );
    assert_eq!(err.code, "WrongTurn");

    // nothing was pushed to the joiner by the rejected bugs
    assert!(ws_try_read_text(&mut joiner, 100).await.is_none());
}

#[tokio::test]
async fn actions_on_closed_game_are_not_found() {
    let server = TestServer::new().await;
    let mut creator = ws_connect(&server.ws_url()).await;
    let mut joiner = ws_connect(&server.ws_url()).await;

    let game_id = ws_create_game(&mut creator, &alice()).await;
    ws_call(&mut joiner, &request("joinGame", &bob(), Some(&game_id), None)).await;
    let _ = ws_read_server_msg(&mut creator).await; // opponentJoined
    ws_call(&mut creator, &request("bug", &alice(), Some(&game_id), Some("a"))).await;
    let _ = ws_read_server_msg(&mut joiner).await; // bugSubmitted
    let result = ws_call(&mut joiner, &request("fix", &bob(), Some(&game_id), Some("a"))).await;
    assert!(matches!(result, ServerMessage::Result(_)));

    let err = expect_error(
        ws_call(&mut joiner, &request("fix", &bob(), Some(&game_id), Some("a"))).await,
    );
    assert_eq!(err.code, "NotFound");
    let err = expect_error(
        ws_call(&mut joiner, &request("joinGame", &bob(), Some(&game_id), None)).await,
    );
    assert_eq!(err.code, "NotFound");
}

#[tokio::test]
async fn client_close_completes_handshake_while_game_is_live() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    // The open game keeps a sender for this connection
    ws_create_game(&mut stream, &alice()).await;

    stream.send(Message::Close(None)).await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("Timed out waiting for close handshake");
    assert!(
        matches!(next, Some(Ok(Message::Close(_))) | None),
        "Expected close frame, got: {next:?}"
    );

    // The game itself survives the disconnect
    assert_eq!(server.state.registry.len().await, 1);
}

//! End-to-end hub behavior over real sockets.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use std::time::Duration;

use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;

use relayhub_gateway::config::{AccountConfig, AuthMode, HubConfig};
use support::*;

fn msg(to: &str, content: &str) -> serde_json::Value {
    json!({"type": "message", "payload": {"toId": to, "content": content, "type": "text"}})
}

#[tokio::test]
async fn message_is_acked_and_delivered() {
    let (addr, state) = spawn_hub(HubConfig::default()).await;
    let mut a = join(addr, &state, "alice").await;
    let mut b = join(addr, &state, "bob").await;

    let online = next_of_type(&mut a, "user_status").await;
    assert_eq!(online["payload"], json!({"userId": "bob", "status": "online"}));

    send(&mut a, msg("bob", "hi bob")).await;

    let ack = next_of_type(&mut a, "message_sent").await;
    let got = next_of_type(&mut b, "new_message").await;
    assert_eq!(ack["payload"]["id"], got["payload"]["id"]);
    assert_eq!(got["payload"]["fromId"], "alice");
    assert_eq!(got["payload"]["toId"], "bob");
    assert_eq!(got["payload"]["content"], "hi bob");
    assert_eq!(got["payload"]["read"], false);

    let history = state.store().load_conversation("bob", "alice", 0).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn offline_recipient_gets_no_backfill() {
    let (addr, state) = spawn_hub(HubConfig::default()).await;
    let mut a = join(addr, &state, "alice").await;

    send(&mut a, msg("carol", "are you there")).await;
    let acks: Vec<_> = collect_for(&mut a, Duration::from_millis(300))
        .await
        .into_iter()
        .filter(|e| e["type"] == "message_sent")
        .collect();
    assert_eq!(acks.len(), 1);

    let mut c = join(addr, &state, "carol").await;
    let events = collect_for(&mut c, Duration::from_millis(300)).await;
    assert!(events.iter().all(|e| e["type"] != "new_message"), "{events:?}");

    // history is still available through the store
    let history = state.store().load_conversation("carol", "alice", 0).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn read_receipt_reaches_original_sender_only() {
    let (addr, state) = spawn_hub(HubConfig::default()).await;
    let mut c = join(addr, &state, "carol").await;
    let mut a = join(addr, &state, "alice").await;
    let mut b = join(addr, &state, "bob").await;

    send(&mut a, msg("bob", "read me")).await;
    let delivered = next_of_type(&mut b, "new_message").await;
    let id = delivered["payload"]["id"].as_str().unwrap().to_string();

    send(
        &mut b,
        json!({"type": "read", "payload": {"messageId": id, "otherId": "alice", "userId": "bob"}}),
    )
    .await;

    let notice = next_of_type(&mut a, "message_read").await;
    assert_eq!(notice["payload"], json!({"messageId": id, "readBy": "bob"}));

    let to_b = collect_for(&mut b, Duration::from_millis(200)).await;
    let to_c = collect_for(&mut c, Duration::from_millis(200)).await;
    assert!(to_b.iter().all(|e| e["type"] != "message_read"));
    assert!(to_c.iter().all(|e| e["type"] != "message_read"));

    assert_eq!(state.store().unread_count("bob").await.unwrap(), 0);
}

#[tokio::test]
async fn new_session_replaces_old_without_offline() {
    let (addr, state) = spawn_hub(HubConfig::default()).await;
    let mut watcher = join(addr, &state, "watcher").await;
    let mut first = join(addr, &state, "alice").await;
    let first_sid = state.realtime().sessions.lookup("alice").unwrap().session_id;

    let mut second = connect(addr, "userId=alice").await;
    let deadline = tokio::time::Instant::now() + WAIT;
    while state.realtime().sessions.lookup("alice").unwrap().session_id == first_sid {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(closed_within(&mut first, WAIT).await);

    let seen = collect_for(&mut watcher, Duration::from_millis(300)).await;
    assert!(status_events(&seen, "alice", "offline").is_empty(), "{seen:?}");
    assert_eq!(status_events(&seen, "alice", "online").len(), 2);

    send(&mut watcher, msg("alice", "which one")).await;
    let got = next_of_type(&mut second, "new_message").await;
    assert_eq!(got["payload"]["content"], "which one");
    assert_eq!(state.realtime().sessions.len(), 2);
}

#[tokio::test]
async fn silent_peer_expires_with_one_offline() {
    let mut cfg = HubConfig::default();
    cfg.hub.ping_interval_ms = 100;
    cfg.hub.read_deadline_ms = 400;
    let (addr, state) = spawn_hub(cfg).await;

    let mut watcher = join(addr, &state, "watcher").await;
    // Never polled: answers no pings and sends nothing.
    let _silent = join(addr, &state, "silent").await;

    let seen = collect_for(&mut watcher, Duration::from_millis(1500)).await;
    assert_eq!(status_events(&seen, "silent", "offline").len(), 1, "{seen:?}");
    assert!(state.realtime().sessions.lookup("silent").is_none());

    // the watcher answers pings by reading, so it survives
    assert!(state.realtime().sessions.lookup("watcher").is_some());
}

#[tokio::test]
async fn call_signal_is_relayed_with_sender_stamp() {
    let (addr, state) = spawn_hub(HubConfig::default()).await;
    let mut a = join(addr, &state, "alice").await;
    let mut b = join(addr, &state, "bob").await;

    send(
        &mut a,
        json!({"type": "call-offer", "payload": {
            "callId": "c-1", "toId": "bob", "fromId": "someone-else", "sdp": "v=0", "media": "audio"
        }}),
    )
    .await;

    let offer = next_of_type(&mut b, "call-offer").await;
    assert_eq!(offer["payload"]["fromId"], "alice");
    assert_eq!(offer["payload"]["callId"], "c-1");
    assert_eq!(offer["payload"]["sdp"], "v=0");
    assert_eq!(offer["payload"]["media"], "audio");

    send(&mut b, json!({"type": "call-end", "payload": {"callId": "c-1", "toId": "alice"}})).await;
    let end = next_of_type(&mut a, "call-end").await;
    assert_eq!(end["payload"]["fromId"], "bob");

    assert!(state.store().load_conversation("alice", "bob", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn disconnect_envelope_unregisters() {
    let (addr, state) = spawn_hub(HubConfig::default()).await;
    let mut b = join(addr, &state, "bob").await;
    let mut a = join(addr, &state, "alice").await;

    send(&mut a, json!({"type": "disconnect"})).await;
    assert!(closed_within(&mut a, WAIT).await);
    wait_unregistered(&state, "alice").await;

    let off = next_of_type(&mut b, "user_status").await;
    let off = if off["payload"]["status"] == "online" {
        next_of_type(&mut b, "user_status").await
    } else {
        off
    };
    assert_eq!(off["payload"], json!({"userId": "alice", "status": "offline"}));
}

#[tokio::test]
async fn malformed_frames_do_not_end_the_session() {
    let (addr, state) = spawn_hub(HubConfig::default()).await;
    let mut a = join(addr, &state, "alice").await;
    let mut b = join(addr, &state, "bob").await;

    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;
    a.send(Message::Text("not json".into())).await.unwrap();
    a.send(Message::Binary(vec![0xde, 0xad])).await.unwrap();
    send(&mut a, json!({"type": "message", "payload": {"content": "no recipient"}})).await;
    send(&mut a, json!({"type": "typing", "payload": {"toId": "bob"}})).await;
    send(&mut a, msg("bob", "still here")).await;

    let got = next_of_type(&mut b, "new_message").await;
    assert_eq!(got["payload"]["content"], "still here");
    assert!(state.realtime().sessions.lookup("alice").is_some());
}

#[tokio::test]
async fn client_ping_gets_a_single_pong() {
    let (addr, state) = spawn_hub(HubConfig::default()).await;
    let mut a = join(addr, &state, "alice").await;

    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;
    a.send(Message::Ping(b"hb".to_vec())).await.unwrap();

    assert_eq!(count_pongs(&mut a, b"hb", Duration::from_millis(400)).await, 1);
}

#[tokio::test]
async fn upgrade_requires_identity() {
    let (addr, _state) = spawn_hub(HubConfig::default()).await;

    match connect_async(format!("ws://{addr}/ws")).await {
        Err(WsError::Http(resp)) => assert_eq!(resp.status(), 400),
        other => panic!("expected 400, got {:?}", other.map(|(_, r)| r.status())),
    }
}

#[tokio::test]
async fn account_mode_checks_token_against_user_id() {
    let mut cfg = HubConfig::default();
    cfg.auth.mode = AuthMode::Accounts;
    cfg.auth.accounts = vec![
        AccountConfig {
            id: "alice".into(),
            display_name: Some("Alice Liddell".into()),
            token: "tok-alice".into(),
        },
        AccountConfig {
            id: "bob".into(),
            display_name: None,
            token: "tok-bob".into(),
        },
    ];
    let (addr, state) = spawn_hub(cfg).await;

    for query in ["userId=alice", "userId=alice&token=tok-bob", "userId=alice&token=nope"] {
        match connect_async(format!("ws://{addr}/ws?{query}")).await {
            Err(WsError::Http(resp)) => assert_eq!(resp.status(), 401, "{query}"),
            other => panic!("{query}: expected 401, got {:?}", other.map(|(_, r)| r.status())),
        }
    }

    let _a = connect(addr, "userId=alice&token=tok-alice&userName=ignored").await;
    wait_registered(&state, "alice").await;
    let conn = state.realtime().sessions.lookup("alice").unwrap();
    assert_eq!(&*conn.display_name, "Alice Liddell");
}

#[tokio::test]
async fn shutdown_closes_every_session_once() {
    let (addr, state) = spawn_hub(HubConfig::default()).await;
    let mut a = join(addr, &state, "alice").await;
    let mut b = join(addr, &state, "bob").await;

    assert_eq!(state.begin_shutdown(), 2);
    assert_eq!(state.begin_shutdown(), 0);

    assert!(closed_within(&mut a, WAIT).await);
    assert!(closed_within(&mut b, WAIT).await);
    wait_unregistered(&state, "alice").await;
    wait_unregistered(&state, "bob").await;
}

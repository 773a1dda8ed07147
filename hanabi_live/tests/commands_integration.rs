//! Integration tests for raw command handling.
//!
//! Commands go in as the JSON text a client would send and come back out as
//! the notifications its connection would receive.

use hanabi_live::{
    CoreConfig, Dispatcher,
    actor::ManagerError,
    chat::LOBBY_ROOM,
    game::EndCondition,
    sessions::{Connection, Notification, SessionData, SessionsRequest},
    store::MemoryStore,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc::UnboundedReceiver;

type Inbox = UnboundedReceiver<Notification>;

fn start() -> (Dispatcher, Arc<MemoryStore>) {
    let config = CoreConfig::default();
    let store = Arc::new(MemoryStore::new(config.variants.clone()));
    (Dispatcher::start(config, store.clone()), store)
}

fn connect(dispatcher: &Dispatcher, user_id: i64, username: &str) -> (SessionData, Inbox) {
    let data = SessionData::new(user_id, username, "127.0.0.1");
    let (connection, inbox) = Connection::new();
    dispatcher
        .sessions
        .new_session(data.clone(), connection)
        .unwrap();
    (data, inbox)
}

async fn send(dispatcher: &Dispatcher, user: &SessionData, text: &str) {
    dispatcher.commands().dispatch(user, text).await.unwrap();
}

/// Wait for every queue to settle and collect what `inbox` received.
async fn received(dispatcher: &Dispatcher, inbox: &mut Inbox) -> Vec<Notification> {
    dispatcher.tables.get_tables().await.unwrap();
    dispatcher.chat.history(LOBBY_ROOM).await.unwrap();
    dispatcher.sessions.get_users().await.unwrap();

    let mut notifications = Vec::new();
    while let Ok(notification) = inbox.try_recv() {
        notifications.push(notification);
    }
    notifications
}

fn errors(notifications: &[Notification]) -> Vec<String> {
    notifications
        .iter()
        .filter_map(|n| match n {
            Notification::Error { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_bad_commands_are_reported_to_the_sender() {
    let (dispatcher, _store) = start();
    let (alice, mut inbox) = connect(&dispatcher, 1, "alice");

    send(&dispatcher, &alice, "{not json").await;
    send(&dispatcher, &alice, r#"{"command":"selfDestruct"}"#).await;
    send(&dispatcher, &alice, r#"{"command":"tableJoin","tableId":"one"}"#).await;
    send(&dispatcher, &alice, r#"{"command":"chat","v":7,"msg":"hi"}"#).await;

    assert_eq!(
        errors(&received(&dispatcher, &mut inbox).await),
        vec![
            "Your command was not valid JSON.".to_string(),
            "The command \"selfDestruct\" does not exist.".to_string(),
            "Your \"tableJoin\" command contained invalid data.".to_string(),
            "Your client is out of date; please refresh the page.".to_string(),
        ]
    );

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_full_game_through_commands() {
    let (dispatcher, store) = start();
    let (alice, mut alice_inbox) = connect(&dispatcher, 1, "alice");
    let (bob, mut bob_inbox) = connect(&dispatcher, 2, "bob");

    send(
        &dispatcher,
        &alice,
        r#"{"command":"tableCreate","v":2,"options":{"name":"Friday","maxPlayers":2}}"#,
    )
    .await;
    let tables = dispatcher.tables.get_tables().await.unwrap();
    assert_eq!(tables.len(), 1);
    let table_id = tables[0].id;
    assert_eq!(tables[0].name, "Friday");

    send(
        &dispatcher,
        &bob,
        &format!(r#"{{"command":"tableJoin","tableId":{table_id}}}"#),
    )
    .await;
    // Only the owner can start
    send(
        &dispatcher,
        &bob,
        &format!(r#"{{"command":"tableStart","tableId":{table_id}}}"#),
    )
    .await;
    assert_eq!(
        errors(&received(&dispatcher, &mut bob_inbox).await),
        vec!["only the table owner can do that".to_string()]
    );

    send(
        &dispatcher,
        &alice,
        &format!(r#"{{"command":"tableStart","tableId":{table_id}}}"#),
    )
    .await;
    let notifications = received(&dispatcher, &mut bob_inbox).await;
    let game_pushed = notifications
        .iter()
        .any(|n| matches!(n, Notification::Game { table_id: id, .. } if *id == table_id));
    assert!(game_pushed);

    // Any seat may end the game, whoever's turn it is
    send(
        &dispatcher,
        &bob,
        &format!(
            r#"{{"command":"action","tableId":{table_id},"action":{{"type":"terminate"}}}}"#
        ),
    )
    .await;
    let snapshot = dispatcher
        .tables
        .get_snapshot(table_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.end_condition, EndCondition::Terminated);
    assert_eq!(snapshot.end_player, Some(1));

    send(
        &dispatcher,
        &alice,
        &format!(r#"{{"command":"tag","tableId":{table_id},"msg":"Finesse"}}"#),
    )
    .await;
    let notifications = received(&dispatcher, &mut alice_inbox).await;
    let tagged = notifications.iter().any(|n| {
        matches!(n, Notification::Chat(message)
            if message.server && message.msg == "Tag \"finesse\" added.")
    });
    assert!(tagged);
    assert!(errors(&notifications).is_empty());

    // The finished game can be reopened as a replay
    for _ in 0..200 {
        if store.num_games().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    send(&dispatcher, &bob, r#"{"command":"replayCreate","gameId":1}"#).await;
    send(&dispatcher, &bob, r#"{"command":"replayCreate","gameId":5}"#).await;
    assert_eq!(
        errors(&received(&dispatcher, &mut bob_inbox).await),
        vec!["game 5 not found".to_string()]
    );

    let tables = dispatcher.tables.get_tables().await.unwrap();
    assert_eq!(tables.len(), 2);
    assert!(tables.iter().any(|t| t.replay && t.spectators == ["bob"]));

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_lobby_chat_and_mute() {
    let (dispatcher, _store) = start();
    let (alice, _alice_inbox) = connect(&dispatcher, 1, "alice");
    let (bob, mut bob_inbox) = connect(&dispatcher, 2, "bob");

    send(&dispatcher, &alice, r#"{"command":"chat","msg":"hello all"}"#).await;
    let heard = received(&dispatcher, &mut bob_inbox).await;
    assert!(heard.iter().any(|n| {
        matches!(n, Notification::Chat(message)
            if message.who == "alice" && message.msg == "hello all")
    }));

    dispatcher
        .sessions
        .submit(SessionsRequest::SetMuted {
            user_id: 2,
            muted: true,
        })
        .unwrap();
    send(&dispatcher, &bob, r#"{"command":"chat","msg":"let me speak"}"#).await;
    assert_eq!(
        errors(&received(&dispatcher, &mut bob_inbox).await),
        vec!["You are currently muted.".to_string()]
    );

    let history = dispatcher.chat.history(LOBBY_ROOM).await.unwrap();
    assert_eq!(history.len(), 1);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_table_chat_rooms() {
    let (dispatcher, _store) = start();
    let (alice, mut alice_inbox) = connect(&dispatcher, 1, "alice");
    let (bob, mut bob_inbox) = connect(&dispatcher, 2, "bob");

    send(&dispatcher, &alice, r#"{"command":"tableCreate"}"#).await;
    let table_id = dispatcher.tables.get_tables().await.unwrap()[0].id;
    let room = format!("table{table_id}");

    let chat = |room: &str, msg: &str| {
        format!(r#"{{"command":"chat","room":"{room}","msg":"{msg}"}}"#)
    };
    send(&dispatcher, &bob, &chat(&room, "let me in")).await;
    send(&dispatcher, &bob, &chat("backroom", "psst")).await;
    assert_eq!(
        errors(&received(&dispatcher, &mut bob_inbox).await),
        vec![
            "not at this table".to_string(),
            "That chat room does not exist.".to_string(),
        ]
    );

    send(&dispatcher, &alice, &chat(&room, "anyone?")).await;
    let typing = format!(r#"{{"command":"chatTyping","tableId":{table_id},"typing":true}}"#);
    send(&dispatcher, &alice, &typing).await;
    let heard = received(&dispatcher, &mut alice_inbox).await;
    assert!(heard.iter().any(|n| {
        matches!(n, Notification::Chat(message) if message.room == room && message.msg == "anyone?")
    }));
    assert!(errors(&heard).is_empty());

    // Table chat never reaches the lobby
    let overheard = received(&dispatcher, &mut bob_inbox).await;
    assert!(!overheard.iter().any(|n| matches!(n, Notification::Chat(_))));
    assert!(dispatcher.chat.history(LOBBY_ROOM).await.unwrap().is_empty());

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_table_list_and_friends() {
    let (dispatcher, _store) = start();
    let (alice, mut inbox) = connect(&dispatcher, 1, "alice");

    send(&dispatcher, &alice, r#"{"command":"tableCreate"}"#).await;
    send(&dispatcher, &alice, r#"{"command":"getTables"}"#).await;
    send(&dispatcher, &alice, r#"{"command":"friend","name":"  Bob "}"#).await;
    send(&dispatcher, &alice, r#"{"command":"friend","name":"   "}"#).await;

    let notifications = received(&dispatcher, &mut inbox).await;
    let listed = notifications.iter().find_map(|n| match n {
        Notification::TableList { tables } => Some(tables.len()),
        _ => None,
    });
    assert_eq!(listed, Some(1));

    let friends = notifications.iter().find_map(|n| match n {
        Notification::Friends { friends } => Some(friends.clone()),
        _ => None,
    });
    assert_eq!(friends, Some(vec!["bob".to_string()]));
    assert_eq!(
        errors(&notifications),
        vec!["You must specify a username.".to_string()]
    );

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_closed_domains_surface_to_the_caller() {
    let (dispatcher, _store) = start();
    let (alice, _inbox) = connect(&dispatcher, 1, "alice");
    dispatcher.shutdown().await;

    let result = dispatcher
        .commands()
        .dispatch(&alice, r#"{"command":"tableCreate"}"#)
        .await;
    assert_eq!(result, Err(ManagerError::Closed("tables")));

    let result = dispatcher
        .commands()
        .dispatch(&alice, r#"{"command":"nope"}"#)
        .await;
    assert_eq!(result, Err(ManagerError::Closed("sessions")));
}

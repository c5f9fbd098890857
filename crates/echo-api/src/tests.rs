use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use echo_db::Database;
use echo_engagement::ledger;
use echo_engagement::lifecycle::DEFAULT_STALE_AFTER_MS;
use echo_gateway::dispatcher::Dispatcher;
use echo_types::models::{Group, ReactionKind};

use crate::{AppState, AppStateInner, identity, now_millis, router};

const SECRET: &str = "test-secret";

fn make_app() -> (Router, AppState) {
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: SECRET.into(),
        dispatcher: Dispatcher::new(),
        stale_after_ms: DEFAULT_STALE_AFTER_MS,
    });
    (router(state.clone()), state)
}

fn token_for(user_id: Uuid) -> String {
    identity::create_token(SECRET, user_id).unwrap()
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_post(app: &Router, token: &str, content: &str, category: Option<&str>) -> String {
    let (status, post) = call(
        app,
        "POST",
        "/posts",
        Some(token),
        Some(json!({ "content": content, "category": category })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    post["id"].as_str().unwrap().to_string()
}

async fn react(app: &Router, token: &str, post_id: &str, kind: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        &format!("/posts/{post_id}/reactions"),
        Some(token),
        Some(json!({ "kind": kind })),
    )
    .await
}

#[tokio::test]
async fn identity_unlocks_protected_routes() {
    let (app, _) = make_app();

    let (status, body) = call(&app, "GET", "/posts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, Value::Null);

    let (status, identity) = call(&app, "POST", "/identity", None, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let token = identity["token"].as_str().unwrap();

    let (status, posts) = call(&app, "GET", "/posts", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posts, json!([]));

    let (status, _) = call(&app, "GET", "/posts", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = make_app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn reaction_toggles_and_switches() {
    let (app, _) = make_app();
    let token = token_for(Uuid::new_v4());
    let post_id = create_post(&app, &token, "told my sister the truth", Some("family")).await;

    let (status, post) = react(&app, &token, &post_id, "hearts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["reactions"], json!({ "hearts": 1, "flames": 0, "frowns": 0 }));
    assert_eq!(post["my_reaction"], "hearts");

    let (_, post) = react(&app, &token, &post_id, "flames").await;
    assert_eq!(post["reactions"], json!({ "hearts": 0, "flames": 1, "frowns": 0 }));
    assert_eq!(post["my_reaction"], "flames");

    let (_, post) = react(&app, &token, &post_id, "flames").await;
    assert_eq!(post["reactions"], json!({ "hearts": 0, "flames": 0, "frowns": 0 }));
    assert!(post.get("my_reaction").is_none());

    let (status, body) = react(&app, &token, &post_id, "angry").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown reaction kind 'angry'");

    let (status, _) = react(&app, &token, &Uuid::new_v4().to_string(), "hearts").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reactions_are_broadcast() {
    let (app, state) = make_app();
    let token = token_for(Uuid::new_v4());
    let post_id = create_post(&app, &token, "quiet win today", None).await;

    let mut rx = state.dispatcher.subscribe();
    react(&app, &token, &post_id, "smile").await;

    let msg = rx.try_recv().unwrap();
    assert_eq!(msg.group_id, None);
    let event: Value = serde_json::from_str(&msg.json).unwrap();
    assert_eq!(event["type"], "PostUpdate");
    assert_eq!(event["data"]["post"]["reactions"]["smile"], 1);
    assert!(event["data"]["post"].get("my_reaction").is_none());
    assert!(event["data"]["post"].get("user_reactions").is_none());
}

#[tokio::test]
async fn posts_do_not_reveal_who_reacted_or_replied() {
    let (app, _) = make_app();
    let author = Uuid::new_v4();
    let author_token = token_for(author);
    let reader_token = token_for(Uuid::new_v4());
    let post_id = create_post(&app, &author_token, "first week sober", None).await;

    react(&app, &author_token, &post_id, "hearts").await;
    call(
        &app,
        "POST",
        &format!("/posts/{post_id}/replies"),
        Some(&author_token),
        Some(json!({ "content": "thank you all" })),
    )
    .await;

    let (_, seen) = call(&app, "GET", &format!("/posts/{post_id}"), Some(&reader_token), None).await;
    assert_eq!(seen["reactions"]["hearts"], 1);
    assert!(seen.get("user_reactions").is_none());
    assert!(seen.get("my_reaction").is_none());
    assert_eq!(seen["replies"][0]["mine"], false);
    assert!(!seen.to_string().contains(&author.to_string()));

    let (_, own) = call(&app, "GET", &format!("/posts/{post_id}"), Some(&author_token), None).await;
    assert_eq!(own["my_reaction"], "hearts");
    assert_eq!(own["replies"][0]["mine"], true);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reactions_all_land() {
    let (app, state) = make_app();
    let post_id = create_post(&app, &token_for(Uuid::new_v4()), "crowded post", None).await;

    let mut tasks = Vec::new();
    for _ in 0..40 {
        let app = app.clone();
        let post_id = post_id.clone();
        let token = token_for(Uuid::new_v4());
        tasks.push(tokio::spawn(async move {
            react(&app, &token, &post_id, "hearts").await.0
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let stored = state
        .db
        .get_post(post_id.parse().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.reaction_count(ReactionKind::Hearts), 40);
    assert_eq!(stored.user_reactions.len(), 40);
    assert!(ledger::is_consistent(&stored));
}

#[tokio::test]
async fn trending_ranks_by_hearts_and_flames() {
    let (app, _) = make_app();
    let users: Vec<String> = (0..5).map(|_| token_for(Uuid::new_v4())).collect();

    let a = create_post(&app, &users[0], "post a", None).await;
    let b = create_post(&app, &users[0], "post b", None).await;
    let c = create_post(&app, &users[0], "post c", None).await;

    for user in &users[..2] {
        react(&app, user, &a, "hearts").await;
    }
    for user in &users[..3] {
        react(&app, user, &b, "flames").await;
    }
    for user in &users {
        react(&app, user, &c, "frowns").await;
    }

    let (status, ranked) = call(&app, "GET", "/posts/trending", Some(&users[0]), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = ranked
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![b.as_str(), a.as_str(), c.as_str()]);
}

#[tokio::test]
async fn replies_append_in_order() {
    let (app, _) = make_app();
    let token = token_for(Uuid::new_v4());
    let post_id = create_post(&app, &token, "can't sleep again", Some("anxiety")).await;

    for text in ["same here", "it gets better"] {
        let (status, reply) = call(
            &app,
            "POST",
            &format!("/posts/{post_id}/replies"),
            Some(&token),
            Some(json!({ "content": text })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reply["mine"], true);
    }

    let (_, post) = call(&app, "GET", &format!("/posts/{post_id}"), Some(&token), None).await;
    let replies: Vec<&str> = post["replies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["content"].as_str().unwrap())
        .collect();
    assert_eq!(replies, vec!["same here", "it gets better"]);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/posts/{post_id}/replies"),
        Some(&token),
        Some(json!({ "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/posts/{}/replies", Uuid::new_v4()),
        Some(&token),
        Some(json!({ "content": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_and_category_views() {
    let (app, _) = make_app();
    let token = token_for(Uuid::new_v4());
    create_post(&app, &token, "Got the job offer", Some("success")).await;
    create_post(&app, &token, "Miss my old job", Some("heartbreak")).await;
    create_post(&app, &token, "Road trip alone", Some("road trips")).await;

    let (_, found) = call(&app, "GET", "/posts/search?q=JOB", Some(&token), None).await;
    assert_eq!(found.as_array().unwrap().len(), 2);

    let (_, found) = call(&app, "GET", "/categories/road%20trips/posts", Some(&token), None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["category"], "road trips");

    let (_, live) = call(&app, "GET", "/posts/live", Some(&token), None).await;
    assert_eq!(live.as_array().unwrap().len(), 3);

    let (status, _) = call(
        &app,
        "POST",
        "/posts",
        Some(&token),
        Some(json!({ "content": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn create_group(app: &Router, token: &str, name: &str) -> String {
    let (status, group) = call(
        app,
        "POST",
        "/groups",
        Some(token),
        Some(json!({ "name": name, "category": "Music", "description": "share loops" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    group["id"].as_str().unwrap().to_string()
}

async fn open_session(app: &Router, token: &str, group_id: &str) -> String {
    let (status, session) =
        call(app, "POST", &format!("/groups/{group_id}/sessions"), Some(token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    session["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn group_chat_flow() {
    let (app, state) = make_app();
    let token = token_for(Uuid::new_v4());
    let friend_token = token_for(Uuid::new_v4());

    let group_id = create_group(&app, &token, "Bedroom producers").await;
    let me = open_session(&app, &token, &group_id).await;
    let friend = open_session(&app, &friend_token, &group_id).await;

    let mut rx = state.dispatcher.subscribe();
    let messages_uri = format!("/groups/{group_id}/messages");
    let (status, first) = call(
        &app,
        "POST",
        &messages_uri,
        Some(&token),
        Some(json!({ "session_id": me, "text": "anyone here?", "profile_emoji": "🦊" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_id = first["id"].as_str().unwrap().to_string();
    let event = rx.try_recv().unwrap();
    assert_eq!(event.group_id.map(|g| g.to_string()), Some(group_id.clone()));

    let (status, reply) = call(
        &app,
        "POST",
        &messages_uri,
        Some(&friend_token),
        Some(json!({ "session_id": friend, "text": "yep", "reply_to": first_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["reply_to"]["text"], "anyone here?");
    assert_eq!(reply["reply_to"]["sender"], me);

    let (status, reacted) = call(
        &app,
        "POST",
        &format!("{messages_uri}/{first_id}/reactions"),
        Some(&friend_token),
        Some(json!({ "session_id": friend, "kind": "heart" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reacted["added"], true);
    assert_eq!(reacted["message"]["reactions"]["heart"], json!([friend]));

    // The friend owns their session but did not send this message
    let (status, _) = call(
        &app,
        "DELETE",
        &format!("{messages_uri}/{first_id}?session_id={friend}"),
        Some(&friend_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("{messages_uri}/{first_id}?session_id={me}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The quote outlives the message it quoted
    let (_, messages) = call(&app, "GET", &messages_uri, Some(&token), None).await;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["reply_to"]["text"], "anyone here?");

    let (_, group) = call(&app, "GET", &format!("/groups/{group_id}"), Some(&token), None).await;
    assert!(group["last_message_time"].as_i64().unwrap() >= group["created_at"].as_i64().unwrap());
}

#[tokio::test]
async fn copied_session_id_grants_nothing() {
    let (app, _) = make_app();
    let owner_token = token_for(Uuid::new_v4());
    let stranger_token = token_for(Uuid::new_v4());

    let group_id = create_group(&app, &owner_token, "Late shift").await;
    let owner_session = open_session(&app, &owner_token, &group_id).await;
    let messages_uri = format!("/groups/{group_id}/messages");
    let (_, sent) = call(
        &app,
        "POST",
        &messages_uri,
        Some(&owner_token),
        Some(json!({ "session_id": owner_session, "text": "clocking out" })),
    )
    .await;
    let message_id = sent["id"].as_str().unwrap().to_string();

    // Anyone can read the sender id off the listing
    let (_, listing) = call(&app, "GET", &messages_uri, Some(&stranger_token), None).await;
    let copied = listing[0]["sender"].as_str().unwrap().to_string();
    assert_eq!(copied, owner_session);

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("{messages_uri}/{message_id}?session_id={copied}"),
        Some(&stranger_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "POST",
        &format!("{messages_uri}/{message_id}/reactions"),
        Some(&stranger_token),
        Some(json!({ "session_id": copied, "kind": "sad" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "POST",
        &messages_uri,
        Some(&stranger_token),
        Some(json!({ "session_id": copied, "text": "not me" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A session opened in one group is not valid in another
    let other_group = create_group(&app, &owner_token, "Early shift").await;
    let (status, _) = call(
        &app,
        "POST",
        &format!("/groups/{other_group}/messages"),
        Some(&owner_token),
        Some(json!({ "session_id": owner_session, "text": "wrong room" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listing) = call(&app, "GET", &messages_uri, Some(&owner_token), None).await;
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["reactions"], json!({}));
}

#[tokio::test]
async fn message_needs_text_or_voice_note() {
    let (app, _) = make_app();
    let token = token_for(Uuid::new_v4());
    let group_id = create_group(&app, &token, "Night owls").await;
    let session = open_session(&app, &token, &group_id).await;
    let uri = format!("/groups/{group_id}/messages");

    let (status, body) = call(&app, "POST", &uri, Some(&token), Some(json!({ "session_id": session, "text": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "text must not be empty");

    let (status, voice) = call(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({ "session_id": session, "voice_note_url": "data:audio/webm;base64,GkXfo0" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(voice["text"], "");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/groups/{}/messages", Uuid::new_v4()),
        Some(&token),
        Some(json!({ "session_id": session, "text": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        call(&app, "POST", &format!("/groups/{}/sessions", Uuid::new_v4()), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_groups_prunes_inactive_ones() {
    let (app, state) = make_app();
    let token = token_for(Uuid::new_v4());
    let now = now_millis();

    let group = |id: u128, created_at: Option<i64>| Group {
        id: Uuid::from_u128(id),
        name: format!("group {id}"),
        category: "Sports".into(),
        description: "pickup games".into(),
        created_at,
        last_message_time: None,
    };
    state.db.insert_group(&group(1, Some(now - DEFAULT_STALE_AFTER_MS - 60_000))).unwrap();
    state.db.insert_group(&group(2, Some(now))).unwrap();
    state.db.insert_group(&group(3, None)).unwrap();

    let mut rx = state.dispatcher.subscribe();
    let (status, groups) = call(&app, "GET", "/groups", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let mut ids: Vec<&str> = groups
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap())
        .collect();
    ids.sort();
    assert_eq!(
        ids,
        vec![
            Uuid::from_u128(2).to_string().as_str(),
            Uuid::from_u128(3).to_string().as_str()
        ]
    );

    let event = rx.try_recv().unwrap();
    assert!(event.json.contains("GroupDelete"));

    // Second sweep finds nothing left to do
    let (status, again) = call(&app, "GET", "/groups", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again.as_array().unwrap().len(), 2);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn unknown_group_category_is_rejected() {
    let (app, _) = make_app();
    let token = token_for(Uuid::new_v4());
    let (status, body) = call(
        &app,
        "POST",
        "/groups",
        Some(&token),
        Some(json!({ "name": "Chefs", "category": "Cooking", "description": "recipes" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown group category 'Cooking'");
}

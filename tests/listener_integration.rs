//! End-to-end tests against listeners bound to real ports.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;
use webhook_listener::http::ServerSettings;
use webhook_listener::listener::{ListenerError, ListenerManager, RegistryError};

mod common;

use common::Recorder;

#[tokio::test]
async fn github_listener_accepts_event() {
    let manager = ListenerManager::new(ServerSettings::localhost());
    let recorder = Arc::new(Recorder::default());

    let server = tokio::spawn({
        let manager = manager.clone();
        let recorder = Arc::clone(&recorder);
        async move {
            manager
                .new_listener(recorder, 9080, "github", common::record)
                .await
        }
    });
    common::wait_for_port(9080).await;

    let res = common::client()
        .post("http://127.0.0.1:9080/events?delivery=1")
        .header("X-GitHub-Event", "pull_request")
        .json(&serde_json::json!({ "action": "opened" }))
        .send()
        .await
        .expect("listener unreachable");

    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert!(res.headers().contains_key("x-request-id"));

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    let (envelope, key, uri) = &events[0];
    assert_eq!(envelope.body["action"], Value::from("opened"));
    assert_eq!(envelope.header("x-github-event"), Some("pull_request"));
    assert_eq!(key, "github");
    assert_eq!(uri.path(), "/events");
    assert_eq!(uri.query(), Some("delivery=1"));

    manager.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("listener should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn bad_requests_never_reach_handler() {
    let manager = ListenerManager::new(ServerSettings::localhost());
    let recorder = Arc::new(Recorder::default());

    tokio::spawn({
        let manager = manager.clone();
        let recorder = Arc::clone(&recorder);
        async move { manager.new_listener(recorder, 29181, "github", common::record).await }
    });
    common::wait_for_port(29181).await;

    let client = common::client();
    let url = "http://127.0.0.1:29181/";

    let empty = client.post(url).send().await.unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let text = client.post(url).body("not-json").send().await.unwrap();
    assert_eq!(text.status(), StatusCode::BAD_REQUEST);

    assert_eq!(recorder.calls(), 0);

    let ok = client.post(url).body(r#"{"zen":"Keep it simple"}"#).send().await.unwrap();
    assert_eq!(ok.status(), StatusCode::ACCEPTED);
    assert_eq!(recorder.calls(), 1);

    manager.shutdown();
}

#[tokio::test]
async fn failing_handler_yields_500() {
    let manager = ListenerManager::new(ServerSettings::localhost());
    let recorder = Arc::new(Recorder::default());

    tokio::spawn({
        let manager = manager.clone();
        let recorder = Arc::clone(&recorder);
        async move { manager.new_listener(recorder, 29182, "gitlab", common::reject).await }
    });
    common::wait_for_port(29182).await;

    let client = common::client();
    for _ in 0..3 {
        let res = client
            .post("http://127.0.0.1:29182/")
            .body(r#"{"object_kind":"push"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    assert_eq!(recorder.calls(), 3);

    manager.shutdown();
}

#[tokio::test]
async fn duplicate_port_is_rejected_while_first_keeps_serving() {
    let manager = ListenerManager::new(ServerSettings::localhost());
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());

    tokio::spawn({
        let manager = manager.clone();
        let first = Arc::clone(&first);
        async move { manager.new_listener(first, 29183, "github", common::record).await }
    });
    common::wait_for_port(29183).await;

    let err = manager
        .new_listener(Arc::clone(&second), 29183, "other", common::record)
        .await
        .unwrap_err();
    assert!(matches!(err, ListenerError::Registry(RegistryError::PortInUse(29183))));

    let res = common::client()
        .post("http://127.0.0.1:29183/")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
    assert_eq!(first.events()[0].1, "github");

    manager.shutdown();
}

#[tokio::test]
async fn concurrent_registrations_bind_once() {
    let manager = ListenerManager::new(ServerSettings::localhost());
    let recorder = Arc::new(Recorder::default());

    let attempts: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            let recorder = Arc::clone(&recorder);
            tokio::spawn(async move {
                manager.new_listener(recorder, 29184, "github", common::record).await
            })
        })
        .collect();
    common::wait_for_port(29184).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Losers return immediately; the winner keeps serving until shutdown.
    let mut rejected = 0;
    let mut running = Vec::new();
    for attempt in attempts {
        if attempt.is_finished() {
            let result = attempt.await.unwrap();
            assert!(matches!(
                result,
                Err(ListenerError::Registry(RegistryError::PortInUse(29184)))
            ));
            rejected += 1;
        } else {
            running.push(attempt);
        }
    }
    assert_eq!(rejected, 3);
    assert_eq!(running.len(), 1);
    assert_eq!(manager.registry().ports(), vec![29184]);

    manager.shutdown();
    for attempt in running {
        assert!(attempt.await.unwrap().is_ok());
    }
}

#[tokio::test]
async fn occupied_socket_reports_bind_error() {
    let _squatter = tokio::net::TcpListener::bind("127.0.0.1:29185").await.unwrap();
    let manager = ListenerManager::new(ServerSettings::localhost());

    let err = manager
        .new_listener(Arc::new(Recorder::default()), 29185, "github", common::record)
        .await
        .unwrap_err();

    assert!(matches!(err, ListenerError::Bind { port: 29185, .. }));
    // Registration is write-once: the port stays claimed.
    assert!(manager.registry().contains(29185));
}

#[tokio::test]
async fn independent_ports_serve_their_own_keys() {
    let manager = ListenerManager::new(ServerSettings::localhost());
    let recorder = Arc::new(Recorder::default());

    for (port, key) in [(29186, "github"), (29187, "gitlab")] {
        let manager = manager.clone();
        let recorder = Arc::clone(&recorder);
        tokio::spawn(async move { manager.new_listener(recorder, port, key, common::record).await });
    }
    common::wait_for_port(29186).await;
    common::wait_for_port(29187).await;

    let client = common::client();
    for port in [29186, 29187] {
        let res = client
            .post(format!("http://127.0.0.1:{port}/"))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }

    let mut keys: Vec<_> = recorder.events().into_iter().map(|(_, key, _)| key).collect();
    keys.sort();
    assert_eq!(keys, vec!["github", "gitlab"]);
    assert_eq!(manager.registry().len(), 2);

    manager.shutdown();
}

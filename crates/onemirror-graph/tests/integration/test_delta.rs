//! Integration tests for the delta change feed
//!
//! Verifies end-to-end behavior of [`GraphChangeFeed`] against a
//! wiremock-based Graph API mock server:
//! - Initial query and page following
//! - Skipping items that fail to decode
//! - Polling the delta link once caught up
//! - Restart on an expired cursor (410 Gone)
//! - Error reporting and cancellation
//! - Nested (shared folder) roots

use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use onemirror_core::domain::{DriveId, RemoteId};
use onemirror_core::ports::{ChangeFeedSource, FeedRoot};
use onemirror_graph::delta::GraphChangeFeed;

use crate::common;

const LONG_POLL: Duration = Duration::from_secs(3600);
const SHORT_POLL: Duration = Duration::from_millis(20);
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_feed_yields_initial_items_in_order() {
    let (server, client) = common::setup_graph_mock().await;

    let items = serde_json::json!([
        common::file_item("file-001", "a.txt", "/drive/root:", "AAAA"),
        {
            "id": "folder-001",
            "name": "Documents",
            "parentReference": { "path": "/drive/root:" },
            "folder": { "childCount": 3 }
        }
    ]);
    common::mount_delta_initial(&server, items, "token-1").await;

    let source = GraphChangeFeed::new(client).with_poll_interval(LONG_POLL);
    let cancel = CancellationToken::new();
    let mut feed = source.open(&common::credential(), FeedRoot::main(), cancel.clone());

    let first = feed.next().await.unwrap().unwrap();
    let second = feed.next().await.unwrap().unwrap();
    assert_eq!(first.id.as_str(), "file-001");
    assert_eq!(second.id.as_str(), "folder-001");

    cancel.cancel();
    let next = tokio::time::timeout(STEP_TIMEOUT, feed.next())
        .await
        .expect("feed should end promptly after cancellation");
    assert!(next.is_none());
}

#[tokio::test]
async fn test_feed_follows_next_links() {
    let (server, client) = common::setup_graph_mock().await;

    common::mount_delta_paginated(
        &server,
        serde_json::json!([common::file_item("p1-a", "one.txt", "/drive/root:", "01")]),
        serde_json::json!([
            common::file_item("p2-a", "two.txt", "/drive/root:", "02"),
            common::file_item("p2-b", "three.txt", "/drive/root:", "03")
        ]),
        "after-pages",
    )
    .await;

    let source = GraphChangeFeed::new(client).with_poll_interval(LONG_POLL);
    let cancel = CancellationToken::new();
    let feed = source.open(&common::credential(), FeedRoot::main(), cancel.clone());

    let ids: Vec<String> = feed
        .take(3)
        .map(|item| item.unwrap().id.to_string())
        .collect()
        .await;
    assert_eq!(ids, vec!["p1-a", "p2-a", "p2-b"]);
    cancel.cancel();
}

#[tokio::test]
async fn test_feed_skips_malformed_items_and_keeps_paging() {
    let (server, client) = common::setup_graph_mock().await;

    common::mount_delta_paginated(
        &server,
        serde_json::json!([
            common::file_item("p1-a", "one.txt", "/drive/root:", "01"),
            { "id": "", "name": "nameless-id.txt" },
            { "id": 42, "name": "numeric-id.txt" },
            common::file_item("p1-b", "two.txt", "/drive/root:", "02")
        ]),
        serde_json::json!([common::file_item("p2-a", "three.txt", "/drive/root:", "03")]),
        "after-bad-item",
    )
    .await;

    let source = GraphChangeFeed::new(client).with_poll_interval(LONG_POLL);
    let cancel = CancellationToken::new();
    let feed = source.open(&common::credential(), FeedRoot::main(), cancel.clone());

    let ids: Vec<String> = tokio::time::timeout(
        STEP_TIMEOUT,
        feed.take(3)
            .map(|item| item.unwrap().id.to_string())
            .collect::<Vec<_>>(),
    )
    .await
    .expect("feed should move past the malformed items");
    assert_eq!(ids, vec!["p1-a", "p1-b", "p2-a"]);
    cancel.cancel();
}

#[tokio::test]
async fn test_feed_polls_delta_link_after_catching_up() {
    let (server, client) = common::setup_graph_mock().await;

    common::mount_delta_initial(
        &server,
        serde_json::json!([common::file_item("first", "first.txt", "/drive/root:", "11")]),
        "poll-token",
    )
    .await;
    common::mount_delta_poll(
        &server,
        "poll-token",
        serde_json::json!([common::file_item("later", "later.txt", "/drive/root:", "22")]),
    )
    .await;

    let source = GraphChangeFeed::new(client).with_poll_interval(SHORT_POLL);
    let cancel = CancellationToken::new();
    let mut feed = source.open(&common::credential(), FeedRoot::main(), cancel.clone());

    let first = feed.next().await.unwrap().unwrap();
    assert_eq!(first.id.as_str(), "first");

    let later = tokio::time::timeout(STEP_TIMEOUT, feed.next())
        .await
        .expect("poll should deliver the next change")
        .unwrap()
        .unwrap();
    assert_eq!(later.id.as_str(), "later");
    cancel.cancel();
}

#[tokio::test]
async fn test_feed_restarts_on_expired_token() {
    let (server, client) = common::setup_graph_mock().await;

    // The expired-token mock is mounted first so it wins over the root mock
    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .and(wiremock::matchers::query_param("token", "stale"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [common::file_item("again", "again.txt", "/drive/root:", "33")],
            "@odata.deltaLink": format!("{}/me/drive/root/delta?token=stale", server.uri())
        })))
        .mount(&server)
        .await;

    let source = GraphChangeFeed::new(client).with_poll_interval(SHORT_POLL);
    let cancel = CancellationToken::new();
    let mut feed = source.open(&common::credential(), FeedRoot::main(), cancel.clone());

    let first = feed.next().await.unwrap().unwrap();
    let replay = tokio::time::timeout(STEP_TIMEOUT, feed.next())
        .await
        .expect("feed should restart after 410")
        .unwrap()
        .unwrap();
    assert_eq!(first.id.as_str(), "again");
    assert_eq!(replay.id.as_str(), "again");
    cancel.cancel();
}

#[tokio::test]
async fn test_feed_yields_error_once_then_ends() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = GraphChangeFeed::new(client).with_poll_interval(LONG_POLL);
    let mut feed = source.open(
        &common::credential(),
        FeedRoot::main(),
        CancellationToken::new(),
    );

    let err = feed.next().await.unwrap().unwrap_err();
    assert!(err.to_string().contains("me/root"));
    assert!(feed.next().await.is_none());
}

#[tokio::test]
async fn test_feed_retries_after_throttling() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    common::mount_delta_initial(
        &server,
        serde_json::json!([common::file_item("ok", "ok.txt", "/drive/root:", "44")]),
        "t",
    )
    .await;

    let source = GraphChangeFeed::new(client).with_poll_interval(LONG_POLL);
    let cancel = CancellationToken::new();
    let mut feed = source.open(&common::credential(), FeedRoot::main(), cancel.clone());

    let item = feed.next().await.unwrap().unwrap();
    assert_eq!(item.id.as_str(), "ok");
    cancel.cancel();
}

#[tokio::test]
async fn test_pre_cancelled_feed_makes_no_requests() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let source = GraphChangeFeed::new(client);
    let mut feed = source.open(&common::credential(), FeedRoot::main(), cancel);

    assert!(feed.next().await.is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_nested_root_uses_drive_item_delta_and_bearer_auth() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-b/items/shared-1/delta"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [common::file_item(
                "inner",
                "inner.txt",
                "/drives/drive-b/items/shared-1:",
                "55"
            )],
            "@odata.deltaLink": format!(
                "{}/drives/drive-b/items/shared-1/delta?token=n",
                server.uri()
            )
        })))
        .mount(&server)
        .await;

    let root = FeedRoot::item(
        DriveId::new("drive-b".to_string()).unwrap(),
        RemoteId::new("shared-1".to_string()).unwrap(),
    );
    let source = GraphChangeFeed::new(client).with_poll_interval(LONG_POLL);
    let cancel = CancellationToken::new();
    let mut feed = source.open(&common::credential(), root, cancel.clone());

    let item = feed.next().await.unwrap().unwrap();
    assert_eq!(item.id.as_str(), "inner");
    cancel.cancel();
}

//! Integration tests for single-item metadata lookups

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use onemirror_core::domain::{DriveId, EntryKind, RemoteId};
use onemirror_core::ports::ItemMetadataFetcher;
use onemirror_graph::metadata::GraphMetadataFetcher;

use crate::common;

#[tokio::test]
async fn test_fetch_shared_folder_metadata() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-b/items/shared-1"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "shared-1",
            "name": "Team Folder",
            "parentReference": {
                "driveId": "drive-b",
                "path": "/drives/drive-b/root:/Projects"
            },
            "folder": { "childCount": 12 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = GraphMetadataFetcher::new(client);
    let entry = fetcher
        .fetch(
            &common::credential(),
            &DriveId::new("drive-b".to_string()).unwrap(),
            &RemoteId::new("shared-1".to_string()).unwrap(),
        )
        .await
        .expect("metadata fetch failed");

    assert_eq!(entry.id.as_str(), "shared-1");
    assert_eq!(entry.name, "Team Folder");
    assert_eq!(entry.parent_path(), Some("/drives/drive-b/root:/Projects"));
    assert_eq!(entry.kind(), EntryKind::Folder);
}

#[tokio::test]
async fn test_fetch_missing_item_is_an_error() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-b/items/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = GraphMetadataFetcher::new(client);
    let err = fetcher
        .fetch(
            &common::credential(),
            &DriveId::new("drive-b".to_string()).unwrap(),
            &RemoteId::new("gone".to_string()).unwrap(),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("drive-b/gone"));
}

#[tokio::test]
async fn test_fetch_malformed_body_is_an_error() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-b/items/odd"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let fetcher = GraphMetadataFetcher::new(client);
    let result = fetcher
        .fetch(
            &common::credential(),
            &DriveId::new("drive-b".to_string()).unwrap(),
            &RemoteId::new("odd".to_string()).unwrap(),
        )
        .await;

    assert!(result.is_err());
}

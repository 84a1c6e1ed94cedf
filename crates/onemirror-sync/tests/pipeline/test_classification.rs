//! Classification through the whole pipeline

use onemirror_core::domain::{ActionKind, ItemType, ResolveReason};

use crate::common::{self, Harness};

#[tokio::test]
async fn test_actions_follow_feed_order_and_ids() {
    let mut h = Harness::start();

    h.send(common::folder("F", "/drive/root:", "Docs"));
    h.send(common::file("A", "/drive/root:/Docs", "a.txt", "AA01"));
    h.send(common::file("A", "/drive/root:/Docs", "a.txt", "AA01"));
    h.send(common::file("A", "/drive/root:/Docs", "renamed.txt", "AA01"));

    let folder = h.action().await;
    assert_eq!(folder.kind, ActionKind::Add);
    assert_eq!(folder.id.as_str(), "F");
    assert_eq!(folder.item_type, ItemType::Folder);
    assert_eq!(folder.name, "Docs");

    let added = h.action().await;
    assert_eq!(added.kind, ActionKind::Add);
    assert_eq!(added.id.as_str(), "A");
    assert_eq!(added.name, "Docs/a.txt");
    assert_eq!(added.hash.as_ref().unwrap().as_str(), "aa01");

    let replay = h.action().await;
    assert_eq!(replay.kind, ActionKind::Change);
    assert_eq!(replay.name, "Docs/a.txt");

    let moved = h.action().await;
    assert_eq!(moved.old_name(), Some("Docs/a.txt"));
    assert_eq!(moved.name, "Docs/renamed.txt");
}

#[tokio::test]
async fn test_copy_detection_by_fingerprint() {
    let mut h = Harness::start();

    h.send(common::file("X", "/drive/root:/a", "orig.bin", "C0FFEE"));
    h.send(common::file("Y", "/drive/root:/b", "dup.bin", "c0ffee"));
    h.send(common::file("Z", "/drive/root:/b", "other.bin", "BEEF"));

    assert_eq!(h.action().await.kind, ActionKind::Add);

    let copy = h.action().await;
    assert_eq!(copy.id.as_str(), "Y");
    assert_eq!(copy.copied_from(), Some("a/orig.bin"));

    let other = h.action().await;
    assert_eq!(other.kind, ActionKind::Add);
}

#[tokio::test]
async fn test_deletion_releases_tracking() {
    let mut h = Harness::start();

    h.send(common::folder("X", "/drive/root:", "gone"));
    h.send(common::deleted("X"));
    h.send(common::deleted("X"));

    assert_eq!(h.action().await.kind, ActionKind::Add);

    let removed = h.action().await;
    assert_eq!(removed.kind, ActionKind::Remove);
    assert_eq!(removed.name, "gone");

    let unresolved = h.action().await;
    assert!(unresolved.is_error());
    assert_eq!(unresolved.item_type, ItemType::Unknown);
    assert_eq!(unresolved.error().unwrap().reason, ResolveReason::MissingName);

    let state = h.stream.shutdown().await.unwrap();
    assert!(!state.is_tracked(&common::id("X")));
}

#[tokio::test]
async fn test_unresolvable_entries_do_not_stall_the_feed() {
    let mut h = Harness::start();

    h.send(common::file("K", "/drive/root:", "keep.txt", "01"));
    h.send(common::untyped("K", "/drive/root:", "mystery"));
    h.send(common::file("N", "/drive/root:", "next.txt", "02"));

    assert_eq!(h.action().await.kind, ActionKind::Add);

    let error = h.action().await;
    assert!(error.is_error());
    assert_eq!(error.id.as_str(), "K");
    assert_eq!(error.error().unwrap().reason, ResolveReason::UnknownType);
    assert_eq!(error.error().unwrap().filename, "mystery");

    let next = h.action().await;
    assert_eq!(next.id.as_str(), "N");

    let state = h.stream.shutdown().await.unwrap();
    assert_eq!(state.get(&common::id("K")).unwrap().name, "keep.txt");
    assert_eq!(state.tracked_len(), 2);
}

#[tokio::test]
async fn test_download_handle_resolves_only_on_demand() {
    let mut h = Harness::start();

    let mut entry = common::file("D", "/drive/root:", "big.iso", "0D");
    entry.download_url = Some("https://download.invalid/big.iso".to_string());
    h.send(entry);
    h.send(common::file("E", "/drive/root:", "small.txt", "0E"));

    let with_url = h.action().await;
    let without_url = h.action().await;
    assert!(without_url.download.is_none());

    let handle = with_url.download.expect("download handle");
    assert_eq!(h.downloads.calls(), 0);

    let bytes = handle.fetch().await.unwrap();
    assert_eq!(bytes, b"secret-token|D|me");
    assert_eq!(h.downloads.calls(), 1);
}

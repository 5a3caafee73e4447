use tempfile::tempdir;

use super::*;

fn session_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join("state").join("session.json"))
        .expect("temp dir should be utf-8")
}

#[tokio::test]
async fn test_memory_store() {
    let store = MemorySessionStore::new();

    assert_eq!(store.get("cart_synced").await.expect("get"), None);
    store.set("cart_synced", "true").await.expect("set");
    assert!(store.exists("cart_synced").await.expect("exists"));

    store.delete("cart_synced").await.expect("delete");
    assert!(!store.exists("cart_synced").await.expect("exists"));
}

#[tokio::test]
async fn test_file_store_missing_file_is_empty() {
    let dir = tempdir().expect("temp dir");
    let store = FileSessionStore::new(session_path(&dir));

    assert_eq!(store.get("cart_synced").await.expect("get"), None);
    store.delete("cart_synced").await.expect("delete of missing key");
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_file_store_persists_across_instances() {
    let dir = tempdir().expect("temp dir");
    let path = session_path(&dir);

    let store = FileSessionStore::new(path.clone());
    store.set("cart_synced", "true").await.expect("set");
    store.set("other", "1").await.expect("set");

    let reopened = FileSessionStore::new(path);
    assert_eq!(
        reopened.get("cart_synced").await.expect("get").as_deref(),
        Some("true")
    );

    reopened.delete("other").await.expect("delete");
    assert!(!store.exists("other").await.expect("exists"));
}

#[tokio::test]
async fn test_file_store_reports_corrupt_file() {
    let dir = tempdir().expect("temp dir");
    let path = session_path(&dir);
    std::fs::create_dir_all(path.parent().expect("has parent")).expect("create dir");
    std::fs::write(&path, "not json").expect("write");

    let store = FileSessionStore::new(path);
    let err = store.get("cart_synced").await.expect_err("corrupt file");

    assert!(matches!(err, SessionStoreError::Corrupt { .. }));
}

//! End-to-end sync scenarios against an in-memory SQLite store.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use quill_content::{ContentType, ErrorType, ParseStatus, ViolationType};
use quill_sync::{
    BroadcastNotifier, ContentStore, Scope, SqliteStore, StoreError, SyncEngine, SyncError,
};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn sidecar(slug: &str, content_type: &str) -> String {
    format!("title: {slug}\nslug: {slug}\ntype: {content_type}\n")
}

async fn engine() -> SyncEngine<SqliteStore, BroadcastNotifier> {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    SyncEngine::with_workers(store, BroadcastNotifier::default(), 2).unwrap()
}

#[tokio::test]
async fn test_markdown_and_unsafe_html() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.md", "# A\n\nSome *text*.");
    write(dir.path(), "a.yaml", &sidecar("a", "blog"));
    write(dir.path(), "b.html", "<script>x</script>");
    write(dir.path(), "b.yaml", &sidecar("b", "page"));
    let engine = engine().await;
    let scope = Scope::new("acme");

    let summary = engine.sync_directory(&scope, dir.path()).await.unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.content_types, BTreeMap::from([(ContentType::Blog, 1)]));

    let stored = engine.store().list(&scope).await.unwrap();
    let markdown = &stored[0].attributes;
    assert_eq!(markdown.parse_status, ParseStatus::Success);
    assert!(markdown.processed_content.as_deref().unwrap().contains("<h1>A</h1>"));

    let html = &stored[1].attributes;
    assert_eq!(html.raw_content, "<script>x</script>");
    assert!(html.processed_content.is_none());
    let errors = html.parse_errors.as_ref().unwrap();
    assert_eq!(errors.error_type, ErrorType::SecurityViolation);
    assert_eq!(errors.violations[0].violation_type, ViolationType::ScriptTag);
}

#[tokio::test]
async fn test_unpaired_files_are_not_counted() {
    let dir = TempDir::new().unwrap();
    for (name, kind) in [("one", "blog"), ("two", "page"), ("three", "documentation")] {
        write(dir.path(), &format!("{name}.md"), "text");
        write(dir.path(), &format!("{name}.yaml"), &sidecar(name, kind));
    }
    write(dir.path(), "orphan.html", "<p>no sidecar</p>");
    let engine = engine().await;

    let summary = engine
        .sync_directory(&Scope::new("acme"), dir.path())
        .await
        .unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.successful, 3);
}

#[tokio::test]
async fn test_resync_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.md", "# A");
    write(dir.path(), "a.yaml", &sidecar("a", "blog"));
    write(dir.path(), "home.tmpl", "<div>{{ name }}</div>");
    write(dir.path(), "home.yaml", &sidecar("home", "landing"));
    let engine = engine().await;
    let scope = Scope::new("acme");

    let first = engine.sync_directory(&scope, dir.path()).await.unwrap();
    let before: Vec<_> = engine
        .store()
        .list(&scope)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.attributes)
        .collect();
    let second = engine.sync_directory(&scope, dir.path()).await.unwrap();
    let after: Vec<_> = engine
        .store()
        .list(&scope)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.attributes)
        .collect();

    assert_eq!(first.content_types, second.content_types);
    assert_eq!(before, after);
    assert!(after[1].processed_content.is_none());
}

#[tokio::test]
async fn test_duplicate_slug_rolls_back_to_previous_content() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "first.md", "# First");
    write(dir.path(), "first.yaml", &sidecar("first", "blog"));
    let engine = engine().await;
    let scope = Scope::new("acme");
    engine.sync_directory(&scope, dir.path()).await.unwrap();

    write(dir.path(), "copy.md", "# Copy");
    write(dir.path(), "copy.yaml", &sidecar("first", "blog"));
    let err = engine.sync_directory(&scope, dir.path()).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::Persistence(StoreError::Constraint { ref slug, .. }) if slug == "first"
    ));
    let stored = engine.store().list(&scope).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].attributes.source_path, "first.md");
}

#[tokio::test]
async fn test_sync_replaces_only_own_tenant() {
    let acme_dir = TempDir::new().unwrap();
    write(acme_dir.path(), "a.md", "# A");
    write(acme_dir.path(), "a.yaml", &sidecar("a", "blog"));
    let empty_dir = TempDir::new().unwrap();
    let engine = engine().await;

    engine
        .sync_directory(&Scope::new("acme"), acme_dir.path())
        .await
        .unwrap();
    engine
        .sync_directory(&Scope::new("globex"), empty_dir.path())
        .await
        .unwrap();

    assert_eq!(engine.store().list(&Scope::new("acme")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_preconditions_fail_before_mutation() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.md", "# A");
    write(dir.path(), "a.yaml", &sidecar("a", "blog"));
    let engine = engine().await;
    let scope = Scope::new("acme");
    engine.sync_directory(&scope, dir.path()).await.unwrap();

    let missing = engine
        .sync_directory(&scope, &dir.path().join("gone"))
        .await
        .unwrap_err();
    let blank = engine
        .sync_directory(&Scope::new(""), dir.path())
        .await
        .unwrap_err();
    let file = engine
        .sync_directory(&scope, &dir.path().join("a.md"))
        .await
        .unwrap_err();

    assert!(matches!(missing, SyncError::InvalidDirectory(_)));
    assert!(matches!(blank, SyncError::MissingTenant));
    assert!(matches!(file, SyncError::InvalidDirectory(_)));
    assert_eq!(engine.store().list(&scope).await.unwrap().len(), 1);
}

mod common;

use std::fs;
use std::time::Duration;

use mdviewer_engine::{
    DocumentEngine, EngineConfig, EngineError, WatchError, WatchSettings, WatchStatus, WatcherId,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::runtime::Handle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(3);

fn start(path: Option<std::path::PathBuf>) -> DocumentEngine {
    common::init_logging();
    let config = EngineConfig {
        document: path,
        watch: WatchSettings {
            debounce: Duration::from_millis(100),
        },
    };
    DocumentEngine::start(config, Handle::current()).unwrap()
}

async fn wait_for_content(engine: &DocumentEngine, expected: &str) {
    let mut rx = engine.cache().subscribe();
    timeout(
        WAIT,
        rx.wait_for(|s| s.current.as_ref().is_some_and(|c| &*c.content == expected)),
    )
    .await
    .expect("timed out waiting for content")
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edits_reach_subscribers_and_refetch() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a.md");
    fs::write(&path, "# One").unwrap();

    let engine = start(Some(path.clone()));
    let mut subscription = engine.subscribe();
    assert_eq!(&*engine.cache().get().await.unwrap().content, "# One\n");
    assert!(matches!(
        &*engine.watch_status().borrow(),
        WatchStatus::Watching { watcher: WatcherId(1), .. }
    ));

    fs::write(&path, "# Two").unwrap();
    let signal = timeout(WAIT, subscription.recv())
        .await
        .expect("timed out waiting for a change signal")
        .unwrap();
    assert_eq!(signal.watcher, WatcherId(1));

    engine.cache().invalidate();
    wait_for_content(&engine, "# Two\n").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn open_switches_document_and_watch() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.md");
    let b = temp.path().join("b.md");
    fs::write(&a, "# A").unwrap();
    fs::write(&b, "# B").unwrap();

    let engine = start(Some(a.clone()));
    engine.cache().get().await.unwrap();
    let mut subscription = engine.subscribe();

    engine.open(&b).unwrap();
    assert_eq!(engine.document(), Some(b.clone()));
    wait_for_content(&engine, "# B\n").await;
    assert_eq!(
        *engine.watch_status().borrow(),
        WatchStatus::Watching {
            watcher: WatcherId(2),
            path: b.canonicalize().unwrap(),
        }
    );

    // The old document is no longer watched.
    fs::write(&a, "# A2").unwrap();
    assert!(timeout(Duration::from_millis(400), subscription.recv())
        .await
        .is_err());

    fs::write(&b, "# B2").unwrap();
    let signal = timeout(WAIT, subscription.recv()).await.unwrap().unwrap();
    assert_eq!(signal.watcher, WatcherId(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn open_of_missing_file_keeps_current_document() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.md");
    fs::write(&a, "# A").unwrap();

    let engine = start(Some(a.clone()));
    let err = engine.open(temp.path().join("nope.md")).unwrap_err();

    assert!(matches!(err, EngineError::Watch(WatchError::PathNotFound(_))));
    assert_eq!(engine.document(), Some(a));
    assert!(matches!(
        &*engine.watch_status().borrow(),
        WatchStatus::Watching { watcher: WatcherId(1), .. }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn removed_document_reports_lost_watch() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.md");
    fs::write(&a, "# A").unwrap();

    let engine = start(Some(a.clone()));
    let mut status = engine.watch_status();
    fs::remove_file(&a).unwrap();

    timeout(
        WAIT,
        status.wait_for(|s| matches!(s, WatchStatus::Lost { .. })),
    )
    .await
    .expect("timed out waiting for the watch to be lost")
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn without_document_content_is_empty() {
    let engine = start(None);

    assert_eq!(&*engine.cache().get().await.unwrap().content, "");
    assert_eq!(*engine.watch_status().borrow(), WatchStatus::Inactive);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_ends_subscriptions() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.md");
    fs::write(&a, "# A").unwrap();

    let engine = start(Some(a));
    let mut subscription = engine.subscribe();
    engine.shutdown();

    assert_eq!(timeout(WAIT, subscription.recv()).await.unwrap(), None);
    assert_eq!(*engine.watch_status().borrow(), WatchStatus::Inactive);
    assert_eq!(engine.notifier().subscriber_count(), 0);
}

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use mdviewer_engine::{DocumentReader, ReadError};
use tokio::sync::oneshot;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(mdviewer_logging::initialize_for_tests);
}

pub type Reply = oneshot::Sender<Result<String, ReadError>>;

/// Reader whose reads complete only when the test says so.
///
/// Each read takes the oldest reply registered with [`ScriptedReader::expect`].
#[derive(Default)]
pub struct ScriptedReader {
    replies: Mutex<VecDeque<oneshot::Receiver<Result<String, ReadError>>>>,
    started: AtomicUsize,
}

impl ScriptedReader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers the reply channel for the next read.
    pub fn expect(&self) -> Reply {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(rx);
        tx
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DocumentReader for ScriptedReader {
    async fn read_document(&self) -> Result<String, ReadError> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("read without a registered reply");
        self.started.fetch_add(1, Ordering::SeqCst);
        reply
            .await
            .unwrap_or_else(|_| Err(ReadError::FileNotFound(PathBuf::from("dropped"))))
    }
}

pub fn missing(path: &str) -> Result<String, ReadError> {
    Err(ReadError::FileNotFound(PathBuf::from(path)))
}

/// Polls `cond` until it holds, panicking after two seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

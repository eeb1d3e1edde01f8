//! In-memory object store double for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::Bytes;

use super::client::ObjectStore;
use super::error::StoreError;

/// One recorded call to [`ObjectStore::put_object`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedPut {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Counts calls and fails the first `failures` of them.
#[derive(Debug, Default)]
pub(crate) struct MockStore {
    calls: AtomicU32,
    failures: u32,
    latency: Option<Duration>,
    puts: Mutex<Vec<RecordedPut>>,
}

impl MockStore {
    pub(crate) fn succeeding() -> Self {
        Self::failing_first(0)
    }

    pub(crate) fn failing_first(failures: u32) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().expect("lock poisoned").clone()
    }
}

impl ObjectStore for MockStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.puts.lock().expect("lock poisoned").push(RecordedPut {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            content_type: content_type.map(String::from),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if call <= self.failures {
            return Err(StoreError::operation(format!("injected failure {call}")));
        }
        Ok(())
    }
}

//! In-process remote store.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    validate_payload, RemoteDocument, RemoteDocumentClient, RemoteError, RemoteFile, RemoteResult,
};

/// Remote documents held in memory.
///
/// Counts reads and writes, can queue failures for upcoming calls and can
/// delay every call, which makes it suitable for exercising the sync engine
/// without a network.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    documents: Mutex<HashMap<String, BTreeMap<String, String>>>,
    read_failures: Mutex<VecDeque<RemoteError>>,
    write_failures: Mutex<VecDeque<RemoteError>>,
    latency: Mutex<Option<Duration>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document so reads of its files report missing files
    /// rather than a missing document.
    pub fn create_document(&self, document_id: &str) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(document_id.to_string())
            .or_default();
    }

    /// Set a file's content directly, bypassing counters and failures.
    pub fn put_file(&self, document_id: &str, file_name: &str, content: impl Into<String>) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(document_id.to_string())
            .or_default()
            .insert(file_name.to_string(), content.into());
    }

    pub fn file(&self, document_id: &str, file_name: &str) -> Option<String> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(document_id)
            .and_then(|files| files.get(file_name).cloned())
    }

    /// Fail the next read (fetch or file read) with `error`.
    ///
    /// Queued failures are consumed in order, one per call.
    pub fn fail_next_read(&self, error: RemoteError) {
        self.read_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Fail the next write with `error`.
    pub fn fail_next_write(&self, error: RemoteError) {
        self.write_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn enter_call(&self, failures: &Mutex<VecDeque<RemoteError>>) -> RemoteResult<()> {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let failure = failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        failure.map_or(Ok(()), Err)
    }

    fn files(&self, document_id: &str) -> RemoteResult<BTreeMap<String, String>> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(document_id)
            .cloned()
            .ok_or_else(|| RemoteError::not_found(format!("Document {document_id} not found")))
    }
}

#[async_trait]
impl RemoteDocumentClient for InMemoryRemote {
    async fn fetch_document(&self, document_id: &str) -> RemoteResult<RemoteDocument> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.enter_call(&self.read_failures).await?;
        let files = self
            .files(document_id)?
            .into_iter()
            .map(|(name, content)| {
                let file = RemoteFile {
                    size: content.len() as u64,
                    content: Some(content),
                    raw_url: None,
                    truncated: false,
                };
                (name, file)
            })
            .collect();
        Ok(RemoteDocument { files })
    }

    async fn read_file(&self, document_id: &str, file_name: &str) -> RemoteResult<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.enter_call(&self.read_failures).await?;
        self.files(document_id)?
            .remove(file_name)
            .ok_or_else(|| RemoteError::file_not_found(document_id, file_name))
    }

    async fn write_file(
        &self,
        document_id: &str,
        file_name: &str,
        content: &str,
    ) -> RemoteResult<()> {
        validate_payload(file_name, content)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.enter_call(&self.write_failures).await?;
        self.put_file(document_id, file_name, content);
        Ok(())
    }
}

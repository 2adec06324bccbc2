//! Remote document transport.
//!
//! A remote document is a set of named text files addressed by an opaque id
//! (a GitHub Gist). The sync engine only needs to read and replace one file
//! at a time; everything else about the store is hidden behind
//! [`RemoteDocumentClient`].

mod gist;
mod memory;

pub use gist::{GistClient, DEFAULT_API_BASE};
pub use memory::InMemoryRemote;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// Category of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    Network,
    Auth,
    NotFound,
    RateLimit,
    Validation,
    Unknown,
}

impl RemoteErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Auth => "auth",
            Self::NotFound => "not-found",
            Self::RateLimit => "rate-limit",
            Self::Validation => "validation",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a later attempt can succeed without a code or data change.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Auth | Self::RateLimit)
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Typed failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Remote {kind} error: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
    pub retryable: bool,
    /// The document exists but lacks the requested file. A `not-found`
    /// without this flag means the document itself is gone or hidden.
    pub missing_file: bool,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
            missing_file: false,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Auth, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn file_not_found(document_id: &str, file_name: &str) -> Self {
        Self {
            missing_file: true,
            ..Self::not_found(format!("File {file_name} not found in {document_id}"))
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::RateLimit, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Validation, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unknown, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RemoteErrorKind::NotFound
    }

    /// Whether only a file is missing, so writing it would create it.
    pub fn is_missing_file(&self) -> bool {
        self.is_not_found() && self.missing_file
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// One file of a remote document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteFile {
    /// Inline content. May be missing or cut short when `truncated` is set.
    pub content: Option<String>,
    /// Where the full content can be fetched.
    pub raw_url: Option<String>,
    pub size: u64,
    pub truncated: bool,
}

/// Listing of a remote document's files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteDocument {
    pub files: BTreeMap<String, RemoteFile>,
}

/// Read and replace files of a remote document.
#[async_trait]
pub trait RemoteDocumentClient: Send + Sync {
    async fn fetch_document(&self, document_id: &str) -> RemoteResult<RemoteDocument>;

    /// Full content of one file. A missing file is a `not-found` error.
    async fn read_file(&self, document_id: &str, file_name: &str) -> RemoteResult<String>;

    /// Replace (or create) one file.
    async fn write_file(
        &self,
        document_id: &str,
        file_name: &str,
        content: &str,
    ) -> RemoteResult<()>;
}

/// Reject payloads the remote store would refuse.
pub fn validate_payload(file_name: &str, content: &str) -> RemoteResult<()> {
    if file_name.trim().is_empty() {
        return Err(RemoteError::validation("File name must not be empty"));
    }
    if content.trim().is_empty() {
        return Err(RemoteError::validation(format!(
            "Refusing to write empty content to {file_name}"
        )));
    }
    Ok(())
}

//! GitHub Gist implementation of [`RemoteDocumentClient`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{
    validate_payload, RemoteDocument, RemoteDocumentClient, RemoteError, RemoteFile, RemoteResult,
};
use crate::auth::TokenProvider;
use crate::util::{error_excerpt, is_http_url};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("todosync/", env!("CARGO_PKG_VERSION"));
const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Clone)]
pub struct GistClient {
    base_url: String,
    client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl GistClient {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> RemoteResult<Self> {
        Self::with_base_url(DEFAULT_API_BASE, tokens)
    }

    /// Client for a GitHub-compatible API at `base_url`.
    pub fn with_base_url(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> RemoteResult<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !is_http_url(&base_url) {
            return Err(RemoteError::validation(
                "API base URL must include http:// or https://",
            ));
        }
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| RemoteError::unknown(format!("Failed to build HTTP client: {error}")))?;
        Ok(Self {
            base_url,
            client,
            tokens,
        })
    }

    fn gist_url(&self, document_id: &str) -> RemoteResult<String> {
        let document_id = document_id.trim();
        if document_id.is_empty() {
            return Err(RemoteError::validation("Gist id must not be empty"));
        }
        Ok(format!("{}/gists/{}", self.base_url, document_id))
    }

    async fn bearer_token(&self) -> RemoteResult<String> {
        self.tokens
            .token()
            .await
            .ok_or_else(|| RemoteError::auth("Not signed in: no GitHub token available"))
    }

    async fn fetch_raw(&self, raw_url: &str) -> RemoteResult<String> {
        tracing::debug!("Fetching truncated gist file from {}", raw_url);
        let response = self
            .client
            .get(raw_url)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }
        response.text().await.map_err(transport_error)
    }
}

#[async_trait]
impl RemoteDocumentClient for GistClient {
    async fn fetch_document(&self, document_id: &str) -> RemoteResult<RemoteDocument> {
        let url = self.gist_url(document_id)?;
        let token = self.bearer_token().await?;

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        let payload = response
            .json::<GistResponse>()
            .await
            .map_err(|error| RemoteError::unknown(format!("Invalid gist payload: {error}")))?;
        Ok(payload.into())
    }

    async fn read_file(&self, document_id: &str, file_name: &str) -> RemoteResult<String> {
        let mut document = self.fetch_document(document_id).await?;
        let file = document
            .files
            .remove(file_name)
            .ok_or_else(|| RemoteError::file_not_found(document_id, file_name))?;

        match (file.content, file.raw_url) {
            (Some(content), _) if !file.truncated => Ok(content),
            (_, Some(raw_url)) => self.fetch_raw(&raw_url).await,
            (Some(content), None) => {
                tracing::warn!(
                    "Gist file {} is truncated and has no raw URL; using partial content",
                    file_name
                );
                Ok(content)
            }
            (None, None) => Err(RemoteError::unknown(format!(
                "Gist file {file_name} has neither content nor raw URL"
            ))),
        }
    }

    async fn write_file(
        &self,
        document_id: &str,
        file_name: &str,
        content: &str,
    ) -> RemoteResult<()> {
        validate_payload(file_name, content)?;
        let url = self.gist_url(document_id)?;
        let token = self.bearer_token().await?;

        let body = json!({ "files": { file_name: { "content": content } } });
        let response = self
            .client
            .patch(&url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }
        tracing::debug!("Wrote {} bytes to gist file {}", content.len(), file_name);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GistResponse {
    #[serde(default)]
    files: BTreeMap<String, Option<GistFileResponse>>,
}

#[derive(Debug, Deserialize)]
struct GistFileResponse {
    content: Option<String>,
    raw_url: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    truncated: bool,
}

impl From<GistResponse> for RemoteDocument {
    fn from(value: GistResponse) -> Self {
        let files = value
            .files
            .into_iter()
            .filter_map(|(name, file)| {
                let file = file?;
                Some((
                    name,
                    RemoteFile {
                        content: file.content,
                        raw_url: file.raw_url,
                        size: file.size,
                        truncated: file.truncated,
                    },
                ))
            })
            .collect();
        Self { files }
    }
}

#[derive(Debug, Deserialize)]
struct GithubErrorBody {
    message: Option<String>,
}

fn transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_decode() {
        RemoteError::unknown(format!("Failed to decode response: {error}"))
    } else {
        RemoteError::network(format!("HTTP request failed: {error}"))
    }
}

async fn error_for_response(response: reqwest::Response) -> RemoteError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    classify_status(status, &headers, &body)
}

/// Map a non-success GitHub response to a typed error.
fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> RemoteError {
    let message = parse_api_error(status, body);
    let rate_limited = headers
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|remaining| remaining.trim() == "0");

    match status {
        StatusCode::TOO_MANY_REQUESTS => RemoteError::rate_limit(message),
        StatusCode::FORBIDDEN if rate_limited => RemoteError::rate_limit(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::auth(message),
        StatusCode::NOT_FOUND => RemoteError::not_found(message),
        StatusCode::UNPROCESSABLE_ENTITY => RemoteError::validation(message),
        status if status.is_server_error() => RemoteError::network(message),
        _ => RemoteError::unknown(message),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<GithubErrorBody>(body) {
        if let Some(message) = payload.message {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = error_excerpt(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

use std::future::Future;
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::page::PageContext;
use crate::query::SearchQuery;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "contributor-stats";

/// Errors from talking to the GitHub REST API.
///
/// None of these are retried automatically; the affected scope renders an
/// error state and other scopes carry on.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("access token is not set")]
    MissingToken,

    #[error("GitHub rejected the access token")]
    BadCredentials,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("GitHub API error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The slice of a search response the fetcher cares about: the total count
/// and, with `sort=created&order=asc&per_page=1`, the earliest item's number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchSlice {
    pub total_count: u64,
    pub first_number: Option<u64>,
}

/// Seam between the fetcher and the network, so tests can substitute a stub.
pub trait IssueSearch {
    fn search_issues(
        &self,
        query: &SearchQuery,
    ) -> impl Future<Output = Result<SearchSlice, ApiError>> + Send;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    number: u64,
}

#[derive(Clone)]
pub struct GithubClient {
    token: Arc<String>,
    http: Arc<Client>,
}

impl GithubClient {
    pub fn new(token: String) -> Self {
        Self {
            token: Arc::new(token),
            http: Arc::new(Client::new()),
        }
    }

    /// Authenticated GET returning the body as JSON, with the error payload
    /// fields (`message`, `errors`) checked before the body is trusted.
    async fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        tracing::debug!(%url, "GET");

        let resp = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let status = resp.status().as_u16();

        // Parse JSON even for non-2xx responses to capture error payloads.
        let json: Value = resp.json().await?;

        if let Some(message) = error_payload_message(&json) {
            return Err(classify_error(status, &message));
        }

        Ok(json)
    }

    /// Total count (and earliest item number) for one search query.
    pub async fn search_count(&self, query: &SearchQuery) -> Result<SearchSlice, ApiError> {
        let url = format!("{API_BASE}/search/issues?{}", query.query_string());
        let json = self.get_json(&url).await?;
        let parsed: SearchResponse =
            serde_json::from_value(json).map_err(|e| ApiError::Api(e.to_string()))?;

        Ok(SearchSlice {
            total_count: parsed.total_count,
            first_number: parsed.items.into_iter().next().map(|item| item.number),
        })
    }

    /// Check the token against `GET /user`. `Ok(false)` means GitHub rejected
    /// it; transport and other API failures propagate.
    pub async fn validate_token(&self) -> Result<bool, ApiError> {
        match self.get_json(&format!("{API_BASE}/user")).await {
            Ok(_) => Ok(true),
            Err(ApiError::BadCredentials) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl IssueSearch for GithubClient {
    async fn search_issues(&self, query: &SearchQuery) -> Result<SearchSlice, ApiError> {
        self.search_count(query).await
    }
}

impl PageContext for GithubClient {
    /// The author byline: `user.login` of the item itself. Issues and pull
    /// requests share the `/issues/{n}` endpoint.
    async fn first_contributor(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Option<String>, ApiError> {
        let url = format!("{API_BASE}/repos/{org}/{repo}/issues/{number}");
        let json = self.get_json(&url).await?;

        Ok(json
            .get("user")
            .and_then(|u| u.get("login"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn repo_is_private(&self, org: &str, repo: &str) -> Result<bool, ApiError> {
        let url = format!("{API_BASE}/repos/{org}/{repo}");
        let json = self.get_json(&url).await?;

        Ok(json.get("private").and_then(Value::as_bool).unwrap_or(false))
    }
}

/// First message found in an error payload: the top-level `message` field, or
/// the first entry of the `errors` array. A healthy response carries neither.
fn error_payload_message(json: &Value) -> Option<String> {
    if let Some(message) = json.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }

    json.get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .map(|err| {
            err.get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown API error")
                .to_string()
        })
}

fn classify_error(status: u16, message: &str) -> ApiError {
    if status == 401 || message.contains("Bad credentials") {
        ApiError::BadCredentials
    } else if message.to_ascii_lowercase().contains("rate limit") {
        ApiError::RateLimited(message.to_string())
    } else {
        ApiError::Api(message.to_string())
    }
}

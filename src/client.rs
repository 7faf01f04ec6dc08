use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tracing::{debug, warn};

use crate::error::SyncError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("github-code-sync/", env!("CARGO_PKG_VERSION"));

/// Authenticated access to the GitHub REST and GraphQL endpoints.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    token: String,
    api_base: Url,
}

impl GitHubClient {
    /// Create a client for `api_base` (`https://api.github.com`, or a GitHub
    /// Enterprise `/api/v3` root).
    pub fn new(token: impl Into<String>, api_base: &str) -> Result<Self, SyncError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| SyncError::InvalidApiUrl(format!("{}: {}", api_base, e)))?;
        if api_base.cannot_be_a_base() {
            return Err(SyncError::InvalidApiUrl(api_base.to_string()));
        }

        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(GitHubClient {
            client,
            token: token.into(),
            api_base,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// The GraphQL endpoint. GitHub Enterprise serves REST under `/api/v3`
    /// and GraphQL under `/api/graphql`.
    pub fn graphql_url(&self) -> Url {
        let enterprise = self
            .api_base
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            == Some("v3");

        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            if enterprise {
                segments.pop();
            }
            segments.push("graphql");
        }
        url
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.authorized(self.client.get(url))
    }

    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        self.authorized(self.client.post(url))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

/// Sort a response into auth failure, rate limit, something unreadable, or
/// a JSON body worth parsing.
pub(crate) fn check_response(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    let headers = response.headers();
    log_rate_limit(headers);

    match status {
        StatusCode::UNAUTHORIZED => return Err(SyncError::Unauthorized),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            let reset = parse_rate_limit_reset(headers);
            let exhausted = quota_exhausted(headers);
            warn!(
                "Rate limited ({}), reset at {:?}, quota exhausted: {}",
                status, reset, exhausted
            );
            return Err(SyncError::RateLimited { reset, exhausted });
        }
        _ => {}
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let is_json = content_type
        .as_deref()
        .is_some_and(|ct| ct.contains("json"));

    if !status.is_success() || !is_json {
        return Err(SyncError::UnexpectedResponse {
            status: status.as_u16(),
            content_type,
        });
    }

    Ok(response)
}

/// `x-ratelimit-reset` holds epoch seconds.
pub(crate) fn parse_rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// A primary limit reports `x-ratelimit-remaining: 0`; a secondary limit
/// sends `retry-after`.
pub(crate) fn quota_exhausted(headers: &HeaderMap) -> bool {
    let remaining_zero = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    remaining_zero || headers.contains_key("retry-after")
}

fn log_rate_limit(headers: &HeaderMap) {
    let read = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if let (Some(remaining), Some(limit)) =
        (read("x-ratelimit-remaining"), read("x-ratelimit-limit"))
    {
        debug!("Rate limit: {}/{}", remaining, limit);
    }
}

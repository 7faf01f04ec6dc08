use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::{check_response, GitHubClient};
use crate::error::SyncError;

/// One page of `GET /search/code`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<SearchResultItem>,
}

/// A file matched by code search. Carries no content yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchResultItem {
    pub path: String,
    #[serde(default)]
    pub score: f64,
    pub repository: Repository,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub fork: bool,
    pub owner: Owner,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Owner {
    pub login: String,
}

impl SearchResultItem {
    pub fn owner(&self) -> &str {
        &self.repository.owner.login
    }

    pub fn repo_name(&self) -> &str {
        &self.repository.name
    }

    pub fn is_fork(&self) -> bool {
        self.repository.fork
    }
}

impl GitHubClient {
    /// Fetch one page of code search results. No retries.
    pub async fn search(&self, url: &Url) -> Result<SearchResponse, SyncError> {
        debug!("Requesting URL: {}", url);
        let response = self.get(url.clone()).send().await?;
        let response = check_response(response)?;

        let page: SearchResponse = response.json().await?;
        if page.incomplete_results {
            warn!("Search timed out on GitHub's side; results may be incomplete");
        }
        info!(
            "Search matched {} files ({} on this page)",
            page.total_count,
            page.items.len()
        );
        Ok(page)
    }
}

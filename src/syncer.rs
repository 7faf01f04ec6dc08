use std::path::PathBuf;

use chrono::Utc;
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use std::env;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use crate::client::GitHubClient;
use crate::error::SyncError;
use crate::query::{build_search_url, page_of, with_page, SearchQualifiers, PER_PAGE};
use crate::writer::write_matches;
use crate::Args;

/// Consecutive rate-limit waits on one page before giving up.
const MAX_RATE_LIMIT_WAITS: u32 = 3;

/// Everything needed to sync one page.
#[derive(Debug, Clone)]
pub struct PageSyncConfig {
    pub output_dir: PathBuf,
    pub search_url: Url,
    /// Overrides the `page` parameter of `search_url` when set.
    pub page: Option<u32>,
}

/// Outcome of a successful page sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page: u32,
    pub remaining: u32,
    pub total: u32,
    pub matched: usize,
    pub written: usize,
}

/// `ceil(total_count / 100)`.
pub fn total_pages(total_count: u64) -> u32 {
    let pages = total_count.div_ceil(u64::from(PER_PAGE));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Search, fetch contents, write. Stops at the first error; the content
/// lookup and the writer never run after a failed search.
pub async fn sync_page(
    client: &GitHubClient,
    config: &PageSyncConfig,
) -> Result<PageProgress, SyncError> {
    let url = match config.page {
        Some(page) => with_page(&config.search_url, page),
        None => config.search_url.clone(),
    };
    let page = config.page.or_else(|| page_of(&url)).unwrap_or(1);

    let results = client.search(&url).await?;
    let contents = client.fetch_contents(&results.items).await?;
    let written = write_matches(&config.output_dir, &results.items, &contents).await?;

    let total = total_pages(results.total_count);
    let progress = PageProgress {
        page,
        remaining: total.saturating_sub(page),
        total,
        matched: results.items.len(),
        written,
    };
    info!(
        "Page {}/{}: wrote {} of {} matched files",
        progress.page, progress.total, progress.written, progress.matched
    );
    Ok(progress)
}

/// Totals for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub pages: u32,
    pub files_written: usize,
    pub total_pages: u32,
}

/// Drives `sync_page` across pages for the command line.
pub struct CodeSyncer {
    client: GitHubClient,
    search_url: Url,
    output_dir: PathBuf,
    start_page: u32,
    max_pages: u32,
    wait_on_rate_limit: bool,
}

impl CodeSyncer {
    /// Create a new CodeSyncer instance
    pub fn new(args: &Args) -> Result<Self, SyncError> {
        // Get GitHub API token from arguments or environment
        let token = match &args.token {
            Some(t) if !t.trim().is_empty() => t.clone(),
            _ => {
                dotenv().ok();
                match env::var("GITHUB_TOKEN") {
                    Ok(token) if !token.trim().is_empty() => token,
                    _ => {
                        error!("GitHub token not provided or found in environment");
                        return Err(SyncError::MissingToken);
                    }
                }
            }
        };

        let qualifiers: SearchQualifiers = args.qualifiers();
        if qualifiers.is_empty() {
            return Err(SyncError::NoQualifiers);
        }

        let client = GitHubClient::new(token, &args.api_url)?;
        let search_url = build_search_url(client.api_base(), &qualifiers);
        debug!("Search query: {}", qualifiers.to_query_string());

        Ok(CodeSyncer {
            client,
            search_url,
            output_dir: args.output.clone(),
            start_page: args.page.unwrap_or(1).max(1),
            max_pages: args.max_pages.max(1),
            wait_on_rate_limit: args.wait_on_rate_limit,
        })
    }

    /// Sync pages until none remain or the page budget is spent.
    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(Duration::from_millis(80));

        let result = self.sync_pages(&pb).await;
        match &result {
            Ok(summary) => pb.finish_with_message(format!(
                "✓ Synced {} page(s), {} file(s)",
                summary.pages, summary.files_written
            )),
            Err(_) => pb.abandon_with_message("✗ Sync failed"),
        }
        result
    }

    async fn sync_pages(&self, pb: &ProgressBar) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::default();
        let mut page = self.start_page;
        let mut waits = 0;

        loop {
            pb.set_message(format!("Syncing page {}", page));
            let config = PageSyncConfig {
                output_dir: self.output_dir.clone(),
                search_url: self.search_url.clone(),
                page: Some(page),
            };

            let progress = match sync_page(&self.client, &config).await {
                Ok(progress) => progress,
                // Code search serves at most 1000 results; later pages are 422.
                Err(SyncError::UnexpectedResponse { status: 422, .. }) if summary.pages > 0 => {
                    warn!("Reached search limit at page {}", page);
                    break;
                }
                Err(e) => match e.retry_at() {
                    Some(reset) if self.wait_on_rate_limit && waits < MAX_RATE_LIMIT_WAITS => {
                        waits += 1;
                        let wait_secs = (reset - Utc::now()).num_seconds().max(0) as u64 + 1;
                        warn!("Rate limit reached. Waiting {} seconds...", wait_secs);
                        pb.set_message(format!("Rate limited - waiting {}s", wait_secs));
                        tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                        continue;
                    }
                    _ => {
                        error!("Error syncing page {}: {}", page, e);
                        return Err(e);
                    }
                },
            };
            waits = 0;

            summary.pages += 1;
            summary.files_written += progress.written;
            summary.total_pages = progress.total;

            if progress.remaining == 0 {
                debug!("No more pages after {}", page);
                break;
            }
            if summary.pages >= self.max_pages {
                info!(
                    "Max page limit reached (limit: {}), {} page(s) remaining",
                    self.max_pages, progress.remaining
                );
                break;
            }
            page += 1;
        }

        Ok(summary)
    }
}

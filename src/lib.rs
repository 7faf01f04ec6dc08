//! # GitHub Code Sync
//!
//! A Rust library for mirroring GitHub code search results to disk: search by
//! qualifiers, fetch every matched file's text in one batched GraphQL query
//! per page, and write the files into a flat directory.
//!
//! ## Main Components
//!
//! - [`SearchQualifiers`] and [`build_search_url`]: turn qualifiers into a search URL
//! - [`GitHubClient`]: code search and batched content lookup
//! - [`write_matches`]: writes `{owner}_{repo}_{path}` files
//! - [`sync_page`]: search, fetch and write one page
//! - [`CodeSyncer`]: walks pages for the command line, driven by [`Args`]
//!
//! ## Example
//!
//! ```no_run
//! use github_code_sync::{sync_page, GitHubClient, PageSyncConfig, Qualifier, SearchQualifiers};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = GitHubClient::new("ghp_example", "https://api.github.com")?;
//!
//!     let mut qualifiers = SearchQualifiers::new();
//!     qualifiers.push(Qualifier::Extension, "sql");
//!     qualifiers.push(Qualifier::Org, "rust-lang");
//!
//!     let config = PageSyncConfig {
//!         output_dir: "out".into(),
//!         search_url: github_code_sync::build_search_url(client.api_base(), &qualifiers),
//!         page: None,
//!     };
//!     let progress = sync_page(&client, &config).await?;
//!     println!("{} page(s) left of {}", progress.remaining, progress.total);
//!
//!     Ok(())
//! }
//! ```

mod args;
mod client;
mod contents;
mod error;
mod query;
mod search;
mod syncer;
mod writer;

pub use crate::args::Args;
pub use crate::client::{GitHubClient, DEFAULT_API_URL};
pub use crate::contents::{BlobNode, ContentLookupKey, ContentsQuery, RepositoryNode};
pub use crate::error::SyncError;
pub use crate::query::{build_search_url, with_page, Qualifier, SearchQualifiers, PER_PAGE};
pub use crate::search::{Owner, Repository, SearchResponse, SearchResultItem};
pub use crate::syncer::{
    sync_page, total_pages, CodeSyncer, PageProgress, PageSyncConfig, SyncSummary,
};
pub use crate::writer::{flat_file_name, write_matches};

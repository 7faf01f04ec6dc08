use std::path::PathBuf;

use clap::Parser;

use crate::client::DEFAULT_API_URL;
use crate::query::{Qualifier, SearchQualifiers};

/// GitHub Code Sync: search GitHub code by qualifiers and save every matched
/// file into one flat local directory.
#[derive(Parser, Debug, Clone)]
#[clap(
    author,
    version,
    about,
    long_about = "Search GitHub code with qualifiers such as extension, language or org, fetch the text of every matched file in one batched GraphQL query per page, and write each file as {owner}_{repo}_{path_with_underscores} into the output directory."
)]
pub struct Args {
    /// File extension to match (repeatable).
    #[clap(short, long, value_name = "EXT")]
    pub extension: Vec<String>,

    /// File name to match (repeatable).
    #[clap(short, long, value_name = "NAME")]
    pub filename: Vec<String>,

    /// Where to look for terms, e.g. `file` or `path` (repeatable).
    #[clap(long = "in", value_name = "WHERE")]
    pub in_: Vec<String>,

    /// Programming language (repeatable).
    #[clap(short, long, value_name = "LANG")]
    pub language: Vec<String>,

    /// Organization owning the repositories (repeatable).
    #[clap(long, value_name = "ORG")]
    pub org: Vec<String>,

    /// Path prefix or glob inside the repositories (repeatable).
    #[clap(long, value_name = "PATH")]
    pub path: Vec<String>,

    /// Repository as `owner/name` (repeatable).
    #[clap(short, long, value_name = "OWNER/NAME")]
    pub repo: Vec<String>,

    /// File size range in bytes, e.g. `>1000` or `100..200` (repeatable).
    #[clap(short, long, value_name = "RANGE")]
    pub size: Vec<String>,

    /// User owning the repositories (repeatable).
    #[clap(short, long, value_name = "USER")]
    pub user: Vec<String>,

    /// Directory that receives the matched files.
    #[clap(short, long, required = true)]
    pub output: PathBuf,

    /// First page to sync. Each page contains up to 100 results.
    #[clap(short, long, value_name = "NUM")]
    pub page: Option<u32>,

    /// Maximum number of pages to sync in this run.
    #[clap(short = 'm', long, value_name = "NUM", default_value = "1")]
    pub max_pages: u32,

    /// GitHub API token for authentication. Falls back to GITHUB_TOKEN.
    #[clap(short, long)]
    pub token: Option<String>,

    /// GitHub API root. Point at `https://HOST/api/v3` for GitHub Enterprise.
    #[clap(long, value_name = "URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Sleep until the rate limit resets and retry, instead of exiting.
    #[clap(short, long)]
    pub wait_on_rate_limit: bool,
}

impl Args {
    /// Collect the qualifier flags, in a fixed order.
    pub fn qualifiers(&self) -> SearchQualifiers {
        let mut qualifiers = SearchQualifiers::new();
        qualifiers.extend(Qualifier::Extension, &self.extension);
        qualifiers.extend(Qualifier::Filename, &self.filename);
        qualifiers.extend(Qualifier::In, &self.in_);
        qualifiers.extend(Qualifier::Language, &self.language);
        qualifiers.extend(Qualifier::Org, &self.org);
        qualifiers.extend(Qualifier::Path, &self.path);
        qualifiers.extend(Qualifier::Repo, &self.repo);
        qualifiers.extend(Qualifier::Size, &self.size);
        qualifiers.extend(Qualifier::User, &self.user);
        qualifiers
    }
}

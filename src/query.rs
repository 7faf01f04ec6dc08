use std::fmt;

use reqwest::Url;

/// Results per page. Also the GitHub maximum for code search.
pub const PER_PAGE: u32 = 100;

/// Search qualifiers understood by the GitHub code search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Extension,
    Filename,
    In,
    Language,
    Org,
    Path,
    Repo,
    Size,
    User,
}

impl Qualifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::Extension => "extension",
            Qualifier::Filename => "filename",
            Qualifier::In => "in",
            Qualifier::Language => "language",
            Qualifier::Org => "org",
            Qualifier::Path => "path",
            Qualifier::Repo => "repo",
            Qualifier::Size => "size",
            Qualifier::User => "user",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualifier values in first-insertion order. Every qualifier holds a list,
/// so one, two or twenty `--extension` flags all look the same here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQualifiers {
    entries: Vec<(Qualifier, Vec<String>)>,
}

impl SearchQualifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value to a qualifier.
    pub fn push(&mut self, qualifier: Qualifier, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(q, _)| *q == qualifier) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((qualifier, vec![value])),
        }
    }

    /// Append several values to a qualifier, keeping their order.
    pub fn extend<I, S>(&mut self, qualifier: Qualifier, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.push(qualifier, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, values)| values.is_empty())
    }

    /// The `q` parameter: one `name:value` token per value, space separated.
    pub fn to_query_string(&self) -> String {
        self.entries
            .iter()
            .flat_map(|(q, values)| values.iter().map(move |v| format!("{}:{}", q, v)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Build the code search URL for page 1 under `api_base`.
pub fn build_search_url(api_base: &Url, qualifiers: &SearchQualifiers) -> Url {
    let mut url = api_base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(["search", "code"]);
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("q", &qualifiers.to_query_string())
        .append_pair("per_page", &PER_PAGE.to_string())
        .append_pair("page", "1");
    url
}

/// Replace the `page` parameter, leaving every other parameter in place.
pub fn with_page(url: &Url, page: u32) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = url.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (k, v) in &pairs {
            query.append_pair(k, v);
        }
        query.append_pair("page", &page.to_string());
    }
    url
}

/// The `page` parameter of a search URL, if it has one.
pub fn page_of(url: &Url) -> Option<u32> {
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
}

//! Batched file content lookup.
//!
//! Every matched file becomes one aliased `repository { object }` selection
//! in a single GraphQL document, so a page of up to 100 files costs one
//! round trip. Aliases are fresh per request and are read back in item order.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::{check_response, GitHubClient};
use crate::error::SyncError;
use crate::search::SearchResultItem;

/// Correlates one item with its aliased selection in a batched query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentLookupKey(String);

impl ContentLookupKey {
    /// GraphQL aliases can't start with a digit, hence the prefix.
    pub fn generate() -> Self {
        ContentLookupKey(format!("f_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentLookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A GraphQL document plus the keys it was built with, in item order.
#[derive(Debug, Clone)]
pub struct ContentsQuery {
    pub keys: Vec<ContentLookupKey>,
    pub document: String,
}

impl ContentsQuery {
    pub fn build(items: &[SearchResultItem]) -> Self {
        let keys: Vec<ContentLookupKey> =
            items.iter().map(|_| ContentLookupKey::generate()).collect();

        let fragments: Vec<String> = keys
            .iter()
            .zip(items)
            .map(|(key, item)| {
                format!(
                    "{}: repository(owner: {}, name: {}) {{ object(expression: {}) {{ ... on Blob {{ text }} }} }}",
                    key,
                    string_literal(item.owner()),
                    string_literal(item.repo_name()),
                    string_literal(&format!("HEAD:{}", item.path)),
                )
            })
            .collect();

        ContentsQuery {
            keys,
            document: format!("query {{ {} }}", fragments.join(" ")),
        }
    }

    /// Read each key's blob text back in item order.
    pub fn demultiplex(
        &self,
        data: &HashMap<String, Option<RepositoryNode>>,
    ) -> Vec<Option<String>> {
        self.keys
            .iter()
            .map(|key| {
                data.get(key.as_str())
                    .and_then(Option::as_ref)
                    .and_then(|repo| repo.object.as_ref())
                    .and_then(|blob| blob.text.clone())
            })
            .collect()
    }
}

/// GraphQL string literal escaping is a subset of JSON's.
fn string_literal(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<HashMap<String, Option<RepositoryNode>>>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryNode {
    pub object: Option<BlobNode>,
}

/// `text` is absent for non-blob objects and null for binary or oversized blobs.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobNode {
    #[serde(default)]
    pub text: Option<String>,
}

impl GitHubClient {
    /// Fetch the text of every item at `HEAD`, positionally aligned with
    /// `items`. Missing files come back as `None`.
    pub async fn fetch_contents(
        &self,
        items: &[SearchResultItem],
    ) -> Result<Vec<Option<String>>, SyncError> {
        if items.is_empty() {
            debug!("No items on this page, skipping content lookup");
            return Ok(Vec::new());
        }

        let query = ContentsQuery::build(items);
        debug!(
            "Fetching {} files in one query ({} bytes)",
            query.keys.len(),
            query.document.len()
        );

        let response = self
            .post(self.graphql_url())
            .json(&json!({ "query": query.document }))
            .send()
            .await?;
        let response = check_response(response)?;
        let body: GraphQlResponse = response.json().await?;

        let data = match body.data {
            Some(data) => data,
            None => {
                let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
                return Err(SyncError::GraphQl(if messages.is_empty() {
                    "response had no data".to_string()
                } else {
                    messages.join("; ")
                }));
            }
        };
        for error in &body.errors {
            warn!("GraphQL: {}", error.message);
        }

        Ok(query.demultiplex(&data))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::Value;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    pub(crate) fn item(owner: &str, repo: &str, path: &str) -> SearchResultItem {
        serde_json::from_value(json!({
            "path": path,
            "score": 1.0,
            "repository": { "name": repo, "fork": false, "owner": { "login": owner } }
        }))
        .unwrap()
    }

    /// Aliases in the order they appear in a batched query.
    pub(crate) fn aliases(document: &str) -> Vec<String> {
        let pieces: Vec<&str> = document.split(": repository(").collect();
        pieces[..pieces.len() - 1]
            .iter()
            .filter_map(|piece| {
                piece
                    .rsplit(|c: char| c.is_whitespace() || c == '{')
                    .next()
                    .map(str::to_string)
            })
            .collect()
    }

    /// Answers a batched query with `texts[i]` for the i-th alias. `None`
    /// plays a deleted file.
    pub(crate) fn respond_with_texts(
        texts: Vec<Option<&'static str>>,
    ) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
        move |request: &Request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let document = body["query"].as_str().unwrap();

            let mut data = serde_json::Map::new();
            for (alias, text) in aliases(document).into_iter().zip(&texts) {
                let node = match text {
                    Some(text) => json!({ "object": { "text": text } }),
                    None => json!({ "object": null }),
                };
                data.insert(alias, node);
            }
            ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
        }
    }

    #[test]
    fn test_keys_are_unique_and_valid_aliases() {
        let items = vec![item("a", "b", "x.sql"), item("a", "b", "y.sql")];
        let query = ContentsQuery::build(&items);

        assert_eq!(query.keys.len(), 2);
        assert_ne!(query.keys[0], query.keys[1]);
        for key in &query.keys {
            assert!(key.as_str().starts_with("f_"));
            assert!(key
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }

    #[test]
    fn test_keys_are_fresh_per_request() {
        let items = vec![item("a", "b", "x.sql")];
        let first = ContentsQuery::build(&items);
        let second = ContentsQuery::build(&items);
        assert_ne!(first.keys, second.keys);
    }

    #[test]
    fn test_query_document_shape() {
        let items = vec![item("octo", "cat", "db/init.sql")];
        let query = ContentsQuery::build(&items);

        let expected = format!(
            "query {{ {}: repository(owner: \"octo\", name: \"cat\") {{ object(expression: \"HEAD:db/init.sql\") {{ ... on Blob {{ text }} }} }} }}",
            query.keys[0]
        );
        assert_eq!(query.document, expected);
        assert_eq!(aliases(&query.document), vec![query.keys[0].to_string()]);
    }

    #[test]
    fn test_query_escapes_string_arguments() {
        let items = vec![item("o", "r", "weird \"name\"\\.sql")];
        let query = ContentsQuery::build(&items);
        assert!(query
            .document
            .contains(r#"expression: "HEAD:weird \"name\"\\.sql""#));
    }

    #[test]
    fn test_demultiplex_in_item_order() {
        let items = vec![
            item("o", "r", "a.sql"),
            item("o", "r", "b.sql"),
            item("o", "gone", "c.sql"),
            item("o", "r", "d.png"),
        ];
        let query = ContentsQuery::build(&items);

        let data: HashMap<String, Option<RepositoryNode>> = serde_json::from_value(json!({
            query.keys[1].as_str(): { "object": { "text": "B" } },
            query.keys[0].as_str(): { "object": { "text": "A" } },
            query.keys[2].as_str(): null,
            query.keys[3].as_str(): { "object": { "text": null } },
        }))
        .unwrap();

        assert_eq!(
            query.demultiplex(&data),
            vec![Some("A".to_string()), Some("B".to_string()), None, None]
        );
    }

    #[tokio::test]
    async fn test_fetch_contents_single_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(respond_with_texts(vec![Some("select 1;"), None, Some("")]))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::new("t", &server.uri()).unwrap();
        let items = vec![
            item("o", "r", "a.sql"),
            item("o", "r", "deleted.sql"),
            item("o", "r", "empty.sql"),
        ];
        let contents = client.fetch_contents(&items).await.unwrap();

        assert_eq!(
            contents,
            vec![Some("select 1;".to_string()), None, Some(String::new())]
        );
    }

    #[tokio::test]
    async fn test_fetch_contents_empty_page_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = GitHubClient::new("t", &server.uri()).unwrap();
        let contents = client.fetch_contents(&[]).await.unwrap();
        assert!(contents.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_contents_errors_without_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "Something went wrong" }]
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new("t", &server.uri()).unwrap();
        match client.fetch_contents(&[item("o", "r", "a.sql")]).await {
            Err(SyncError::GraphQl(msg)) => assert_eq!(msg, "Something went wrong"),
            other => panic!("Expected GraphQl error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_contents_partial_errors_keep_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(|request: &Request| {
                let body: Value = serde_json::from_slice(&request.body).unwrap();
                let alias = aliases(body["query"].as_str().unwrap()).remove(0);
                ResponseTemplate::new(200).set_body_json(json!({
                    "data": { alias: null },
                    "errors": [{ "type": "NOT_FOUND", "message": "Could not resolve to a Repository" }]
                }))
            })
            .mount(&server)
            .await;

        let client = GitHubClient::new("t", &server.uri()).unwrap();
        let contents = client
            .fetch_contents(&[item("o", "missing", "a.sql")])
            .await
            .unwrap();
        assert_eq!(contents, vec![None]);
    }

    #[tokio::test]
    async fn test_fetch_contents_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-reset", "1700000000"))
            .mount(&server)
            .await;

        let client = GitHubClient::new("t", &server.uri()).unwrap();
        match client.fetch_contents(&[item("o", "r", "a.sql")]).await {
            Err(SyncError::RateLimited {
                reset: Some(reset), ..
            }) => {
                assert_eq!(reset.timestamp(), 1_700_000_000)
            }
            other => panic!("Expected RateLimited, got {:?}", other),
        }
    }
}

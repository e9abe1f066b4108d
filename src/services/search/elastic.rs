use super::{IndexedBook, MatchOp, SearchField, SearchIndex, SearchQuery};
use crate::{
    error::{ApiError, Result},
    models::BookId,
};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hits fetched per request while paging through a result set.
const PAGE_SIZE: usize = 1_000;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    sort: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    errors: bool,
}

/// Client for an Elasticsearch-compatible server.
#[derive(Debug, Clone)]
pub struct ElasticIndex {
    client: Client,
    base_url: String,
    index_name: String,
    page_size: usize,
}

impl ElasticIndex {
    pub fn new(
        base_url: &str,
        index_name: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("ApiKey {}", key))
                .map_err(|e| ApiError::InvalidInput(format!("search api key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index_name: index_name.to_string(),
            page_size: PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    async fn search_page(&self, body: &Value) -> Result<Vec<Hit>> {
        let response = self
            .client
            .post(format!("{}/{}/_search", self.base_url, self.index_name))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::ExternalServiceError(format!(
                "Search query failed: {}",
                error_text
            )));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.hits.hits)
    }

    /// Create the index with wildcard-typed text fields if it does not exist yet.
    pub async fn ensure_index(&self) -> Result<()> {
        let text = json!({ "type": "wildcard" });
        let mut properties = serde_json::Map::new();
        properties.insert("id".to_string(), json!({ "type": "long" }));
        for field in SearchField::ALL {
            properties.insert(field.as_str().to_string(), text.clone());
        }

        let response = self
            .client
            .put(format!("{}/{}", self.base_url, self.index_name))
            .json(&json!({ "mappings": { "properties": properties } }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                info!("Created search index '{}'", self.index_name);
                Ok(())
            }
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                if body.contains("resource_already_exists_exception") {
                    debug!("Search index '{}' already exists", self.index_name);
                    Ok(())
                } else {
                    Err(ApiError::ExternalServiceError(format!(
                        "Search index creation failed: {}",
                        body
                    )))
                }
            }
            status => Err(ApiError::ExternalServiceError(format!(
                "Search index creation failed with status {}",
                status
            ))),
        }
    }
}

/// Escape the wildcard metacharacters of a literal value.
fn escape_wildcard(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One page of a search sorted on `id`, continuing after the sort values of
/// the previous page's last hit.
fn search_body(query: &SearchQuery, size: usize, after: Option<&[Value]>) -> Value {
    let mut body = json!({
        "query": to_query_dsl(query),
        "_source": false,
        "size": size,
        "sort": [{ "id": "asc" }],
    });
    if let Some(after) = after {
        body["search_after"] = Value::from(after.to_vec());
    }
    body
}

/// Translate a predicate tree into the server's query DSL.
pub fn to_query_dsl(query: &SearchQuery) -> Value {
    match query {
        SearchQuery::Match(predicate) => {
            let literal = escape_wildcard(&predicate.value);
            let pattern = match predicate.op {
                MatchOp::Contains => format!("*{}*", literal),
                MatchOp::Exact => literal,
            };
            let field = predicate.field.as_str();
            json!({
                "wildcard": {
                    (field): { "value": pattern, "case_insensitive": true }
                }
            })
        }
        SearchQuery::Any(queries) if queries.is_empty() => json!({ "match_none": {} }),
        SearchQuery::Any(queries) => json!({
            "bool": {
                "should": queries.iter().map(to_query_dsl).collect::<Vec<_>>(),
                "minimum_should_match": 1
            }
        }),
        SearchQuery::All(queries) if queries.is_empty() => json!({ "match_all": {} }),
        SearchQuery::All(queries) => json!({
            "bool": { "must": queries.iter().map(to_query_dsl).collect::<Vec<_>>() }
        }),
    }
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    async fn query(&self, query: &SearchQuery) -> Result<Vec<BookId>> {
        let mut ids = Vec::new();
        let mut after: Option<Vec<Value>> = None;

        loop {
            let body = search_body(query, self.page_size, after.as_deref());
            let hits = self.search_page(&body).await?;
            let full_page = hits.len() == self.page_size;
            after = hits.last().map(|hit| hit.sort.clone());

            for hit in hits {
                match hit.id.parse::<BookId>() {
                    Ok(id) => ids.push(id),
                    Err(_) => warn!("Ignoring search hit with non-numeric id '{}'", hit.id),
                }
            }

            if !full_page {
                break;
            }
            if after.as_ref().map_or(true, |sort| sort.is_empty()) {
                warn!("Search hits carry no sort values, stopping after {} ids", ids.len());
                break;
            }
        }

        debug!("Search matched {} documents", ids.len());
        Ok(ids)
    }

    async fn upsert(&self, documents: &[IndexedBook]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut payload = String::new();
        for doc in documents {
            let action = json!({
                "index": { "_index": self.index_name, "_id": doc.id.to_string() }
            });
            payload.push_str(&action.to_string());
            payload.push('\n');
            payload.push_str(&serde_json::to_string(doc)?);
            payload.push('\n');
        }

        let response = self
            .client
            .post(format!("{}/_bulk", self.base_url))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::ExternalServiceError(format!(
                "Search bulk upsert failed: {}",
                error_text
            )));
        }

        let bulk: BulkResponse = response.json().await?;
        if bulk.errors {
            return Err(ApiError::ExternalServiceError(
                "Search bulk upsert reported item errors".to_string(),
            ));
        }

        debug!("Indexed {} documents", documents.len());
        Ok(())
    }

    async fn remove(&self, id: BookId) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/{}/_doc/{}", self.base_url, self.index_name, id))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            status => Err(ApiError::ExternalServiceError(format!(
                "Search delete failed with status {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::search::Predicate;

    #[test]
    fn test_escape_wildcard() {
        assert_eq!(escape_wildcard("a*b?c\\d"), "a\\*b\\?c\\\\d");
        assert_eq!(escape_wildcard("plain"), "plain");
    }

    #[test]
    fn test_contains_becomes_case_insensitive_wildcard() {
        let dsl = to_query_dsl(&SearchQuery::Match(Predicate::contains(
            SearchField::Author,
            "Herbert",
        )));
        assert_eq!(
            dsl,
            json!({ "wildcard": { "author": { "value": "*Herbert*", "case_insensitive": true } } })
        );
    }

    #[test]
    fn test_catalog_text_is_disjunction() {
        let dsl = to_query_dsl(&SearchQuery::catalog_text("dune"));
        let should = dsl["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), SearchField::ALL.len());
        assert_eq!(dsl["bool"]["minimum_should_match"], 1);
        assert!(should.iter().any(|clause| clause["wildcard"]["bio"].is_object()));
    }

    #[test]
    fn test_empty_combinators() {
        assert_eq!(to_query_dsl(&SearchQuery::Any(vec![])), json!({ "match_none": {} }));
        assert_eq!(to_query_dsl(&SearchQuery::All(vec![])), json!({ "match_all": {} }));
    }

    #[test]
    fn test_search_body_pages_on_id() {
        let query = SearchQuery::catalog_text("dune");

        let first = search_body(&query, 50, None);
        assert_eq!(first["size"], 50);
        assert_eq!(first["sort"], json!([{ "id": "asc" }]));
        assert!(first.get("search_after").is_none());

        let next = search_body(&query, 50, Some(&[json!(1234)]));
        assert_eq!(next["search_after"], json!([1234]));
        assert_eq!(next["query"], first["query"]);
    }

    #[tokio::test]
    async fn test_unreachable_server_fails() {
        let index = ElasticIndex::new("http://127.0.0.1:9", "books", None, Duration::from_secs(1))
            .unwrap();
        let result = index.query(&SearchQuery::catalog_text("dune")).await;
        assert!(result.is_err());
    }
}

//! Elasticsearch search backend

use super::{SearchBackend, SearchHit};
use crate::error::AgentError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub struct ElasticsearchBackend {
    client: Client,
    base_url: String,
    index: String,
}

impl ElasticsearchBackend {
    pub fn new(base_url: &str, index: &str, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        })
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    async fn search(&self, query: &str, limit: usize) -> crate::Result<Vec<SearchHit>> {
        let url = format!("{}/{}/_search", self.base_url, self.index);

        let response = self
            .client
            .post(&url)
            .json(&search_body(query, limit))
            .send()
            .await
            .map_err(|e| AgentError::Search(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, index = %self.index, "Elasticsearch returned an error");
            return Err(AgentError::Search(format!(
                "Elasticsearch returned {}: {}",
                status, body
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Search(format!("invalid search response: {}", e)))?;

        let hits = into_hits(parsed);
        debug!(index = %self.index, hits = hits.len(), "Elasticsearch query complete");

        Ok(hits)
    }
}

fn search_body(query: &str, limit: usize) -> Value {
    json!({
        "size": limit,
        "query": {
            "match": {
                "content": query
            }
        }
    })
}

/// Keep hits whose `_source.content` is a non-empty string
fn into_hits(response: SearchResponse) -> Vec<SearchHit> {
    response
        .hits
        .hits
        .into_iter()
        .filter_map(|hit| {
            let content = hit.source.get("content")?.as_str()?.trim().to_string();
            if content.is_empty() {
                return None;
            }
            Some(SearchHit {
                content,
                score: hit.score.unwrap_or(0.0),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_body() {
        let body = search_body("solar eclipse", 5);
        assert_eq!(body["size"], 5);
        assert_eq!(body["query"]["match"]["content"], "solar eclipse");
    }

    #[test]
    fn test_into_hits_skips_empty_content() {
        let response: SearchResponse = serde_json::from_value(json!({
            "took": 3,
            "hits": {
                "total": { "value": 3 },
                "hits": [
                    { "_id": "1", "_score": 2.5, "_source": { "content": "Totality lasts minutes." } },
                    { "_id": "2", "_score": 1.1, "_source": { "content": "   " } },
                    { "_id": "3", "_score": 0.9, "_source": { "title": "no content field" } }
                ]
            }
        }))
        .unwrap();

        let hits = into_hits(response);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "Totality lasts minutes.");
        assert_eq!(hits[0].score, 2.5);
    }

    #[tokio::test]
    async fn test_unreachable_backend_errors() {
        let backend =
            ElasticsearchBackend::new("http://127.0.0.1:1", "documents", Duration::from_millis(200))
                .unwrap();
        let err = backend.search("anything", 5).await.unwrap_err();
        assert!(matches!(err, AgentError::Search(_)));
    }
}

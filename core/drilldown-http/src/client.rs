//! FILENAME: core/drilldown-http/src/client.rs
//! `DataSource` over HTTP.

use drilldown_engine::logging::{log_debug, log_warn};
use drilldown_engine::{DataSource, GroupQuery, Record, TransportError};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;

/// Name of the query parameter carrying the target key.
pub const QUERY_GROUP_PARAM: &str = "queryGroup";

#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: Client,
    base_url: String,
}

impl HttpDataSource {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let mut base_url = config.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(HttpDataSource { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    /// Query pairs for one group query: the target key first, then the
    /// path in key order, values as labels.
    pub fn query_pairs(query: &GroupQuery) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(query.path.len() + 1);
        pairs.push((QUERY_GROUP_PARAM.to_string(), query.target_key.clone()));
        pairs.extend(query.path.to_label_pairs());
        pairs
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            log_warn!("HTTP", "{} from {}", status, url);
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

impl DataSource for HttpDataSource {
    async fn fetch_headers(&self) -> Result<Vec<String>, TransportError> {
        let url = self.url("headers");
        log_debug!("HTTP", "GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::decode(response).await
    }

    async fn fetch_rows(&self, query: &GroupQuery) -> Result<Vec<Record>, TransportError> {
        let url = self.url("rows");
        log_debug!("HTTP", "GET {} [{}]", url, query);

        let response = self
            .client
            .get(&url)
            .query(&Self::query_pairs(query))
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let records: Vec<Record> = Self::decode(response).await?;

        log_debug!("HTTP", "{} -> {} records", query, records.len());
        Ok(records)
    }
}

//! CrossRef lookup source implementation.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::LookupConfig;
use crate::models::{LookupOutcome, Record};
use crate::sources::{LookupSource, SourceError};
use crate::utils::HttpClient;

/// CrossRef lookup source
///
/// Uses the CrossRef REST API `works` endpoint with a bibliographic query and
/// takes the DOI of the top-ranked candidate as-is.
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: HttpClient,
    endpoint: String,
}

impl CrossRefSource {
    pub fn new(config: &LookupConfig) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(config).map_err(|e| {
            SourceError::InvalidRequest(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self::with_client(client, &config.endpoint))
    }

    pub fn with_client(client: HttpClient, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Query CrossRef and return the first candidate's DOI, if any
    async fn query(&self, record: &Record) -> Result<Option<String>, SourceError> {
        let query = record.bibliographic_query();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query.bibliographic", query.as_str()), ("rows", "1")])
            .send()
            .await?
            .error_for_status()?;

        let data: CRResponse = response.json().await?;

        match data.message.items.into_iter().next() {
            Some(item) => item
                .doi
                .map(Some)
                .ok_or_else(|| SourceError::Parse("candidate has no DOI field".to_string())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LookupSource for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    async fn lookup(&self, record: &Record) -> LookupOutcome {
        match self.query(record).await {
            Ok(Some(doi)) => LookupOutcome::Found(doi),
            Ok(None) => LookupOutcome::NotFound,
            Err(err) => {
                tracing::warn!("CrossRef lookup failed for '{}': {}", record.title, err);
                err.into()
            }
        }
    }
}

// ===== CrossRef API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse {
    message: CRMessage,
}

#[derive(Debug, Deserialize)]
struct CRMessage {
    items: Vec<CRItem>,
}

#[derive(Debug, Deserialize)]
struct CRItem {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

//! HTTP-backed analysis backend.
//!
//! Speaks a JSON API rooted at the configured base URL, authenticated with
//! a bearer key. Request/response bodies reuse the domain types' serde
//! shapes, so the server side of this contract is exactly what the mock
//! backend fabricates locally.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use async_trait::async_trait;

use crate::contract::clause::ContractClause;
use crate::contract::insight::AiInsight;
use crate::contract::risk::RiskAssessment;
use crate::contract::ContractUpload;
use crate::error::AnalyzerError;

use super::{ComparisonReport, ContractAnalyzer, ParsedContract, SearchFilters, SearchResults};

pub struct OpenAiAnalyzer {
    client: Client,
    base_url: Url,
    api_key: SecretString,
}

#[derive(Serialize)]
struct ParseRequest<'a> {
    contract_id: Uuid,
    file_name: &'a str,
    size_bytes: u64,
}

#[derive(Serialize)]
struct AssessRequest<'a> {
    contract_id: Uuid,
    clauses: &'a [ContractClause],
}

#[derive(Serialize)]
struct CompareRequest<'a> {
    contract_ids: &'a [Uuid],
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    filters: &'a SearchFilters,
}

impl OpenAiAnalyzer {
    pub fn new(
        base_url: Url,
        api_key: SecretString,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AnalyzerError> {
        self.base_url
            .join(path)
            .map_err(|e| AnalyzerError::Backend {
                message: format!("invalid endpoint '{path}': {e}"),
            })
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, AnalyzerError> {
        let url = self.endpoint(path)?;
        debug!(%url, "analysis backend request");

        let response = self
            .client
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AnalyzerError::Backend {
                    message: format!("authentication rejected ({status})"),
                },
                _ => AnalyzerError::Backend {
                    message: format!("{status}: {}", truncate(&body, 200)),
                },
            });
        }

        Ok(response.json().await?)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl ContractAnalyzer for OpenAiAnalyzer {
    async fn parse(
        &self,
        contract_id: Uuid,
        upload: &ContractUpload,
    ) -> Result<ParsedContract, AnalyzerError> {
        self.post(
            "contracts/parse",
            &ParseRequest {
                contract_id,
                file_name: &upload.file_name,
                size_bytes: upload.size_bytes,
            },
        )
        .await
    }

    async fn assess_risk(
        &self,
        contract_id: Uuid,
        clauses: &[ContractClause],
    ) -> Result<RiskAssessment, AnalyzerError> {
        self.post(
            "contracts/assess-risk",
            &AssessRequest {
                contract_id,
                clauses,
            },
        )
        .await
    }

    async fn generate_insights(
        &self,
        contract_id: Uuid,
        clauses: &[ContractClause],
    ) -> Result<Vec<AiInsight>, AnalyzerError> {
        self.post(
            "contracts/insights",
            &AssessRequest {
                contract_id,
                clauses,
            },
        )
        .await
    }

    async fn compare(&self, contract_ids: &[Uuid]) -> Result<ComparisonReport, AnalyzerError> {
        self.post("contracts/compare", &CompareRequest { contract_ids })
            .await
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SearchResults, AnalyzerError> {
        self.post("contracts/search", &SearchRequest { query, filters })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("caf\u{e9}s", 4), "caf\u{e9}");
    }
}

//! Rug-check report client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::RugCheckConfig;
use crate::error::{AppError, AppResult};
use crate::normalizer::CandidateAsset;
use crate::pipeline::RugCheck;

/// One risk entry in a report summary
#[derive(Debug, Clone, Deserialize)]
pub struct RiskItem {
    pub name: String,
    #[serde(default)]
    pub level: String,
}

/// `GET /tokens/{mint}/report/summary` response
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSummary {
    #[serde(default)]
    pub risks: Vec<RiskItem>,
    #[serde(default)]
    pub score_normalised: Option<u32>,
}

impl ReportSummary {
    /// Safe when no risk is `danger` and the score is within bounds
    pub fn is_safe(&self, max_score: Option<u32>) -> bool {
        if self
            .risks
            .iter()
            .any(|r| r.level.eq_ignore_ascii_case("danger"))
        {
            return false;
        }

        match (max_score, self.score_normalised) {
            (Some(max), Some(score)) => score <= max,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// HTTP client for the rug-check service
pub struct RugCheckClient {
    http: reqwest::Client,
    api_url: String,
    max_score: Option<u32>,
}

impl RugCheckClient {
    pub fn new(config: &RugCheckConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            max_score: config.max_score,
        })
    }
}

#[async_trait]
impl RugCheck for RugCheckClient {
    async fn is_confirmed_safe(&self, asset: &CandidateAsset) -> AppResult<bool> {
        let url = format!("{}/tokens/{}/report/summary", self.api_url, asset);

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Check(format!(
                "Rug-check API returned {}",
                response.status()
            )));
        }

        let summary: ReportSummary = response.json().await?;
        let safe = summary.is_safe(self.max_score);

        tracing::debug!(
            mint = %asset,
            safe = safe,
            score = ?summary.score_normalised,
            risks = summary.risks.len(),
            "Rug-check report"
        );

        Ok(safe)
    }
}

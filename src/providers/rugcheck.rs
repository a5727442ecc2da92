//! RugCheck API Client
//!
//! Contract security reports: risk flags plus an overall safety score
//! (0-100, higher = safer). Known to miss roughly one rug in five, so
//! callers cap their confidence in it.
//!
//! API: https://api.rugcheck.xyz/v1/tokens/{mint}/report

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{build_http_client, check_status, SecurityReportSource, SourceKind};
use crate::models::errors::{AppError, AppResult};

/// One flagged risk in a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFlag {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Token security report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    /// Overall safety score, absent for some tokens
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub risks: Vec<RiskFlag>,
    /// Set by the provider once it has classified the token as rugged
    #[serde(default)]
    pub rugged: Option<bool>,
}

impl SecurityReport {
    pub fn risk_names(&self) -> Vec<String> {
        self.risks.iter().map(|r| r.name.clone()).collect()
    }

    pub fn is_rugged(&self) -> bool {
        self.rugged.unwrap_or(false)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<RiskFlag>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<RiskFlag>>::deserialize(deserializer)?.unwrap_or_default())
}

/// RugCheck API client
pub struct RugCheckClient {
    client: reqwest::Client,
    base_url: String,
}

impl RugCheckClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SecurityReportSource for RugCheckClient {
    async fn report(&self, token: &str) -> AppResult<Option<SecurityReport>> {
        let url = format!("{}/tokens/{}/report", self.base_url, token);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(SourceKind::SecurityReport, response.status())?;

        let report: SecurityReport = response.json().await.map_err(|e| {
            AppError::invalid_response(format!("Failed to parse RugCheck report: {}", e))
        })?;
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report() {
        let body = r#"{
            "mint": "Mint111",
            "score": 12,
            "risks": [
                {"name": "Mint Authority still enabled", "level": "danger", "score": 5000},
                {"name": "Freeze Authority still enabled", "level": "danger"}
            ],
            "rugged": false
        }"#;
        let report: SecurityReport = serde_json::from_str(body).unwrap();
        assert_eq!(report.score, Some(12.0));
        assert_eq!(report.risks.len(), 2);
        assert_eq!(report.risk_names()[1], "Freeze Authority still enabled");
        assert!(!report.is_rugged());
    }

    #[test]
    fn test_parse_sparse_report() {
        let report: SecurityReport = serde_json::from_str(r#"{"risks": null}"#).unwrap();
        assert_eq!(report.score, None);
        assert!(report.risks.is_empty());
        assert!(!report.is_rugged());
    }
}

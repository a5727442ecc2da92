//! Contract Layer - authority and honeypot flags from the security report
//!
//! Mint authority lets the deployer inflate supply, freeze authority lets
//! them lock holders out, honeypot flags mean holders cannot sell.
//!
//! Known limitation: a clean report can still be a false negative for
//! freshly deployed contracts that the report provider has not scanned.

use serde_json::json;
use std::sync::Arc;

use super::into_evidence;
use crate::models::errors::AppResult;
use crate::models::types::LayerResult;
use crate::providers::{SecurityReport, SecurityReportSource};
use crate::utils::numeric::round_dp;

/// Report score assumed when the provider omits one
const DEFAULT_REPORT_SCORE: f64 = 50.0;
/// Risk names copied into evidence
const MAX_EVIDENCE_RISKS: usize = 10;

const FALSE_NEGATIVE_NOTE: &str =
    "Clean reports can miss contracts deployed minutes ago; weigh with other layers";

/// Flags extracted from a security report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractFlags {
    pub mint_authority: bool,
    pub freeze_authority: bool,
    pub honeypot: bool,
    pub report_score: f64,
    pub risk_names: Vec<String>,
}

impl ContractFlags {
    pub fn from_report(report: &SecurityReport) -> Self {
        let risk_names: Vec<String> = report
            .risk_names()
            .into_iter()
            .map(|n| n.to_lowercase())
            .collect();
        let any = |needle: &str| risk_names.iter().any(|n| n.contains(needle));

        Self {
            mint_authority: any("mint"),
            freeze_authority: any("freez"),
            honeypot: any("honeypot"),
            report_score: report.score.unwrap_or(DEFAULT_REPORT_SCORE),
            risk_names,
        }
    }
}

/// Score contract flags
pub fn calculate_risk(flags: &ContractFlags) -> LayerResult {
    let mut score: f64 = 0.0;
    let mut reasons = Vec::new();

    if flags.mint_authority {
        score += 0.35;
        reasons.push("Mint authority enabled - supply can be inflated".to_string());
    }
    if flags.freeze_authority {
        score += 0.25;
        reasons.push("Freeze authority enabled - accounts can be frozen".to_string());
    }
    if flags.honeypot {
        score += 0.30;
        reasons.push("Honeypot pattern detected".to_string());
    }

    if flags.report_score < 20.0 {
        score = score.max(0.9);
        reasons.push(format!("Very low security score: {:.0}", flags.report_score));
    } else if flags.report_score < 50.0 {
        score = score.max(0.7);
        reasons.push(format!("Low security score: {:.0}", flags.report_score));
    } else if flags.report_score >= 80.0 {
        score = score.min(0.2);
        reasons.push(format!(
            "Security score: {:.0}/100 (relatively safe)",
            flags.report_score
        ));
    }

    if flags.risk_names.len() > 5 {
        score += 0.15;
        reasons.push(format!("{} risks flagged", flags.risk_names.len()));
    }

    let mut score = round_dp(score.min(1.0), 4);
    if reasons.is_empty() {
        score = 0.15;
        reasons.push("No major contract issues detected".to_string());
    }

    let evidence = into_evidence(json!({
        "score": score,
        "rugcheck_score": flags.report_score,
        "mint_authority": flags.mint_authority,
        "freeze_authority": flags.freeze_authority,
        "honeypot": flags.honeypot,
        "total_risks": flags.risk_names.len(),
        "risk_names": flags.risk_names.iter().take(MAX_EVIDENCE_RISKS).collect::<Vec<_>>(),
        "note": FALSE_NEGATIVE_NOTE,
        "reasons": reasons,
    }));

    LayerResult::new(score, 0.65, evidence)
}

pub struct ContractLayer {
    reports: Arc<dyn SecurityReportSource>,
}

impl ContractLayer {
    pub fn new(reports: Arc<dyn SecurityReportSource>) -> Self {
        Self { reports }
    }

    pub async fn analyze(&self, address: &str) -> AppResult<LayerResult> {
        let Some(report) = self.reports.report(address).await? else {
            return Ok(LayerResult::new(
                0.6,
                0.2,
                into_evidence(json!({
                    "note": "No security report available",
                    "reasons": ["No security report available"],
                })),
            ));
        };

        Ok(calculate_risk(&ContractFlags::from_report(&report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layers::testing::{Behavior, FakeReports};
    use crate::providers::RiskFlag;

    fn report(score: Option<f64>, names: &[&str]) -> SecurityReport {
        SecurityReport {
            score,
            risks: names
                .iter()
                .map(|n| RiskFlag {
                    name: n.to_string(),
                    ..RiskFlag::default()
                })
                .collect(),
            rugged: None,
        }
    }

    #[test]
    fn test_flags_from_report() {
        let flags = ContractFlags::from_report(&report(
            Some(60.0),
            &["Mint Authority still enabled", "Freeze Authority still enabled"],
        ));
        assert!(flags.mint_authority);
        assert!(flags.freeze_authority);
        assert!(!flags.honeypot);
        assert_eq!(flags.report_score, 60.0);
    }

    #[test]
    fn test_authorities_add_up() {
        let flags =
            ContractFlags::from_report(&report(Some(60.0), &["mint", "freeze", "honeypot"]));
        let result = calculate_risk(&flags);
        assert!((result.score - 0.9).abs() < 1e-9, "Score was {}", result.score);
        assert_eq!(result.confidence, 0.65);
    }

    #[test]
    fn test_low_report_score_floors_risk() {
        let score_for = |s: f64| calculate_risk(&ContractFlags::from_report(&report(Some(s), &[])));
        assert_eq!(score_for(10.0).score, 0.9);
        assert_eq!(score_for(30.0).score, 0.7);
    }

    #[test]
    fn test_high_report_score_caps_risk() {
        let result = calculate_risk(&ContractFlags::from_report(&report(Some(90.0), &["mint"])));
        assert_eq!(result.score, 0.2);
    }

    #[test]
    fn test_clean_high_score_report_is_safe() {
        let result = calculate_risk(&ContractFlags::from_report(&report(Some(90.0), &[])));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.reasons(), vec!["Security score: 90/100 (relatively safe)"]);
    }

    #[test]
    fn test_missing_score_defaults_to_fifty() {
        let result = calculate_risk(&ContractFlags::from_report(&report(None, &[])));
        assert_eq!(result.evidence["rugcheck_score"], 50.0);
        assert_eq!(result.score, 0.15);
        assert_eq!(result.reasons(), vec!["No major contract issues detected"]);
    }

    #[test]
    fn test_many_risks() {
        let names = ["a", "b", "c", "d", "e", "f"];
        let result = calculate_risk(&ContractFlags::from_report(&report(Some(60.0), &names)));
        assert_eq!(result.score, 0.15);
        assert_eq!(result.evidence["total_risks"], 6);
    }

    #[tokio::test]
    async fn test_analyze_without_report() {
        let layer = ContractLayer::new(Arc::new(FakeReports(Behavior::Return(None))));
        let result = layer.analyze("Mint").await.unwrap();
        assert_eq!((result.score, result.confidence), (0.6, 0.2));
    }

    #[tokio::test]
    async fn test_analyze_with_report() {
        let layer = ContractLayer::new(Arc::new(FakeReports(Behavior::Return(Some(report(
            Some(15.0),
            &["Mint Authority still enabled"],
        ))))));
        let result = layer.analyze("Mint").await.unwrap();
        assert_eq!(result.score, 0.9);
        assert_eq!(result.evidence["mint_authority"], true);
    }
}

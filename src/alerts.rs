//! Fatigue and workload alerts
//!
//! Alerts are derived statelessly from the latest ACWR record, recovery
//! prediction and (when available) performance trend of an athlete. Each
//! alert type is one rule in an ordered table.

use crate::acwr::{AcwrRecord, RiskStatus};
use crate::models::TrendDirection;
use crate::performance::{PerformancePrediction, PerformanceTrend};
use crate::recovery::RecoveryPrediction;
use crate::rules::RuleTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Alert thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Fatigue above which a poor-recovery warning is raised
    pub poor_recovery_fatigue: f64,

    /// Fatigue above which poor recovery becomes critical
    pub critical_recovery_fatigue: f64,

    /// ACWR above which an increasing trend is flagged
    pub rapid_increase_ratio: f64,

    /// Plateau predictions need more confidence than this
    pub plateau_confidence: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            poor_recovery_fatigue: 75.0,
            critical_recovery_fatigue: 85.0,
            rapid_increase_ratio: 1.2,
            plateau_confidence: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertType {
    HighLoad,
    PoorRecovery,
    RapidIncrease,
    Plateau,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertType::HighLoad => write!(f, "high-load"),
            AlertType::PoorRecovery => write!(f, "poor-recovery"),
            AlertType::RapidIncrease => write!(f, "rapid-increase"),
            AlertType::Plateau => write!(f, "plateau"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueAlert {
    pub id: Uuid,
    pub athlete_id: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub recommendations: Vec<String>,
    pub triggered_at: DateTime<Utc>,
}

/// Alert body produced by a rule before it is stamped
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub recommendations: Vec<String>,
}

/// Values the alert rules look at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertContext {
    pub ratio: f64,
    pub status: RiskStatus,
    pub trend: TrendDirection,
    pub fatigue: f64,
    pub performance: Option<(PerformanceTrend, f64)>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Alert rules for the given thresholds, in output order
pub fn alert_rules(config: &AlertConfig) -> RuleTable<AlertContext, AlertDraft> {
    let poor = config.poor_recovery_fatigue;
    let critical = config.critical_recovery_fatigue;
    let rapid = config.rapid_increase_ratio;
    let plateau = config.plateau_confidence;

    RuleTable::new()
        .rule(
            "high-load",
            |c: &AlertContext| c.status.is_elevated(),
            |c: &AlertContext| AlertDraft {
                alert_type: AlertType::HighLoad,
                severity: if c.status == RiskStatus::VeryHighRisk {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                },
                message: format!("ACWR of {:.2} puts the athlete at {}", c.ratio, c.status),
                recommendations: strings(&[
                    "Reduce training volume for the coming week",
                    "Replace one high-intensity session with recovery work",
                ]),
            },
        )
        .rule(
            "poor-recovery",
            move |c: &AlertContext| c.fatigue > poor,
            move |c: &AlertContext| AlertDraft {
                alert_type: AlertType::PoorRecovery,
                severity: if c.fatigue > critical {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                },
                message: format!("Fatigue at {:.0} indicates incomplete recovery", c.fatigue),
                recommendations: strings(&[
                    "Schedule a rest day",
                    "Check sleep and nutrition habits",
                ]),
            },
        )
        .rule(
            "rapid-increase",
            move |c: &AlertContext| c.trend == TrendDirection::Increasing && c.ratio > rapid,
            |c: &AlertContext| AlertDraft {
                alert_type: AlertType::RapidIncrease,
                severity: AlertSeverity::Warning,
                message: format!("Workload is rising quickly (ACWR {:.2})", c.ratio),
                recommendations: strings(&["Limit weekly load increases to about 10%"]),
            },
        )
        .rule(
            "plateau",
            move |c: &AlertContext| {
                matches!(c.performance, Some((PerformanceTrend::Plateau, confidence)) if confidence > plateau)
            },
            |_| AlertDraft {
                alert_type: AlertType::Plateau,
                severity: AlertSeverity::Info,
                message: "Performance has plateaued".to_string(),
                recommendations: strings(&[
                    "Vary the training stimulus",
                    "Review goals and periodization",
                ]),
            },
        )
}

/// Stateless alert generator
pub struct AlertGenerator {
    rules: RuleTable<AlertContext, AlertDraft>,
}

impl AlertGenerator {
    pub fn new() -> Self {
        Self::with_config(AlertConfig::default())
    }

    pub fn with_config(config: AlertConfig) -> Self {
        AlertGenerator {
            rules: alert_rules(&config),
        }
    }

    pub fn context(
        acwr: &AcwrRecord,
        recovery: &RecoveryPrediction,
        performance: Option<&PerformancePrediction>,
    ) -> AlertContext {
        AlertContext {
            ratio: acwr.ratio,
            status: acwr.status,
            trend: acwr.trend,
            fatigue: recovery.current_fatigue,
            performance: performance.map(|p| (p.trend, p.confidence)),
        }
    }

    /// Alerts for one athlete, stamped with `now`
    pub fn generate(
        &self,
        athlete_id: &str,
        acwr: &AcwrRecord,
        recovery: &RecoveryPrediction,
        performance: Option<&PerformancePrediction>,
        now: DateTime<Utc>,
    ) -> Vec<FatigueAlert> {
        let context = Self::context(acwr, recovery, performance);
        let alerts: Vec<FatigueAlert> = self
            .rules
            .evaluate(&context)
            .into_iter()
            .map(|draft| FatigueAlert {
                id: alert_id(athlete_id, draft.alert_type, now),
                athlete_id: athlete_id.to_string(),
                alert_type: draft.alert_type,
                severity: draft.severity,
                message: draft.message,
                recommendations: draft.recommendations,
                triggered_at: now,
            })
            .collect();

        if !alerts.is_empty() {
            debug!(athlete = %athlete_id, count = alerts.len(), "Generated fatigue alerts");
        }
        alerts
    }
}

/// Name-based id, stable for the same athlete, alert type and trigger time
pub fn alert_id(athlete_id: &str, alert_type: AlertType, triggered_at: DateTime<Utc>) -> Uuid {
    let name = format!("{}/{}/{}", athlete_id, alert_type, triggered_at.to_rfc3339());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

impl Default for AlertGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context(ratio: f64, trend: TrendDirection, fatigue: f64) -> AlertContext {
        AlertContext {
            ratio,
            status: RiskStatus::from_ratio(ratio),
            trend,
            fatigue,
            performance: None,
        }
    }

    fn types(ctx: &AlertContext) -> Vec<AlertType> {
        alert_rules(&AlertConfig::default())
            .evaluate(ctx)
            .into_iter()
            .map(|d| d.alert_type)
            .collect()
    }

    #[test]
    fn test_calm_athlete_has_no_alerts() {
        assert!(types(&context(1.0, TrendDirection::Stable, 40.0)).is_empty());
    }

    #[test]
    fn test_high_load_severity() {
        let rules = alert_rules(&AlertConfig::default());

        let high = rules.evaluate(&context(1.4, TrendDirection::Stable, 40.0));
        assert_eq!(high[0].alert_type, AlertType::HighLoad);
        assert_eq!(high[0].severity, AlertSeverity::Warning);

        let very_high = rules.evaluate(&context(1.8, TrendDirection::Stable, 40.0));
        assert_eq!(very_high[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_poor_recovery_thresholds() {
        let rules = alert_rules(&AlertConfig::default());
        assert!(rules.evaluate(&context(1.0, TrendDirection::Stable, 75.0)).is_empty());

        let warning = rules.evaluate(&context(1.0, TrendDirection::Stable, 80.0));
        assert_eq!(warning[0].severity, AlertSeverity::Warning);

        let critical = rules.evaluate(&context(1.0, TrendDirection::Stable, 90.0));
        assert_eq!(critical[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_rapid_increase_needs_rising_trend() {
        assert_eq!(
            types(&context(1.25, TrendDirection::Increasing, 40.0)),
            vec![AlertType::RapidIncrease]
        );
        assert!(types(&context(1.25, TrendDirection::Stable, 40.0)).is_empty());
        assert!(types(&context(1.1, TrendDirection::Increasing, 40.0)).is_empty());
    }

    #[test]
    fn test_plateau_needs_confidence() {
        let mut ctx = context(1.0, TrendDirection::Stable, 40.0);
        ctx.performance = Some((PerformanceTrend::Plateau, 80.0));
        assert_eq!(types(&ctx), vec![AlertType::Plateau]);

        ctx.performance = Some((PerformanceTrend::Plateau, 60.0));
        assert!(types(&ctx).is_empty());

        ctx.performance = Some((PerformanceTrend::Improving, 90.0));
        assert!(types(&ctx).is_empty());
    }

    #[test]
    fn test_all_rules_fire_in_order() {
        let mut ctx = context(1.6, TrendDirection::Increasing, 95.0);
        ctx.performance = Some((PerformanceTrend::Plateau, 90.0));
        assert_eq!(
            types(&ctx),
            vec![
                AlertType::HighLoad,
                AlertType::PoorRecovery,
                AlertType::RapidIncrease,
                AlertType::Plateau
            ]
        );
    }

    #[test]
    fn test_alert_ids_are_stable_per_trigger() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();

        assert_eq!(
            alert_id("a1", AlertType::HighLoad, at),
            alert_id("a1", AlertType::HighLoad, at)
        );
        assert_ne!(
            alert_id("a1", AlertType::HighLoad, at),
            alert_id("a1", AlertType::PoorRecovery, at)
        );
        assert_ne!(
            alert_id("a1", AlertType::HighLoad, at),
            alert_id("a2", AlertType::HighLoad, at)
        );
        assert_ne!(
            alert_id("a1", AlertType::HighLoad, at),
            alert_id("a1", AlertType::HighLoad, later)
        );
    }
}

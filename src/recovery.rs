//! Recovery Prediction
//!
//! Combines the workload picture of an athlete (ACWR and EWMA) with the
//! profile's recovery capacity to estimate fatigue, time to recover and the
//! shape of the next session.
//!
//! # Model
//!
//! - **Fatigue** (0-100): `30 + ACWR bonus + 0.4 × EWMA + 0.8 × volatility`.
//!   The ACWR bonus is tiered: 35 for a ratio ≥ 1.5, 25 for ≥ 1.3, 15 for
//!   ≥ 1.1 and nothing below.
//! - **Recovery hours**: `0.8 × fatigue`, scaled by 1.2 for athletes whose
//!   recovery capacity is below 50 and by an individual variability factor.
//!   The factor comes from `athlete_variability` for that athlete, falling
//!   back to the squad-wide `variability_factor`. Never less than 8 hours.
//! - **Readiness**: `100 − fatigue`.
//!
//! # Next session
//!
//! | Condition                               | Intensity |
//! |-----------------------------------------|-----------|
//! | ACWR very high, or fatigue > 70         | low       |
//! | ACWR high, or fatigue > 50              | medium    |
//! | otherwise                               | high      |

use crate::acwr::{AcwrRecord, RiskStatus};
use crate::ewma::EwmaState;
use crate::models::{AthleteProfile, TrainingIntensity};
use crate::rules::RuleTable;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recovery predictor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Variability factor for athletes without their own entry
    pub variability_factor: f64,

    /// Per-athlete variability factors, keyed by athlete id
    pub athlete_variability: BTreeMap<String, f64>,

    /// Recovery capacity below which recovery is slowed
    pub low_capacity_threshold: f64,

    pub low_capacity_multiplier: f64,

    /// Lower bound on the estimated recovery time
    pub min_recovery_hours: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            variability_factor: 1.0,
            athlete_variability: BTreeMap::new(),
            low_capacity_threshold: 50.0,
            low_capacity_multiplier: 1.2,
            min_recovery_hours: 8.0,
        }
    }
}

/// Guidance for the athlete's next session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextSession {
    /// Earliest time the next session should start
    pub earliest: DateTime<Utc>,
    pub intensity: TrainingIntensity,
    pub restrictions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPrediction {
    pub athlete_id: String,

    /// Current fatigue (0-100)
    pub current_fatigue: f64,

    pub estimated_recovery_hours: f64,

    /// Readiness (0-100)
    pub readiness_score: f64,

    pub recommendations: Vec<String>,
    pub next_session: NextSession,
}

/// Inputs the recommendation rules look at
#[derive(Debug, Clone, Copy)]
pub struct RecoveryContext {
    pub fatigue: f64,
    pub acwr_ratio: f64,
}

/// Recommendation rules, in output order
pub fn recommendation_rules() -> RuleTable<RecoveryContext, String> {
    RuleTable::new()
        .rule(
            "rest",
            |c: &RecoveryContext| c.fatigue > 70.0,
            |_| "Take 24-48 hours of complete rest before the next hard session".to_string(),
        )
        .rule(
            "active-recovery",
            |c: &RecoveryContext| c.acwr_ratio > 1.3,
            |_| "Active recovery: 30-45 minutes of low-intensity movement".to_string(),
        )
        .rule(
            "sleep",
            |_| true,
            |c: &RecoveryContext| {
                let hours = if c.fatigue > 60.0 { 9 } else { 8 };
                format!("Aim for at least {} hours of sleep tonight", hours)
            },
        )
        .rule(
            "nutrition",
            |c: &RecoveryContext| c.fatigue > 40.0,
            |_| "Prioritize carbohydrate and protein intake within 2 hours of training".to_string(),
        )
}

/// Recovery prediction engine
pub struct RecoveryPredictor {
    config: RecoveryConfig,
    rules: RuleTable<RecoveryContext, String>,
}

impl RecoveryPredictor {
    pub fn new() -> Self {
        Self::with_config(RecoveryConfig::default())
    }

    pub fn with_config(config: RecoveryConfig) -> Self {
        RecoveryPredictor {
            config,
            rules: recommendation_rules(),
        }
    }

    /// Override the squad-wide variability factor
    pub fn with_variability(mut self, factor: f64) -> Self {
        self.config.variability_factor = factor;
        self
    }

    /// Set the variability factor of one athlete
    pub fn with_athlete_variability(mut self, athlete_id: &str, factor: f64) -> Self {
        self.config
            .athlete_variability
            .insert(athlete_id.to_string(), factor);
        self
    }

    /// Variability factor for an athlete; unusable entries fall back to the squad value
    pub fn variability_for(&self, athlete_id: &str) -> f64 {
        self.config
            .athlete_variability
            .get(athlete_id)
            .copied()
            .filter(|factor| factor.is_finite() && *factor > 0.0)
            .unwrap_or(self.config.variability_factor)
    }

    /// Tiered fatigue contribution of the ACWR ratio
    pub fn acwr_bonus(ratio: f64) -> f64 {
        if ratio >= 1.5 {
            35.0
        } else if ratio >= 1.3 {
            25.0
        } else if ratio >= 1.1 {
            15.0
        } else {
            0.0
        }
    }

    pub fn fatigue(ratio: f64, ewma: f64, volatility: f64) -> f64 {
        let fatigue = 30.0 + Self::acwr_bonus(ratio) + 0.4 * ewma + 0.8 * volatility;
        if fatigue.is_nan() {
            return 30.0;
        }
        fatigue.clamp(0.0, 100.0)
    }

    pub fn recovery_hours(&self, athlete_id: &str, fatigue: f64, recovery_capacity: f64) -> f64 {
        let mut hours = 0.8 * fatigue;
        if recovery_capacity < self.config.low_capacity_threshold {
            hours *= self.config.low_capacity_multiplier;
        }
        hours *= self.variability_for(athlete_id);
        hours.max(self.config.min_recovery_hours)
    }

    pub fn next_intensity(status: RiskStatus, fatigue: f64) -> TrainingIntensity {
        if status == RiskStatus::VeryHighRisk || fatigue > 70.0 {
            TrainingIntensity::Low
        } else if status == RiskStatus::HighRisk || fatigue > 50.0 {
            TrainingIntensity::Medium
        } else {
            TrainingIntensity::High
        }
    }

    fn session_restrictions(
        intensity: TrainingIntensity,
        status: RiskStatus,
        profile: &AthleteProfile,
    ) -> Vec<String> {
        let mut restrictions = Vec::new();

        if intensity < TrainingIntensity::High {
            restrictions.push("no high-intensity intervals".to_string());
        }
        if intensity == TrainingIntensity::Low {
            restrictions.push("limit session volume".to_string());
        }
        if status.is_elevated() || intensity == TrainingIntensity::Medium {
            restrictions.push("monitor RPE closely".to_string());
        }

        restrictions.extend(profile.restrictions.iter().map(|r| r.description.clone()));
        restrictions
    }

    /// Predict recovery as of `as_of`
    pub fn predict(
        &self,
        profile: &AthleteProfile,
        acwr: &AcwrRecord,
        ewma: &EwmaState,
        as_of: DateTime<Utc>,
    ) -> RecoveryPrediction {
        let fatigue = Self::fatigue(acwr.ratio, ewma.current, ewma.volatility);
        let hours = self.recovery_hours(&profile.id, fatigue, profile.recovery_capacity());

        let context = RecoveryContext {
            fatigue,
            acwr_ratio: acwr.ratio,
        };
        let intensity = Self::next_intensity(acwr.status, fatigue);

        RecoveryPrediction {
            athlete_id: profile.id.clone(),
            current_fatigue: fatigue,
            estimated_recovery_hours: hours,
            readiness_score: 100.0 - fatigue,
            recommendations: self.rules.evaluate(&context),
            next_session: NextSession {
                earliest: as_of + Duration::seconds((hours * 3600.0).round() as i64),
                intensity,
                restrictions: Self::session_restrictions(intensity, acwr.status, profile),
            },
        }
    }
}

impl Default for RecoveryPredictor {
    fn default() -> Self {
        Self::new()
    }
}

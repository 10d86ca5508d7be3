//! Acute:Chronic Workload Ratio
//!
//! Acute load is the average daily weighted load over the trailing 7 days,
//! chronic load the same over 28 days; both windows end on (and include) the
//! reference date. A chronic load of zero yields a neutral ratio of 1.
//!
//! ## Risk buckets
//! - ratio < 0.8: low risk (under-loading)
//! - 0.8 ≤ ratio < 1.3: moderate risk (the productive range)
//! - 1.3 ≤ ratio < 1.5: high risk
//! - ratio ≥ 1.5: very high risk

use crate::models::TrendDirection;
use crate::workload::DailyLoad;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// ACWR configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcwrConfig {
    /// Acute window in days (default: 7)
    pub acute_days: u32,

    /// Chronic window in days (default: 28)
    pub chronic_days: u32,

    /// How far back the comparison ratio for the trend is taken
    pub trend_lookback_days: u32,

    /// Ratio change that counts as a trend
    pub trend_threshold: f64,
}

impl Default for AcwrConfig {
    fn default() -> Self {
        AcwrConfig {
            acute_days: 7,
            chronic_days: 28,
            trend_lookback_days: 7,
            trend_threshold: 0.1,
        }
    }
}

/// Injury risk bucket of an ACWR value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskStatus {
    LowRisk,
    ModerateRisk,
    HighRisk,
    VeryHighRisk,
}

impl RiskStatus {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.8 {
            RiskStatus::LowRisk
        } else if ratio < 1.3 {
            RiskStatus::ModerateRisk
        } else if ratio < 1.5 {
            RiskStatus::HighRisk
        } else {
            RiskStatus::VeryHighRisk
        }
    }

    /// High or very high risk
    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskStatus::HighRisk | RiskStatus::VeryHighRisk)
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskStatus::LowRisk => write!(f, "low-risk"),
            RiskStatus::ModerateRisk => write!(f, "moderate-risk"),
            RiskStatus::HighRisk => write!(f, "high-risk"),
            RiskStatus::VeryHighRisk => write!(f, "very-high-risk"),
        }
    }
}

/// Guidance text for a status and trend
pub fn recommendation(status: RiskStatus, trend: TrendDirection) -> &'static str {
    use RiskStatus::*;
    use TrendDirection::*;

    match (status, trend) {
        (LowRisk, Increasing) => "Load is building from a low base - keep progressing gradually",
        (LowRisk, Stable) => "Training load is below chronic levels - increase load progressively",
        (LowRisk, Decreasing) => {
            "Load keeps dropping - risk of detraining, reintroduce structured sessions"
        }
        (ModerateRisk, Increasing) => "Within the optimal range but rising - monitor weekly progression",
        (ModerateRisk, Stable) => "Optimal training load - maintain current progression",
        (ModerateRisk, Decreasing) => "Optimal range with easing load - fine for a recovery week",
        (HighRisk, Increasing) => {
            "Load is rising into the danger zone - reduce volume by 20-30% this week"
        }
        (HighRisk, Stable) => "Elevated load - hold volume and add a recovery day",
        (HighRisk, Decreasing) => "Elevated but easing - continue reducing load toward the optimal range",
        (VeryHighRisk, Increasing) => {
            "Acute spike with rising trend - cut load immediately and prioritize recovery"
        }
        (VeryHighRisk, Stable) => "Very high load - schedule rest and limit high-intensity work",
        (VeryHighRisk, Decreasing) => {
            "Very high but easing - keep sessions light until the ratio drops below 1.3"
        }
    }
}

/// ACWR snapshot for one athlete and date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcwrRecord {
    pub athlete_id: String,
    pub date: NaiveDate,
    pub acute_load: f64,
    pub chronic_load: f64,
    pub ratio: f64,
    pub status: RiskStatus,
    pub trend: TrendDirection,
    pub recommendation: String,
}

/// ACWR calculation engine
pub struct AcwrCalculator {
    config: AcwrConfig,
}

impl AcwrCalculator {
    pub fn new() -> Self {
        AcwrCalculator {
            config: AcwrConfig::default(),
        }
    }

    pub fn with_config(config: AcwrConfig) -> Self {
        AcwrCalculator { config }
    }

    /// Average daily load over the `days` ending on `date`
    pub fn window_average(
        daily: &BTreeMap<NaiveDate, DailyLoad>,
        date: NaiveDate,
        days: u32,
    ) -> f64 {
        if days == 0 {
            return 0.0;
        }
        let start = date
            .checked_sub_days(Days::new(days as u64 - 1))
            .unwrap_or(NaiveDate::MIN);

        let total: f64 = daily.range(start..=date).map(|(_, d)| d.total_load).sum();
        total / days as f64
    }

    /// Acute over chronic, neutral when there is no chronic load
    pub fn ratio(acute: f64, chronic: f64) -> f64 {
        if chronic <= 0.0 || !chronic.is_finite() {
            1.0
        } else {
            acute / chronic
        }
    }

    fn ratio_at(&self, daily: &BTreeMap<NaiveDate, DailyLoad>, date: NaiveDate) -> (f64, f64, f64) {
        let acute = Self::window_average(daily, date, self.config.acute_days);
        let chronic = Self::window_average(daily, date, self.config.chronic_days);
        (acute, chronic, Self::ratio(acute, chronic))
    }

    /// Trend from the change between two ratios
    pub fn trend(&self, current: f64, previous: f64) -> TrendDirection {
        let change = current - previous;
        if change > self.config.trend_threshold {
            TrendDirection::Increasing
        } else if change < -self.config.trend_threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    /// ACWR for an athlete at a reference date
    pub fn calculate(
        &self,
        athlete_id: &str,
        daily: &BTreeMap<NaiveDate, DailyLoad>,
        date: NaiveDate,
    ) -> AcwrRecord {
        let (acute_load, chronic_load, ratio) = self.ratio_at(daily, date);

        let previous_ratio = date
            .checked_sub_days(Days::new(self.config.trend_lookback_days as u64))
            .map(|earlier| self.ratio_at(daily, earlier).2)
            .unwrap_or(ratio);

        let status = RiskStatus::from_ratio(ratio);
        let trend = self.trend(ratio, previous_ratio);

        AcwrRecord {
            athlete_id: athlete_id.to_string(),
            date,
            acute_load,
            chronic_load,
            ratio,
            status,
            trend,
            recommendation: recommendation(status, trend).to_string(),
        }
    }

    /// ACWR for every day in a range, oldest first
    pub fn calculate_series(
        &self,
        athlete_id: &str,
        daily: &BTreeMap<NaiveDate, DailyLoad>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Vec<AcwrRecord> {
        start_date
            .iter_days()
            .take_while(|d| *d <= end_date)
            .map(|d| self.calculate(athlete_id, daily, d))
            .collect()
    }
}

impl Default for AcwrCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Intensity, SessionType, WorkloadSession};
    use crate::workload::aggregate_daily_loads;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap() + Days::new(n)
    }

    fn session(n: u64, load: f64, intensity: Intensity) -> WorkloadSession {
        WorkloadSession {
            athlete_id: "a1".to_string(),
            date: day(n),
            session_type: SessionType::Training,
            planned_load: load,
            actual_load: None,
            duration_minutes: 60.0,
            intensity,
            perceived_exertion: None,
        }
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(RiskStatus::from_ratio(0.79), RiskStatus::LowRisk);
        assert_eq!(RiskStatus::from_ratio(0.80), RiskStatus::ModerateRisk);
        assert_eq!(RiskStatus::from_ratio(1.29), RiskStatus::ModerateRisk);
        assert_eq!(RiskStatus::from_ratio(1.30), RiskStatus::HighRisk);
        assert_eq!(RiskStatus::from_ratio(1.49), RiskStatus::HighRisk);
        assert_eq!(RiskStatus::from_ratio(1.50), RiskStatus::VeryHighRisk);
    }

    #[test]
    fn test_zero_chronic_load_is_neutral() {
        assert_eq!(AcwrCalculator::ratio(0.0, 0.0), 1.0);
        assert_eq!(AcwrCalculator::ratio(42.0, 0.0), 1.0);

        let record = AcwrCalculator::new().calculate("a1", &BTreeMap::new(), day(0));
        assert_eq!(record.ratio, 1.0);
        assert_eq!(record.status, RiskStatus::ModerateRisk);
        assert_eq!(record.trend, TrendDirection::Stable);
    }

    #[test]
    fn test_constant_load_is_moderate() {
        let sessions: Vec<WorkloadSession> =
            (0..28).map(|n| session(n, 60.0, Intensity::Medium)).collect();
        let daily = aggregate_daily_loads(&sessions);

        let record = AcwrCalculator::new().calculate("a1", &daily, day(27));

        assert!((record.acute_load - 60.0).abs() < 1e-9);
        assert!((record.chronic_load - 60.0).abs() < 1e-9);
        assert!((record.ratio - 1.0).abs() < 1e-9);
        assert_eq!(record.status, RiskStatus::ModerateRisk);
    }

    #[test]
    fn test_spike_without_baseline_is_high_risk() {
        let sessions: Vec<WorkloadSession> = [0, 1, 2, 3, 4, 7, 8, 9, 10, 11]
            .iter()
            .map(|n| session(*n, 90.0, Intensity::High))
            .collect();
        let daily = aggregate_daily_loads(&sessions);

        let record = AcwrCalculator::new().calculate("a1", &daily, day(11));

        assert!(record.ratio > 1.3);
        assert_eq!(record.status, RiskStatus::VeryHighRisk);
        assert!(record.acute_load > record.chronic_load);
    }

    #[test]
    fn test_trend_thresholds() {
        let calculator = AcwrCalculator::new();
        assert_eq!(calculator.trend(1.25, 1.1), TrendDirection::Increasing);
        assert_eq!(calculator.trend(1.0, 1.15), TrendDirection::Decreasing);
        assert_eq!(calculator.trend(1.05, 1.0), TrendDirection::Stable);
    }

    #[test]
    fn test_window_excludes_older_days() {
        let sessions = vec![
            session(0, 100.0, Intensity::Medium),
            session(10, 70.0, Intensity::Medium),
        ];
        let daily = aggregate_daily_loads(&sessions);

        assert!((AcwrCalculator::window_average(&daily, day(10), 7) - 10.0).abs() < 1e-9);
        assert!((AcwrCalculator::window_average(&daily, day(10), 28) - 170.0 / 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_recommendation_lookup_covers_status_and_trend() {
        let text = recommendation(RiskStatus::VeryHighRisk, TrendDirection::Increasing);
        assert!(text.contains("cut load"));
        assert_ne!(
            recommendation(RiskStatus::LowRisk, TrendDirection::Stable),
            recommendation(RiskStatus::LowRisk, TrendDirection::Decreasing)
        );
    }

    #[test]
    fn test_series_length() {
        let daily = aggregate_daily_loads(&[session(0, 50.0, Intensity::Low)]);
        let series = AcwrCalculator::new().calculate_series("a1", &daily, day(0), day(6));
        assert_eq!(series.len(), 7);
        assert_eq!(series[6].date, day(6));
    }
}

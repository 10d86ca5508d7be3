use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of numeric dimensions used when comparing athlete profiles
pub const FEATURE_DIMENSIONS: usize = 8;

/// Upper bound for `current_load`, which may exceed 100 to represent overload
pub const MAX_CURRENT_LOAD: f64 = 150.0;

/// Clamp a value into the 0-100 percentage range
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Intensity of a logged training session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
    Max,
}

impl Intensity {
    /// Load multiplier applied to a session of this intensity
    pub fn multiplier(&self) -> f64 {
        match self {
            Intensity::Low => 0.7,
            Intensity::Medium => 1.0,
            Intensity::High => 1.3,
            Intensity::Max => 1.6,
        }
    }
}

/// Recommended intensity for a training group or the next session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingIntensity {
    Low,
    Medium,
    High,
}

impl fmt::Display for TrainingIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingIntensity::Low => write!(f, "low"),
            TrainingIntensity::Medium => write!(f, "medium"),
            TrainingIntensity::High => write!(f, "high"),
        }
    }
}

/// Direction of a metric over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// Wellness status reported in a readiness snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WellnessStatus {
    #[default]
    Available,
    Limited,
    Injured,
    Unavailable,
}

/// Self-reported or staff-estimated fatigue level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FatigueLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl FatigueLevel {
    /// Numeric fatigue (0-100) for this level
    pub fn score(&self) -> f64 {
        match self {
            FatigueLevel::Low => 20.0,
            FatigueLevel::Moderate => 50.0,
            FatigueLevel::High => 70.0,
            FatigueLevel::VeryHigh => 90.0,
        }
    }
}

/// Severity of a medical restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestrictionSeverity {
    Minor,
    Moderate,
    Severe,
}

/// What a medical restriction forbids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestrictionKind {
    NoTraining,
    LimitedLoad,
    NoContact,
    NoSprinting,
    Other,
}

/// Active medical restriction issued by the medical staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRestriction {
    pub athlete_id: String,
    pub kind: RestrictionKind,
    pub severity: RestrictionSeverity,
    pub description: String,
}

/// Consistency, improvement and compliance ratings (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPerformance {
    pub consistency: f64,
    pub improvement: f64,
    pub compliance: f64,
}

impl Default for HistoricalPerformance {
    fn default() -> Self {
        HistoricalPerformance {
            consistency: 70.0,
            improvement: 50.0,
            compliance: 75.0,
        }
    }
}

/// Athlete record as provided by the roster layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAthlete {
    pub id: String,
    pub name: String,
    pub position: String,

    /// Baseline overall fitness (0-100), if the roster tracks one
    #[serde(default)]
    pub base_fitness: Option<f64>,

    #[serde(default)]
    pub historical_performance: Option<HistoricalPerformance>,
}

/// Per-athlete readiness snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessSnapshot {
    pub athlete_id: String,

    #[serde(default)]
    pub status: WellnessStatus,

    /// Current load as percent of baseline
    #[serde(default)]
    pub load: Option<f64>,

    #[serde(default)]
    pub fatigue: Option<FatigueLevel>,
}

/// Fitness ratings (each 0-100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessScores {
    pub overall: f64,
    pub strength: f64,
    pub endurance: f64,
    pub agility: f64,
    pub recovery: f64,
}

/// Normalized fitness and risk profile of one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub id: String,
    pub name: String,
    pub position: String,
    pub fitness: FitnessScores,

    /// Injury risk (0-100)
    pub injury_risk: f64,

    /// Current load in percent of baseline (0-150)
    pub current_load: f64,

    /// Fatigue (0-100)
    pub fatigue: f64,

    /// Availability (0-100)
    pub availability: f64,

    pub restrictions: Vec<MedicalRestriction>,
    pub historical_performance: HistoricalPerformance,
}

impl AthleteProfile {
    /// Neutral profile used when an athlete has no roster entry
    pub fn neutral(athlete_id: &str) -> Self {
        AthleteProfile {
            id: athlete_id.to_string(),
            name: athlete_id.to_string(),
            position: "unknown".to_string(),
            fitness: FitnessScores {
                overall: 70.0,
                strength: 70.0,
                endurance: 70.0,
                agility: 70.0,
                recovery: 70.0,
            },
            injury_risk: 5.0,
            current_load: 100.0,
            fatigue: 50.0,
            availability: 100.0,
            restrictions: Vec::new(),
            historical_performance: HistoricalPerformance::default(),
        }
    }

    /// Feature vector used for clustering
    ///
    /// Order: overall, strength, endurance, agility, injury risk, current load,
    /// fatigue, availability.
    pub fn feature_vector(&self) -> [f64; FEATURE_DIMENSIONS] {
        [
            self.fitness.overall,
            self.fitness.strength,
            self.fitness.endurance,
            self.fitness.agility,
            self.injury_risk,
            self.current_load,
            self.fatigue,
            self.availability,
        ]
    }

    /// Modeled ability to recover between loads
    pub fn recovery_capacity(&self) -> f64 {
        self.fitness.recovery
    }

    /// Higher values mean the athlete needs recovery more urgently
    pub fn recovery_need(&self) -> f64 {
        self.fatigue + self.injury_risk - self.recovery_capacity()
    }

    pub fn has_restrictions(&self) -> bool {
        !self.restrictions.is_empty()
    }
}

/// Kind of logged session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Training,
    Match,
    Recovery,
    Strength,
    Conditioning,
    Other,
}

/// One logged training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSession {
    pub athlete_id: String,
    pub date: NaiveDate,

    #[serde(default)]
    pub session_type: SessionType,

    pub planned_load: f64,

    #[serde(default)]
    pub actual_load: Option<f64>,

    /// Duration in minutes
    pub duration_minutes: f64,

    pub intensity: Intensity,

    /// Rating of perceived exertion (1-10)
    #[serde(default)]
    pub perceived_exertion: Option<u8>,
}

impl WorkloadSession {
    /// Load after intensity and duration weighting
    ///
    /// `(actual ?? planned) × intensity multiplier × hours`
    pub fn weighted_load(&self) -> f64 {
        let load = self.actual_load.unwrap_or(self.planned_load).max(0.0);
        let hours = self.duration_minutes.max(0.0) / 60.0;
        load * self.intensity.multiplier() * hours
    }
}

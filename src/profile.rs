//! Profile Builder
//!
//! Turns roster records, readiness snapshots and medical restrictions into
//! normalized [`AthleteProfile`]s. Missing inputs fall back to neutral values;
//! nothing here fails.
//!
//! ## Derivation
//! - Fitness: baseline overall fitness scaled per dimension by a
//!   position-indexed modifier table, plus optional illustrative jitter
//! - Injury risk: base 5, +40/+25/+10 per severe/moderate/minor restriction,
//!   +20 (fatigue ≥ 80) or +10 (fatigue ≥ 60), +10 when load exceeds 110%
//! - Availability: 100, reduced by wellness status and restriction kind

use crate::entropy::symmetric_noise;
use crate::models::{
    clamp_percentage, AthleteProfile, FitnessScores, MedicalRestriction, RawAthlete,
    ReadinessSnapshot, RestrictionKind, RestrictionSeverity, WellnessStatus, MAX_CURRENT_LOAD,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const BASE_INJURY_RISK: f64 = 5.0;
const NEUTRAL_LOAD: f64 = 100.0;
const NEUTRAL_FATIGUE: f64 = 50.0;

/// Profile builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Overall fitness used when the roster has none
    pub baseline_fitness: f64,

    /// Amplitude of the illustrative per-dimension jitter (0 disables it)
    pub jitter: f64,

    /// Amplitude of the random fatigue term (0 disables it)
    ///
    /// Stand-in for sensor input; risk decisions never depend on it.
    pub fatigue_noise: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            baseline_fitness: 70.0,
            jitter: 0.0,
            fatigue_noise: 0.0,
        }
    }
}

/// Strength, endurance, agility and recovery multipliers for a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionModifiers {
    pub strength: f64,
    pub endurance: f64,
    pub agility: f64,
    pub recovery: f64,
}

impl PositionModifiers {
    const NEUTRAL: PositionModifiers = PositionModifiers {
        strength: 1.0,
        endurance: 1.0,
        agility: 1.0,
        recovery: 1.0,
    };

    /// Look up the modifiers for a roster position string
    pub fn for_position(position: &str) -> Self {
        match position.trim().to_lowercase().as_str() {
            "goalkeeper" | "keeper" | "gk" => PositionModifiers {
                strength: 1.05,
                endurance: 0.85,
                agility: 1.0,
                recovery: 1.0,
            },
            "defender" | "def" | "back" => PositionModifiers {
                strength: 1.10,
                endurance: 0.95,
                agility: 0.90,
                recovery: 1.0,
            },
            "midfielder" | "mid" | "midfield" => PositionModifiers {
                strength: 0.95,
                endurance: 1.15,
                agility: 1.0,
                recovery: 1.05,
            },
            "forward" | "fwd" | "striker" | "attacker" => PositionModifiers {
                strength: 1.0,
                endurance: 0.95,
                agility: 1.15,
                recovery: 0.95,
            },
            _ => Self::NEUTRAL,
        }
    }
}

impl RestrictionSeverity {
    /// Injury risk added by an active restriction of this severity
    pub fn risk_penalty(&self) -> f64 {
        match self {
            RestrictionSeverity::Severe => 40.0,
            RestrictionSeverity::Moderate => 25.0,
            RestrictionSeverity::Minor => 10.0,
        }
    }
}

/// Builds athlete profiles from upstream records
pub struct ProfileBuilder {
    config: ProfileConfig,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        ProfileBuilder {
            config: ProfileConfig::default(),
        }
    }

    pub fn with_config(config: ProfileConfig) -> Self {
        ProfileBuilder { config }
    }

    /// Build one profile per roster entry, preserving roster order
    pub fn build_profiles<R: Rng + ?Sized>(
        &self,
        athletes: &[RawAthlete],
        readiness: &[ReadinessSnapshot],
        restrictions: &[MedicalRestriction],
        rng: &mut R,
    ) -> Vec<AthleteProfile> {
        let readiness_by_id: HashMap<&str, &ReadinessSnapshot> = readiness
            .iter()
            .map(|r| (r.athlete_id.as_str(), r))
            .collect();

        let mut restrictions_by_id: HashMap<&str, Vec<MedicalRestriction>> = HashMap::new();
        for restriction in restrictions {
            restrictions_by_id
                .entry(restriction.athlete_id.as_str())
                .or_default()
                .push(restriction.clone());
        }

        athletes
            .iter()
            .map(|athlete| {
                let athlete_restrictions = restrictions_by_id
                    .remove(athlete.id.as_str())
                    .unwrap_or_default();
                self.build_profile(
                    athlete,
                    readiness_by_id.get(athlete.id.as_str()).copied(),
                    athlete_restrictions,
                    rng,
                )
            })
            .collect()
    }

    /// Build a single profile
    pub fn build_profile<R: Rng + ?Sized>(
        &self,
        athlete: &RawAthlete,
        readiness: Option<&ReadinessSnapshot>,
        restrictions: Vec<MedicalRestriction>,
        rng: &mut R,
    ) -> AthleteProfile {
        let fitness = self.fitness_scores(athlete, rng);

        let fatigue = clamp_percentage(
            readiness
                .and_then(|r| r.fatigue)
                .map(|level| level.score())
                .unwrap_or(NEUTRAL_FATIGUE)
                + symmetric_noise(rng, self.config.fatigue_noise),
        );

        let current_load = readiness
            .and_then(|r| r.load)
            .filter(|load| load.is_finite())
            .unwrap_or(NEUTRAL_LOAD)
            .clamp(0.0, MAX_CURRENT_LOAD);

        let injury_risk = Self::injury_risk(&restrictions, fatigue, current_load);
        let status = readiness.map(|r| r.status).unwrap_or_default();
        let availability = Self::availability(status, &restrictions);

        debug!(
            athlete = %athlete.id,
            injury_risk,
            availability,
            restrictions = restrictions.len(),
            "Built athlete profile"
        );

        AthleteProfile {
            id: athlete.id.clone(),
            name: athlete.name.clone(),
            position: athlete.position.clone(),
            fitness,
            injury_risk,
            current_load,
            fatigue,
            availability,
            restrictions,
            historical_performance: athlete.historical_performance.unwrap_or_default(),
        }
    }

    fn fitness_scores<R: Rng + ?Sized>(&self, athlete: &RawAthlete, rng: &mut R) -> FitnessScores {
        let baseline = athlete
            .base_fitness
            .filter(|v| v.is_finite())
            .unwrap_or(self.config.baseline_fitness);
        let modifiers = PositionModifiers::for_position(&athlete.position);
        let jitter = self.config.jitter;

        let mut scaled =
            |factor: f64| clamp_percentage(baseline * factor + symmetric_noise(&mut *rng, jitter));

        FitnessScores {
            overall: scaled(1.0),
            strength: scaled(modifiers.strength),
            endurance: scaled(modifiers.endurance),
            agility: scaled(modifiers.agility),
            recovery: scaled(modifiers.recovery),
        }
    }

    /// Injury risk from restrictions, fatigue and overload
    pub fn injury_risk(restrictions: &[MedicalRestriction], fatigue: f64, current_load: f64) -> f64 {
        let restriction_penalty: f64 = restrictions
            .iter()
            .map(|r| r.severity.risk_penalty())
            .sum();

        let fatigue_penalty = if fatigue >= 80.0 {
            20.0
        } else if fatigue >= 60.0 {
            10.0
        } else {
            0.0
        };

        let overload_penalty = if current_load > 110.0 { 10.0 } else { 0.0 };

        clamp_percentage(BASE_INJURY_RISK + restriction_penalty + fatigue_penalty + overload_penalty)
    }

    /// Availability from wellness status and restriction kinds
    pub fn availability(status: WellnessStatus, restrictions: &[MedicalRestriction]) -> f64 {
        let mut availability = match status {
            WellnessStatus::Available => 100.0,
            WellnessStatus::Limited => 70.0,
            WellnessStatus::Injured => 40.0,
            WellnessStatus::Unavailable => return 0.0,
        };

        for restriction in restrictions {
            availability -= match restriction.kind {
                RestrictionKind::NoTraining => return 0.0,
                RestrictionKind::LimitedLoad => 25.0,
                RestrictionKind::NoContact => 20.0,
                RestrictionKind::NoSprinting => 15.0,
                RestrictionKind::Other => 10.0,
            };
        }

        clamp_percentage(availability)
    }
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::seeded;
    use crate::models::FatigueLevel;

    fn athlete(id: &str, position: &str) -> RawAthlete {
        RawAthlete {
            id: id.to_string(),
            name: format!("Athlete {}", id),
            position: position.to_string(),
            base_fitness: Some(80.0),
            historical_performance: None,
        }
    }

    fn restriction(id: &str, kind: RestrictionKind, severity: RestrictionSeverity) -> MedicalRestriction {
        MedicalRestriction {
            athlete_id: id.to_string(),
            kind,
            severity,
            description: "hamstring strain".to_string(),
        }
    }

    #[test]
    fn test_neutral_defaults_without_readiness() {
        let builder = ProfileBuilder::new();
        let mut rng = seeded(1);
        let profile = builder.build_profile(&athlete("a1", "midfielder"), None, vec![], &mut rng);

        assert_eq!(profile.fatigue, 50.0);
        assert_eq!(profile.current_load, 100.0);
        assert_eq!(profile.availability, 100.0);
        assert_eq!(profile.injury_risk, 5.0);
        assert_eq!(profile.historical_performance, Default::default());
    }

    #[test]
    fn test_position_modifiers_shape_fitness() {
        let builder = ProfileBuilder::new();
        let mut rng = seeded(1);
        let mid = builder.build_profile(&athlete("a1", "Midfielder"), None, vec![], &mut rng);
        let fwd = builder.build_profile(&athlete("a2", "fwd"), None, vec![], &mut rng);

        assert_eq!(mid.fitness.overall, 80.0);
        assert!((mid.fitness.endurance - 92.0).abs() < 1e-9);
        assert!(fwd.fitness.agility > mid.fitness.agility);
    }

    #[test]
    fn test_fitness_is_clamped() {
        let builder = ProfileBuilder::new();
        let mut rng = seeded(1);
        let mut raw = athlete("a1", "midfielder");
        raw.base_fitness = Some(95.0);
        let profile = builder.build_profile(&raw, None, vec![], &mut rng);
        assert_eq!(profile.fitness.endurance, 100.0);
    }

    #[test]
    fn test_restriction_penalties_accumulate_and_clamp() {
        let restrictions = vec![
            restriction("a1", RestrictionKind::NoContact, RestrictionSeverity::Severe),
            restriction("a1", RestrictionKind::Other, RestrictionSeverity::Moderate),
        ];
        assert_eq!(ProfileBuilder::injury_risk(&restrictions, 50.0, 100.0), 70.0);
        assert_eq!(ProfileBuilder::injury_risk(&restrictions, 85.0, 120.0), 100.0);

        let minor = vec![restriction("a1", RestrictionKind::Other, RestrictionSeverity::Minor)];
        assert_eq!(ProfileBuilder::injury_risk(&minor, 65.0, 100.0), 25.0);
    }

    #[test]
    fn test_availability_rules() {
        assert_eq!(ProfileBuilder::availability(WellnessStatus::Unavailable, &[]), 0.0);
        assert_eq!(ProfileBuilder::availability(WellnessStatus::Injured, &[]), 40.0);
        assert_eq!(ProfileBuilder::availability(WellnessStatus::Limited, &[]), 70.0);

        let no_sprint = vec![restriction("a1", RestrictionKind::NoSprinting, RestrictionSeverity::Minor)];
        assert_eq!(ProfileBuilder::availability(WellnessStatus::Limited, &no_sprint), 55.0);

        let no_training = vec![restriction("a1", RestrictionKind::NoTraining, RestrictionSeverity::Minor)];
        assert_eq!(ProfileBuilder::availability(WellnessStatus::Available, &no_training), 0.0);
    }

    #[test]
    fn test_build_profiles_joins_inputs_by_id() {
        let builder = ProfileBuilder::new();
        let mut rng = seeded(3);
        let athletes = vec![athlete("a1", "defender"), athlete("a2", "forward")];
        let readiness = vec![ReadinessSnapshot {
            athlete_id: "a2".to_string(),
            status: WellnessStatus::Limited,
            load: Some(118.0),
            fatigue: Some(FatigueLevel::High),
        }];
        let restrictions = vec![restriction("a2", RestrictionKind::LimitedLoad, RestrictionSeverity::Minor)];

        let profiles = builder.build_profiles(&athletes, &readiness, &restrictions, &mut rng);

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].id, "a1");
        assert!(profiles[0].restrictions.is_empty());

        let a2 = &profiles[1];
        assert_eq!(a2.fatigue, 70.0);
        assert_eq!(a2.current_load, 118.0);
        // 5 base + 10 minor + 10 fatigue + 10 overload
        assert_eq!(a2.injury_risk, 35.0);
        assert_eq!(a2.availability, 45.0);
        assert_eq!(a2.restrictions.len(), 1);
    }

    #[test]
    fn test_jitter_is_reproducible_for_a_seed() {
        let builder = ProfileBuilder::with_config(ProfileConfig {
            jitter: 5.0,
            ..ProfileConfig::default()
        });
        let athletes = vec![athlete("a1", "defender"), athlete("a2", "forward")];

        let first = builder.build_profiles(&athletes, &[], &[], &mut seeded(21));
        let second = builder.build_profiles(&athletes, &[], &[], &mut seeded(21));
        assert_eq!(first, second);

        for profile in &first {
            assert!((profile.fitness.overall - 80.0).abs() <= 5.0);
        }
    }
}

//! Distribution Strategy Engine
//!
//! Splits a squad into session-sized training groups. The grouping rule is a
//! [`DistributionStrategy`]; every strategy produces member blocks through the
//! same `plan(clusters, session_count)` signature and the engine turns those
//! blocks into [`SessionGroup`]s (intensity, equipment, notes, size cap).

use crate::clustering::{Cluster, ClusterStats, ClusteringEngine};
use crate::models::{AthleteProfile, TrainingIntensity};
use crate::rules::RuleTable;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

const BASE_CONFIDENCE: f64 = 80.0;
const HIGH_FATIGUE: f64 = 75.0;

/// Distribution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Largest allowed group; bigger groups are split
    pub max_group_size: usize,

    /// Clusters formed before distributing raw profiles
    pub cluster_count: usize,

    /// Intensity score at or above which a group trains high
    pub high_intensity_threshold: f64,

    /// Intensity score at or above which a group trains medium
    pub medium_intensity_threshold: f64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        DistributionConfig {
            max_group_size: 12,
            cluster_count: 4,
            high_intensity_threshold: 70.0,
            medium_intensity_threshold: 50.0,
        }
    }
}

/// How athletes are split into sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionStrategy {
    /// Near-equal contiguous slices of the clustered roster
    Balanced,
    /// Clusters ordered by fitness, contiguous cluster blocks per session
    FitnessBased,
    /// Position blocks spread across sessions
    PositionBased,
    /// Highest recovery need first, that block trains light
    RecoveryFocused,
}

/// Member block produced by a strategy before post-processing
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedGroup {
    pub members: Vec<AthleteProfile>,
    pub forced_intensity: Option<TrainingIntensity>,
}

impl PlannedGroup {
    fn new(members: Vec<AthleteProfile>) -> Self {
        PlannedGroup {
            members,
            forced_intensity: None,
        }
    }
}

impl DistributionStrategy {
    pub const ALL: [DistributionStrategy; 4] = [
        DistributionStrategy::Balanced,
        DistributionStrategy::FitnessBased,
        DistributionStrategy::PositionBased,
        DistributionStrategy::RecoveryFocused,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DistributionStrategy::Balanced => "balanced",
            DistributionStrategy::FitnessBased => "fitness-based",
            DistributionStrategy::PositionBased => "position-based",
            DistributionStrategy::RecoveryFocused => "recovery-focused",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DistributionStrategy::Balanced => "groups of near-equal size across fitness clusters",
            DistributionStrategy::FitnessBased => "athletes of similar fitness train together",
            DistributionStrategy::PositionBased => "positional units train together",
            DistributionStrategy::RecoveryFocused => {
                "athletes with the highest recovery need are grouped into a light session"
            }
        }
    }

    pub fn pros(&self) -> &'static [&'static str] {
        match self {
            DistributionStrategy::Balanced => &["Even group sizes", "Simple to organize"],
            DistributionStrategy::FitnessBased => {
                &["Load matches ability", "Stronger athletes are pushed harder"]
            }
            DistributionStrategy::PositionBased => {
                &["Position-specific drills", "Builds unit cohesion"]
            }
            DistributionStrategy::RecoveryFocused => {
                &["Protects fatigued athletes", "Lowers injury exposure"]
            }
        }
    }

    pub fn cons(&self) -> &'static [&'static str] {
        match self {
            DistributionStrategy::Balanced => &["Mixed fitness within groups"],
            DistributionStrategy::FitnessBased => {
                &["Group sizes can be uneven", "Less mixing across ability levels"]
            }
            DistributionStrategy::PositionBased => {
                &["Ignores fatigue and fitness differences", "Group sizes follow position counts"]
            }
            DistributionStrategy::RecoveryFocused => {
                &["Fresh athletes may be under-loaded", "Groups change often"]
            }
        }
    }

    /// Resolve a strategy name, falling back to balanced with a warning
    pub fn resolve(name: &str) -> (Self, Option<String>) {
        match name.parse::<Self>() {
            Ok(strategy) => (strategy, None),
            Err(_) => (
                DistributionStrategy::Balanced,
                Some(format!(
                    "Unknown strategy '{}', using balanced distribution",
                    name
                )),
            ),
        }
    }

    /// Split clustered athletes into at most `session_count` member blocks
    pub fn plan(&self, clusters: &[Cluster], session_count: usize) -> Vec<PlannedGroup> {
        let session_count = session_count.max(1);
        match self {
            DistributionStrategy::Balanced => {
                let flattened = flatten(clusters.iter());
                near_equal_chunks(flattened, session_count)
                    .into_iter()
                    .map(PlannedGroup::new)
                    .collect()
            }
            DistributionStrategy::FitnessBased => plan_fitness_based(clusters, session_count),
            DistributionStrategy::PositionBased => plan_position_based(clusters, session_count),
            DistributionStrategy::RecoveryFocused => {
                let mut flattened = flatten(clusters.iter());
                flattened.sort_by(|a, b| b.recovery_need().total_cmp(&a.recovery_need()));
                near_equal_chunks(flattened, session_count)
                    .into_iter()
                    .enumerate()
                    .map(|(index, members)| PlannedGroup {
                        members,
                        forced_intensity: (index == 0).then_some(TrainingIntensity::Low),
                    })
                    .collect()
            }
        }
    }
}

impl fmt::Display for DistributionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DistributionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "balanced" => Ok(DistributionStrategy::Balanced),
            "fitness" | "fitnessbased" => Ok(DistributionStrategy::FitnessBased),
            "position" | "positionbased" => Ok(DistributionStrategy::PositionBased),
            "recovery" | "recoveryfocused" => Ok(DistributionStrategy::RecoveryFocused),
            _ => Err(format!("Invalid distribution strategy: {}", s)),
        }
    }
}

fn flatten<'a, I>(clusters: I) -> Vec<AthleteProfile>
where
    I: Iterator<Item = &'a Cluster>,
{
    clusters.flat_map(|c| c.members.iter().cloned()).collect()
}

/// Contiguous chunks whose sizes differ by at most one
pub fn near_equal_chunks<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let parts = parts.max(1);
    let base = items.len() / parts;
    let remainder = items.len() % parts;

    let mut chunks = Vec::with_capacity(parts);
    let mut iter = items.into_iter();
    for index in 0..parts {
        let size = base + usize::from(index < remainder);
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}

fn plan_fitness_based(clusters: &[Cluster], session_count: usize) -> Vec<PlannedGroup> {
    let mut ordered: Vec<&Cluster> = clusters.iter().collect();
    ordered.sort_by(|a, b| b.stats.mean_fitness.total_cmp(&a.stats.mean_fitness));

    if ordered.len() >= session_count {
        return near_equal_chunks(ordered, session_count)
            .into_iter()
            .map(|block| PlannedGroup::new(flatten(block.into_iter())))
            .collect();
    }

    // Not enough clusters to fill every session: slice the fitness ordering instead
    let mut flattened = flatten(ordered.into_iter());
    flattened.sort_by(|a, b| b.fitness.overall.total_cmp(&a.fitness.overall));
    near_equal_chunks(flattened, session_count)
        .into_iter()
        .map(PlannedGroup::new)
        .collect()
}

fn plan_position_based(clusters: &[Cluster], session_count: usize) -> Vec<PlannedGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut blocks: HashMap<String, Vec<AthleteProfile>> = HashMap::new();
    for profile in clusters.iter().flat_map(|c| c.members.iter()) {
        let key = profile.position.trim().to_lowercase();
        if !blocks.contains_key(&key) {
            order.push(key.clone());
        }
        blocks.entry(key).or_default().push(profile.clone());
    }

    let mut position_blocks: Vec<Vec<AthleteProfile>> = order
        .into_iter()
        .filter_map(|key| blocks.remove(&key))
        .collect();
    position_blocks.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut sessions: Vec<Vec<AthleteProfile>> = vec![Vec::new(); session_count];
    for block in position_blocks {
        let target = sessions
            .iter()
            .enumerate()
            .min_by_key(|(index, members)| (members.len(), *index))
            .map(|(index, _)| index)
            .unwrap_or(0);
        sessions[target].extend(block);
    }

    sessions.into_iter().map(PlannedGroup::new).collect()
}

/// Training group for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionGroup {
    pub id: String,
    pub name: String,
    pub members: Vec<AthleteProfile>,
    pub intensity: TrainingIntensity,
    pub equipment: Vec<String>,
    pub notes: Vec<String>,
}

impl SessionGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Alternative distribution offered for comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeOption {
    pub strategy: DistributionStrategy,
    pub session_groups: Vec<SessionGroup>,
    pub confidence_score: f64,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Output of a distribution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionResult {
    pub strategy: DistributionStrategy,
    pub session_groups: Vec<SessionGroup>,
    pub reasoning: String,
    pub confidence_score: f64,
    pub alternative_options: Vec<AlternativeOption>,
    pub warnings: Vec<String>,
}

/// Inputs to the group note rules
pub struct GroupNoteContext {
    pub stats: ClusterStats,
    pub intensity: TrainingIntensity,
    pub restricted: usize,
    pub high_fatigue: usize,
}

/// Notes attached to each session group, in priority order
pub fn group_note_rules() -> RuleTable<GroupNoteContext, String> {
    RuleTable::new()
        .rule(
            "restrictions",
            |c: &GroupNoteContext| c.restricted > 0,
            |c| {
                format!(
                    "{} athlete(s) with active medical restrictions - check clearance before drills",
                    c.restricted
                )
            },
        )
        .rule(
            "high-fatigue",
            |c: &GroupNoteContext| c.high_fatigue > 0,
            |c| format!("{} athlete(s) report high fatigue", c.high_fatigue),
        )
        .rule(
            "light-session",
            |c: &GroupNoteContext| c.intensity == TrainingIntensity::Low,
            |_| "Emphasize technique, mobility and recovery work".to_string(),
        )
        .rule(
            "hard-session",
            |c: &GroupNoteContext| c.intensity == TrainingIntensity::High,
            |_| "Suitable for high-intensity conditioning".to_string(),
        )
        .rule(
            "low-availability",
            |c: &GroupNoteContext| c.stats.mean_availability < 60.0,
            |c| format!("Mean availability only {:.0}%", c.stats.mean_availability),
        )
}

fn equipment_for(intensity: TrainingIntensity) -> Vec<String> {
    let items: &[&str] = match intensity {
        TrainingIntensity::Low => &["foam rollers", "resistance bands", "mats"],
        TrainingIntensity::Medium => &["cones", "agility ladders", "balls"],
        TrainingIntensity::High => &["cones", "sleds", "GPS vests", "balls"],
    };
    items.iter().map(|s| s.to_string()).collect()
}

/// Builds session groups from clusters or raw profiles
pub struct DistributionEngine {
    config: DistributionConfig,
    clustering: ClusteringEngine,
    notes: RuleTable<GroupNoteContext, String>,
}

impl DistributionEngine {
    pub fn new() -> Self {
        Self::with_config(DistributionConfig::default(), ClusteringEngine::new())
    }

    pub fn with_config(config: DistributionConfig, clustering: ClusteringEngine) -> Self {
        DistributionEngine {
            config,
            clustering,
            notes: group_note_rules(),
        }
    }

    /// Cluster raw profiles, then distribute them
    pub fn distribute<R: Rng + ?Sized>(
        &self,
        profiles: &[AthleteProfile],
        strategy: &str,
        session_count: usize,
        rng: &mut R,
    ) -> DistributionResult {
        let clusters = self
            .clustering
            .cluster(profiles, self.config.cluster_count, rng);
        self.distribute_clusters(&clusters, strategy, session_count)
    }

    /// Distribute already clustered athletes using a strategy name
    pub fn distribute_clusters(
        &self,
        clusters: &[Cluster],
        strategy: &str,
        session_count: usize,
    ) -> DistributionResult {
        let (resolved, fallback_warning) = DistributionStrategy::resolve(strategy);
        if let Some(message) = &fallback_warning {
            warn!(requested = strategy, "{}", message);
        }

        let mut result = self.distribute_with(clusters, resolved, session_count);
        if let Some(message) = fallback_warning {
            result.warnings.insert(0, message);
        }
        result
    }

    /// Distribute already clustered athletes with a typed strategy
    pub fn distribute_with(
        &self,
        clusters: &[Cluster],
        strategy: DistributionStrategy,
        session_count: usize,
    ) -> DistributionResult {
        let mut warnings = Vec::new();
        if session_count == 0 {
            warnings.push("Session count of 0 requested, using 1 session".to_string());
        }
        let sessions = session_count.max(1);
        let athlete_count: usize = clusters.iter().map(|c| c.len()).sum();

        let max_group_size = self.config.max_group_size.max(1);
        if self.config.max_group_size == 0 {
            warnings.push("Maximum group size of 0 configured, using 1".to_string());
        }

        let session_groups =
            self.build_groups(clusters, strategy, sessions, max_group_size, &mut warnings);
        let confidence_score = Self::confidence(&session_groups);

        if athlete_count == 0 {
            warnings.push("No athletes to distribute".to_string());
        } else if athlete_count < sessions {
            warnings.push(format!(
                "Only {} athlete(s) for {} sessions; some sessions are left empty",
                athlete_count, sessions
            ));
        }
        if strategy == DistributionStrategy::RecoveryFocused {
            warnings.push("Some high-fatigue players may need reduced intensity".to_string());
        }

        let alternative_options = DistributionStrategy::ALL
            .iter()
            .copied()
            .filter(|s| *s != strategy)
            .take(2)
            .map(|alternative| {
                let groups = self.build_groups(
                    clusters,
                    alternative,
                    sessions,
                    max_group_size,
                    &mut Vec::new(),
                );
                AlternativeOption {
                    strategy: alternative,
                    confidence_score: Self::confidence(&groups),
                    session_groups: groups,
                    pros: alternative.pros().iter().map(|s| s.to_string()).collect(),
                    cons: alternative.cons().iter().map(|s| s.to_string()).collect(),
                }
            })
            .collect();

        let reasoning = format!(
            "{} distribution of {} athlete(s) from {} cluster(s) into {} group(s): {}",
            strategy,
            athlete_count,
            clusters.len(),
            session_groups.len(),
            strategy.description()
        );

        debug!(
            strategy = %strategy,
            groups = session_groups.len(),
            confidence = confidence_score,
            warnings = warnings.len(),
            "Distribution complete"
        );

        DistributionResult {
            strategy,
            session_groups,
            reasoning,
            confidence_score,
            alternative_options,
            warnings,
        }
    }

    fn build_groups(
        &self,
        clusters: &[Cluster],
        strategy: DistributionStrategy,
        session_count: usize,
        max_group_size: usize,
        warnings: &mut Vec<String>,
    ) -> Vec<SessionGroup> {
        let mut groups = Vec::new();

        let planned = strategy
            .plan(clusters, session_count)
            .into_iter()
            .filter(|p| !p.members.is_empty());

        for (index, plan) in planned.enumerate() {
            let number = index + 1;
            let stats = ClusterStats::from_profiles(&plan.members);
            let intensity = plan
                .forced_intensity
                .unwrap_or_else(|| self.intensity_for(&stats));

            let high_fatigue: Vec<&str> = plan
                .members
                .iter()
                .filter(|m| m.fatigue > HIGH_FATIGUE)
                .map(|m| m.name.as_str())
                .collect();
            if intensity == TrainingIntensity::High && !high_fatigue.is_empty() {
                warnings.push(format!(
                    "Session {} is high intensity but includes high-fatigue athletes: {}",
                    number,
                    high_fatigue.join(", ")
                ));
            }

            let context = GroupNoteContext {
                intensity,
                restricted: plan.members.iter().filter(|m| m.has_restrictions()).count(),
                high_fatigue: high_fatigue.len(),
                stats,
            };
            let mut notes = vec![format!("{} group", strategy)];
            notes.extend(self.notes.evaluate(&context));
            let equipment = equipment_for(intensity);

            let id = format!("{}-{}", strategy.name(), number);
            let name = format!("Session {}", number);

            if plan.members.len() <= max_group_size {
                groups.push(SessionGroup {
                    id,
                    name,
                    members: plan.members,
                    intensity,
                    equipment,
                    notes,
                });
                continue;
            }

            let parts = plan.members.len().div_ceil(max_group_size);
            warnings.push(format!(
                "{} exceeded the maximum group size of {} and was split into {} groups",
                name, max_group_size, parts
            ));
            for (part, members) in near_equal_chunks(plan.members, parts).into_iter().enumerate() {
                let suffix = sub_group_suffix(part);
                groups.push(SessionGroup {
                    id: format!("{}{}", id, suffix.to_lowercase()),
                    name: format!("{}{}", name, suffix),
                    members,
                    intensity,
                    equipment: equipment.clone(),
                    notes: notes.clone(),
                });
            }
        }

        groups
    }

    /// Intensity from `fitness − 0.5×fatigue − 0.3×risk`
    pub fn intensity_for(&self, stats: &ClusterStats) -> TrainingIntensity {
        let score =
            stats.mean_fitness - 0.5 * stats.mean_fatigue - 0.3 * stats.mean_injury_risk;
        if score >= self.config.high_intensity_threshold {
            TrainingIntensity::High
        } else if score >= self.config.medium_intensity_threshold {
            TrainingIntensity::Medium
        } else {
            TrainingIntensity::Low
        }
    }

    /// Base 80, adjusted for group-size spread and mean availability
    pub fn confidence(groups: &[SessionGroup]) -> f64 {
        if groups.is_empty() {
            return 0.0;
        }

        let sizes: Vec<f64> = groups.iter().map(|g| g.len() as f64).collect();
        let mean_size = sizes.iter().sum::<f64>() / sizes.len() as f64;
        let variance =
            sizes.iter().map(|s| (s - mean_size).powi(2)).sum::<f64>() / sizes.len() as f64;

        let availability = ClusterStats::from_profiles(groups.iter().flat_map(|g| g.members.iter()))
            .mean_availability;

        let mut confidence = BASE_CONFIDENCE;
        confidence += if variance <= 2.0 { 10.0 } else { -10.0 };
        confidence += if availability >= 80.0 { 5.0 } else { -5.0 };
        confidence.clamp(0.0, 100.0)
    }
}

impl Default for DistributionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn sub_group_suffix(part: usize) -> String {
    let mut n = part;
    let mut suffix = String::new();
    loop {
        suffix.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    suffix
}

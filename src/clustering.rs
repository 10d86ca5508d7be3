//! Clustering Engine
//!
//! Groups athlete profiles with k-means over the 8-dimensional feature vector
//! (overall, strength, endurance, agility, injury risk, current load,
//! fatigue, availability).
//!
//! ## Algorithm
//! 1. k-means++ seeding: first centroid uniform, each further centroid drawn
//!    with probability proportional to its squared distance from the nearest
//!    chosen centroid
//! 2. Lloyd iterations: assign to the nearest centroid, move each centroid to
//!    the mean of its members
//! 3. Stop once every centroid moves less than the convergence threshold, or
//!    after `max_iterations`
//!
//! Fewer profiles than requested clusters yields a single cluster holding
//! everyone. Clusters left empty at the end are dropped, so the output never
//! has more than `k` entries.

use crate::entropy::weighted_index;
use crate::models::{AthleteProfile, FEATURE_DIMENSIONS};
use crate::rules::RuleTable;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// A point in profile feature space
pub type FeatureVector = [f64; FEATURE_DIMENSIONS];

/// Clustering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Cluster count used when the caller does not pass one
    pub default_k: usize,

    /// Hard cap on Lloyd iterations
    pub max_iterations: usize,

    /// Largest centroid movement still considered converged
    pub convergence_threshold: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        ClusteringConfig {
            default_k: 4,
            max_iterations: 100,
            convergence_threshold: 0.01,
        }
    }
}

/// Aggregate statistics over a set of profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub size: usize,
    pub mean_fitness: f64,
    pub mean_fatigue: f64,
    pub mean_injury_risk: f64,
    pub mean_availability: f64,
    pub dominant_position: Option<String>,
}

impl ClusterStats {
    pub fn from_profiles<'a, I>(profiles: I) -> Self
    where
        I: IntoIterator<Item = &'a AthleteProfile>,
    {
        let mut size = 0usize;
        let mut fitness = 0.0;
        let mut fatigue = 0.0;
        let mut risk = 0.0;
        let mut availability = 0.0;
        // position -> (count, first seen order)
        let mut positions: HashMap<&str, (usize, usize)> = HashMap::new();

        for profile in profiles {
            fitness += profile.fitness.overall;
            fatigue += profile.fatigue;
            risk += profile.injury_risk;
            availability += profile.availability;
            let seen = positions.len();
            positions.entry(profile.position.as_str()).or_insert((0, seen)).0 += 1;
            size += 1;
        }

        if size == 0 {
            return ClusterStats {
                size: 0,
                mean_fitness: 0.0,
                mean_fatigue: 0.0,
                mean_injury_risk: 0.0,
                mean_availability: 0.0,
                dominant_position: None,
            };
        }

        let n = size as f64;
        let dominant_position = positions
            .into_iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
            .map(|(position, _)| position.to_string());

        ClusterStats {
            size,
            mean_fitness: fitness / n,
            mean_fatigue: fatigue / n,
            mean_injury_risk: risk / n,
            mean_availability: availability / n,
            dominant_position,
        }
    }

    /// `0.8×fitness − 0.3×fatigue − 0.2×risk`, clamped to [40, 100]
    pub fn recommended_load(&self) -> f64 {
        (0.8 * self.mean_fitness - 0.3 * self.mean_fatigue - 0.2 * self.mean_injury_risk)
            .clamp(40.0, 100.0)
    }
}

/// Group of similar athletes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: usize,
    pub centroid: FeatureVector,
    pub members: Vec<AthleteProfile>,
    pub characteristics: Vec<String>,

    /// Recommended load in percent of baseline (40-100)
    pub recommended_load: f64,

    pub stats: ClusterStats,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Clustering output plus convergence details
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringReport {
    pub clusters: Vec<Cluster>,
    pub iterations: usize,
    pub converged: bool,
}

/// Descriptive labels for a cluster, in priority order
pub fn characteristic_rules() -> RuleTable<ClusterStats, String> {
    RuleTable::new()
        .rule(
            "high-fitness",
            |s: &ClusterStats| s.mean_fitness >= 80.0,
            |s| format!("High fitness level (avg {:.0})", s.mean_fitness),
        )
        .rule(
            "moderate-fitness",
            |s: &ClusterStats| (60.0..80.0).contains(&s.mean_fitness),
            |s| format!("Moderate fitness level (avg {:.0})", s.mean_fitness),
        )
        .rule(
            "developing-fitness",
            |s: &ClusterStats| s.mean_fitness < 60.0,
            |s| format!("Developing fitness level (avg {:.0})", s.mean_fitness),
        )
        .rule(
            "high-fatigue",
            |s: &ClusterStats| s.mean_fatigue > 70.0,
            |_| "High fatigue - prioritize recovery".to_string(),
        )
        .rule(
            "well-recovered",
            |s: &ClusterStats| s.mean_fatigue < 30.0,
            |_| "Well recovered".to_string(),
        )
        .rule(
            "elevated-risk",
            |s: &ClusterStats| s.mean_injury_risk >= 50.0,
            |s| format!("Elevated injury risk (avg {:.0})", s.mean_injury_risk),
        )
        .rule(
            "low-risk",
            |s: &ClusterStats| s.mean_injury_risk < 20.0,
            |_| "Low injury risk".to_string(),
        )
        .rule(
            "limited-availability",
            |s: &ClusterStats| s.mean_availability < 60.0,
            |_| "Limited availability".to_string(),
        )
        .rule(
            "dominant-position",
            |s: &ClusterStats| s.dominant_position.is_some(),
            |s| format!("Mostly {}", s.dominant_position.as_deref().unwrap_or_default()),
        )
}

/// Squared Euclidean distance
pub fn squared_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(point: &FeatureVector, centroids: &[FeatureVector]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

/// k-means engine
pub struct ClusteringEngine {
    config: ClusteringConfig,
    characteristics: RuleTable<ClusterStats, String>,
}

impl ClusteringEngine {
    pub fn new() -> Self {
        Self::with_config(ClusteringConfig::default())
    }

    pub fn with_config(config: ClusteringConfig) -> Self {
        ClusteringEngine {
            config,
            characteristics: characteristic_rules(),
        }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Cluster profiles into at most `k` groups
    pub fn cluster<R: Rng + ?Sized>(
        &self,
        profiles: &[AthleteProfile],
        k: usize,
        rng: &mut R,
    ) -> Vec<Cluster> {
        self.cluster_with_report(profiles, k, rng).clusters
    }

    /// Cluster profiles and report how the iteration ended
    pub fn cluster_with_report<R: Rng + ?Sized>(
        &self,
        profiles: &[AthleteProfile],
        k: usize,
        rng: &mut R,
    ) -> ClusteringReport {
        if profiles.is_empty() {
            return ClusteringReport {
                clusters: Vec::new(),
                iterations: 0,
                converged: true,
            };
        }

        let k = k.max(1);
        if profiles.len() < k || k == 1 {
            debug!(
                profiles = profiles.len(),
                k, "Too few profiles for the requested clusters, returning one cluster"
            );
            let members = profiles.to_vec();
            let points: Vec<FeatureVector> = members.iter().map(|p| p.feature_vector()).collect();
            let centroid = Self::mean(points.iter()).unwrap_or([0.0; FEATURE_DIMENSIONS]);
            return ClusteringReport {
                clusters: vec![self.build_cluster(0, centroid, members)],
                iterations: 0,
                converged: true,
            };
        }

        let points: Vec<FeatureVector> = profiles.iter().map(|p| p.feature_vector()).collect();
        let mut centroids = Self::seed_centroids(&points, k, rng);
        let mut assignments = vec![0usize; points.len()];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;

            for (assignment, point) in assignments.iter_mut().zip(points.iter()) {
                *assignment = nearest(point, &centroids);
            }

            let mut max_shift: f64 = 0.0;
            for (index, centroid) in centroids.iter_mut().enumerate() {
                let members = points
                    .iter()
                    .zip(assignments.iter())
                    .filter(|(_, a)| **a == index)
                    .map(|(p, _)| p);

                // An empty cluster keeps its previous centroid
                if let Some(updated) = Self::mean(members) {
                    max_shift = max_shift.max(squared_distance(centroid, &updated).sqrt());
                    *centroid = updated;
                }
            }

            if max_shift < self.config.convergence_threshold {
                converged = true;
                break;
            }
        }

        info!(
            profiles = profiles.len(),
            k, iterations, converged, "k-means finished"
        );

        let mut buckets: Vec<Vec<AthleteProfile>> = vec![Vec::new(); k];
        for (profile, assignment) in profiles.iter().zip(assignments.iter()) {
            buckets[*assignment].push(profile.clone());
        }

        let clusters = buckets
            .into_iter()
            .zip(centroids)
            .filter(|(members, _)| !members.is_empty())
            .enumerate()
            .map(|(id, (members, centroid))| self.build_cluster(id, centroid, members))
            .collect();

        ClusteringReport {
            clusters,
            iterations,
            converged,
        }
    }

    /// k-means++ seeding
    pub fn seed_centroids<R: Rng + ?Sized>(
        points: &[FeatureVector],
        k: usize,
        rng: &mut R,
    ) -> Vec<FeatureVector> {
        let mut centroids = Vec::with_capacity(k);
        if points.is_empty() || k == 0 {
            return centroids;
        }

        centroids.push(points[rng.gen_range(0..points.len())]);

        while centroids.len() < k {
            let weights: Vec<f64> = points
                .iter()
                .map(|p| {
                    centroids
                        .iter()
                        .map(|c| squared_distance(p, c))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();

            match weighted_index(rng, &weights) {
                Some(index) => centroids.push(points[index]),
                None => break,
            }
        }

        centroids
    }

    fn mean<'a, I>(points: I) -> Option<FeatureVector>
    where
        I: Iterator<Item = &'a FeatureVector>,
    {
        let mut sum = [0.0; FEATURE_DIMENSIONS];
        let mut count = 0usize;
        for point in points {
            for (total, value) in sum.iter_mut().zip(point.iter()) {
                *total += value;
            }
            count += 1;
        }
        if count == 0 {
            return None;
        }
        for total in sum.iter_mut() {
            *total /= count as f64;
        }
        Some(sum)
    }

    fn build_cluster(
        &self,
        id: usize,
        centroid: FeatureVector,
        members: Vec<AthleteProfile>,
    ) -> Cluster {
        let stats = ClusterStats::from_profiles(&members);
        Cluster {
            id,
            centroid,
            characteristics: self.characteristics.evaluate(&stats),
            recommended_load: stats.recommended_load(),
            members,
            stats,
        }
    }
}

impl Default for ClusteringEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::seeded;
    use std::collections::HashSet;

    fn profile(id: &str, position: &str, fitness: f64, fatigue: f64, risk: f64) -> AthleteProfile {
        let mut p = AthleteProfile::neutral(id);
        p.position = position.to_string();
        p.fitness.overall = fitness;
        p.fitness.strength = fitness;
        p.fitness.endurance = fitness;
        p.fitness.agility = fitness;
        p.fatigue = fatigue;
        p.injury_risk = risk;
        p
    }

    fn two_groups() -> Vec<AthleteProfile> {
        let mut profiles = Vec::new();
        for i in 0..5 {
            profiles.push(profile(&format!("fit{}", i), "midfielder", 90.0 + i as f64, 20.0, 5.0));
            profiles.push(profile(&format!("tired{}", i), "defender", 50.0 + i as f64, 85.0, 60.0));
        }
        profiles
    }

    #[test]
    fn test_empty_input_yields_no_clusters() {
        let engine = ClusteringEngine::new();
        assert!(engine.cluster(&[], 3, &mut seeded(1)).is_empty());
    }

    #[test]
    fn test_fewer_profiles_than_k_gives_single_cluster() {
        let engine = ClusteringEngine::new();
        let profiles = two_groups()[..3].to_vec();
        let clusters = engine.cluster(&profiles, 4, &mut seeded(1));

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn test_separates_obvious_groups() {
        let engine = ClusteringEngine::new();
        let report = engine.cluster_with_report(&two_groups(), 2, &mut seeded(7));

        assert!(report.converged);
        assert_eq!(report.clusters.len(), 2);
        for cluster in &report.clusters {
            assert_eq!(cluster.len(), 5);
            let prefix = &cluster.members[0].id[..3];
            assert!(cluster.members.iter().all(|m| m.id.starts_with(prefix)));
        }
    }

    #[test]
    fn test_every_profile_lands_in_one_cluster() {
        let engine = ClusteringEngine::new();
        let profiles = two_groups();
        let clusters = engine.cluster(&profiles, 3, &mut seeded(2));

        assert!(clusters.len() <= 3);
        let ids: Vec<&str> = clusters
            .iter()
            .flat_map(|c| c.members.iter().map(|m| m.id.as_str()))
            .collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), profiles.len());
        assert_eq!(unique.len(), profiles.len());
    }

    #[test]
    fn test_duplicate_points_do_not_break_seeding() {
        let engine = ClusteringEngine::new();
        let profiles: Vec<AthleteProfile> = (0..6)
            .map(|i| profile(&format!("p{}", i), "forward", 70.0, 40.0, 10.0))
            .collect();
        let clusters = engine.cluster(&profiles, 3, &mut seeded(4));

        let total: usize = clusters.iter().map(|c| c.len()).sum();
        assert_eq!(total, 6);
        assert!(clusters.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_same_seed_same_clusters() {
        let engine = ClusteringEngine::new();
        let a = engine.cluster(&two_groups(), 3, &mut seeded(99));
        let b = engine.cluster(&two_groups(), 3, &mut seeded(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_recommended_load_formula_and_clamp() {
        let stats = ClusterStats {
            size: 1,
            mean_fitness: 100.0,
            mean_fatigue: 10.0,
            mean_injury_risk: 10.0,
            mean_availability: 100.0,
            dominant_position: None,
        };
        assert!((stats.recommended_load() - 75.0).abs() < 1e-9);

        let tired = ClusterStats {
            mean_fitness: 50.0,
            mean_fatigue: 90.0,
            ..stats
        };
        assert_eq!(tired.recommended_load(), 40.0);
    }

    #[test]
    fn test_characteristics() {
        let stats = ClusterStats::from_profiles(&[
            profile("a", "defender", 85.0, 80.0, 55.0),
            profile("b", "defender", 85.0, 80.0, 55.0),
            profile("c", "forward", 85.0, 80.0, 55.0),
        ]);
        let labels = characteristic_rules().evaluate(&stats);

        assert_eq!(stats.dominant_position.as_deref(), Some("defender"));
        assert!(labels.iter().any(|l| l.starts_with("High fitness")));
        assert!(labels.iter().any(|l| l.starts_with("High fatigue")));
        assert!(labels.iter().any(|l| l.starts_with("Elevated injury risk")));
        assert_eq!(labels.last().map(String::as_str), Some("Mostly defender"));
    }

    #[test]
    fn test_seeding_spreads_centroids() {
        let points: Vec<FeatureVector> = vec![[0.0; 8], [0.0; 8], [100.0; 8]];
        let centroids = ClusteringEngine::seed_centroids(&points, 2, &mut seeded(3));
        assert_eq!(centroids.len(), 2);
        assert_ne!(centroids[0], centroids[1]);
    }
}

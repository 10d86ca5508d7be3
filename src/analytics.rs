//! Workload analytics facade
//!
//! [`WorkloadAnalytics`] owns the engines, the workload store and the small
//! amount of per-athlete state (registered profiles, last EWMA state,
//! performance observations) needed to answer every query by athlete id.
//! All methods take `&self`, so one instance can be shared across threads and
//! the batch variants fan out over rayon.

use crate::acwr::{AcwrCalculator, AcwrRecord};
use crate::alerts::{AlertGenerator, FatigueAlert};
use crate::clustering::{Cluster, ClusteringEngine};
use crate::config::AnalyticsConfig;
use crate::distribution::{DistributionEngine, DistributionResult};
use crate::entropy::{self, Entropy};
use crate::ewma::{EwmaSmoother, EwmaState};
use crate::models::{
    AthleteProfile, MedicalRestriction, RawAthlete, ReadinessSnapshot, WorkloadSession,
};
use crate::performance::{PerformanceObservation, PerformancePrediction, PerformanceTrendPredictor};
use crate::profile::ProfileBuilder;
use crate::recovery::{RecoveryPrediction, RecoveryPredictor};
use crate::workload::WorkloadTracker;
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Entry point for profile, grouping and workload queries
pub struct WorkloadAnalytics {
    config: AnalyticsConfig,
    profile_builder: ProfileBuilder,
    clustering: ClusteringEngine,
    distribution: DistributionEngine,
    tracker: WorkloadTracker,
    acwr: AcwrCalculator,
    ewma: EwmaSmoother,
    recovery: RecoveryPredictor,
    alerts: AlertGenerator,
    performance: PerformanceTrendPredictor,
    profiles: RwLock<HashMap<String, AthleteProfile>>,
    ewma_states: RwLock<HashMap<String, EwmaState>>,
    observations: RwLock<HashMap<String, Vec<PerformanceObservation>>>,
}

impl WorkloadAnalytics {
    pub fn new() -> Self {
        Self::with_config(AnalyticsConfig::default())
    }

    pub fn with_config(config: AnalyticsConfig) -> Self {
        WorkloadAnalytics {
            profile_builder: ProfileBuilder::with_config(config.profile.clone()),
            clustering: ClusteringEngine::with_config(config.clustering.clone()),
            distribution: DistributionEngine::with_config(
                config.distribution.clone(),
                ClusteringEngine::with_config(config.clustering.clone()),
            ),
            tracker: WorkloadTracker::with_config(config.workload.clone()),
            acwr: AcwrCalculator::with_config(config.acwr.clone()),
            ewma: EwmaSmoother::with_config(config.ewma.clone()),
            recovery: RecoveryPredictor::with_config(config.recovery.clone()),
            alerts: AlertGenerator::with_config(config.alerts.clone()),
            performance: PerformanceTrendPredictor::with_config(config.performance.clone()),
            profiles: RwLock::new(HashMap::new()),
            ewma_states: RwLock::new(HashMap::new()),
            observations: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn tracker(&self) -> &WorkloadTracker {
        &self.tracker
    }

    /// Fresh source per call, so a seeded instance repeats itself
    fn entropy_for(&self, operation: &str) -> Entropy {
        entropy::keyed(self.config.seed, &format!("op:{}", operation))
    }

    // Profiles and grouping

    /// Build profiles and register them for later workload queries
    #[instrument(skip_all, fields(athletes = athletes.len()))]
    pub fn build_profiles(
        &self,
        athletes: &[RawAthlete],
        readiness: &[ReadinessSnapshot],
        restrictions: &[MedicalRestriction],
    ) -> Vec<AthleteProfile> {
        let mut rng = self.entropy_for("profiles");
        let profiles = self
            .profile_builder
            .build_profiles(athletes, readiness, restrictions, &mut rng);
        self.register_profiles(&profiles);
        profiles
    }

    /// Make profiles available to recovery and alert queries
    pub fn register_profiles(&self, profiles: &[AthleteProfile]) {
        let mut registry = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        for profile in profiles {
            registry.insert(profile.id.clone(), profile.clone());
        }
        debug!(count = profiles.len(), "Registered athlete profiles");
    }

    /// Registered profile, or a neutral one for unknown athletes
    pub fn profile(&self, athlete_id: &str) -> AthleteProfile {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(athlete_id)
            .cloned()
            .unwrap_or_else(|| AthleteProfile::neutral(athlete_id))
    }

    #[instrument(skip(self, profiles), fields(profiles = profiles.len()))]
    pub fn cluster(&self, profiles: &[AthleteProfile], k: usize) -> Vec<Cluster> {
        self.clustering
            .cluster(profiles, k, &mut self.entropy_for("cluster"))
    }

    #[instrument(skip(self, profiles), fields(profiles = profiles.len()))]
    pub fn distribute(
        &self,
        profiles: &[AthleteProfile],
        strategy: &str,
        session_count: usize,
    ) -> DistributionResult {
        self.distribution.distribute(
            profiles,
            strategy,
            session_count,
            &mut self.entropy_for("distribute"),
        )
    }

    // Workload

    /// Record a session
    ///
    /// A back-dated session invalidates the stored EWMA state of the athlete.
    pub fn add_workload_session(&self, session: WorkloadSession) {
        let athlete_id = session.athlete_id.clone();
        let date = session.date;
        self.tracker.add_session(session);

        let mut states = self.ewma_states.write().unwrap_or_else(PoisonError::into_inner);
        if states.get(&athlete_id).is_some_and(|s| date <= s.date) {
            states.remove(&athlete_id);
            debug!(athlete = %athlete_id, %date, "Dropped stale EWMA state");
        }
    }

    /// Explicit date, else the newest session date, else today
    pub fn reference_date(&self, athlete_id: &str, date: Option<NaiveDate>) -> NaiveDate {
        date.or_else(|| self.tracker.latest_date(athlete_id))
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    #[instrument(skip(self))]
    pub fn get_acwr(&self, athlete_id: &str, date: Option<NaiveDate>) -> AcwrRecord {
        let date = self.reference_date(athlete_id, date);
        let daily = self.tracker.daily_loads(athlete_id);
        self.acwr.calculate(athlete_id, &daily, date)
    }

    #[instrument(skip(self))]
    pub fn get_ewma(&self, athlete_id: &str, date: Option<NaiveDate>) -> EwmaState {
        let date = self.reference_date(athlete_id, date);
        let daily = self.tracker.daily_loads(athlete_id);

        let previous = self
            .ewma_states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(athlete_id)
            .cloned();

        let mut rng = entropy::keyed(self.config.seed, athlete_id);
        let state = self
            .ewma
            .calculate(athlete_id, &daily, date, previous.as_ref(), &mut rng);

        let mut states = self.ewma_states.write().unwrap_or_else(PoisonError::into_inner);
        let newer = states.get(athlete_id).map_or(true, |s| s.date <= state.date);
        if newer {
            states.insert(athlete_id.to_string(), state.clone());
        }
        state
    }

    /// Recovery outlook at `as_of` (now when absent)
    #[instrument(skip(self))]
    pub fn predict_recovery(
        &self,
        athlete_id: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> RecoveryPrediction {
        let date = as_of.map(|t| t.date_naive());
        let acwr = self.get_acwr(athlete_id, date);
        let ewma = self.get_ewma(athlete_id, date);
        let profile = self.profile(athlete_id);

        self.recovery
            .predict(&profile, &acwr, &ewma, as_of.unwrap_or_else(Utc::now))
    }

    /// Fatigue alerts at `as_of` (now when absent)
    #[instrument(skip(self))]
    pub fn get_alerts(&self, athlete_id: &str, as_of: Option<DateTime<Utc>>) -> Vec<FatigueAlert> {
        let date = as_of.map(|t| t.date_naive());
        let acwr = self.get_acwr(athlete_id, date);
        let ewma = self.get_ewma(athlete_id, date);
        let profile = self.profile(athlete_id);
        let now = as_of.unwrap_or_else(Utc::now);

        let recovery = self.recovery.predict(&profile, &acwr, &ewma, now);
        let performance = self.predict_performance(athlete_id, Some(acwr.date));

        self.alerts
            .generate(athlete_id, &acwr, &recovery, performance.as_ref(), now)
    }

    // Performance

    pub fn add_performance_observation(&self, observation: PerformanceObservation) {
        self.observations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(observation.athlete_id.clone())
            .or_default()
            .push(observation);
    }

    /// Performance trend at `date` (the newest observation when absent)
    pub fn predict_performance(
        &self,
        athlete_id: &str,
        date: Option<NaiveDate>,
    ) -> Option<PerformancePrediction> {
        let observations = self.observations.read().unwrap_or_else(PoisonError::into_inner);
        let athlete_observations = observations.get(athlete_id)?;

        let date = date.or_else(|| athlete_observations.iter().map(|o| o.date).max())?;
        self.performance.predict(athlete_id, athlete_observations, date)
    }

    // Batch variants, results in input order

    pub fn get_acwr_batch(&self, athlete_ids: &[String], date: Option<NaiveDate>) -> Vec<AcwrRecord> {
        self.batch("acwr", athlete_ids, |id| self.get_acwr(id, date))
    }

    pub fn get_ewma_batch(&self, athlete_ids: &[String], date: Option<NaiveDate>) -> Vec<EwmaState> {
        self.batch("ewma", athlete_ids, |id| self.get_ewma(id, date))
    }

    pub fn predict_recovery_batch(
        &self,
        athlete_ids: &[String],
        as_of: Option<DateTime<Utc>>,
    ) -> Vec<RecoveryPrediction> {
        self.batch("recovery", athlete_ids, |id| self.predict_recovery(id, as_of))
    }

    pub fn get_alerts_batch(
        &self,
        athlete_ids: &[String],
        as_of: Option<DateTime<Utc>>,
    ) -> Vec<Vec<FatigueAlert>> {
        self.batch("alerts", athlete_ids, |id| self.get_alerts(id, as_of))
    }

    fn batch<T, F>(&self, operation: &'static str, athlete_ids: &[String], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&str) -> T + Sync + Send,
    {
        let start = Instant::now();
        let results: Vec<T> = athlete_ids.par_iter().map(|id| f(id.as_str())).collect();
        info!(
            operation,
            athletes = athlete_ids.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch complete"
        );
        results
    }
}

impl Default for WorkloadAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

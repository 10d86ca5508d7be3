//! Workload Tracker
//!
//! Per-athlete append log of training sessions. Each athlete's log sits behind
//! its own lock, so appends for different athletes never contend while appends
//! for the same athlete are serialized. Logs stay date-ordered and are trimmed
//! to the retention window (90 days by default, counted back from the newest
//! session) as part of every insert.

use crate::models::WorkloadSession;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

/// Workload tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Days of history retained per athlete
    pub retention_days: u32,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig { retention_days: 90 }
    }
}

/// Weighted load aggregated over one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    pub date: NaiveDate,

    /// Sum of weighted session loads
    pub total_load: f64,

    pub session_count: u16,

    /// Individual weighted session loads
    pub session_loads: Vec<f64>,
}

/// Date-ordered sessions of one athlete
#[derive(Debug, Default)]
struct AthleteLog {
    sessions: Vec<WorkloadSession>,
}

impl AthleteLog {
    /// Insert in date order, then drop everything outside the window
    fn append(&mut self, session: WorkloadSession, retention_days: u32) -> usize {
        let position = self.sessions.partition_point(|s| s.date <= session.date);
        self.sessions.insert(position, session);

        let Some(newest) = self.sessions.last().map(|s| s.date) else {
            return 0;
        };
        let Some(cutoff) = newest.checked_sub_days(Days::new(retention_days as u64)) else {
            return 0;
        };

        let expired = self.sessions.partition_point(|s| s.date <= cutoff);
        self.sessions.drain(..expired);
        expired
    }
}

/// Keyed store of athlete session logs
#[derive(Debug, Default)]
pub struct WorkloadTracker {
    config: WorkloadConfig,
    logs: RwLock<HashMap<String, Arc<Mutex<AthleteLog>>>>,
}

impl WorkloadTracker {
    pub fn new() -> Self {
        Self::with_config(WorkloadConfig::default())
    }

    pub fn with_config(config: WorkloadConfig) -> Self {
        WorkloadTracker {
            config,
            logs: RwLock::new(HashMap::new()),
        }
    }

    fn log_for(&self, athlete_id: &str) -> Option<Arc<Mutex<AthleteLog>>> {
        self.logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(athlete_id)
            .cloned()
    }

    fn log_for_insert(&self, athlete_id: &str) -> Arc<Mutex<AthleteLog>> {
        if let Some(log) = self.log_for(athlete_id) {
            return log;
        }
        self.logs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(athlete_id.to_string())
            .or_default()
            .clone()
    }

    /// Append a session and trim the athlete's window
    ///
    /// Returns how many expired sessions were dropped.
    pub fn add_session(&self, session: WorkloadSession) -> usize {
        let athlete_id = session.athlete_id.clone();
        let log = self.log_for_insert(&athlete_id);
        let mut log = log.lock().unwrap_or_else(PoisonError::into_inner);

        let trimmed = log.append(session, self.config.retention_days);
        if trimmed > 0 {
            debug!(athlete = %athlete_id, trimmed, "Trimmed expired workload sessions");
        }
        trimmed
    }

    /// Snapshot of an athlete's sessions, oldest first
    pub fn sessions(&self, athlete_id: &str) -> Vec<WorkloadSession> {
        self.log_for(athlete_id)
            .map(|log| {
                log.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .sessions
                    .clone()
            })
            .unwrap_or_default()
    }

    /// Weighted load per day for an athlete
    pub fn daily_loads(&self, athlete_id: &str) -> BTreeMap<NaiveDate, DailyLoad> {
        aggregate_daily_loads(&self.sessions(athlete_id))
    }

    /// Date of the athlete's newest session
    pub fn latest_date(&self, athlete_id: &str) -> Option<NaiveDate> {
        self.log_for(athlete_id).and_then(|log| {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .sessions
                .last()
                .map(|s| s.date)
        })
    }

    /// Athletes with at least one session, sorted
    pub fn athlete_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn session_count(&self, athlete_id: &str) -> usize {
        self.log_for(athlete_id)
            .map(|log| log.lock().unwrap_or_else(PoisonError::into_inner).sessions.len())
            .unwrap_or(0)
    }
}

/// Aggregate weighted session loads per day
pub fn aggregate_daily_loads(sessions: &[WorkloadSession]) -> BTreeMap<NaiveDate, DailyLoad> {
    let mut daily: BTreeMap<NaiveDate, DailyLoad> = BTreeMap::new();

    for session in sessions {
        let load = session.weighted_load();

        daily
            .entry(session.date)
            .and_modify(|day| {
                day.total_load += load;
                day.session_count += 1;
                day.session_loads.push(load);
            })
            .or_insert(DailyLoad {
                date: session.date,
                total_load: load,
                session_count: 1,
                session_loads: vec![load],
            });
    }

    daily
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Intensity, SessionType};
    use std::thread;

    fn session(athlete: &str, date: NaiveDate, load: f64) -> WorkloadSession {
        WorkloadSession {
            athlete_id: athlete.to_string(),
            date,
            session_type: SessionType::Training,
            planned_load: load,
            actual_load: None,
            duration_minutes: 60.0,
            intensity: Intensity::Medium,
            perceived_exertion: None,
        }
    }

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(n)
    }

    #[test]
    fn test_out_of_order_inserts_stay_sorted() {
        let tracker = WorkloadTracker::new();
        tracker.add_session(session("a1", day(5), 50.0));
        tracker.add_session(session("a1", day(1), 40.0));
        tracker.add_session(session("a1", day(3), 45.0));

        let dates: Vec<NaiveDate> = tracker.sessions("a1").iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(1), day(3), day(5)]);
        assert_eq!(tracker.latest_date("a1"), Some(day(5)));
    }

    #[test]
    fn test_window_is_trimmed_on_insert() {
        let tracker = WorkloadTracker::new();
        tracker.add_session(session("a1", day(0), 50.0));
        tracker.add_session(session("a1", day(10), 50.0));

        let trimmed = tracker.add_session(session("a1", day(95), 50.0));

        assert_eq!(trimmed, 1);
        let dates: Vec<NaiveDate> = tracker.sessions("a1").iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(10), day(95)]);
    }

    #[test]
    fn test_window_keeps_exactly_retention_days() {
        let tracker = WorkloadTracker::new();
        for n in 0..120 {
            tracker.add_session(session("a1", day(n), 50.0));
        }
        assert_eq!(tracker.session_count("a1"), 90);
        assert_eq!(tracker.sessions("a1")[0].date, day(30));
    }

    #[test]
    fn test_daily_aggregation() {
        let sessions = vec![
            session("a1", day(0), 50.0),
            session("a1", day(0), 30.0),
            session("a1", day(2), 20.0),
        ];
        let daily = aggregate_daily_loads(&sessions);

        assert_eq!(daily.len(), 2);
        let first = daily.get(&day(0)).unwrap();
        assert_eq!(first.total_load, 80.0);
        assert_eq!(first.session_count, 2);
        assert_eq!(first.session_loads, vec![50.0, 30.0]);
    }

    #[test]
    fn test_unknown_athlete_is_empty() {
        let tracker = WorkloadTracker::new();
        assert!(tracker.sessions("ghost").is_empty());
        assert!(tracker.latest_date("ghost").is_none());
        assert!(tracker.athlete_ids().is_empty());
    }

    #[test]
    fn test_concurrent_appends_for_many_athletes() {
        let tracker = Arc::new(WorkloadTracker::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for n in 0..30 {
                        tracker.add_session(session(&format!("a{}", t % 2), day(n), 10.0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.athlete_ids(), vec!["a0".to_string(), "a1".to_string()]);
        for id in ["a0", "a1"] {
            let sessions = tracker.sessions(id);
            assert_eq!(sessions.len(), 60);
            assert!(sessions.windows(2).all(|w| w[0].date <= w[1].date));
        }
    }
}

//! Exponentially weighted moving average of daily load
//!
//! `EWMA_t = α·load_t + (1 − α)·EWMA_{t−1}` over every calendar day from the
//! athlete's first recorded day up to the reference date. Rest days count as
//! zero load. The recursion starts from the last stored state when one exists
//! for an earlier date, otherwise from a neutral baseline.

use crate::entropy::symmetric_noise;
use crate::workload::DailyLoad;
use chrono::{Days, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// EWMA configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EwmaConfig {
    /// Smoothing factor in (0, 1]
    pub alpha: f64,

    /// Starting value when no earlier state exists
    pub baseline: f64,

    /// Days kept in the trend sequence and volatility window
    pub window_days: u32,

    pub forecast_days: u32,

    /// Forecast noise as a fraction of volatility (0 disables noise)
    pub noise_scale: f64,
}

impl Default for EwmaConfig {
    fn default() -> Self {
        EwmaConfig {
            alpha: 0.2,
            baseline: 50.0,
            window_days: 14,
            forecast_days: 7,
            noise_scale: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Smoothed load of one athlete at a reference date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EwmaState {
    pub athlete_id: String,
    pub date: NaiveDate,

    /// EWMA at `date`
    pub current: f64,

    /// Trailing daily EWMA values, oldest first, ending at `date`
    pub trend: Vec<f64>,

    /// Population standard deviation of the trailing daily loads
    pub volatility: f64,

    pub forecast: Vec<ForecastPoint>,

    /// Forecast confidence (50-95)
    pub forecast_confidence: f64,
}

impl EwmaState {
    /// Change between the last two trend values
    pub fn delta(&self) -> f64 {
        match self.trend.as_slice() {
            [.., previous, last] => last - previous,
            _ => 0.0,
        }
    }
}

/// EWMA calculation engine
pub struct EwmaSmoother {
    config: EwmaConfig,
}

impl EwmaSmoother {
    pub fn new() -> Self {
        EwmaSmoother {
            config: EwmaConfig::default(),
        }
    }

    pub fn with_config(config: EwmaConfig) -> Self {
        EwmaSmoother { config }
    }

    pub fn config(&self) -> &EwmaConfig {
        &self.config
    }

    fn load_on(daily: &BTreeMap<NaiveDate, DailyLoad>, date: NaiveDate) -> f64 {
        daily.get(&date).map(|d| d.total_load).unwrap_or(0.0)
    }

    /// One smoothing step
    pub fn step(&self, previous: f64, load: f64) -> f64 {
        self.config.alpha * load + (1.0 - self.config.alpha) * previous
    }

    /// Population std-dev of the daily loads in the window ending at `date`
    pub fn volatility(&self, daily: &BTreeMap<NaiveDate, DailyLoad>, date: NaiveDate) -> f64 {
        let window = self.config.window_days.max(1) as u64;
        let start = date
            .checked_sub_days(Days::new(window - 1))
            .unwrap_or(NaiveDate::MIN);

        let loads: Vec<f64> = start
            .iter_days()
            .take_while(|d| *d <= date)
            .map(|d| Self::load_on(daily, d))
            .collect();

        let volatility = loads.iter().population_std_dev();
        if volatility.is_finite() {
            volatility
        } else {
            0.0
        }
    }

    /// Forecast confidence from volatility
    pub fn confidence(volatility: f64) -> f64 {
        (85.0 - 2.0 * volatility).clamp(50.0, 95.0)
    }

    /// EWMA state at `date`
    ///
    /// `previous` is reused as the starting point when it was computed for the
    /// same athlete at an earlier date.
    pub fn calculate<R: Rng + ?Sized>(
        &self,
        athlete_id: &str,
        daily: &BTreeMap<NaiveDate, DailyLoad>,
        date: NaiveDate,
        previous: Option<&EwmaState>,
        rng: &mut R,
    ) -> EwmaState {
        let window = self.config.window_days.max(1) as usize;

        let resume = previous.filter(|p| p.athlete_id == athlete_id && p.date < date);
        let (mut current, mut trend, start) = match resume {
            Some(state) => (
                state.current,
                state.trend.clone(),
                state.date.succ_opt(),
            ),
            None => (
                self.config.baseline,
                Vec::new(),
                daily.keys().next().copied(),
            ),
        };

        if let Some(start) = start {
            for day in start.iter_days().take_while(|d| *d <= date) {
                current = self.step(current, Self::load_on(daily, day));
                trend.push(current);
            }
        }

        if trend.len() > window {
            trend.drain(..trend.len() - window);
        }

        let volatility = self.volatility(daily, date);
        let mut state = EwmaState {
            athlete_id: athlete_id.to_string(),
            date,
            current,
            trend,
            volatility,
            forecast: Vec::new(),
            forecast_confidence: Self::confidence(volatility),
        };
        state.forecast = self.forecast(&state, rng);
        state
    }

    /// Linear extrapolation of the last EWMA change
    pub fn forecast<R: Rng + ?Sized>(&self, state: &EwmaState, rng: &mut R) -> Vec<ForecastPoint> {
        let delta = state.delta();
        let amplitude = state.volatility * self.config.noise_scale;

        (0..self.config.forecast_days)
            .filter_map(|i| {
                let date = state.date.checked_add_days(Days::new(i as u64 + 1))?;
                let value = state.current
                    + delta * (i as f64 + 1.0)
                    + symmetric_noise(&mut *rng, amplitude);
                Some(ForecastPoint {
                    date,
                    value: value.max(0.0),
                })
            })
            .collect()
    }
}

impl Default for EwmaSmoother {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::seeded;
    use crate::models::{Intensity, SessionType, WorkloadSession};
    use crate::workload::aggregate_daily_loads;
    use proptest::prelude::*;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + Days::new(n)
    }

    fn constant_load(load: f64, days: u64) -> BTreeMap<NaiveDate, DailyLoad> {
        let sessions: Vec<WorkloadSession> = (0..days)
            .map(|n| WorkloadSession {
                athlete_id: "a1".to_string(),
                date: day(n),
                session_type: SessionType::Training,
                planned_load: load,
                actual_load: None,
                duration_minutes: 60.0,
                intensity: Intensity::Medium,
                perceived_exertion: None,
            })
            .collect();
        aggregate_daily_loads(&sessions)
    }

    #[test]
    fn test_constant_load_converges() {
        let daily = constant_load(60.0, 20);
        let state = EwmaSmoother::new().calculate("a1", &daily, day(19), None, &mut seeded(1));

        assert!((state.current - 60.0).abs() / 60.0 < 0.01);
        assert_eq!(state.trend.len(), 14);
        assert_eq!(state.volatility, 0.0);
        assert_eq!(state.forecast_confidence, 85.0);
    }

    #[test]
    fn test_first_step_starts_from_baseline() {
        let daily = constant_load(100.0, 1);
        let state = EwmaSmoother::new().calculate("a1", &daily, day(0), None, &mut seeded(1));
        assert!((state.current - 60.0).abs() < 1e-9);
        assert_eq!(state.trend, vec![state.current]);
    }

    #[test]
    fn test_rest_days_decay_the_average() {
        let daily = constant_load(60.0, 10);
        let smoother = EwmaSmoother::new();
        let at_end = smoother.calculate("a1", &daily, day(9), None, &mut seeded(1));
        let after_rest = smoother.calculate("a1", &daily, day(14), None, &mut seeded(1));

        assert!(after_rest.current < at_end.current);
        assert!(after_rest.delta() < 0.0);
    }

    #[test]
    fn test_resume_from_previous_state_matches_full_run() {
        let daily = constant_load(75.0, 30);
        let smoother = EwmaSmoother::new();

        let early = smoother.calculate("a1", &daily, day(10), None, &mut seeded(1));
        let resumed = smoother.calculate("a1", &daily, day(29), Some(&early), &mut seeded(1));
        let full = smoother.calculate("a1", &daily, day(29), None, &mut seeded(1));

        assert!((resumed.current - full.current).abs() < 1e-9);
        assert_eq!(resumed.trend.len(), full.trend.len());
    }

    #[test]
    fn test_stale_previous_state_is_ignored() {
        let daily = constant_load(75.0, 30);
        let smoother = EwmaSmoother::new();

        let later = smoother.calculate("a1", &daily, day(29), None, &mut seeded(1));
        let earlier = smoother.calculate("a1", &daily, day(5), Some(&later), &mut seeded(1));
        let fresh = smoother.calculate("a1", &daily, day(5), None, &mut seeded(1));

        assert_eq!(earlier.current, fresh.current);
    }

    #[test]
    fn test_no_history_uses_baseline() {
        let state =
            EwmaSmoother::new().calculate("a1", &BTreeMap::new(), day(0), None, &mut seeded(1));
        assert_eq!(state.current, 50.0);
        assert!(state.trend.is_empty());
        assert_eq!(state.forecast.len(), 7);
        assert!(state.forecast.iter().all(|p| p.value == 50.0));
    }

    #[test]
    fn test_forecast_extrapolates_delta_and_never_goes_negative() {
        let daily = constant_load(60.0, 5);
        let state =
            EwmaSmoother::new().calculate("a1", &daily, day(40), None, &mut seeded(1));

        assert_eq!(state.forecast[0].date, day(41));
        assert!(state.forecast.windows(2).all(|w| w[1].value <= w[0].value));
        assert!(state.forecast.iter().all(|p| p.value >= 0.0));
    }

    #[test]
    fn test_noise_is_reproducible_with_seed() {
        let mut daily = constant_load(60.0, 14);
        daily.remove(&day(3));
        daily.remove(&day(8));
        let smoother = EwmaSmoother::with_config(EwmaConfig {
            noise_scale: 1.0,
            ..EwmaConfig::default()
        });

        let a = smoother.calculate("a1", &daily, day(13), None, &mut seeded(9));
        let b = smoother.calculate("a1", &daily, day(13), None, &mut seeded(9));
        assert!(a.volatility > 0.0);
        assert_eq!(a.forecast, b.forecast);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(EwmaSmoother::confidence(0.0), 85.0);
        assert_eq!(EwmaSmoother::confidence(40.0), 50.0);
        assert_eq!(EwmaSmoother::confidence(-10.0), 95.0);
    }

    proptest! {
        #[test]
        fn prop_constant_load_converges(load in 40.0f64..150.0, extra in 0u64..20) {
            let days = 20 + extra;
            let daily = constant_load(load, days);
            let state = EwmaSmoother::new()
                .calculate("a1", &daily, day(days - 1), None, &mut seeded(3));
            prop_assert!((state.current - load).abs() / load < 0.01);
        }

        #[test]
        fn prop_ewma_stays_within_load_range(
            loads in proptest::collection::vec(0.0f64..200.0, 1..40)
        ) {
            let sessions: Vec<WorkloadSession> = loads
                .iter()
                .enumerate()
                .map(|(n, load)| WorkloadSession {
                    athlete_id: "a1".to_string(),
                    date: day(n as u64),
                    session_type: SessionType::Training,
                    planned_load: *load,
                    actual_load: None,
                    duration_minutes: 60.0,
                    intensity: Intensity::Medium,
                    perceived_exertion: None,
                })
                .collect();
            let daily = aggregate_daily_loads(&sessions);
            let state = EwmaSmoother::new()
                .calculate("a1", &daily, day(loads.len() as u64 - 1), None, &mut seeded(3));

            let max = loads.iter().cloned().fold(50.0f64, f64::max);
            let min = loads.iter().cloned().fold(50.0f64, f64::min);
            prop_assert!(state.current <= max + 1e-9);
            prop_assert!(state.current >= min - 1e-9);
        }
    }
}

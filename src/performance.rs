//! Performance trend prediction
//!
//! Fits an ordinary least-squares line through an athlete's recent performance
//! scores and classifies the weekly slope as improving, plateau or declining.
//! Confidence grows with the number of observations and shrinks with the
//! spread of the residuals around the fitted line.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

/// Performance predictor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Days of observations considered
    pub lookback_days: u32,

    /// Fewer observations than this yield no prediction
    pub min_observations: usize,

    /// Weekly slope separating a trend from a plateau
    pub slope_threshold: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        PerformanceConfig {
            lookback_days: 42,
            min_observations: 4,
            slope_threshold: 1.0,
        }
    }
}

/// Dated performance score (test result, match rating, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceObservation {
    pub athlete_id: String,
    pub date: NaiveDate,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTrend {
    Improving,
    Plateau,
    Declining,
}

impl fmt::Display for PerformanceTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceTrend::Improving => write!(f, "improving"),
            PerformanceTrend::Plateau => write!(f, "plateau"),
            PerformanceTrend::Declining => write!(f, "declining"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePrediction {
    pub athlete_id: String,
    pub date: NaiveDate,
    pub trend: PerformanceTrend,

    /// Fitted score change per week
    pub weekly_slope: f64,

    /// Fitted score one week after `date`
    pub projected_score: f64,

    /// Confidence (0-95)
    pub confidence: f64,

    pub observations: usize,
}

/// Least-squares line `y = intercept + slope × x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub residual_std_dev: f64,
}

impl LinearFit {
    /// Fit over `(x, y)` points; None when x has no spread
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
        let mean_x = xs.iter().mean();
        let mean_y = ys.iter().mean();

        let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
        if sxx <= f64::EPSILON {
            return None;
        }
        let sxy: f64 = points
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let residuals: Vec<f64> = points
            .iter()
            .map(|(x, y)| y - (intercept + slope * x))
            .collect();
        let residual_std_dev = residuals.iter().population_std_dev();

        Some(LinearFit {
            slope,
            intercept,
            residual_std_dev: if residual_std_dev.is_finite() {
                residual_std_dev
            } else {
                0.0
            },
        })
    }

    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Performance trend engine
pub struct PerformanceTrendPredictor {
    config: PerformanceConfig,
}

impl PerformanceTrendPredictor {
    pub fn new() -> Self {
        PerformanceTrendPredictor {
            config: PerformanceConfig::default(),
        }
    }

    pub fn with_config(config: PerformanceConfig) -> Self {
        PerformanceTrendPredictor { config }
    }

    pub fn classify(&self, weekly_slope: f64) -> PerformanceTrend {
        if weekly_slope > self.config.slope_threshold {
            PerformanceTrend::Improving
        } else if weekly_slope < -self.config.slope_threshold {
            PerformanceTrend::Declining
        } else {
            PerformanceTrend::Plateau
        }
    }

    pub fn confidence(observations: usize, residual_std_dev: f64) -> f64 {
        (50.0 + 5.0 * observations as f64 - 2.0 * residual_std_dev).clamp(0.0, 95.0)
    }

    /// Trend at `date` from the observations inside the lookback window
    pub fn predict(
        &self,
        athlete_id: &str,
        observations: &[PerformanceObservation],
        date: NaiveDate,
    ) -> Option<PerformancePrediction> {
        let start = date
            .checked_sub_days(Days::new(self.config.lookback_days as u64))
            .unwrap_or(NaiveDate::MIN);

        let points: Vec<(f64, f64)> = observations
            .iter()
            .filter(|o| o.athlete_id == athlete_id && o.date > start && o.date <= date)
            .filter(|o| o.score.is_finite())
            .map(|o| ((o.date - start).num_days() as f64, o.score))
            .collect();

        if points.len() < self.config.min_observations {
            return None;
        }
        let fit = LinearFit::fit(&points)?;

        let weekly_slope = fit.slope * 7.0;
        let reference_x = (date - start).num_days() as f64;

        Some(PerformancePrediction {
            athlete_id: athlete_id.to_string(),
            date,
            trend: self.classify(weekly_slope),
            weekly_slope,
            projected_score: fit.at(reference_x + 7.0),
            confidence: Self::confidence(points.len(), fit.residual_std_dev),
            observations: points.len(),
        })
    }
}

impl Default for PerformanceTrendPredictor {
    fn default() -> Self {
        Self::new()
    }
}

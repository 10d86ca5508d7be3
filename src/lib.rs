// Library interface for SquadRS modules
// This allows integration tests and benches to access the core functionality

pub mod acwr;
pub mod alerts;
pub mod analytics;
pub mod clustering;
pub mod config;
pub mod distribution;
pub mod entropy;
pub mod error;
pub mod ewma;
pub mod input;
pub mod logging;
pub mod models;
pub mod performance;
pub mod profile;
pub mod recovery;
pub mod rules;
pub mod workload;

// Re-export commonly used types for convenience
pub use models::*;
pub use acwr::{AcwrCalculator, AcwrRecord, RiskStatus};
pub use alerts::{AlertGenerator, AlertSeverity, AlertType, FatigueAlert};
pub use analytics::WorkloadAnalytics;
pub use clustering::{Cluster, ClusteringEngine};
pub use config::AnalyticsConfig;
pub use distribution::{DistributionEngine, DistributionResult, DistributionStrategy, SessionGroup};
pub use ewma::{EwmaSmoother, EwmaState};
pub use performance::{PerformanceObservation, PerformanceTrend, PerformanceTrendPredictor};
pub use profile::ProfileBuilder;
pub use recovery::{RecoveryPrediction, RecoveryPredictor};
pub use workload::WorkloadTracker;
pub use error::{SquadRsError, Result};
pub use logging::{LogConfig, LogLevel, LogFormat};

// Cross-lap statistics: lap time consistency, trend and session classification

pub mod comparison;

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::analysis::LapAnalysis;
use crate::config::{AnalysisThresholds, SessionThresholds};
use crate::telemetry::SessionMetadata;
use crate::telemetry::signal::{self, LinearFit};

pub use comparison::{ConsistencyAnalysis, LapComparison, PredictiveAnalysis};

/// Minimum number of timed laps before a trend is reported
const MIN_LAPS_FOR_TREND: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Declining => write!(f, "declining"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Practice,
    Qualifying,
    Race,
}

impl SessionType {
    /// Uses the logger's session type when it names one, otherwise guesses from the lap count
    pub fn detect(declared: Option<&str>, lap_count: usize, config: &SessionThresholds) -> Self {
        let declared = declared.map(str::to_lowercase).unwrap_or_default();
        if declared.contains("qual") {
            Self::Qualifying
        } else if declared.contains("race") {
            Self::Race
        } else if declared.contains("practice") || declared.starts_with("fp") {
            Self::Practice
        } else if lap_count <= config.qualifying_max_laps {
            Self::Qualifying
        } else if lap_count <= config.practice_max_laps {
            Self::Practice
        } else {
            Self::Race
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Practice => write!(f, "Practice"),
            Self::Qualifying => write!(f, "Qualifying"),
            Self::Race => write!(f, "Race"),
        }
    }
}

/// Lap time statistics after outlier removal
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LapTimeStatistics {
    pub mean: f64,
    pub std_dev: f64,
    /// `std / mean * 100`, lower is more consistent
    pub consistency_index: f64,
    pub laps_used: usize,
    pub outliers_removed: usize,
}

impl LapTimeStatistics {
    pub fn from_lap_times(lap_times: &[f64], config: &SessionThresholds) -> Option<Self> {
        let timed: Vec<f64> = lap_times.iter().copied().filter(|t| *t > 0.0).collect();
        if timed.is_empty() {
            return None;
        }

        let kept = remove_outliers(&timed, config.outlier_std_factor);
        let mean = signal::mean(&kept);
        let std_dev = signal::std_dev(&kept);
        Some(Self {
            mean,
            std_dev,
            consistency_index: if mean > signal::EPSILON {
                std_dev / mean * 100.0
            } else {
                0.0
            },
            laps_used: kept.len(),
            outliers_removed: timed.len() - kept.len(),
        })
    }
}

/// Drops lap times further than `k` standard deviations from the mean. All laps are kept
/// when there are too few to judge or when removal would leave fewer than two.
pub fn remove_outliers(lap_times: &[f64], k: f64) -> Vec<f64> {
    if lap_times.len() <= 2 {
        return lap_times.to_vec();
    }
    let mean = signal::mean(lap_times);
    let std_dev = signal::std_dev(lap_times);
    let kept: Vec<f64> = lap_times
        .iter()
        .copied()
        .filter(|t| (t - mean).abs() <= k * std_dev)
        .collect();

    if kept.len() < 2 {
        debug!("Outlier removal left {} laps, keeping all of them", kept.len());
        return lap_times.to_vec();
    }
    if kept.len() < lap_times.len() {
        info!(
            "Excluded {} outlier laps from lap time statistics",
            lap_times.len() - kept.len()
        );
    }
    kept
}

/// Least-squares fit of lap time against lap index
pub fn lap_time_fit(lap_times: &[f64]) -> Option<LinearFit> {
    let index: Vec<f64> = (0..lap_times.len()).map(|i| i as f64).collect();
    signal::linear_regression(&index, lap_times)
}

/// Improving when lap times fall, declining when they rise, stable when the fit is weak
pub fn classify_trend(lap_times: &[f64], config: &SessionThresholds) -> Trend {
    if lap_times.len() < MIN_LAPS_FOR_TREND {
        return Trend::Stable;
    }
    match lap_time_fit(lap_times) {
        Some(fit) if fit.r.abs() >= config.trend_r_threshold && fit.slope < 0.0 => {
            Trend::Improving
        }
        Some(fit) if fit.r.abs() >= config.trend_r_threshold && fit.slope > 0.0 => {
            Trend::Declining
        }
        _ => Trend::Stable,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionOverview {
    pub total_laps: usize,
    pub valid_laps: usize,
    pub track: Option<String>,
    pub car: Option<String>,
    pub date: Option<String>,
    /// Seconds, from the metadata or the sum of timed laps
    pub session_duration: f64,
    pub session_type: SessionType,
    pub best_lap_time: Option<f64>,
    pub best_lap_number: Option<u32>,
    pub worst_lap_time: Option<f64>,
    pub average_lap_time: Option<f64>,
    pub lap_time_std: Option<f64>,
    pub consistency_index: Option<f64>,
    pub improvement_trend: Trend,
}

impl SessionOverview {
    pub fn new(
        metadata: &SessionMetadata,
        laps: &[LapAnalysis],
        thresholds: &AnalysisThresholds,
    ) -> Self {
        let timed: Vec<&LapAnalysis> = laps.iter().filter(|lap| lap.is_timed()).collect();
        let lap_times: Vec<f64> = timed.iter().map(|lap| lap.lap_time).collect();
        let statistics = LapTimeStatistics::from_lap_times(&lap_times, &thresholds.session);
        let best = timed
            .iter()
            .min_by(|a, b| a.lap_time.total_cmp(&b.lap_time));

        Self {
            total_laps: laps.len(),
            valid_laps: timed.len(),
            track: metadata.track_name(),
            car: metadata.car.clone(),
            date: metadata.date.clone(),
            session_duration: metadata
                .duration_seconds()
                .unwrap_or_else(|| lap_times.iter().sum()),
            session_type: SessionType::detect(
                metadata.session_type.as_deref(),
                laps.len(),
                &thresholds.session,
            ),
            best_lap_time: best.map(|lap| lap.lap_time),
            best_lap_number: best.map(|lap| lap.lap_number),
            worst_lap_time: lap_times.iter().copied().max_by(f64::total_cmp),
            average_lap_time: statistics.as_ref().map(|s| s.mean),
            lap_time_std: statistics.as_ref().map(|s| s.std_dev),
            consistency_index: statistics.as_ref().map(|s| s.consistency_index),
            improvement_trend: classify_trend(&lap_times, &thresholds.session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SCENARIO_LAPS: [f64; 5] = [110.4, 117.5, 107.2, 110.9, 113.9];

    #[test]
    fn test_consistency_index_is_std_over_mean() {
        let config = SessionThresholds::default();
        let stats = LapTimeStatistics::from_lap_times(&SCENARIO_LAPS, &config).unwrap();
        let expected = signal::std_dev(&SCENARIO_LAPS) / signal::mean(&SCENARIO_LAPS) * 100.0;

        assert_eq!(stats.outliers_removed, 0);
        assert_relative_eq!(stats.consistency_index, expected, epsilon = 1e-12);
        assert!(stats.consistency_index > 3.0 && stats.consistency_index < 3.6);
    }

    #[test]
    fn test_trend_matches_slope_sign() {
        let config = SessionThresholds::default();
        let fit = lap_time_fit(&SCENARIO_LAPS).unwrap();
        let trend = classify_trend(&SCENARIO_LAPS, &config);
        match trend {
            Trend::Stable => assert!(fit.r.abs() < config.trend_r_threshold),
            Trend::Improving => assert!(fit.slope < 0.0),
            Trend::Declining => assert!(fit.slope > 0.0),
        }

        assert_eq!(
            classify_trend(&[100.0, 99.0, 98.2, 97.5, 97.0], &config),
            Trend::Improving
        );
        assert_eq!(
            classify_trend(&[97.0, 97.5, 98.2, 99.0, 100.0], &config),
            Trend::Declining
        );
        assert_eq!(classify_trend(&[100.0, 90.0], &config), Trend::Stable);
    }

    #[test]
    fn test_outliers_are_removed() {
        let times = [100.0, 100.5, 99.8, 100.2, 100.1, 99.9, 100.3, 140.0];
        let kept = remove_outliers(&times, 2.0);
        assert_eq!(kept.len(), 7);
        assert!(!kept.contains(&140.0));
    }

    #[test]
    fn test_outlier_removal_keeps_two_laps_minimum() {
        assert_eq!(remove_outliers(&[100.0, 150.0], 2.0).len(), 2);
        // k = 0 would drop every lap
        assert_eq!(remove_outliers(&[100.0, 101.0, 102.0], 0.0).len(), 3);
    }

    #[test]
    fn test_untimed_laps_are_ignored() {
        let config = SessionThresholds::default();
        assert!(LapTimeStatistics::from_lap_times(&[0.0, -1.0], &config).is_none());
        let stats = LapTimeStatistics::from_lap_times(&[0.0, 90.0, 90.0], &config).unwrap();
        assert_eq!(stats.laps_used, 2);
        assert_relative_eq!(stats.consistency_index, 0.0);
    }

    #[test]
    fn test_session_type_detection() {
        let config = SessionThresholds::default();
        assert_eq!(SessionType::detect(None, 3, &config), SessionType::Qualifying);
        assert_eq!(SessionType::detect(None, 4, &config), SessionType::Practice);
        assert_eq!(SessionType::detect(None, 10, &config), SessionType::Practice);
        assert_eq!(SessionType::detect(None, 11, &config), SessionType::Race);
        assert_eq!(
            SessionType::detect(Some("RACE 2"), 2, &config),
            SessionType::Race
        );
        assert_eq!(
            SessionType::detect(Some("Qualifying"), 30, &config),
            SessionType::Qualifying
        );
        assert_eq!(
            SessionType::detect(Some("unknown"), 30, &config),
            SessionType::Race
        );
    }

    #[test]
    fn test_overview_of_scenario_session() {
        let laps: Vec<LapAnalysis> = SCENARIO_LAPS
            .iter()
            .enumerate()
            .map(|(i, t)| LapAnalysis::empty(i as u32 + 1, *t))
            .chain(std::iter::once(LapAnalysis::empty(6, 0.0)))
            .collect();
        let metadata = SessionMetadata {
            track: Some("Monza".to_string()),
            ..Default::default()
        };
        let overview = SessionOverview::new(&metadata, &laps, &AnalysisThresholds::default());

        assert_eq!(overview.total_laps, 6);
        assert_eq!(overview.valid_laps, 5);
        assert_eq!(overview.best_lap_time, Some(107.2));
        assert_eq!(overview.best_lap_number, Some(3));
        assert_eq!(overview.worst_lap_time, Some(117.5));
        assert_eq!(overview.session_type, SessionType::Practice);
        assert_eq!(overview.track.as_deref(), Some("Monza"));
        assert_relative_eq!(overview.session_duration, SCENARIO_LAPS.iter().sum::<f64>());
    }
}

// Whole-session analysis: every lap, the session statistics and the derived advice

use log::info;
use serde::Serialize;

use crate::analysis::{LapAnalysis, analyze_lap};
use crate::config::AnalysisThresholds;
use crate::insights::{DriverInsight, InsightGenerator, RecommendationEngine};
use crate::session::{ConsistencyAnalysis, LapComparison, PredictiveAnalysis, SessionOverview};
use crate::telemetry::signal;
use crate::telemetry::{Analysis, RawLap, Session};
use crate::track::{LapPerformance, TrackLayout, analyze_lap_performance, detect_track_from_telemetry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    LapTime,
    Consistency,
    Speed,
    Handling,
    Efficiency,
}

/// A single headline number of the session
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerformanceMetric {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub category: MetricCategory,
}

impl PerformanceMetric {
    fn new(name: &str, value: f64, unit: &str, category: MetricCategory) -> Self {
        Self {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
            category,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub session_overview: SessionOverview,
    pub lap_analysis: Vec<LapAnalysis>,
    pub performance_metrics: Vec<PerformanceMetric>,
    pub driver_insights: Vec<DriverInsight>,
    pub comparative_analysis: Analysis<LapComparison>,
    pub predictive_analysis: PredictiveAnalysis,
    pub setup_recommendations: Vec<String>,
    pub consistency_analysis: Analysis<ConsistencyAnalysis>,
}

/// Analyzes every lap of the session and assembles the report.
///
/// When the session carries positions, laps are split on the sectors of the reconstructed
/// track; otherwise on equal shares of elapsed time.
pub fn comprehensive_analysis(session: &Session, thresholds: &AnalysisThresholds) -> AnalysisReport {
    info!(
        "Analyzing session at {}: {} laps",
        session
            .metadata
            .track_name()
            .unwrap_or_else(|| "unknown track".to_string()),
        session.laps.len()
    );

    let layout = detect_track_from_telemetry(session, thresholds);
    let boundaries = (!layout.is_synthesized()).then(|| layout.sector_boundaries());
    let lap_analysis: Vec<LapAnalysis> = session
        .laps
        .iter()
        .map(|lap| analyze_lap(lap, thresholds, boundaries.as_deref()))
        .collect();

    let session_overview = SessionOverview::new(&session.metadata, &lap_analysis, thresholds);
    let driver_insights =
        InsightGenerator::new(&thresholds.insights).generate(&session_overview, &lap_analysis);
    let setup_recommendations = RecommendationEngine::new().recommend(
        &session_overview,
        &lap_analysis,
        &thresholds.insights,
    );
    info!(
        "Session analyzed: {} valid laps, {} insights, {} recommendations",
        session_overview.valid_laps,
        driver_insights.len(),
        setup_recommendations.len()
    );

    AnalysisReport {
        performance_metrics: performance_metrics(&session_overview, &lap_analysis, thresholds),
        comparative_analysis: LapComparison::best_against_previous(&lap_analysis),
        predictive_analysis: PredictiveAnalysis::from_laps(&lap_analysis),
        consistency_analysis: ConsistencyAnalysis::from_laps(&lap_analysis),
        session_overview,
        lap_analysis,
        driver_insights,
        setup_recommendations,
    }
}

fn performance_metrics(
    overview: &SessionOverview,
    laps: &[LapAnalysis],
    thresholds: &AnalysisThresholds,
) -> Vec<PerformanceMetric> {
    let speed_unit = thresholds.speed_unit.symbol();
    let speeds: Vec<_> = laps
        .iter()
        .filter_map(|lap| lap.speed_analysis.as_option())
        .collect();
    let lateral_g: Vec<f64> = laps
        .iter()
        .filter_map(|lap| lap.g_force_analysis.as_option())
        .filter_map(|g| g.lateral.as_ref())
        .map(|lateral| lateral.max_lateral_g)
        .collect();
    let efficiencies: Vec<f64> = laps
        .iter()
        .filter(|lap| lap.valid)
        .map(|lap| lap.efficiency_metrics.overall_efficiency)
        .collect();

    let mut metrics = Vec::new();
    if let Some(best) = overview.best_lap_time {
        metrics.push(PerformanceMetric::new("Best Lap", best, "s", MetricCategory::LapTime));
    }
    if let Some(average) = overview.average_lap_time {
        metrics.push(PerformanceMetric::new(
            "Average Lap",
            average,
            "s",
            MetricCategory::LapTime,
        ));
    }
    if let Some(index) = overview.consistency_index {
        metrics.push(PerformanceMetric::new(
            "Lap Consistency",
            (100.0 - index).max(0.0),
            "%",
            MetricCategory::Consistency,
        ));
    }
    if let Some(std_dev) = overview.lap_time_std {
        metrics.push(PerformanceMetric::new(
            "Lap Time Std Dev",
            std_dev,
            "s",
            MetricCategory::Consistency,
        ));
    }
    if !speeds.is_empty() {
        let top: Vec<f64> = speeds.iter().map(|s| s.max_speed).collect();
        let average: Vec<f64> = speeds.iter().map(|s| s.avg_speed).collect();
        metrics.push(PerformanceMetric::new(
            "Top Speed",
            signal::max(&top),
            speed_unit,
            MetricCategory::Speed,
        ));
        metrics.push(PerformanceMetric::new(
            "Average Speed",
            signal::mean(&average),
            speed_unit,
            MetricCategory::Speed,
        ));
    }
    if !lateral_g.is_empty() {
        metrics.push(PerformanceMetric::new(
            "Max Lateral G",
            signal::max(&lateral_g),
            "g",
            MetricCategory::Handling,
        ));
    }
    if !efficiencies.is_empty() {
        metrics.push(PerformanceMetric::new(
            "Overall Efficiency",
            signal::mean(&efficiencies),
            "%",
            MetricCategory::Efficiency,
        ));
    }
    metrics
}

/// Holds one set of thresholds for every analysis of a run
pub struct SessionAnalyzer {
    thresholds: AnalysisThresholds,
}

impl SessionAnalyzer {
    pub fn new(thresholds: AnalysisThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AnalysisThresholds {
        &self.thresholds
    }

    pub fn analyze(&self, session: &Session) -> AnalysisReport {
        comprehensive_analysis(session, &self.thresholds)
    }

    pub fn analyze_lap(&self, lap: &RawLap) -> LapAnalysis {
        analyze_lap(lap, &self.thresholds, None)
    }

    pub fn detect_track(&self, session: &Session) -> TrackLayout {
        detect_track_from_telemetry(session, &self.thresholds)
    }

    pub fn lap_performance(&self, lap: &RawLap, layout: &TrackLayout) -> LapPerformance {
        analyze_lap_performance(lap, layout, &self.thresholds)
    }
}

impl Default for SessionAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisThresholds::default())
    }
}

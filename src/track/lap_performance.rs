// Lap performance measured against a track layout

use log::debug;
use serde::Serialize;

use super::geometry;
use super::reconstructor::extract_positions;
use super::types::{Point2D, SectorType, TrackLayout};
use crate::analysis::SectorSplitter;
use crate::config::AnalysisThresholds;
use crate::telemetry::signal::{self, EPSILON};
use crate::telemetry::{
    Analysis, BrakeAnalysis, BrakeAnalyzer, Channel, ChannelAnalyzer, ChannelSet, RawLap,
    SpeedAnalysis, SpeedAnalyzer, SteeringAnalyzer,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectorPerformance {
    pub sector_id: usize,
    pub sector_type: SectorType,
    /// Seconds
    pub time: f64,
    pub avg_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub min_speed: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorneringAnalysis {
    /// Runs of layout points tighter than a straight; 0 on synthesized layouts
    pub total_corners: usize,
    /// Mean speed while the car is in a corner of the layout
    pub avg_corner_speed: Option<f64>,
    pub understeer_indicator: f64,
    pub oversteer_indicator: f64,
}

/// How the driven line compares with the layout
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RacingLine {
    /// Metres
    pub driven_length: f64,
    pub layout_length: f64,
    /// `driven_length / layout_length`
    pub length_ratio: f64,
    /// Mean distance from each driven point to the nearest layout point
    pub mean_deviation: f64,
    pub max_deviation: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LapPerformance {
    pub lap_number: u32,
    pub sector_times: Vec<SectorPerformance>,
    pub speed_analysis: Analysis<SpeedAnalysis>,
    pub braking_analysis: Analysis<BrakeAnalysis>,
    pub cornering_analysis: Analysis<CorneringAnalysis>,
    pub racing_line: Analysis<RacingLine>,
    /// Mean of the available speed, braking, cornering and line scores (0..100)
    pub efficiency_score: f64,
}

/// Measures one lap against `layout`: per-sector times and speeds, braking, cornering and,
/// when the lap recorded positions, how its line compares with the layout.
pub fn analyze_lap_performance(
    lap: &RawLap,
    layout: &TrackLayout,
    thresholds: &AnalysisThresholds,
) -> LapPerformance {
    let channels = ChannelSet::from_lap(lap);
    let speed_analysis = SpeedAnalyzer.analyze(&channels, thresholds);
    let braking_analysis = BrakeAnalyzer.analyze(&channels, thresholds);
    let cornering_analysis = cornering(&channels, layout, thresholds);
    let racing_line = if layout.is_synthesized() {
        Analysis::Unavailable
    } else {
        extract_positions(lap)
            .and_then(|positions| racing_line(&positions, layout, thresholds))
            .into()
    };

    let efficiency_score = efficiency_score(
        thresholds.efficiency.reference_avg_speed,
        &speed_analysis,
        &braking_analysis,
        &cornering_analysis,
        &racing_line,
    );
    debug!(
        "Lap {} against {}: efficiency {:.1}",
        lap.lap_number, layout.name, efficiency_score
    );

    LapPerformance {
        lap_number: lap.lap_number,
        sector_times: sector_times(&channels, lap.lap_time, layout, thresholds),
        speed_analysis,
        braking_analysis,
        cornering_analysis,
        racing_line,
        efficiency_score,
    }
}

fn sector_times(
    channels: &ChannelSet,
    lap_time: f64,
    layout: &TrackLayout,
    thresholds: &AnalysisThresholds,
) -> Vec<SectorPerformance> {
    let boundaries = layout.sector_boundaries();
    let Analysis::Available(split) = SectorSplitter::new(thresholds)
        .with_boundaries(&boundaries)
        .split(channels, lap_time)
    else {
        return Vec::new();
    };

    layout
        .sectors
        .iter()
        .zip(split.sectors)
        .map(|(sector, result)| {
            let speed = result.speed_analysis.as_option();
            SectorPerformance {
                sector_id: sector.id,
                sector_type: sector.sector_type,
                time: result.time_estimate,
                avg_speed: speed.map(|s| s.avg_speed),
                max_speed: speed.map(|s| s.max_speed),
                min_speed: speed.map(|s| s.min_speed),
            }
        })
        .collect()
}

fn cornering(
    channels: &ChannelSet,
    layout: &TrackLayout,
    thresholds: &AnalysisThresholds,
) -> Analysis<CorneringAnalysis> {
    if channels.is_empty() {
        return Analysis::Unavailable;
    }
    let straight_radius = thresholds.track.straight_radius;
    let steering = SteeringAnalyzer.analyze(channels, thresholds);
    let (understeer_indicator, oversteer_indicator) = steering
        .as_option()
        .map_or((0.0, 0.0), |s| (s.understeer_indicator, s.oversteer_indicator));

    if layout.is_synthesized() || layout.points.is_empty() {
        return Analysis::Available(CorneringAnalysis {
            total_corners: 0,
            avg_corner_speed: None,
            understeer_indicator,
            oversteer_indicator,
        });
    }

    let in_corner: Vec<bool> = layout
        .points
        .iter()
        .map(|point| point.corner_radius <= straight_radius)
        .collect();
    let total_corners = in_corner
        .iter()
        .enumerate()
        .filter(|(i, corner)| **corner && (*i == 0 || !in_corner[i - 1]))
        .count();

    let avg_corner_speed = if channels.is_present(Channel::Speed) {
        let distance = channels
            .cumulative_distance(thresholds.speed_unit, thresholds.default_sample_rate_hz);
        let driven = distance.last().copied().unwrap_or(0.0);
        let corner_speeds: Vec<f64> = channels
            .speed()
            .iter()
            .zip(&distance)
            .filter(|(_, d)| {
                let on_layout = if driven > EPSILON {
                    *d / driven * layout.total_length
                } else {
                    0.0
                };
                // last point at or before this distance
                let index = layout
                    .points
                    .partition_point(|point| point.distance <= on_layout)
                    .saturating_sub(1);
                in_corner[index]
            })
            .map(|(speed, _)| *speed)
            .collect();
        (!corner_speeds.is_empty()).then(|| signal::mean(&corner_speeds))
    } else {
        None
    };

    Analysis::Available(CorneringAnalysis {
        total_corners,
        avg_corner_speed,
        understeer_indicator,
        oversteer_indicator,
    })
}

fn racing_line(
    positions: &[Point2D],
    layout: &TrackLayout,
    thresholds: &AnalysisThresholds,
) -> Option<RacingLine> {
    let driven = geometry::dedup_points(positions, thresholds.track.min_point_distance);
    if driven.len() < 2 || layout.points.is_empty() || layout.total_length <= EPSILON {
        return None;
    }
    let layout_points = layout.positions();
    let deviations: Vec<f64> = driven
        .iter()
        .map(|point| {
            layout_points
                .iter()
                .map(|reference| point.distance_to(reference))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();
    let driven_length = geometry::cumulative_distances(&driven)
        .last()
        .copied()
        .unwrap_or(0.0);

    Some(RacingLine {
        driven_length,
        layout_length: layout.total_length,
        length_ratio: driven_length / layout.total_length,
        mean_deviation: signal::mean(&deviations),
        max_deviation: signal::max(&deviations),
    })
}

fn efficiency_score(
    reference_avg_speed: f64,
    speed: &Analysis<SpeedAnalysis>,
    braking: &Analysis<BrakeAnalysis>,
    cornering: &Analysis<CorneringAnalysis>,
    line: &Analysis<RacingLine>,
) -> f64 {
    let scores: Vec<f64> = [
        speed
            .as_option()
            .map(|s| (s.avg_speed / reference_avg_speed).min(1.0) * 100.0),
        braking.as_option().map(|b| b.brake_smoothness),
        cornering
            .as_option()
            .map(|c| (100.0 - c.understeer_indicator).clamp(0.0, 100.0)),
        line.as_option()
            .map(|l| (100.0 - (l.length_ratio - 1.0).abs() * 100.0).clamp(0.0, 100.0)),
    ]
    .into_iter()
    .flatten()
    .collect();
    signal::mean(&scores)
}

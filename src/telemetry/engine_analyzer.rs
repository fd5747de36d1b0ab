use itertools::Itertools;
use serde::Serialize;

use super::signal;
use super::{Analysis, Channel, ChannelAnalyzer, ChannelSet};
use crate::config::AnalysisThresholds;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShiftPoint {
    /// Sample at which the new gear shows up
    pub sample_index: usize,
    pub from_gear: i32,
    pub to_gear: i32,
    /// Engine speed on the sample before the change
    pub rpm: f64,
    pub direction: ShiftDirection,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineAnalysis {
    pub max_rpm: f64,
    pub avg_rpm: f64,
    pub rpm_variance: f64,
    pub shift_points: Vec<ShiftPoint>,
    pub upshifts: usize,
    pub downshifts: usize,
    pub avg_upshift_rpm: Option<f64>,
    pub avg_downshift_rpm: Option<f64>,
    pub rev_limit_hits: usize,
    /// How well engine speed tracks pedal demand, 0 without a throttle channel
    pub engine_efficiency: f64,
}

#[derive(Default)]
pub struct EngineAnalyzer;

impl ChannelAnalyzer for EngineAnalyzer {
    type Output = EngineAnalysis;

    fn analyze(
        &self,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
    ) -> Analysis<EngineAnalysis> {
        let running = signal::positive(channels.rpm());
        if running.is_empty() {
            return Analysis::Unavailable;
        }

        let rpm = channels.rpm();
        let shift_points = if channels.is_present(Channel::Gear) {
            detect_shifts(channels.gear(), rpm)
        } else {
            Vec::new()
        };
        let shift_rpm = |direction: ShiftDirection| -> Vec<f64> {
            shift_points
                .iter()
                .filter(|shift| shift.direction == direction)
                .map(|shift| shift.rpm)
                .collect()
        };
        let up = shift_rpm(ShiftDirection::Up);
        let down = shift_rpm(ShiftDirection::Down);
        let engine_efficiency = if channels.is_present(Channel::Throttle) {
            engine_efficiency(rpm, channels.throttle(), thresholds.engine.efficiency_rpm_scale)
        } else {
            0.0
        };

        Analysis::Available(EngineAnalysis {
            max_rpm: signal::max(&running),
            avg_rpm: signal::mean(&running),
            rpm_variance: signal::variance(&running),
            upshifts: up.len(),
            downshifts: down.len(),
            avg_upshift_rpm: (!up.is_empty()).then(|| signal::mean(&up)),
            avg_downshift_rpm: (!down.is_empty()).then(|| signal::mean(&down)),
            shift_points,
            rev_limit_hits: signal::count_events(rpm, thresholds.engine.rev_limit_rpm, 1),
            engine_efficiency,
        })
    }
}

/// Every change of the gear channel, with the RPM held just before it
pub fn detect_shifts(gear: &[f64], rpm: &[f64]) -> Vec<ShiftPoint> {
    gear.iter()
        .map(|value| value.round() as i32)
        .tuple_windows()
        .enumerate()
        .filter(|(_, (from, to))| from != to)
        .filter_map(|(i, (from_gear, to_gear))| {
            Some(ShiftPoint {
                sample_index: i + 1,
                from_gear,
                to_gear,
                rpm: *rpm.get(i)?,
                direction: if to_gear > from_gear {
                    ShiftDirection::Up
                } else {
                    ShiftDirection::Down
                },
            })
        })
        .collect()
}

/// `mean(1 - |rpm / rpm_scale - throttle / 100|) * 100` over the samples with the engine running
fn engine_efficiency(rpm: &[f64], throttle: &[f64], rpm_scale: f64) -> f64 {
    let scores: Vec<f64> = rpm
        .iter()
        .zip(throttle)
        .filter(|(rpm, _)| **rpm > 0.0)
        .map(|(rpm, throttle)| 1.0 - (rpm / rpm_scale - throttle / 100.0).abs())
        .collect();
    (signal::mean(&scores) * 100.0).clamp(0.0, 100.0)
}

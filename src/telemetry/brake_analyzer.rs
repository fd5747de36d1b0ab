use std::ops::Range;

use serde::Serialize;

use super::signal::{self, EPSILON};
use super::{Analysis, Channel, ChannelAnalyzer, ChannelSet};
use crate::config::{AnalysisThresholds, BrakeThresholds};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BrakeAnalysis {
    pub max_brake_pressure: f64,
    /// Average over the samples where the pedal is pressed
    pub avg_brake_pressure: f64,
    pub braking_events: usize,
    pub brake_smoothness: f64,
    pub trail_braking_percentage: f64,
    /// Variance based proxy, no per-wheel pressure is available
    pub brake_balance: f64,
    /// Mean speed shed per unit of brake input over the braking zones
    pub braking_efficiency: f64,
}

#[derive(Default)]
pub struct BrakeAnalyzer;

impl ChannelAnalyzer for BrakeAnalyzer {
    type Output = BrakeAnalysis;

    fn analyze(
        &self,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
    ) -> Analysis<BrakeAnalysis> {
        if !channels.is_present(Channel::Brake) {
            return Analysis::Unavailable;
        }

        let config = &thresholds.brake;
        let brake = channels.brake();
        let pressed = signal::positive(brake);

        Analysis::Available(BrakeAnalysis {
            max_brake_pressure: signal::max(brake),
            avg_brake_pressure: signal::mean(&pressed),
            braking_events: braking_zones(brake, config).len(),
            brake_smoothness: signal::smoothness(brake),
            trail_braking_percentage: trail_braking_percentage(
                brake,
                channels.steering(),
                config,
            ),
            brake_balance: (100.0 - signal::variance(&pressed)).clamp(0.0, 100.0),
            braking_efficiency: braking_efficiency(brake, channels.speed(), config),
        })
    }
}

/// Contiguous braking phases. A zone opens when pressure rises above the brake threshold
/// and closes at the first sample below the release threshold.
pub fn braking_zones(brake: &[f64], config: &BrakeThresholds) -> Vec<Range<usize>> {
    let mut zones = Vec::new();
    let mut start: Option<usize> = None;

    for (i, pressure) in brake.iter().enumerate() {
        match start {
            None if *pressure > config.threshold => start = Some(i),
            Some(zone_start) if *pressure < config.release_threshold => {
                zones.push(zone_start..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(zone_start) = start {
        zones.push(zone_start..brake.len());
    }
    zones
}

/// Average of `speed lost / brake input` over the zones where the car slowed down.
///
/// The speed lost in a zone is the speed just before the pedal went down minus the lowest
/// speed reached while braking. Returns 0 when no zone slowed the car.
pub fn braking_efficiency(brake: &[f64], speed: &[f64], config: &BrakeThresholds) -> f64 {
    let ratios: Vec<f64> = braking_zones(brake, config)
        .into_iter()
        .filter(|zone| zone.end <= speed.len())
        .filter_map(|zone| {
            let input: f64 = brake[zone.clone()].iter().sum();
            if input < EPSILON {
                return None;
            }
            let entry_speed = speed[zone.start.saturating_sub(1)];
            let lowest_speed = signal::min(&speed[zone]);
            let speed_loss = entry_speed - lowest_speed;
            (speed_loss > 0.0).then(|| speed_loss / input)
        })
        .collect();

    signal::mean(&ratios)
}

/// Percentage of braking samples with the wheel turned at the same time
pub fn trail_braking_percentage(brake: &[f64], steering: &[f64], config: &BrakeThresholds) -> f64 {
    let braking: Vec<f64> = brake
        .iter()
        .zip(steering)
        .filter(|(pressure, _)| **pressure > config.threshold)
        .map(|(_, angle)| *angle)
        .collect();
    signal::percentage_where(&braking, |angle| angle.abs() > config.trail_steering_threshold)
}

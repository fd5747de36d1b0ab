use itertools::Itertools;
use serde::Serialize;

use super::signal;
use super::{Analysis, Channel, ChannelAnalyzer, ChannelSet};
use crate::config::{AnalysisThresholds, SteeringThresholds};

/// Below this many samples the steering spread says nothing about lock-to-lock time
const MIN_SAMPLES_FOR_LOCK_TO_LOCK: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SteeringAnalysis {
    pub max_steering_angle: f64,
    pub avg_steering_angle: f64,
    pub steering_smoothness: f64,
    pub steering_corrections: usize,
    /// Seconds, 0 when the wheel never travelled far enough to estimate it
    pub lock_to_lock_time: f64,
    /// Percentage of high steering samples that produced little lateral grip
    pub understeer_indicator: f64,
    /// Steering corrections per minute
    pub oversteer_indicator: f64,
}

#[derive(Default)]
pub struct SteeringAnalyzer;

impl ChannelAnalyzer for SteeringAnalyzer {
    type Output = SteeringAnalysis;

    fn analyze(
        &self,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
    ) -> Analysis<SteeringAnalysis> {
        if !channels.is_present(Channel::Steering) {
            return Analysis::Unavailable;
        }

        let config = &thresholds.steering;
        let steering = channels.steering();
        let magnitude: Vec<f64> = steering.iter().map(|angle| angle.abs()).collect();
        let corrections = count_corrections(steering, config.correction_threshold);
        let minutes = channels.duration_seconds(thresholds.default_sample_rate_hz) / 60.0;

        let understeer = if channels.is_present(Channel::GLat) {
            understeer_indicator(steering, channels.g_lat())
        } else {
            0.0
        };
        let oversteer = if minutes > signal::EPSILON {
            corrections as f64 / minutes
        } else {
            0.0
        };

        Analysis::Available(SteeringAnalysis {
            max_steering_angle: signal::max(&magnitude),
            avg_steering_angle: signal::mean(&magnitude),
            steering_smoothness: signal::smoothness(steering),
            steering_corrections: corrections,
            lock_to_lock_time: lock_to_lock_time(steering, config),
            understeer_indicator: understeer,
            oversteer_indicator: oversteer,
        })
    }
}

/// Direction reversals of the wheel that happen faster than `threshold` per sample
pub fn count_corrections(steering: &[f64], threshold: f64) -> usize {
    signal::diff(steering)
        .into_iter()
        .tuple_windows()
        .filter(|(before, after)| before * after < 0.0 && after.abs() > threshold)
        .count()
}

fn lock_to_lock_time(steering: &[f64], config: &SteeringThresholds) -> f64 {
    if steering.len() < MIN_SAMPLES_FOR_LOCK_TO_LOCK {
        return 0.0;
    }
    let spread = signal::max(steering) - signal::min(steering);
    if spread < config.lock_to_lock_min_spread {
        return 0.0;
    }
    spread / 180.0 * 2.0
}

/// Share of top-quartile steering samples whose lateral g stays below the lap median
pub fn understeer_indicator(steering: &[f64], g_lat: &[f64]) -> f64 {
    let steer_magnitude: Vec<f64> = steering.iter().map(|angle| angle.abs()).collect();
    let g_magnitude: Vec<f64> = g_lat.iter().map(|g| g.abs()).collect();
    let high_steer = signal::percentile(&steer_magnitude, 75.0);
    let median_g = signal::percentile(&g_magnitude, 50.0);

    let high_steering: Vec<f64> = steer_magnitude
        .iter()
        .zip(&g_magnitude)
        .filter(|(steer, _)| **steer > high_steer)
        .map(|(_, g)| *g)
        .collect();
    signal::percentage_where(&high_steering, |g| g < median_g)
}

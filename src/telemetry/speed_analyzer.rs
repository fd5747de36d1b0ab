use serde::Serialize;

use super::signal;
use super::{Analysis, ChannelAnalyzer, ChannelSet};
use crate::config::AnalysisThresholds;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpeedAnalysis {
    pub max_speed: f64,
    pub min_speed: f64,
    pub avg_speed: f64,
    pub speed_variance: f64,
    pub speed_range: f64,
    pub acceleration_events: usize,
    pub deceleration_events: usize,
    /// Percentage of moving samples spent within reach of the top speed
    pub top_speed_duration: f64,
    pub speed_consistency: f64,
}

/// Statistics over the samples where the car is moving
#[derive(Default)]
pub struct SpeedAnalyzer;

impl ChannelAnalyzer for SpeedAnalyzer {
    type Output = SpeedAnalysis;

    fn analyze(
        &self,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
    ) -> Analysis<SpeedAnalysis> {
        let moving = signal::positive(channels.speed());
        if moving.is_empty() {
            return Analysis::Unavailable;
        }

        let config = &thresholds.speed;
        let max_speed = signal::max(&moving);
        let min_speed = signal::min(&moving);
        let delta = signal::diff(&moving);

        Analysis::Available(SpeedAnalysis {
            max_speed,
            min_speed,
            avg_speed: signal::mean(&moving),
            speed_variance: signal::variance(&moving),
            speed_range: max_speed - min_speed,
            acceleration_events: signal::peaks(&delta, config.event_height, config.event_distance)
                .len(),
            deceleration_events: signal::valleys(
                &delta,
                config.event_height,
                config.event_distance,
            )
            .len(),
            top_speed_duration: signal::top_duration(&moving, config.top_speed_fraction) * 100.0,
            speed_consistency: signal::consistency(&moving, config.consistency_k),
        })
    }
}

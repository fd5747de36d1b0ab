//! Approximate tire model.
//!
//! Grip utilization and degradation are derived from lateral acceleration against an
//! assumed grip limit. They are heuristics, not tire physics.

use serde::Serialize;

use super::signal::{self, EPSILON};
use super::{Analysis, Channel, ChannelAnalyzer, ChannelSet};
use crate::config::AnalysisThresholds;

const MIN_SAMPLES_FOR_DEGRADATION: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorneringPerformance {
    pub cornering_samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_cornering_speed: Option<f64>,
    pub max_cornering_g: f64,
    pub avg_cornering_g: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TireAnalysis {
    /// Peak lateral g as a percentage of the assumed grip limit
    pub grip_utilization: f64,
    pub tire_slip_events: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cornering_performance: Option<CorneringPerformance>,
    /// Growth of lateral g spread from the first to the second half of the lap, in percent
    pub tire_degradation_indicator: f64,
}

#[derive(Default)]
pub struct TireAnalyzer;

impl ChannelAnalyzer for TireAnalyzer {
    type Output = TireAnalysis;

    fn analyze(
        &self,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
    ) -> Analysis<TireAnalysis> {
        if !channels.is_present(Channel::GLat) {
            return Analysis::Unavailable;
        }

        let config = &thresholds.tire;
        let g_lat = channels.g_lat();
        let peak_g = g_lat.iter().fold(0.0_f64, |peak, g| peak.max(g.abs()));
        let g_change: Vec<f64> = signal::diff(g_lat).iter().map(|d| d.abs()).collect();
        let speed = channels
            .is_present(Channel::Speed)
            .then(|| channels.speed());

        Analysis::Available(TireAnalysis {
            grip_utilization: (peak_g / config.theoretical_max_g * 100.0).min(100.0),
            tire_slip_events: signal::count_events(&g_change, config.slip_delta_g, 1),
            cornering_performance: cornering_performance(g_lat, speed, thresholds),
            tire_degradation_indicator: degradation_indicator(g_lat),
        })
    }
}

fn cornering_performance(
    g_lat: &[f64],
    speed: Option<&[f64]>,
    thresholds: &AnalysisThresholds,
) -> Option<CorneringPerformance> {
    let config = &thresholds.tire;
    let cornering: Vec<usize> = (0..g_lat.len())
        .filter(|i| g_lat[*i].abs() > config.cornering_g)
        .filter(|i| speed.is_none_or(|speed| speed[*i] > config.cornering_min_speed))
        .collect();
    if cornering.is_empty() {
        return None;
    }

    let g: Vec<f64> = cornering.iter().map(|i| g_lat[*i].abs()).collect();
    Some(CorneringPerformance {
        cornering_samples: cornering.len(),
        avg_cornering_speed: speed
            .map(|speed| signal::mean(&cornering.iter().map(|i| speed[*i]).collect::<Vec<_>>())),
        max_cornering_g: signal::max(&g),
        avg_cornering_g: signal::mean(&g),
    })
}

fn degradation_indicator(g_lat: &[f64]) -> f64 {
    if g_lat.len() <= MIN_SAMPLES_FOR_DEGRADATION {
        return 0.0;
    }
    let (first_half, second_half) = g_lat.split_at(g_lat.len() / 2);
    let first_std = signal::std_dev(first_half);
    if first_std < EPSILON {
        return 0.0;
    }
    ((signal::std_dev(second_half) - first_std) / first_std * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn analyze(channels: &ChannelSet) -> TireAnalysis {
        match TireAnalyzer.analyze(channels, &AnalysisThresholds::default()) {
            Analysis::Available(tire) => tire,
            Analysis::Unavailable => panic!("tire analysis should be available"),
        }
    }

    #[test]
    fn test_grip_utilization_is_capped() {
        let channels = ChannelSet::from_channels([(Channel::GLat, vec![0.0, 0.75, -0.3])]);
        assert_relative_eq!(analyze(&channels).grip_utilization, 50.0);

        let channels = ChannelSet::from_channels([(Channel::GLat, vec![0.0, 2.5, 0.0])]);
        assert_relative_eq!(analyze(&channels).grip_utilization, 100.0);
    }

    #[test]
    fn test_slip_events_count_sudden_changes() {
        let g_lat = vec![0.0, 0.1, 0.9, 0.9, 0.95, 0.2, 0.2];
        let channels = ChannelSet::from_channels([(Channel::GLat, g_lat)]);
        assert_eq!(analyze(&channels).tire_slip_events, 2);
    }

    #[test]
    fn test_cornering_uses_speed_when_present() {
        let channels = ChannelSet::from_channels([
            (Channel::GLat, vec![0.1, 1.0, 1.2, 0.8, 0.2]),
            (Channel::Speed, vec![200.0, 120.0, 20.0, 100.0, 180.0]),
        ]);
        let cornering = analyze(&channels).cornering_performance.unwrap();
        // the 20 km/h sample is below the cornering speed floor
        assert_eq!(cornering.cornering_samples, 2);
        assert_relative_eq!(cornering.avg_cornering_speed.unwrap(), 110.0);
        assert_relative_eq!(cornering.max_cornering_g, 1.0);
    }

    #[test]
    fn test_degradation_when_second_half_is_noisier() {
        let mut g_lat: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 1.0 } else { 1.1 }).collect();
        g_lat.extend((0..10).map(|i| if i % 2 == 0 { 0.8 } else { 1.2 }));
        assert_relative_eq!(degradation_indicator(&g_lat), 100.0);
        assert_relative_eq!(degradation_indicator(&[1.0; 5]), 0.0);
    }
}

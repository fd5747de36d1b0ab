use serde::Serialize;

use super::signal;
use super::{Analysis, Channel, ChannelAnalyzer, ChannelSet};
use crate::config::{AnalysisThresholds, ThrottleThresholds};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThrottleAnalysis {
    pub full_throttle_percentage: f64,
    pub partial_throttle_percentage: f64,
    pub off_throttle_percentage: f64,
    pub avg_throttle: f64,
    pub max_throttle: f64,
    pub throttle_smoothness: f64,
    /// Mean opening speed of the pedal, in throttle units per second
    pub application_rate: f64,
    pub lift_and_coast_events: usize,
}

#[derive(Default)]
pub struct ThrottleAnalyzer;

impl ChannelAnalyzer for ThrottleAnalyzer {
    type Output = ThrottleAnalysis;

    fn analyze(
        &self,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
    ) -> Analysis<ThrottleAnalysis> {
        let throttle = channels.throttle();
        if !channels.is_present(Channel::Throttle) {
            return Analysis::Unavailable;
        }

        let config = &thresholds.throttle;
        let speed = channels
            .is_present(Channel::Speed)
            .then(|| channels.speed());
        let sample_rate = channels.sample_rate_hz(thresholds.default_sample_rate_hz);
        let openings = signal::positive(&signal::diff(throttle));

        Analysis::Available(ThrottleAnalysis {
            full_throttle_percentage: signal::percentage_where(throttle, |t| t >= config.full),
            partial_throttle_percentage: signal::percentage_where(throttle, |t| {
                t > config.off && t < config.full
            }),
            off_throttle_percentage: signal::percentage_where(throttle, |t| t <= config.off),
            avg_throttle: signal::mean(throttle),
            max_throttle: signal::max(throttle),
            throttle_smoothness: signal::smoothness(throttle),
            application_rate: signal::mean(&openings) * sample_rate,
            lift_and_coast_events: lift_and_coast_events(throttle, speed, config),
        })
    }
}

/// Counts lift-and-coast phases. A phase opens when the pedal drops below the lift
/// threshold and closes when the pedal comes back or the car starts shedding speed.
pub fn lift_and_coast_events(
    throttle: &[f64],
    speed: Option<&[f64]>,
    config: &ThrottleThresholds,
) -> usize {
    let mut events = 0;
    let mut coasting = false;

    for i in 1..throttle.len() {
        if !coasting {
            coasting =
                throttle[i] < config.lift_threshold && throttle[i - 1] >= config.lift_threshold;
            continue;
        }

        let recovered = throttle[i] >= config.lift_threshold;
        let slowing = speed
            .and_then(|speed| speed.get(i).zip(speed.get(i - 1)))
            .is_some_and(|(now, before)| before - now > config.lift_speed_drop);
        if recovered || slowing {
            events += 1;
            coasting = false;
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn analyze(throttle: Vec<f64>) -> ThrottleAnalysis {
        let channels = ChannelSet::from_channels([(Channel::Throttle, throttle)]);
        match ThrottleAnalyzer.analyze(&channels, &AnalysisThresholds::default()) {
            Analysis::Available(analysis) => analysis,
            Analysis::Unavailable => panic!("throttle analysis should be available"),
        }
    }

    #[test]
    fn test_constant_full_throttle() {
        let analysis = analyze(vec![100.0; 50]);
        assert_relative_eq!(analysis.full_throttle_percentage, 100.0);
        assert_relative_eq!(analysis.partial_throttle_percentage, 0.0);
        assert_relative_eq!(analysis.off_throttle_percentage, 0.0);
        assert_relative_eq!(analysis.throttle_smoothness, 100.0);
        assert_relative_eq!(analysis.application_rate, 0.0);
        assert_eq!(analysis.lift_and_coast_events, 0);
    }

    #[test]
    fn test_throttle_bands() {
        let analysis = analyze(vec![0.0, 10.0, 50.0, 94.0, 95.0, 100.0, 5.0, 60.0]);
        assert_relative_eq!(analysis.full_throttle_percentage, 25.0);
        assert_relative_eq!(analysis.partial_throttle_percentage, 37.5);
        assert_relative_eq!(analysis.off_throttle_percentage, 37.5);
    }

    #[test]
    fn test_all_zero_throttle_is_unavailable() {
        let channels = ChannelSet::from_channels([(Channel::Throttle, vec![0.0; 10])]);
        let analysis = ThrottleAnalyzer.analyze(&channels, &AnalysisThresholds::default());
        assert!(!analysis.is_available());
    }

    #[test]
    fn test_lift_and_coast_closes_on_recovery() {
        let config = ThrottleThresholds::default();
        let throttle = [100.0, 100.0, 0.0, 0.0, 0.0, 100.0, 100.0, 0.0, 50.0];
        assert_eq!(lift_and_coast_events(&throttle, None, &config), 2);
    }

    #[test]
    fn test_lift_and_coast_closes_on_speed_drop() {
        let config = ThrottleThresholds::default();
        let throttle = [100.0, 0.0, 0.0, 0.0, 0.0];
        let speed = [200.0, 199.0, 198.0, 180.0, 150.0];
        assert_eq!(lift_and_coast_events(&throttle, Some(&speed), &config), 1);
        // without a speed channel the phase never closes
        assert_eq!(lift_and_coast_events(&throttle, None, &config), 0);
    }
}

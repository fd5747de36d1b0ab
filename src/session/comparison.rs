//! Comparative, predictive and consistency views over the analyzed laps of a session.

use serde::Serialize;

use super::lap_time_fit;
use crate::analysis::LapAnalysis;
use crate::telemetry::Analysis;
use crate::telemetry::signal;

/// Speed or sector differences smaller than this are not worth reporting
const NEGLIGIBLE_DELTA: f64 = 0.05;

/// The best lap set against the lap driven just before it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LapComparison {
    pub reference_lap: u32,
    pub compared_lap: u32,
    /// Seconds the compared lap lost to the reference lap
    pub time_delta: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_speed_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed_delta: Option<f64>,
    /// Per sector, compared minus reference, empty when the splits do not line up
    pub sector_deltas: Vec<f64>,
    pub improvements: Vec<String>,
    pub regressions: Vec<String>,
}

impl LapComparison {
    /// Compares the fastest timed lap with its predecessor, or its successor when the
    /// fastest lap came first
    pub fn best_against_previous(laps: &[LapAnalysis]) -> Analysis<Self> {
        let timed: Vec<&LapAnalysis> = laps.iter().filter(|lap| lap.is_timed()).collect();
        if timed.len() < 2 {
            return Analysis::Unavailable;
        }
        let Some(best_index) = timed
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.lap_time.total_cmp(&b.1.lap_time))
            .map(|(i, _)| i)
        else {
            return Analysis::Unavailable;
        };
        let compared_index = if best_index > 0 { best_index - 1 } else { 1 };
        Analysis::Available(Self::compare(timed[best_index], timed[compared_index]))
    }

    pub fn compare(reference: &LapAnalysis, compared: &LapAnalysis) -> Self {
        let mut improvements = Vec::new();
        let mut regressions = Vec::new();

        let time_delta = compared.lap_time - reference.lap_time;
        let speeds = reference
            .speed_analysis
            .as_option()
            .zip(compared.speed_analysis.as_option());
        let avg_speed_delta = speeds.map(|(r, c)| r.avg_speed - c.avg_speed);
        let max_speed_delta = speeds.map(|(r, c)| r.max_speed - c.max_speed);

        if let Some(delta) = avg_speed_delta {
            if delta > NEGLIGIBLE_DELTA {
                improvements.push(format!("Average speed {delta:.1} higher"));
            } else if delta < -NEGLIGIBLE_DELTA {
                regressions.push(format!("Average speed {:.1} lower", -delta));
            }
        }
        if let Some(delta) = max_speed_delta {
            if delta > NEGLIGIBLE_DELTA {
                improvements.push(format!("Top speed {delta:.1} higher"));
            } else if delta < -NEGLIGIBLE_DELTA {
                regressions.push(format!("Top speed {:.1} lower", -delta));
            }
        }

        let sector_deltas = match (
            reference.sector_analysis.as_option(),
            compared.sector_analysis.as_option(),
        ) {
            (Some(r), Some(c)) if r.sectors.len() == c.sectors.len() => r
                .sector_times()
                .iter()
                .zip(c.sector_times())
                .map(|(r, c)| c - r)
                .collect(),
            _ => Vec::new(),
        };
        for (i, delta) in sector_deltas.iter().enumerate() {
            if *delta > NEGLIGIBLE_DELTA {
                improvements.push(format!("Sector {} faster by {:.2}s", i + 1, delta));
            } else if *delta < -NEGLIGIBLE_DELTA {
                regressions.push(format!("Sector {} slower by {:.2}s", i + 1, -delta));
            }
        }

        Self {
            reference_lap: reference.lap_number,
            compared_lap: compared.lap_number,
            time_delta,
            avg_speed_delta,
            max_speed_delta,
            sector_deltas,
            improvements,
            regressions,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PredictiveAnalysis {
    /// Next lap time extrapolated from the lap time trend
    pub predicted_next_lap_time: Option<f64>,
    /// Absolute correlation of the trend the prediction is based on
    pub prediction_confidence: Option<f64>,
    /// Sum of the best time seen in each sector
    pub theoretical_best_lap_time: Option<f64>,
    /// Gap between the best lap and the theoretical best
    pub potential_improvement: Option<f64>,
}

impl PredictiveAnalysis {
    pub fn from_laps(laps: &[LapAnalysis]) -> Self {
        let timed: Vec<&LapAnalysis> = laps.iter().filter(|lap| lap.is_timed()).collect();
        let lap_times: Vec<f64> = timed.iter().map(|lap| lap.lap_time).collect();

        let fit = (lap_times.len() >= 3)
            .then(|| lap_time_fit(&lap_times))
            .flatten();
        let theoretical_best = theoretical_best_lap(&timed);
        let best_lap = lap_times.iter().copied().min_by(f64::total_cmp);

        Self {
            predicted_next_lap_time: fit
                .map(|fit| fit.predict(lap_times.len() as f64))
                .filter(|t| *t > 0.0),
            prediction_confidence: fit.map(|fit| fit.r.abs()),
            theoretical_best_lap_time: theoretical_best,
            potential_improvement: best_lap
                .zip(theoretical_best)
                .map(|(best, theoretical)| (best - theoretical).max(0.0)),
        }
    }
}

/// Best time per sector across laps whose splits have the same number of sectors as the
/// first split lap
fn theoretical_best_lap(laps: &[&LapAnalysis]) -> Option<f64> {
    let splits: Vec<Vec<f64>> = laps
        .iter()
        .filter_map(|lap| lap.sector_analysis.as_option())
        .map(|split| split.sector_times())
        .collect();
    let sector_count = splits.first()?.len();

    let best: Vec<f64> = (0..sector_count)
        .map(|sector| {
            splits
                .iter()
                .filter(|times| times.len() == sector_count)
                .map(|times| times[sector])
                .filter(|time| *time > 0.0)
                .fold(f64::INFINITY, f64::min)
        })
        .collect();
    best.iter()
        .all(|time| time.is_finite())
        .then(|| best.iter().sum())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConsistencyAnalysis {
    /// `100 - CV * 100`, floored at 0
    pub overall_consistency: f64,
    pub lap_time_std: f64,
    pub lap_time_range: f64,
    pub coefficient_of_variation: f64,
    /// Absolute correlation of lap time with lap index
    pub trend_strength: f64,
    /// Seconds gained per lap, 0 when lap times rise
    pub improvement_rate: f64,
    /// Seconds lost per lap, 0 when lap times fall
    pub degradation_rate: f64,
    pub avg_speed_consistency: Option<f64>,
    pub avg_throttle_smoothness: Option<f64>,
    pub avg_brake_smoothness: Option<f64>,
    pub avg_steering_smoothness: Option<f64>,
}

impl ConsistencyAnalysis {
    pub fn from_laps(laps: &[LapAnalysis]) -> Analysis<Self> {
        let timed: Vec<&LapAnalysis> = laps.iter().filter(|lap| lap.is_timed()).collect();
        if timed.len() < 2 {
            return Analysis::Unavailable;
        }
        let lap_times: Vec<f64> = timed.iter().map(|lap| lap.lap_time).collect();
        let cv = signal::coefficient_of_variation(&lap_times);
        let slope = lap_time_fit(&lap_times).map_or(0.0, |fit| fit.slope);

        Analysis::Available(Self {
            overall_consistency: (100.0 - cv * 100.0).max(0.0),
            lap_time_std: signal::std_dev(&lap_times),
            lap_time_range: signal::max(&lap_times) - signal::min(&lap_times),
            coefficient_of_variation: cv,
            trend_strength: lap_time_fit(&lap_times).map_or(0.0, |fit| fit.r.abs()),
            improvement_rate: (-slope).max(0.0),
            degradation_rate: slope.max(0.0),
            avg_speed_consistency: average_of(laps, |lap| {
                lap.speed_analysis.as_option().map(|s| s.speed_consistency)
            }),
            avg_throttle_smoothness: average_of(laps, |lap| {
                lap.throttle_analysis
                    .as_option()
                    .map(|t| t.throttle_smoothness)
            }),
            avg_brake_smoothness: average_of(laps, |lap| {
                lap.brake_analysis.as_option().map(|b| b.brake_smoothness)
            }),
            avg_steering_smoothness: average_of(laps, |lap| {
                lap.steering_analysis
                    .as_option()
                    .map(|s| s.steering_smoothness)
            }),
        })
    }
}

fn average_of(laps: &[LapAnalysis], metric: impl Fn(&LapAnalysis) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = laps.iter().filter_map(metric).collect();
    (!values.is_empty()).then(|| signal::mean(&values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::LapAnalysis;
    use crate::config::AnalysisThresholds;
    use crate::telemetry::{Channel, ChannelSet};
    use approx::assert_relative_eq;

    fn lap(number: u32, lap_time: f64, speed: f64, time_scale: f64) -> LapAnalysis {
        let time: Vec<f64> = (0..30).map(|i| i as f64 * time_scale).collect();
        let channels = ChannelSet::from_channels([
            (Channel::Speed, vec![speed; 30]),
            (Channel::Time, time),
        ]);
        LapAnalysis::from_channels(
            number,
            lap_time,
            &channels,
            &AnalysisThresholds::default(),
            None,
        )
    }

    #[test]
    fn test_best_lap_compared_with_previous() {
        let laps = vec![
            lap(1, 92.0, 150.0, 1.0),
            lap(2, 90.0, 155.0, 0.9),
            lap(3, 91.0, 152.0, 1.0),
        ];
        let Analysis::Available(comparison) = LapComparison::best_against_previous(&laps) else {
            panic!("comparison should be available");
        };
        assert_eq!(comparison.reference_lap, 2);
        assert_eq!(comparison.compared_lap, 1);
        assert_relative_eq!(comparison.time_delta, 2.0);
        assert_relative_eq!(comparison.avg_speed_delta.unwrap(), 5.0);
        assert_eq!(comparison.sector_deltas.len(), 3);
        assert!(comparison.sector_deltas.iter().all(|d| *d > 0.0));
        assert!(comparison.regressions.is_empty());
        assert!(!comparison.improvements.is_empty());
    }

    #[test]
    fn test_best_first_lap_compared_with_next() {
        let laps = vec![lap(1, 89.0, 150.0, 1.0), lap(2, 90.0, 150.0, 1.0)];
        let Analysis::Available(comparison) = LapComparison::best_against_previous(&laps) else {
            panic!("comparison should be available");
        };
        assert_eq!(comparison.compared_lap, 2);
    }

    #[test]
    fn test_single_lap_cannot_be_compared() {
        let laps = vec![lap(1, 89.0, 150.0, 1.0), LapAnalysis::empty(2, 0.0)];
        assert!(!LapComparison::best_against_previous(&laps).is_available());
    }

    #[test]
    fn test_prediction_and_theoretical_best() {
        let laps = vec![
            lap(1, 93.0, 150.0, 1.0),
            lap(2, 92.0, 150.0, 1.0),
            lap(3, 91.0, 150.0, 1.0),
        ];
        let prediction = PredictiveAnalysis::from_laps(&laps);
        assert_relative_eq!(prediction.predicted_next_lap_time.unwrap(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(prediction.prediction_confidence.unwrap(), 1.0, epsilon = 1e-9);
        // every lap has sectors of 10 s, 10 s and 9 s
        assert_relative_eq!(prediction.theoretical_best_lap_time.unwrap(), 29.0, epsilon = 1e-9);
        assert_relative_eq!(prediction.potential_improvement.unwrap(), 62.0, epsilon = 1e-9);
    }

    #[test]
    fn test_consistency_rates() {
        let laps = vec![
            lap(1, 90.0, 150.0, 1.0),
            lap(2, 91.0, 150.0, 1.0),
            lap(3, 92.0, 150.0, 1.0),
        ];
        let Analysis::Available(consistency) = ConsistencyAnalysis::from_laps(&laps) else {
            panic!("consistency should be available");
        };
        assert_relative_eq!(consistency.degradation_rate, 1.0, epsilon = 1e-9);
        assert_relative_eq!(consistency.improvement_rate, 0.0);
        assert_relative_eq!(consistency.lap_time_range, 2.0);
        assert_relative_eq!(consistency.trend_strength, 1.0, epsilon = 1e-9);
        assert_relative_eq!(consistency.avg_speed_consistency.unwrap(), 100.0);
        assert!(consistency.avg_brake_smoothness.is_none());
    }
}

use serde::Serialize;

use super::signal;
use super::{Analysis, Channel, ChannelAnalyzer, ChannelSet};
use crate::config::AnalysisThresholds;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LateralG {
    pub max_lateral_g: f64,
    pub avg_lateral_g: f64,
    pub lateral_consistency: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LongitudinalG {
    pub max_acceleration_g: f64,
    pub max_braking_g: f64,
    pub avg_longitudinal_g: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GForceAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lateral: Option<LateralG>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitudinal: Option<LongitudinalG>,
}

/// Needs at least one of the two accelerometer channels
#[derive(Default)]
pub struct GForceAnalyzer;

impl ChannelAnalyzer for GForceAnalyzer {
    type Output = GForceAnalysis;

    fn analyze(
        &self,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
    ) -> Analysis<GForceAnalysis> {
        let lateral = channels.is_present(Channel::GLat).then(|| {
            let g_lat = channels.g_lat();
            let magnitude: Vec<f64> = g_lat.iter().map(|g| g.abs()).collect();
            LateralG {
                max_lateral_g: signal::max(&magnitude),
                avg_lateral_g: signal::mean(&magnitude),
                lateral_consistency: signal::consistency(
                    g_lat,
                    thresholds.tire.lateral_consistency_k,
                ),
            }
        });

        let longitudinal = channels.is_present(Channel::GLong).then(|| {
            let g_long = channels.g_long();
            LongitudinalG {
                max_acceleration_g: signal::max(g_long).max(0.0),
                max_braking_g: (-signal::min(g_long)).max(0.0),
                avg_longitudinal_g: g_long.iter().map(|g| g.abs()).sum::<f64>()
                    / g_long.len() as f64,
            }
        });

        if lateral.is_none() && longitudinal.is_none() {
            return Analysis::Unavailable;
        }
        Analysis::Available(GForceAnalysis {
            lateral,
            longitudinal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lateral_only() {
        let channels = ChannelSet::from_channels([(Channel::GLat, vec![-1.5, 0.5, 1.0, -0.5])]);
        let Analysis::Available(analysis) =
            GForceAnalyzer.analyze(&channels, &AnalysisThresholds::default())
        else {
            panic!("g-force analysis should be available");
        };
        let lateral = analysis.lateral.unwrap();
        assert_relative_eq!(lateral.max_lateral_g, 1.5);
        assert_relative_eq!(lateral.avg_lateral_g, 0.875);
        assert!(analysis.longitudinal.is_none());
    }

    #[test]
    fn test_longitudinal_split_by_sign() {
        let channels = ChannelSet::from_channels([(Channel::GLong, vec![0.4, -1.2, 0.8, -0.2])]);
        let Analysis::Available(analysis) =
            GForceAnalyzer.analyze(&channels, &AnalysisThresholds::default())
        else {
            panic!("g-force analysis should be available");
        };
        let longitudinal = analysis.longitudinal.unwrap();
        assert_relative_eq!(longitudinal.max_acceleration_g, 0.8);
        assert_relative_eq!(longitudinal.max_braking_g, 1.2);
        assert_relative_eq!(longitudinal.avg_longitudinal_g, 0.65);
    }

    #[test]
    fn test_unavailable_without_accelerometer() {
        let channels = ChannelSet::from_channels([(Channel::Speed, vec![100.0; 4])]);
        assert_eq!(
            GForceAnalyzer.analyze(&channels, &AnalysisThresholds::default()),
            Analysis::Unavailable
        );
    }
}

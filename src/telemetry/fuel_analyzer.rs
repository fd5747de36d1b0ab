//! Approximate fuel model calibrated against a fixed base consumption, not real engine maps.

use std::fmt;

use serde::Serialize;

use super::signal;
use super::{Analysis, Channel, ChannelAnalyzer, ChannelSet};
use crate::config::AnalysisThresholds;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EcoOpportunity {
    ReduceHighThrottle,
    ShiftEarlier,
    SmootherThrottle,
}

impl fmt::Display for EcoOpportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReduceHighThrottle => write!(f, "Reduce time spent at high throttle"),
            Self::ShiftEarlier => write!(f, "Shift up earlier"),
            Self::SmootherThrottle => write!(f, "Apply the throttle more smoothly"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FuelAnalysis {
    /// Litres per 100 km
    pub estimated_consumption_rate: f64,
    pub fuel_efficiency_score: f64,
    pub eco_driving_opportunities: Vec<EcoOpportunity>,
}

/// Needs both throttle and RPM
#[derive(Default)]
pub struct FuelAnalyzer;

impl ChannelAnalyzer for FuelAnalyzer {
    type Output = FuelAnalysis;

    fn analyze(
        &self,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
    ) -> Analysis<FuelAnalysis> {
        if !channels.is_present(Channel::Throttle) || !channels.is_present(Channel::Rpm) {
            return Analysis::Unavailable;
        }

        let config = &thresholds.fuel;
        let throttle = channels.throttle();
        let rpm = channels.rpm();

        let load: Vec<f64> = throttle
            .iter()
            .zip(rpm)
            .map(|(t, r)| (t / 100.0) * (r / config.reference_rpm))
            .collect();
        let penalty: Vec<f64> = throttle
            .iter()
            .zip(rpm)
            .map(|(t, r)| {
                (t / 100.0) * config.throttle_penalty_weight
                    + (r / config.reference_rpm) * config.rpm_penalty_weight
            })
            .collect();

        let mut opportunities = Vec::new();
        if signal::percentage_where(throttle, |t| t > config.eco_high_throttle)
            > config.eco_high_throttle_share * 100.0
        {
            opportunities.push(EcoOpportunity::ReduceHighThrottle);
        }
        if signal::percentage_where(rpm, |r| r > config.eco_high_rpm)
            > config.eco_high_rpm_share * 100.0
        {
            opportunities.push(EcoOpportunity::ShiftEarlier);
        }
        if signal::smoothness(throttle) < config.eco_min_smoothness {
            opportunities.push(EcoOpportunity::SmootherThrottle);
        }

        Analysis::Available(FuelAnalysis {
            estimated_consumption_rate: config.base_consumption * (1.0 + signal::mean(&load)),
            fuel_efficiency_score: (100.0 - signal::mean(&penalty) * 100.0).max(0.0),
            eco_driving_opportunities: opportunities,
        })
    }
}

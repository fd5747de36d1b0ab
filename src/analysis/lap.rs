// Per-lap aggregation of every channel analyzer

use log::debug;
use serde::Serialize;

use super::sector_splitter::{SectorSplit, SectorSplitter};
use crate::config::AnalysisThresholds;
use crate::telemetry::signal;
use crate::telemetry::{
    Analysis, BrakeAnalysis, BrakeAnalyzer, Channel, ChannelAnalyzer, ChannelSet, EngineAnalysis,
    EngineAnalyzer, FuelAnalysis, FuelAnalyzer, GForceAnalysis, GForceAnalyzer, RawLap,
    SpeedAnalysis, SpeedAnalyzer, SteeringAnalysis, SteeringAnalyzer, ThrottleAnalysis,
    ThrottleAnalyzer, TireAnalysis, TireAnalyzer,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EfficiencyMetrics {
    pub speed_efficiency: f64,
    pub throttle_efficiency: f64,
    pub brake_efficiency: f64,
    pub steering_efficiency: f64,
    /// Mean of the sub-scores above zero
    pub overall_efficiency: f64,
}

impl EfficiencyMetrics {
    fn from_analyses(
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
        speed: &Analysis<SpeedAnalysis>,
        throttle: &Analysis<ThrottleAnalysis>,
        brake: &Analysis<BrakeAnalysis>,
        steering: &Analysis<SteeringAnalysis>,
    ) -> Self {
        let speed_efficiency = speed
            .as_option()
            .filter(|speed| speed.max_speed > signal::EPSILON)
            .map_or(0.0, |speed| speed.avg_speed / speed.max_speed * 100.0);

        let config = &thresholds.efficiency;
        let throttle_efficiency = throttle.as_option().map_or(0.0, |analysis| {
            let low = config.low_throttle;
            let hesitant = signal::percentage_where(channels.throttle(), |t| t < low);
            (analysis.throttle_smoothness - hesitant * low / 100.0).max(0.0)
        });

        // braking share uses the same pressure that opens a braking zone
        let brake_efficiency = brake.as_option().map_or(0.0, |analysis| {
            let pressure = thresholds.brake.threshold;
            let braking = signal::percentage_where(channels.brake(), |b| b > pressure);
            (analysis.brake_smoothness + (100.0 - braking).max(0.0)) / 2.0
        });

        let steering_efficiency = steering.as_option().map_or(0.0, |analysis| {
            let penalty = (analysis.steering_corrections as f64 * config.correction_penalty)
                .min(config.max_correction_penalty);
            (analysis.steering_smoothness - penalty).max(0.0)
        });

        let scores: Vec<f64> = [
            speed_efficiency,
            throttle_efficiency,
            brake_efficiency,
            steering_efficiency,
        ]
        .into_iter()
        .filter(|score| *score > 0.0)
        .collect();

        Self {
            speed_efficiency,
            throttle_efficiency,
            brake_efficiency,
            steering_efficiency,
            overall_efficiency: signal::mean(&scores),
        }
    }
}

/// Everything computed for one lap
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LapAnalysis {
    pub lap_number: u32,
    pub lap_time: f64,
    /// False when the lap carried no samples
    pub valid: bool,
    pub speed_analysis: Analysis<SpeedAnalysis>,
    pub throttle_analysis: Analysis<ThrottleAnalysis>,
    pub brake_analysis: Analysis<BrakeAnalysis>,
    pub steering_analysis: Analysis<SteeringAnalysis>,
    pub g_force_analysis: Analysis<GForceAnalysis>,
    pub engine_analysis: Analysis<EngineAnalysis>,
    pub tire_analysis: Analysis<TireAnalysis>,
    pub fuel_analysis: Analysis<FuelAnalysis>,
    pub sector_analysis: Analysis<SectorSplit>,
    pub efficiency_metrics: EfficiencyMetrics,
}

impl LapAnalysis {
    /// A lap without data: nothing is analyzed
    pub fn empty(lap_number: u32, lap_time: f64) -> Self {
        Self {
            lap_number,
            lap_time,
            valid: false,
            speed_analysis: Analysis::Unavailable,
            throttle_analysis: Analysis::Unavailable,
            brake_analysis: Analysis::Unavailable,
            steering_analysis: Analysis::Unavailable,
            g_force_analysis: Analysis::Unavailable,
            engine_analysis: Analysis::Unavailable,
            tire_analysis: Analysis::Unavailable,
            fuel_analysis: Analysis::Unavailable,
            sector_analysis: Analysis::Unavailable,
            efficiency_metrics: EfficiencyMetrics::default(),
        }
    }

    /// Runs every analyzer over an already normalized lap
    pub fn from_channels(
        lap_number: u32,
        lap_time: f64,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
        sector_boundaries: Option<&[f64]>,
    ) -> Self {
        if channels.is_empty() {
            return Self::empty(lap_number, lap_time);
        }

        let speed_analysis = SpeedAnalyzer.analyze(channels, thresholds);
        let throttle_analysis = ThrottleAnalyzer.analyze(channels, thresholds);
        let brake_analysis = BrakeAnalyzer.analyze(channels, thresholds);
        let steering_analysis = SteeringAnalyzer.analyze(channels, thresholds);

        let mut splitter = SectorSplitter::new(thresholds);
        if let Some(boundaries) = sector_boundaries {
            splitter = splitter.with_boundaries(boundaries);
        }

        let efficiency_metrics = EfficiencyMetrics::from_analyses(
            channels,
            thresholds,
            &speed_analysis,
            &throttle_analysis,
            &brake_analysis,
            &steering_analysis,
        );

        Self {
            lap_number,
            lap_time,
            valid: true,
            g_force_analysis: GForceAnalyzer.analyze(channels, thresholds),
            engine_analysis: EngineAnalyzer.analyze(channels, thresholds),
            tire_analysis: TireAnalyzer.analyze(channels, thresholds),
            fuel_analysis: FuelAnalyzer.analyze(channels, thresholds),
            sector_analysis: splitter.split(channels, lap_time),
            speed_analysis,
            throttle_analysis,
            brake_analysis,
            steering_analysis,
            efficiency_metrics,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.lap_time > 0.0
    }
}

/// Normalizes a raw lap once and analyzes it
pub fn analyze_lap(
    lap: &RawLap,
    thresholds: &AnalysisThresholds,
    sector_boundaries: Option<&[f64]>,
) -> LapAnalysis {
    if lap.is_empty() {
        debug!("Lap {} has no samples, skipping analysis", lap.lap_number);
        return LapAnalysis::empty(lap.lap_number, lap.lap_time);
    }

    let channels = ChannelSet::from_lap(lap);
    debug!(
        "Lap {}: {} samples, {} channels missing",
        lap.lap_number,
        channels.len(),
        channels.missing().len()
    );
    if !channels.is_present(Channel::Speed) {
        debug!("Lap {} has no speed signal", lap.lap_number);
    }
    LapAnalysis::from_channels(
        lap.lap_number,
        lap.lap_time,
        &channels,
        thresholds,
        sector_boundaries,
    )
}

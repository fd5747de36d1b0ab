// Analysis thresholds shared by every analyzer, loaded from the user's config directory when present

use std::path::Path;

use serde::{Deserialize, Serialize};
use uom::si::f64::Velocity;
use uom::si::velocity::{kilometer_per_hour, meter_per_second, mile_per_hour};

use crate::LapwiseError;

const CONFIG_DIR_NAME: &str = "lapwise";
const CONFIG_FILE_NAME: &str = "thresholds.json";

/// Unit of the `speed` channel, used when integrating speed into distance
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeedUnit {
    #[default]
    KilometersPerHour,
    MetersPerSecond,
    MilesPerHour,
}

impl SpeedUnit {
    pub fn to_meters_per_second(&self, value: f64) -> f64 {
        let velocity = match self {
            Self::KilometersPerHour => Velocity::new::<kilometer_per_hour>(value),
            Self::MetersPerSecond => Velocity::new::<meter_per_second>(value),
            Self::MilesPerHour => Velocity::new::<mile_per_hour>(value),
        };
        velocity.get::<meter_per_second>()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::KilometersPerHour => "km/h",
            Self::MetersPerSecond => "m/s",
            Self::MilesPerHour => "mph",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpeedThresholds {
    /// Minimum first-difference magnitude for an acceleration/deceleration event
    pub event_height: f64,
    /// Minimum sample separation between two acceleration/deceleration events
    pub event_distance: usize,
    /// Fraction of max speed counted as "top speed"
    pub top_speed_fraction: f64,
    /// Coefficient-of-variation multiplier for the speed consistency score
    pub consistency_k: f64,
}

impl Default for SpeedThresholds {
    fn default() -> Self {
        Self {
            event_height: 2.0,
            event_distance: 10,
            top_speed_fraction: 0.95,
            consistency_k: 100.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ThrottleThresholds {
    /// Throttle position at or above which the pedal counts as flat out
    pub full: f64,
    /// Throttle position at or below which the pedal counts as released
    pub off: f64,
    /// Lift-and-coast opens when throttle drops below this position
    pub lift_threshold: f64,
    /// Speed drop between two samples that closes an open lift-and-coast
    pub lift_speed_drop: f64,
}

impl Default for ThrottleThresholds {
    fn default() -> Self {
        Self {
            full: 95.0,
            off: 10.0,
            lift_threshold: 5.0,
            lift_speed_drop: 5.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BrakeThresholds {
    /// A braking zone opens when pressure rises above this value
    pub threshold: f64,
    /// An open braking zone closes when pressure falls below this value
    pub release_threshold: f64,
    /// Absolute steering angle above which braking counts as trail braking
    pub trail_steering_threshold: f64,
}

impl Default for BrakeThresholds {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            release_threshold: 5.0,
            trail_steering_threshold: 5.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SteeringThresholds {
    /// Minimum steering rate (per sample) for a direction change to count as a correction
    pub correction_threshold: f64,
    /// Minimum max-min spread before a lock-to-lock time is estimated
    pub lock_to_lock_min_spread: f64,
}

impl Default for SteeringThresholds {
    fn default() -> Self {
        Self {
            correction_threshold: 2.0,
            lock_to_lock_min_spread: 90.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineThresholds {
    pub rev_limit_rpm: f64,
    /// RPM that matches a throttle position of 100% in the engine efficiency score
    pub efficiency_rpm_scale: f64,
}

impl Default for EngineThresholds {
    fn default() -> Self {
        Self {
            rev_limit_rpm: 9500.0,
            efficiency_rpm_scale: 10_000.0,
        }
    }
}

/// Constants of the approximate tire and g-force models
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TireThresholds {
    /// Assumed lateral grip limit of the car, in g
    pub theoretical_max_g: f64,
    /// Lateral g change between two samples counted as a slip event
    pub slip_delta_g: f64,
    /// Lateral g above which a sample counts as cornering
    pub cornering_g: f64,
    /// Minimum speed for a sample to count as cornering
    pub cornering_min_speed: f64,
    pub lateral_consistency_k: f64,
}

impl Default for TireThresholds {
    fn default() -> Self {
        Self {
            theoretical_max_g: 1.5,
            slip_delta_g: 0.3,
            cornering_g: 0.5,
            cornering_min_speed: 30.0,
            lateral_consistency_k: 50.0,
        }
    }
}

/// Constants of the approximate fuel model
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FuelThresholds {
    /// Baseline consumption in L/100km
    pub base_consumption: f64,
    /// RPM used to normalize engine speed
    pub reference_rpm: f64,
    /// Weight of throttle position in the per-sample efficiency penalty
    pub throttle_penalty_weight: f64,
    /// Weight of normalized RPM in the per-sample efficiency penalty
    pub rpm_penalty_weight: f64,
    pub eco_high_throttle: f64,
    pub eco_high_throttle_share: f64,
    pub eco_high_rpm: f64,
    pub eco_high_rpm_share: f64,
    pub eco_min_smoothness: f64,
}

impl Default for FuelThresholds {
    fn default() -> Self {
        Self {
            base_consumption: 25.0,
            reference_rpm: 8000.0,
            throttle_penalty_weight: 0.5,
            rpm_penalty_weight: 0.3,
            eco_high_throttle: 80.0,
            eco_high_throttle_share: 0.3,
            eco_high_rpm: 7000.0,
            eco_high_rpm_share: 0.2,
            eco_min_smoothness: 70.0,
        }
    }
}

/// Cutoffs of the per-lap efficiency scores
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EfficiencyThresholds {
    /// Throttle below this counts as hesitant in the throttle score
    pub low_throttle: f64,
    /// Steering score points lost per correction
    pub correction_penalty: f64,
    pub max_correction_penalty: f64,
    /// Average speed (km/h) that scores 100 against a track layout
    pub reference_avg_speed: f64,
}

impl Default for EfficiencyThresholds {
    fn default() -> Self {
        Self {
            low_throttle: 20.0,
            correction_penalty: 2.0,
            max_correction_penalty: 50.0,
            reference_avg_speed: 200.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionThresholds {
    /// Laps further than this many standard deviations from the mean are outliers
    pub outlier_std_factor: f64,
    /// Trends with a weaker correlation than this are stable
    pub trend_r_threshold: f64,
    pub qualifying_max_laps: usize,
    pub practice_max_laps: usize,
}

impl Default for SessionThresholds {
    fn default() -> Self {
        Self {
            outlier_std_factor: 2.0,
            trend_r_threshold: 0.3,
            qualifying_max_laps: 3,
            practice_max_laps: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InsightThresholds {
    pub consistency_warning: f64,
    pub consistency_critical: f64,
    /// Minimum first-half to second-half improvement, in seconds
    pub improvement_seconds: f64,
    pub low_full_throttle_pct: f64,
    pub low_avg_throttle: f64,
    pub heavy_brake_pressure: f64,
    pub heavy_brake_events: usize,
    pub understeer_pct: f64,
    pub oversteer_per_minute: f64,
    /// Braking efficiency under which brake balance changes are suggested
    pub low_braking_efficiency: f64,
    pub low_top_speed: f64,
    pub high_top_speed: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            consistency_warning: 95.0,
            consistency_critical: 90.0,
            improvement_seconds: 0.5,
            low_full_throttle_pct: 60.0,
            low_avg_throttle: 80.0,
            heavy_brake_pressure: 90.0,
            heavy_brake_events: 5,
            understeer_pct: 30.0,
            oversteer_per_minute: 20.0,
            low_braking_efficiency: 0.1,
            low_top_speed: 200.0,
            high_top_speed: 300.0,
        }
    }
}

/// Geometry settings for track reconstruction
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackConfig {
    /// Consecutive points closer than this are dropped
    pub min_point_distance: f64,
    /// Radius reported for straight sections
    pub max_corner_radius: f64,
    /// Turn angles (radians) below this are treated as straight
    pub min_turn_angle: f64,
    pub straight_radius: f64,
    pub fast_corner_radius: f64,
    pub savgol_max_window: usize,
    pub savgol_poly_order: usize,
    /// Share of the trace used for the signed-area direction test
    pub direction_sample_fraction: f64,
    pub synthetic_point_count: usize,
    pub default_track_length: f64,
    pub max_optimal_speed: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            min_point_distance: 1.0,
            max_corner_radius: 10_000.0,
            min_turn_angle: 1e-6,
            straight_radius: 1000.0,
            fast_corner_radius: 200.0,
            savgol_max_window: 51,
            savgol_poly_order: 3,
            direction_sample_fraction: 0.5,
            synthetic_point_count: 200,
            default_track_length: 5000.0,
            max_optimal_speed: 350.0,
        }
    }
}

/// Every tunable cutoff used by the analysis engine
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisThresholds {
    /// Sample rate assumed when a lap has no usable time channel
    pub default_sample_rate_hz: f64,
    pub speed_unit: SpeedUnit,
    pub sector_count: usize,
    pub speed: SpeedThresholds,
    pub throttle: ThrottleThresholds,
    pub brake: BrakeThresholds,
    pub steering: SteeringThresholds,
    pub engine: EngineThresholds,
    pub tire: TireThresholds,
    pub fuel: FuelThresholds,
    pub efficiency: EfficiencyThresholds,
    pub session: SessionThresholds,
    pub insights: InsightThresholds,
    pub track: TrackConfig,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            default_sample_rate_hz: 60.0,
            speed_unit: SpeedUnit::default(),
            sector_count: 3,
            speed: SpeedThresholds::default(),
            throttle: ThrottleThresholds::default(),
            brake: BrakeThresholds::default(),
            steering: SteeringThresholds::default(),
            engine: EngineThresholds::default(),
            tire: TireThresholds::default(),
            fuel: FuelThresholds::default(),
            efficiency: EfficiencyThresholds::default(),
            session: SessionThresholds::default(),
            insights: InsightThresholds::default(),
            track: TrackConfig::default(),
        }
    }
}

impl AnalysisThresholds {
    /// Loads the thresholds saved in the user's config directory, if any
    pub fn from_local_file() -> Result<Option<Self>, LapwiseError> {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(None);
        };
        let config_path = config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::from_file(&config_path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, LapwiseError> {
        let file =
            std::fs::File::open(path).map_err(|e| LapwiseError::ConfigIOError { source: e })?;
        let thresholds: Self = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| LapwiseError::ConfigSerializeError { source: e })?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn save(&self) -> Result<(), LapwiseError> {
        let config_path = dirs::config_dir()
            .ok_or(LapwiseError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), LapwiseError> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| LapwiseError::ConfigIOError { source: e })?;
        }

        let file =
            std::fs::File::create(path).map_err(|e| LapwiseError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| LapwiseError::ConfigSerializeError { source: e })
    }

    /// Rejects combinations of thresholds the analyzers cannot work with
    pub fn validate(&self) -> Result<(), LapwiseError> {
        fn invalid(field: &str, reason: &str) -> Result<(), LapwiseError> {
            Err(LapwiseError::InvalidThreshold {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        }

        if !(self.default_sample_rate_hz > 0.0) {
            return invalid("default_sample_rate_hz", "must be greater than zero");
        }
        if self.sector_count == 0 {
            return invalid("sector_count", "at least one sector is required");
        }
        if self.brake.release_threshold > self.brake.threshold {
            return invalid(
                "brake.release_threshold",
                "must not be above brake.threshold",
            );
        }
        if self.throttle.off >= self.throttle.full {
            return invalid("throttle.off", "must be below throttle.full");
        }
        if !(self.tire.theoretical_max_g > 0.0) {
            return invalid("tire.theoretical_max_g", "must be greater than zero");
        }
        if !(self.fuel.reference_rpm > 0.0) {
            return invalid("fuel.reference_rpm", "must be greater than zero");
        }
        if !(self.engine.efficiency_rpm_scale > 0.0) {
            return invalid("engine.efficiency_rpm_scale", "must be greater than zero");
        }
        if !(self.efficiency.reference_avg_speed > 0.0) {
            return invalid("efficiency.reference_avg_speed", "must be greater than zero");
        }
        if self.track.fast_corner_radius >= self.track.straight_radius {
            return invalid(
                "track.fast_corner_radius",
                "must be below track.straight_radius",
            );
        }
        if self.track.max_corner_radius < self.track.straight_radius {
            return invalid(
                "track.max_corner_radius",
                "must not be below track.straight_radius",
            );
        }
        if !(self.track.min_point_distance >= 0.0) {
            return invalid("track.min_point_distance", "must not be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnalysisThresholds::default().validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{"brake": {"threshold": 20.0}, "sector_count": 4}"#;
        let thresholds: AnalysisThresholds = serde_json::from_str(json).unwrap();
        assert_eq!(thresholds.sector_count, 4);
        assert_relative_eq!(thresholds.brake.threshold, 20.0);
        assert_relative_eq!(thresholds.brake.release_threshold, 5.0);
        assert_relative_eq!(thresholds.engine.rev_limit_rpm, 9500.0);
    }

    #[test]
    fn test_efficiency_cutoffs_are_configurable() {
        let json = r#"{"efficiency": {"low_throttle": 30.0}, "fuel": {"rpm_penalty_weight": 0.6}}"#;
        let thresholds: AnalysisThresholds = serde_json::from_str(json).unwrap();
        assert_relative_eq!(thresholds.efficiency.low_throttle, 30.0);
        assert_relative_eq!(thresholds.efficiency.max_correction_penalty, 50.0);
        assert_relative_eq!(thresholds.fuel.rpm_penalty_weight, 0.6);
        assert_relative_eq!(thresholds.fuel.throttle_penalty_weight, 0.5);
        assert_relative_eq!(thresholds.engine.efficiency_rpm_scale, 10_000.0);

        let mut zero_scale = thresholds;
        zero_scale.engine.efficiency_rpm_scale = 0.0;
        assert!(matches!(
            zero_scale.validate(),
            Err(LapwiseError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_release_above_threshold_is_rejected() {
        let mut thresholds = AnalysisThresholds::default();
        thresholds.brake.release_threshold = 50.0;
        match thresholds.validate() {
            Err(LapwiseError::InvalidThreshold { field, .. }) => {
                assert_eq!(field, "brake.release_threshold")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_zero_sectors_rejected() {
        let thresholds = AnalysisThresholds {
            sector_count: 0,
            ..Default::default()
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_speed_unit_conversion() {
        assert_relative_eq!(
            SpeedUnit::KilometersPerHour.to_meters_per_second(36.0),
            10.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(SpeedUnit::MetersPerSecond.to_meters_per_second(12.5), 12.5);
        assert_relative_eq!(
            SpeedUnit::MilesPerHour.to_meters_per_second(100.0),
            44.704,
            epsilon = 1e-6
        );
    }
}

pub mod brake_analyzer;
pub mod channels;
pub mod engine_analyzer;
pub mod fuel_analyzer;
pub mod g_force_analyzer;
pub mod signal;
pub mod speed_analyzer;
pub mod steering_analyzer;
pub mod throttle_analyzer;
pub mod tire_analyzer;

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::AnalysisThresholds;

pub use brake_analyzer::{BrakeAnalysis, BrakeAnalyzer};
pub use channels::{Channel, ChannelSet};
pub use engine_analyzer::{EngineAnalysis, EngineAnalyzer, ShiftDirection, ShiftPoint};
pub use fuel_analyzer::{EcoOpportunity, FuelAnalysis, FuelAnalyzer};
pub use g_force_analyzer::{GForceAnalysis, GForceAnalyzer, LateralG, LongitudinalG};
pub use speed_analyzer::{SpeedAnalysis, SpeedAnalyzer};
pub use steering_analyzer::{SteeringAnalysis, SteeringAnalyzer};
pub use throttle_analyzer::{ThrottleAnalysis, ThrottleAnalyzer};
pub use tire_analyzer::{CorneringPerformance, TireAnalysis, TireAnalyzer};

/// Result of an analyzer: either the metrics or a marker that the lap lacks the data
/// the analyzer needs. Serializes as `{"valid": false}` or as the metrics with
/// `"valid": true` added.
#[derive(Clone, Debug, PartialEq)]
pub enum Analysis<T> {
    Unavailable,
    Available(T),
}

impl<T> Analysis<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Available(metrics) => Some(metrics),
            Self::Unavailable => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Analysis<U> {
        match self {
            Self::Available(metrics) => Analysis::Available(f(metrics)),
            Self::Unavailable => Analysis::Unavailable,
        }
    }
}

impl<T> Default for Analysis<T> {
    fn default() -> Self {
        Self::Unavailable
    }
}

impl<T> From<Option<T>> for Analysis<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(metrics) => Self::Available(metrics),
            None => Self::Unavailable,
        }
    }
}

impl<T: Serialize> Serialize for Analysis<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Flagged<'a, T> {
            valid: bool,
            #[serde(flatten)]
            metrics: Option<&'a T>,
        }

        Flagged {
            valid: self.is_available(),
            metrics: self.as_option(),
        }
        .serialize(serializer)
    }
}

/// Turns the channels of one lap into a metrics record
pub trait ChannelAnalyzer {
    type Output;

    fn analyze(
        &self,
        channels: &ChannelSet,
        thresholds: &AnalysisThresholds,
    ) -> Analysis<Self::Output>;
}

/// One sample of a lap, keyed by whatever channel names the logger produced
pub type DataPoint = HashMap<String, f64>;

/// A lap as delivered by the ingestion layer
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawLap {
    pub lap_number: u32,
    /// Lap time in seconds, 0 or negative when the lap was not timed
    pub lap_time: f64,
    /// Time-ordered samples, a `null` value reads as 0.0
    #[serde(default, deserialize_with = "nullable_data_points")]
    pub data_points: Vec<DataPoint>,
    /// Pre-split channel arrays, used when `data_points` is empty
    #[serde(
        default,
        deserialize_with = "nullable_channels",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub channels: HashMap<String, Vec<f64>>,
}

fn nullable_data_points<'de, D>(deserializer: D) -> Result<Vec<DataPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let points = Vec::<HashMap<String, Option<f64>>>::deserialize(deserializer)?;
    Ok(points
        .into_iter()
        .map(|point| {
            point
                .into_iter()
                .map(|(name, value)| (name, value.unwrap_or(0.0)))
                .collect()
        })
        .collect())
}

fn nullable_channels<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let channels = HashMap::<String, Vec<Option<f64>>>::deserialize(deserializer)?;
    Ok(channels
        .into_iter()
        .map(|(name, values)| {
            let values = values.into_iter().map(|v| v.unwrap_or(0.0)).collect();
            (name, values)
        })
        .collect())
}

impl RawLap {
    pub fn new(lap_number: u32, lap_time: f64, data_points: Vec<DataPoint>) -> Self {
        Self {
            lap_number,
            lap_time,
            data_points,
            channels: HashMap::new(),
        }
    }

    /// True when the lap carries no samples in either representation
    pub fn is_empty(&self) -> bool {
        self.data_points.is_empty() && self.channels.values().all(|values| values.is_empty())
    }

    pub fn is_timed(&self) -> bool {
        self.lap_time > 0.0
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub car: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    /// Session length, either seconds or a free-form string
    #[serde(default)]
    pub duration: Option<serde_json::Value>,
    #[serde(default)]
    pub session_type: Option<String>,
    /// Any other key written by the logger (`Venue`, `circuit`, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl SessionMetadata {
    /// Track name from the `track` field or the other keys loggers use for it
    pub fn track_name(&self) -> Option<String> {
        const TRACK_KEYS: [&str; 5] = ["Venue", "venue", "Track", "circuit", "Circuit"];

        self.track
            .iter()
            .cloned()
            .chain(
                TRACK_KEYS
                    .iter()
                    .filter_map(|key| self.extra.get(*key))
                    .filter_map(|value| value.as_str().map(str::to_string)),
            )
            .map(|name| name.trim().to_string())
            .find(|name| !name.is_empty())
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration.as_ref().and_then(|value| value.as_f64())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub metadata: SessionMetadata,
    #[serde(default)]
    pub laps: Vec<RawLap>,
}

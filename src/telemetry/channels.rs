// Resolution of logger channel names onto the canonical channel set

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use log::{debug, warn};
use serde::Serialize;

use super::{DataPoint, RawLap};
use crate::config::SpeedUnit;
use crate::telemetry::signal;

/// Canonical channels every analyzer works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Speed,
    Throttle,
    Brake,
    Steering,
    GLat,
    GLong,
    Rpm,
    Gear,
    Time,
}

const CHANNEL_COUNT: usize = 9;

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Speed,
        Channel::Throttle,
        Channel::Brake,
        Channel::Steering,
        Channel::GLat,
        Channel::GLong,
        Channel::Rpm,
        Channel::Gear,
        Channel::Time,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Throttle => "throttle",
            Self::Brake => "brake",
            Self::Steering => "steering",
            Self::GLat => "g_lat",
            Self::GLong => "g_long",
            Self::Rpm => "rpm",
            Self::Gear => "gear",
            Self::Time => "time",
        }
    }

    /// Raw key names accepted for this channel, in priority order
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Speed => &["speed", "SPEED", "Speed", "VEL", "Velocity"],
            Self::Throttle => &["throttle", "THROTTLE", "Throttle", "TPS", "ACCEL"],
            Self::Brake => &["brake", "BRAKE", "Brake", "BRAKE_PRESS", "BrakePressure"],
            Self::Steering => &["steering", "STEERANGLE", "SteerAngle", "STEERING", "Steering"],
            Self::GLat => &["g_lat", "G_LAT", "GLat", "LATERAL_G", "LateralG"],
            Self::GLong => &["g_long", "G_LONG", "GLong", "LONGITUDINAL_G", "LongitudinalG"],
            Self::Rpm => &["rpm", "RPM", "Rpm", "ENGINE_RPM", "EngineRPM"],
            Self::Gear => &["gear", "GEAR", "Gear", "CURRENT_GEAR"],
            Self::Time => &["time", "Time", "TIME", "Timestamp"],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The canonical channels of one lap. Every channel has the same length; channels
/// the logger did not record are all zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSet {
    data: [Vec<f64>; CHANNEL_COUNT],
    len: usize,
    missing: Vec<Channel>,
}

impl ChannelSet {
    /// Normalizes a lap, preferring per-sample data points over pre-split arrays
    pub fn from_lap(lap: &RawLap) -> Self {
        if lap.data_points.is_empty() && !lap.channels.is_empty() {
            Self::from_arrays(&lap.channels)
        } else {
            Self::from_data_points(&lap.data_points)
        }
    }

    pub fn from_data_points(points: &[DataPoint]) -> Self {
        let len = points.len();
        let mut data: [Vec<f64>; CHANNEL_COUNT] = std::array::from_fn(|_| Vec::new());
        let mut missing = Vec::new();

        for channel in Channel::ALL {
            let found: Vec<&str> = channel
                .aliases()
                .iter()
                .copied()
                .filter(|alias| points.iter().any(|point| point.contains_key(*alias)))
                .collect();

            data[channel.index()] = match found.first() {
                Some(alias) => {
                    log_ignored_aliases(channel, &found);
                    points
                        .iter()
                        .map(|point| point.get(*alias).copied().unwrap_or(0.0))
                        .collect()
                }
                None => {
                    missing.push(channel);
                    vec![0.0; len]
                }
            };
        }

        log_missing(&missing, len);
        Self { data, len, missing }
    }

    /// Normalizes channel arrays that were already split by the parser. Shorter
    /// arrays are padded with zeros up to the longest one.
    pub fn from_arrays(arrays: &HashMap<String, Vec<f64>>) -> Self {
        let len = arrays.values().map(Vec::len).max().unwrap_or(0);
        let mut data: [Vec<f64>; CHANNEL_COUNT] = std::array::from_fn(|_| Vec::new());
        let mut missing = Vec::new();

        for channel in Channel::ALL {
            let found: Vec<&str> = channel
                .aliases()
                .iter()
                .copied()
                .filter(|alias| arrays.contains_key(*alias))
                .collect();

            data[channel.index()] = match found.first().and_then(|alias| arrays.get(*alias)) {
                Some(values) => {
                    log_ignored_aliases(channel, &found);
                    let mut values = values.clone();
                    values.resize(len, 0.0);
                    values
                }
                None => {
                    missing.push(channel);
                    vec![0.0; len]
                }
            };
        }

        log_missing(&missing, len);
        Self { data, len, missing }
    }

    /// Builds a channel set directly from canonical channels
    pub fn from_channels<I>(channels: I) -> Self
    where
        I: IntoIterator<Item = (Channel, Vec<f64>)>,
    {
        let mut data: [Vec<f64>; CHANNEL_COUNT] = std::array::from_fn(|_| Vec::new());
        let mut provided = [false; CHANNEL_COUNT];
        for (channel, values) in channels {
            provided[channel.index()] = true;
            data[channel.index()] = values;
        }

        let len = data.iter().map(Vec::len).max().unwrap_or(0);
        for values in data.iter_mut() {
            values.resize(len, 0.0);
        }
        let missing = Channel::ALL
            .into_iter()
            .filter(|channel| !provided[channel.index()])
            .collect();

        Self { data, len, missing }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, channel: Channel) -> &[f64] {
        &self.data[channel.index()]
    }

    /// A channel is present when it carries at least one non-zero sample
    pub fn is_present(&self, channel: Channel) -> bool {
        !signal::is_absent(self.get(channel))
    }

    /// Channels that had no matching key in the raw data
    pub fn missing(&self) -> &[Channel] {
        &self.missing
    }

    pub fn speed(&self) -> &[f64] {
        self.get(Channel::Speed)
    }

    pub fn throttle(&self) -> &[f64] {
        self.get(Channel::Throttle)
    }

    pub fn brake(&self) -> &[f64] {
        self.get(Channel::Brake)
    }

    pub fn steering(&self) -> &[f64] {
        self.get(Channel::Steering)
    }

    pub fn g_lat(&self) -> &[f64] {
        self.get(Channel::GLat)
    }

    pub fn g_long(&self) -> &[f64] {
        self.get(Channel::GLong)
    }

    pub fn rpm(&self) -> &[f64] {
        self.get(Channel::Rpm)
    }

    pub fn gear(&self) -> &[f64] {
        self.get(Channel::Gear)
    }

    pub fn time(&self) -> &[f64] {
        self.get(Channel::Time)
    }

    /// Copies a contiguous sample range into a new channel set
    pub fn slice(&self, range: Range<usize>) -> ChannelSet {
        let start = range.start.min(self.len);
        let end = range.end.clamp(start, self.len);
        let data = std::array::from_fn(|i| self.data[i][start..end].to_vec());
        Self {
            data,
            len: end - start,
            missing: self.missing.clone(),
        }
    }

    /// Samples per second, from the time channel when it increases over the lap
    pub fn sample_rate_hz(&self, default_hz: f64) -> f64 {
        let time = self.time();
        match (time.first(), time.last()) {
            (Some(first), Some(last)) if self.len >= 2 && last > first => {
                (self.len - 1) as f64 / (last - first)
            }
            _ => default_hz,
        }
    }

    /// Seconds between the first and the last sample
    pub fn duration_seconds(&self, default_hz: f64) -> f64 {
        if self.len < 2 {
            return 0.0;
        }
        (self.len - 1) as f64 / self.sample_rate_hz(default_hz)
    }

    /// Distance travelled in metres at each sample, integrating speed over time
    pub fn cumulative_distance(&self, unit: SpeedUnit, default_hz: f64) -> Vec<f64> {
        let speed = self.speed();
        let time = self.time();
        let use_time = self.is_present(Channel::Time);
        let fallback_dt = 1.0 / self.sample_rate_hz(default_hz);

        let mut distance = Vec::with_capacity(self.len);
        let mut total = 0.0;
        for i in 0..self.len {
            if i > 0 {
                let dt = if use_time && time[i] > time[i - 1] {
                    time[i] - time[i - 1]
                } else {
                    fallback_dt
                };
                let avg_speed = (speed[i].max(0.0) + speed[i - 1].max(0.0)) / 2.0;
                total += unit.to_meters_per_second(avg_speed) * dt;
            }
            distance.push(total);
        }
        distance
    }
}

fn log_ignored_aliases(channel: Channel, found: &[&str]) {
    if found.len() > 1 {
        debug!(
            "Channel {} resolved to '{}', ignoring {:?}",
            channel,
            found[0],
            &found[1..]
        );
    }
}

fn log_missing(missing: &[Channel], len: usize) {
    if !missing.is_empty() && len > 0 {
        let names: Vec<&str> = missing.iter().map(Channel::name).collect();
        warn!("Channels missing from lap, filled with zeros: {}", names.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(values: &[(&str, f64)]) -> DataPoint {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_aliases_resolve_to_canonical_channels() {
        let points = vec![
            point(&[("SPEED", 100.0), ("TPS", 50.0), ("SteerAngle", -4.0)]),
            point(&[("SPEED", 110.0), ("TPS", 60.0), ("SteerAngle", 2.0)]),
        ];
        let channels = ChannelSet::from_data_points(&points);

        assert_eq!(channels.len(), 2);
        assert_eq!(channels.speed(), &[100.0, 110.0]);
        assert_eq!(channels.throttle(), &[50.0, 60.0]);
        assert_eq!(channels.steering(), &[-4.0, 2.0]);
        assert_eq!(channels.brake(), &[0.0, 0.0]);
        assert!(channels.missing().contains(&Channel::Brake));
        assert!(!channels.missing().contains(&Channel::Speed));
    }

    #[test]
    fn test_first_alias_wins_for_whole_lap() {
        // "SPEED" comes before "VEL" in the alias list
        let points = vec![
            point(&[("VEL", 1.0)]),
            point(&[("SPEED", 2.0), ("VEL", 3.0)]),
        ];
        let channels = ChannelSet::from_data_points(&points);
        assert_eq!(channels.speed(), &[0.0, 2.0]);
    }

    #[test]
    fn test_arrays_are_padded_to_equal_length() {
        let mut arrays = HashMap::new();
        arrays.insert("RPM".to_string(), vec![5000.0, 5100.0, 5200.0]);
        arrays.insert("Gear".to_string(), vec![3.0]);
        let channels = ChannelSet::from_arrays(&arrays);

        assert_eq!(channels.len(), 3);
        assert_eq!(channels.gear(), &[3.0, 0.0, 0.0]);
        for channel in Channel::ALL {
            assert_eq!(channels.get(channel).len(), 3);
        }
    }

    #[test]
    fn test_empty_input_gives_empty_set() {
        let channels = ChannelSet::from_data_points(&[]);
        assert!(channels.is_empty());
        assert!(!channels.is_present(Channel::Speed));
        assert_eq!(channels.missing().len(), Channel::ALL.len());
    }

    #[test]
    fn test_slice_keeps_all_channels_aligned() {
        let channels = ChannelSet::from_channels([
            (Channel::Speed, vec![1.0, 2.0, 3.0, 4.0]),
            (Channel::Brake, vec![0.0, 0.0, 5.0]),
        ]);
        let slice = channels.slice(1..3);
        assert_eq!(slice.len(), 2);
        assert_eq!(slice.speed(), &[2.0, 3.0]);
        assert_eq!(slice.brake(), &[0.0, 5.0]);

        let clamped = channels.slice(3..10);
        assert_eq!(clamped.len(), 1);
    }

    #[test]
    fn test_sample_rate_from_time_channel() {
        let channels = ChannelSet::from_channels([(Channel::Time, vec![0.0, 0.1, 0.2, 0.3, 0.4])]);
        assert_relative_eq!(channels.sample_rate_hz(60.0), 10.0, epsilon = 1e-9);

        let untimed = ChannelSet::from_channels([(Channel::Speed, vec![1.0, 2.0])]);
        assert_relative_eq!(untimed.sample_rate_hz(60.0), 60.0);
    }

    #[test]
    fn test_duration_spans_first_to_last_sample() {
        let timed = ChannelSet::from_channels([(Channel::Time, vec![0.0, 0.1, 0.2, 0.3, 0.4])]);
        assert_relative_eq!(timed.duration_seconds(60.0), 0.4, epsilon = 1e-9);

        let untimed = ChannelSet::from_channels([(Channel::Speed, vec![1.0; 61])]);
        assert_relative_eq!(untimed.duration_seconds(60.0), 1.0, epsilon = 1e-9);

        let single = ChannelSet::from_channels([(Channel::Speed, vec![1.0])]);
        assert_relative_eq!(single.duration_seconds(60.0), 0.0);
    }

    #[test]
    fn test_cumulative_distance_integrates_speed() {
        let channels = ChannelSet::from_channels([
            (Channel::Speed, vec![36.0, 36.0, 36.0]),
            (Channel::Time, vec![0.0, 1.0, 2.0]),
        ]);
        let distance = channels.cumulative_distance(SpeedUnit::KilometersPerHour, 60.0);
        assert_relative_eq!(distance[0], 0.0);
        assert_relative_eq!(distance[1], 10.0, epsilon = 1e-9);
        assert_relative_eq!(distance[2], 20.0, epsilon = 1e-9);
    }
}

// Builds track layouts from recorded positions, or a placeholder loop when there are none

use std::f64::consts::PI;

use log::{debug, info, warn};
use uom::si::angle::{degree, radian};
use uom::si::f64::{Angle, Length};
use uom::si::length::{kilometer, meter};

use super::geometry;
use super::smoothing::{self, Smoother};
use super::types::{Direction, LayoutSource, Point2D, SectorType, TrackLayout, TrackPoint, TrackSector};
use crate::LapwiseError;
use crate::config::{AnalysisThresholds, TrackConfig};
use crate::telemetry::signal::{self, EPSILON};
use crate::telemetry::{ChannelSet, RawLap, Session};

const EARTH_RADIUS_KM: f64 = 6371.0;
const GRAVITY: f64 = 9.81;
const UNKNOWN_TRACK: &str = "unknown_track";

/// Planar position channel pairs, in order of preference
const CARTESIAN_CHANNELS: [(&str, &str); 3] = [("POS_X", "POS_Y"), ("X", "Y"), ("x", "y")];
/// Latitude/longitude channel pairs in degrees, in order of preference
const GPS_CHANNELS: [(&str, &str); 3] = [
    ("GPS_LAT", "GPS_LONG"),
    ("LAT", "LONG"),
    ("LATITUDE", "LONGITUDE"),
];

/// A circuit whose length and direction are known without any telemetry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnownTrack {
    pub key: &'static str,
    pub full_name: &'static str,
    /// Metres
    pub length: f64,
    pub direction: Direction,
    /// Lowercase fragments that identify the track in a session's metadata
    matches: &'static [&'static str],
}

pub const KNOWN_TRACKS: [KnownTrack; 5] = [
    KnownTrack {
        key: "monza",
        full_name: "Autodromo Nazionale di Monza",
        length: 5793.0,
        direction: Direction::Clockwise,
        matches: &["monza"],
    },
    KnownTrack {
        key: "spa",
        full_name: "Circuit de Spa-Francorchamps",
        length: 7004.0,
        direction: Direction::Clockwise,
        matches: &["spa", "francorchamps"],
    },
    KnownTrack {
        key: "silverstone",
        full_name: "Silverstone Circuit",
        length: 5891.0,
        direction: Direction::Clockwise,
        matches: &["silverstone"],
    },
    KnownTrack {
        key: "nurburgring",
        full_name: "Nürburgring GP-Strecke",
        length: 5148.0,
        direction: Direction::Clockwise,
        matches: &["nurburgring", "nürburgring"],
    },
    KnownTrack {
        key: "imola",
        full_name: "Autodromo Enzo e Dino Ferrari",
        length: 4909.0,
        direction: Direction::Counterclockwise,
        matches: &["imola"],
    },
];

/// Looks a track up by the name a logger wrote into the session metadata
pub fn find_known_track(name: &str) -> Option<&'static KnownTrack> {
    let name = name.trim().to_lowercase();
    KNOWN_TRACKS
        .iter()
        .find(|track| track.matches.iter().any(|fragment| name.contains(fragment)))
}

/// Planar positions of one lap in metres, from X/Y channels or projected GPS fixes.
///
/// Samples missing either coordinate are skipped. Returns `None` when the lap has no
/// position channels or only records the origin.
pub fn extract_positions(lap: &RawLap) -> Option<Vec<Point2D>> {
    if let Some(points) = CARTESIAN_CHANNELS
        .iter()
        .find_map(|(x, y)| coordinate_pairs(lap, x, y))
    {
        return Some(points.into_iter().map(|(x, y)| Point2D::new(x, y)).collect());
    }

    GPS_CHANNELS
        .iter()
        .find_map(|(lat, lon)| coordinate_pairs(lap, lat, lon))
        .map(|fixes| project_gps(&fixes))
}

fn coordinate_pairs(lap: &RawLap, first: &str, second: &str) -> Option<Vec<(f64, f64)>> {
    let pairs: Vec<(f64, f64)> = if lap.data_points.is_empty() {
        let (a, b) = (lap.channels.get(first)?, lap.channels.get(second)?);
        a.iter().copied().zip(b.iter().copied()).collect()
    } else {
        lap.data_points
            .iter()
            .filter_map(|point| Some((*point.get(first)?, *point.get(second)?)))
            .collect()
    };

    // loggers that do not track position write zeros
    if pairs.iter().all(|(a, b)| a.abs() < EPSILON && b.abs() < EPSILON) {
        return None;
    }
    debug!(
        "Lap {}: {} positions from {}/{}",
        lap.lap_number,
        pairs.len(),
        first,
        second
    );
    Some(pairs)
}

/// Equirectangular projection around the first fix; x points east, y north
pub fn project_gps(fixes: &[(f64, f64)]) -> Vec<Point2D> {
    let Some(&(origin_lat, origin_lon)) = fixes.first() else {
        return Vec::new();
    };
    let earth_radius = Length::new::<kilometer>(EARTH_RADIUS_KM);
    let cos_origin = Angle::new::<degree>(origin_lat).get::<radian>().cos();

    fixes
        .iter()
        .map(|(lat, lon)| {
            let d_lat = Angle::new::<degree>(lat - origin_lat).get::<radian>();
            let d_lon = Angle::new::<degree>(lon - origin_lon).get::<radian>();
            Point2D::new(
                (earth_radius * d_lon * cos_origin).get::<meter>(),
                (earth_radius * d_lat).get::<meter>(),
            )
        })
        .collect()
}

/// Turns position traces into [`TrackLayout`]s.
///
/// The pipeline is dedup, smooth, measure, then sectorize. Smoothing strategies are tried in
/// order and the first one that accepts the trace wins.
pub struct TrackReconstructor<'a> {
    config: &'a TrackConfig,
    sector_count: usize,
    max_lateral_g: f64,
    smoothers: Vec<Box<dyn Smoother>>,
}

impl<'a> TrackReconstructor<'a> {
    pub fn new(thresholds: &'a AnalysisThresholds) -> Self {
        Self {
            config: &thresholds.track,
            sector_count: thresholds.sector_count.max(1),
            max_lateral_g: thresholds.tire.theoretical_max_g,
            smoothers: smoothing::default_smoothers(&thresholds.track),
        }
    }

    /// Replaces the smoothing strategies
    pub fn with_smoothers(mut self, smoothers: Vec<Box<dyn Smoother>>) -> Self {
        self.smoothers = smoothers;
        self
    }

    /// Reconstructs a layout from a raw trace.
    ///
    /// `boundaries` are interior sector starts as fractions of the lap; without them the
    /// layout is cut into equal sectors.
    pub fn reconstruct(
        &self,
        name: &str,
        raw: &[Point2D],
        boundaries: Option<&[f64]>,
    ) -> Result<TrackLayout, LapwiseError> {
        let deduped = geometry::dedup_points(raw, self.config.min_point_distance);
        if deduped.len() < 2 {
            return Err(LapwiseError::TrackReconstructionError {
                reason: format!(
                    "need at least 2 distinct positions, got {} from {} samples",
                    deduped.len(),
                    raw.len()
                ),
            });
        }

        let smoothed = smoothing::smooth_trace(&deduped, &self.smoothers);
        let distances = geometry::cumulative_distances(&smoothed);
        let total_length = distances.last().copied().unwrap_or(0.0);
        if total_length <= EPSILON {
            return Err(LapwiseError::TrackReconstructionError {
                reason: "positions collapse to a single point after smoothing".to_string(),
            });
        }
        let radii = geometry::corner_radii(&smoothed, self.config);

        let mut points: Vec<TrackPoint> = smoothed
            .iter()
            .zip(distances)
            .zip(radii)
            .map(|((position, distance), corner_radius)| TrackPoint {
                x: position.x,
                y: position.y,
                distance,
                sector: 1,
                corner_radius,
            })
            .collect();
        let sectors = self.sectorize(&mut points, total_length, boundaries);
        let direction =
            geometry::direction_of_travel(&smoothed, self.config.direction_sample_fraction);

        info!(
            "Reconstructed {}: {} points, {:.0}m, {:?}",
            name,
            points.len(),
            total_length,
            direction
        );
        Ok(TrackLayout {
            name: name.to_string(),
            points,
            sectors,
            total_length,
            direction,
            source: LayoutSource::Reconstructed,
        })
    }

    /// A closed circle of the requested length with equal `mixed` sectors. The circle runs
    /// in `direction` and closes on its first point.
    pub fn synthesize(&self, name: &str, length: f64, direction: Direction) -> TrackLayout {
        let count = self.config.synthetic_point_count.max(3);
        let radius = length / (2.0 * PI);
        let turn = match direction {
            Direction::Counterclockwise => 1.0,
            Direction::Clockwise => -1.0,
        };

        let sectors: Vec<TrackSector> = (0..self.sector_count)
            .map(|i| {
                let start_distance = length * i as f64 / self.sector_count as f64;
                let end_distance = length * (i + 1) as f64 / self.sector_count as f64;
                TrackSector {
                    id: i + 1,
                    start_distance,
                    end_distance,
                    length: end_distance - start_distance,
                    sector_type: SectorType::Mixed,
                    optimal_speed: 0.0,
                }
            })
            .collect();

        let positions: Vec<Point2D> = (0..=count)
            .map(|i| {
                let angle = turn * 2.0 * PI * i as f64 / count as f64;
                Point2D::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect();
        // same radius estimate as reconstructed layouts so both classify alike
        let radii = geometry::corner_radii(&positions, self.config);

        let last = sectors.len() - 1;
        let points = positions
            .iter()
            .zip(radii)
            .enumerate()
            .map(|(i, (position, corner_radius))| {
                let distance = length * i as f64 / count as f64;
                let sector = sectors
                    .iter()
                    .enumerate()
                    .find(|(k, sector)| sector.contains(distance, *k == last))
                    .map_or(self.sector_count, |(_, sector)| sector.id);
                TrackPoint {
                    x: position.x,
                    y: position.y,
                    distance,
                    sector,
                    corner_radius,
                }
            })
            .collect();

        warn!("No usable positions for {name}, synthesized a {length:.0}m placeholder loop");
        TrackLayout {
            name: name.to_string(),
            points,
            sectors,
            total_length: length,
            direction,
            source: LayoutSource::Synthesized,
        }
    }

    fn sectorize(
        &self,
        points: &mut [TrackPoint],
        total_length: f64,
        boundaries: Option<&[f64]>,
    ) -> Vec<TrackSector> {
        let mut fractions: Vec<f64> = match boundaries {
            Some(boundaries) => boundaries
                .iter()
                .copied()
                .filter(|fraction| *fraction > 0.0 && *fraction < 1.0)
                .collect(),
            None => (1..self.sector_count)
                .map(|k| k as f64 / self.sector_count as f64)
                .collect(),
        };
        fractions.sort_by(f64::total_cmp);
        fractions.dedup();

        let starts = std::iter::once(0.0).chain(fractions.iter().map(|f| f * total_length));
        let ends = fractions
            .iter()
            .map(|f| f * total_length)
            .chain(std::iter::once(total_length));
        let mut sectors: Vec<TrackSector> = starts
            .zip(ends)
            .enumerate()
            .map(|(i, (start_distance, end_distance))| TrackSector {
                id: i + 1,
                start_distance,
                end_distance,
                length: end_distance - start_distance,
                sector_type: SectorType::Mixed,
                optimal_speed: 0.0,
            })
            .collect();

        let last = sectors.len() - 1;
        for (k, sector) in sectors.iter_mut().enumerate() {
            let mut radii = Vec::new();
            for point in points
                .iter_mut()
                .filter(|point| sector.contains(point.distance, k == last))
            {
                point.sector = sector.id;
                radii.push(point.corner_radius);
            }
            if radii.is_empty() {
                continue;
            }
            let mean_radius = signal::mean(&radii);
            sector.sector_type = SectorType::from_radius(mean_radius, self.config);
            sector.optimal_speed = ((self.max_lateral_g * GRAVITY * mean_radius).sqrt() * 3.6)
                .min(self.config.max_optimal_speed);
        }
        sectors
    }
}

/// Reconstructs the session's track from the fastest lap carrying positions, falling back to
/// a synthesized loop sized from the known-track table, the best lap's speed or the default.
pub fn detect_track_from_telemetry(session: &Session, thresholds: &AnalysisThresholds) -> TrackLayout {
    let track_name = session.metadata.track_name();
    let known = track_name.as_deref().and_then(find_known_track);
    let name = known
        .map(|track| track.full_name.to_string())
        .or(track_name)
        .unwrap_or_else(|| UNKNOWN_TRACK.to_string());
    let reconstructor = TrackReconstructor::new(thresholds);

    let mut laps: Vec<&RawLap> = session.laps.iter().filter(|lap| !lap.is_empty()).collect();
    // timed laps first, fastest first; untimed laps keep session order
    laps.sort_by(|a, b| match (a.is_timed(), b.is_timed()) {
        (true, true) => a.lap_time.total_cmp(&b.lap_time),
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        (false, false) => std::cmp::Ordering::Equal,
    });

    for lap in &laps {
        let Some(positions) = extract_positions(lap) else {
            continue;
        };
        match reconstructor.reconstruct(&name, &positions, None) {
            Ok(layout) => return layout,
            Err(e) => warn!("Lap {} positions unusable: {}", lap.lap_number, e),
        }
    }

    let length = known
        .map(|track| track.length)
        .or_else(|| {
            laps.iter()
                .find(|lap| lap.is_timed())
                .map(|lap| ChannelSet::from_lap(lap))
                .and_then(|channels| {
                    channels
                        .cumulative_distance(thresholds.speed_unit, thresholds.default_sample_rate_hz)
                        .last()
                        .copied()
                })
                .filter(|length| *length > EPSILON)
        })
        .unwrap_or(thresholds.track.default_track_length);
    let direction = known.map_or(Direction::Clockwise, |track| track.direction);
    reconstructor.synthesize(&name, length, direction)
}

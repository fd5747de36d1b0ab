// Core data structures for reconstructed track layouts

use serde::{Deserialize, Serialize};

use crate::config::TrackConfig;

/// Represents a 2D coordinate point in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Bounding box for coordinate calculations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2D>) -> Self {
        let mut bbox = Self::new();
        for point in points {
            bbox.update(*point);
        }
        bbox
    }

    pub fn update(&mut self, point: Point2D) {
        self.min_x = self.min_x.min(point.x);
        self.max_x = self.max_x.max(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Classification of a sector by how tight it is
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SectorType {
    Straight,
    FastCorner,
    SlowCorner,
    /// No geometry to judge from (synthesized layouts, empty sectors)
    Mixed,
}

impl SectorType {
    /// Classifies a sector from the mean corner radius of its points
    pub fn from_radius(mean_radius: f64, config: &TrackConfig) -> Self {
        if mean_radius > config.straight_radius {
            SectorType::Straight
        } else if mean_radius > config.fast_corner_radius {
            SectorType::FastCorner
        } else {
            SectorType::SlowCorner
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SectorType::Straight => "Straight",
            SectorType::FastCorner => "Fast corner",
            SectorType::SlowCorner => "Slow corner",
            SectorType::Mixed => "Mixed",
        }
    }

    pub fn is_corner(&self) -> bool {
        matches!(self, SectorType::FastCorner | SectorType::SlowCorner)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Clockwise,
    Counterclockwise,
}

/// Where a layout came from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutSource {
    /// Built from recorded positions
    Reconstructed,
    /// Placeholder circle, the session had no usable positions
    Synthesized,
}

/// A point of the layout, in traversal order
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TrackPoint {
    pub x: f64,
    pub y: f64,
    /// Distance from the first point along the layout in metres
    pub distance: f64,
    /// 1-based id of the sector containing this point
    pub sector: usize,
    /// Metres, `chord / (2 sin(θ/2))` over the neighbouring points, which reads about twice the
    /// geometric radius on a smooth curve; `max_corner_radius` on straights
    pub corner_radius: f64,
}

impl TrackPoint {
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrackSector {
    /// 1-based
    pub id: usize,
    pub start_distance: f64,
    pub end_distance: f64,
    pub length: f64,
    #[serde(rename = "type")]
    pub sector_type: SectorType,
    /// Grip-limited speed for the sector's mean radius in km/h, 0 when unknown
    pub optimal_speed: f64,
}

impl TrackSector {
    /// Sectors are half-open except the last one, which also owns its end point
    pub fn contains(&self, distance: f64, is_last: bool) -> bool {
        distance >= self.start_distance
            && (distance < self.end_distance || (is_last && distance <= self.end_distance))
    }
}

/// The geometry of a circuit with its sectors
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrackLayout {
    pub name: String,
    pub points: Vec<TrackPoint>,
    pub sectors: Vec<TrackSector>,
    /// Distance of the last point
    pub total_length: f64,
    pub direction: Direction,
    pub source: LayoutSource,
}

impl TrackLayout {
    /// Interior sector starts as fractions of the lap, suitable for the sector splitter
    pub fn sector_boundaries(&self) -> Vec<f64> {
        if self.total_length <= 0.0 {
            return Vec::new();
        }
        self.sectors
            .iter()
            .skip(1)
            .map(|sector| sector.start_distance / self.total_length)
            .collect()
    }

    /// The sector containing `distance`, if it lies on the layout
    pub fn sector_at(&self, distance: f64) -> Option<&TrackSector> {
        let last = self.sectors.len().checked_sub(1)?;
        self.sectors
            .iter()
            .enumerate()
            .find(|(i, sector)| sector.contains(distance, *i == last))
            .map(|(_, sector)| sector)
    }

    pub fn is_synthesized(&self) -> bool {
        self.source == LayoutSource::Synthesized
    }

    pub fn positions(&self) -> Vec<Point2D> {
        self.points.iter().map(TrackPoint::position).collect()
    }
}

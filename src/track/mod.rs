pub mod geometry;
pub mod lap_performance;
pub mod reconstructor;
pub mod smoothing;
pub mod svg;
pub mod types;

pub use lap_performance::{
    CorneringAnalysis, LapPerformance, RacingLine, SectorPerformance, analyze_lap_performance,
};
pub use reconstructor::{
    KNOWN_TRACKS, KnownTrack, TrackReconstructor, detect_track_from_telemetry, extract_positions,
    find_known_track,
};
pub use smoothing::{IdentitySmoother, SavgolSmoother, Smoother, SplineSmoother};
pub use svg::{TrackMapConfig, TrackMapGenerator};
pub use types::{
    BoundingBox, Direction, LayoutSource, Point2D, SectorType, TrackLayout, TrackPoint,
    TrackSector,
};

// Library interface for lapwise
// The binary and the integration tests both go through these modules

pub mod analysis;
pub mod config;
pub mod errors;
pub mod insights;
pub mod loader;
pub mod report;
pub mod session;
pub mod telemetry;
pub mod track;

// Re-export commonly used types
pub use analysis::{LapAnalysis, analyze_lap};
pub use config::AnalysisThresholds;
pub use errors::LapwiseError;
pub use loader::load_session;
pub use report::{AnalysisReport, SessionAnalyzer, comprehensive_analysis};
pub use telemetry::{Analysis, RawLap, Session, SessionMetadata};
pub use track::{
    LapPerformance, TrackLayout, TrackMapGenerator, analyze_lap_performance,
    detect_track_from_telemetry,
};

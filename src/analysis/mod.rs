pub mod lap;
pub mod sector_splitter;

pub use lap::{EfficiencyMetrics, LapAnalysis, analyze_lap};
pub use sector_splitter::{SectorResult, SectorSplit, SectorSplitter, SplitPolicy};

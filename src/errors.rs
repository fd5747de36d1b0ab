// Error types for lapwise

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum LapwiseError {
    // Config management errors
    #[snafu(display("Could not find application data directory to save thresholds file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing thresholds file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing thresholds file"))]
    ConfigSerializeError { source: serde_json::Error },
    #[snafu(display("Invalid threshold: {field} - {reason}"))]
    InvalidThreshold { field: String, reason: String },

    // Session loading errors
    #[snafu(display("Invalid session file: {path}"))]
    InvalidSessionFile { path: String },
    #[snafu(display("Error loading session file"))]
    SessionLoaderError { source: io::Error },
    #[snafu(display("Error parsing session file"))]
    SessionParseError { source: serde_json::Error },

    // Output errors
    #[snafu(display("Error serializing analysis output"))]
    OutputSerializeError { source: serde_json::Error },
    #[snafu(display("Error writing output file"))]
    WriterError { source: io::Error },

    // Track errors
    #[snafu(display("Track reconstruction failed: {reason}"))]
    TrackReconstructionError { reason: String },
    #[snafu(display("SVG generation failed: {reason}"))]
    SvgGenerationError { reason: String },
}

use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand, arg};
use log::{info, warn};

use lapwise::{
    AnalysisThresholds, LapwiseError, SessionAnalyzer, TrackMapGenerator, load_session,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze every lap of a session and print the report as JSON
    Analyze {
        #[arg(short, long)]
        input: PathBuf,

        /// Thresholds file, defaults to the one in the user config directory
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Reconstruct the track layout of a session
    Track {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also render the layout as an SVG map
        #[arg(short, long)]
        svg: Option<PathBuf>,
    },
}

fn load_thresholds(path: Option<&PathBuf>) -> Result<AnalysisThresholds, LapwiseError> {
    let thresholds = match path {
        Some(path) => AnalysisThresholds::from_file(path)?,
        None => AnalysisThresholds::from_local_file()?.unwrap_or_default(),
    };
    thresholds.validate()?;
    Ok(thresholds)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), LapwiseError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| LapwiseError::OutputSerializeError { source: e })?;
    println!("{json}");
    Ok(())
}

fn analyze(input: &PathBuf, config: Option<&PathBuf>) -> Result<(), LapwiseError> {
    let analyzer = SessionAnalyzer::new(load_thresholds(config)?);
    let session = load_session(input)?;
    print_json(&analyzer.analyze(&session))
}

fn track(
    input: &PathBuf,
    config: Option<&PathBuf>,
    svg: Option<&PathBuf>,
) -> Result<(), LapwiseError> {
    let analyzer = SessionAnalyzer::new(load_thresholds(config)?);
    let session = load_session(input)?;
    let layout = analyzer.detect_track(&session);
    if layout.is_synthesized() {
        warn!("No usable positions in {:?}, layout is a placeholder", input);
    }

    if let Some(svg_path) = svg {
        let svg = TrackMapGenerator::new().generate_svg(&layout)?;
        fs::write(svg_path, svg).map_err(|e| LapwiseError::WriterError { source: e })?;
        info!("Track map written to {:?}", svg_path);
    }
    print_json(&layout)
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    let result = match &cli.command {
        Commands::Analyze { input, config } => analyze(input, config.as_ref()),
        Commands::Track { input, config, svg } => track(input, config.as_ref(), svg.as_ref()),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
